//! Transport port abstraction over the platform's cross-context messaging.
//!
//! A context observes every inbound notification through one shared
//! [`MessagePort`]; channels filter it themselves. Outbound messages go to a
//! [`PeerTarget`], which only delivers when the receiving context's origin
//! matches the `target_origin` given to [`PeerTarget::post_message`].
//!
//! Implementations: [`crate::memory`] in-process, and the window bindings in
//! the `framelink-web` crate.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use crate::error::Result;

/// Identifier of one installed port subscription.
pub type SubscriptionId = u64;

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a new process-unique subscription ID.
pub fn next_subscription_id() -> SubscriptionId {
	NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed)
}

/// One platform notification as seen by a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
	/// Origin the platform reports for the sending context.
	pub origin: String,
	/// Message payload.
	pub data: Value,
}

impl InboundMessage {
	pub fn new(origin: impl Into<String>, data: Value) -> Self {
		Self {
			origin: origin.into(),
			data,
		}
	}
}

/// Low-level subscriber installed on a [`MessagePort`].
pub type PortListener = Rc<dyn Fn(&InboundMessage)>;

/// The local context's inbound notification stream.
pub trait MessagePort {
	/// Installs `listener` for every future notification.
	fn subscribe(&self, listener: PortListener) -> SubscriptionId;

	/// Removes a subscription. Unknown IDs are ignored.
	fn unsubscribe(&self, id: SubscriptionId);
}

/// A remote context that messages can be posted to.
pub trait PeerTarget {
	/// Queues `message` for the remote context, to be delivered only if its
	/// origin equals `target_origin` (or `target_origin` is `"*"`).
	fn post_message(&self, message: &Value, target_origin: &str) -> Result<()>;
}

/// The execution context the code is running in.
pub trait LocalContext {
	/// Origin of this context, e.g. `https://host.example`.
	fn origin(&self) -> String;

	/// Address this context was launched at, fragment included.
	fn launch_address(&self) -> Option<String>;

	/// Inbound notification stream of this context.
	fn port(&self) -> Rc<dyn MessagePort>;

	/// The hosting context, if this context is embedded.
	fn parent(&self) -> Option<Rc<dyn PeerTarget>>;
}
