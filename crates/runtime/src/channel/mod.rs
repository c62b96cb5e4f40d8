//! Origin-locked raw channel.
//!
//! [`OriginLockedChannel`] implements [`RawMessageChannel`], the transport
//! capability the external secure-session runtime is driven through. Every
//! listener it installs on the shared [`MessagePort`] checks the notification
//! origin against the channel's expected origin before the callback runs, so
//! application code never observes a message from any other origin.
//!
//! # Lifecycle
//!
//! ```text
//! Active ──dispose()──► Disposed (terminal)
//! ```
//!
//! Disposal removes every subscription, releases the peer and, for the
//! initiator side, destroys the embedded context the channel owns.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, error, trace};

use crate::error::{Error, Result};
use crate::launcher::EmbeddedContext;
use crate::listeners::{ErrorHook, ListenerRegistry, Liveness, MessageCallback};
use crate::port::{InboundMessage, MessagePort, PeerTarget, PortListener};


/// Capability set required by the secure-session runtime.
pub trait RawMessageChannel {
	/// Always succeeds; the handshake happens before the channel exists.
	fn connect(&self, config: Option<&Value>) -> bool;

	/// Returns false once the channel is disposed.
	fn can_send_message(&self) -> bool;

	/// Posts `message` to the peer, targeted at the expected origin.
	///
	/// Fails with [`Error::Disposed`] after disposal.
	fn send_message_raw(&self, message: &Value) -> Result<()>;

	/// Registers `callback` for messages from the expected origin.
	///
	/// Registering the same callback twice has no effect.
	fn add_message_listener(&self, callback: &MessageCallback);

	/// Unregisters `callback`; does nothing if it is not registered.
	fn remove_message_listener(&self, callback: &MessageCallback);

	/// Tears the channel down. Subsequent calls do nothing.
	fn dispose(&self);
}

/// Which end of the handshake a channel serves, with what that end owns.
pub enum ChannelSide {
	/// Host end; owns the embedded context it launched.
	Initiator { context: Box<dyn EmbeddedContext> },
	/// Embedded end; talks to the hosting context.
	Responder { parent: Rc<dyn PeerTarget> },
}

/// Fieldless tag of a [`ChannelSide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRole {
	Initiator,
	Responder,
}

/// Raw channel accepting messages from exactly one origin.
pub struct OriginLockedChannel {
	role: ChannelRole,
	expected_origin: Rc<str>,
	port: Rc<dyn MessagePort>,
	peer: RefCell<Option<Rc<dyn PeerTarget>>>,
	context: RefCell<Option<Box<dyn EmbeddedContext>>>,
	listeners: RefCell<ListenerRegistry>,
	error_hook: Option<ErrorHook>,
	disposed: Cell<bool>,
}

impl OriginLockedChannel {
	/// Creates an active channel for `side`, locked to `expected_origin`.
	pub fn new(side: ChannelSide, port: Rc<dyn MessagePort>, expected_origin: &str) -> Self {
		let (role, peer, context) = match side {
			ChannelSide::Initiator { context } => (ChannelRole::Initiator, context.peer(), Some(context)),
			ChannelSide::Responder { parent } => (ChannelRole::Responder, parent, None),
		};

		debug!(?role, origin = expected_origin, "raw channel created");

		Self {
			role,
			expected_origin: Rc::from(expected_origin),
			port,
			peer: RefCell::new(Some(peer)),
			context: RefCell::new(context),
			listeners: RefCell::new(ListenerRegistry::new()),
			error_hook: None,
			disposed: Cell::new(false),
		}
	}

	/// Routes listener failures to `hook` in addition to the error log.
	///
	/// Applies to listeners added after this call.
	pub fn with_error_hook(mut self, hook: Option<ErrorHook>) -> Self {
		self.error_hook = hook;
		self
	}

	pub fn role(&self) -> ChannelRole {
		self.role
	}

	/// The only origin inbound messages are accepted from.
	pub fn expected_origin(&self) -> &str {
		&self.expected_origin
	}

	pub fn is_disposed(&self) -> bool {
		self.disposed.get()
	}

	/// Number of registered listeners.
	pub fn listener_count(&self) -> usize {
		self.listeners.borrow().len()
	}

	fn origin_filter(&self, callback: &MessageCallback, live: &Liveness) -> PortListener {
		let origin = Rc::clone(&self.expected_origin);
		let callback = Rc::clone(callback);
		let live = Rc::clone(live);
		let hook = self.error_hook.clone();

		Rc::new(move |event: &InboundMessage| {
			// Removed or disposed while this notification was being dispatched.
			if !live.get() {
				return;
			}
			if *event.origin != *origin {
				trace!(expected = %origin, actual = %event.origin, "dropped message from foreign origin");
				return;
			}
			if let Err(err) = callback(&event.data) {
				error!(origin = %origin, error = %err, "message listener failed");
				if let Some(hook) = &hook {
					hook(&err);
				}
			}
		})
	}
}

impl RawMessageChannel for OriginLockedChannel {
	fn connect(&self, _config: Option<&Value>) -> bool {
		true
	}

	fn can_send_message(&self) -> bool {
		!self.disposed.get()
	}

	fn send_message_raw(&self, message: &Value) -> Result<()> {
		let peer = self.peer.borrow().clone().ok_or(Error::Disposed)?;
		peer.post_message(message, &self.expected_origin)
	}

	fn add_message_listener(&self, callback: &MessageCallback) {
		if self.disposed.get() {
			debug!(role = ?self.role, "ignoring listener added after dispose");
			return;
		}
		if self.listeners.borrow().contains(callback) {
			return;
		}
		let live: Liveness = Rc::new(Cell::new(true));
		let subscription = self.port.subscribe(self.origin_filter(callback, &live));
		self.listeners.borrow_mut().insert(callback, subscription, live);
	}

	fn remove_message_listener(&self, callback: &MessageCallback) {
		let removed = self.listeners.borrow_mut().remove(callback);
		if let Some(subscription) = removed {
			self.port.unsubscribe(subscription);
		}
	}

	fn dispose(&self) {
		if self.disposed.replace(true) {
			return;
		}

		let subscriptions = self.listeners.borrow_mut().drain();
		for subscription in subscriptions {
			self.port.unsubscribe(subscription);
		}
		self.peer.borrow_mut().take();

		let context = self.context.borrow_mut().take();
		if let Some(context) = context {
			context.destroy();
		}

		debug!(role = ?self.role, origin = %self.expected_origin, "raw channel disposed");
	}
}

impl Drop for OriginLockedChannel {
	fn drop(&mut self) {
		self.dispose();
	}
}

impl std::fmt::Debug for OriginLockedChannel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("OriginLockedChannel")
			.field("role", &self.role)
			.field("expected_origin", &self.expected_origin)
			.field("listeners", &self.listener_count())
			.field("disposed", &self.disposed.get())
			.finish()
	}
}
