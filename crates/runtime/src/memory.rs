//! In-process messaging platform.
//!
//! [`MemoryBus`] hosts any number of [`MemoryContext`]s and reproduces the
//! semantics of cross-context posting: a posted message is queued, and on
//! [`MemoryBus::flush`] it is delivered to the target only if the target is
//! still alive and its origin equals the requested target origin (or the
//! target origin is `"*"`). The delivered notification carries the sender's
//! origin, never anything the payload claims.
//!
//! [`MemoryLauncher`] mounts child contexts under a parent, with a
//! configurable [`LoadBehavior`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use async_trait::async_trait;
use framelink_protocol::origin_of;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;
use url::Url;

use crate::error::{Error, Result, parse_address};
use crate::launcher::{ContextLauncher, EmbeddedContext};
use crate::port::{
	InboundMessage, LocalContext, MessagePort, PeerTarget, PortListener, SubscriptionId,
	next_subscription_id,
};

/// Identifier of a context on a [`MemoryBus`].
pub type ContextId = u64;

struct ContextState {
	origin: String,
	address: String,
	parent: Option<ContextId>,
	listeners: IndexMap<SubscriptionId, PortListener>,
	alive: bool,
}

struct Delivery {
	target: ContextId,
	target_origin: String,
	event: InboundMessage,
}

#[derive(Default)]
struct BusState {
	contexts: IndexMap<ContextId, ContextState>,
	queue: VecDeque<Delivery>,
	next_id: ContextId,
}

fn snapshot(ctx: &ContextState) -> Vec<(SubscriptionId, PortListener)> {
	ctx.listeners
		.iter()
		.map(|(id, listener)| (*id, Rc::clone(listener)))
		.collect()
}

/// Shared in-process notification queue.
#[derive(Clone, Default)]
pub struct MemoryBus {
	state: Rc<RefCell<BusState>>,
}

impl MemoryBus {
	pub fn new() -> Self {
		Self::default()
	}

	/// Opens a top-level context at `address`.
	pub fn open_context(&self, address: &str) -> Result<MemoryContext> {
		let url = parse_address(address)?;
		Ok(self.open(&url, None))
	}

	fn open(&self, address: &Url, parent: Option<ContextId>) -> MemoryContext {
		let mut state = self.state.borrow_mut();
		state.next_id += 1;
		let id = state.next_id;
		state.contexts.insert(
			id,
			ContextState {
				origin: origin_of(address),
				address: address.to_string(),
				parent,
				listeners: IndexMap::new(),
				alive: true,
			},
		);
		MemoryContext {
			bus: self.clone(),
			id,
		}
	}

	/// Delivers every queued notification, including ones queued by listeners
	/// while flushing. Returns the number of notifications delivered.
	pub fn flush(&self) -> usize {
		let mut delivered = 0;
		loop {
			let next = self.state.borrow_mut().queue.pop_front();
			let Some(delivery) = next else {
				return delivered;
			};

			let listeners = {
				let state = self.state.borrow();
				match state.contexts.get(&delivery.target) {
					Some(ctx)
						if ctx.alive
							&& (delivery.target_origin == "*" || delivery.target_origin == ctx.origin) =>
					{
						snapshot(ctx)
					}
					_ => {
						trace!(
							target_origin = %delivery.target_origin,
							"discarding message for unavailable or mismatched target"
						);
						continue;
					}
				}
			};

			delivered += 1;
			self.dispatch(delivery.target, listeners, &delivery.event);
		}
	}

	/// Runs `listeners` in order, skipping any unsubscribed (or whose context
	/// closed) by an earlier listener of the same notification.
	fn dispatch(
		&self,
		target: ContextId,
		listeners: Vec<(SubscriptionId, PortListener)>,
		event: &InboundMessage,
	) {
		for (id, listener) in listeners {
			let installed = self
				.state
				.borrow()
				.contexts
				.get(&target)
				.is_some_and(|ctx| ctx.alive && ctx.listeners.contains_key(&id));
			if installed {
				listener(event);
			}
		}
	}

	/// Number of queued notifications.
	pub fn pending(&self) -> usize {
		self.state.borrow().queue.len()
	}

	/// Number of contexts that have not been closed.
	pub fn live_contexts(&self) -> usize {
		self.state.borrow().contexts.values().filter(|c| c.alive).count()
	}

	fn enqueue(&self, sender: ContextId, target: ContextId, data: &Value, target_origin: &str) -> Result<()> {
		let mut state = self.state.borrow_mut();
		let origin = match state.contexts.get(&sender) {
			Some(ctx) if ctx.alive => ctx.origin.clone(),
			_ => return Err(Error::Transport("sending context is closed".into())),
		};
		state.queue.push_back(Delivery {
			target,
			target_origin: target_origin.to_string(),
			event: InboundMessage::new(origin, data.clone()),
		});
		Ok(())
	}
}

/// One execution context on a [`MemoryBus`].
#[derive(Clone)]
pub struct MemoryContext {
	bus: MemoryBus,
	id: ContextId,
}

impl MemoryContext {
	pub fn id(&self) -> ContextId {
		self.id
	}

	pub fn bus(&self) -> &MemoryBus {
		&self.bus
	}

	/// Returns a message target for `other`, posting as this context.
	pub fn peer_for(&self, other: &MemoryContext) -> Rc<dyn PeerTarget> {
		Rc::new(MemoryPeer {
			bus: self.bus.clone(),
			sender: self.id,
			target: other.id,
		})
	}

	/// Posts `data` to `other` as this context.
	pub fn post_to(&self, other: &MemoryContext, data: &Value, target_origin: &str) -> Result<()> {
		self.bus.enqueue(self.id, other.id, data, target_origin)
	}

	/// Synchronously runs every listener of this context with `event`,
	/// bypassing the queue and origin reporting.
	pub fn deliver(&self, event: &InboundMessage) {
		let listeners = self.with_state(snapshot).unwrap_or_default();
		self.bus.dispatch(self.id, listeners, event);
	}

	/// Closes the context; queued and future messages to it are discarded.
	pub fn close(&self) {
		let mut state = self.bus.state.borrow_mut();
		if let Some(ctx) = state.contexts.get_mut(&self.id) {
			ctx.alive = false;
			ctx.listeners.clear();
		}
	}

	pub fn is_alive(&self) -> bool {
		self.with_state(|ctx| ctx.alive).unwrap_or(false)
	}

	/// Number of installed port subscriptions.
	pub fn listener_count(&self) -> usize {
		self.with_state(|ctx| ctx.listeners.len()).unwrap_or(0)
	}

	fn with_state<T>(&self, f: impl FnOnce(&ContextState) -> T) -> Option<T> {
		self.bus.state.borrow().contexts.get(&self.id).map(f)
	}
}

impl LocalContext for MemoryContext {
	fn origin(&self) -> String {
		self.with_state(|ctx| ctx.origin.clone()).unwrap_or_else(|| "null".to_string())
	}

	fn launch_address(&self) -> Option<String> {
		self.with_state(|ctx| ctx.address.clone())
	}

	fn port(&self) -> Rc<dyn MessagePort> {
		Rc::new(self.clone())
	}

	fn parent(&self) -> Option<Rc<dyn PeerTarget>> {
		let parent = self.with_state(|ctx| ctx.parent).flatten()?;
		Some(Rc::new(MemoryPeer {
			bus: self.bus.clone(),
			sender: self.id,
			target: parent,
		}))
	}
}

impl MessagePort for MemoryContext {
	fn subscribe(&self, listener: PortListener) -> SubscriptionId {
		let id = next_subscription_id();
		let mut state = self.bus.state.borrow_mut();
		if let Some(ctx) = state.contexts.get_mut(&self.id).filter(|ctx| ctx.alive) {
			ctx.listeners.insert(id, listener);
		}
		id
	}

	fn unsubscribe(&self, id: SubscriptionId) {
		let mut state = self.bus.state.borrow_mut();
		if let Some(ctx) = state.contexts.get_mut(&self.id) {
			ctx.listeners.shift_remove(&id);
		}
	}
}

struct MemoryPeer {
	bus: MemoryBus,
	sender: ContextId,
	target: ContextId,
}

impl PeerTarget for MemoryPeer {
	fn post_message(&self, message: &Value, target_origin: &str) -> Result<()> {
		self.bus.enqueue(self.sender, self.target, message, target_origin)
	}
}

/// How a mounted memory context reports readiness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadBehavior {
	/// Ready immediately.
	#[default]
	Ready,
	/// Loading fails with the given reason.
	Fail(String),
	/// Readiness is never signalled.
	Never,
}

/// Mounts child [`MemoryContext`]s under a parent context.
pub struct MemoryLauncher {
	parent: MemoryContext,
	behavior: LoadBehavior,
	launched: RefCell<Vec<MemoryContext>>,
}

impl MemoryLauncher {
	pub fn new(parent: &MemoryContext) -> Self {
		Self {
			parent: parent.clone(),
			behavior: LoadBehavior::Ready,
			launched: RefCell::new(Vec::new()),
		}
	}

	pub fn with_behavior(mut self, behavior: LoadBehavior) -> Self {
		self.behavior = behavior;
		self
	}

	/// Every context mounted so far, including destroyed ones.
	pub fn launched(&self) -> Vec<MemoryContext> {
		self.launched.borrow().clone()
	}

	/// The most recently mounted context.
	pub fn last_launched(&self) -> Option<MemoryContext> {
		self.launched.borrow().last().cloned()
	}
}

impl ContextLauncher for MemoryLauncher {
	fn mount(&self, address: &Url) -> Result<Box<dyn EmbeddedContext>> {
		let context = self.parent.bus.open(address, Some(self.parent.id));
		self.launched.borrow_mut().push(context.clone());
		Ok(Box::new(MemoryFrame {
			host: self.parent.clone(),
			address: address.to_string(),
			context,
			behavior: self.behavior.clone(),
		}))
	}
}

struct MemoryFrame {
	host: MemoryContext,
	context: MemoryContext,
	address: String,
	behavior: LoadBehavior,
}

#[async_trait(?Send)]
impl EmbeddedContext for MemoryFrame {
	async fn ready(&mut self) -> Result<()> {
		match &self.behavior {
			LoadBehavior::Ready => Ok(()),
			LoadBehavior::Fail(reason) => Err(Error::Transport(reason.clone())),
			LoadBehavior::Never => std::future::pending().await,
		}
	}

	fn peer(&self) -> Rc<dyn PeerTarget> {
		self.host.peer_for(&self.context)
	}

	fn address(&self) -> &str {
		&self.address
	}

	fn destroy(self: Box<Self>) {
		self.context.close();
	}
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;

	use serde_json::json;

	use super::*;

	fn recorder(context: &MemoryContext) -> Rc<RefCell<Vec<InboundMessage>>> {
		let seen = Rc::new(RefCell::new(Vec::new()));
		let sink = Rc::clone(&seen);
		context.subscribe(Rc::new(move |event: &InboundMessage| {
			sink.borrow_mut().push(event.clone())
		}));
		seen
	}

	#[test]
	fn delivery_reports_sender_origin() {
		let bus = MemoryBus::new();
		let host = bus.open_context("https://host.example/index.html").unwrap();
		let child = bus.open_context("https://child.example/app").unwrap();
		let seen = recorder(&child);

		host.post_to(&child, &json!({"n": 1}), "https://child.example").unwrap();
		assert_eq!(bus.pending(), 1);
		assert!(seen.borrow().is_empty());

		assert_eq!(bus.flush(), 1);
		assert_eq!(
			seen.borrow().as_slice(),
			&[InboundMessage::new("https://host.example", json!({"n": 1}))]
		);
	}

	#[test]
	fn unsubscribed_mid_dispatch_is_skipped() {
		let bus = MemoryBus::new();
		let host = bus.open_context("https://host.example/").unwrap();
		let child = bus.open_context("https://child.example/app").unwrap();

		let victim_id = Rc::new(Cell::new(None));
		let (port, target) = (child.clone(), Rc::clone(&victim_id));
		child.subscribe(Rc::new(move |_: &InboundMessage| {
			if let Some(id) = target.get() {
				port.unsubscribe(id);
			}
		}));
		let victim_calls = Rc::new(Cell::new(0));
		let counter = Rc::clone(&victim_calls);
		victim_id.set(Some(child.subscribe(Rc::new(move |_: &InboundMessage| {
			counter.set(counter.get() + 1)
		}))));

		host.post_to(&child, &json!(1), "*").unwrap();
		assert_eq!(bus.flush(), 1);
		assert_eq!(victim_calls.get(), 0);
		assert_eq!(child.listener_count(), 1);

		let counter = Rc::clone(&victim_calls);
		victim_id.set(Some(child.subscribe(Rc::new(move |_: &InboundMessage| {
			counter.set(counter.get() + 1)
		}))));
		child.deliver(&InboundMessage::new("https://host.example", json!(2)));
		assert_eq!(victim_calls.get(), 0);
		assert_eq!(child.listener_count(), 1);
	}

	#[test]
	fn mismatched_target_origin_is_discarded() {
		let bus = MemoryBus::new();
		let host = bus.open_context("https://host.example/").unwrap();
		let child = bus.open_context("https://child.example/app").unwrap();
		let seen = recorder(&child);

		host.post_to(&child, &json!(1), "https://other.example").unwrap();
		assert_eq!(bus.flush(), 0);
		assert!(seen.borrow().is_empty());

		host.post_to(&child, &json!(2), "*").unwrap();
		assert_eq!(bus.flush(), 1);
		assert_eq!(seen.borrow().len(), 1);
	}

	#[test]
	fn closed_context_receives_nothing() {
		let bus = MemoryBus::new();
		let host = bus.open_context("https://host.example/").unwrap();
		let child = bus.open_context("https://child.example/").unwrap();
		let seen = recorder(&child);

		host.post_to(&child, &json!(1), "*").unwrap();
		child.close();
		assert_eq!(bus.flush(), 0);
		assert!(seen.borrow().is_empty());
		assert!(child.post_to(&host, &json!(1), "*").is_err());
		assert_eq!(bus.live_contexts(), 1);
	}

	#[test]
	fn unsubscribe_stops_delivery() {
		let bus = MemoryBus::new();
		let host = bus.open_context("https://host.example/").unwrap();
		let child = bus.open_context("https://child.example/").unwrap();
		let count = Rc::new(RefCell::new(0));
		let sink = Rc::clone(&count);
		let id = child.subscribe(Rc::new(move |_: &InboundMessage| *sink.borrow_mut() += 1));

		host.post_to(&child, &json!(1), "*").unwrap();
		bus.flush();
		child.unsubscribe(id);
		child.unsubscribe(id);
		host.post_to(&child, &json!(2), "*").unwrap();
		bus.flush();

		assert_eq!(*count.borrow(), 1);
		assert_eq!(child.listener_count(), 0);
	}

	#[test]
	fn listeners_may_post_while_flushing() {
		let bus = MemoryBus::new();
		let host = bus.open_context("https://host.example/").unwrap();
		let child = bus.open_context("https://child.example/").unwrap();
		let host_seen = recorder(&host);

		let (echo_from, echo_to) = (child.clone(), host.clone());
		child.subscribe(Rc::new(move |event: &InboundMessage| {
			echo_from.post_to(&echo_to, &event.data, "*").unwrap();
		}));

		host.post_to(&child, &json!("ping"), "*").unwrap();
		assert_eq!(bus.flush(), 2);
		assert_eq!(host_seen.borrow()[0].data, json!("ping"));
		assert_eq!(host_seen.borrow()[0].origin, "https://child.example");
	}

	#[tokio::test]
	async fn launcher_mounts_child_with_parent() {
		let bus = MemoryBus::new();
		let host = bus.open_context("https://host.example/").unwrap();
		let launcher = MemoryLauncher::new(&host);
		let address = Url::parse("https://child.example/app#token").unwrap();

		let mut frame = launcher.mount(&address).unwrap();
		frame.ready().await.unwrap();
		assert_eq!(frame.address(), "https://child.example/app#token");

		let child = launcher.last_launched().unwrap();
		assert_eq!(child.origin(), "https://child.example");
		assert_eq!(child.launch_address().as_deref(), Some("https://child.example/app#token"));

		let host_seen = recorder(&host);
		child.parent().unwrap().post_message(&json!("up"), "https://host.example").unwrap();
		bus.flush();
		assert_eq!(host_seen.borrow().len(), 1);

		frame.destroy();
		assert!(!child.is_alive());
	}

	#[tokio::test]
	async fn failing_launcher_reports_transport_error() {
		let bus = MemoryBus::new();
		let host = bus.open_context("https://host.example/").unwrap();
		let launcher = MemoryLauncher::new(&host).with_behavior(LoadBehavior::Fail("404".into()));

		let mut frame = launcher.mount(&Url::parse("https://child.example/").unwrap()).unwrap();
		let err = frame.ready().await.unwrap_err();
		assert!(matches!(err, Error::Transport(ref reason) if reason == "404"));
	}

	#[test]
	fn top_level_context_has_no_parent() {
		let bus = MemoryBus::new();
		let host = bus.open_context("https://host.example/").unwrap();
		assert!(host.parent().is_none());
		assert!(bus.open_context("::").is_err());
	}
}
