//! Listener registry keyed by callback identity.
//!
//! A callback's identity is the address of its `Rc` allocation. The registry
//! holds a clone of every registered `Rc`, so an address cannot be recycled
//! while its entry exists.
//!
//! Each entry also owns the liveness flag shared with its port subscription.
//! Removing the entry clears the flag, so a subscription already snapshotted
//! by an in-progress dispatch stops delivering immediately.

use std::cell::Cell;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::HandlerError;
use crate::port::SubscriptionId;

/// Callback receiving message payloads from a raw channel.
pub type MessageCallback = Rc<dyn Fn(&Value) -> Result<(), HandlerError>>;

/// Hook receiving errors that would otherwise be swallowed.
pub type ErrorHook = Rc<dyn Fn(&HandlerError)>;

/// Wraps a closure as a [`MessageCallback`].
pub fn message_callback<F>(f: F) -> MessageCallback
where
	F: Fn(&Value) -> Result<(), HandlerError> + 'static,
{
	Rc::new(f)
}

/// Wraps a closure as an [`ErrorHook`].
pub fn error_hook<F>(f: F) -> ErrorHook
where
	F: Fn(&HandlerError) + 'static,
{
	Rc::new(f)
}

type CallbackKey = usize;

fn callback_key(callback: &MessageCallback) -> CallbackKey {
	Rc::as_ptr(callback) as *const () as usize
}

/// Shared flag a subscription checks before running its callback.
pub type Liveness = Rc<Cell<bool>>;

struct ListenerEntry {
	_callback: MessageCallback,
	subscription: SubscriptionId,
	live: Liveness,
}

impl ListenerEntry {
	fn retire(self) -> SubscriptionId {
		self.live.set(false);
		self.subscription
	}
}

/// Callback identity → installed port subscription.
#[derive(Default)]
pub struct ListenerRegistry {
	entries: IndexMap<CallbackKey, ListenerEntry>,
}

impl ListenerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns true if `callback` is registered.
	pub fn contains(&self, callback: &MessageCallback) -> bool {
		self.entries.contains_key(&callback_key(callback))
	}

	/// Records `subscription` for `callback`, with the liveness flag the
	/// subscription checks.
	///
	/// Returns false and leaves the registry untouched if `callback` is
	/// already present.
	pub fn insert(
		&mut self,
		callback: &MessageCallback,
		subscription: SubscriptionId,
		live: Liveness,
	) -> bool {
		let key = callback_key(callback);
		if self.entries.contains_key(&key) {
			return false;
		}
		self.entries.insert(
			key,
			ListenerEntry {
				_callback: Rc::clone(callback),
				subscription,
				live,
			},
		);
		true
	}

	/// Forgets `callback`, clearing its liveness flag and returning its
	/// subscription.
	pub fn remove(&mut self, callback: &MessageCallback) -> Option<SubscriptionId> {
		self.entries
			.shift_remove(&callback_key(callback))
			.map(ListenerEntry::retire)
	}

	/// Empties the registry, clearing every liveness flag and returning the
	/// subscriptions in insertion order.
	pub fn drain(&mut self) -> Vec<SubscriptionId> {
		self.entries.drain(..).map(|(_, entry)| entry.retire()).collect()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn noop() -> MessageCallback {
		message_callback(|_| Ok(()))
	}

	fn live() -> Liveness {
		Rc::new(Cell::new(true))
	}

	#[test]
	fn same_callback_registers_once() {
		let mut registry = ListenerRegistry::new();
		let cb = noop();
		assert!(registry.insert(&cb, 1, live()));
		assert!(!registry.insert(&Rc::clone(&cb), 2, live()));
		assert_eq!(registry.len(), 1);
		assert_eq!(registry.remove(&cb), Some(1));
	}

	#[test]
	fn identical_closures_are_distinct() {
		let mut registry = ListenerRegistry::new();
		assert!(registry.insert(&noop(), 1, live()));
		assert!(registry.insert(&noop(), 2, live()));
		assert_eq!(registry.len(), 2);
	}

	#[test]
	fn remove_and_drain_clear_liveness() {
		let mut registry = ListenerRegistry::new();
		let (a, b) = (noop(), noop());
		let (a_live, b_live) = (live(), live());
		registry.insert(&a, 1, Rc::clone(&a_live));
		registry.insert(&b, 2, Rc::clone(&b_live));

		registry.remove(&a);
		assert!(!a_live.get());
		assert!(b_live.get());

		registry.drain();
		assert!(!b_live.get());
	}

	#[test]
	fn rejected_duplicate_keeps_original_flag() {
		let mut registry = ListenerRegistry::new();
		let cb = noop();
		let (first, second) = (live(), live());
		registry.insert(&cb, 1, Rc::clone(&first));
		registry.insert(&cb, 2, Rc::clone(&second));

		registry.remove(&cb);
		assert!(!first.get());
		assert!(second.get());
	}

	#[test]
	fn remove_unknown_is_none() {
		let mut registry = ListenerRegistry::new();
		assert_eq!(registry.remove(&noop()), None);
		assert!(registry.is_empty());
	}

	#[test]
	fn drain_preserves_insertion_order() {
		let mut registry = ListenerRegistry::new();
		let (a, b, c) = (noop(), noop(), noop());
		registry.insert(&a, 10, live());
		registry.insert(&b, 20, live());
		registry.insert(&c, 30, live());
		registry.remove(&b);
		assert_eq!(registry.drain(), vec![10, 30]);
		assert!(registry.is_empty());
	}
}
