//! Seam to the external secure-session library.
//!
//! framelink does no cryptography. A [`SessionProvider`] supplies session
//! material, (de)serializes the one-shot peer config, and binds a session and
//! a raw channel into the library's hub, which drives encrypted traffic and
//! reports failures through [`ErrorHooks`].

use std::rc::Rc;

use async_trait::async_trait;
use framelink_runtime::{ErrorHook, HandlerError, RawMessageChannel, Result};

use crate::hub::HubBase;

/// Session operations the bootstrap needs from the secure-session library.
///
/// Implementations report their own failures as [`Error::Session`].
///
/// [`Error::Session`]: framelink_runtime::Error::Session
#[async_trait(?Send)]
pub trait SessionProvider {
	/// An established encrypted session.
	type Session;

	/// One-shot descriptor letting a peer reconstruct the session.
	type PeerConfig;

	/// The library's message hub.
	type Hub: HubBase;

	/// Creates a brand-new randomized session.
	async fn new_random_session(&self) -> Result<Self::Session>;

	/// Generates the one-shot peer config for `session`.
	async fn generate_peer_config(&self, session: &Self::Session) -> Result<Self::PeerConfig>;

	/// Reconstructs the peer's session from its config.
	async fn session_from_peer_config(&self, config: Self::PeerConfig) -> Result<Self::Session>;

	fn serialize_peer_config(&self, config: &Self::PeerConfig) -> Result<String>;

	fn deserialize_peer_config(&self, serialized: &str) -> Result<Self::PeerConfig>;

	/// Binds `session` and `channel` into the library's hub.
	fn bind_hub(
		&self,
		session: Self::Session,
		channel: Rc<dyn RawMessageChannel>,
		hooks: ErrorHooks,
	) -> Self::Hub;
}

/// Error hooks handed to the session hub.
///
/// Listener failures caught by the raw channel are routed to
/// `on_message_handler_error` as well.
#[derive(Clone, Default)]
pub struct ErrorHooks {
	pub on_message_handler_error: Option<ErrorHook>,
	pub on_decryption_error: Option<ErrorHook>,
}

impl ErrorHooks {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_message_handler_error<F>(mut self, hook: F) -> Self
	where
		F: Fn(&HandlerError) + 'static,
	{
		self.on_message_handler_error = Some(Rc::new(hook));
		self
	}

	pub fn with_decryption_error<F>(mut self, hook: F) -> Self
	where
		F: Fn(&HandlerError) + 'static,
	{
		self.on_decryption_error = Some(Rc::new(hook));
		self
	}

	/// Reports a failed message handler, logging it when no hook is set.
	pub fn report_message_handler_error(&self, err: &HandlerError) {
		match &self.on_message_handler_error {
			Some(hook) => hook(err),
			None => tracing::error!(error = %err, "message handler failed"),
		}
	}

	/// Reports a message that could not be decrypted, logging it when no hook is set.
	pub fn report_decryption_error(&self, err: &HandlerError) {
		match &self.on_decryption_error {
			Some(hook) => hook(err),
			None => tracing::warn!(error = %err, "failed to decrypt message"),
		}
	}
}

impl std::fmt::Debug for ErrorHooks {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ErrorHooks")
			.field("on_message_handler_error", &self.on_message_handler_error.is_some())
			.field("on_decryption_error", &self.on_decryption_error.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;

	use super::*;

	#[test]
	fn hooks_receive_reported_errors() {
		let seen = Rc::new(RefCell::new(Vec::new()));
		let (a, b) = (Rc::clone(&seen), Rc::clone(&seen));
		let hooks = ErrorHooks::new()
			.with_message_handler_error(move |e| a.borrow_mut().push(format!("handler: {e}")))
			.with_decryption_error(move |e| b.borrow_mut().push(format!("decrypt: {e}")));

		hooks.report_message_handler_error(&HandlerError::from("x"));
		hooks.report_decryption_error(&HandlerError::from("y"));

		assert_eq!(seen.borrow().as_slice(), &["handler: x", "decrypt: y"]);
	}

	#[test]
	fn missing_hooks_only_log() {
		let hooks = ErrorHooks::default();
		hooks.report_message_handler_error(&HandlerError::from("x"));
		hooks.report_decryption_error(&HandlerError::from("y"));
		assert_eq!(
			format!("{hooks:?}"),
			"ErrorHooks { on_message_handler_error: false, on_decryption_error: false }"
		);
	}
}
