//! SessionHub - a session library hub composed with an origin-locked channel.
//!
//! Host and embedded hubs are the same type; the channel's [`ChannelRole`]
//! says which end of the handshake it serves.

use std::cell::Cell;
use std::rc::Rc;

use framelink_runtime::{ChannelRole, OriginLockedChannel, RawMessageChannel};
use tracing::debug;

use crate::session::{ErrorHooks, SessionProvider};

/// Base behavior of the session library's message hub.
pub trait HubBase {
	/// Stops dispatch and detaches from the channel.
	fn dispose(&self);
}

/// A bound session hub and the raw channel it drives.
pub struct SessionHub<H: HubBase> {
	base: H,
	channel: Rc<OriginLockedChannel>,
	disposed: Cell<bool>,
}

impl<H: HubBase> SessionHub<H> {
	/// Binds `session` and `channel` through `provider`.
	pub(crate) fn bind<P>(
		provider: &P,
		session: P::Session,
		channel: OriginLockedChannel,
		hooks: ErrorHooks,
	) -> Self
	where
		P: SessionProvider<Hub = H> + ?Sized,
	{
		let channel = Rc::new(channel);
		let raw: Rc<dyn RawMessageChannel> = channel.clone();
		let base = provider.bind_hub(session, raw, hooks);
		debug!(role = ?channel.role(), peer_origin = channel.expected_origin(), "session hub bound");
		Self {
			base,
			channel,
			disposed: Cell::new(false),
		}
	}

	/// The session library's hub.
	pub fn base(&self) -> &H {
		&self.base
	}

	pub fn channel(&self) -> &Rc<OriginLockedChannel> {
		&self.channel
	}

	pub fn role(&self) -> ChannelRole {
		self.channel.role()
	}

	/// Origin of the other context; the only one messages are accepted from.
	pub fn peer_origin(&self) -> &str {
		self.channel.expected_origin()
	}

	pub fn is_disposed(&self) -> bool {
		self.disposed.get()
	}

	/// Disposes the hub base, then the channel. Subsequent calls do nothing.
	pub fn dispose(&self) {
		if self.disposed.replace(true) {
			return;
		}
		self.base.dispose();
		self.channel.dispose();
	}
}

impl<H: HubBase> std::fmt::Debug for SessionHub<H> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionHub")
			.field("channel", &self.channel)
			.field("disposed", &self.disposed.get())
			.finish()
	}
}
