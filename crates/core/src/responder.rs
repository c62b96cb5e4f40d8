//! Embedded-side bootstrap.
//!
//! The embedded context learns its host from the handshake token in its own
//! launch address, or from [`ResponderSettings`] when both fields are set.

use framelink_protocol::{HandshakeError, HandshakeToken, token_from_fragment};
use framelink_runtime::{
	ChannelSide, Error, LocalContext, OriginLockedChannel, Result, parse_address,
};
use tracing::debug;

use crate::config::ResponderSettings;
use crate::hub::SessionHub;
use crate::session::{ErrorHooks, SessionProvider};

/// Reconstructs the host's session and returns a hub talking to the parent
/// context.
pub async fn create_responder<P>(
	provider: &P,
	local: &dyn LocalContext,
	settings: &ResponderSettings,
	hooks: ErrorHooks,
) -> Result<SessionHub<P::Hub>>
where
	P: SessionProvider + ?Sized,
{
	let token = match settings.direct_token()? {
		Some(token) => token,
		None => token_from_launch_address(local)?,
	};

	let peer_config = provider.deserialize_peer_config(&token.serialized_config)?;
	let session = provider.session_from_peer_config(peer_config).await?;

	let parent = local
		.parent()
		.ok_or_else(|| Error::Transport("context has no parent to talk to".into()))?;

	debug!(peer_origin = %token.origin, "responder channel locked");
	let channel = OriginLockedChannel::new(ChannelSide::Responder { parent }, local.port(), &token.origin)
		.with_error_hook(hooks.on_message_handler_error.clone());

	Ok(SessionHub::bind(provider, session, channel, hooks))
}

/// Reads the handshake token from the fragment of `local`'s launch address.
pub fn token_from_launch_address(local: &dyn LocalContext) -> Result<HandshakeToken> {
	let address = local.launch_address().ok_or(HandshakeError::MissingFragment)?;
	let url = parse_address(&address)?;
	Ok(token_from_fragment(url.fragment())?)
}
