//! Host-side bootstrap.
//!
//! # Flow
//!
//! 1. Ask the provider for a fresh session and its one-shot peer config
//! 2. Encode `serializedConfig|hostOrigin` into the target address fragment
//! 3. Launch the embedded context there and wait for it to load
//! 4. Lock a channel to the origin of the target address
//! 5. Bind session and channel into a [`SessionHub`]
//!
//! Nothing is retained when any step fails; a context that was mounted but
//! never became ready is destroyed before the error is returned.

use framelink_protocol::{attach_token, encode, origin_of};
use framelink_runtime::{
	ChannelSide, ContextLauncher, LocalContext, OriginLockedChannel, Result, launch, parse_address,
};
use tracing::debug;

use crate::config::InitiatorOptions;
use crate::hub::SessionHub;
use crate::session::{ErrorHooks, SessionProvider};

/// Launches an embedded context at `target_address` and returns a hub bound
/// to it.
///
/// The channel accepts messages only from the origin of `target_address`,
/// never from anything the embedded context later claims.
pub async fn create_initiator<P>(
	provider: &P,
	local: &dyn LocalContext,
	launcher: &dyn ContextLauncher,
	target_address: &str,
	options: &InitiatorOptions,
	hooks: ErrorHooks,
) -> Result<SessionHub<P::Hub>>
where
	P: SessionProvider + ?Sized,
{
	let target = parse_address(target_address)?;
	let peer_origin = origin_of(&target);

	let session = provider.new_random_session().await?;
	let peer_config = provider.generate_peer_config(&session).await?;
	let serialized = provider.serialize_peer_config(&peer_config)?;
	let launch_address = attach_token(&target, &encode(&serialized, &local.origin()));

	debug!(peer_origin = %peer_origin, "launching embedded context");
	let context = launch(launcher, &launch_address, options.ready_timeout()).await?;

	let channel = OriginLockedChannel::new(ChannelSide::Initiator { context }, local.port(), &peer_origin)
		.with_error_hook(hooks.on_message_handler_error.clone());

	Ok(SessionHub::bind(provider, session, channel, hooks))
}
