//! Browser bindings for framelink.
//!
//! [`WindowContext`] exposes the current window's location, parent and
//! `message` events; [`IframeLauncher`] mounts embedded contexts as hidden
//! iframes. [`create_initiator_hub`] and [`create_responder_hub`] wire both
//! into the framelink bootstraps for the global `window`.

mod iframe;
mod js;
mod window;

pub use iframe::IframeLauncher;
pub use window::{WindowContext, WindowPort};

use framelink::{
    create_initiator, create_responder, ErrorHooks, InitiatorOptions, ResponderSettings, Result,
    SessionHub, SessionProvider,
};

/// Launches `target_address` in a hidden iframe of the current window and
/// returns the host's hub.
///
/// `options.ready_timeout_ms` is enforced with a window timer.
pub async fn create_initiator_hub<P>(
    provider: &P,
    target_address: &str,
    options: &InitiatorOptions,
    hooks: ErrorHooks,
) -> Result<SessionHub<P::Hub>>
where
    P: SessionProvider + ?Sized,
{
    let local = WindowContext::current()?;
    let mut launcher = IframeLauncher::new(local.window())?;
    if let Some(limit) = options.ready_timeout() {
        launcher = launcher.with_ready_timeout(limit);
    }
    create_initiator(
        provider,
        &local,
        &launcher,
        target_address,
        &InitiatorOptions::default(),
        hooks,
    )
    .await
}

/// Bootstraps the current window as the embedded side.
pub async fn create_responder_hub<P>(
    provider: &P,
    settings: &ResponderSettings,
    hooks: ErrorHooks,
) -> Result<SessionHub<P::Hub>>
where
    P: SessionProvider + ?Sized,
{
    let local = WindowContext::current()?;
    create_responder(provider, &local, settings, hooks).await
}
