//! Embedded execution context lifecycle.
//!
//! A [`ContextLauncher`] mounts a hidden embedded context that exists purely
//! as a messaging endpoint. [`launch`] mounts it and waits for its readiness
//! signal, which is the only suspension point of an initiator bootstrap.

use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use framelink_protocol::origin_of;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::port::PeerTarget;

/// Handle to a mounted embedded context.
///
/// Owned exclusively by whoever mounted it until [`destroy`](Self::destroy),
/// which consumes the handle.
#[async_trait(?Send)]
pub trait EmbeddedContext {
	/// Resolves once the context has finished loading.
	///
	/// Fails with [`Error::Transport`] if loading fails.
	async fn ready(&mut self) -> Result<()>;

	/// Message target for the context.
	fn peer(&self) -> Rc<dyn PeerTarget>;

	/// Address the context was mounted at.
	fn address(&self) -> &str;

	/// Removes the context and frees its resources.
	fn destroy(self: Box<Self>);
}

/// Mounts embedded contexts.
pub trait ContextLauncher {
	/// Creates a zero-footprint embedded context and starts loading `address`.
	fn mount(&self, address: &Url) -> Result<Box<dyn EmbeddedContext>>;
}

/// Mounts a context at `address` and waits until it is ready.
///
/// Only the origin of `address` is logged; the fragment carries the token.
///
/// With a `timeout`, readiness that takes longer fails with
/// [`Error::Timeout`]. On any failure the context is destroyed before the
/// error is returned.
///
/// # Panics
///
/// The timeout runs on the tokio timer, so passing `Some(timeout)` outside a
/// tokio runtime with the time driver enabled panics. Launchers running on
/// another event loop should enforce readiness timeouts themselves and pass
/// `None`.
pub async fn launch(
	launcher: &dyn ContextLauncher,
	address: &Url,
	timeout: Option<Duration>,
) -> Result<Box<dyn EmbeddedContext>> {
	let mut context = launcher.mount(address)?;

	let outcome = match timeout {
		Some(limit) => tokio::time::timeout(limit, context.ready())
			.await
			.unwrap_or(Err(Error::Timeout(limit))),
		None => context.ready().await,
	};

	match outcome {
		Ok(()) => {
			debug!(origin = %origin_of(address), "embedded context ready");
			Ok(context)
		}
		Err(err) => {
			warn!(origin = %origin_of(address), error = %err, "embedded context failed to load");
			context.destroy();
			Err(err)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::{LoadBehavior, MemoryBus, MemoryLauncher};

	fn child_address() -> Url {
		Url::parse("https://child.example/app#token").unwrap()
	}

	#[tokio::test]
	async fn launch_returns_ready_context() {
		let bus = MemoryBus::new();
		let host = bus.open_context("https://host.example/").unwrap();
		let launcher = MemoryLauncher::new(&host);

		let context = launch(&launcher, &child_address(), None).await.unwrap();
		assert_eq!(context.address(), "https://child.example/app#token");
		assert!(launcher.last_launched().unwrap().is_alive());
	}

	#[tokio::test]
	async fn failed_load_destroys_context() {
		let bus = MemoryBus::new();
		let host = bus.open_context("https://host.example/").unwrap();
		let launcher = MemoryLauncher::new(&host).with_behavior(LoadBehavior::Fail("net::ERR_FAILED".into()));

		let err = launch(&launcher, &child_address(), None)
			.await
			.err()
			.expect("load failure should be reported");
		assert!(matches!(err, Error::Transport(_)));
		assert!(!launcher.last_launched().unwrap().is_alive());
		assert_eq!(bus.live_contexts(), 1);
	}

	#[tokio::test]
	async fn readiness_timeout_destroys_context() {
		let bus = MemoryBus::new();
		let host = bus.open_context("https://host.example/").unwrap();
		let launcher = MemoryLauncher::new(&host).with_behavior(LoadBehavior::Never);

		let err = launch(&launcher, &child_address(), Some(Duration::from_millis(20)))
			.await
			.err()
			.expect("readiness should time out");
		assert!(err.is_timeout());
		assert!(!launcher.last_launched().unwrap().is_alive());
	}
}
