//! framelink: origin-locked channels between a host and an embedded context
//!
//! A host context launches a hidden embedded context with a one-shot
//! handshake token in its launch address. Both sides end up with a
//! [`SessionHub`]: an external secure-session library's hub bound to an
//! [`OriginLockedChannel`] that only accepts messages from the other side's
//! origin.
//!
//! # Examples
//!
//! ## Host side
//!
//! ```ignore
//! use framelink::{ErrorHooks, InitiatorOptions, create_initiator};
//!
//! let hub = create_initiator(
//!     &provider,
//!     &local,
//!     &launcher,
//!     "https://child.example/app",
//!     &InitiatorOptions::default(),
//!     ErrorHooks::new().with_message_handler_error(|e| eprintln!("{e}")),
//! )
//! .await?;
//! ```
//!
//! ## Embedded side
//!
//! ```ignore
//! use framelink::{ErrorHooks, ResponderSettings, create_responder};
//!
//! let hub = create_responder(&provider, &local, &ResponderSettings::default(), ErrorHooks::new()).await?;
//! assert_eq!(hub.peer_origin(), "https://host.example");
//! ```
//!
//! `provider` implements [`SessionProvider`]; `local` and `launcher` come
//! from the platform bindings (`framelink-web` in a browser,
//! [`memory`] in-process).

pub mod config;
pub mod hub;
pub mod initiator;
pub mod responder;
pub mod session;

pub use config::{InitiatorOptions, ResponderSettings};
pub use framelink_protocol::{HandshakeError, HandshakeToken};
pub use framelink_runtime::{
	ChannelRole, ContextLauncher, EmbeddedContext, Error, ErrorHook, HandlerError, InboundMessage,
	LocalContext, MessageCallback, MessagePort, OriginLockedChannel, PeerTarget, RawMessageChannel,
	Result, error_hook, memory, message_callback,
};
pub use hub::{HubBase, SessionHub};
pub use initiator::create_initiator;
pub use responder::{create_responder, token_from_launch_address};
pub use session::{ErrorHooks, SessionProvider};
