//! framelink runtime - origin-locked channels over an injected transport port
//!
//! This crate provides the transport half of framelink:
//!
//! - **Ports**: [`MessagePort`], [`PeerTarget`] and [`LocalContext`], the
//!   platform's cross-context messaging expressed as injected capabilities
//! - **Raw channel**: [`OriginLockedChannel`], implementing the
//!   [`RawMessageChannel`] capability set with origin filtering and listener
//!   lifecycle
//! - **Launcher**: [`ContextLauncher`] / [`EmbeddedContext`] and [`launch`],
//!   mounting a hidden embedded context and awaiting its readiness
//! - **Memory platform**: [`memory`], an in-process implementation of all of
//!   the above
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │    framelink     │  Bootstrap + SessionHub
//! └────────┬─────────┘
//!          │ RawMessageChannel
//! ┌────────▼─────────┐
//! │ framelink-runtime│  This crate
//! │  ┌────────────┐  │
//! │  │ Channel    │  │  Origin lock, listeners, dispose
//! │  └────────────┘  │
//! │  ┌────────────┐  │
//! │  │ Port       │  │  subscribe / unsubscribe / post
//! │  └────────────┘  │
//! │  ┌────────────┐  │
//! │  │ Launcher   │  │  Embedded context lifecycle
//! │  └────────────┘  │
//! └──────────────────┘
//! ```
//!
//! Everything here is single-threaded: shared state is `Rc` + `RefCell` and
//! async traits are `?Send`, matching an event-loop embedding platform.

pub mod channel;
pub mod error;
pub mod launcher;
pub mod listeners;
pub mod memory;
pub mod port;

pub use channel::{ChannelRole, ChannelSide, OriginLockedChannel, RawMessageChannel};
pub use error::{Error, HandlerError, Result, parse_address};
pub use launcher::{ContextLauncher, EmbeddedContext, launch};
pub use listeners::{
	ErrorHook, ListenerRegistry, Liveness, MessageCallback, error_hook, message_callback,
};
pub use port::{
	InboundMessage, LocalContext, MessagePort, PeerTarget, PortListener, SubscriptionId,
	next_subscription_id,
};
