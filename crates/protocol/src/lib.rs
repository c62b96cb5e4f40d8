//! Wire format for the framelink handshake.
//!
//! Before the external secure-session library takes over, the only thing the
//! two contexts exchange is a one-shot token in the embedded context's launch
//! address:
//!
//! ```text
//! https://child.example/app#<encodeURIComponent(serializedPeerConfig + "|" + hostOrigin)>
//! ```
//!
//! # Main Types
//!
//! - [`HandshakeToken`] - Decoded `{serialized_config, origin}` pair
//! - [`HandshakeError`] - Decoding failures, reported as configuration errors upstream
//!
//! The [`fragment`] module moves tokens in and out of launch addresses and the
//! [`origin`] module derives the origin string a channel is locked to.

pub mod error;
pub mod fragment;
pub mod origin;
pub mod token;

pub use error::HandshakeError;
pub use fragment::{attach_token, decode_component, encode_component, token_from_fragment};
pub use origin::origin_of;
pub use token::{DELIMITER, HandshakeToken, decode, encode};
