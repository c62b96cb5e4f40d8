//! Error types for handshake token decoding.

use thiserror::Error;

/// Failures while reading a handshake token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
	/// The token has no `|` between the serialized config and the origin.
	#[error("missing separator between config and origin")]
	MissingDelimiter,

	/// The launch address carries no fragment, or an empty one.
	#[error("missing peer session config in launch address")]
	MissingFragment,

	/// The fragment does not percent-decode to UTF-8.
	#[error("peer session config is not valid percent-encoded UTF-8")]
	InvalidEncoding,
}
