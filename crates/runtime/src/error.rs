//! Error types for the framelink runtime.

use std::time::Duration;

use framelink_protocol::HandshakeError;
use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error raised by message callbacks and session providers.
pub type HandlerError = Box<dyn std::error::Error + 'static>;

/// Errors that can occur while bootstrapping or driving a channel.
#[derive(Debug, Error)]
pub enum Error {
	/// Handshake token missing or malformed.
	#[error("Configuration error: {0}")]
	Configuration(#[from] HandshakeError),

	/// Target or launch address could not be parsed.
	#[error("Invalid address '{address}': {source}")]
	InvalidAddress {
		address: String,
		#[source]
		source: url::ParseError,
	},

	/// Embedded context failed to load, or the peer is unreachable.
	#[error("Transport error: {0}")]
	Transport(String),

	/// Embedded context did not signal readiness in time.
	#[error("Timeout: embedded context not ready after {}ms", .0.as_millis())]
	Timeout(Duration),

	/// Bootstrap settings are incomplete or contradictory.
	#[error("Usage error: {0}")]
	Usage(String),

	/// The session provider reported a failure.
	#[error("Session error: {0}")]
	Session(#[source] HandlerError),

	/// The channel was disposed.
	#[error("Channel disposed")]
	Disposed,
}

impl Error {
	/// Wraps a session provider failure.
	pub fn session(err: impl Into<HandlerError>) -> Self {
		Error::Session(err.into())
	}

	pub(crate) fn invalid_address(address: &str, source: url::ParseError) -> Self {
		Error::InvalidAddress {
			address: address.to_string(),
			source,
		}
	}

	/// Returns true for handshake configuration errors.
	pub fn is_configuration(&self) -> bool {
		matches!(self, Error::Configuration(_))
	}

	/// Returns true if this is a readiness timeout.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout(_))
	}
}

/// Parses `address` as a URL, mapping failures to [`Error::InvalidAddress`].
pub fn parse_address(address: &str) -> Result<url::Url> {
	url::Url::parse(address).map_err(|e| Error::invalid_address(address, e))
}
