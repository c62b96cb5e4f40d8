//! One-shot handshake token codec.
//!
//! A token is the serialized peer session config followed by the host origin,
//! joined by [`DELIMITER`]. Decoding splits at the *first* delimiter, so a
//! config that itself contains `|` is truncated and the remainder leaks into
//! the origin. The session library's serialization is not known to exclude
//! the character, so this is left as-is and covered by tests.

use serde::{Deserialize, Serialize};

use crate::error::HandshakeError;

/// Separator between the serialized config and the origin.
pub const DELIMITER: char = '|';

/// A decoded handshake token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeToken {
	/// Opaque peer session config as produced by the session library.
	pub serialized_config: String,
	/// Origin of the context that minted the token.
	pub origin: String,
}

impl HandshakeToken {
	pub fn new(serialized_config: impl Into<String>, origin: impl Into<String>) -> Self {
		Self {
			serialized_config: serialized_config.into(),
			origin: origin.into(),
		}
	}

	/// Encodes this token with [`encode`].
	pub fn encode(&self) -> String {
		encode(&self.serialized_config, &self.origin)
	}
}

/// Joins `serialized_config` and `origin` with [`DELIMITER`].
///
/// `serialized_config` must not contain the delimiter; this is not checked.
pub fn encode(serialized_config: &str, origin: &str) -> String {
	let mut token = String::with_capacity(serialized_config.len() + origin.len() + 1);
	token.push_str(serialized_config);
	token.push(DELIMITER);
	token.push_str(origin);
	token
}

/// Splits a token at the first [`DELIMITER`].
///
/// The origin is taken verbatim, including any further delimiters.
pub fn decode(token: &str) -> Result<HandshakeToken, HandshakeError> {
	let (serialized_config, origin) = token
		.split_once(DELIMITER)
		.ok_or(HandshakeError::MissingDelimiter)?;
	Ok(HandshakeToken::new(serialized_config, origin))
}
