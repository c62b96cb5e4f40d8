//! Moving handshake tokens in and out of launch-address fragments.

use std::borrow::Cow;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use url::Url;

use crate::error::HandshakeError;
use crate::token::{HandshakeToken, decode};

/// Characters escaped by ECMAScript `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'-')
	.remove(b'_')
	.remove(b'.')
	.remove(b'!')
	.remove(b'~')
	.remove(b'*')
	.remove(b'\'')
	.remove(b'(')
	.remove(b')');

/// Percent-encodes `value` the way `encodeURIComponent` does.
pub fn encode_component(value: &str) -> String {
	utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Percent-decodes `value` the way `decodeURIComponent` does.
///
/// Fails on a `%` not followed by two hex digits and on sequences that are
/// not UTF-8.
pub fn decode_component(value: &str) -> Result<Cow<'_, str>, HandshakeError> {
	if !escapes_well_formed(value.as_bytes()) {
		return Err(HandshakeError::InvalidEncoding);
	}
	percent_decode_str(value)
		.decode_utf8()
		.map_err(|_| HandshakeError::InvalidEncoding)
}

fn escapes_well_formed(bytes: &[u8]) -> bool {
	let mut i = 0;
	while i < bytes.len() {
		if bytes[i] == b'%' {
			match bytes.get(i + 1..i + 3) {
				Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i += 3,
				_ => return false,
			}
		} else {
			i += 1;
		}
	}
	true
}

/// Returns `address` with its fragment set to the percent-encoded `token`.
///
/// An existing fragment on `address` is replaced.
pub fn attach_token(address: &Url, token: &str) -> Url {
	let mut launch = address.clone();
	launch.set_fragment(Some(&encode_component(token)));
	launch
}

/// Decodes the token carried by a launch-address fragment.
///
/// Accepts the fragment with or without its leading `#`.
pub fn token_from_fragment(fragment: Option<&str>) -> Result<HandshakeToken, HandshakeError> {
	let raw = fragment
		.map(|f| f.strip_prefix('#').unwrap_or(f))
		.filter(|f| !f.is_empty())
		.ok_or(HandshakeError::MissingFragment)?;
	let decoded = decode_component(raw)?;
	if decoded.is_empty() {
		return Err(HandshakeError::MissingFragment);
	}
	decode(&decoded)
}
