//! Origin strings as compared by the origin lock.

use url::Url;

/// Returns the ASCII serialization of `url`'s origin, e.g. `https://host.example:8443`.
///
/// Default ports are omitted; opaque origins serialize as `"null"`.
pub fn origin_of(url: &Url) -> String {
	url.origin().ascii_serialization()
}
