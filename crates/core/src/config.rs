//! Bootstrap settings.
//!
//! Both structs are plain data so an embedding application can pass them as
//! JSON. Error hooks are not data and are passed to the bootstraps separately.

use std::time::Duration;

use framelink_protocol::HandshakeToken;
use framelink_runtime::{Error, Result};
use serde::{Deserialize, Serialize};

/// Settings for [`create_initiator`](crate::create_initiator).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitiatorOptions {
	/// Give up on an embedded context that has not loaded after this many
	/// milliseconds. Unset means wait indefinitely.
	///
	/// Enforced with the tokio timer: setting it outside a tokio runtime with
	/// the time driver enabled panics. Browser callers go through
	/// `framelink-web`, which runs the timeout on a window timer instead.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ready_timeout_ms: Option<u64>,
}

impl InitiatorOptions {
	pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
		self.ready_timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
		self
	}

	pub fn ready_timeout(&self) -> Option<Duration> {
		self.ready_timeout_ms.map(Duration::from_millis)
	}
}

/// Settings for [`create_responder`](crate::create_responder).
///
/// Supplying both fields skips reading the launch address, for embedded
/// contexts that receive their handshake some other way. Supplying only one
/// is a usage error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponderSettings {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub peer_origin: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub serialized_peer_config: Option<String>,
}

impl ResponderSettings {
	/// Settings that bypass the launch address.
	pub fn direct(peer_origin: impl Into<String>, serialized_peer_config: impl Into<String>) -> Self {
		Self {
			peer_origin: Some(peer_origin.into()),
			serialized_peer_config: Some(serialized_peer_config.into()),
		}
	}

	/// The handshake supplied directly, if any. Empty strings count as absent.
	pub(crate) fn direct_token(&self) -> Result<Option<HandshakeToken>> {
		let origin = self.peer_origin.as_deref().filter(|s| !s.is_empty());
		let config = self.serialized_peer_config.as_deref().filter(|s| !s.is_empty());
		match (config, origin) {
			(Some(config), Some(origin)) => Ok(Some(HandshakeToken::new(config, origin))),
			(None, None) => Ok(None),
			(Some(_), None) => Err(Error::Usage(
				"serializedPeerConfig was given without peerOrigin".into(),
			)),
			(None, Some(_)) => Err(Error::Usage(
				"peerOrigin was given without serializedPeerConfig".into(),
			)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn options_deserialize_from_camel_case() {
		let options: InitiatorOptions = serde_json::from_str(r#"{"readyTimeoutMs": 2500}"#).unwrap();
		assert_eq!(options.ready_timeout(), Some(Duration::from_millis(2500)));

		let empty: InitiatorOptions = serde_json::from_str("{}").unwrap();
		assert_eq!(empty.ready_timeout(), None);
		assert_eq!(serde_json::to_string(&empty).unwrap(), "{}");
	}

	#[test]
	fn settings_deserialize_from_camel_case() {
		let settings: ResponderSettings = serde_json::from_str(
			r#"{"peerOrigin": "https://host.example", "serializedPeerConfig": "cfg"}"#,
		)
		.unwrap();
		assert_eq!(settings, ResponderSettings::direct("https://host.example", "cfg"));
	}

	#[test]
	fn direct_token_requires_both_fields() {
		assert_eq!(ResponderSettings::default().direct_token().unwrap(), None);

		let token = ResponderSettings::direct("https://host.example", "cfg")
			.direct_token()
			.unwrap()
			.unwrap();
		assert_eq!(token, HandshakeToken::new("cfg", "https://host.example"));

		let origin_only = ResponderSettings {
			peer_origin: Some("https://host.example".into()),
			serialized_peer_config: None,
		};
		assert!(matches!(origin_only.direct_token(), Err(Error::Usage(_))));

		let config_only = ResponderSettings {
			peer_origin: Some(String::new()),
			serialized_peer_config: Some("cfg".into()),
		};
		assert!(matches!(config_only.direct_token(), Err(Error::Usage(_))));
	}

	#[test]
	fn empty_fields_count_as_absent() {
		let settings = ResponderSettings::direct("", "");
		assert_eq!(settings.direct_token().unwrap(), None);
	}

	#[test]
	fn with_ready_timeout_round_trips() {
		let options = InitiatorOptions::default().with_ready_timeout(Duration::from_secs(3));
		assert_eq!(options.ready_timeout_ms, Some(3000));
	}
}
