//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::store::PersistentStore;

/// Store key holding a development override of [`EngineConfig::server_url`].
pub const SERVER_URL_OVERRIDE_KEY: &str = "connstr";

/// Configuration for a [`crate::SyncEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
	/// Voting server endpoint handed to the channel implementation.
	#[serde(default = "default_server_url")]
	pub server_url: String,
	/// Fixed reconnection delay for the channel implementation, in milliseconds.
	#[serde(default = "default_reconnection_delay_ms")]
	pub reconnection_delay_ms: u64,
	/// Discovery poll interval in milliseconds.
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// Store key of the cached API key.
	#[serde(default = "default_credential_cache_key")]
	pub credential_cache_key: String,
	/// Host path of the profile page that shows the API key.
	#[serde(default = "default_profile_path")]
	pub profile_path: String,
	/// Allows [`SERVER_URL_OVERRIDE_KEY`] to redirect the channel.
	#[serde(default)]
	pub dev_mode: bool,
}

fn default_server_url() -> String {
	"https://dv.seinopsys.hu:2096/".to_owned()
}

fn default_reconnection_delay_ms() -> u64 {
	10_000
}

fn default_poll_interval_ms() -> u64 {
	3_000
}

fn default_credential_cache_key() -> String {
	"apikey".to_owned()
}

fn default_profile_path() -> String {
	"/users/edit".to_owned()
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			server_url: default_server_url(),
			reconnection_delay_ms: default_reconnection_delay_ms(),
			poll_interval_ms: default_poll_interval_ms(),
			credential_cache_key: default_credential_cache_key(),
			profile_path: default_profile_path(),
			dev_mode: false,
		}
	}
}

impl EngineConfig {
	/// Parses a JSON configuration document; absent fields take their defaults.
	pub fn from_json(json: &str) -> Result<Self> {
		Ok(serde_json::from_str(json)?)
	}

	/// Discovery poll interval.
	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms.max(1))
	}

	/// Channel reconnection delay.
	pub fn reconnection_delay(&self) -> Duration {
		Duration::from_millis(self.reconnection_delay_ms)
	}

	/// Endpoint to connect to, honoring the development override.
	pub async fn resolve_server_url(&self, store: &dyn PersistentStore) -> Result<String> {
		if self.dev_mode
			&& let Some(url) = store.get(SERVER_URL_OVERRIDE_KEY).await?
			&& !url.trim().is_empty()
		{
			tracing::debug!(url = %url, "using development server override");
			return Ok(url);
		}
		Ok(self.server_url.clone())
	}
}
