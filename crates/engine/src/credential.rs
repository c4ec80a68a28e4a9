//! API key resolution.
//!
//! The key is scraped from the signed-in user's profile page once and cached
//! in the [`PersistentStore`]. A cached key is trusted without verification;
//! the server's auth response is the only check.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use crate::config::EngineConfig;
use crate::store::PersistentStore;
use crate::{Error, Result};

static API_KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"<h3>API Key</h3><p>Your API key is <strong>([A-Za-z\d-]+)</strong>").expect("API key pattern is valid")
});

/// Host page facilities needed to find the user's credential.
#[async_trait]
pub trait HostPage: Send + Sync {
	/// The page's own signed-in indicator.
	fn is_signed_in(&self) -> bool;

	/// Fetches a same-origin path and returns the response body.
	async fn fetch_text(&self, path: &str) -> Result<String>;
}

/// Resolves and caches the calling user's API key.
pub struct CredentialSource<P> {
	page: P,
	store: Arc<dyn PersistentStore>,
	cache_key: String,
	profile_path: String,
}

impl<P: HostPage> CredentialSource<P> {
	/// Creates a source using the cache key and profile path from `config`.
	pub fn new(page: P, store: Arc<dyn PersistentStore>, config: &EngineConfig) -> Self {
		Self {
			page,
			store,
			cache_key: config.credential_cache_key.clone(),
			profile_path: config.profile_path.clone(),
		}
	}

	/// Returns the user's API key.
	///
	/// # Errors
	///
	/// [`Error::NotSignedIn`] when the page reports no user (the cached key is
	/// cleared first), [`Error::CredentialMissing`] when the profile page cannot
	/// be fetched or does not contain a key.
	pub async fn resolve(&self) -> Result<String> {
		if !self.page.is_signed_in() {
			self.store.remove(&self.cache_key).await?;
			return Err(Error::NotSignedIn);
		}

		if let Some(cached) = self.store.get(&self.cache_key).await?
			&& !cached.is_empty()
		{
			tracing::trace!("using cached API key");
			return Ok(cached);
		}

		let body = match self.page.fetch_text(&self.profile_path).await {
			Ok(body) => body,
			Err(e) => {
				tracing::debug!(path = %self.profile_path, error = %e, "profile fetch failed");
				return Err(Error::CredentialMissing);
			}
		};
		let key = extract_api_key(&body).ok_or(Error::CredentialMissing)?;
		self.store.set(&self.cache_key, key.clone()).await?;
		tracing::debug!("cached API key from profile page");
		Ok(key)
	}
}

/// Extracts the API key from profile page markup.
pub fn extract_api_key(markup: &str) -> Option<String> {
	API_KEY_PATTERN.captures(markup).map(|c| c[1].to_owned())
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;
	use crate::store::MemoryStore;

	const PROFILE: &str = "<div><h3>API Key</h3><p>Your API key is <strong>aB3-xY9</strong></p></div>";

	#[derive(Clone)]
	struct StubPage {
		signed_in: bool,
		body: Option<&'static str>,
		fetches: Arc<AtomicUsize>,
	}

	impl StubPage {
		fn new(signed_in: bool, body: Option<&'static str>) -> Self {
			Self {
				signed_in,
				body,
				fetches: Arc::default(),
			}
		}
	}

	#[async_trait]
	impl HostPage for StubPage {
		fn is_signed_in(&self) -> bool {
			self.signed_in
		}

		async fn fetch_text(&self, path: &str) -> Result<String> {
			self.fetches.fetch_add(1, Ordering::SeqCst);
			self.body.map(str::to_owned).ok_or_else(|| Error::Fetch {
				path: path.to_owned(),
				reason: "HTTP 500".into(),
			})
		}
	}

	fn source(page: &StubPage, store: &MemoryStore) -> CredentialSource<StubPage> {
		CredentialSource::new(page.clone(), Arc::new(store.clone()), &EngineConfig::default())
	}

	#[tokio::test]
	async fn signed_out_clears_cache() {
		let store = MemoryStore::new();
		store.insert("apikey", "stale");
		let page = StubPage::new(false, Some(PROFILE));

		assert!(matches!(source(&page, &store).resolve().await, Err(Error::NotSignedIn)));
		assert!(store.value("apikey").is_none());
		assert_eq!(page.fetches.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn cached_key_skips_fetch() {
		let store = MemoryStore::new();
		store.insert("apikey", "cached-key");
		let page = StubPage::new(true, Some(PROFILE));

		assert_eq!(source(&page, &store).resolve().await.unwrap(), "cached-key");
		assert_eq!(page.fetches.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn cache_miss_fetches_and_caches() {
		let store = MemoryStore::new();
		let page = StubPage::new(true, Some(PROFILE));
		let source = source(&page, &store);

		assert_eq!(source.resolve().await.unwrap(), "aB3-xY9");
		assert_eq!(store.value("apikey").as_deref(), Some("aB3-xY9"));
		assert_eq!(source.resolve().await.unwrap(), "aB3-xY9");
		assert_eq!(page.fetches.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn unmatched_markup_or_failed_fetch_is_missing() {
		let store = MemoryStore::new();
		let changed = StubPage::new(true, Some("<h3>Key</h3>"));
		assert!(matches!(source(&changed, &store).resolve().await, Err(Error::CredentialMissing)));

		let failing = StubPage::new(true, None);
		assert!(matches!(source(&failing, &store).resolve().await, Err(Error::CredentialMissing)));
		assert!(store.is_empty());
	}
}
