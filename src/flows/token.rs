//! Cache-first access token acquisition.

// self
use crate::{_prelude::*, auth::AccessToken, flows::ZohoRelay};

impl ZohoRelay {
	/// Returns the cached token when it is still usable, otherwise fetches and caches a new one.
	pub async fn access_token(&self) -> Result<AccessToken> {
		if let Some(token) = self.cache.usable_at(OffsetDateTime::now_utc()) {
			tracing::trace!("reusing cached access token");

			return Ok(token);
		}

		self.fetch_and_cache().await
	}

	/// Drops the cached token and fetches a replacement unconditionally.
	pub async fn force_refresh(&self) -> Result<AccessToken> {
		self.cache.invalidate();

		self.fetch_and_cache().await
	}

	async fn fetch_and_cache(&self) -> Result<AccessToken> {
		match self.token_provider.fetch_access_token().await {
			Ok(token) => {
				self.cache.store(token.clone());

				Ok(token)
			},
			Err(err) => {
				if matches!(err, Error::AuthProvider { .. }) {
					self.cache.invalidate();
				}

				Err(err)
			},
		}
	}
}
