//! Single-slot, in-process access token cache shared by every inbound request.
//!
//! The cache is intentionally not durable: a cold start performs one token exchange. Concurrent
//! requests that observe an expired slot may each refresh independently; the last writer wins.

// self
use crate::{_prelude::*, auth::AccessToken};

/// Thread-safe holder for the current access token.
#[derive(Debug, Default)]
pub struct TokenCache(RwLock<Option<AccessToken>>);
impl TokenCache {
	/// Returns `true` if a token is present and usable at the provided instant.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		self.0.read().as_ref().is_some_and(|token| token.is_usable_at(instant))
	}

	/// Returns `true` if a token is present and usable relative to the current clock.
	pub fn is_valid(&self) -> bool {
		self.is_valid_at(OffsetDateTime::now_utc())
	}

	/// Returns the cached token without checking validity.
	pub fn get(&self) -> Option<AccessToken> {
		self.0.read().clone()
	}

	/// Returns the cached token only if it is usable at the provided instant.
	pub fn usable_at(&self, instant: OffsetDateTime) -> Option<AccessToken> {
		self.0.read().as_ref().filter(|token| token.is_usable_at(instant)).cloned()
	}

	/// Overwrites the slot with a token expiring `ttl_seconds` after `issued_at`.
	pub fn set_at(
		&self,
		value: impl Into<String>,
		ttl_seconds: Option<i64>,
		issued_at: OffsetDateTime,
	) -> AccessToken {
		let token = AccessToken::with_ttl(value, ttl_seconds, issued_at);

		self.store(token.clone());

		token
	}

	/// Overwrites the slot with a token expiring `ttl_seconds` from now.
	pub fn set(&self, value: impl Into<String>, ttl_seconds: Option<i64>) -> AccessToken {
		self.set_at(value, ttl_seconds, OffsetDateTime::now_utc())
	}

	/// Replaces the slot with an already-built token.
	pub fn store(&self, token: AccessToken) {
		*self.0.write() = Some(token);
	}

	/// Clears the slot; calling it on an empty cache is a no-op.
	pub fn invalidate(&self) {
		self.0.write().take();
	}
}
