//! Redacted secrets and short-lived access tokens.

// self
use crate::_prelude::*;

/// Redacted secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner secret value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Bearer credential minted by the identity endpoint together with its absolute expiry.
///
/// Tokens are replaced wholesale on every refresh and never mutated in place.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
	/// Opaque bearer credential.
	pub value: TokenSecret,
	/// Instant after which the token must be considered invalid.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Margin subtracted from the expiry so in-flight calls never race the provider's clock.
	pub const SAFETY_MARGIN: Duration = Duration::seconds(15);
	/// Lifetime assumed when the provider omits `expires_in` or reports a non-positive value.
	pub const FALLBACK_TTL: Duration = Duration::seconds(3_000);

	/// Creates a token with an absolute expiry.
	pub fn new(value: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { value: TokenSecret::new(value), expires_at }
	}

	/// Creates a token that expires `ttl_seconds` after `issued_at`, falling back to
	/// [`Self::FALLBACK_TTL`] when the TTL is absent or non-positive.
	pub fn with_ttl(
		value: impl Into<String>,
		ttl_seconds: Option<i64>,
		issued_at: OffsetDateTime,
	) -> Self {
		let ttl = match ttl_seconds {
			Some(secs) if secs > 0 => Duration::seconds(secs),
			_ => Self::FALLBACK_TTL,
		};

		Self::new(value, issued_at + ttl)
	}

	/// Returns `true` while `instant` is before the expiry minus [`Self::SAFETY_MARGIN`].
	pub fn is_usable_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at - Self::SAFETY_MARGIN
	}

	/// Formats the `Authorization` header value expected by the CRM API.
	pub fn authorization_header(&self) -> String {
		format!("Zoho-oauthtoken {}", self.value.expose())
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("value", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn access_token_debug_hides_value() {
		let token = AccessToken::new("1000.abc", datetime!(2025-01-01 00:00 UTC));

		assert!(!format!("{token:?}").contains("1000.abc"));
		assert_eq!(token.authorization_header(), "Zoho-oauthtoken 1000.abc");
	}

	#[test]
	fn missing_or_non_positive_ttl_uses_fallback() {
		let issued = datetime!(2025-01-01 00:00 UTC);

		for ttl in [None, Some(0), Some(-30)] {
			let token = AccessToken::with_ttl("t", ttl, issued);

			assert_eq!(token.expires_at, issued + AccessToken::FALLBACK_TTL);
		}

		assert_eq!(
			AccessToken::with_ttl("t", Some(3_600), issued).expires_at,
			issued + Duration::hours(1)
		);
	}

	#[test]
	fn usability_honors_safety_margin() {
		let issued = datetime!(2025-01-01 00:00 UTC);
		let token = AccessToken::with_ttl("t", Some(60), issued);

		assert!(token.is_usable_at(issued));
		assert!(token.is_usable_at(issued + Duration::seconds(44)));
		assert!(!token.is_usable_at(issued + Duration::seconds(45)));
	}
}
