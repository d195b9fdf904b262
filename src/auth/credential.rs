//! Long-lived refresh credential supplied by configuration.

// self
use crate::{_prelude::*, auth::TokenSecret, provider::Region};

/// Client identity, secret, and refresh token used to mint access tokens.
///
/// Immutable for the lifetime of the process; token providers only read it.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshCredential {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Offline refresh token obtained through the manual consent flow.
	pub refresh_token: TokenSecret,
	/// Data center that issued the refresh token.
	pub region: Region,
}
impl RefreshCredential {
	/// Creates a credential for the provided region.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		refresh_token: impl Into<String>,
		region: Region,
	) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			refresh_token: TokenSecret::new(refresh_token),
			region,
		}
	}
}
impl Debug for RefreshCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCredential")
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.field("refresh_token", &self.refresh_token)
			.field("region", &self.region)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn debug_output_redacts_secrets() {
		let credential = RefreshCredential::new("1000.CLIENT", "shh", "1000.refresh", Region::Eu);
		let rendered = format!("{credential:?}");

		assert!(rendered.contains("1000.CLIENT"));
		assert!(!rendered.contains("shh"));
		assert!(!rendered.contains("1000.refresh"));
	}
}
