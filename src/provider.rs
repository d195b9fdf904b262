//! Zoho data-center regions and the endpoint set derived from them.
//!
//! Every Zoho account lives in one data center; the accounts (identity) domain and the CRM API
//! domain must come from the same region or token exchanges succeed while API calls fail with
//! `INVALID_OAUTHTOKEN`. Unset regions default to [`Region::Com`]; unknown values are rejected.

// self
use crate::{_prelude::*, error::ConfigError};

/// Zoho data center selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
	/// European Union data center.
	Eu,
	#[default]
	/// United States data center.
	Com,
	/// India data center.
	In,
	/// Australia data center.
	Au,
	/// Japan data center.
	Jp,
}
impl Region {
	/// Returns the selector label used in configuration.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Eu => "eu",
			Self::Com => "com",
			Self::In => "in",
			Self::Au => "au",
			Self::Jp => "jp",
		}
	}

	/// Identity (accounts) base URL for the region.
	pub const fn accounts_base(self) -> &'static str {
		match self {
			Self::Eu => "https://accounts.zoho.eu",
			Self::Com => "https://accounts.zoho.com",
			Self::In => "https://accounts.zoho.in",
			Self::Au => "https://accounts.zoho.com.au",
			Self::Jp => "https://accounts.zoho.jp",
		}
	}

	/// CRM API base URL for the region.
	pub const fn api_base(self) -> &'static str {
		match self {
			Self::Eu => "https://www.zohoapis.eu",
			Self::Com => "https://www.zohoapis.com",
			Self::In => "https://www.zohoapis.in",
			Self::Au => "https://www.zohoapis.com.au",
			Self::Jp => "https://www.zohoapis.jp",
		}
	}
}
impl Display for Region {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Region {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"eu" => Ok(Self::Eu),
			"com" | "us" => Ok(Self::Com),
			"in" => Ok(Self::In),
			"au" | "com.au" => Ok(Self::Au),
			"jp" => Ok(Self::Jp),
			_ => Err(ConfigError::UnknownRegion(s.to_owned())),
		}
	}
}

/// Accounts + API base URLs used by the relay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZohoEndpoints {
	/// Identity base URL (token and authorization endpoints live here).
	pub accounts: Url,
	/// CRM API base URL.
	pub api: Url,
}
impl ZohoEndpoints {
	/// CRM module that receives web-form submissions.
	pub const CONTACTS_MODULE: &'static str = "Contacts";

	/// Builds the endpoint set from explicit base URLs (used for overrides and tests).
	pub fn new(accounts: Url, api: Url) -> Self {
		Self { accounts: with_trailing_slash(accounts), api: with_trailing_slash(api) }
	}

	/// Builds the endpoint set for a region's fixed domain pair.
	pub fn for_region(region: Region) -> Result<Self, ConfigError> {
		Ok(Self::new(Url::parse(region.accounts_base())?, Url::parse(region.api_base())?))
	}

	/// `POST` target for refresh and authorization-code exchanges.
	pub fn token_url(&self) -> Result<Url, ConfigError> {
		Ok(self.accounts.join("oauth/v2/token")?)
	}

	/// Browser-facing consent URL.
	pub fn authorization_url(&self) -> Result<Url, ConfigError> {
		Ok(self.accounts.join("oauth/v2/auth")?)
	}

	/// Bulk upsert endpoint for the provided CRM module.
	pub fn upsert_url(&self, module: &str) -> Result<Url, ConfigError> {
		Ok(self.api.join(&format!("crm/v2/{module}/upsert"))?)
	}
}

fn with_trailing_slash(mut url: Url) -> Url {
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	url
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn region_parsing_is_case_insensitive_and_strict() {
		assert_eq!("EU".parse::<Region>().expect("EU should parse."), Region::Eu);
		assert_eq!(" com ".parse::<Region>().expect("com should parse."), Region::Com);
		assert_eq!(Region::default(), Region::Com);
		assert!(matches!("mars".parse::<Region>(), Err(ConfigError::UnknownRegion(value)) if value == "mars"));
	}

	#[test]
	fn regional_endpoints_share_a_data_center() {
		let endpoints =
			ZohoEndpoints::for_region(Region::Au).expect("Regional endpoints should parse.");

		assert_eq!(
			endpoints.token_url().expect("Token URL should join.").as_str(),
			"https://accounts.zoho.com.au/oauth/v2/token"
		);
		assert_eq!(
			endpoints.upsert_url(ZohoEndpoints::CONTACTS_MODULE).expect("Upsert URL should join.").as_str(),
			"https://www.zohoapis.com.au/crm/v2/Contacts/upsert"
		);
	}

	#[test]
	fn override_base_paths_are_preserved() {
		let endpoints = ZohoEndpoints::new(
			Url::parse("http://127.0.0.1:9000/accounts").expect("Accounts fixture should parse."),
			Url::parse("http://127.0.0.1:9000/api/").expect("API fixture should parse."),
		);

		assert_eq!(
			endpoints.token_url().expect("Token URL should join.").as_str(),
			"http://127.0.0.1:9000/accounts/oauth/v2/token"
		);
		assert_eq!(
			endpoints.authorization_url().expect("Auth URL should join.").as_str(),
			"http://127.0.0.1:9000/accounts/oauth/v2/auth"
		);
		assert_eq!(
			endpoints.upsert_url("Leads").expect("Upsert URL should join.").as_str(),
			"http://127.0.0.1:9000/api/crm/v2/Leads/upsert"
		);
	}
}
