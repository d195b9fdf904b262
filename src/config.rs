//! Process configuration loaded from environment variables (and an optional `.env` file).
//!
//! | Variable                 | Default                      |
//! |--------------------------|------------------------------|
//! | `HOST`                   | `0.0.0.0`                    |
//! | `PORT`                   | `3000`                       |
//! | `ALLOWED_ORIGIN`         | empty (any origin)           |
//! | `RATE_LIMIT_MAX`         | `30`                         |
//! | `RATE_LIMIT_WINDOW_SECS` | `60`                         |
//! | `UPSTREAM_TIMEOUT_SECS`  | `15`                         |
//! | `ZOHO_REGION`            | `com`                        |
//! | `ZOHO_ACCOUNTS_URL`      | regional accounts domain     |
//! | `ZOHO_API_URL`           | regional API domain          |
//! | `ZOHO_CLIENT_ID`         | required                     |
//! | `ZOHO_CLIENT_SECRET`     | required                     |
//! | `ZOHO_REFRESH_TOKEN`     | required by the relay        |
//! | `ZOHO_LEAD_SOURCE`       | `Website`                    |
//! | `ZOHO_REDIRECT_URI`      | unset                        |
//! | `BREVO_API_KEY`          | unset (Brevo route disabled) |
//! | `BREVO_LIST_ID`          | unset                        |
//! | `BREVO_API_URL`          | `https://api.brevo.com/v3/`  |

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	auth::{RefreshCredential, TokenSecret},
	error::ConfigError,
	flows::DEFAULT_BREVO_API_URL,
	provider::{Region, ZohoEndpoints},
	record::DEFAULT_LEAD_SOURCE,
};

/// Complete relay configuration.
#[derive(Clone, Debug)]
pub struct RelayConfig {
	/// Listener and middleware settings.
	pub server: ServerConfig,
	/// Zoho credential and endpoints.
	pub zoho: ZohoConfig,
	/// Brevo settings; `None` disables the Brevo route.
	pub brevo: Option<BrevoConfig>,
	/// Bound applied to every outbound call.
	pub upstream_timeout: StdDuration,
}
impl RelayConfig {
	/// Loads `.env` (if present) and reads the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		load_dotenv();

		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Parses the configuration from an arbitrary key lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let env = Env(lookup);

		Ok(Self {
			server: ServerConfig::read(&env)?,
			zoho: ZohoConfig::read(&env)?,
			brevo: BrevoConfig::read(&env)?,
			upstream_timeout: StdDuration::from_secs(env.parse_or("UPSTREAM_TIMEOUT_SECS", 15_u64)?),
		})
	}
}

/// HTTP listener settings.
#[derive(Clone, Debug)]
pub struct ServerConfig {
	/// Bind address.
	pub host: String,
	/// Bind port.
	pub port: u16,
	/// Single origin allowed by CORS; `None` allows any origin.
	pub allowed_origin: Option<String>,
	/// Requests allowed per client per window.
	pub rate_limit_max: u32,
	/// Rate-limit window length.
	pub rate_limit_window: StdDuration,
}
impl ServerConfig {
	/// Returns `host:port`.
	pub fn bind_addr(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}

	fn read<F>(env: &Env<F>) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		Ok(Self {
			host: env.optional("HOST").unwrap_or_else(|| "0.0.0.0".into()),
			port: env.parse_or("PORT", 3_000_u16)?,
			allowed_origin: env.optional("ALLOWED_ORIGIN"),
			rate_limit_max: env.parse_or("RATE_LIMIT_MAX", 30_u32)?,
			rate_limit_window: StdDuration::from_secs(env.parse_or("RATE_LIMIT_WINDOW_SECS", 60_u64)?),
		})
	}
}
impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			host: "0.0.0.0".into(),
			port: 3_000,
			allowed_origin: None,
			rate_limit_max: 30,
			rate_limit_window: StdDuration::from_secs(60),
		}
	}
}

/// OAuth client registration shared by the relay and the consent tooling.
#[derive(Clone, Debug)]
pub struct ZohoClientConfig {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Data center of the account.
	pub region: Region,
	/// Identity and API base URLs.
	pub endpoints: ZohoEndpoints,
	/// Redirect URI registered for the consent flow.
	pub redirect_uri: Option<Url>,
}
impl ZohoClientConfig {
	/// Reads only the client registration (no refresh token required).
	pub fn from_env() -> Result<Self, ConfigError> {
		load_dotenv();

		Self::read(&Env(|key: &str| std::env::var(key).ok()))
	}

	fn read<F>(env: &Env<F>) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let region = match env.optional("ZOHO_REGION") {
			Some(value) => value.parse()?,
			None => Region::default(),
		};
		let regional = ZohoEndpoints::for_region(region)?;
		let endpoints = ZohoEndpoints::new(
			env.url("ZOHO_ACCOUNTS_URL")?.unwrap_or(regional.accounts),
			env.url("ZOHO_API_URL")?.unwrap_or(regional.api),
		);

		Ok(Self {
			client_id: env.required("ZOHO_CLIENT_ID")?,
			client_secret: TokenSecret::new(env.required("ZOHO_CLIENT_SECRET")?),
			region,
			endpoints,
			redirect_uri: env.url("ZOHO_REDIRECT_URI")?,
		})
	}
}

/// Zoho relay settings.
#[derive(Clone, Debug)]
pub struct ZohoConfig {
	/// OAuth client registration.
	pub client: ZohoClientConfig,
	/// Long-lived refresh token.
	pub refresh_token: TokenSecret,
	/// `Lead_Source` applied when submissions carry none.
	pub lead_source: String,
}
impl ZohoConfig {
	/// Builds the immutable refresh credential.
	pub fn credential(&self) -> RefreshCredential {
		RefreshCredential {
			client_id: self.client.client_id.clone(),
			client_secret: self.client.client_secret.clone(),
			refresh_token: self.refresh_token.clone(),
			region: self.client.region,
		}
	}

	fn read<F>(env: &Env<F>) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		Ok(Self {
			client: ZohoClientConfig::read(env)?,
			refresh_token: TokenSecret::new(env.required("ZOHO_REFRESH_TOKEN")?),
			lead_source: env.optional("ZOHO_LEAD_SOURCE").unwrap_or_else(|| DEFAULT_LEAD_SOURCE.into()),
		})
	}
}

/// Brevo relay settings.
#[derive(Clone, Debug)]
pub struct BrevoConfig {
	/// API key sent in the `api-key` header.
	pub api_key: TokenSecret,
	/// List used when a submission names none.
	pub list_id: Option<u64>,
	/// API base URL.
	pub base: Url,
}
impl BrevoConfig {
	fn read<F>(env: &Env<F>) -> Result<Option<Self>, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let Some(api_key) = env.optional("BREVO_API_KEY") else {
			return Ok(None);
		};
		let list_id = match env.optional("BREVO_LIST_ID") {
			Some(_) => Some(env.parse_or("BREVO_LIST_ID", 0_u64)?),
			None => None,
		};
		let base = match env.url("BREVO_API_URL")? {
			Some(url) => url,
			None => Url::parse(DEFAULT_BREVO_API_URL)?,
		};

		Ok(Some(Self { api_key: TokenSecret::new(api_key), list_id, base }))
	}
}

struct Env<F>(F);
impl<F> Env<F>
where
	F: Fn(&str) -> Option<String>,
{
	fn optional(&self, key: &str) -> Option<String> {
		(self.0)(key).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
	}

	fn required(&self, key: &'static str) -> Result<String, ConfigError> {
		self.optional(key).ok_or(ConfigError::MissingEnv { key })
	}

	fn parse_or<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
	where
		T: FromStr,
		T::Err: Display,
	{
		match self.optional(key) {
			Some(value) => value
				.parse()
				.map_err(|err: T::Err| ConfigError::InvalidEnv { key, reason: err.to_string() }),
			None => Ok(default),
		}
	}

	fn url(&self, key: &'static str) -> Result<Option<Url>, ConfigError> {
		self.optional(key)
			.map(|value| {
				Url::parse(&value)
					.map_err(|err| ConfigError::InvalidEnv { key, reason: err.to_string() })
			})
			.transpose()
	}
}

fn load_dotenv() {
	match dotenvy::dotenv() {
		Ok(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
		Err(err) if err.not_found() => {},
		Err(err) => tracing::warn!(error = %err, "ignoring unreadable .env file"),
	}
}
