//! Zoho identity endpoint facade built on the `oauth2` crate.
//!
//! [`ZohoOAuthClient`] performs the `refresh_token` grant that keeps the relay supplied with
//! access tokens, plus the one-off consent helpers (authorization URL, authorization-code
//! exchange) used to obtain the long-lived refresh token in the first place.
//! [`TokenProvider`] is the seam the upsert flow depends on so tests can substitute stubs.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken,
	EndpointNotSet, EndpointSet, HttpClientError, RedirectUrl, RefreshToken, RequestTokenError,
	Scope, StandardRevocableToken, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse, BasicTokenType,
	},
};
use rand::distr::{Alphanumeric, SampleString};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, RefreshCredential, TokenSecret},
	error::{ConfigError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::ZohoEndpoints,
};

type ZohoClient<HasAuthUrl = EndpointNotSet, HasTokenUrl = EndpointNotSet> = Client<
	BasicErrorResponse,
	ZohoTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	HasAuthUrl,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	HasTokenUrl,
>;
type ConfiguredClient = ZohoClient<EndpointSet, EndpointSet>;

/// Scope requested by the consent helpers when the caller does not override it.
pub const DEFAULT_SCOPE: &str = "ZohoCRM.modules.ALL";

/// Boxed future returned by [`TokenProvider::fetch_access_token`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<AccessToken>> + 'a + Send>>;

/// Source of fresh access tokens.
///
/// Each call performs one round trip to the identity endpoint; callers consult the
/// [`TokenCache`](crate::auth::TokenCache) first and only fetch when it reports invalid.
pub trait TokenProvider
where
	Self: Send + Sync,
{
	/// Exchanges the long-lived credential for a new access token.
	fn fetch_access_token(&self) -> TokenFuture<'_>;
}

/// Token endpoint success body.
///
/// Zoho omits `token_type` on some grants and may report a non-positive `expires_in`; both are
/// tolerated here. A missing type is treated as `Bearer` and a non-positive lifetime as absent.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ZohoTokenResponse {
	access_token: oauth2::AccessToken,
	#[serde(default = "bearer", deserialize_with = "deserialize_token_type")]
	token_type: BasicTokenType,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default)]
	refresh_token: Option<RefreshToken>,
}
impl TokenResponse for ZohoTokenResponse {
	type TokenType = BasicTokenType;

	fn access_token(&self) -> &oauth2::AccessToken {
		&self.access_token
	}

	fn token_type(&self) -> &Self::TokenType {
		&self.token_type
	}

	fn expires_in(&self) -> Option<std::time::Duration> {
		self.expires_in
			.and_then(|secs| u64::try_from(secs).ok())
			.filter(|secs| *secs > 0)
			.map(std::time::Duration::from_secs)
	}

	fn refresh_token(&self) -> Option<&RefreshToken> {
		self.refresh_token.as_ref()
	}

	fn scopes(&self) -> Option<&Vec<Scope>> {
		None
	}
}

fn bearer() -> BasicTokenType {
	BasicTokenType::Bearer
}

fn deserialize_token_type<'de, D>(deserializer: D) -> Result<BasicTokenType, D::Error>
where
	D: serde::Deserializer<'de>,
{
	let token_type = Option::<String>::deserialize(deserializer)?;

	Ok(match token_type.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
		None | Some("") | Some("bearer") => BasicTokenType::Bearer,
		Some("mac") => BasicTokenType::Mac,
		Some(other) => BasicTokenType::Extension(other.to_owned()),
	})
}

/// Browser consent URL plus the `state` value embedded in it.
#[derive(Clone, Debug)]
pub struct AuthorizationRequest {
	/// URL the operator opens to grant consent.
	pub url: Url,
	/// Random `state` parameter echoed back on the redirect.
	pub state: String,
}

/// Tokens issued by the authorization-code exchange.
#[derive(Clone, Debug)]
pub struct AuthorizationGrant {
	/// Short-lived access token issued alongside the refresh token.
	pub access_token: AccessToken,
	/// Long-lived refresh token to store in configuration.
	pub refresh_token: TokenSecret,
}

/// `oauth2`-backed client for the Zoho accounts server.
pub struct ZohoOAuthClient {
	oauth_client: ConfiguredClient,
	http_client: ReqwestHttpClient,
}
impl ZohoOAuthClient {
	/// Builds a client posting credentials in the request body, as Zoho expects.
	pub fn new(
		endpoints: &ZohoEndpoints,
		client_id: &str,
		client_secret: Option<&TokenSecret>,
		redirect_uri: Option<&Url>,
		http_client: ReqwestHttpClient,
	) -> Result<Self> {
		let auth_url = AuthUrl::new(endpoints.authorization_url()?.to_string())
			.map_err(ConfigError::from)?;
		let token_url =
			TokenUrl::new(endpoints.token_url()?.to_string()).map_err(ConfigError::from)?;
		let mut oauth_client = ZohoClient::new(ClientId::new(client_id.to_owned()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_auth_type(AuthType::RequestBody);

		if let Some(secret) = client_secret {
			oauth_client =
				oauth_client.set_client_secret(ClientSecret::new(secret.expose().to_owned()));
		}
		if let Some(redirect) = redirect_uri {
			let redirect_url =
				RedirectUrl::new(redirect.to_string()).map_err(ConfigError::from)?;

			oauth_client = oauth_client.set_redirect_uri(redirect_url);
		}

		Ok(Self { oauth_client, http_client })
	}

	/// Performs the `refresh_token` grant.
	///
	/// Fails with [`Error::AuthProvider`] carrying the upstream status and body whenever the
	/// identity endpoint does not return a usable token response.
	pub async fn refresh_access_token(&self, refresh_token: &TokenSecret) -> Result<AccessToken> {
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.instrumented(meta.clone());
		let refresh = RefreshToken::new(refresh_token.expose().to_owned());
		let response = self
			.oauth_client
			.exchange_refresh_token(&refresh)
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;

		Ok(access_token_from(&response, OffsetDateTime::now_utc()))
	}

	/// Builds the consent URL for the offline authorization-code flow.
	pub fn authorization_url(&self, scopes: &[&str]) -> AuthorizationRequest {
		let state = Alphanumeric.sample_string(&mut rand::rng(), 32);
		let scope = if scopes.is_empty() { DEFAULT_SCOPE.to_owned() } else { scopes.join(",") };
		let (url, csrf) = self
			.oauth_client
			.authorize_url(|| CsrfToken::new(state))
			.add_extra_param("scope", scope)
			.add_extra_param("access_type", "offline")
			.add_extra_param("prompt", "consent")
			.url();

		AuthorizationRequest { url, state: csrf.secret().to_owned() }
	}

	/// Exchanges a one-time authorization code for a refresh token.
	pub async fn exchange_authorization_code(&self, code: &str) -> Result<AuthorizationGrant> {
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.instrumented(meta.clone());
		let response = self
			.oauth_client
			.exchange_code(AuthorizationCode::new(code.trim().to_owned()))
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;
		let refresh_token = response
			.refresh_token()
			.map(|secret| TokenSecret::new(secret.secret().to_owned()))
			.ok_or(ConfigError::MissingRefreshToken)?;

		Ok(AuthorizationGrant {
			access_token: access_token_from(&response, OffsetDateTime::now_utc()),
			refresh_token,
		})
	}
}
impl Debug for ZohoOAuthClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ZohoOAuthClient")
			.field("client_id", &self.oauth_client.client_id().as_str())
			.field("token_url", &self.oauth_client.token_uri().as_str())
			.finish()
	}
}

/// [`TokenProvider`] that refreshes against the Zoho accounts server.
#[derive(Debug)]
pub struct ZohoTokenProvider {
	client: ZohoOAuthClient,
	credential: RefreshCredential,
}
impl ZohoTokenProvider {
	/// Creates a provider for the credential's endpoints.
	pub fn new(
		endpoints: &ZohoEndpoints,
		credential: RefreshCredential,
		http_client: ReqwestHttpClient,
	) -> Result<Self> {
		let client = ZohoOAuthClient::new(
			endpoints,
			&credential.client_id,
			Some(&credential.client_secret),
			None,
			http_client,
		)?;

		Ok(Self { client, credential })
	}
}
impl TokenProvider for ZohoTokenProvider {
	fn fetch_access_token(&self) -> TokenFuture<'_> {
		const KIND: FlowKind = FlowKind::TokenRefresh;

		let span = FlowSpan::new(KIND, "fetch_access_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		Box::pin(span.instrument(async move {
			let result = self.client.refresh_access_token(&self.credential.refresh_token).await;

			match &result {
				Ok(token) => {
					tracing::debug!(expires_at = %token.expires_at, "access token refreshed");
					obs::record_flow_outcome(KIND, FlowOutcome::Success);
				},
				Err(err) => {
					tracing::warn!(region = %self.credential.region, error = %err, "access token refresh failed");
					obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				},
			}

			result
		}))
	}
}

fn access_token_from(response: &ZohoTokenResponse, issued_at: OffsetDateTime) -> AccessToken {
	let ttl = response.expires_in().and_then(|ttl| i64::try_from(ttl.as_secs()).ok());

	AccessToken::with_ttl(response.access_token().secret().to_owned(), ttl, issued_at)
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	let status = meta.and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => Error::AuthProvider {
			status: status.unwrap_or(400),
			body: serde_json::to_string(&response)
				.unwrap_or_else(|_| response.error().as_ref().to_owned()),
		},
		RequestTokenError::Request(error) => map_transport_error(error),
		RequestTokenError::Parse(_, body) => Error::AuthProvider {
			status: status.unwrap_or(502),
			body: String::from_utf8_lossy(&body).into_owned(),
		},
		RequestTokenError::Other(message) =>
			Error::AuthProvider { status: status.unwrap_or(502), body: message },
	}
}

fn map_transport_error(err: HttpClientError<ReqwestError>) -> Error {
	match err {
		HttpClientError::Reqwest(inner) => Error::from(*inner),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransportError::Io(std::io::Error::other(message)).into(),
		_ => TransportError::Io(std::io::Error::other("unknown HTTP client failure")).into(),
	}
}
