//! Command-line surface of the `zoho-oauth` helper used to obtain the refresh token once.

// crates.io
use clap::{Parser, Subcommand};
// self
use crate::{
	_prelude::*,
	config::ZohoClientConfig,
	http::ReqwestHttpClient,
	oauth::ZohoOAuthClient,
};

/// Manual Zoho consent tooling.
#[derive(Debug, Parser)]
#[command(name = "zoho-oauth", version, about = "Obtain a Zoho CRM refresh token for the relay.")]
pub struct OAuthCli {
	/// Action to perform.
	#[command(subcommand)]
	pub command: OAuthCommand,
}

/// `zoho-oauth` subcommands.
#[derive(Debug, Subcommand)]
pub enum OAuthCommand {
	/// Print the browser consent URL.
	AuthUrl {
		/// Redirect URI registered for the client.
		#[arg(long, env = "ZOHO_REDIRECT_URI")]
		redirect_uri: Option<Url>,
		/// Scopes to request (comma separated or repeated).
		#[arg(long, value_delimiter = ',')]
		scope: Vec<String>,
	},
	/// Exchange a one-time authorization code for a refresh token.
	Exchange {
		/// Code shown on the callback page or in the relay logs.
		code: String,
		/// Redirect URI used when the code was issued.
		#[arg(long, env = "ZOHO_REDIRECT_URI")]
		redirect_uri: Option<Url>,
	},
}
impl OAuthCli {
	/// Runs the command and returns the text to print.
	pub async fn run(
		self,
		config: &ZohoClientConfig,
		http_client: ReqwestHttpClient,
	) -> Result<String> {
		match self.command {
			OAuthCommand::AuthUrl { redirect_uri, scope } => {
				let client = client(config, redirect_uri.as_ref(), http_client)?;
				let scopes = scope.iter().map(String::as_str).collect::<Vec<_>>();
				let request = client.authorization_url(&scopes);

				Ok(format!(
					"Open this URL, grant access, then run `zoho-oauth exchange <CODE>`:\n{}\nstate: {}",
					request.url, request.state
				))
			},
			OAuthCommand::Exchange { code, redirect_uri } => {
				let client = client(config, redirect_uri.as_ref(), http_client)?;
				let grant = client.exchange_authorization_code(&code).await?;

				Ok(format!(
					"ZOHO_REFRESH_TOKEN={}\n(access token valid until {})",
					grant.refresh_token.expose(),
					grant.access_token.expires_at
				))
			},
		}
	}
}

fn client(
	config: &ZohoClientConfig,
	redirect_uri: Option<&Url>,
	http_client: ReqwestHttpClient,
) -> Result<ZohoOAuthClient> {
	ZohoOAuthClient::new(
		&config.endpoints,
		&config.client_id,
		Some(&config.client_secret),
		redirect_uri.or(config.redirect_uri.as_ref()),
		http_client,
	)
}
