//! Runs one form submission through the relay against a local mock of the Zoho accounts and CRM
//! endpoints, showing the cached token being reused for the second submission.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use crm_relay::{
	auth::RefreshCredential,
	flows::ZohoRelay,
	http::ReqwestHttpClient,
	oauth::ZohoTokenProvider,
	provider::{Region, ZohoEndpoints},
	record::RecordMapper,
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/v2/token");
			then.status(200).json_body(json!({
				"access_token": "demo-access",
				"token_type": "Bearer",
				"expires_in": 3600,
			}));
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/crm/v2/Contacts/upsert");
			then.status(200).json_body(json!({
				"data": [{ "code": "SUCCESS", "action": "insert", "details": { "id": "1" } }]
			}));
		})
		.await;

	let base = Url::parse(&server.base_url())?;
	let endpoints = ZohoEndpoints::new(base.clone(), base);
	let http_client = ReqwestHttpClient::default();
	let credential = RefreshCredential::new("demo-client", "demo-secret", "demo-refresh", Region::Com);
	let provider = ZohoTokenProvider::new(&endpoints, credential, http_client.clone())?;
	let relay = ZohoRelay::new(
		http_client,
		Arc::new(provider),
		endpoints.upsert_url(ZohoEndpoints::CONTACTS_MODULE)?,
		RecordMapper::new("Demo"),
	);

	for email in ["ada@example.com", "grace@example.com"] {
		let outcome = relay
			.submit(email, &json!({ "name": "Demo User", "utm_source": "newsletter" }))
			.await?;

		println!("{email}: {} {}", outcome.action, outcome.detail);
	}

	// Both submissions share one cached access token.
	token_mock.assert_calls_async(1).await;

	Ok(())
}
