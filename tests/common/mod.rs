//! Shared fixtures for integration tests.

#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
use time::{Duration, OffsetDateTime};
// self
use crm_relay::{
	auth::{AccessToken, RefreshCredential, TokenSecret},
	flows::{BrevoRelay, ZohoRelay},
	http::ReqwestHttpClient,
	oauth::{TokenFuture, TokenProvider, ZohoTokenProvider},
	provider::{Region, ZohoEndpoints},
	record::RecordMapper,
	url::Url,
};

pub const UPSERT_PATH: &str = "/crm/v2/Contacts/upsert";
pub const TOKEN_PATH: &str = "/oauth/v2/token";
pub const CLIENT_ID: &str = "1000.CLIENTID";
pub const CLIENT_SECRET: &str = "client-secret";
pub const REFRESH_TOKEN: &str = "1000.refresh-token";
pub const BREVO_KEY: &str = "xkeysib-test";

/// Token provider issuing `token-1`, `token-2`, ... and counting calls.
#[derive(Debug, Default)]
pub struct StubTokenProvider {
	calls: AtomicUsize,
}
impl StubTokenProvider {
	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl TokenProvider for StubTokenProvider {
	fn fetch_access_token(&self) -> TokenFuture<'_> {
		Box::pin(async move {
			let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

			Ok(AccessToken::with_ttl(format!("token-{call}"), Some(3_600), OffsetDateTime::now_utc()))
		})
	}
}

pub fn endpoints(server: &MockServer) -> ZohoEndpoints {
	let base = Url::parse(&server.base_url()).expect("Mock server URL should parse.");

	ZohoEndpoints::new(base.clone(), base)
}

pub fn credential() -> RefreshCredential {
	RefreshCredential::new(CLIENT_ID, CLIENT_SECRET, REFRESH_TOKEN, Region::Com)
}

pub fn zoho_provider(server: &MockServer) -> ZohoTokenProvider {
	ZohoTokenProvider::new(&endpoints(server), credential(), ReqwestHttpClient::default())
		.expect("Token provider should build.")
}

pub fn zoho_relay(server: &MockServer, provider: Arc<dyn TokenProvider>) -> ZohoRelay {
	let upsert_url = endpoints(server)
		.upsert_url(ZohoEndpoints::CONTACTS_MODULE)
		.expect("Upsert URL should join.");

	ZohoRelay::new(ReqwestHttpClient::default(), provider, upsert_url, RecordMapper::default())
}

pub fn brevo_relay(server: &MockServer, list_id: Option<u64>) -> BrevoRelay {
	let base = Url::parse(&server.url("/v3/")).expect("Mock Brevo URL should parse.");

	BrevoRelay::new(ReqwestHttpClient::default(), TokenSecret::new(BREVO_KEY), base)
		.with_default_list(list_id)
}

pub fn token_body(access_token: &str, expires_in: Option<i64>) -> Value {
	let mut body = json!({
		"access_token": access_token,
		"api_domain": "https://www.zohoapis.com",
		"token_type": "Bearer",
	});

	if let Some(expires_in) = expires_in {
		body["expires_in"] = json!(expires_in);
	}

	body
}

pub fn upsert_success(action: &str) -> Value {
	let duplicate_field = if action == "update" { json!("Email") } else { Value::Null };

	json!({
		"data": [{
			"code": "SUCCESS",
			"duplicate_field": duplicate_field,
			"action": action,
			"details": { "id": "5725767000000524157" },
			"message": "record saved",
			"status": "success",
		}]
	})
}

pub fn bearer(token: &str) -> String {
	format!("Zoho-oauthtoken {token}")
}

pub fn expired_token(value: &str) -> AccessToken {
	AccessToken::new(value, OffsetDateTime::now_utc() - Duration::minutes(1))
}
