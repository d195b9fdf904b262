//! Route handlers.

// crates.io
use axum::{
	Json,
	extract::{Query, State, rejection::JsonRejection},
	response::IntoResponse,
};
use serde_json::json;
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	flows::BrevoOutcome,
	record,
	server::{AppState, error::ApiError},
};

/// Body accepted by the Zoho submission routes.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ContactSubmission {
	/// Primary email; non-string values are stringified before validation.
	#[serde(default)]
	pub email: Value,
	/// Free-form attribute bag.
	#[serde(default)]
	pub attributes: Value,
	/// Anti-bot decoy that humans leave empty.
	#[serde(default)]
	pub honeypot: Option<Value>,
}

/// Body accepted by the Brevo subscription route.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
	/// Contact email.
	#[serde(default)]
	pub email: Value,
	/// Contact attributes.
	#[serde(default)]
	pub attributes: Value,
	/// Target lists; empty or absent falls back to the configured list.
	#[serde(default)]
	pub list_ids: Option<Vec<u64>>,
	/// Anti-bot decoy that humans leave empty.
	#[serde(default)]
	pub honeypot: Option<Value>,
}

/// Query parameters delivered to the consent redirect.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CallbackParams {
	/// One-time authorization code.
	pub code: Option<String>,
	/// Echoed `state` value.
	pub state: Option<String>,
	/// Error reported by the identity provider.
	pub error: Option<String>,
	/// Accounts server that issued the code (multi-DC accounts).
	#[serde(rename = "accounts-server")]
	pub accounts_server: Option<String>,
}

#[derive(Debug, Serialize)]
struct Health {
	status: &'static str,
	#[serde(with = "time::serde::rfc3339")]
	ts: OffsetDateTime,
}

/// `GET /health`.
pub async fn health() -> impl IntoResponse {
	Json(Health { status: "ok", ts: OffsetDateTime::now_utc() })
}

/// `POST /api/zoho/contact` and `POST /api/zoho/lead`.
pub async fn zoho_submit(
	State(state): State<AppState>,
	payload: Result<Json<ContactSubmission>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
	let Json(submission) = payload?;

	record::check_honeypot(submission.honeypot.as_ref()).map_err(Error::from)?;

	let outcome =
		state.zoho.submit(&email_text(&submission.email), &submission.attributes).await?;

	Ok(Json(json!({ "ok": true, "action": outcome.action, "zoho": outcome.detail })))
}

/// `POST /api/brevo/subscribe`.
pub async fn brevo_subscribe(
	State(state): State<AppState>,
	payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
	let Json(request) = payload?;

	record::check_honeypot(request.honeypot.as_ref()).map_err(Error::from)?;

	let Some(brevo) = state.brevo.as_ref() else {
		return Err(ApiError::Relay(ConfigError::MissingEnv { key: "BREVO_API_KEY" }.into()));
	};
	let outcome =
		brevo.subscribe(&email_text(&request.email), &request.attributes, request.list_ids).await?;

	Ok(Json(match outcome {
		BrevoOutcome::Created => json!({ "ok": true }),
		BrevoOutcome::Updated => json!({ "ok": true, "updated": true }),
	}))
}

/// `GET /zoho/callback`: landing page for the manual consent flow.
pub async fn zoho_callback(Query(params): Query<CallbackParams>) -> impl IntoResponse {
	if let Some(error) = params.error {
		tracing::warn!(%error, "consent flow returned an error");

		return (StatusCode::BAD_REQUEST, format!("Authorization failed: {error}"));
	}

	let Some(code) = params.code else {
		return (StatusCode::BAD_REQUEST, "Missing authorization code.".to_owned());
	};

	tracing::info!(
		%code,
		state = params.state.as_deref().unwrap_or_default(),
		accounts_server = params.accounts_server.as_deref().unwrap_or_default(),
		"received authorization code; exchange it with `zoho-oauth exchange`"
	);

	(
		StatusCode::OK,
		"Authorization code received. It is valid for a few minutes: run \
		 `zoho-oauth exchange <CODE>` on the server and store the refresh token as \
		 ZOHO_REFRESH_TOKEN."
			.to_owned(),
	)
}

fn email_text(email: &Value) -> String {
	match email {
		Value::Null => String::new(),
		Value::String(text) => text.clone(),
		other => other.to_string(),
	}
}
