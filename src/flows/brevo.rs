//! Brevo companion relay: create the contact, or update it when Brevo reports a duplicate.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{BrevoError, ConfigError, ValidationError},
	flows::upsert::parse_body,
	http::ReqwestHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	record,
};

/// Default Brevo API base URL.
pub const DEFAULT_BREVO_API_URL: &str = "https://api.brevo.com/v3/";

const API_KEY_HEADER: &str = "api-key";
const DUPLICATE_CODE: &str = "duplicate_parameter";
const DUPLICATE_MESSAGE: &str = "already exists";

/// What the relay did with a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrevoOutcome {
	/// A new contact was created.
	Created,
	/// The contact already existed and was updated.
	Updated,
}

/// Validated subscription sent to Brevo.
#[derive(Clone, Debug, PartialEq)]
pub struct BrevoSubscription {
	/// Contact email.
	pub email: String,
	/// Contact attributes; `EMAIL` is always present.
	pub attributes: JsonMap<String, Value>,
	/// Lists the contact is added to, if any.
	pub list_ids: Option<Vec<u64>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateContact<'a> {
	email: &'a str,
	attributes: &'a JsonMap<String, Value>,
	update_enabled: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	list_ids: Option<&'a [u64]>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateContact<'a> {
	attributes: &'a JsonMap<String, Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	list_ids: Option<&'a [u64]>,
}

/// Client for the Brevo contacts API.
#[derive(Clone)]
pub struct BrevoRelay {
	http_client: ReqwestHttpClient,
	api_key: TokenSecret,
	base: Url,
	default_list_id: Option<u64>,
}
impl BrevoRelay {
	/// Creates a relay for the provided API base URL.
	pub fn new(http_client: ReqwestHttpClient, api_key: TokenSecret, base: Url) -> Self {
		let base = if base.path().ends_with('/') {
			base
		} else {
			let mut base = base;
			let path = format!("{}/", base.path());

			base.set_path(&path);

			base
		};

		Self { http_client, api_key, base, default_list_id: None }
	}

	/// Sets the list used when a submission names none.
	pub fn with_default_list(mut self, list_id: Option<u64>) -> Self {
		self.default_list_id = list_id;

		self
	}

	/// Validates the submission into a [`BrevoSubscription`].
	///
	/// Non-empty `list_ids` win over the configured default list.
	pub fn prepare(
		&self,
		email: &str,
		attributes: &Value,
		list_ids: Option<Vec<u64>>,
	) -> Result<BrevoSubscription> {
		record::validate_email(email)?;

		let mut attributes = match attributes {
			Value::Null => JsonMap::new(),
			Value::Object(map) => map.clone(),
			_ => return Err(ValidationError::AttributesNotObject.into()),
		};

		if attributes.get("EMAIL").is_none_or(is_falsy) {
			attributes.insert("EMAIL".into(), Value::String(email.to_owned()));
		}

		let list_ids = list_ids
			.filter(|ids| !ids.is_empty())
			.or_else(|| self.default_list_id.map(|id| vec![id]));

		Ok(BrevoSubscription { email: email.to_owned(), attributes, list_ids })
	}

	/// Validates and syncs a submission.
	pub async fn subscribe(
		&self,
		email: &str,
		attributes: &Value,
		list_ids: Option<Vec<u64>>,
	) -> Result<BrevoOutcome> {
		let subscription = self.prepare(email, attributes, list_ids)?;

		self.sync(&subscription).await
	}

	/// Creates the contact, falling back to an update when Brevo reports a duplicate.
	pub async fn sync(&self, subscription: &BrevoSubscription) -> Result<BrevoOutcome> {
		const KIND: FlowKind = FlowKind::BrevoSync;

		let span = FlowSpan::new(KIND, "sync");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.create_or_update(subscription)).await;

		match &result {
			Ok(outcome) => {
				tracing::info!(?outcome, "Brevo contact synced");
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			Err(err) => {
				tracing::warn!(error = %err, "Brevo contact sync failed");
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	async fn create_or_update(&self, subscription: &BrevoSubscription) -> Result<BrevoOutcome> {
		let list_ids = subscription.list_ids.as_deref();
		let body = CreateContact {
			email: &subscription.email,
			attributes: &subscription.attributes,
			update_enabled: true,
			list_ids,
		};
		let response = self
			.http_client
			.post(self.base.join("contacts").map_err(ConfigError::from)?)
			.header(API_KEY_HEADER, self.api_key.expose())
			.header(reqwest::header::ACCEPT, "application/json")
			.json(&body)
			.send()
			.await?;
		let status = response.status();

		if status.is_success() {
			return Ok(BrevoOutcome::Created);
		}

		let detail = parse_body(&response.text().await?);

		if !is_duplicate(status, &detail) {
			return Err(BrevoError::CreateFailed { status: status.as_u16(), detail }.into());
		}

		tracing::debug!("Brevo contact exists; updating instead");

		let response = self
			.http_client
			.put(self.contact_url(&subscription.email)?)
			.header(API_KEY_HEADER, self.api_key.expose())
			.header(reqwest::header::ACCEPT, "application/json")
			.json(&UpdateContact { attributes: &subscription.attributes, list_ids })
			.send()
			.await?;

		if response.status().is_success() {
			Ok(BrevoOutcome::Updated)
		} else {
			let detail = response.text().await.unwrap_or_default();

			Err(BrevoError::UpdateFailed { detail }.into())
		}
	}

	fn contact_url(&self, email: &str) -> Result<Url> {
		let mut url = self.base.join("contacts/").map_err(ConfigError::from)?;

		url.path_segments_mut()
			.map_err(|_| ConfigError::InvalidEnv {
				key: "BREVO_API_URL",
				reason: "URL cannot be a base".into(),
			})?
			.pop_if_empty()
			.push(email);

		Ok(url)
	}
}
impl Debug for BrevoRelay {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BrevoRelay")
			.field("base", &self.base.as_str())
			.field("api_key", &self.api_key)
			.field("default_list_id", &self.default_list_id)
			.finish()
	}
}

fn is_duplicate(status: StatusCode, detail: &Value) -> bool {
	if status != StatusCode::BAD_REQUEST {
		return false;
	}

	let code = detail.get("code").and_then(Value::as_str);
	let message = detail.get("message").and_then(Value::as_str).unwrap_or_default();

	code == Some(DUPLICATE_CODE) || message.to_lowercase().contains(DUPLICATE_MESSAGE)
}

fn is_falsy(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::Bool(flag) => !flag,
		Value::String(text) => text.is_empty(),
		Value::Number(number) => number.as_f64().is_some_and(|n| n == 0.0),
		Value::Array(_) | Value::Object(_) => false,
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn relay() -> BrevoRelay {
		BrevoRelay::new(
			ReqwestHttpClient::default(),
			TokenSecret::new("xkeysib-test"),
			Url::parse("https://api.brevo.com/v3").expect("Brevo base should parse."),
		)
	}

	#[test]
	fn email_attribute_is_forced_when_absent() {
		let subscription = relay()
			.prepare("jane@example.com", &json!({ "FIRSTNAME": "Jane", "EMAIL": "" }), None)
			.expect("Subscription should validate.");

		assert_eq!(subscription.attributes["EMAIL"], "jane@example.com");
		assert_eq!(subscription.attributes["FIRSTNAME"], "Jane");
		assert_eq!(subscription.list_ids, None);

		let explicit = relay()
			.prepare("jane@example.com", &json!({ "EMAIL": "alias@example.com" }), None)
			.expect("Subscription should validate.");

		assert_eq!(explicit.attributes["EMAIL"], "alias@example.com");
	}

	#[test]
	fn body_lists_win_over_configured_default() {
		let relay = relay().with_default_list(Some(7));
		let from_body = relay
			.prepare("jane@example.com", &Value::Null, Some(vec![3, 4]))
			.expect("Subscription should validate.");
		let from_default = relay
			.prepare("jane@example.com", &Value::Null, Some(Vec::new()))
			.expect("Subscription should validate.");

		assert_eq!(from_body.list_ids, Some(vec![3, 4]));
		assert_eq!(from_default.list_ids, Some(vec![7]));
	}

	#[test]
	fn invalid_submissions_are_rejected() {
		assert!(matches!(
			relay().prepare("nope", &Value::Null, None),
			Err(Error::Validation(ValidationError::InvalidEmail))
		));
		assert!(matches!(
			relay().prepare("jane@example.com", &json!([1]), None),
			Err(Error::Validation(ValidationError::AttributesNotObject))
		));
	}

	#[test]
	fn duplicates_are_detected_by_code_or_message() {
		assert!(is_duplicate(StatusCode::BAD_REQUEST, &json!({ "code": "duplicate_parameter" })));
		assert!(is_duplicate(
			StatusCode::BAD_REQUEST,
			&json!({ "code": "invalid_parameter", "message": "Contact already exists" })
		));
		assert!(!is_duplicate(StatusCode::CONFLICT, &json!({ "code": "duplicate_parameter" })));
		assert!(!is_duplicate(StatusCode::BAD_REQUEST, &json!("already exists")));
	}

	#[test]
	fn contact_urls_encode_the_email() {
		let url = relay().contact_url("jane/news#1@example.com").expect("Contact URL should build.");

		assert_eq!(url.as_str(), "https://api.brevo.com/v3/contacts/jane%2Fnews%231@example.com");
		assert!(!format!("{:?}", relay()).contains("xkeysib-test"));
	}
}
