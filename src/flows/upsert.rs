//! CRM upsert orchestration with a single retry after an authorization failure.
//!
//! [`ZohoRelay::upsert`] obtains a token (cache first), posts a one-record batch to the bulk
//! upsert endpoint keyed on `Email`, and walks a two-state machine: a `401` on the first attempt
//! invalidates the cache, forces one fresh token, and retries; a `401` on the retry is terminal.
//! Any other non-success status is returned as [`Error::UpstreamUpsert`] without retrying.

mod metrics;

pub use metrics::UpsertMetrics;

// crates.io
use reqwest::header::AUTHORIZATION;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	flows::ZohoRelay,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	record::ContactRecord,
};

/// Field the CRM uses to decide between insert and update.
pub const DUPLICATE_CHECK_FIELD: &str = "Email";
/// Automation trigger requested on every upsert.
pub const WORKFLOW_TRIGGER: &str = "workflow";

/// Action the CRM reported for the upserted record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpsertAction {
	/// A new record was created.
	Insert,
	/// An existing record matched on `Email` and was updated.
	Update,
	/// The CRM reported an action this relay does not model.
	Reported(String),
	/// The response did not carry a recognizable action.
	Unknown,
}
impl UpsertAction {
	/// Sentinel surfaced when the response shape is unexpected.
	pub const UNKNOWN_SENTINEL: &'static str = "ok";

	/// Returns the wire label of the action.
	pub fn as_str(&self) -> &str {
		match self {
			Self::Insert => "insert",
			Self::Update => "update",
			Self::Reported(action) => action,
			Self::Unknown => Self::UNKNOWN_SENTINEL,
		}
	}

	fn parse(action: Option<&str>) -> Self {
		match action.map(str::trim) {
			None | Some("") => Self::Unknown,
			Some(action) if action.eq_ignore_ascii_case("insert") => Self::Insert,
			Some(action) if action.eq_ignore_ascii_case("update") => Self::Update,
			Some(action) => Self::Reported(action.to_owned()),
		}
	}
}
impl Display for UpsertAction {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl Serialize for UpsertAction {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_str(self.as_str())
	}
}

/// Successful upsert result returned to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
	/// Action the CRM reported, or [`UpsertAction::Unknown`].
	pub action: UpsertAction,
	/// Per-record result (`data[0]`), or the whole body when that entry is missing.
	pub detail: Value,
}
impl UpsertOutcome {
	/// Interprets a 2xx upsert response body without ever failing.
	pub fn from_response(body: Value) -> Self {
		let batch = match serde_path_to_error::deserialize::<_, BatchResponse>(&body) {
			Ok(batch) => batch,
			Err(err) => {
				tracing::warn!(path = %err.path(), error = %err.inner(), "unexpected upsert response shape");

				return Self { action: UpsertAction::Unknown, detail: body };
			},
		};
		let Some(entry) = batch.data.into_iter().next() else {
			return Self { action: UpsertAction::Unknown, detail: body };
		};

		if entry.status.as_deref().is_some_and(|status| status.eq_ignore_ascii_case("error")) {
			tracing::warn!(code = ?entry.code, "CRM accepted the batch but flagged the record");
		}

		Self { action: UpsertAction::parse(entry.action.as_deref()), detail: entry.raw }
	}
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
	data: Vec<BatchEntry>,
}

#[derive(Debug)]
struct BatchEntry {
	action: Option<String>,
	status: Option<String>,
	code: Option<String>,
	raw: Value,
}
impl<'de> Deserialize<'de> for BatchEntry {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let raw = JsonMap::<String, Value>::deserialize(deserializer)?;
		let text = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_owned);

		Ok(Self {
			action: text("action"),
			status: text("status"),
			code: text("code"),
			raw: Value::Object(raw),
		})
	}
}

#[derive(Debug, Serialize)]
struct UpsertPayload<'a> {
	data: [&'a ContactRecord; 1],
	duplicate_check_fields: [&'static str; 1],
	trigger: [&'static str; 1],
}
impl<'a> UpsertPayload<'a> {
	fn single(record: &'a ContactRecord) -> Self {
		Self {
			data: [record],
			duplicate_check_fields: [DUPLICATE_CHECK_FIELD],
			trigger: [WORKFLOW_TRIGGER],
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Attempt {
	First,
	Retry,
}

enum AttemptResult {
	Accepted(Value),
	Unauthorized(Value),
	Rejected { status: u16, detail: Value },
}

impl ZohoRelay {
	/// Validates and maps a submission, then upserts it.
	///
	/// Validation failures return before any network call is made.
	pub async fn submit(&self, email: &str, attributes: &Value) -> Result<UpsertOutcome> {
		let record = self.mapper.build_record(email, attributes)?;

		self.upsert(&record).await
	}

	/// Upserts a mapped record, retrying exactly once when the CRM reports `401`.
	pub async fn upsert(&self, record: &ContactRecord) -> Result<UpsertOutcome> {
		const KIND: FlowKind = FlowKind::Upsert;

		let span = FlowSpan::new(KIND, "upsert");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.upsert_metrics.record_attempt();

		let result = span.instrument(self.run_upsert(record)).await;

		match &result {
			Ok(outcome) => {
				tracing::info!(action = %outcome.action, "contact upserted");
				self.upsert_metrics.record_success();
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			Err(err) => {
				tracing::warn!(error = %err, "contact upsert failed");
				self.upsert_metrics.record_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	async fn run_upsert(&self, record: &ContactRecord) -> Result<UpsertOutcome> {
		let payload = UpsertPayload::single(record);
		let mut attempt = Attempt::First;

		loop {
			let token = match attempt {
				Attempt::First => self.access_token().await?,
				Attempt::Retry => self.force_refresh().await?,
			};

			match self.send_upsert(&token, &payload).await? {
				AttemptResult::Accepted(body) => return Ok(UpsertOutcome::from_response(body)),
				AttemptResult::Unauthorized(detail) => {
					self.cache.invalidate();

					match attempt {
						Attempt::First => {
							tracing::info!("CRM rejected the access token; retrying once");
							self.upsert_metrics.record_auth_retry();

							attempt = Attempt::Retry;
						},
						Attempt::Retry =>
							return Err(Error::UpstreamUpsert {
								status: StatusCode::UNAUTHORIZED.as_u16(),
								detail,
							}),
					}
				},
				AttemptResult::Rejected { status, detail } =>
					return Err(Error::UpstreamUpsert { status, detail }),
			}
		}
	}

	async fn send_upsert(
		&self,
		token: &AccessToken,
		payload: &UpsertPayload<'_>,
	) -> Result<AttemptResult> {
		let response = self
			.http_client
			.post(self.upsert_url.clone())
			.header(AUTHORIZATION, token.authorization_header())
			.json(payload)
			.send()
			.await?;
		let status = response.status();
		let body = parse_body(&response.text().await?);

		tracing::debug!(status = status.as_u16(), "upsert response received");

		Ok(if status == StatusCode::UNAUTHORIZED {
			AttemptResult::Unauthorized(body)
		} else if status.is_success() {
			AttemptResult::Accepted(body)
		} else {
			AttemptResult::Rejected { status: status.as_u16(), detail: body }
		})
	}
}

/// Parses an upstream body as JSON, falling back to the raw text as a JSON string.
pub(crate) fn parse_body(text: &str) -> Value {
	serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::record::RecordMapper;

	#[test]
	fn outcome_reads_first_batch_entry() {
		let outcome = UpsertOutcome::from_response(json!({
			"data": [{
				"code": "SUCCESS",
				"action": "update",
				"details": { "id": "42" },
				"status": "success",
			}]
		}));

		assert_eq!(outcome.action, UpsertAction::Update);
		assert_eq!(outcome.detail["details"]["id"], "42");
	}

	#[test]
	fn unexpected_shapes_fall_back_to_sentinel() {
		for body in [json!({}), json!({ "data": [] }), json!({ "data": "nope" }), json!("text")] {
			let outcome = UpsertOutcome::from_response(body.clone());

			assert_eq!(outcome.action, UpsertAction::Unknown);
			assert_eq!(outcome.action.as_str(), "ok");
			assert_eq!(outcome.detail, body);
		}

		let missing_action = UpsertOutcome::from_response(json!({ "data": [{ "code": "SUCCESS" }] }));

		assert_eq!(missing_action.action, UpsertAction::Unknown);
		assert_eq!(missing_action.detail, json!({ "code": "SUCCESS" }));
	}

	#[test]
	fn unmodeled_actions_are_reported_verbatim() {
		let outcome = UpsertOutcome::from_response(json!({ "data": [{ "action": "merge" }] }));

		assert_eq!(outcome.action, UpsertAction::Reported("merge".into()));
		assert_eq!(serde_json::to_value(&outcome.action).expect("Action should serialize."), "merge");
	}

	#[test]
	fn payload_targets_email_and_workflow() {
		let record = RecordMapper::default()
			.build_record("jane@example.com", &json!({ "FIRSTNAME": "Jane" }))
			.expect("Submission should map.");
		let payload = serde_json::to_value(UpsertPayload::single(&record))
			.expect("Payload should serialize.");

		assert_eq!(payload["duplicate_check_fields"], json!(["Email"]));
		assert_eq!(payload["trigger"], json!(["workflow"]));
		assert_eq!(payload["data"][0]["Email"], "jane@example.com");
		assert_eq!(payload["data"][0]["First_Name"], "Jane");
	}

	#[test]
	fn non_json_bodies_are_wrapped_as_text() {
		assert_eq!(parse_body("{\"a\":1}"), json!({ "a": 1 }));
		assert_eq!(parse_body("Bad Gateway"), json!("Bad Gateway"));
	}
}
