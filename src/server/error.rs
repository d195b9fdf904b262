//! Conversion of relay errors into JSON HTTP responses.

// crates.io
use axum::{
	Json,
	extract::rejection::JsonRejection,
	http::header::RETRY_AFTER,
	response::{IntoResponse, Response},
};
use serde_json::json;
// self
use crate::{
	_prelude::*,
	error::BrevoError,
	flows::upsert::parse_body,
};

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Error returned by request handlers.
#[derive(Debug)]
pub enum ApiError {
	/// Failure raised by a relay flow.
	Relay(Error),
	/// The request body was not valid JSON for the route.
	Body(JsonRejection),
	/// The client exceeded its request budget.
	TooManyRequests {
		/// Seconds until the current window closes.
		retry_after_secs: u64,
	},
}
impl ApiError {
	/// HTTP status the error is reported with.
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Relay(Error::Validation(_)) => StatusCode::BAD_REQUEST,
			Self::Relay(Error::AuthProvider { .. }) => StatusCode::BAD_GATEWAY,
			Self::Relay(Error::UpstreamUpsert { status, .. })
			| Self::Relay(Error::Brevo(BrevoError::CreateFailed { status, .. })) =>
				mirrored_status(*status),
			Self::Relay(Error::Brevo(BrevoError::UpdateFailed { .. })) => StatusCode::BAD_GATEWAY,
			Self::Relay(Error::Config(_) | Error::Transport(_)) => StatusCode::INTERNAL_SERVER_ERROR,
			Self::Body(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE =>
				StatusCode::PAYLOAD_TOO_LARGE,
			Self::Body(_) => StatusCode::BAD_REQUEST,
			Self::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
		}
	}

	fn body(&self) -> Value {
		match self {
			Self::Relay(Error::Validation(err)) => json!({ "error": err.to_string() }),
			Self::Relay(Error::AuthProvider { status, body }) => json!({
				"error": "Zoho token refresh failed",
				"detail": { "status": status, "body": parse_body(body) },
			}),
			Self::Relay(Error::UpstreamUpsert { detail, .. }) =>
				json!({ "error": "Zoho upsert failed", "detail": detail }),
			Self::Relay(Error::Brevo(BrevoError::CreateFailed { detail, .. })) =>
				json!({ "error": "Brevo create failed", "detail": detail }),
			Self::Relay(Error::Brevo(BrevoError::UpdateFailed { detail })) =>
				json!({ "error": "Brevo update failed", "detail": detail }),
			Self::Relay(Error::Config(_) | Error::Transport(_)) => json!({ "error": INTERNAL_MESSAGE }),
			Self::Body(rejection) =>
				json!({ "error": "Invalid JSON body.", "detail": rejection.body_text() }),
			Self::TooManyRequests { .. } => json!({ "error": "Too many requests" }),
		}
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		Self::Relay(err)
	}
}
impl From<JsonRejection> for ApiError {
	fn from(rejection: JsonRejection) -> Self {
		Self::Body(rejection)
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = self.status();

		if status.is_server_error() {
			tracing::error!(error = ?self, %status, "request failed");
		}

		let body = Json(self.body());

		match self {
			Self::TooManyRequests { retry_after_secs } =>
				(status, [(RETRY_AFTER, retry_after_secs.to_string())], body).into_response(),
			_ => (status, body).into_response(),
		}
	}
}

// Upstream 4xx/5xx statuses pass through; anything else becomes 502.
fn mirrored_status(status: u16) -> StatusCode {
	StatusCode::from_u16(status)
		.ok()
		.filter(|status| status.is_client_error() || status.is_server_error())
		.unwrap_or(StatusCode::BAD_GATEWAY)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::{TransportError, ValidationError};

	#[test]
	fn statuses_follow_the_error_taxonomy() {
		let cases = [
			(ApiError::from(Error::from(ValidationError::InvalidEmail)), 400),
			(Error::AuthProvider { status: 400, body: "{}".into() }.into(), 502),
			(Error::UpstreamUpsert { status: 429, detail: Value::Null }.into(), 429),
			(Error::UpstreamUpsert { status: 302, detail: Value::Null }.into(), 502),
			(Error::UpstreamUpsert { status: 401, detail: Value::Null }.into(), 401),
			(Error::from(BrevoError::CreateFailed { status: 0, detail: Value::Null }).into(), 502),
			(Error::from(BrevoError::UpdateFailed { detail: String::new() }).into(), 502),
			(
				Error::from(TransportError::Io(std::io::Error::other("connection reset"))).into(),
				500,
			),
			(ApiError::TooManyRequests { retry_after_secs: 5 }, 429),
		];

		for (err, expected) in cases {
			assert_eq!(err.status().as_u16(), expected, "Unexpected status for {err:?}.");
		}
	}

	#[test]
	fn internal_errors_hide_details() {
		let err = ApiError::from(Error::from(TransportError::Io(std::io::Error::other("secret"))));

		assert_eq!(err.body(), json!({ "error": INTERNAL_MESSAGE }));
	}

	#[test]
	fn upstream_details_are_forwarded() {
		let err = ApiError::from(Error::UpstreamUpsert {
			status: 400,
			detail: json!({ "code": "INVALID_DATA" }),
		});

		assert_eq!(err.body()["detail"]["code"], "INVALID_DATA");
	}
}
