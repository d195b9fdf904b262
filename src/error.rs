//! Relay-level error types shared across flows, providers, and the HTTP surface.

// self
use crate::_prelude::*;

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Inbound submission failed validation; never retried.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Brevo rejected the companion sync.
	#[error(transparent)]
	Brevo(#[from] BrevoError),

	/// Identity endpoint rejected the refresh or code exchange.
	#[error("Identity endpoint rejected the token exchange with status {status}.")]
	AuthProvider {
		/// HTTP status returned by the identity endpoint.
		status: u16,
		/// Raw response body kept for diagnostics.
		body: String,
	},
	/// CRM rejected the upsert for a reason other than a recoverable authorization failure.
	#[error("CRM rejected the upsert with status {status}.")]
	UpstreamUpsert {
		/// HTTP status returned by the CRM.
		status: u16,
		/// Parsed error body, or the raw text wrapped as a JSON string.
		detail: Value,
	},
}

/// Malformed inbound submissions.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	/// Anti-bot honeypot field carried a value.
	#[error("Bad request.")]
	HoneypotTriggered,
	/// Primary email is missing or does not look like an address.
	#[error("Invalid email.")]
	InvalidEmail,
	/// Attribute bag was a sequence or a scalar instead of a flat mapping.
	#[error("attributes must be an object.")]
	AttributesNotObject,
}

/// Brevo contacts API failures.
#[derive(Debug, ThisError)]
pub enum BrevoError {
	/// Contact creation failed for a reason other than a duplicate.
	#[error("Brevo create failed with status {status}.")]
	CreateFailed {
		/// HTTP status returned by Brevo.
		status: u16,
		/// Parsed error body, or the raw text wrapped as a JSON string.
		detail: Value,
	},
	/// The duplicate-contact update failed.
	#[error("Brevo update failed.")]
	UpdateFailed {
		/// Raw response text.
		detail: String,
	},
}

/// Configuration and validation failures raised while assembling the relay.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A required environment variable is absent or blank.
	#[error("Missing required environment variable `{key}`.")]
	MissingEnv {
		/// Variable name.
		key: &'static str,
	},
	/// An environment variable holds a value that cannot be parsed.
	#[error("Environment variable `{key}` has an invalid value: {reason}.")]
	InvalidEnv {
		/// Variable name.
		key: &'static str,
		/// Human-readable reason.
		reason: String,
	},
	/// Region selector does not name a known data center.
	#[error("Unknown Zoho region `{0}`.")]
	UnknownRegion(String),
	/// An endpoint URL could not be parsed or joined.
	#[error("Endpoint URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Code exchange succeeded without issuing a refresh token.
	#[error("Token endpoint response did not include a refresh token.")]
	MissingRefreshToken,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<url::ParseError> for ConfigError {
	fn from(source: url::ParseError) -> Self {
		Self::InvalidUrl { source }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling an upstream endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The upstream call exceeded the configured timeout.
	#[error("Upstream call timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling an upstream endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout { source: Box::new(e) } } else { Self::network(e) }
	}
}
impl From<ReqwestError> for Error {
	fn from(e: ReqwestError) -> Self {
		if e.is_builder() {
			ConfigError::http_client_build(e).into()
		} else {
			TransportError::from(e).into()
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn validation_errors_render_their_message() {
		let err = Error::from(ValidationError::InvalidEmail);

		assert!(matches!(err, Error::Validation(ValidationError::InvalidEmail)));
		assert_eq!(err.to_string(), "Invalid email.");
	}

	#[test]
	fn url_errors_expose_their_source() {
		let parse_err = Url::parse("not a url").expect_err("Fixture should fail to parse.");
		let err = Error::from(ConfigError::from(parse_err));
		let config = match &err {
			Error::Config(inner) => inner,
			other => panic!("Unexpected error variant: {other:?}."),
		};

		assert!(StdError::source(config).is_some());
	}
}
