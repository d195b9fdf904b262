//! Relay flow orchestrators: token acquisition, the CRM upsert, and the Brevo companion sync.

pub mod brevo;
pub mod token;
pub mod upsert;

pub use brevo::*;
pub use upsert::*;

// self
use crate::{
	_prelude::*,
	auth::TokenCache,
	http::ReqwestHttpClient,
	oauth::TokenProvider,
	record::RecordMapper,
};

/// Coordinates token acquisition and CRM upserts for a single Zoho account.
///
/// The relay owns the HTTP client, the token provider, the shared token cache, and the record
/// mapper so request handlers only pass submissions through. Cloning is cheap; every clone
/// shares the same cache and metrics.
#[derive(Clone)]
pub struct ZohoRelay {
	/// HTTP client used for every CRM request.
	pub http_client: ReqwestHttpClient,
	/// Source of fresh access tokens.
	pub token_provider: Arc<dyn TokenProvider>,
	/// Process-wide access token slot.
	pub cache: Arc<TokenCache>,
	/// Mapper turning submissions into CRM records.
	pub mapper: RecordMapper,
	/// Fully resolved upsert endpoint.
	pub upsert_url: Url,
	/// Shared counters for upsert outcomes.
	pub upsert_metrics: Arc<UpsertMetrics>,
}
impl ZohoRelay {
	/// Creates a relay with an empty token cache.
	pub fn new(
		http_client: ReqwestHttpClient,
		token_provider: Arc<dyn TokenProvider>,
		upsert_url: Url,
		mapper: RecordMapper,
	) -> Self {
		Self {
			http_client,
			token_provider,
			cache: Default::default(),
			mapper,
			upsert_url,
			upsert_metrics: Default::default(),
		}
	}

	/// Replaces the token cache, e.g. to share one across relays or pre-seed it in tests.
	pub fn with_cache(mut self, cache: Arc<TokenCache>) -> Self {
		self.cache = cache;

		self
	}
}
impl Debug for ZohoRelay {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ZohoRelay")
			.field("upsert_url", &self.upsert_url.as_str())
			.field("lead_source", &self.mapper.default_lead_source())
			.field("token_cached", &self.cache.is_valid())
			.finish()
	}
}
