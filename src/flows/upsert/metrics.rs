// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for CRM upsert outcomes.
#[derive(Debug, Default)]
pub struct UpsertMetrics {
	attempts: AtomicU64,
	auth_retries: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
}
impl UpsertMetrics {
	/// Returns the total number of upsert requests handled.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns how many upserts were retried after the CRM rejected the access token.
	pub fn auth_retries(&self) -> u64 {
		self.auth_retries.load(Ordering::Relaxed)
	}

	/// Returns the number of upserts the CRM accepted.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of upserts that ended in an error.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_auth_retry(&self) {
		self.auth_retries.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}
}
