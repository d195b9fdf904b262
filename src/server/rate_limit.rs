//! Fixed-window, in-memory request budget per client address.

// std
use std::{net::SocketAddr, time::Duration as StdDuration};
// crates.io
use axum::{
	extract::{ConnectInfo, Request, State},
	middleware::Next,
	response::{IntoResponse, Response},
};
// self
use crate::{
	_prelude::*,
	server::{AppState, error::ApiError},
};

const FORWARDED_FOR: &str = "x-forwarded-for";
const UNKNOWN_CLIENT: &str = "unknown";
// Above this many tracked clients, expired windows are pruned on the next evaluation.
const PRUNE_THRESHOLD: usize = 4_096;

/// Result emitted by [`FixedWindowLimiter::evaluate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// The request may proceed immediately.
	Allow,
	/// The client exhausted its budget for the current window.
	Delay(RetryDirective),
}

/// Advises callers when to retry after a [`RateLimitDecision::Delay`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryDirective {
	/// Instant when the current window closes.
	pub earliest_retry_at: OffsetDateTime,
	/// Time remaining until the window closes.
	pub recommended_backoff: Duration,
}

#[derive(Clone, Copy, Debug)]
struct Window {
	started_at: OffsetDateTime,
	count: u32,
}

/// Counts requests per key in fixed windows; the window restarts once it has fully elapsed.
#[derive(Debug)]
pub struct FixedWindowLimiter {
	windows: Mutex<HashMap<String, Window>>,
	max: u32,
	window: Duration,
}
impl FixedWindowLimiter {
	/// Allows `max` requests per key per `window`.
	pub fn new(max: u32, window: StdDuration) -> Self {
		let window = Duration::try_from(window).unwrap_or(Duration::MAX);

		Self { windows: Default::default(), max, window }
	}

	/// Records a request for `key` at the current instant.
	pub fn evaluate(&self, key: &str) -> RateLimitDecision {
		self.evaluate_at(key, OffsetDateTime::now_utc())
	}

	/// Records a request for `key` at `now`.
	pub fn evaluate_at(&self, key: &str, now: OffsetDateTime) -> RateLimitDecision {
		let mut windows = self.windows.lock();

		if windows.len() > PRUNE_THRESHOLD {
			windows.retain(|_, entry| now - entry.started_at <= self.window);
		}

		let entry = windows
			.entry(key.to_owned())
			.or_insert(Window { started_at: now, count: 0 });

		if now - entry.started_at > self.window {
			*entry = Window { started_at: now, count: 0 };
		}

		entry.count = entry.count.saturating_add(1);

		if entry.count > self.max {
			let earliest_retry_at = entry.started_at + self.window;

			RateLimitDecision::Delay(RetryDirective {
				earliest_retry_at,
				recommended_backoff: earliest_retry_at - now,
			})
		} else {
			RateLimitDecision::Allow
		}
	}
}

/// Middleware rejecting clients that exceeded their budget with `429`.
pub async fn enforce(State(state): State<AppState>, request: Request, next: Next) -> Response {
	let client = client_key(&request);

	match state.rate_limiter.evaluate(&client) {
		RateLimitDecision::Allow => next.run(request).await,
		RateLimitDecision::Delay(directive) => {
			tracing::warn!(%client, path = request.uri().path(), "rate limit exceeded");

			ApiError::TooManyRequests {
				retry_after_secs: directive.recommended_backoff.whole_seconds().max(1).unsigned_abs(),
			}
			.into_response()
		},
	}
}

/// First `x-forwarded-for` hop, else the socket peer, else `unknown`.
pub fn client_key(request: &Request) -> String {
	request
		.headers()
		.get(FORWARDED_FOR)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.split(',').next())
		.map(str::trim)
		.filter(|value| !value.is_empty())
		.map(str::to_owned)
		.or_else(|| {
			request
				.extensions()
				.get::<ConnectInfo<SocketAddr>>()
				.map(|ConnectInfo(addr)| addr.ip().to_string())
		})
		.unwrap_or_else(|| UNKNOWN_CLIENT.to_owned())
}
