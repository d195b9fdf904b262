//! HTTP surface: routes, middleware stack, and the listener.

pub mod error;
pub mod handlers;
pub mod rate_limit;

pub use error::ApiError;
pub use rate_limit::{FixedWindowLimiter, RateLimitDecision};

// std
use std::{net::SocketAddr, time::Duration as StdDuration};
// crates.io
use axum::{
	Router,
	extract::DefaultBodyLimit,
	http::{
		HeaderValue, Method,
		header::{CONTENT_TYPE, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS},
	},
	middleware,
	routing::{get, post},
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
	cors::{AllowOrigin, CorsLayer},
	set_header::SetResponseHeaderLayer,
	trace::TraceLayer,
};
// self
use crate::{
	_prelude::*,
	config::RelayConfig,
	error::{ConfigError, TransportError},
	flows::{BrevoRelay, ZohoRelay},
	http::ReqwestHttpClient,
	oauth::ZohoTokenProvider,
	provider::ZohoEndpoints,
	record::RecordMapper,
};

/// Maximum accepted JSON body size.
pub const BODY_LIMIT: usize = 200 * 1024;

const CORS_MAX_AGE: StdDuration = StdDuration::from_secs(600);

/// Shared state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
	/// Zoho relay (token cache, mapper, upsert).
	pub zoho: ZohoRelay,
	/// Brevo relay; `None` leaves the Brevo route unmounted.
	pub brevo: Option<BrevoRelay>,
	/// Per-client request budget for the submission routes.
	pub rate_limiter: Arc<FixedWindowLimiter>,
	/// Origin allowed by CORS; `None` allows any.
	pub allowed_origin: Option<HeaderValue>,
}
impl AppState {
	/// Creates state with the default budget (30 requests per minute) and open CORS.
	pub fn new(zoho: ZohoRelay) -> Self {
		Self {
			zoho,
			brevo: None,
			rate_limiter: Arc::new(FixedWindowLimiter::new(30, StdDuration::from_secs(60))),
			allowed_origin: None,
		}
	}

	/// Enables or disables the Brevo route.
	pub fn with_brevo(mut self, brevo: Option<BrevoRelay>) -> Self {
		self.brevo = brevo;

		self
	}

	/// Replaces the request budget.
	pub fn with_rate_limiter(mut self, limiter: FixedWindowLimiter) -> Self {
		self.rate_limiter = Arc::new(limiter);

		self
	}

	/// Restricts CORS to a single origin.
	pub fn with_allowed_origin(mut self, origin: Option<HeaderValue>) -> Self {
		self.allowed_origin = origin;

		self
	}

	/// Wires every component from configuration.
	pub fn from_config(config: &RelayConfig) -> Result<Self> {
		let http_client = ReqwestHttpClient::with_timeout(config.upstream_timeout)?;
		let endpoints = &config.zoho.client.endpoints;
		let provider =
			ZohoTokenProvider::new(endpoints, config.zoho.credential(), http_client.clone())?;
		let zoho = ZohoRelay::new(
			http_client.clone(),
			Arc::new(provider),
			endpoints.upsert_url(ZohoEndpoints::CONTACTS_MODULE)?,
			RecordMapper::new(config.zoho.lead_source.clone()),
		);
		let brevo = config.brevo.as_ref().map(|brevo| {
			BrevoRelay::new(http_client.clone(), brevo.api_key.clone(), brevo.base.clone())
				.with_default_list(brevo.list_id)
		});
		let allowed_origin = config
			.server
			.allowed_origin
			.as_deref()
			.map(|origin| {
				HeaderValue::from_str(origin).map_err(|err| ConfigError::InvalidEnv {
					key: "ALLOWED_ORIGIN",
					reason: err.to_string(),
				})
			})
			.transpose()?;

		Ok(Self::new(zoho)
			.with_brevo(brevo)
			.with_rate_limiter(FixedWindowLimiter::new(
				config.server.rate_limit_max,
				config.server.rate_limit_window,
			))
			.with_allowed_origin(allowed_origin))
	}
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
	let mut submissions = Router::new()
		.route("/api/zoho/contact", post(handlers::zoho_submit))
		.route("/api/zoho/lead", post(handlers::zoho_submit));

	if state.brevo.is_some() {
		submissions = submissions.route("/api/brevo/subscribe", post(handlers::brevo_subscribe));
	}

	let submissions = submissions
		.route_layer(middleware::from_fn_with_state(state.clone(), rate_limit::enforce));
	let cors = CorsLayer::new()
		.allow_origin(match state.allowed_origin.clone() {
			Some(origin) => AllowOrigin::exact(origin),
			None => AllowOrigin::any(),
		})
		.allow_methods([Method::GET, Method::POST, Method::OPTIONS])
		.allow_headers([CONTENT_TYPE])
		.max_age(CORS_MAX_AGE);

	Router::new()
		.route("/health", get(handlers::health))
		.route("/zoho/callback", get(handlers::zoho_callback))
		.merge(submissions)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(SetResponseHeaderLayer::if_not_present(
					X_CONTENT_TYPE_OPTIONS,
					HeaderValue::from_static("nosniff"),
				))
				.layer(SetResponseHeaderLayer::if_not_present(
					X_FRAME_OPTIONS,
					HeaderValue::from_static("SAMEORIGIN"),
				))
				.layer(SetResponseHeaderLayer::if_not_present(
					REFERRER_POLICY,
					HeaderValue::from_static("no-referrer"),
				))
				.layer(cors)
				.layer(DefaultBodyLimit::max(BODY_LIMIT)),
		)
		.with_state(state)
}

/// Binds the configured address and serves until `ctrl-c`.
pub async fn serve(config: RelayConfig) -> Result<()> {
	let state = AppState::from_config(&config)?;
	let listener =
		TcpListener::bind(config.server.bind_addr()).await.map_err(TransportError::from)?;
	let addr = listener.local_addr().map_err(TransportError::from)?;

	tracing::info!(
		%addr,
		region = %config.zoho.client.region,
		brevo = state.brevo.is_some(),
		"crm relay listening"
	);

	axum::serve(listener, router(state).into_make_service_with_connect_info::<SocketAddr>())
		.with_graceful_shutdown(shutdown_signal())
		.await
		.map_err(TransportError::from)?;

	Ok(())
}

async fn shutdown_signal() {
	match tokio::signal::ctrl_c().await {
		Ok(()) => tracing::info!("shutdown signal received"),
		Err(err) => tracing::warn!(error = %err, "failed to listen for shutdown signal"),
	}
}
