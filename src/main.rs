//! `crm-relay` HTTP server.

// self
use crm_relay::{config::RelayConfig, obs, server};

#[tokio::main]
async fn main() {
	obs::init_tracing();

	let config = match RelayConfig::from_env() {
		Ok(config) => config,
		Err(err) => {
			tracing::error!(error = %err, "invalid configuration");

			std::process::exit(1);
		},
	};

	if let Err(err) = server::serve(config).await {
		tracing::error!(error = %err, "relay stopped");

		std::process::exit(1);
	}
}
