//! `zoho-oauth`: one-off helper for the Zoho consent flow.

// crates.io
use clap::Parser;
// self
use crm_relay::{cli::OAuthCli, config::ZohoClientConfig, http::ReqwestHttpClient, obs};

#[tokio::main]
async fn main() {
	obs::init_tracing();

	let cli = OAuthCli::parse();
	let result = async {
		let config = ZohoClientConfig::from_env()?;

		cli.run(&config, ReqwestHttpClient::default()).await
	}
	.await;

	match result {
		Ok(output) => println!("{output}"),
		Err(err) => {
			eprintln!("zoho-oauth: {err}");

			std::process::exit(1);
		},
	}
}
