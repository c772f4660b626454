//! Walks through the three-legged handshake against a scripted in-memory provider.
//!
//! 1. `authorize` posts to the request-token endpoint.
//! 2. The provider answers; the flow hands the authorization URL to the presenter.
//! 3. The host application reports the redirect through `handle_redirect`.
//! 4. The flow exchanges the verifier for an access token and reports the credential.

// std
use std::sync::{Arc, mpsc};
// crates.io
use color_eyre::{Result, eyre::eyre};
use http::StatusCode;
use url::Url;
// self
use oauth1_broker::{
	activity::{DefaultNetworkActivityNotifier, NetworkActivityNotifier},
	client::OAuthClient,
	flows::{OAuth1Config, OAuth1Flow},
	transport::{HttpResponse, MemoryTransport},
};

const REQUEST_TOKEN_URL: &str = "https://provider.example.com/oauth/request_token";
const AUTHORIZE_URL: &str = "https://provider.example.com/oauth/authorize";
const ACCESS_TOKEN_URL: &str = "https://provider.example.com/oauth/access_token";

fn main() -> Result<()> {
	color_eyre::install()?;

	let transport = Arc::new(MemoryTransport::default());
	let notifier = Arc::new(DefaultNetworkActivityNotifier::with_update_handler(|visible| {
		println!("Network indicator {}.", if visible { "on" } else { "off" });
	}));
	let config = OAuth1Config::new(
		"demo-consumer",
		"demo-secret",
		REQUEST_TOKEN_URL,
		AUTHORIZE_URL,
		ACCESS_TOKEN_URL,
	)
	.with_add_callback_url_to_authorize_url(true);
	let client = OAuthClient::new(config.credential(), transport.clone())
		.with_notifier(notifier.clone());
	let (presented_tx, presented) = mpsc::channel();
	let (done_tx, done) = mpsc::channel();
	let failure_tx = done_tx.clone();
	let flow = OAuth1Flow::with_client(config, client)?.with_authorize_url_handler(
		move |url: Url| {
			let _ = presented_tx.send(url);
		},
	);

	flow.authorize(
		"demo-app://oauth-callback",
		None,
		move |token| {
			let _ = done_tx.send(Ok(token));
		},
		move |e| {
			let _ = failure_tx.send(Err(e));
		},
	);
	transport.fulfill(
		REQUEST_TOKEN_URL,
		Ok(HttpResponse::new(StatusCode::OK, "oauth_token=req-token&oauth_token_secret=req-secret")),
	);

	let authorize_url = presented.recv()?;

	println!("Send your user to {authorize_url}.");

	// Simulate the operating system handing the callback back to the application.
	flow.handle_redirect(Url::parse(
		"demo-app://oauth-callback?oauth_token=req-token&oauth_verifier=demo-verifier",
	)?);
	transport.fulfill(
		ACCESS_TOKEN_URL,
		Ok(HttpResponse::new(
			StatusCode::OK,
			"oauth_token=access-token&oauth_token_secret=access-secret&screen_name=demo",
		)),
	);

	let token = done.recv()?.map_err(|e| eyre!("Handshake failed: {e}."))?;

	println!("Authorized as {}.", token.parameters.get("screen_name").map_or("unknown", String::as_str));
	println!("Credential: {:?}.", token.credential);
	println!("Requests still in flight: {}.", notifier.active_network_activities());

	Ok(())
}
