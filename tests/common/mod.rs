//! Fixtures shared by the integration tests.

#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	mpsc::{self, Receiver},
};
// crates.io
use http::StatusCode;
// self
use oauth1_broker::{
	activity::DefaultNetworkActivityNotifier,
	auth::Credential,
	client::OAuthClient,
	signer::FixedEntropy,
	transport::{HttpResponse, MemoryTransport, TransportResult},
};

pub const NONCE: &str = "kllo9940pd9333jh";
pub const TIMESTAMP: u64 = 1_191_242_096;

pub struct Harness {
	pub client: OAuthClient,
	pub transport: Arc<MemoryTransport>,
	pub notifier: Arc<DefaultNetworkActivityNotifier>,
}

/// Client over `transport` with fixed signing entropy and a shared activity counter.
pub fn harness(credential: Credential, transport: MemoryTransport) -> Harness {
	let transport = Arc::new(transport);
	let notifier = Arc::new(DefaultNetworkActivityNotifier::default());
	let client = OAuthClient::new(credential, transport.clone())
		.with_notifier(notifier.clone())
		.with_entropy(FixedEntropy::new(NONCE, TIMESTAMP));

	Harness { client, transport, notifier }
}

pub fn ok(body: &str) -> TransportResult {
	Ok(HttpResponse::new(StatusCode::OK, body.to_owned()))
}

pub fn capture<T>() -> (impl FnOnce(T) + Send + 'static, Receiver<T>)
where
	T: 'static + Send,
{
	let (tx, rx) = mpsc::channel();

	(
		move |value| {
			let _ = tx.send(value);
		},
		rx,
	)
}

pub fn authorization(headers: &http::HeaderMap) -> String {
	headers
		.get(http::header::AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.expect("Request should carry an Authorization header.")
		.to_owned()
}
