mod common;

// std
use std::sync::{Arc, Mutex};
// crates.io
use http::{Method, StatusCode};
use url::Url;
// self
use common::*;
use oauth1_broker::{
	activity::{ActivityError, DefaultNetworkActivityNotifier, NetworkActivityNotifier},
	auth::Credential,
	error::{Error, TransportError},
	request::{RequestState, SignedRequest},
	response::Response,
	signer::{Parameters, ParamsLocation},
	transport::{HttpResponse, MemoryTransport},
};

fn photos_credential() -> Credential {
	Credential::new("dpf43f3p2l4k3l03", "kd94hf93k423kf44")
		.with_access_token("nnch734d00sl2jdk", "pfkkdhi9sl3r4s00")
}

fn photos_parameters() -> Parameters {
	Parameters::from([
		("file".to_owned(), "vacation.jpg".to_owned()),
		("size".to_owned(), "original".to_owned()),
	])
}

#[test]
fn client_signs_the_published_example() {
	let Harness { client, transport, .. } = harness(photos_credential(), MemoryTransport::default());

	client
		.get("http://photos.example.net/photos", photos_parameters(), None, |_| {}, |_| {})
		.expect("Request should start.");
	client
		.get("http://photos.example.net/photos", photos_parameters(), None, |_| {}, |_| {})
		.expect("Request should start.");

	let requests = transport.requests();
	let header = authorization(&requests[0].headers);

	assert_eq!(requests[0].url.as_str(), "http://photos.example.net/photos?file=vacation.jpg&size=original");
	assert!(header.starts_with("OAuth "));
	assert!(header.contains("oauth_signature=\"tR3%2BTy81lMeYAr%2FFid0kMTYa%2FWM%3D\""));
	assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
	assert_eq!(header, authorization(&requests[1].headers));
}

#[test]
fn every_outcome_balances_the_counter() {
	let updates = Arc::new(Mutex::new(Vec::new()));
	let notifier = {
		let updates = updates.clone();

		Arc::new(DefaultNetworkActivityNotifier::with_update_handler(move |visible| {
			updates.lock().expect("Update log should not be poisoned.").push(visible);
		}))
	};
	let Harness { client, transport, .. } =
		harness(photos_credential(), MemoryTransport::reporting_cancellation());
	let client = client.with_notifier(notifier.clone());
	let (success, successes) = capture::<Response>();
	let (failure, failures) = capture::<Error>();

	client.get("https://api.example.com/ok", Parameters::new(), None, success, |_| {});

	let cancelled = client
		.get("https://api.example.com/slow", Parameters::new(), None, |_| {}, failure)
		.expect("Request should start.");

	client.get("https://api.example.com/broken", Parameters::new(), None, |_| {}, |_| {});

	assert_eq!(notifier.active_network_activities(), 3);

	cancelled.cancel();
	cancelled.cancel();

	assert!(transport.fulfill("https://api.example.com/ok", ok("fine")));
	assert!(transport.fulfill(
		"https://api.example.com/broken",
		Err(TransportError::Network { source: "connection reset".into() }),
	));
	assert_eq!(notifier.active_network_activities(), 0);
	assert_eq!(successes.try_recv().expect("Success handler should run.").string().as_deref(), Some("fine"));
	assert!(failures.try_recv().expect("Failure handler should run.").is_cancelled());
	assert!(failures.try_recv().is_err());
	assert_eq!(cancelled.state(), RequestState::Cancelled);
	assert_eq!(
		*updates.lock().expect("Update log should not be poisoned."),
		[true, true, true, true, true, false]
	);
	assert!(matches!(notifier.network_activity_ended(), Err(ActivityError::UnbalancedCall)));
}

#[test]
fn cancel_before_start_reports_on_start() {
	let Harness { client, transport, notifier } =
		harness(photos_credential(), MemoryTransport::default());
	let request = client
		.make_request(oauth1_broker::signer::UnsignedRequest::new(
			Method::GET,
			Url::parse("https://api.example.com/1/me").expect("Fixture URL should parse."),
		))
		.expect("Request should sign.");
	let (failure, failures) = capture::<Error>();

	request.cancel();
	request.start(|_| {}, failure);

	assert!(failures.try_recv().expect("Failure handler should run.").is_cancelled());
	assert!(transport.requests().is_empty());
	assert_eq!(notifier.active_network_activities(), 0);
}

#[test]
fn query_location_carries_the_signature_in_the_url() {
	let Harness { client, transport, .. } = harness(photos_credential(), MemoryTransport::default());
	let client = client.with_params_location(ParamsLocation::RequestUriQuery);

	client
		.get("http://photos.example.net/photos", photos_parameters(), None, |_| {}, |_| {})
		.expect("Request should start.");

	let request = transport.requests().pop().expect("Transport should record the request.");
	let query = request.url.query().expect("Signed URL should carry a query.");

	assert!(query.starts_with("file=vacation.jpg&size=original&"));
	assert!(query.contains("oauth_signature=tR3%2BTy81lMeYAr%2FFid0kMTYa%2FWM%3D"));
	assert!(request.headers.get(http::header::AUTHORIZATION).is_none());
}

#[test]
fn invalidated_transport_rejects_later_requests() {
	let Harness { client, transport, notifier } =
		harness(photos_credential(), MemoryTransport::default());
	let (success, successes) = capture::<Response>();
	let (failure, failures) = capture::<Error>();

	client.get("https://api.example.com/early", Parameters::new(), None, success, |_| {});
	client.finish_operations_and_invalidate();
	client.get("https://api.example.com/late", Parameters::new(), None, |_| {}, failure);

	assert!(transport.is_invalidated());
	assert!(matches!(failures.try_recv(), Ok(Error::Request { status: None, .. })));
	assert!(transport.fulfill(
		"https://api.example.com/early",
		Ok(HttpResponse::new(StatusCode::ACCEPTED, "queued")),
	));
	assert!(successes.try_recv().is_ok());
	assert_eq!(notifier.active_network_activities(), 0);
}

#[test]
fn prebuilt_requests_keep_their_shape() {
	let Harness { client, transport, .. } = harness(photos_credential(), MemoryTransport::default());
	let prebuilt = oauth1_broker::transport::HttpRequest::new(
		Method::POST,
		Url::parse("https://api.example.com/1/upload?album=7").expect("Fixture URL should parse."),
	)
	.with_body(b"caption=sunset".to_vec())
	.with_header(
		http::header::CONTENT_TYPE,
		http::HeaderValue::from_static("application/x-www-form-urlencoded"),
	);
	let signed: SignedRequest = client.make_request_from(prebuilt).expect("Prebuilt request should sign.");

	signed.start(|_| {}, |_| {});

	let sent = transport.requests().pop().expect("Transport should record the request.");

	assert_eq!(sent.url.as_str(), "https://api.example.com/1/upload?album=7");
	assert_eq!(sent.body, b"caption=sunset");
	assert!(authorization(&sent.headers).contains("oauth_token=\"nnch734d00sl2jdk\""));
	assert_eq!(signed.state(), RequestState::InFlight);
}
