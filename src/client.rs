//! Signed-request client shared by handshakes and API calls.

// crates.io
use http::{HeaderMap, Method};
// self
use crate::{
	_prelude::*,
	activity::NetworkActivityNotifier,
	auth::Credential,
	request::{RequestContext, ResponseClassifier, SignedRequest},
	response::Response,
	signer::{Parameters, ParamsLocation, RequestSigner, SignatureMethod, SigningEntropy, UnsignedRequest},
	transport::{Dispatcher, HttpRequest, Job, TransportHandler},
};

/// Issues signed requests on behalf of one [`Credential`].
///
/// Clones share the credential, the transport, and every configured collaborator.
#[derive(Clone)]
pub struct OAuthClient {
	credential: Arc<RwLock<Credential>>,
	transport: Arc<dyn TransportHandler>,
	signer: RequestSigner,
	params_location: ParamsLocation,
	context: RequestContext,
}
impl OAuthClient {
	/// Creates a client that signs with HMAC-SHA1 into the `Authorization` header, runs
	/// handlers inline, and tracks no activity.
	pub fn new(credential: Credential, transport: Arc<dyn TransportHandler>) -> Self {
		Self {
			credential: Arc::new(RwLock::new(credential)),
			transport,
			signer: RequestSigner::default(),
			params_location: ParamsLocation::default(),
			context: RequestContext::default(),
		}
	}

	/// Counts every request on `notifier`.
	pub fn with_notifier(mut self, notifier: Arc<dyn NetworkActivityNotifier>) -> Self {
		self.context.notifier = Some(notifier);

		self
	}

	/// Runs success and failure handlers on `dispatcher`.
	pub fn with_dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
		self.context.dispatcher = dispatcher;

		self
	}

	/// Replaces the response classifier.
	pub fn with_classifier(mut self, classifier: impl 'static + ResponseClassifier) -> Self {
		self.context.classifier = Arc::new(classifier);

		self
	}

	/// Replaces the nonce/timestamp source.
	pub fn with_entropy(mut self, entropy: impl 'static + SigningEntropy) -> Self {
		self.signer = self.signer.with_entropy(entropy);

		self
	}

	/// Replaces the OAuth 1 signature method.
	pub fn with_signature_method(mut self, method: impl 'static + SignatureMethod) -> Self {
		self.signer = self.signer.with_method(method);

		self
	}

	/// Chooses where OAuth parameters are written.
	pub fn with_params_location(mut self, location: ParamsLocation) -> Self {
		self.params_location = location;

		self
	}

	/// Snapshot of the credential.
	pub fn credential(&self) -> Credential {
		self.credential.read().clone()
	}

	/// Mutates the shared credential in place.
	pub fn update_credential<R>(&self, update: impl FnOnce(&mut Credential) -> R) -> R {
		update(&mut self.credential.write())
	}

	/// Where OAuth parameters are written.
	pub fn params_location(&self) -> ParamsLocation {
		self.params_location
	}

	/// Transport backing the client.
	pub fn transport(&self) -> &Arc<dyn TransportHandler> {
		&self.transport
	}

	/// Signed `GET`.
	pub fn get(
		&self,
		url: &str,
		parameters: Parameters,
		headers: Option<HeaderMap>,
		success: impl 'static + Send + FnOnce(Response),
		failure: impl 'static + Send + FnOnce(Error),
	) -> Option<SignedRequest> {
		self.verb(Method::GET, url, parameters, headers, success, failure)
	}

	/// Signed `POST`.
	pub fn post(
		&self,
		url: &str,
		parameters: Parameters,
		headers: Option<HeaderMap>,
		success: impl 'static + Send + FnOnce(Response),
		failure: impl 'static + Send + FnOnce(Error),
	) -> Option<SignedRequest> {
		self.verb(Method::POST, url, parameters, headers, success, failure)
	}

	/// Signed `PUT`.
	pub fn put(
		&self,
		url: &str,
		parameters: Parameters,
		headers: Option<HeaderMap>,
		success: impl 'static + Send + FnOnce(Response),
		failure: impl 'static + Send + FnOnce(Error),
	) -> Option<SignedRequest> {
		self.verb(Method::PUT, url, parameters, headers, success, failure)
	}

	/// Signed `DELETE`.
	pub fn delete(
		&self,
		url: &str,
		parameters: Parameters,
		headers: Option<HeaderMap>,
		success: impl 'static + Send + FnOnce(Response),
		failure: impl 'static + Send + FnOnce(Error),
	) -> Option<SignedRequest> {
		self.verb(Method::DELETE, url, parameters, headers, success, failure)
	}

	/// Signed `PATCH`.
	pub fn patch(
		&self,
		url: &str,
		parameters: Parameters,
		headers: Option<HeaderMap>,
		success: impl 'static + Send + FnOnce(Response),
		failure: impl 'static + Send + FnOnce(Error),
	) -> Option<SignedRequest> {
		self.verb(Method::PATCH, url, parameters, headers, success, failure)
	}

	/// Signs and starts `request`.
	///
	/// With `check_token_expiration`, a credential whose known expiry has passed fails with
	/// [`Error::TokenExpired`] without touching the transport. Every failure, including
	/// signing failures, reaches `failure` through the dispatcher; `None` is returned when
	/// nothing was started.
	pub fn request(
		&self,
		request: UnsignedRequest,
		check_token_expiration: bool,
		success: impl 'static + Send + FnOnce(Response),
		failure: impl 'static + Send + FnOnce(Error),
	) -> Option<SignedRequest> {
		if check_token_expiration && self.credential.read().is_token_expired() {
			self.fail(failure, Error::TokenExpired { source: None });

			return None;
		}

		match self.make_request(request) {
			Ok(signed) => {
				signed.start(success, failure);

				Some(signed)
			},
			Err(e) => {
				self.fail(failure, e);

				None
			},
		}
	}

	/// Signs `request` with the current credential without starting it.
	pub fn make_request(&self, request: UnsignedRequest) -> Result<SignedRequest> {
		let signed =
			self.signer.sign(&self.credential.read(), request, self.params_location)?;

		Ok(SignedRequest::new(signed, self.transport.clone(), self.context.clone()))
	}

	/// Signs a prebuilt request, keeping its URL, headers, body, and timeout.
	pub fn make_request_from(&self, request: HttpRequest) -> Result<SignedRequest> {
		self.make_request(UnsignedRequest::from(request))
	}

	/// Lets in-flight requests finish and makes the transport reject new ones.
	pub fn finish_operations_and_invalidate(&self) {
		self.transport.finish_operations_and_invalidate();
	}

	fn verb(
		&self,
		method: Method,
		url: &str,
		parameters: Parameters,
		headers: Option<HeaderMap>,
		success: impl 'static + Send + FnOnce(Response),
		failure: impl 'static + Send + FnOnce(Error),
	) -> Option<SignedRequest> {
		let Ok(parsed) = Url::parse(url) else {
			self.fail(failure, Error::Encoding { url: url.to_owned() });

			return None;
		};
		let request = UnsignedRequest::new(method, parsed)
			.with_parameters(parameters)
			.with_headers(headers.unwrap_or_default());

		self.request(request, true, success, failure)
	}

	/// Runs `job` on the configured dispatcher.
	pub(crate) fn dispatch(&self, job: Job) {
		self.context.dispatcher.dispatch(job);
	}

	fn fail(&self, failure: impl 'static + Send + FnOnce(Error), error: Error) {
		self.dispatch(Box::new(move || failure(error)));
	}
}
impl Debug for OAuthClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthClient")
			.field("credential", &*self.credential.read())
			.field("signer", &self.signer)
			.field("params_location", &self.params_location)
			.field("context", &self.context)
			.finish_non_exhaustive()
	}
}
