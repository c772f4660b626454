//! Three-legged OAuth 1 handshake: request token, user authorization, access token.
//!
//! Steps run strictly in sequence. Each [`OAuth1Flow::authorize`] call opens a new attempt
//! identified by a generation number; callbacks from an attempt that was replaced or cancelled
//! are ignored, so the caller's handlers run exactly once per attempt.

// crates.io
use http::HeaderMap;
// self
use crate::{
	_prelude::*,
	auth::SignatureVersion,
	client::OAuthClient,
	error::ConfigError,
	flows::{
		AuthorizeUrlHandler, OAuth1Config, TokenSuccess,
		redirect::{RedirectEvent, RedirectObserver, parse_redirect_parameters},
	},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	request::{Cancellable, FailureHandler, SignedRequest},
	response::Response,
	signer::{Parameters, percent_encode},
	transport::TransportHandler,
};

const OAUTH_CALLBACK: &str = "oauth_callback";
const OAUTH_TOKEN: &str = "oauth_token";
const OAUTH_TOKEN_SECRET: &str = "oauth_token_secret";
const OAUTH_VERIFIER: &str = "oauth_verifier";

type TokenSuccessHandler = Box<dyn FnOnce(TokenSuccess) + Send>;

/// Position of an [`OAuth1Flow`] in the handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowStep {
	/// No attempt has started.
	Idle,
	/// Waiting for the request-token endpoint.
	RequestingToken,
	/// Authorization URL handed out; waiting for the redirect.
	AwaitingRedirect,
	/// Waiting for the access-token endpoint.
	RequestingAccessToken,
	/// Last attempt stored an access token.
	Authorized,
	/// Last attempt failed.
	Failed,
	/// Last attempt was cancelled or replaced.
	Cancelled,
}
impl FlowStep {
	fn flow_kind(self) -> Option<FlowKind> {
		match self {
			FlowStep::RequestingToken => Some(FlowKind::RequestToken),
			FlowStep::AwaitingRedirect => Some(FlowKind::Authorize),
			FlowStep::RequestingAccessToken => Some(FlowKind::AccessToken),
			FlowStep::Idle | FlowStep::Authorized | FlowStep::Failed | FlowStep::Cancelled => None,
		}
	}
}

/// Drives the handshake for one consumer on top of an [`OAuthClient`].
///
/// The flow owns the client's credential for the duration of an attempt: the request token,
/// the redirect token/verifier, and finally the access token are written into it. A second
/// [`authorize`](Self::authorize) while an attempt is pending replaces it; the replaced
/// attempt's failure handler receives [`Error::Cancelled`].
#[derive(Clone)]
pub struct OAuth1Flow(Arc<FlowInner>);
impl OAuth1Flow {
	/// Creates a flow with a fresh client over `transport`.
	pub fn new(config: OAuth1Config, transport: Arc<dyn TransportHandler>) -> Result<Self> {
		let client = OAuthClient::new(config.credential(), transport);

		Self::with_client(config, client)
	}

	/// Creates a flow that drives an existing client.
	///
	/// The client's consumer pair is replaced with the configured one and its credential is
	/// switched to OAuth 1 signing.
	pub fn with_client(config: OAuth1Config, client: OAuthClient) -> Result<Self> {
		let url_handler: Arc<dyn AuthorizeUrlHandler> = Arc::new(|_: Url| {});

		config.validate()?;
		client.update_credential(|credential| {
			credential.consumer_key = config.consumer_key.clone();
			credential.consumer_secret = config.consumer_secret.clone();
			credential.version = SignatureVersion::OAuth1;
		});

		Ok(Self(Arc::new(FlowInner {
			config,
			client,
			observer: RedirectObserver::default(),
			url_handler: RwLock::new(url_handler),
			state: Mutex::new(FlowState { generation: 0, step: FlowStep::Idle, attempt: None }),
		})))
	}

	/// Presents authorization URLs through `handler`.
	pub fn with_authorize_url_handler(self, handler: impl 'static + AuthorizeUrlHandler) -> Self {
		*self.0.url_handler.write() = Arc::new(handler);

		self
	}

	/// Provider configuration.
	pub fn config(&self) -> &OAuth1Config {
		&self.0.config
	}

	/// Client used for the token requests; shares the credential the flow writes.
	pub fn client(&self) -> &OAuthClient {
		&self.0.client
	}

	/// Observer waiting for the authorization redirect.
	pub fn observer(&self) -> &RedirectObserver {
		&self.0.observer
	}

	/// Current handshake step.
	pub fn step(&self) -> FlowStep {
		self.0.state.lock().step
	}

	/// Starts the handshake.
	///
	/// Any token held by the credential is discarded first. `callback_url` is sent as
	/// `oauth_callback`; `headers` are added to both token requests.
	/// Exactly one of `success` or `failure` runs on the client's dispatcher.
	pub fn authorize(
		&self,
		callback_url: &str,
		headers: Option<HeaderMap>,
		success: impl 'static + Send + FnOnce(TokenSuccess),
		failure: impl 'static + Send + FnOnce(Error),
	) -> AuthorizeHandle {
		let inner = &self.0;
		let _span = FlowSpan::new(FlowKind::RequestToken, "authorize").entered();
		let (generation, replaced, stale_handler) = {
			let mut state = inner.state.lock();

			state.generation += 1;

			let generation = state.generation;
			let replaced_kind = state.step.flow_kind();
			let replaced = state.attempt.replace(Attempt {
				generation,
				in_flight: None,
				completion: (Box::new(success), Box::new(failure)),
				callback_url: callback_url.to_owned(),
				headers: headers.clone(),
			});

			state.step = FlowStep::RequestingToken;
			// Temporary credentials are requested with the consumer pair alone.
			inner.client.update_credential(|credential| credential.clear_tokens());

			(generation, replaced.map(|attempt| (replaced_kind, attempt)), inner.observer.clear())
		};

		drop(stale_handler);

		if let Some((kind, attempt)) = replaced {
			inner.abandon(kind, attempt);
		}

		obs::record_flow_outcome(FlowKind::RequestToken, FlowOutcome::Attempt);

		let parameters = Parameters::from([(OAUTH_CALLBACK.to_owned(), callback_url.to_owned())]);
		let on_success = inner.clone();
		let on_failure = inner.clone();
		let request = inner.client.post(
			&inner.config.request_token_url,
			parameters,
			headers,
			move |response| on_success.on_request_token(generation, Ok(response)),
			move |e| on_failure.on_request_token(generation, Err(e)),
		);

		inner.track(generation, FlowStep::RequestingToken, request);

		AuthorizeHandle { inner: inner.clone(), generation }
	}

	/// Forwards a redirect reported by the host application.
	///
	/// Returns `false` when no attempt is waiting for one; the URL is then dropped.
	pub fn handle_redirect(&self, url: Url) -> bool {
		self.0.observer.handle_redirect(url)
	}

	/// Cancels the pending attempt, if any.
	///
	/// The in-flight token request is cancelled, the redirect registration is cleared, and the
	/// attempt's failure handler receives [`Error::Cancelled`].
	pub fn cancel(&self) -> bool {
		let generation = self.0.state.lock().attempt.as_ref().map(|attempt| attempt.generation);

		generation.is_some_and(|generation| self.0.cancel_attempt(generation))
	}
}
impl Debug for OAuth1Flow {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuth1Flow")
			.field("config", &self.0.config)
			.field("step", &self.step())
			.field("observer", &self.0.observer)
			.finish_non_exhaustive()
	}
}

/// Cancels one [`OAuth1Flow::authorize`] attempt.
///
/// Has no effect once the attempt finished or was replaced.
#[derive(Clone)]
pub struct AuthorizeHandle {
	inner: Arc<FlowInner>,
	generation: u64,
}
impl AuthorizeHandle {
	/// Whether the attempt is still pending.
	pub fn is_pending(&self) -> bool {
		let state = self.inner.state.lock();

		state.attempt.as_ref().is_some_and(|attempt| attempt.generation == self.generation)
	}
}
impl Cancellable for AuthorizeHandle {
	fn cancel(&self) {
		self.inner.cancel_attempt(self.generation);
	}
}
impl Debug for AuthorizeHandle {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizeHandle")
			.field("generation", &self.generation)
			.field("pending", &self.is_pending())
			.finish()
	}
}

struct Attempt {
	generation: u64,
	in_flight: Option<SignedRequest>,
	completion: (TokenSuccessHandler, FailureHandler),
	callback_url: String,
	headers: Option<HeaderMap>,
}

struct FlowState {
	generation: u64,
	step: FlowStep,
	attempt: Option<Attempt>,
}
impl FlowState {
	fn current(&mut self, generation: u64) -> Option<&mut Attempt> {
		self.attempt.as_mut().filter(|attempt| attempt.generation == generation)
	}

	fn take_current(&mut self, generation: u64) -> Option<Attempt> {
		self.current(generation)?;

		self.attempt.take()
	}
}

struct FlowInner {
	config: OAuth1Config,
	client: OAuthClient,
	observer: RedirectObserver,
	url_handler: RwLock<Arc<dyn AuthorizeUrlHandler>>,
	state: Mutex<FlowState>,
}
impl FlowInner {
	fn on_request_token(self: &Arc<Self>, generation: u64, result: Result<Response>) {
		let _span = FlowSpan::new(FlowKind::RequestToken, "on_response").entered();
		let response = match result {
			Ok(response) => response,
			Err(e) => return self.fail(generation, e),
		};
		let parameters = response.parameters();
		let Some(token) = non_empty(&parameters, OAUTH_TOKEN) else {
			return self.fail(generation, Error::MissingToken);
		};
		let secret = parameters.get(OAUTH_TOKEN_SECRET).cloned().unwrap_or_default();
		let (url, replaced) = {
			let mut state = self.state.lock();
			let Some(attempt) = state.current(generation) else {
				return;
			};
			let url = match self.authorize_url(&token, &attempt.callback_url) {
				Ok(url) => url,
				Err(e) => {
					drop(state);

					return self.fail(generation, e);
				},
			};

			attempt.in_flight = None;
			state.step = FlowStep::AwaitingRedirect;
			self.client.update_credential(|credential| credential.set_request_token(token, secret));

			let inner = Arc::downgrade(self);
			let replaced = self.observer.register(Box::new(move |event| {
				if let Some(inner) = inner.upgrade() {
					inner.on_redirect(generation, event);
				}
			}));

			(url, replaced)
		};

		drop(replaced);
		obs::record_flow_outcome(FlowKind::RequestToken, FlowOutcome::Success);
		obs::record_flow_outcome(FlowKind::Authorize, FlowOutcome::Attempt);

		let handler = self.url_handler.read().clone();

		handler.handle(url);
	}

	fn on_redirect(self: &Arc<Self>, generation: u64, event: RedirectEvent) {
		// Whoever cancelled the registration settles the attempt.
		let RedirectEvent::Redirect(url) = event else {
			return;
		};
		let _span = FlowSpan::new(FlowKind::Authorize, "on_redirect").entered();
		let parameters = parse_redirect_parameters(&url);
		let Some(token) = non_empty(&parameters, OAUTH_TOKEN) else {
			return self.fail(generation, Error::MissingToken);
		};
		let verifier = non_empty(&parameters, OAUTH_VERIFIER);
		let allow_missing = self.config.allow_missing_oauth_verifier;

		if verifier.is_none() && !allow_missing {
			return self.fail(
				generation,
				ConfigError::message(
					"Authorization redirect carried no oauth_verifier; enable allow_missing_oauth_verifier for providers that omit it.",
				)
				.into(),
			);
		}

		let headers = {
			let mut state = self.state.lock();
			let Some(attempt) = state.current(generation) else {
				return;
			};
			let headers = attempt.headers.clone();

			state.step = FlowStep::RequestingAccessToken;
			self.client.update_credential(|credential| {
				credential.set_oauth_token(token.clone());

				if let Some(verifier) = &verifier {
					credential.set_oauth_verifier(verifier.clone());
				}
			});

			headers
		};

		obs::record_flow_outcome(FlowKind::Authorize, FlowOutcome::Success);
		obs::record_flow_outcome(FlowKind::AccessToken, FlowOutcome::Attempt);

		let mut parameters = Parameters::from([(OAUTH_TOKEN.to_owned(), token)]);

		if !allow_missing {
			if let Some(verifier) = verifier {
				parameters.insert(OAUTH_VERIFIER.to_owned(), verifier);
			}
		}

		let on_success = self.clone();
		let on_failure = self.clone();
		let request = self.client.post(
			&self.config.access_token_url,
			parameters,
			headers,
			move |response| on_success.on_access_token(generation, Ok(response)),
			move |e| on_failure.on_access_token(generation, Err(e)),
		);

		self.track(generation, FlowStep::RequestingAccessToken, request);
	}

	fn on_access_token(&self, generation: u64, result: Result<Response>) {
		let _span = FlowSpan::new(FlowKind::AccessToken, "on_response").entered();
		let response = match result {
			Ok(response) => response,
			Err(e) => return self.fail(generation, e),
		};
		let parameters = response.parameters();
		let Some(token) = non_empty(&parameters, OAUTH_TOKEN) else {
			return self.fail(generation, Error::MissingToken);
		};
		let secret = parameters.get(OAUTH_TOKEN_SECRET).cloned().unwrap_or_default();
		let (attempt, credential) = {
			let mut state = self.state.lock();
			let Some(attempt) = state.take_current(generation) else {
				return;
			};

			state.step = FlowStep::Authorized;

			let credential = self.client.update_credential(|credential| {
				credential.set_access_token(token, secret);

				credential.clone()
			});

			(attempt, credential)
		};

		obs::record_flow_outcome(FlowKind::AccessToken, FlowOutcome::Success);
		self.deliver(attempt, Ok(TokenSuccess { credential, response, parameters }));
	}

	/// Remembers the request a step is waiting on so cancellation can reach it.
	fn track(&self, generation: u64, step: FlowStep, request: Option<SignedRequest>) {
		let Some(request) = request else {
			return;
		};
		let orphaned = {
			let mut state = self.state.lock();
			let waiting = state.step == step;

			match state.current(generation) {
				Some(attempt) if waiting => {
					attempt.in_flight = Some(request);

					None
				},
				Some(_) => None,
				None => Some(request),
			}
		};

		// The attempt ended before the request was recorded.
		if let Some(request) = orphaned {
			request.cancel();
		}
	}

	fn fail(&self, generation: u64, error: Error) {
		let (kind, attempt) = {
			let mut state = self.state.lock();
			let kind = state.step.flow_kind();
			let Some(attempt) = state.take_current(generation) else {
				return;
			};

			state.step = if error.is_cancelled() { FlowStep::Cancelled } else { FlowStep::Failed };

			(kind, attempt)
		};

		if let Some(kind) = kind {
			let outcome =
				if error.is_cancelled() { FlowOutcome::Cancelled } else { FlowOutcome::Failure };

			obs::record_flow_outcome(kind, outcome);
		}

		self.deliver(attempt, Err(error));
	}

	fn cancel_attempt(&self, generation: u64) -> bool {
		let (kind, attempt, handler) = {
			let mut state = self.state.lock();
			let kind = state.step.flow_kind();
			let Some(attempt) = state.take_current(generation) else {
				return false;
			};

			state.step = FlowStep::Cancelled;

			(kind, attempt, self.observer.clear())
		};

		drop(handler);
		self.abandon(kind, attempt);

		true
	}

	/// Settles an attempt that lost its place in the state with [`Error::Cancelled`].
	fn abandon(&self, kind: Option<FlowKind>, attempt: Attempt) {
		if let Some(request) = &attempt.in_flight {
			request.cancel();
		}
		if let Some(kind) = kind {
			obs::record_flow_outcome(kind, FlowOutcome::Cancelled);
		}

		self.deliver(attempt, Err(Error::Cancelled));
	}

	fn deliver(&self, attempt: Attempt, result: Result<TokenSuccess>) {
		let (success, failure) = attempt.completion;

		self.client.dispatch(Box::new(move || match result {
			Ok(token) => success(token),
			Err(e) => failure(e),
		}));
	}

	fn authorize_url(&self, token: &str, callback_url: &str) -> Result<Url> {
		let base = &self.config.authorize_url;
		let separator = if base.contains('?') { '&' } else { '?' };
		let mut raw = format!(
			"{base}{separator}{OAUTH_TOKEN}={}",
			self.config.token_encoding().encode(token)
		);

		if self.config.add_callback_url_to_authorize_url {
			raw.push_str(&format!("&{OAUTH_CALLBACK}={}", percent_encode(callback_url)));
		}

		Url::parse(&raw).map_err(|_| Error::Encoding { url: raw })
	}
}

fn non_empty(parameters: &Parameters, key: &str) -> Option<String> {
	parameters.get(key).filter(|value| !value.is_empty()).cloned()
}
