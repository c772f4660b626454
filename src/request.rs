//! One signed HTTP exchange and its lifecycle.
//!
//! A [`SignedRequest`] moves through `idle → in flight → {succeeded, failed, cancelled}`.
//! Whatever path it takes, exactly one handler runs and the activity counter sees exactly one
//! start/end pair once counting began.

pub mod classify;

pub use classify::*;

// self
use crate::{
	_prelude::*,
	activity::NetworkActivityNotifier,
	obs::{self, FlowKind, FlowOutcome},
	response::Response,
	transport::{
		Dispatcher, HttpRequest, InlineDispatcher, TransportHandler, TransportOperation,
		TransportResult,
	},
};

/// Handler invoked with a successful [`Response`].
pub type SuccessHandler = Box<dyn FnOnce(Response) + Send>;

/// Handler invoked with the terminal [`Error`].
pub type FailureHandler = Box<dyn FnOnce(Error) + Send>;

/// Anything the caller can abort.
pub trait Cancellable
where
	Self: Send + Sync,
{
	/// Aborts the work. Calling it more than once, or after completion, has no effect.
	fn cancel(&self);
}

/// Collaborators shared by every request a client issues.
#[derive(Clone)]
pub struct RequestContext {
	/// Activity counter, if any.
	pub notifier: Option<Arc<dyn NetworkActivityNotifier>>,
	/// Execution context for handlers.
	pub dispatcher: Arc<dyn Dispatcher>,
	/// Outcome classification strategy.
	pub classifier: Arc<dyn ResponseClassifier>,
}
impl Default for RequestContext {
	fn default() -> Self {
		Self {
			notifier: None,
			dispatcher: Arc::new(InlineDispatcher),
			classifier: Arc::new(DefaultClassifier),
		}
	}
}
impl Debug for RequestContext {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestContext")
			.field("notifier", &self.notifier.as_ref().map(|n| n.active_network_activities()))
			.finish_non_exhaustive()
	}
}

/// Observable lifecycle position of a [`SignedRequest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestState {
	/// Built but not started.
	Idle,
	/// Handed to the transport.
	InFlight,
	/// Success handler ran (or is scheduled).
	Succeeded,
	/// Failure handler ran (or is scheduled) with a non-cancellation error.
	Failed,
	/// Cancelled by the caller or the transport.
	Cancelled,
}

enum State {
	Idle,
	/// Cancelled before `start`; the failure handler runs once `start` is called.
	CancelledBeforeStart,
	InFlight {
		operation: Option<Arc<dyn TransportOperation>>,
		handlers: Option<(SuccessHandler, FailureHandler)>,
	},
	Finished(RequestState),
}

/// Cheap-to-clone handle to one signed exchange.
#[derive(Clone)]
pub struct SignedRequest(Arc<SignedRequestInner>);
impl SignedRequest {
	/// Wraps an already-signed request.
	pub fn new(
		request: HttpRequest,
		transport: Arc<dyn TransportHandler>,
		context: RequestContext,
	) -> Self {
		Self(Arc::new(SignedRequestInner {
			request,
			transport,
			context,
			state: Mutex::new(State::Idle),
		}))
	}

	/// The signed request that is (or will be) sent.
	pub fn request(&self) -> &HttpRequest {
		&self.0.request
	}

	/// Current lifecycle position.
	pub fn state(&self) -> RequestState {
		match &*self.0.state.lock() {
			State::Idle => RequestState::Idle,
			State::CancelledBeforeStart => RequestState::Cancelled,
			State::InFlight { .. } => RequestState::InFlight,
			State::Finished(state) => *state,
		}
	}

	/// Sends the request; exactly one of the handlers runs on the context's dispatcher.
	///
	/// Only the first call has an effect.
	pub fn start(
		&self,
		success: impl 'static + Send + FnOnce(Response),
		failure: impl 'static + Send + FnOnce(Error),
	) {
		let inner = &self.0;

		{
			let mut state = inner.state.lock();

			match &*state {
				State::Idle => {},
				State::CancelledBeforeStart => {
					*state = State::Finished(RequestState::Cancelled);

					drop(state);

					obs::record_flow_outcome(FlowKind::SignedRequest, FlowOutcome::Cancelled);
					inner.context.dispatcher.dispatch(Box::new(move || failure(Error::Cancelled)));

					return;
				},
				State::InFlight { .. } | State::Finished(_) => return,
			}

			*state = State::InFlight {
				operation: None,
				handlers: Some((Box::new(success), Box::new(failure))),
			};

			// Counted under the state lock so a concurrent cancel always sees a started activity.
			if let Some(notifier) = &inner.context.notifier {
				notifier.network_activity_started();
			}
		}

		obs::record_flow_outcome(FlowKind::SignedRequest, FlowOutcome::Attempt);

		let callback_inner = inner.clone();
		let operation: Arc<dyn TransportOperation> = Arc::from(inner.transport.data_operation(
			inner.request.clone(),
			Box::new(move |result| callback_inner.complete(result)),
		));
		let resume = {
			let mut state = inner.state.lock();

			match &mut *state {
				State::InFlight { operation: slot, .. } => {
					*slot = Some(operation.clone());

					true
				},
				_ => false,
			}
		};

		if resume {
			operation.resume();
		} else {
			operation.cancel();
		}
	}

	/// Cancels the request.
	///
	/// Before [`start`](Self::start) the request is marked cancelled and `start` reports
	/// [`Error::Cancelled`]. In flight, the transport operation is cancelled, the activity is
	/// ended, and the failure handler receives [`Error::Cancelled`]. After completion this is a
	/// no-op.
	pub fn cancel(&self) {
		let inner = &self.0;
		let (operation, handlers) = {
			let mut state = inner.state.lock();

			match &mut *state {
				State::Idle => {
					*state = State::CancelledBeforeStart;

					return;
				},
				State::InFlight { operation, handlers } => {
					let taken = (operation.take(), handlers.take());

					*state = State::Finished(RequestState::Cancelled);

					taken
				},
				State::CancelledBeforeStart | State::Finished(_) => return,
			}
		};

		if let Some(operation) = operation {
			operation.cancel();
		}
		if let Some((_, failure)) = handlers {
			inner.finish(FlowOutcome::Cancelled, Box::new(move || failure(Error::Cancelled)));
		}
	}
}
impl Cancellable for SignedRequest {
	fn cancel(&self) {
		SignedRequest::cancel(self);
	}
}
impl Debug for SignedRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SignedRequest")
			.field("method", &self.0.request.method)
			.field("url", &self.0.request.url.as_str())
			.field("state", &self.state())
			.finish()
	}
}

struct SignedRequestInner {
	request: HttpRequest,
	transport: Arc<dyn TransportHandler>,
	context: RequestContext,
	state: Mutex<State>,
}
impl SignedRequestInner {
	fn complete(&self, result: TransportResult) {
		let handlers = {
			let mut state = self.state.lock();
			let State::InFlight { handlers, .. } = &mut *state else {
				return;
			};
			let Some(handlers) = handlers.take() else {
				return;
			};

			// Placeholder until the outcome is known; drops the operation and its callback.
			*state = State::Finished(RequestState::InFlight);

			handlers
		};
		let outcome = self.context.classifier.classify(&self.request, result);
		let (state, flow_outcome) = match &outcome {
			Ok(_) => (RequestState::Succeeded, FlowOutcome::Success),
			Err(e) if e.is_cancelled() => (RequestState::Cancelled, FlowOutcome::Cancelled),
			Err(_) => (RequestState::Failed, FlowOutcome::Failure),
		};

		*self.state.lock() = State::Finished(state);

		let (success, failure) = handlers;

		self.finish(
			flow_outcome,
			Box::new(move || match outcome {
				Ok(response) => success(response),
				Err(e) => failure(e),
			}),
		);
	}

	/// Ends the activity, then hands the terminal handler to the dispatcher.
	fn finish(&self, outcome: FlowOutcome, job: Box<dyn FnOnce() + Send>) {
		if let Some(notifier) = &self.context.notifier {
			if let Err(e) = notifier.network_activity_ended() {
				obs::log_unbalanced_activity(FlowKind::SignedRequest, &e);
			}
		}

		obs::record_flow_outcome(FlowKind::SignedRequest, outcome);
		self.context.dispatcher.dispatch(job);
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::mpsc::Receiver;
	// crates.io
	use http::{Method, StatusCode};
	// self
	use super::*;
	use crate::{
		_preludet::capture,
		activity::DefaultNetworkActivityNotifier,
		error::TransportError,
		transport::{HttpResponse, MemoryTransport, QueueDispatcher},
	};

	const URL: &str = "https://api.example.com/1/me";

	struct Fixture {
		transport: Arc<MemoryTransport>,
		notifier: Arc<DefaultNetworkActivityNotifier>,
		request: SignedRequest,
	}

	fn fixture(transport: MemoryTransport) -> Fixture {
		let transport = Arc::new(transport);
		let notifier = Arc::new(DefaultNetworkActivityNotifier::default());
		let context = RequestContext { notifier: Some(notifier.clone()), ..Default::default() };
		let request = SignedRequest::new(
			HttpRequest::new(Method::GET, Url::parse(URL).expect("Fixture URL should parse.")),
			transport.clone(),
			context,
		);

		Fixture { transport, notifier, request }
	}

	fn start(request: &SignedRequest) -> (Receiver<Response>, Receiver<Error>) {
		let (success, successes) = capture::<Response>();
		let (failure, failures) = capture::<Error>();

		request.start(success, failure);

		(successes, failures)
	}

	#[test]
	fn success_runs_once_and_balances_activity() {
		let Fixture { transport, notifier, request } = fixture(MemoryTransport::default());
		let (successes, failures) = start(&request);

		assert_eq!(notifier.active_network_activities(), 1);
		assert_eq!(request.state(), RequestState::InFlight);
		assert!(transport.fulfill(URL, Ok(HttpResponse::new(StatusCode::OK, "Success!"))));

		let response = successes.try_recv().expect("Success handler should run.");

		assert_eq!(response.string().as_deref(), Some("Success!"));
		assert_eq!(notifier.active_network_activities(), 0);
		assert_eq!(request.state(), RequestState::Succeeded);

		request.cancel();
		request.cancel();

		assert!(successes.try_recv().is_err());
		assert!(failures.try_recv().is_err());
		assert_eq!(notifier.active_network_activities(), 0);
	}

	#[test]
	fn second_start_is_ignored() {
		let Fixture { transport, notifier, request } = fixture(MemoryTransport::default());
		let (successes, _failures) = start(&request);
		let (late_successes, _late_failures) = start(&request);

		assert_eq!(notifier.active_network_activities(), 1);
		assert_eq!(transport.requests().len(), 1);
		assert!(transport.fulfill(URL, Ok(HttpResponse::new(StatusCode::OK, ""))));
		assert!(successes.try_recv().is_ok());
		assert!(late_successes.try_recv().is_err());
	}

	#[test]
	fn cancel_in_flight_reports_cancelled_once() {
		for transport in [MemoryTransport::default(), MemoryTransport::reporting_cancellation()] {
			let Fixture { transport, notifier, request } = fixture(transport);
			let (successes, failures) = start(&request);

			request.cancel();
			request.cancel();

			let err = failures.try_recv().expect("Failure handler should run.");

			assert!(err.is_cancelled());
			assert!(failures.try_recv().is_err());
			assert!(successes.try_recv().is_err());
			assert_eq!(notifier.active_network_activities(), 0);
			assert_eq!(request.state(), RequestState::Cancelled);
			assert!(!transport.fulfill(URL, Ok(HttpResponse::new(StatusCode::OK, ""))));
		}
	}

	#[test]
	fn cancel_before_start_never_counts() {
		let Fixture { transport, notifier, request } = fixture(MemoryTransport::default());

		request.cancel();

		let (successes, failures) = start(&request);

		assert!(failures.try_recv().expect("Failure handler should run.").is_cancelled());
		assert!(successes.try_recv().is_err());
		assert!(transport.requests().is_empty());
		assert_eq!(notifier.active_network_activities(), 0);
	}

	#[test]
	fn transport_failures_surface_as_request_errors() {
		let Fixture { transport, notifier, request } = fixture(MemoryTransport::default());
		let (_successes, failures) = start(&request);

		assert!(transport.fulfill(URL, Err(TransportError::Io(std::io::ErrorKind::ConnectionRefused.into()))));

		let err = failures.try_recv().expect("Failure handler should run.");

		assert!(matches!(err, Error::Request { status: None, .. }));
		assert_eq!(request.state(), RequestState::Failed);
		assert_eq!(notifier.active_network_activities(), 0);
	}

	#[test]
	fn handlers_run_on_dispatcher_after_decrement() {
		let transport = Arc::new(MemoryTransport::default());
		let notifier = Arc::new(DefaultNetworkActivityNotifier::default());
		let queue = Arc::new(QueueDispatcher::default());
		let context = RequestContext {
			notifier: Some(notifier.clone()),
			dispatcher: queue.clone(),
			..Default::default()
		};
		let request = SignedRequest::new(
			HttpRequest::new(Method::GET, Url::parse(URL).expect("Fixture URL should parse.")),
			transport.clone(),
			context,
		);
		let observed = Arc::new(Mutex::new(None));
		let observed_notifier = notifier.clone();
		let observed_slot = observed.clone();

		request.start(
			move |_| {
				*observed_slot.lock() = Some(observed_notifier.active_network_activities());
			},
			|_| {},
		);

		assert!(transport.fulfill(URL, Ok(HttpResponse::new(StatusCode::OK, ""))));
		assert_eq!(*observed.lock(), None);
		assert_eq!(queue.run_pending(), 1);
		assert_eq!(*observed.lock(), Some(0));
	}

	#[test]
	fn invalidated_transport_fails_the_request() {
		let Fixture { transport, notifier, request } = fixture(MemoryTransport::default());

		transport.finish_operations_and_invalidate();

		let (_successes, failures) = start(&request);
		let err = failures.try_recv().expect("Failure handler should run.");
		let Error::Request { source, .. } = err else {
			panic!("Unexpected error variant.");
		};

		assert!(matches!(source.downcast_ref::<TransportError>(), Some(TransportError::Invalidated)));
		assert_eq!(notifier.active_network_activities(), 0);
	}
}
