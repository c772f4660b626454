//! [`TransportHandler`] backed by `reqwest`, driven on a Tokio runtime.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// crates.io
use reqwest::Client as ReqwestClient;
use tokio::{runtime::Handle, task::AbortHandle};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	obs::{FlowKind, FlowSpan},
	transport::{
		HttpRequest, HttpResponse, TransportCallback, TransportHandler, TransportOperation,
		TransportResult,
	},
};

/// Real HTTP transport.
///
/// Each resumed operation runs as its own task on the configured runtime, so callbacks fire
/// on a runtime worker thread. Pair the client with a dispatcher when handlers must run
/// elsewhere.
#[derive(Clone)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	runtime: Handle,
	invalidated: Arc<AtomicBool>,
}
impl ReqwestTransport {
	/// Uses a default [`ReqwestClient`] and spawns work onto `runtime`.
	pub fn new(runtime: Handle) -> Self {
		Self::with_client(ReqwestClient::default(), runtime)
	}

	/// Wraps an existing reqwest client.
	pub fn with_client(client: ReqwestClient, runtime: Handle) -> Self {
		Self { client, runtime, invalidated: Arc::new(AtomicBool::new(false)) }
	}

	/// Uses a default client on the runtime the caller is running in.
	pub fn current() -> Result<Self> {
		let runtime = Handle::try_current().map_err(ConfigError::http_client_build)?;

		Ok(Self::new(runtime))
	}
}
impl TransportHandler for ReqwestTransport {
	fn data_operation(
		&self,
		request: HttpRequest,
		callback: TransportCallback,
	) -> Box<dyn TransportOperation> {
		Box::new(ReqwestOperation {
			client: self.client.clone(),
			runtime: self.runtime.clone(),
			rejected: self.invalidated.load(Ordering::SeqCst),
			request: Mutex::new(Some(request)),
			callback: Arc::new(Mutex::new(Some(callback))),
			task: Mutex::new(None),
		})
	}

	fn finish_operations_and_invalidate(&self) {
		self.invalidated.store(true, Ordering::SeqCst);
	}
}
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.client
	}
}
impl Debug for ReqwestTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ReqwestTransport")
			.field("invalidated", &self.invalidated.load(Ordering::SeqCst))
			.finish_non_exhaustive()
	}
}

type SharedCallback = Arc<Mutex<Option<TransportCallback>>>;

struct ReqwestOperation {
	client: ReqwestClient,
	runtime: Handle,
	rejected: bool,
	request: Mutex<Option<HttpRequest>>,
	callback: SharedCallback,
	task: Mutex<Option<AbortHandle>>,
}
impl TransportOperation for ReqwestOperation {
	fn resume(&self) {
		let Some(request) = self.request.lock().take() else {
			return;
		};

		if self.rejected {
			let callback = self.callback.lock().take();

			if let Some(callback) = callback {
				callback(Err(TransportError::Invalidated));
			}

			return;
		}

		// Held until the abort handle is stored; `cancel` takes the callback before the task.
		let pending = self.callback.lock();

		// Cancelled before it was ever started.
		if pending.is_none() {
			return;
		}

		let client = self.client.clone();
		let callback = self.callback.clone();
		let span = FlowSpan::new(FlowKind::SignedRequest, "transport");
		let task = self.runtime.spawn(span.instrument(async move {
			let result = execute(&client, request).await;
			let callback = callback.lock().take();

			if let Some(callback) = callback {
				callback(result);
			}
		}));

		*self.task.lock() = Some(task.abort_handle());

		drop(pending);
	}

	fn cancel(&self) {
		let callback = self.callback.lock().take();

		if let Some(task) = self.task.lock().take() {
			task.abort();
		}
		if let Some(callback) = callback {
			callback(Err(TransportError::Cancelled));
		}
	}
}

async fn execute(client: &ReqwestClient, request: HttpRequest) -> TransportResult {
	let HttpRequest { method, url, headers, body, timeout } = request;
	let mut builder = client.request(method, url).headers(headers);

	if !body.is_empty() {
		builder = builder.body(body);
	}
	if let Some(timeout) = timeout {
		builder = builder.timeout(timeout);
	}

	let response = builder.send().await?;
	let status = response.status();
	let headers = response.headers().to_owned();
	let url = response.url().to_owned();
	let body = response.bytes().await?.to_vec();

	Ok(HttpResponse { status, headers, url: Some(url), body })
}
