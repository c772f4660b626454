//! Transport primitives for signed requests.
//!
//! The module exposes [`TransportHandler`] and [`TransportOperation`] so embedders can plug any
//! HTTP engine into the client. Handlers hand out one operation per request; the operation is
//! created suspended, starts on [`TransportOperation::resume`], and reports its outcome through
//! the [`TransportCallback`] it was built with. Callbacks fire at most once and may run on any
//! thread; [`SignedRequest`](crate::request::SignedRequest) re-dispatches them onto the client's
//! [`Dispatcher`].

pub mod dispatch;
pub mod memory;
#[cfg(feature = "reqwest")] pub mod reqwest_transport;

pub use dispatch::*;
pub use memory::MemoryTransport;
#[cfg(feature = "reqwest")] pub use reqwest_transport::ReqwestTransport;

// std
use std::time::Duration as StdDuration;
// crates.io
use http::{HeaderMap, HeaderValue, Method, StatusCode, header::CONTENT_TYPE};
// self
use crate::{_prelude::*, error::TransportError};

/// Outcome delivered to a [`TransportCallback`].
pub type TransportResult = std::result::Result<HttpResponse, TransportError>;

/// Completion callback attached to a transport operation.
pub type TransportCallback = Box<dyn FnOnce(TransportResult) + Send>;

/// Fully-built outbound HTTP request.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL including the query string.
	pub url: Url,
	/// Header map.
	pub headers: HeaderMap,
	/// Body bytes; empty when the request has no body.
	pub body: Vec<u8>,
	/// Transport-level timeout, if any.
	pub timeout: Option<StdDuration>,
}
impl HttpRequest {
	/// Timeout applied to requests built through [`HttpRequest::new`].
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(60);

	/// Creates an empty request with the default timeout.
	pub fn new(method: Method, url: Url) -> Self {
		Self {
			method,
			url,
			headers: HeaderMap::new(),
			body: Vec::new(),
			timeout: Some(Self::DEFAULT_TIMEOUT),
		}
	}

	/// Replaces the body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = body.into();

		self
	}

	/// Sets a header value.
	pub fn with_header(mut self, name: http::header::HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Returns the `Content-Type` header when it is valid UTF-8.
	pub fn content_type(&self) -> Option<&str> {
		self.headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok())
	}

	/// Returns `true` when the body is `application/x-www-form-urlencoded`.
	pub fn has_form_body(&self) -> bool {
		!self.body.is_empty()
			&& self
				.content_type()
				.is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
	}
}

/// HTTP response reported by a transport.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Final URL after redirects, when known.
	pub url: Option<Url>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Creates a response with the provided status and body and no headers.
	pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: HeaderMap::new(), url: None, body: body.into() }
	}

	/// Sets a header value.
	pub fn with_header(mut self, name: http::header::HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Records the URL that produced the response.
	pub fn with_url(mut self, url: Url) -> Self {
		self.url = Some(url);

		self
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}
}

/// Handle for one suspended or running transport exchange.
pub trait TransportOperation
where
	Self: Send + Sync,
{
	/// Starts the exchange. Calling it more than once has no effect.
	fn resume(&self);

	/// Cancels the exchange.
	///
	/// Transports may report [`TransportError::Cancelled`] through the callback or stay
	/// silent; callers must handle both.
	fn cancel(&self);
}

/// Capability seam over an HTTP engine.
///
/// Implementations may be shared across many requests. After
/// [`finish_operations_and_invalidate`](TransportHandler::finish_operations_and_invalidate)
/// already-running operations complete normally while new ones fail with
/// [`TransportError::Invalidated`].
pub trait TransportHandler
where
	Self: Send + Sync,
{
	/// Builds a suspended operation for `request` that reports through `callback`.
	fn data_operation(
		&self,
		request: HttpRequest,
		callback: TransportCallback,
	) -> Box<dyn TransportOperation>;

	/// Builds a suspended operation for a plain request to `url`.
	fn data_operation_for_url(
		&self,
		url: Url,
		callback: TransportCallback,
	) -> Box<dyn TransportOperation> {
		self.data_operation(self.request(url), callback)
	}

	/// Lets running operations finish and rejects every later one.
	fn finish_operations_and_invalidate(&self);

	/// Creates the transport's default request object for `url`.
	fn request(&self, url: Url) -> HttpRequest {
		HttpRequest::new(Method::GET, url)
	}
}
