//! Mapping of transport outcomes onto success or [`Error`].

// self
use crate::{
	_prelude::*,
	error::{HttpStatusError, TransportError},
	response::Response,
	transport::{HttpRequest, HttpResponse, TransportResult},
};

/// Strategy that decides whether a finished exchange succeeded.
///
/// Replace the default to apply provider-specific rules, e.g. treating a `400` with a
/// particular body as an expired token. Explicit cancellation through
/// [`SignedRequest::cancel`](crate::request::SignedRequest::cancel) is resolved before the
/// classifier runs.
pub trait ResponseClassifier
where
	Self: Send + Sync,
{
	/// Classifies the transport outcome for `request`.
	fn classify(&self, request: &HttpRequest, result: TransportResult) -> Result<Response>;
}
impl<F> ResponseClassifier for F
where
	F: Fn(&HttpRequest, TransportResult) -> Result<Response> + Send + Sync,
{
	fn classify(&self, request: &HttpRequest, result: TransportResult) -> Result<Response> {
		self(request, result)
	}
}

/// Transport cancellation, then transport errors, then non-2xx statuses, then success.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultClassifier;
impl ResponseClassifier for DefaultClassifier {
	fn classify(&self, request: &HttpRequest, result: TransportResult) -> Result<Response> {
		let response = match result {
			Ok(response) => response,
			Err(TransportError::Cancelled) => return Err(Error::Cancelled),
			Err(e) => return Err(Error::request(e, request.clone())),
		};

		if response.is_success() {
			return Ok(Response::new(response, Some(request.clone())));
		}

		let (status_error, error_code) = status_error(&response);

		if error_code.as_deref() == Some("invalid_token") {
			return Err(Error::TokenExpired { source: Some(Box::new(status_error)) });
		}

		Err(Error::Request {
			source: Box::new(status_error),
			request: Box::new(request.clone()),
			status: Some(response.status.as_u16()),
		})
	}
}

#[derive(Deserialize)]
struct ErrorBody {
	error: Option<String>,
	error_description: Option<String>,
}

fn status_error(response: &HttpResponse) -> (HttpStatusError, Option<String>) {
	let status = response.status.as_u16();
	let parsed = serde_json::from_slice::<ErrorBody>(&response.body).ok();
	let Some(ErrorBody { error: Some(code), error_description }) = parsed else {
		let message = String::from_utf8_lossy(&response.body).trim().to_owned();

		return (HttpStatusError { status, message }, None);
	};
	let message = match error_description {
		Some(description) => format!("{code} {description}"),
		None => code.clone(),
	};

	(HttpStatusError { status, message }, Some(code))
}
