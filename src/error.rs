//! Engine-level error types shared across signing, transports, requests, and flows.

// self
use crate::{_prelude::*, activity::ActivityError, transport::HttpRequest};

/// Engine-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error used wherever an underlying failure is carried as a source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error surfaced through every failure handler.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Activity notifier contract violation.
	#[error(transparent)]
	Activity(#[from] ActivityError),

	/// A URL (or something meant to become one) could not be encoded.
	#[error("Unable to encode `{url}` as a URL.")]
	Encoding {
		/// Offending input.
		url: String,
	},
	/// Authorization redirect did not carry an OAuth token.
	#[error("Authorization redirect is missing the oauth_token parameter.")]
	MissingToken,
	/// Token is expired, either locally (known expiry) or as reported by the provider.
	#[error("OAuth token has expired.")]
	TokenExpired {
		/// Provider failure that revealed the expiry, when available.
		#[source]
		source: Option<BoxError>,
	},
	/// Transport or HTTP-level failure for a dispatched request.
	#[error("Request to `{url}` failed.", url = .request.url)]
	Request {
		/// Underlying transport or status failure.
		#[source]
		source: BoxError,
		/// Request that was sent.
		request: Box<HttpRequest>,
		/// HTTP status code, when the server answered.
		status: Option<u16>,
	},
	/// Request or flow was cancelled before it completed.
	#[error("Request was cancelled.")]
	Cancelled,
	/// Response body could not be decoded into the requested type.
	#[error("Response body could not be decoded.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl Error {
	/// Returns `true` for user-initiated or transport-reported cancellation.
	///
	/// Callers use this to avoid treating cancellation as a failure that needs retries.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Error::Cancelled)
	}

	/// Wraps a transport failure for the provided request.
	pub fn request(source: impl Into<BoxError>, request: HttpRequest) -> Self {
		Self::Request { source: source.into(), request: Box::new(request), status: None }
	}
}

/// Configuration and validation failures raised before any network call.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Free-form configuration problem (e.g. a missing verifier without opt-in).
	#[error("{message}")]
	Message {
		/// Human-readable description.
		message: String,
	},
	/// A configured endpoint is not a valid URL.
	#[error("Endpoint `{endpoint}` is not a valid URL.")]
	InvalidEndpoint {
		/// Configuration key of the endpoint.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A parameter map lacks a required key.
	#[error("Configuration parameter `{key}` is missing.")]
	MissingParameter {
		/// Missing key.
		key: &'static str,
	},
	/// A header name or value is not valid HTTP.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Header name as supplied.
		name: String,
	},
	/// Parameters could not be serialized as a JSON body.
	#[error("Request parameters could not be serialized as JSON.")]
	JsonBody(#[from] serde_json::Error),
	/// OAuth parameters cannot be placed in a body that is not form-encoded.
	#[error("OAuth parameters cannot be written into a non form-encoded request body.")]
	IncompatibleParamsLocation,
	/// Signature method could not produce a signature (e.g. an unusable key).
	#[error("Request signature could not be computed.")]
	Signature {
		/// Underlying signing failure.
		#[source]
		source: BoxError,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Builds a [`ConfigError::Message`].
	pub fn message(message: impl Into<String>) -> Self {
		Self::Message { message: message.into() }
	}

	/// Wraps a signing failure inside [`ConfigError`].
	pub fn signature(src: impl Into<BoxError>) -> Self {
		Self::Signature { source: src.into() }
	}

	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures reported through a transport callback.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Transport reported that the operation was cancelled.
	#[error("Transport operation was cancelled.")]
	Cancelled,
	/// Transport was invalidated before the operation was issued.
	#[error("Transport has been invalidated and accepts no new operations.")]
	Invalidated,
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for TransportError {
	fn from(e: reqwest::Error) -> Self {
		Self::network(e)
	}
}

/// Non-2xx HTTP answer, carried as the source of [`Error::Request`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Server answered with HTTP {status}: {message}.")]
pub struct HttpStatusError {
	/// HTTP status code.
	pub status: u16,
	/// `error error_description` from a JSON body, or the raw body text.
	pub message: String,
}
