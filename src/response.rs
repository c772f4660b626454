//! Successful responses handed to request success handlers.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	signer::{Parameters, parse_query_string},
	transport::{HttpRequest, HttpResponse},
};

/// A 2xx answer plus the request that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
	/// Raw transport response, body included.
	pub response: HttpResponse,
	/// Signed request that was sent, when known.
	pub request: Option<HttpRequest>,
}
impl Response {
	/// Pairs a transport response with its request.
	pub fn new(response: HttpResponse, request: Option<HttpRequest>) -> Self {
		Self { response, request }
	}

	/// Body bytes.
	pub fn data(&self) -> &[u8] {
		&self.response.body
	}

	/// Body as UTF-8 text, or `None` when it is not valid UTF-8.
	pub fn string(&self) -> Option<String> {
		String::from_utf8(self.response.body.clone()).ok()
	}

	/// Body decoded as `a=1&b=2`, the format token endpoints answer with.
	///
	/// A body that is not UTF-8 yields an empty map.
	pub fn parameters(&self) -> Parameters {
		std::str::from_utf8(&self.response.body).map(parse_query_string).unwrap_or_default()
	}

	/// Decodes the body as JSON.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.response.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| Error::ResponseParse { source })
	}
}
