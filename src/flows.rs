//! OAuth 1 handshake orchestration and its configuration.

pub mod oauth1;
pub mod redirect;

pub use oauth1::*;
pub use redirect::*;

// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenSecret},
	error::ConfigError,
	response::Response,
	signer::{Parameters, TokenEncoding},
};

/// Receives the composed authorization URL, typically to open it in a browser.
///
/// Fire-and-forget: the outcome comes back later through
/// [`OAuth1Flow::handle_redirect`].
pub trait AuthorizeUrlHandler
where
	Self: Send + Sync,
{
	/// Presents `url` to the user.
	fn handle(&self, url: Url);
}
impl<F> AuthorizeUrlHandler for F
where
	F: Fn(Url) + Send + Sync,
{
	fn handle(&self, url: Url) {
		self(url)
	}
}

/// Payload handed to handshake success handlers.
#[derive(Clone, Debug)]
pub struct TokenSuccess {
	/// Credential after the token exchange.
	pub credential: Credential,
	/// Raw token endpoint response.
	pub response: Response,
	/// Decoded response parameters.
	pub parameters: Parameters,
}

/// Endpoints, consumer keys, and knobs of an OAuth 1 provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth1Config {
	/// Consumer key.
	pub consumer_key: String,
	/// Consumer secret.
	pub consumer_secret: TokenSecret,
	/// Temporary-credential endpoint.
	pub request_token_url: String,
	/// Resource-owner authorization endpoint.
	pub authorize_url: String,
	/// Token-exchange endpoint.
	pub access_token_url: String,
	/// Accept redirects without `oauth_verifier` (some providers never send one).
	#[serde(default)]
	pub allow_missing_oauth_verifier: bool,
	/// Append `oauth_callback` to the authorization URL.
	#[serde(default)]
	pub add_callback_url_to_authorize_url: bool,
	/// Escape the token with the RFC 3986 set instead of the URL query set.
	#[serde(default)]
	pub use_rfc3986_to_encode_token: bool,
}
impl OAuth1Config {
	const ACCESS_TOKEN_URL: &'static str = "access_token_url";
	const AUTHORIZE_URL: &'static str = "authorize_url";
	const CONSUMER_KEY: &'static str = "consumer_key";
	const CONSUMER_SECRET: &'static str = "consumer_secret";
	const REQUEST_TOKEN_URL: &'static str = "request_token_url";

	/// Creates a configuration with every knob off.
	pub fn new(
		consumer_key: impl Into<String>,
		consumer_secret: impl Into<String>,
		request_token_url: impl Into<String>,
		authorize_url: impl Into<String>,
		access_token_url: impl Into<String>,
	) -> Self {
		Self {
			consumer_key: consumer_key.into(),
			consumer_secret: TokenSecret::new(consumer_secret),
			request_token_url: request_token_url.into(),
			authorize_url: authorize_url.into(),
			access_token_url: access_token_url.into(),
			allow_missing_oauth_verifier: false,
			add_callback_url_to_authorize_url: false,
			use_rfc3986_to_encode_token: false,
		}
	}

	/// Builds a configuration from a string map keyed by field name.
	pub fn from_parameters(parameters: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
		let get = |key: &'static str| {
			parameters.get(key).cloned().ok_or(ConfigError::MissingParameter { key })
		};

		Ok(Self::new(
			get(Self::CONSUMER_KEY)?,
			get(Self::CONSUMER_SECRET)?,
			get(Self::REQUEST_TOKEN_URL)?,
			get(Self::AUTHORIZE_URL)?,
			get(Self::ACCESS_TOKEN_URL)?,
		))
	}

	/// String map accepted by [`from_parameters`](Self::from_parameters).
	pub fn parameters(&self) -> BTreeMap<String, String> {
		BTreeMap::from([
			(Self::CONSUMER_KEY.to_owned(), self.consumer_key.clone()),
			(Self::CONSUMER_SECRET.to_owned(), self.consumer_secret.expose().to_owned()),
			(Self::REQUEST_TOKEN_URL.to_owned(), self.request_token_url.clone()),
			(Self::AUTHORIZE_URL.to_owned(), self.authorize_url.clone()),
			(Self::ACCESS_TOKEN_URL.to_owned(), self.access_token_url.clone()),
		])
	}

	/// Sets [`allow_missing_oauth_verifier`](Self::allow_missing_oauth_verifier).
	pub fn with_allow_missing_oauth_verifier(mut self, allow: bool) -> Self {
		self.allow_missing_oauth_verifier = allow;

		self
	}

	/// Sets [`add_callback_url_to_authorize_url`](Self::add_callback_url_to_authorize_url).
	pub fn with_add_callback_url_to_authorize_url(mut self, add: bool) -> Self {
		self.add_callback_url_to_authorize_url = add;

		self
	}

	/// Sets [`use_rfc3986_to_encode_token`](Self::use_rfc3986_to_encode_token).
	pub fn with_use_rfc3986_to_encode_token(mut self, use_rfc3986: bool) -> Self {
		self.use_rfc3986_to_encode_token = use_rfc3986;

		self
	}

	/// Checks that every endpoint parses as an absolute URL.
	pub fn validate(&self) -> Result<(), ConfigError> {
		for (endpoint, raw) in [
			(Self::REQUEST_TOKEN_URL, &self.request_token_url),
			(Self::AUTHORIZE_URL, &self.authorize_url),
			(Self::ACCESS_TOKEN_URL, &self.access_token_url),
		] {
			Url::parse(raw).map_err(|source| ConfigError::InvalidEndpoint { endpoint, source })?;
		}

		Ok(())
	}

	/// Escaping applied to the token placed on the authorization URL.
	pub fn token_encoding(&self) -> TokenEncoding {
		TokenEncoding::from_rfc3986_flag(self.use_rfc3986_to_encode_token)
	}

	/// Fresh OAuth 1 credential for this consumer.
	pub fn credential(&self) -> Credential {
		Credential::new(self.consumer_key.clone(), self.consumer_secret.expose())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config() -> OAuth1Config {
		OAuth1Config::new(
			"key",
			"secret",
			"https://api.example.com/oauth/request_token",
			"https://api.example.com/oauth/authorize",
			"https://api.example.com/oauth/access_token",
		)
	}

	#[test]
	fn parameters_round_trip_and_report_missing_keys() {
		let config = config();
		let parameters = config.parameters();

		assert_eq!(
			OAuth1Config::from_parameters(&parameters).expect("Complete map should parse."),
			config
		);

		let mut partial = parameters.clone();

		partial.remove("authorize_url");

		let err = OAuth1Config::from_parameters(&partial).expect_err("Missing key should fail.");

		assert!(matches!(err, ConfigError::MissingParameter { key: "authorize_url" }));
	}

	#[test]
	fn deserializes_with_default_knobs() {
		let config: OAuth1Config = serde_json::from_str(
			r#"{
				"consumer_key": "key",
				"consumer_secret": "secret",
				"request_token_url": "https://api.example.com/oauth/request_token",
				"authorize_url": "https://api.example.com/oauth/authorize",
				"access_token_url": "https://api.example.com/oauth/access_token",
				"allow_missing_oauth_verifier": true
			}"#,
		)
		.expect("Config JSON should deserialize.");

		assert!(config.allow_missing_oauth_verifier);
		assert!(!config.add_callback_url_to_authorize_url);
		assert_eq!(config.consumer_secret.expose(), "secret");
		assert!(!format!("{config:?}").contains("\"secret\""));
	}

	#[test]
	fn validate_names_the_broken_endpoint() {
		let mut config = config();

		config.validate().expect("Fixture endpoints should be valid.");
		config.access_token_url = "not a url".into();

		let err = config.validate().expect_err("Broken endpoint should fail.");

		assert!(matches!(err, ConfigError::InvalidEndpoint { endpoint: "access_token_url", .. }));
	}
}
