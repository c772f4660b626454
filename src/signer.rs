//! Request signing for OAuth 1 signatures and OAuth 2 bearer tokens.
//!
//! [`RequestSigner::sign`] turns an [`UnsignedRequest`] into a ready-to-send
//! [`HttpRequest`]. Request parameters are laid out first (query string for body-less
//! methods, otherwise a form or JSON body), then the credential is applied according to
//! [`SignatureVersion`] and the requested [`ParamsLocation`]. Nonce and timestamp come from
//! an injected [`SigningEntropy`] so identical inputs yield byte-identical output.

pub mod encode;
pub mod entropy;
pub mod method;

pub use encode::{TokenEncoding, encode_parameters, parse_query_string, percent_encode};
pub use entropy::*;
pub use method::*;

// std
use std::time::Duration as StdDuration;
// crates.io
use http::{
	HeaderMap, HeaderValue, Method,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::{Credential, SignatureVersion},
	error::ConfigError,
	transport::HttpRequest,
};

/// Request parameters keyed by name.
pub type Parameters = BTreeMap<String, String>;

const OAUTH_PREFIX: &str = "oauth_";
const OAUTH_VERSION: &str = "1.0";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Where OAuth parameters (or the OAuth 2 token) are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamsLocation {
	/// `Authorization` header.
	#[default]
	AuthorizationHeader,
	/// URL query string.
	RequestUriQuery,
	/// Form-encoded request body; body-less methods fall back to the query string.
	RequestBody,
}

/// Request skeleton before credentials are applied.
#[derive(Clone, Debug, PartialEq)]
pub struct UnsignedRequest {
	/// HTTP method.
	pub method: Method,
	/// Target URL; an existing query string is kept and signed.
	pub url: Url,
	/// Parameters to lay out and sign.
	pub parameters: Parameters,
	/// Caller headers.
	pub headers: HeaderMap,
	/// Raw body. When set, [`parameters`](Self::parameters) go to the query string instead.
	pub body: Option<Vec<u8>>,
	/// Transport timeout.
	pub timeout: Option<StdDuration>,
}
impl UnsignedRequest {
	/// Creates a request without parameters, headers, or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self {
			method,
			url,
			parameters: Parameters::new(),
			headers: HeaderMap::new(),
			body: None,
			timeout: Some(HttpRequest::DEFAULT_TIMEOUT),
		}
	}

	/// Replaces the parameters.
	pub fn with_parameters(mut self, parameters: Parameters) -> Self {
		self.parameters = parameters;

		self
	}

	/// Replaces the headers.
	pub fn with_headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;

		self
	}

	/// Sets a raw body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}
}
impl From<HttpRequest> for UnsignedRequest {
	fn from(request: HttpRequest) -> Self {
		let HttpRequest { method, url, headers, body, timeout } = request;

		Self {
			method,
			url,
			parameters: Parameters::new(),
			headers,
			body: (!body.is_empty()).then_some(body),
			timeout,
		}
	}
}

/// Applies a [`Credential`] to outbound requests.
#[derive(Clone)]
pub struct RequestSigner {
	method: Arc<dyn SignatureMethod>,
	entropy: Arc<dyn SigningEntropy>,
}
impl RequestSigner {
	/// Builds a signer from explicit parts.
	pub fn new(
		method: impl 'static + SignatureMethod,
		entropy: impl 'static + SigningEntropy,
	) -> Self {
		Self { method: Arc::new(method), entropy: Arc::new(entropy) }
	}

	/// Replaces the signature method.
	pub fn with_method(mut self, method: impl 'static + SignatureMethod) -> Self {
		self.method = Arc::new(method);

		self
	}

	/// Replaces the nonce/timestamp source.
	pub fn with_entropy(mut self, entropy: impl 'static + SigningEntropy) -> Self {
		self.entropy = Arc::new(entropy);

		self
	}

	/// Active signature method.
	pub fn signature_method(&self) -> &dyn SignatureMethod {
		self.method.as_ref()
	}

	/// Lays out parameters and applies `credential` at `location`.
	pub fn sign(
		&self,
		credential: &Credential,
		request: UnsignedRequest,
		location: ParamsLocation,
	) -> Result<HttpRequest> {
		let UnsignedRequest { method, url, mut parameters, headers, body, timeout } = request;
		let oauth_extras = match credential.version {
			SignatureVersion::OAuth1 => take_oauth_parameters(&mut parameters),
			SignatureVersion::OAuth2 => Parameters::new(),
		};
		let mut request = HttpRequest { method, url, headers, body: Vec::new(), timeout };

		lay_out_parameters(&mut request, parameters, body)?;

		match credential.version {
			SignatureVersion::OAuth1 =>
				self.apply_oauth1(credential, &mut request, oauth_extras, location)?,
			SignatureVersion::OAuth2 => apply_oauth2(credential, &mut request, location)?,
		}

		Ok(request)
	}

	/// Builds the complete `oauth_*` parameter set, `oauth_signature` included.
	pub fn oauth_parameters(
		&self,
		credential: &Credential,
		request: &HttpRequest,
		extras: Parameters,
	) -> Result<Parameters> {
		let mut oauth = Parameters::from([
			("oauth_consumer_key".to_owned(), credential.consumer_key.clone()),
			("oauth_nonce".to_owned(), self.entropy.nonce()),
			("oauth_signature_method".to_owned(), self.method.name().to_owned()),
			("oauth_timestamp".to_owned(), self.entropy.timestamp().to_string()),
			("oauth_version".to_owned(), OAUTH_VERSION.to_owned()),
		]);

		if !credential.oauth_token.is_empty() {
			oauth.insert("oauth_token".to_owned(), credential.oauth_token.clone());
		}

		oauth.extend(extras);

		let mut signed = encode::query_pairs(&request.url);

		if request.has_form_body() {
			signed.extend(encode::form_pairs(&request.body));
		}

		signed.extend(oauth.iter().map(|(key, value)| (key.clone(), value.clone())));

		let base_string = signature_base_string(&request.method, &request.url, &signed);
		let key = format!(
			"{}&{}",
			percent_encode(credential.consumer_secret.expose()),
			percent_encode(credential.oauth_token_secret.expose())
		);
		let signature = self.method.sign(&key, &base_string)?;

		oauth.insert("oauth_signature".to_owned(), signature);

		Ok(oauth)
	}

	fn apply_oauth1(
		&self,
		credential: &Credential,
		request: &mut HttpRequest,
		extras: Parameters,
		location: ParamsLocation,
	) -> Result<()> {
		if location == ParamsLocation::RequestBody
			&& !is_bodyless(&request.method)
			&& !request.body.is_empty()
			&& !request.has_form_body()
		{
			return Err(ConfigError::IncompatibleParamsLocation.into());
		}

		let oauth = self.oauth_parameters(credential, request, extras)?;

		match location {
			ParamsLocation::AuthorizationHeader => {
				let header = authorization_header(&oauth);

				set_header(request, AUTHORIZATION, &header)?;
			},
			ParamsLocation::RequestUriQuery => append_query(&mut request.url, &oauth),
			ParamsLocation::RequestBody if is_bodyless(&request.method) =>
				append_query(&mut request.url, &oauth),
			ParamsLocation::RequestBody => append_form(request, &oauth)?,
		}

		Ok(())
	}
}
impl Default for RequestSigner {
	fn default() -> Self {
		Self::new(HmacSha1, RandomEntropy)
	}
}
impl Debug for RequestSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestSigner").field("method", &self.method.name()).finish_non_exhaustive()
	}
}

/// Canonical `METHOD&base_url&parameters` string (RFC 5849 section 3.4.1).
///
/// `parameters` are the decoded pairs; they are encoded and sorted here.
pub fn signature_base_string(method: &Method, url: &Url, parameters: &[(String, String)]) -> String {
	let mut base_url = url.clone();

	base_url.set_query(None);
	base_url.set_fragment(None);

	let mut encoded = parameters
		.iter()
		.map(|(key, value)| (percent_encode(key), percent_encode(value)))
		.collect::<Vec<_>>();

	encoded.sort();

	let normalized =
		encoded.iter().map(|(key, value)| format!("{key}={value}")).collect::<Vec<_>>().join("&");

	format!(
		"{}&{}&{}",
		method.as_str().to_ascii_uppercase(),
		percent_encode(base_url.as_str()),
		percent_encode(&normalized)
	)
}

/// `OAuth k="v", ...` header value with keys in order.
pub fn authorization_header(oauth: &Parameters) -> String {
	let fields = oauth
		.iter()
		.map(|(key, value)| format!("{}=\"{}\"", percent_encode(key), percent_encode(value)))
		.collect::<Vec<_>>()
		.join(", ");

	format!("OAuth {fields}")
}

fn apply_oauth2(
	credential: &Credential,
	request: &mut HttpRequest,
	location: ParamsLocation,
) -> Result<()> {
	if credential.oauth_token.is_empty() {
		return Ok(());
	}

	match location {
		ParamsLocation::RequestUriQuery => {
			let token = Parameters::from([("access_token".to_owned(), credential.oauth_token.clone())]);

			append_query(&mut request.url, &token);
		},
		ParamsLocation::AuthorizationHeader | ParamsLocation::RequestBody => {
			let header = format!("Bearer {}", credential.oauth_token);

			set_header(request, AUTHORIZATION, &header)?;
		},
	}

	Ok(())
}

fn take_oauth_parameters(parameters: &mut Parameters) -> Parameters {
	let (oauth, plain): (Parameters, Parameters) =
		std::mem::take(parameters).into_iter().partition(|(key, _)| key.starts_with(OAUTH_PREFIX));

	*parameters = plain;

	oauth
}

fn lay_out_parameters(
	request: &mut HttpRequest,
	parameters: Parameters,
	body: Option<Vec<u8>>,
) -> Result<()> {
	if let Some(body) = body {
		request.body = body;

		append_query(&mut request.url, &parameters);

		return Ok(());
	}
	if parameters.is_empty() {
		return Ok(());
	}
	if is_bodyless(&request.method) {
		append_query(&mut request.url, &parameters);

		return Ok(());
	}
	if request.content_type().is_some_and(|value| value.starts_with("application/json")) {
		request.body = serde_json::to_vec(&parameters).map_err(ConfigError::from)?;

		return Ok(());
	}

	append_form(request, &parameters)
}

fn append_query(url: &mut Url, parameters: &Parameters) {
	if parameters.is_empty() {
		return;
	}

	let extra = encode_parameters(parameters);
	let query = match url.query() {
		Some(query) if !query.is_empty() => format!("{query}&{extra}"),
		_ => extra,
	};

	url.set_query(Some(&query));
}

fn append_form(request: &mut HttpRequest, parameters: &Parameters) -> Result<()> {
	if parameters.is_empty() {
		return Ok(());
	}
	if request.content_type().is_none() {
		set_header(request, CONTENT_TYPE, FORM_CONTENT_TYPE)?;
	}
	if !request.body.is_empty() {
		request.body.push(b'&');
	}

	request.body.extend_from_slice(encode_parameters(parameters).as_bytes());

	Ok(())
}

fn set_header(request: &mut HttpRequest, name: http::header::HeaderName, value: &str) -> Result<()> {
	let value = HeaderValue::from_str(value)
		.map_err(|_| ConfigError::InvalidHeader { name: name.as_str().to_owned() })?;

	request.headers.insert(name, value);

	Ok(())
}

fn is_bodyless(method: &Method) -> bool {
	*method == Method::GET || *method == Method::HEAD || *method == Method::DELETE
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::{TEST_NONCE, TEST_TIMESTAMP};

	fn photos_credential() -> Credential {
		Credential::new("dpf43f3p2l4k3l03", "kd94hf93k423kf44")
			.with_access_token("nnch734d00sl2jdk", "pfkkdhi9sl3r4s00")
	}

	fn signer() -> RequestSigner {
		RequestSigner::default().with_entropy(FixedEntropy::new(TEST_NONCE, TEST_TIMESTAMP))
	}

	fn photos_request() -> UnsignedRequest {
		UnsignedRequest::new(
			Method::GET,
			Url::parse("http://photos.example.net/photos").expect("Fixture URL should parse."),
		)
		.with_parameters(Parameters::from([
			("file".to_owned(), "vacation.jpg".to_owned()),
			("size".to_owned(), "original".to_owned()),
		]))
	}

	#[test]
	fn authorization_header_matches_published_example() {
		let request = signer()
			.sign(&photos_credential(), photos_request(), ParamsLocation::AuthorizationHeader)
			.expect("Signing should succeed.");
		let header = request
			.headers
			.get(AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.expect("Authorization header should be set.");

		assert_eq!(
			header,
			"OAuth oauth_consumer_key=\"dpf43f3p2l4k3l03\", oauth_nonce=\"kllo9940pd9333jh\", \
			 oauth_signature=\"tR3%2BTy81lMeYAr%2FFid0kMTYa%2FWM%3D\", \
			 oauth_signature_method=\"HMAC-SHA1\", oauth_timestamp=\"1191242096\", \
			 oauth_token=\"nnch734d00sl2jdk\", oauth_version=\"1.0\""
		);
		assert_eq!(request.url.as_str(), "http://photos.example.net/photos?file=vacation.jpg&size=original");
		assert!(request.body.is_empty());
	}

	#[test]
	fn signing_is_deterministic_for_fixed_entropy() {
		let first = signer()
			.sign(&photos_credential(), photos_request(), ParamsLocation::AuthorizationHeader)
			.expect("First signing should succeed.");
		let second = signer()
			.sign(&photos_credential(), photos_request(), ParamsLocation::AuthorizationHeader)
			.expect("Second signing should succeed.");

		assert_eq!(first, second);
	}

	#[test]
	fn base_string_includes_query_and_sorted_parameters() {
		let url = Url::parse("http://photos.example.net/photos?size=original")
			.expect("Fixture URL should parse.");
		let base = signature_base_string(
			&Method::GET,
			&url,
			&[
				("size".to_owned(), "original".to_owned()),
				("file".to_owned(), "vacation.jpg".to_owned()),
				("a b".to_owned(), "c&d".to_owned()),
			],
		);

		assert_eq!(
			base,
			"GET&http%3A%2F%2Fphotos.example.net%2Fphotos&a%2520b%3Dc%2526d%26file%3Dvacation.jpg%26size%3Doriginal"
		);
	}

	#[test]
	fn post_parameters_become_a_signed_form_body() {
		let credential = Credential::new("key", "secret");
		let request = UnsignedRequest::new(
			Method::POST,
			Url::parse("https://api.example.com/request_token").expect("Fixture URL should parse."),
		)
		.with_parameters(Parameters::from([
			("oauth_callback".to_owned(), "https://cb.example.com/done".to_owned()),
			("status".to_owned(), "hello world".to_owned()),
		]));
		let signed = signer()
			.sign(&credential, request, ParamsLocation::AuthorizationHeader)
			.expect("Signing should succeed.");
		let header = signed
			.headers
			.get(AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.expect("Authorization header should be set.");

		assert_eq!(signed.body, b"status=hello%20world");
		assert!(signed.has_form_body());
		assert!(header.contains("oauth_callback=\"https%3A%2F%2Fcb.example.com%2Fdone\""));
		assert!(!header.contains("oauth_token="));
		assert!(header.contains("oauth_signature=\"fKSuVIE3uwVaGNUYIHKBUI31rMM%3D\""));
	}

	#[test]
	fn query_location_appends_oauth_parameters() {
		let signed = signer()
			.sign(&photos_credential(), photos_request(), ParamsLocation::RequestUriQuery)
			.expect("Signing should succeed.");
		let query = parse_query_string(signed.url.query().expect("Query should be present."));

		assert_eq!(query["oauth_signature"], "tR3+Ty81lMeYAr/Fid0kMTYa/WM=");
		assert_eq!(query["file"], "vacation.jpg");
		assert!(signed.headers.get(AUTHORIZATION).is_none());
	}

	#[test]
	fn body_location_writes_form_or_falls_back() {
		let credential = Credential::new("key", "secret");
		let post = UnsignedRequest::new(
			Method::POST,
			Url::parse("https://api.example.com/statuses").expect("Fixture URL should parse."),
		);
		let signed = signer()
			.sign(&credential, post.clone(), ParamsLocation::RequestBody)
			.expect("Signing should succeed.");
		let form = parse_query_string(&String::from_utf8_lossy(&signed.body));

		assert!(form.contains_key("oauth_signature"));
		assert!(signed.has_form_body());

		let get = signer()
			.sign(&credential, photos_request(), ParamsLocation::RequestBody)
			.expect("Signing should succeed.");

		assert!(get.body.is_empty());
		assert!(get.url.query().is_some_and(|query| query.contains("oauth_signature=")));

		let json = post
			.with_headers(HeaderMap::from_iter([(
				CONTENT_TYPE,
				HeaderValue::from_static("application/json"),
			)]))
			.with_body("{}");
		let err = signer()
			.sign(&credential, json, ParamsLocation::RequestBody)
			.expect_err("A JSON body cannot carry OAuth parameters.");

		assert!(matches!(err, Error::Config(ConfigError::IncompatibleParamsLocation)));
	}

	#[test]
	fn json_bodies_are_not_signed() {
		let credential = Credential::new("key", "secret");
		let request = UnsignedRequest::new(
			Method::POST,
			Url::parse("https://api.example.com/items").expect("Fixture URL should parse."),
		)
		.with_headers(HeaderMap::from_iter([(
			CONTENT_TYPE,
			HeaderValue::from_static("application/json"),
		)]))
		.with_parameters(Parameters::from([("name".to_owned(), "widget".to_owned())]));
		let signed = signer()
			.sign(&credential, request, ParamsLocation::AuthorizationHeader)
			.expect("Signing should succeed.");
		let bare = signer()
			.sign(
				&credential,
				UnsignedRequest::new(
					Method::POST,
					Url::parse("https://api.example.com/items").expect("Fixture URL should parse."),
				),
				ParamsLocation::AuthorizationHeader,
			)
			.expect("Signing should succeed.");

		assert_eq!(signed.body, br#"{"name":"widget"}"#);
		assert_eq!(signed.headers.get(AUTHORIZATION), bare.headers.get(AUTHORIZATION));
	}

	#[test]
	fn oauth2_uses_bearer_header_or_access_token_query() {
		let credential = Credential::new("client", "secret")
			.with_version(SignatureVersion::OAuth2)
			.with_access_token("bearer-token", "");
		let header = signer()
			.sign(&credential, photos_request(), ParamsLocation::AuthorizationHeader)
			.expect("Signing should succeed.");

		assert_eq!(
			header.headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()),
			Some("Bearer bearer-token")
		);

		let query = signer()
			.sign(&credential, photos_request(), ParamsLocation::RequestUriQuery)
			.expect("Signing should succeed.");

		assert_eq!(
			query.url.as_str(),
			"http://photos.example.net/photos?file=vacation.jpg&size=original&access_token=bearer-token"
		);
		assert!(query.headers.get(AUTHORIZATION).is_none());
	}

	#[test]
	fn prebuilt_requests_keep_their_query_and_body() {
		let prebuilt = HttpRequest::new(
			Method::PUT,
			Url::parse("https://api.example.com/items?a=123&b=").expect("Fixture URL should parse."),
		)
		.with_header(http::header::HeaderName::from_static("someheader"), HeaderValue::from_static("With a value"))
		.with_body("Test Body");
		let unsigned = UnsignedRequest::from(prebuilt.clone());

		assert!(unsigned.parameters.is_empty());
		assert_eq!(unsigned.body.as_deref(), Some(b"Test Body".as_slice()));

		let signed = signer()
			.sign(&Credential::new("key", "secret"), unsigned, ParamsLocation::AuthorizationHeader)
			.expect("Signing should succeed.");

		assert_eq!(signed.url, prebuilt.url);
		assert_eq!(signed.body, prebuilt.body);
		assert_eq!(signed.headers.get("someheader"), prebuilt.headers.get("someheader"));
		assert!(signed.headers.contains_key(AUTHORIZATION));
	}

	#[test]
	fn plus_in_a_query_signs_as_a_space() {
		let sign = |raw: &str| {
			let request = UnsignedRequest::new(Method::GET, Url::parse(raw).expect("Fixture URL should parse."));

			signer()
				.sign(&photos_credential(), request, ParamsLocation::AuthorizationHeader)
				.expect("Signing should succeed.")
				.headers
				.get(AUTHORIZATION)
				.cloned()
				.expect("Authorization header should be set.")
		};

		assert_eq!(sign("https://api.example.com/s?q=a+b"), sign("https://api.example.com/s?q=a%20b"));
		assert_eq!(
			encode::query_pairs(&Url::parse("https://api.example.com/s?q=a+b").expect("Fixture URL should parse.")),
			[("q".to_owned(), "a b".to_owned())]
		);
	}
}
