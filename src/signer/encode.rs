//! Percent-encoding and query-string helpers used by the signer and the handshake.

// crates.io
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
// self
use crate::{_prelude::*, signer::Parameters};

/// RFC 3986 unreserved characters stay literal; everything else is escaped.
const RFC3986: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');
/// Characters allowed verbatim inside a URL query component.
const QUERY: &AsciiSet = &RFC3986
	.remove(b'!')
	.remove(b'$')
	.remove(b'&')
	.remove(b'\'')
	.remove(b'(')
	.remove(b')')
	.remove(b'*')
	.remove(b'+')
	.remove(b',')
	.remove(b'/')
	.remove(b':')
	.remove(b';')
	.remove(b'=')
	.remove(b'?')
	.remove(b'@');

/// How a token is escaped before it is spliced into the authorize URL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenEncoding {
	/// Escapes only what a query component cannot carry (legacy provider behaviour).
	#[default]
	Query,
	/// Escapes everything outside the RFC 3986 unreserved set.
	Rfc3986,
}
impl TokenEncoding {
	/// Selects the encoding from the `use_rfc3986_to_encode_token` knob.
	pub fn from_rfc3986_flag(use_rfc3986: bool) -> Self {
		if use_rfc3986 { Self::Rfc3986 } else { Self::Query }
	}

	/// Encodes `value`.
	pub fn encode(self, value: &str) -> String {
		match self {
			Self::Query => utf8_percent_encode(value, QUERY).to_string(),
			Self::Rfc3986 => percent_encode(value),
		}
	}
}

/// OAuth percent-encoding (RFC 5849 section 3.6).
pub fn percent_encode(value: &str) -> String {
	utf8_percent_encode(value, RFC3986).to_string()
}

/// Decodes `%XX` escapes, keeping the input when it is not valid UTF-8 afterwards.
///
/// `+` is left untouched.
pub fn percent_decode(value: &str) -> String {
	percent_decode_str(value)
		.decode_utf8()
		.map(|decoded| decoded.into_owned())
		.unwrap_or_else(|_| value.to_owned())
}

/// Renders `key=value` pairs joined by `&`, both sides percent-encoded, in key order.
pub fn encode_parameters(parameters: &Parameters) -> String {
	parameters
		.iter()
		.map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
		.collect::<Vec<_>>()
		.join("&")
}

/// Splits `a=1&b=2` into a map.
///
/// Pairs split on the first `=`; a key without `=` maps to an empty value. Both sides are
/// percent-decoded. Later duplicates overwrite earlier ones.
pub fn parse_query_string(input: &str) -> Parameters {
	split_pairs(input).collect()
}

/// Decoded query pairs of `url` in order, duplicates included.
pub(crate) fn query_pairs(url: &Url) -> Vec<(String, String)> {
	url.query_pairs().map(|(key, value)| (key.into_owned(), value.into_owned())).collect()
}

/// Decoded pairs of an `application/x-www-form-urlencoded` body, duplicates included.
pub(crate) fn form_pairs(body: &[u8]) -> Vec<(String, String)> {
	url::form_urlencoded::parse(body)
		.map(|(key, value)| (key.into_owned(), value.into_owned()))
		.collect()
}

fn split_pairs(input: &str) -> impl Iterator<Item = (String, String)> + '_ {
	input.strip_prefix('?').unwrap_or(input).split('&').filter(|pair| !pair.is_empty()).map(split_pair)
}

fn split_pair(pair: &str) -> (String, String) {
	match pair.split_once('=') {
		Some((key, value)) => (percent_decode(key), percent_decode(value)),
		None => (percent_decode(pair), String::new()),
	}
}
