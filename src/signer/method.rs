//! OAuth 1 signature methods.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
// self
use crate::{_prelude::*, error::ConfigError};

/// Algorithm that turns a signature base string into `oauth_signature`.
///
/// Implement this trait to plug in methods the crate does not ship, such as `RSA-SHA1` with a
/// private key held by the embedding application (which then ignores `key`).
pub trait SignatureMethod
where
	Self: Send + Sync,
{
	/// Value sent as `oauth_signature_method`.
	fn name(&self) -> &str;

	/// Signs `base_string` with `key` (`consumer_secret&token_secret`, both percent-encoded).
	fn sign(&self, key: &str, base_string: &str) -> Result<String>;
}

/// `HMAC-SHA1`, the method virtually every OAuth 1 provider expects.
#[derive(Clone, Copy, Debug, Default)]
pub struct HmacSha1;
impl SignatureMethod for HmacSha1 {
	fn name(&self) -> &str {
		"HMAC-SHA1"
	}

	fn sign(&self, key: &str, base_string: &str) -> Result<String> {
		let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
			.map_err(|_| ConfigError::signature("HMAC-SHA1 rejected the signing key."))?;

		mac.update(base_string.as_bytes());

		Ok(STANDARD.encode(mac.finalize().into_bytes()))
	}
}

/// `HMAC-SHA256`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HmacSha256;
impl SignatureMethod for HmacSha256 {
	fn name(&self) -> &str {
		"HMAC-SHA256"
	}

	fn sign(&self, key: &str, base_string: &str) -> Result<String> {
		let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
			.map_err(|_| ConfigError::signature("HMAC-SHA256 rejected the signing key."))?;

		mac.update(base_string.as_bytes());

		Ok(STANDARD.encode(mac.finalize().into_bytes()))
	}
}

/// `PLAINTEXT`: the signature is the key itself. Only safe over TLS.
#[derive(Clone, Copy, Debug, Default)]
pub struct Plaintext;
impl SignatureMethod for Plaintext {
	fn name(&self) -> &str {
		"PLAINTEXT"
	}

	fn sign(&self, key: &str, _: &str) -> Result<String> {
		Ok(key.to_owned())
	}
}
