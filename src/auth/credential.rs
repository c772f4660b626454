//! Mutable credential bag consulted by the request signer.

// self
use crate::{_prelude::*, auth::secret::TokenSecret};

/// Signing protocol a [`Credential`] is used with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureVersion {
	/// OAuth 1.0a `Authorization: OAuth ...` signatures.
	#[default]
	OAuth1,
	/// OAuth 2.0 bearer tokens.
	OAuth2,
}
impl SignatureVersion {
	/// Returns a stable label suitable for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			SignatureVersion::OAuth1 => "oauth1",
			SignatureVersion::OAuth2 => "oauth2",
		}
	}
}
impl Display for SignatureVersion {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Handshake progress recorded on a [`Credential`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorizationStage {
	/// Only consumer keys are known.
	#[default]
	Unauthorized,
	/// A temporary request token (and secret) is held.
	RequestTokenHeld,
	/// An access token is held.
	Authorized,
}

/// Keys, tokens, and secrets used to sign requests.
///
/// The stage only moves through the token setters
/// ([`set_request_token`](Credential::set_request_token) and
/// [`set_access_token`](Credential::set_access_token)); all other setters are plain field writes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	/// Consumer (client) key.
	pub consumer_key: String,
	/// Consumer (client) secret.
	pub consumer_secret: TokenSecret,
	/// Current OAuth token (request token, access token, or OAuth 2 bearer token).
	pub oauth_token: String,
	/// Secret paired with [`oauth_token`](Self::oauth_token); empty when none was issued.
	pub oauth_token_secret: TokenSecret,
	/// OAuth 2 refresh token, if issued.
	pub oauth_refresh_token: Option<TokenSecret>,
	/// Verifier returned through the authorization redirect.
	pub oauth_verifier: String,
	/// Instant after which the token must not be used.
	pub oauth_token_expires_at: Option<OffsetDateTime>,
	/// Signing protocol.
	pub version: SignatureVersion,
	stage: AuthorizationStage,
}
impl Credential {
	/// Creates an unauthorized OAuth 1 credential for the provided consumer pair.
	pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
		Self {
			consumer_key: consumer_key.into(),
			consumer_secret: TokenSecret::new(consumer_secret),
			oauth_token: String::new(),
			oauth_token_secret: TokenSecret::default(),
			oauth_refresh_token: None,
			oauth_verifier: String::new(),
			oauth_token_expires_at: None,
			version: SignatureVersion::OAuth1,
			stage: AuthorizationStage::Unauthorized,
		}
	}

	/// Overrides the signing protocol.
	pub fn with_version(mut self, version: SignatureVersion) -> Self {
		self.version = version;

		self
	}

	/// Seeds an already-issued access token (e.g. restored from the embedder's storage).
	pub fn with_access_token(
		mut self,
		token: impl Into<String>,
		token_secret: impl Into<String>,
	) -> Self {
		self.set_access_token(token, token_secret);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn with_expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.oauth_token_expires_at = Some(instant);

		self
	}

	/// Current handshake stage.
	pub fn stage(&self) -> AuthorizationStage {
		self.stage
	}

	/// Stores a temporary request token obtained from the request-token endpoint.
	pub fn set_request_token(&mut self, token: impl Into<String>, token_secret: impl Into<String>) {
		self.oauth_token = token.into();
		self.oauth_token_secret = TokenSecret::new(token_secret);
		self.stage = AuthorizationStage::RequestTokenHeld;
	}

	/// Stores an access token, completing the handshake.
	pub fn set_access_token(&mut self, token: impl Into<String>, token_secret: impl Into<String>) {
		self.oauth_token = token.into();
		self.oauth_token_secret = TokenSecret::new(token_secret);
		self.stage = AuthorizationStage::Authorized;
	}

	/// Drops every token, the verifier, and the expiry, returning to
	/// [`AuthorizationStage::Unauthorized`].
	pub fn clear_tokens(&mut self) {
		self.oauth_token.clear();
		self.oauth_token_secret = TokenSecret::default();
		self.oauth_refresh_token = None;
		self.oauth_verifier.clear();
		self.oauth_token_expires_at = None;
		self.stage = AuthorizationStage::Unauthorized;
	}

	/// Overwrites the token value only (the redirect echoes the request token back).
	pub fn set_oauth_token(&mut self, token: impl Into<String>) {
		self.oauth_token = token.into();
	}

	/// Stores the verifier delivered through the authorization redirect.
	pub fn set_oauth_verifier(&mut self, verifier: impl Into<String>) {
		self.oauth_verifier = verifier.into();
	}

	/// Returns `true` iff an expiry is known and has been reached at `instant`.
	pub fn is_token_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.oauth_token_expires_at.is_some_and(|expires_at| expires_at <= instant)
	}

	/// Returns `true` iff an expiry is known and has passed.
	pub fn is_token_expired(&self) -> bool {
		self.is_token_expired_at(OffsetDateTime::now_utc())
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("consumer_key", &self.consumer_key)
			.field("consumer_secret", &"<redacted>")
			.field("oauth_token", &self.oauth_token)
			.field("oauth_token_secret", &"<redacted>")
			.field("oauth_refresh_token", &self.oauth_refresh_token.as_ref().map(|_| "<redacted>"))
			.field("oauth_verifier", &self.oauth_verifier)
			.field("oauth_token_expires_at", &self.oauth_token_expires_at)
			.field("version", &self.version)
			.field("stage", &self.stage)
			.finish()
	}
}
