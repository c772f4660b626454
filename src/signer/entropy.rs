//! Nonce and timestamp sources for OAuth 1 signatures.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::_prelude::*;

/// Supplies the per-request `oauth_nonce` and `oauth_timestamp`.
pub trait SigningEntropy
where
	Self: Send + Sync,
{
	/// Unique value for one request.
	fn nonce(&self) -> String;

	/// Seconds since the Unix epoch.
	fn timestamp(&self) -> u64;
}

/// Random alphanumeric nonces and the system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomEntropy;
impl RandomEntropy {
	const NONCE_LEN: usize = 32;
}
impl SigningEntropy for RandomEntropy {
	fn nonce(&self) -> String {
		rand::rng().sample_iter(Alphanumeric).take(Self::NONCE_LEN).map(char::from).collect()
	}

	fn timestamp(&self) -> u64 {
		OffsetDateTime::now_utc().unix_timestamp().max(0) as u64
	}
}

/// Constant nonce and timestamp for reproducible signatures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedEntropy {
	nonce: String,
	timestamp: u64,
}
impl FixedEntropy {
	/// Always yields `nonce` and `timestamp`.
	pub fn new(nonce: impl Into<String>, timestamp: u64) -> Self {
		Self { nonce: nonce.into(), timestamp }
	}
}
impl SigningEntropy for FixedEntropy {
	fn nonce(&self) -> String {
		self.nonce.clone()
	}

	fn timestamp(&self) -> u64 {
		self.timestamp
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn random_nonces_are_alphanumeric_and_distinct() {
		let first = RandomEntropy.nonce();
		let second = RandomEntropy.nonce();

		assert_eq!(first.len(), RandomEntropy::NONCE_LEN);
		assert!(first.chars().all(|ch| ch.is_ascii_alphanumeric()));
		assert_ne!(first, second);
		assert!(RandomEntropy.timestamp() > 1_600_000_000);
	}
}
