//! OAuth 1.0a client engine: drive the three-legged handshake, sign arbitrary requests, and
//! keep network-activity indicators balanced across cancellable, concurrent transports.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod activity;
pub mod auth;
pub mod client;
pub mod error;
pub mod flows;
pub mod obs;
pub mod request;
pub mod response;
pub mod signer;
pub mod transport;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::mpsc::{self, Receiver};
	// self
	use crate::{
		activity::DefaultNetworkActivityNotifier,
		auth::Credential,
		client::OAuthClient,
		signer::FixedEntropy,
		transport::MemoryTransport,
	};

	/// Nonce injected by [`build_memory_client`].
	pub const TEST_NONCE: &str = "kllo9940pd9333jh";
	/// Timestamp injected by [`build_memory_client`].
	pub const TEST_TIMESTAMP: u64 = 1_191_242_096;

	/// Client wired to an in-memory transport plus the handles tests need to drive it.
	pub struct MemoryHarness {
		/// Client under test.
		pub client: OAuthClient,
		/// Scripted transport backing the client.
		pub transport: Arc<MemoryTransport>,
		/// Activity notifier shared by every request the client issues.
		pub notifier: Arc<DefaultNetworkActivityNotifier>,
	}

	/// Builds an OAuth 1 client backed by [`MemoryTransport`] with fixed signing entropy and
	/// inline handler dispatch.
	pub fn build_memory_client(credential: Credential) -> MemoryHarness {
		let transport = Arc::new(MemoryTransport::default());
		let notifier = Arc::new(DefaultNetworkActivityNotifier::default());
		let client = OAuthClient::new(credential, transport.clone())
			.with_notifier(notifier.clone())
			.with_entropy(FixedEntropy::new(TEST_NONCE, TEST_TIMESTAMP));

		MemoryHarness { client, transport, notifier }
	}

	/// Returns a `Send` callback that forwards its argument into the paired receiver.
	pub fn capture<T>() -> (impl FnOnce(T) + Send + 'static, Receiver<T>)
	where
		T: 'static + Send,
	{
		let (tx, rx) = mpsc::channel();

		(
			move |value| {
				let _ = tx.send(value);
			},
			rx,
		)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use http;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
#[cfg(all(test, not(feature = "tokio")))] use tokio as _;
