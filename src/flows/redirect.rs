//! Single-slot subscription that resumes a handshake when the host reports a redirect.

// self
use crate::{
	_prelude::*,
	obs,
	signer::{Parameters, encode},
};

/// What a registered redirect handler receives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RedirectEvent {
	/// The host application reported this callback URL.
	Redirect(Url),
	/// The registration was replaced or cancelled before a redirect arrived.
	Cancelled,
}

/// Boxed redirect handler.
pub type RedirectHandler = Box<dyn FnOnce(RedirectEvent) + Send>;

/// Holds at most one pending redirect handler.
///
/// Delivery is at-most-once: [`handle_redirect`](RedirectObserver::handle_redirect) hands the
/// URL to the registered handler and clears the slot. A redirect that arrives while the slot
/// is empty is dropped.
#[derive(Default)]
pub struct RedirectObserver {
	pending: Mutex<Option<RedirectHandler>>,
}
impl RedirectObserver {
	/// Registers `handler`, notifying any handler it replaces with [`RedirectEvent::Cancelled`].
	pub fn observe(&self, handler: impl 'static + Send + FnOnce(RedirectEvent)) {
		if let Some(previous) = self.register(Box::new(handler)) {
			previous(RedirectEvent::Cancelled);
		}
	}

	/// Delivers `url` to the pending handler.
	///
	/// Returns `false` (and drops the event) when nothing is registered.
	pub fn handle_redirect(&self, url: Url) -> bool {
		let handler = self.pending.lock().take();

		match handler {
			Some(handler) => {
				handler(RedirectEvent::Redirect(url));

				true
			},
			None => {
				obs::log_dropped_redirect(&url);

				false
			},
		}
	}

	/// Clears the registration, notifying the handler with [`RedirectEvent::Cancelled`].
	///
	/// Returns `false` when nothing was registered.
	pub fn cancel(&self) -> bool {
		let handler = self.pending.lock().take();

		match handler {
			Some(handler) => {
				handler(RedirectEvent::Cancelled);

				true
			},
			None => false,
		}
	}

	/// Whether a handler is waiting.
	pub fn is_pending(&self) -> bool {
		self.pending.lock().is_some()
	}

	/// Swaps in `handler` and returns the previous one without notifying it.
	pub(crate) fn register(&self, handler: RedirectHandler) -> Option<RedirectHandler> {
		self.pending.lock().replace(handler)
	}

	/// Clears the slot without notifying the handler.
	pub(crate) fn clear(&self) -> Option<RedirectHandler> {
		self.pending.lock().take()
	}
}
impl Debug for RedirectObserver {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RedirectObserver").field("pending", &self.is_pending()).finish()
	}
}

/// Collects the parameters a provider put on the callback URL.
///
/// Fragment and query parameters are merged with the query winning on duplicate keys. A
/// `token` parameter is copied over `oauth_token`.
pub fn parse_redirect_parameters(url: &Url) -> Parameters {
	let mut parameters = url
		.fragment()
		.filter(|fragment| !fragment.is_empty())
		.map(encode::parse_query_string)
		.unwrap_or_default();

	if let Some(query) = url.query() {
		parameters.extend(encode::parse_query_string(query));
	}
	if let Some(token) = parameters.get("token").cloned() {
		parameters.insert("oauth_token".to_owned(), token);
	}

	parameters
}
