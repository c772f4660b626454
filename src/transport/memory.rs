//! Scripted in-memory [`TransportHandler`] for local development and tests.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{
	_prelude::*,
	error::TransportError,
	transport::{
		HttpRequest, TransportCallback, TransportHandler, TransportOperation, TransportResult,
	},
};

type OperationList = Arc<Mutex<Vec<Arc<MemoryOperationState>>>>;

/// Transport that never touches the network.
///
/// Every issued request is recorded. Operations stay pending until the test calls
/// [`fulfill`](MemoryTransport::fulfill) with the outcome the "server" should produce.
#[derive(Default)]
pub struct MemoryTransport {
	pending: OperationList,
	issued: Mutex<Vec<HttpRequest>>,
	invalidated: AtomicBool,
	report_cancellation: bool,
}
impl MemoryTransport {
	/// Makes cancelled operations report [`TransportError::Cancelled`] through their callback,
	/// the way most HTTP engines do.
	pub fn reporting_cancellation() -> Self {
		Self { report_cancellation: true, ..Default::default() }
	}

	/// Every request handed to the transport, in issue order.
	pub fn requests(&self) -> Vec<HttpRequest> {
		self.issued.lock().clone()
	}

	/// Number of operations that were issued and neither fulfilled nor cancelled.
	pub fn pending(&self) -> usize {
		self.pending.lock().len()
	}

	/// Whether [`TransportHandler::finish_operations_and_invalidate`] was called.
	pub fn is_invalidated(&self) -> bool {
		self.invalidated.load(Ordering::SeqCst)
	}

	/// Completes the oldest resumed operation whose URL matches `url`.
	///
	/// `url` matches either the full request URL or the URL without its query string. Returns
	/// `false` when no resumed operation matches.
	pub fn fulfill(&self, url: &str, result: TransportResult) -> bool {
		let operation = {
			let mut pending = self.pending.lock();
			let position = pending.iter().position(|operation| {
				operation.resumed.load(Ordering::SeqCst) && operation.matches(url)
			});

			position.map(|idx| pending.remove(idx))
		};
		let Some(operation) = operation else {
			return false;
		};
		let callback = operation.callback.lock().take();

		match callback {
			Some(callback) => {
				callback(result);

				true
			},
			None => false,
		}
	}
}
impl TransportHandler for MemoryTransport {
	fn data_operation(
		&self,
		request: HttpRequest,
		callback: TransportCallback,
	) -> Box<dyn TransportOperation> {
		self.issued.lock().push(request.clone());

		let state = Arc::new(MemoryOperationState {
			request,
			callback: Mutex::new(Some(callback)),
			resumed: AtomicBool::new(false),
			rejected: self.is_invalidated(),
		});

		if !state.rejected {
			self.pending.lock().push(state.clone());
		}

		Box::new(MemoryOperation {
			state,
			pending: self.pending.clone(),
			report_cancellation: self.report_cancellation,
		})
	}

	fn finish_operations_and_invalidate(&self) {
		self.invalidated.store(true, Ordering::SeqCst);
	}
}
impl Debug for MemoryTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MemoryTransport")
			.field("pending", &self.pending())
			.field("issued", &self.issued.lock().len())
			.field("invalidated", &self.is_invalidated())
			.finish()
	}
}

struct MemoryOperationState {
	request: HttpRequest,
	callback: Mutex<Option<TransportCallback>>,
	resumed: AtomicBool,
	rejected: bool,
}
impl MemoryOperationState {
	fn matches(&self, url: &str) -> bool {
		if self.request.url.as_str() == url {
			return true;
		}

		let mut bare = self.request.url.clone();

		bare.set_query(None);
		bare.set_fragment(None);

		bare.as_str() == url
	}
}

struct MemoryOperation {
	state: Arc<MemoryOperationState>,
	pending: OperationList,
	report_cancellation: bool,
}
impl TransportOperation for MemoryOperation {
	fn resume(&self) {
		if self.state.resumed.swap(true, Ordering::SeqCst) {
			return;
		}
		if self.state.rejected {
			let callback = self.state.callback.lock().take();

			if let Some(callback) = callback {
				callback(Err(TransportError::Invalidated));
			}
		}
	}

	fn cancel(&self) {
		self.pending.lock().retain(|operation| !Arc::ptr_eq(operation, &self.state));

		let callback = self.state.callback.lock().take();

		if !self.report_cancellation {
			return;
		}
		if let Some(callback) = callback {
			callback(Err(TransportError::Cancelled));
		}
	}
}
