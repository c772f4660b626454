//! Execution contexts that run request and flow handlers.

// std
use std::collections::VecDeque;
// self
use crate::_prelude::*;

/// Unit of work handed to a [`Dispatcher`].
pub type Job = Box<dyn FnOnce() + Send>;

/// Execution context on which success and failure handlers run.
pub trait Dispatcher
where
	Self: Send + Sync,
{
	/// Schedules `job`.
	fn dispatch(&self, job: Job);
}

/// Runs every job immediately on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineDispatcher;
impl Dispatcher for InlineDispatcher {
	fn dispatch(&self, job: Job) {
		job();
	}
}

/// Queues jobs until the owning thread drains them, like a UI main loop.
#[derive(Default)]
pub struct QueueDispatcher {
	jobs: Mutex<VecDeque<Job>>,
}
impl QueueDispatcher {
	/// Number of queued jobs.
	pub fn pending(&self) -> usize {
		self.jobs.lock().len()
	}

	/// Runs queued jobs in FIFO order, including jobs queued while draining.
	///
	/// Returns how many jobs ran.
	pub fn run_pending(&self) -> usize {
		let mut ran = 0;

		loop {
			let job = self.jobs.lock().pop_front();
			let Some(job) = job else {
				break;
			};

			job();

			ran += 1;
		}

		ran
	}
}
impl Dispatcher for QueueDispatcher {
	fn dispatch(&self, job: Job) {
		self.jobs.lock().push_back(job);
	}
}
impl Debug for QueueDispatcher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("QueueDispatcher").field("pending", &self.pending()).finish()
	}
}

/// Spawns every job onto a Tokio runtime.
#[cfg(feature = "tokio")]
#[derive(Clone, Debug)]
pub struct TokioDispatcher(tokio::runtime::Handle);
#[cfg(feature = "tokio")]
impl TokioDispatcher {
	/// Dispatches onto the provided runtime.
	pub fn new(handle: tokio::runtime::Handle) -> Self {
		Self(handle)
	}

	/// Dispatches onto the runtime the caller is running in.
	pub fn current() -> Result<Self> {
		tokio::runtime::Handle::try_current()
			.map(Self)
			.map_err(|e| crate::error::ConfigError::http_client_build(e).into())
	}
}
#[cfg(feature = "tokio")]
impl Dispatcher for TokioDispatcher {
	fn dispatch(&self, job: Job) {
		self.0.spawn(async move { job() });
	}
}
