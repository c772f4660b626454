//! Balanced network-activity counting for busy indicators.
//!
//! Every [`SignedRequest`](crate::request::SignedRequest) calls
//! [`NetworkActivityNotifier::network_activity_started`] once when it goes in flight and
//! [`NetworkActivityNotifier::network_activity_ended`] once when it terminates, so the count
//! observed by any reader equals the number of requests currently in flight.

// self
use crate::_prelude::*;

/// Callback receiving `true` while at least one activity is in flight.
pub type ActivityUpdateHandler = Box<dyn Fn(bool) + Send + Sync>;

/// Contract violations reported by a [`NetworkActivityNotifier`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
pub enum ActivityError {
	/// `network_activity_ended` was called without a matching start.
	#[error("Network activity ended without a matching start.")]
	UnbalancedCall,
}

/// Balanced start/end counter shared by every request a client issues.
///
/// Implementations must tolerate concurrent calls from several in-flight requests without
/// losing updates.
pub trait NetworkActivityNotifier
where
	Self: Send + Sync,
{
	/// Number of activities currently in flight.
	fn active_network_activities(&self) -> usize;

	/// Records the start of one activity.
	fn network_activity_started(&self);

	/// Records the end of one activity.
	///
	/// Fails with [`ActivityError::UnbalancedCall`] and leaves the count untouched when no
	/// activity is in flight.
	fn network_activity_ended(&self) -> Result<(), ActivityError>;
}

/// Counter that forwards every visibility change to an update handler.
///
/// The default handler does nothing, which turns the notifier into a pure counter. The
/// handler runs while the counter lock is held so indicator updates stay ordered; it must not
/// call back into the notifier.
pub struct DefaultNetworkActivityNotifier {
	count: Mutex<usize>,
	update_handler: ActivityUpdateHandler,
}
impl DefaultNetworkActivityNotifier {
	/// Creates a notifier that reports `count > 0` to `handler` after every change.
	pub fn with_update_handler(handler: impl Fn(bool) + Send + Sync + 'static) -> Self {
		Self { count: Mutex::new(0), update_handler: Box::new(handler) }
	}
}
impl Default for DefaultNetworkActivityNotifier {
	fn default() -> Self {
		Self::with_update_handler(|_| {})
	}
}
impl NetworkActivityNotifier for DefaultNetworkActivityNotifier {
	fn active_network_activities(&self) -> usize {
		*self.count.lock()
	}

	fn network_activity_started(&self) {
		let mut count = self.count.lock();

		*count += 1;

		(self.update_handler)(*count > 0);
	}

	fn network_activity_ended(&self) -> Result<(), ActivityError> {
		let mut count = self.count.lock();

		if *count == 0 {
			return Err(ActivityError::UnbalancedCall);
		}

		*count -= 1;

		(self.update_handler)(*count > 0);

		Ok(())
	}
}
impl Debug for DefaultNetworkActivityNotifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DefaultNetworkActivityNotifier")
			.field("active_network_activities", &self.active_network_activities())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::thread;
	// self
	use super::*;

	#[test]
	fn counting_is_balanced_and_rejects_extra_ends() {
		let notifier = DefaultNetworkActivityNotifier::default();

		assert_eq!(notifier.active_network_activities(), 0);

		notifier.network_activity_started();

		assert_eq!(notifier.active_network_activities(), 1);

		notifier.network_activity_started();
		notifier.network_activity_started();

		assert_eq!(notifier.active_network_activities(), 3);

		notifier.network_activity_ended().expect("First end should balance a start.");

		assert_eq!(notifier.active_network_activities(), 2);

		notifier.network_activity_ended().expect("Second end should balance a start.");
		notifier.network_activity_ended().expect("Third end should balance a start.");

		assert_eq!(notifier.active_network_activities(), 0);
		assert_eq!(notifier.network_activity_ended(), Err(ActivityError::UnbalancedCall));
		assert_eq!(notifier.active_network_activities(), 0);
	}

	#[test]
	fn update_handler_sees_every_change() {
		let calls = Arc::new(Mutex::new(Vec::new()));
		let sink = calls.clone();
		let notifier =
			DefaultNetworkActivityNotifier::with_update_handler(move |visible| sink.lock().push(visible));

		notifier.network_activity_started();
		notifier.network_activity_ended().expect("End should balance the first start.");
		notifier.network_activity_started();
		notifier.network_activity_started();
		notifier.network_activity_ended().expect("End should balance the second start.");
		notifier.network_activity_ended().expect("End should balance the third start.");

		assert_eq!(*calls.lock(), vec![true, false, true, true, true, false]);
	}

	#[test]
	fn unbalanced_end_does_not_notify() {
		let calls = Arc::new(Mutex::new(Vec::new()));
		let sink = calls.clone();
		let notifier =
			DefaultNetworkActivityNotifier::with_update_handler(move |visible| sink.lock().push(visible));

		assert!(notifier.network_activity_ended().is_err());
		assert!(calls.lock().is_empty());
	}

	#[test]
	fn concurrent_updates_are_not_lost() {
		let notifier = Arc::new(DefaultNetworkActivityNotifier::default());
		let workers = (0..8)
			.map(|_| {
				let notifier = notifier.clone();

				thread::spawn(move || {
					for _ in 0..500 {
						notifier.network_activity_started();
					}
					for _ in 0..250 {
						notifier.network_activity_ended().expect("Worker ends should be balanced.");
					}
				})
			})
			.collect::<Vec<_>>();

		for worker in workers {
			worker.join().expect("Worker thread should not panic.");
		}

		assert_eq!(notifier.active_network_activities(), 8 * 250);
	}
}
