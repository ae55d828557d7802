//! Single-flight coordination for session refresh.
//!
//! At most one `POST /auth/refresh` is outstanding per client at any time. The first
//! caller to hit an eligible 401 becomes the *leader*: it acquires the gate, performs
//! the refresh, records the outcome, and releases. Every caller whose 401 arrives while
//! the gate is held becomes a *follower*: it parks in the gate's FIFO waiter queue and,
//! once the leader settles, reads the recorded outcome and replays (or surfaces its
//! original 401) without issuing a refresh of its own.
//!
//! The leader's guard doubles as the refresh-in-flight flag; dropping it on any exit
//! path (including cancellation) releases the gate, so a leader that never settles
//! simply promotes the next waiter to leader for a fresh attempt.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::_prelude::*;

/// Terminal state of one refresh cycle, shared with every parked follower.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RefreshOutcome {
	/// The refresh endpoint answered 2xx; the session is renewed and replays may proceed.
	Renewed,
	/// The refresh endpoint failed; original 401 responses surface unchanged.
	Failed,
}

/// Role assigned to a caller joining the gate.
pub(crate) enum RefreshTicket<'a> {
	/// This caller must perform the refresh and settle the permit.
	Leader(RefreshPermit<'a>),
	/// A concurrent refresh settled while this caller waited; use its outcome.
	Follower(RefreshOutcome),
}

/// Exclusive permission to run the refresh call.
///
/// Dropping the permit without calling [`settle`](RefreshPermit::settle) releases the
/// gate without recording an outcome, which re-elects a leader among the waiters.
pub(crate) struct RefreshPermit<'a> {
	guard: async_lock::MutexGuard<'a, ()>,
	state: &'a Mutex<GateState>,
}
impl RefreshPermit<'_> {
	/// Records the refresh outcome and releases the gate, waking parked followers.
	pub(crate) fn settle(self, outcome: RefreshOutcome) {
		{
			let mut state = self.state.lock();

			state.epoch += 1;
			state.last = Some(outcome);
		}

		drop(self.guard);
	}
}

#[derive(Debug, Default)]
struct GateState {
	epoch: u64,
	last: Option<RefreshOutcome>,
}

/// Per-client single-flight gate.
///
/// Clones share the same underlying state, so every clone of a [`SessionClient`]
/// coordinates through one gate.
///
/// [`SessionClient`]: crate::session::SessionClient
#[derive(Clone, Debug, Default)]
pub(crate) struct RefreshGate {
	lock: Arc<AsyncMutex<()>>,
	state: Arc<Mutex<GateState>>,
}
impl RefreshGate {
	/// Joins the gate, classifying the caller as leader or follower.
	///
	/// Followers suspend here until the in-flight refresh settles. A follower woken
	/// behind an unsettled (abandoned) leader is promoted to leader itself.
	pub(crate) async fn join(&self) -> RefreshTicket<'_> {
		if let Some(guard) = self.lock.try_lock() {
			return RefreshTicket::Leader(RefreshPermit { guard, state: &self.state });
		}

		let seen = self.state.lock().epoch;
		let guard = self.lock.lock().await;
		let settled = {
			let state = self.state.lock();

			if state.epoch == seen { None } else { state.last }
		};

		match settled {
			Some(outcome) => {
				drop(guard);

				RefreshTicket::Follower(outcome)
			},
			None => RefreshTicket::Leader(RefreshPermit { guard, state: &self.state }),
		}
	}
}

/// Thread-safe counters for refresh cycles.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the total number of refresh calls issued.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh calls that renewed the session.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh calls that failed.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}
}
