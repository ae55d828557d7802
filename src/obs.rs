//! Optional observability helpers for session requests.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `kuskul_session.request` with the
//!   `phase` and `stage` fields, plus a debug event for every non-success HTTP outcome.
//! - Enable `metrics` to increment the `kuskul_session_request_total` counter for every
//!   attempt/success/failure, labeled by `phase` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Request pipeline phases observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestPhase {
	/// Initial dispatch of a caller's request.
	Dispatch,
	/// The shared session refresh call.
	Refresh,
	/// Replay of a request after a successful refresh.
	Replay,
}
impl RequestPhase {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestPhase::Dispatch => "dispatch",
			RequestPhase::Refresh => "refresh",
			RequestPhase::Replay => "replay",
		}
	}
}
impl Display for RequestPhase {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// Entry to a pipeline phase.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure surfaced to the caller or recorded for the phase.
	Failure,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Attempt => "attempt",
			RequestOutcome::Success => "success",
			RequestOutcome::Failure => "failure",
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
