// self
use crate::obs::{RequestOutcome, RequestPhase};

/// Records a request phase outcome via the global metrics recorder (when enabled).
pub fn record_request_outcome(phase: RequestPhase, outcome: RequestOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"kuskul_session_request_total",
			"phase" => phase.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (phase, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_request_outcome_noop_without_metrics() {
		record_request_outcome(RequestPhase::Refresh, RequestOutcome::Failure);
	}
}
