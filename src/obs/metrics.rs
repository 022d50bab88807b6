//! Outcome counters behind the `metrics` feature.

// self
use crate::obs::{Operation, Outcome};

/// Increments `access_core_op_total` for `op` and `outcome` on the global recorder.
pub(crate) fn record_outcome(op: Operation, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"access_core_op_total",
			"op" => op.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (op, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn outcomes_record_without_a_recorder() {
		for outcome in [Outcome::Attempt, Outcome::Success, Outcome::Failure] {
			record_outcome(Operation::CheckRate, outcome);
		}
	}
}
