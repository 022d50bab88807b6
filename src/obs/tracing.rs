//! Operation spans behind the `tracing` feature.

// self
use crate::{
	_prelude::*,
	obs::{Operation, Outcome},
};

/// Span wrapping one core operation.
///
/// The span is opened with empty `outcome` and `fail_closed` fields; [`OpSpan::close`] fills
/// them once the operation settles so a single span line tells whether the request was
/// rejected on its merits or because infrastructure failed.
#[derive(Clone, Debug)]
pub(crate) struct OpSpan {
	op: Operation,
	stage: &'static str,
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	pub(crate) fn new(op: Operation, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		let span = tracing::info_span!(
			"access_core.op",
			op = op.as_str(),
			stage,
			outcome = tracing::field::Empty,
			fail_closed = tracing::field::Empty
		);

		Self {
			op,
			stage,
			#[cfg(feature = "tracing")]
			span,
		}
	}

	pub(crate) fn op(&self) -> Operation {
		self.op
	}

	/// Attaches the span to `fut` so it is entered on every poll.
	pub(crate) fn instrument<Fut>(&self, fut: Fut) -> impl Future<Output = Fut::Output>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}

	/// Runs `f` with the span entered.
	pub(crate) fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
		#[cfg(feature = "tracing")]
		{
			self.span.in_scope(f)
		}
		#[cfg(not(feature = "tracing"))]
		{
			f()
		}
	}

	/// Records the settled outcome on the span; failures also emit an event, at `warn` for
	/// fail-closed errors and `debug` for credential rejections.
	pub(crate) fn close(&self, outcome: Outcome, error: Option<&Error>) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("outcome", outcome.as_str());

			if let Some(error) = error {
				let fail_closed = error.is_fail_closed();

				self.span.record("fail_closed", fail_closed);

				if fail_closed {
					tracing::warn!(
						parent: &self.span,
						op = self.op.as_str(),
						stage = self.stage,
						%error,
						"access-control operation failed"
					);
				} else {
					tracing::debug!(
						parent: &self.span,
						op = self.op.as_str(),
						stage = self.stage,
						%error,
						"access-control request rejected"
					);
				}
			}
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (self.stage, outcome, error);
		}
	}
}

/// Emits an informational event with a count attached.
pub(crate) fn log_count(op: Operation, stage: &'static str, count: usize) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(op = op.as_str(), stage, count, "access-control operation completed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (op, stage, count);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn spans_close_without_a_subscriber() {
		let span = OpSpan::new(Operation::VerifySignature, "verify");

		assert_eq!(span.in_scope(|| 7), 7);

		span.close(Outcome::Failure, Some(&Error::SignatureInvalid));
		span.close(Outcome::Success, None);
	}

	#[tokio::test]
	async fn instrumented_futures_keep_their_output() {
		let span = OpSpan::new(Operation::ParseToken, "test");

		assert_eq!(span.instrument(async { "claims" }).await, "claims");
		assert_eq!(span.op(), Operation::ParseToken);
	}
}
