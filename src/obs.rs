//! Optional observability helpers for access-control operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (default) to emit structured spans named `access_core.op` with the `op`
//!   (operation) and `stage` (call site) fields. Each span records its settled `outcome` and,
//!   for failures, whether the error was `fail_closed`.
//! - Enable `metrics` to increment the `access_core_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub(crate) use self::tracing::log_count;

// self
use self::{metrics::record_outcome, tracing::OpSpan};
use crate::_prelude::*;

/// Operations observed by the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Token issuance.
	MakeToken,
	/// Token parsing and verification.
	ParseToken,
	/// Token refresh.
	RefreshToken,
	/// Token revocation.
	Invalidate,
	/// Revocation cache warm-up.
	WarmRevocations,
	/// Outbound request signing.
	MakeSign,
	/// Inbound request signature verification.
	VerifySignature,
	/// Rate-limit admission check.
	CheckRate,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::MakeToken => "make_token",
			Operation::ParseToken => "parse_token",
			Operation::RefreshToken => "refresh_token",
			Operation::Invalidate => "invalidate",
			Operation::WarmRevocations => "warm_revocations",
			Operation::MakeSign => "make_sign",
			Operation::VerifySignature => "verify_signature",
			Operation::CheckRate => "check_rate",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to a core operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside an operation span and records attempt plus success/failure.
pub(crate) async fn observe<T, Fut>(op: Operation, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = OpSpan::new(op, stage);

	record_outcome(op, Outcome::Attempt);

	let result = span.instrument(fut).await;

	settle(&span, &result);

	result
}

/// Synchronous counterpart of [`observe`] for operations without I/O seams.
pub(crate) fn observe_now<T, F>(op: Operation, stage: &'static str, f: F) -> Result<T>
where
	F: FnOnce() -> Result<T>,
{
	let span = OpSpan::new(op, stage);

	record_outcome(op, Outcome::Attempt);

	let result = span.in_scope(f);

	settle(&span, &result);

	result
}

fn settle<T>(span: &OpSpan, result: &Result<T>) {
	let outcome = if result.is_ok() { Outcome::Success } else { Outcome::Failure };

	record_outcome(span.op(), outcome);
	span.close(outcome, result.as_ref().err());
}
