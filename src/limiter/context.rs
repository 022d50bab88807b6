//! Per-request charge state shared by layered limiter checks.

// self
use crate::_prelude::*;

/// Per-request limiter state shared by every layered check of one request.
///
/// Create one per inbound request and pass it to each check; it guarantees the shared
/// counter is charged once no matter how many layers consult it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
	charged: bool,
	reached: bool,
}
impl RequestContext {
	/// Creates fresh state for a new request.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns `true` once a check has incremented a counter for this request.
	pub fn is_charged(&self) -> bool {
		self.charged
	}

	/// Returns `true` once any check has denied this request.
	pub fn is_rate_limited(&self) -> bool {
		self.reached
	}

	pub(crate) fn mark_charged(&mut self) {
		self.charged = true;
	}

	pub(crate) fn release_charge(&mut self) {
		self.charged = false;
	}

	pub(crate) fn mark_reached(&mut self) {
		self.reached = true;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn charges_can_be_released() {
		let mut ctx = RequestContext::new();

		assert!(!ctx.is_charged());

		ctx.mark_charged();

		assert!(ctx.is_charged());

		ctx.release_charge();

		assert!(!ctx.is_charged());
		assert!(!ctx.is_rate_limited());
	}
}
