//! Verification options and the accumulated verification report.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::{SignatureConfig, minutes},
	error::ConfigError,
};

/// Caller-facing texts used when a verification check fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureMessages {
	/// Reported when the recomputed digest does not match.
	pub invalid: String,
	/// Reported when the timestamp lies outside the freshness window.
	pub expired: String,
}
impl Default for SignatureMessages {
	fn default() -> Self {
		Self {
			invalid: "Request signature is invalid.".into(),
			expired: "Request signature has expired.".into(),
		}
	}
}

/// Knobs for a single verification.
///
/// Defaults: the secret comes from the engine's resolver, the freshness window is
/// [`SignatureConfig::DEFAULT_EXPIRY_WINDOW_MINUTES`] unless the engine was configured
/// otherwise, future-dated timestamps are accepted, and [`SignatureMessages::default`]
/// supplies the texts.
#[derive(Clone, Debug, Default)]
pub struct VerifyOptions {
	/// Secret that bypasses the resolver.
	pub secret: Option<TokenSecret>,
	/// Freshness window overriding the engine's configured one.
	pub expiry_window: Option<Duration>,
	/// How far ahead of `now` a timestamp may lie; unbounded when unset.
	pub max_future_skew: Option<Duration>,
	/// Failure texts.
	pub messages: SignatureMessages,
}
impl VerifyOptions {
	/// Creates options with every default in place.
	pub fn new() -> Self {
		Self::default()
	}

	/// Verifies against an explicit secret instead of resolving one.
	pub fn with_secret(mut self, secret: impl Into<TokenSecret>) -> Self {
		self.secret = Some(secret.into());

		self
	}

	/// Overrides the freshness window.
	pub fn with_expiry_window(mut self, window: Duration) -> Self {
		self.expiry_window = Some(window);

		self
	}

	/// Rejects timestamps more than `skew` ahead of the verifier's clock as expired.
	pub fn with_max_future_skew(mut self, skew: Duration) -> Self {
		self.max_future_skew = Some(skew);

		self
	}

	/// Overrides the failure texts.
	pub fn with_messages(mut self, messages: SignatureMessages) -> Self {
		self.messages = messages;

		self
	}

	pub(crate) fn window_or(&self, config: &SignatureConfig) -> Result<Duration, ConfigError> {
		match self.expiry_window {
			Some(window) => Ok(window),
			None => minutes("expiry_window", config.expiry_window),
		}
	}

	/// Returns `true` when `timestamp` (unix seconds) is stale or, with a skew bound set, too
	/// far ahead of `now`.
	pub(crate) fn is_expired(&self, window: Duration, timestamp: i64, now: OffsetDateTime) -> bool {
		let now = now.unix_timestamp();

		if timestamp < now.saturating_sub(window.whole_seconds()) {
			return true;
		}

		self.max_future_skew
			.is_some_and(|skew| timestamp > now.saturating_add(skew.whole_seconds()))
	}
}

/// Independent checks a signature can fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureFailure {
	/// Digest mismatch.
	Invalid,
	/// Timestamp outside the freshness window.
	Expired,
}

/// Outcome of a verification: every failed check, each with its message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureReport {
	/// Failed checks in evaluation order.
	pub failures: Vec<SignatureFailure>,
	/// Messages aligned with [`failures`](Self::failures).
	pub messages: Vec<String>,
}
impl SignatureReport {
	/// Returns `true` when every check passed.
	pub fn is_ok(&self) -> bool {
		self.failures.is_empty()
	}

	/// Returns `true` when `failure` was recorded.
	pub fn has(&self, failure: SignatureFailure) -> bool {
		self.failures.contains(&failure)
	}

	/// Collapses the report into an error; a digest mismatch outranks staleness.
	pub fn into_result(self) -> Result<()> {
		if self.has(SignatureFailure::Invalid) {
			return Err(Error::SignatureInvalid);
		}
		if self.has(SignatureFailure::Expired) {
			return Err(Error::SignatureExpired);
		}

		Ok(())
	}

	pub(crate) fn push(&mut self, failure: SignatureFailure, messages: &SignatureMessages) {
		let message = match failure {
			SignatureFailure::Invalid => &messages.invalid,
			SignatureFailure::Expired => &messages.expired,
		};

		self.failures.push(failure);
		self.messages.push(message.clone());
	}
}
