//! Core-wide error types shared across the token, signature, and rate-limit services.

// self
use crate::_prelude::*;

/// Core-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical access-control error exposed by public APIs.
///
/// The core never renders a response itself; edge layers map these variants onto their
/// transport (401, 403, 429, 500, ...).
#[derive(Debug, ThisError)]
pub enum Error {
	/// Shared key/TTL store failed; treated as fail-closed.
	#[error("{0}")]
	StoreUnavailable(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem (signing key, secret resolution, limit spec).
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token driver hook failed.
	#[error(transparent)]
	Driver(#[from] crate::driver::DriverError),

	/// Request carried no token in the query string or headers.
	#[error("Request is missing a token.")]
	TokenMissing,
	/// Token could not be decoded structurally.
	#[error("Token is malformed.")]
	TokenMalformed,
	/// Token signature is valid but its expiry has passed.
	#[error("Token has expired.")]
	TokenExpired,
	/// Token was issued longer ago than the maximum refresh window.
	#[error("Token has passed its maximum refresh time.")]
	TokenExpiredMaxRefresh,
	/// Token signature is bad, the token was revoked, or its claims have the wrong shape.
	#[error("Token is invalid.")]
	TokenInvalid,
	/// Request signature does not match the recomputed digest.
	#[error("Request signature is invalid.")]
	SignatureInvalid,
	/// Request timestamp lies outside the freshness window.
	#[error("Request signature has expired.")]
	SignatureExpired,
	/// Caller exceeded the configured rate.
	#[error("Rate limit of {limit} requests exceeded; resets at {reset_at}.")]
	RateLimitExceeded {
		/// Maximum requests permitted in the window.
		limit: u64,
		/// Unix time of the next window reset.
		reset_at: i64,
	},
	/// Request input is unusable regardless of credentials.
	#[error("Request is invalid: {reason}.")]
	InvalidRequest {
		/// Human-readable reason.
		reason: String,
	},
}
impl Error {
	/// Returns `true` for infrastructure and configuration failures that must deny access
	/// rather than let the request through.
	pub fn is_fail_closed(&self) -> bool {
		matches!(self, Self::StoreUnavailable(_) | Self::Config(_) | Self::Driver(_))
	}
}

/// Configuration and validation failures raised by the core.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Token signing key is empty.
	#[error("Token signing key cannot be empty.")]
	EmptySigningKey,
	/// Configured token lifetime is not positive.
	#[error("Token lifetime must be positive.")]
	NonPositiveLifetime,
	/// A minute-based setting does not fit a representable duration or instant.
	#[error("Setting `{field}` of {value} minutes is out of range.")]
	DurationOutOfRange {
		/// Offending setting.
		field: &'static str,
		/// Configured value in minutes.
		value: i64,
	},
	/// Token could not be signed.
	#[error("Token could not be signed.")]
	TokenSigning(#[source] jsonwebtoken::errors::Error),
	/// No secret could be resolved for the calling application.
	#[error("Secret for app key `{app_key}` could not be resolved.")]
	SecretUnresolvable {
		/// Application key the resolver was asked about.
		app_key: String,
		/// Underlying resolver failure, when one was reported.
		#[source]
		source: Option<BoxError>,
	},
	/// Rate limit specification could not be parsed.
	#[error("Rate limit spec `{spec}` is invalid: {reason}.")]
	InvalidRateSpec {
		/// Raw specification string.
		spec: String,
		/// Why parsing failed.
		reason: &'static str,
	},
	/// Configuration document could not be deserialized.
	#[error("Configuration could not be loaded.")]
	Load(#[from] serde_path_to_error::Error<serde_json::Error>),
}
impl ConfigError {
	/// Builds a [`ConfigError::SecretUnresolvable`] wrapping the resolver's failure.
	pub fn secret_unresolvable(
		app_key: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::SecretUnresolvable { app_key: app_key.into(), source: Some(Box::new(src)) }
	}
}
