//! Session token claims and their clock lifecycle.

// self
use crate::{_prelude::*, auth::TokenId};

/// Clock-derived lifecycle status of a set of claims.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token is not yet valid because `not_before` is in the future.
	Pending,
	/// Token is currently valid.
	Active,
	/// Token exceeded its expiry instant.
	Expired,
}

/// Payload embedded in a signed session token.
///
/// All instants are unix seconds. Claims are immutable once signed; a refresh produces a new
/// value with a new [`jti`](Self::jti).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
	/// Subject identifier.
	pub subject_id: u64,
	/// Subject display name.
	pub subject_name: String,
	/// Expiry instant.
	pub expire_time: i64,
	/// First issuance instant; preserved across refreshes.
	pub issued_at: i64,
	/// Instant before which the token is not valid.
	pub not_before: i64,
	/// Issuer string (usually the application name).
	pub issuer: String,
	/// Unique identifier of this issuance.
	pub jti: TokenId,
}
impl TokenClaims {
	/// Computes the lifecycle status at `now`, allowing `leeway` of clock skew.
	pub fn status_at(&self, now: OffsetDateTime, leeway: Duration) -> TokenStatus {
		let now = now.unix_timestamp();
		let leeway = leeway.whole_seconds();

		if now.saturating_add(leeway) < self.not_before {
			return TokenStatus::Pending;
		}
		if now.saturating_sub(leeway) > self.expire_time {
			return TokenStatus::Expired;
		}

		TokenStatus::Active
	}

	/// Returns the lifetime left at `now`; negative once expired.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		Duration::seconds(self.expire_time.saturating_sub(now.unix_timestamp()))
	}

	/// Returns the expiry as an [`OffsetDateTime`], saturating on out-of-range values.
	pub fn expires_at(&self) -> OffsetDateTime {
		OffsetDateTime::from_unix_timestamp(self.expire_time).unwrap_or(OffsetDateTime::UNIX_EPOCH)
	}

	/// Returns how long ago the token family was first issued.
	pub fn age_at(&self, now: OffsetDateTime) -> Duration {
		Duration::seconds(now.unix_timestamp().saturating_sub(self.issued_at))
	}
}
