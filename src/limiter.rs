//! Fixed-window admission control that charges each request exactly once.
//!
//! Counters live in a shared [`CounterStore`] under `"<prefix>:<key>"`. The first check
//! performed for a request increments its counter; later checks against the same
//! [`RequestContext`] only peek, so layering the same limit on nested route groups never
//! double-counts.

pub mod context;
pub mod rate;

pub use context::RequestContext;
pub use rate::{RatePeriod, RateSpec};

// self
use crate::{
	_prelude::*,
	config::LimiterConfig,
	obs::{self, Operation},
	store::CounterStore,
};

/// Header carrying the window's request budget.
pub const HEADER_LIMIT: &str = "X-RateLimit-Limit";
/// Header carrying the requests left in the window.
pub const HEADER_REMAINING: &str = "X-RateLimit-Remaining";
/// Header carrying the unix time the window resets.
pub const HEADER_RESET: &str = "X-RateLimit-Reset";

/// Result of a single rate check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateDecision {
	/// Requests admitted per window.
	pub limit: u64,
	/// Requests left in the current window.
	pub remaining: u64,
	/// Unix time the current window ends.
	pub reset_at: i64,
	/// `true` when the request exceeded the limit.
	pub reached: bool,
}
impl RateDecision {
	fn from_count(spec: &RateSpec, count: u64, reset_at: OffsetDateTime) -> Self {
		Self {
			limit: spec.limit,
			remaining: spec.limit.saturating_sub(count),
			reset_at: reset_at.unix_timestamp(),
			reached: count > spec.limit,
		}
	}

	/// Response headers to emit for both admitted and denied requests.
	pub fn headers(&self) -> [(&'static str, String); 3] {
		[
			(HEADER_LIMIT, self.limit.to_string()),
			(HEADER_REMAINING, self.remaining.to_string()),
			(HEADER_RESET, self.reset_at.to_string()),
		]
	}

	/// Maps a denied decision onto [`Error::RateLimitExceeded`].
	pub fn ensure_admitted(&self) -> Result<()> {
		if self.reached {
			return Err(Error::RateLimitExceeded { limit: self.limit, reset_at: self.reset_at });
		}

		Ok(())
	}
}

/// Admission checks against a shared counter store.
#[derive(Clone)]
pub struct RateLimiter {
	counters: Arc<dyn CounterStore>,
	config: LimiterConfig,
}
impl RateLimiter {
	/// Creates a limiter over the given counter store.
	pub fn new(counters: Arc<dyn CounterStore>, config: LimiterConfig) -> Self {
		Self { counters, config }
	}

	/// Builds a limiter key from a client identity and, optionally, the matched route.
	///
	/// Route separators are normalized (`/` to `-`, `:` to `_`) and the route is prefixed to
	/// the identity.
	pub fn derive_key(identity: &str, route: Option<&str>) -> String {
		match route {
			Some(route) => format!("{}{identity}", route.replace('/', "-").replace(':', "_")),
			None => identity.to_owned(),
		}
	}

	/// Checks `key` against `spec` at the current time.
	pub async fn check_rate(
		&self,
		ctx: &mut RequestContext,
		key: &str,
		spec: &RateSpec,
	) -> Result<RateDecision> {
		self.check_rate_at(ctx, key, spec, OffsetDateTime::now_utc()).await
	}

	/// Checks `key` against `spec` at `now`.
	///
	/// Increments the counter when `ctx` has not been charged yet, otherwise peeks. Store
	/// failures propagate; the caller must deny the request.
	pub async fn check_rate_at(
		&self,
		ctx: &mut RequestContext,
		key: &str,
		spec: &RateSpec,
		now: OffsetDateTime,
	) -> Result<RateDecision> {
		let counter_key = self.counter_key(key);
		let reset_at = spec.reset_at(now);
		let charge = !ctx.is_charged();
		let decision = obs::observe(Operation::CheckRate, "check", async {
			let count = if charge {
				self.counters.increment(&counter_key, now, reset_at).await?
			} else {
				self.counters.peek(&counter_key, now).await?
			};

			Ok(RateDecision::from_count(spec, count, reset_at))
		})
		.await?;

		if charge {
			ctx.mark_charged();
		}
		if decision.reached {
			ctx.mark_reached();
		}

		Ok(decision)
	}

	/// Global per-IP limit; shares the request's charge with other IP layers.
	pub async fn limit_ip(
		&self,
		ctx: &mut RequestContext,
		ip: &str,
		spec: &RateSpec,
	) -> Result<RateDecision> {
		self.check_rate(ctx, &Self::derive_key(ip, None), spec).await
	}

	/// Per-route limit keyed by route plus IP; always charges its own counter.
	pub async fn limit_route(
		&self,
		ctx: &mut RequestContext,
		ip: &str,
		route: &str,
		spec: &RateSpec,
	) -> Result<RateDecision> {
		ctx.release_charge();

		self.check_rate(ctx, &Self::derive_key(ip, Some(route)), spec).await
	}

	/// Limit keyed by an application-chosen key; always charges its own counter.
	pub async fn limit_key(
		&self,
		ctx: &mut RequestContext,
		key: &str,
		spec: &RateSpec,
	) -> Result<RateDecision> {
		ctx.release_charge();

		self.check_rate(ctx, key, spec).await
	}

	fn counter_key(&self, key: &str) -> String {
		format!("{}:{key}", self.config.prefix)
	}
}
impl Debug for RateLimiter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateLimiter").field("config", &self.config).finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::store::{MemoryCounterStore, StoreError, StoreFuture};

	/// Fails the first increment, then delegates to an in-memory store.
	#[derive(Debug, Default)]
	struct FlakyCounters {
		failed: Mutex<bool>,
		inner: MemoryCounterStore,
	}
	impl CounterStore for FlakyCounters {
		fn increment<'a>(
			&'a self,
			key: &'a str,
			now: OffsetDateTime,
			reset_at: OffsetDateTime,
		) -> StoreFuture<'a, u64> {
			if !std::mem::replace(&mut *self.failed.lock(), true) {
				return Box::pin(async { Err(StoreError::Backend { message: "timeout".into() }) });
			}

			self.inner.increment(key, now, reset_at)
		}

		fn peek<'a>(&'a self, key: &'a str, now: OffsetDateTime) -> StoreFuture<'a, u64> {
			self.inner.peek(key, now)
		}
	}

	fn limiter() -> (RateLimiter, MemoryCounterStore) {
		let store = MemoryCounterStore::default();

		(RateLimiter::new(Arc::new(store.clone()), LimiterConfig::default()), store)
	}

	#[test]
	fn route_keys_are_normalized() {
		assert_eq!(RateLimiter::derive_key("10.0.0.1", None), "10.0.0.1");
		assert_eq!(
			RateLimiter::derive_key("10.0.0.1", Some("/api/v1/users/:id")),
			"-api-v1-users-_id10.0.0.1"
		);
	}

	#[test]
	fn decisions_render_headers_and_errors() {
		let decision = RateDecision { limit: 3, remaining: 0, reset_at: 1_735_689_660, reached: true };

		assert_eq!(decision.headers(), [
			(HEADER_LIMIT, "3".to_owned()),
			(HEADER_REMAINING, "0".to_owned()),
			(HEADER_RESET, "1735689660".to_owned()),
		]);
		assert!(matches!(
			decision.ensure_admitted(),
			Err(Error::RateLimitExceeded { limit: 3, reset_at: 1_735_689_660 })
		));
	}

	#[tokio::test]
	async fn budget_is_consumed_then_restored_by_rollover() {
		let (limiter, _) = limiter();
		let spec = "3-M".parse::<RateSpec>().expect("Spec fixture should parse.");
		let now = macros::datetime!(2025-01-01 00:00:10 UTC);
		let mut remaining = Vec::new();

		for _ in 0..3 {
			let mut ctx = RequestContext::new();
			let decision = limiter
				.check_rate_at(&mut ctx, "10.0.0.1", &spec, now)
				.await
				.expect("Check should succeed.");

			assert!(!decision.reached);
			assert_eq!(decision.reset_at, macros::datetime!(2025-01-01 00:01 UTC).unix_timestamp());

			remaining.push(decision.remaining);
		}

		assert_eq!(remaining, [2, 1, 0]);

		let mut ctx = RequestContext::new();
		let denied = limiter
			.check_rate_at(&mut ctx, "10.0.0.1", &spec, now)
			.await
			.expect("Check should succeed.");

		assert!(denied.reached);
		assert!(ctx.is_rate_limited());

		let mut ctx = RequestContext::new();
		let next_window = limiter
			.check_rate_at(&mut ctx, "10.0.0.1", &spec, macros::datetime!(2025-01-01 00:01 UTC))
			.await
			.expect("Check should succeed.");

		assert_eq!(next_window.remaining, 2);
		assert!(!next_window.reached);
	}

	#[tokio::test]
	async fn layered_checks_charge_once() {
		let (limiter, store) = limiter();
		let spec = RateSpec::new(5, RatePeriod::Hour);
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let mut ctx = RequestContext::new();
		let outer = limiter.check_rate_at(&mut ctx, "ip", &spec, now).await.expect("Check should succeed.");
		let inner = limiter.check_rate_at(&mut ctx, "ip", &spec, now).await.expect("Check should succeed.");

		assert_eq!(outer.remaining, 4);
		assert_eq!(inner.remaining, 4);
		assert_eq!(store.len(), 1);
	}

	#[tokio::test]
	async fn failed_increments_leave_the_request_uncharged() {
		let limiter = RateLimiter::new(Arc::new(FlakyCounters::default()), LimiterConfig::default());
		let spec = RateSpec::new(5, RatePeriod::Minute);
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let mut ctx = RequestContext::new();

		assert!(limiter.check_rate_at(&mut ctx, "ip", &spec, now).await.is_err());
		assert!(!ctx.is_charged());

		let retried =
			limiter.check_rate_at(&mut ctx, "ip", &spec, now).await.expect("Retry should succeed.");

		assert_eq!(retried.remaining, 4);
		assert!(ctx.is_charged());
	}
}
