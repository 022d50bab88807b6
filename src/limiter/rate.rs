//! Formatted rate specifications such as `"5-S"` or `"1000-hour"`.

// self
use crate::{_prelude::*, error::ConfigError};

/// Length of a rate window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RatePeriod {
	/// One second.
	Second,
	/// One minute.
	Minute,
	/// One hour.
	Hour,
	/// One day.
	Day,
}
impl RatePeriod {
	/// Window length.
	pub const fn duration(self) -> Duration {
		match self {
			RatePeriod::Second => Duration::SECOND,
			RatePeriod::Minute => Duration::MINUTE,
			RatePeriod::Hour => Duration::HOUR,
			RatePeriod::Day => Duration::DAY,
		}
	}

	fn parse(unit: &str) -> Option<Self> {
		match unit.to_ascii_lowercase().as_str() {
			"s" | "second" => Some(Self::Second),
			"m" | "minute" => Some(Self::Minute),
			"h" | "hour" => Some(Self::Hour),
			"d" | "day" => Some(Self::Day),
			_ => None,
		}
	}
}

/// Maximum number of requests admitted per [`RatePeriod`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateSpec {
	/// Requests admitted per window.
	pub limit: u64,
	/// Window length.
	pub period: RatePeriod,
}
impl RateSpec {
	/// Creates a spec from its parts.
	pub const fn new(limit: u64, period: RatePeriod) -> Self {
		Self { limit, period }
	}

	/// Returns the end of the window containing `now`.
	///
	/// Windows are aligned to the period boundary in UTC, not to the first request.
	pub fn reset_at(&self, now: OffsetDateTime) -> OffsetDateTime {
		let period = self.period.duration().whole_seconds();
		let now_ts = now.unix_timestamp();
		let reset = now_ts.div_euclid(period) * period + period;

		now + Duration::seconds(reset - now_ts) - Duration::nanoseconds(now.nanosecond().into())
	}
}
impl FromStr for RateSpec {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let invalid = |reason| ConfigError::InvalidRateSpec { spec: s.to_owned(), reason };
		let (limit, unit) = s.trim().split_once('-').ok_or_else(|| invalid("expected `<N>-<unit>`"))?;
		let limit = limit
			.parse::<u64>()
			.ok()
			.filter(|limit| *limit > 0)
			.ok_or_else(|| invalid("limit must be a positive integer"))?;
		let period = RatePeriod::parse(unit)
			.ok_or_else(|| invalid("unit must be one of S, M, H, D, second, minute, hour, day"))?;

		Ok(Self { limit, period })
	}
}
impl Display for RateSpec {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let unit = match self.period {
			RatePeriod::Second => "S",
			RatePeriod::Minute => "M",
			RatePeriod::Hour => "H",
			RatePeriod::Day => "D",
		};

		write!(f, "{}-{unit}", self.limit)
	}
}
