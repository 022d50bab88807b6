//! Deserializable configuration for the token, signature, and rate-limit services.
//!
//! [`AccessConfig`] mirrors the usual application config layout (`app`, `jwt`, `sign`,
//! `limiter` sections). Every field has a default, so partial documents load cleanly; the
//! `*_config` projections hand each service exactly what it needs.

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

const DEFAULT_APP_NAME: &str = "access-core";

/// Top-level configuration document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
	/// Application identity.
	pub app: AppConfig,
	/// Session token settings.
	pub jwt: JwtConfig,
	/// Request signature settings.
	pub sign: SignConfig,
	/// Rate limiter settings.
	pub limiter: LimiterSection,
}
impl AccessConfig {
	/// Parses a JSON document, reporting the exact path of any offending field.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_str(raw);

		Ok(serde_path_to_error::deserialize(&mut deserializer)?)
	}

	/// Projects the settings consumed by [`TokenService`](crate::token::TokenService).
	pub fn token_config(&self) -> TokenConfig {
		TokenConfig {
			sign_key: self.jwt.sign_key.clone(),
			issuer: self.app.name.clone(),
			debug: self.app.debug,
			expire_time: self.jwt.expire_time,
			debug_expire_time: self.jwt.debug_expire_time,
			max_refresh_time: self.jwt.max_refresh_time,
			leeway: self.jwt.leeway,
			..TokenConfig::default()
		}
	}

	/// Projects the settings consumed by [`SignatureEngine`](crate::signature::SignatureEngine).
	pub fn signature_config(&self) -> SignatureConfig {
		SignatureConfig {
			app_key: self.app.key.clone(),
			app_secret: self.app.secret.clone(),
			expiry_window: self.sign.expiry_window,
		}
	}

	/// Projects the settings consumed by [`RateLimiter`](crate::limiter::RateLimiter).
	pub fn limiter_config(&self) -> LimiterConfig {
		LimiterConfig {
			prefix: self
				.limiter
				.prefix
				.clone()
				.unwrap_or_else(|| format!("{}:limiter", self.app.name)),
		}
	}
}

/// Application identity section.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
	/// Application name; used as token issuer and store namespace.
	pub name: String,
	/// This application's own key when signing outbound requests.
	pub key: String,
	/// This application's own signing secret.
	pub secret: TokenSecret,
	/// Debug mode switches tokens to the debug lifetime.
	pub debug: bool,
}
impl Default for AppConfig {
	fn default() -> Self {
		Self {
			name: DEFAULT_APP_NAME.into(),
			key: String::new(),
			secret: TokenSecret::default(),
			debug: false,
		}
	}
}

/// Session token section; lifetimes are in minutes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
	/// HMAC signing key.
	pub sign_key: TokenSecret,
	/// Token lifetime.
	pub expire_time: i64,
	/// Token lifetime in debug mode.
	pub debug_expire_time: i64,
	/// Maximum time since first issuance during which a token may be refreshed.
	pub max_refresh_time: i64,
	/// Clock-skew tolerance in seconds.
	pub leeway: i64,
}
impl Default for JwtConfig {
	fn default() -> Self {
		let token = TokenConfig::default();

		Self {
			sign_key: token.sign_key,
			expire_time: token.expire_time,
			debug_expire_time: token.debug_expire_time,
			max_refresh_time: token.max_refresh_time,
			leeway: token.leeway,
		}
	}
}

/// Request signature section.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SignConfig {
	/// Freshness window in minutes.
	pub expiry_window: i64,
}
impl Default for SignConfig {
	fn default() -> Self {
		Self { expiry_window: SignatureConfig::DEFAULT_EXPIRY_WINDOW_MINUTES }
	}
}

/// Rate limiter section.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterSection {
	/// Counter key prefix; defaults to `<app name>:limiter`.
	pub prefix: Option<String>,
}

/// Settings for [`TokenService`](crate::token::TokenService).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
	/// HMAC signing key.
	pub sign_key: TokenSecret,
	/// Issuer claim and revocation key namespace.
	pub issuer: String,
	/// Debug mode switches tokens to [`debug_expire_time`](Self::debug_expire_time).
	pub debug: bool,
	/// Token lifetime in minutes.
	pub expire_time: i64,
	/// Token lifetime in minutes when `debug` is set.
	pub debug_expire_time: i64,
	/// Refresh window in minutes, measured from the first issuance.
	pub max_refresh_time: i64,
	/// Clock-skew tolerance in seconds.
	pub leeway: i64,
	/// Query parameter checked first for a token.
	pub query_param: String,
	/// Bare header checked before `Authorization`.
	pub header: String,
}
impl TokenConfig {
	/// Creates a config with default lifetimes for the given key and issuer.
	pub fn new(sign_key: impl Into<TokenSecret>, issuer: impl Into<String>) -> Self {
		Self { sign_key: sign_key.into(), issuer: issuer.into(), ..Self::default() }
	}

	/// Overrides the token lifetime.
	pub fn with_expire_time(mut self, minutes: i64) -> Self {
		self.expire_time = minutes;

		self
	}

	/// Overrides the refresh window.
	pub fn with_max_refresh_time(mut self, minutes: i64) -> Self {
		self.max_refresh_time = minutes;

		self
	}

	/// Toggles debug mode.
	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;

		self
	}

	/// Lifetime applied to newly signed tokens.
	pub fn lifetime(&self) -> Result<Duration, ConfigError> {
		let (field, value) = self.lifetime_setting();

		minutes(field, value)
	}

	/// Refresh window measured from the first issuance.
	pub fn max_refresh(&self) -> Result<Duration, ConfigError> {
		minutes("max_refresh_time", self.max_refresh_time)
	}

	/// Expiry of a token signed at `now`.
	pub fn expiry_from(&self, now: OffsetDateTime) -> Result<OffsetDateTime, ConfigError> {
		let (field, value) = self.lifetime_setting();

		now.checked_add(self.lifetime()?).ok_or(ConfigError::DurationOutOfRange { field, value })
	}

	/// Clock-skew tolerance.
	pub fn leeway(&self) -> Duration {
		Duration::seconds(self.leeway.max(0))
	}

	fn lifetime_setting(&self) -> (&'static str, i64) {
		if self.debug {
			("debug_expire_time", self.debug_expire_time)
		} else {
			("expire_time", self.expire_time)
		}
	}
}
impl Default for TokenConfig {
	fn default() -> Self {
		Self {
			sign_key: TokenSecret::default(),
			issuer: DEFAULT_APP_NAME.into(),
			debug: false,
			expire_time: 120,
			debug_expire_time: 86_400,
			max_refresh_time: 86_400,
			leeway: 0,
			query_param: "token".into(),
			header: "token".into(),
		}
	}
}

/// Converts a minute-based setting, refusing values whose seconds overflow.
pub(crate) fn minutes(field: &'static str, value: i64) -> Result<Duration, ConfigError> {
	value
		.checked_mul(60)
		.map(Duration::seconds)
		.ok_or(ConfigError::DurationOutOfRange { field, value })
}

/// Settings for [`SignatureEngine`](crate::signature::SignatureEngine).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
	/// This application's own key.
	pub app_key: String,
	/// This application's own secret.
	pub app_secret: TokenSecret,
	/// Freshness window in minutes.
	pub expiry_window: i64,
}
impl SignatureConfig {
	/// Default freshness window in minutes.
	pub const DEFAULT_EXPIRY_WINDOW_MINUTES: i64 = 15;

	/// Creates a config for the given own identity with the default window.
	pub fn new(app_key: impl Into<String>, app_secret: impl Into<TokenSecret>) -> Self {
		Self {
			app_key: app_key.into(),
			app_secret: app_secret.into(),
			expiry_window: Self::DEFAULT_EXPIRY_WINDOW_MINUTES,
		}
	}
}
impl Default for SignatureConfig {
	fn default() -> Self {
		Self::new(String::new(), TokenSecret::default())
	}
}

/// Settings for [`RateLimiter`](crate::limiter::RateLimiter).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
	/// Prefix prepended to every counter key.
	pub prefix: String,
}
impl Default for LimiterConfig {
	fn default() -> Self {
		Self { prefix: format!("{DEFAULT_APP_NAME}:limiter") }
	}
}
