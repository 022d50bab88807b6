//! App-to-app request signatures over canonicalized, possibly nested parameters.
//!
//! A signature is `md5_hex(md5_hex(prefix + canonical))` where the prefix binds the calling
//! app key, its secret, the nonce, and the timestamp, and the canonical string is produced by
//! [`canonicalize`]. Verification recomputes the digest from the values the caller supplied,
//! compares in constant time, and checks freshness as a separate, independent test.

pub mod canonical;
pub mod options;
pub mod request;

pub use canonical::{RESERVED_FIELDS, canonicalize};
pub use options::*;
pub use request::*;

// crates.io
use md5::{Digest, Md5};
use rand::{Rng, distr::Alphanumeric};
use subtle::ConstantTimeEq;
// self
use crate::{
	_prelude::*,
	auth::{AppKey, TokenSecret},
	config::SignatureConfig,
	error::ConfigError,
	obs::{self, Operation},
};

/// Length of generated nonces.
pub const NONCE_LEN: usize = 10;

/// Looks up the secret registered for a calling application.
///
/// Implemented for closures and for plain `HashMap<AppKey, TokenSecret>` tables.
pub trait SecretResolver
where
	Self: Send + Sync,
{
	/// Returns the secret for `app_key`, or [`ConfigError::SecretUnresolvable`].
	fn resolve(&self, app_key: &str) -> Result<TokenSecret, ConfigError>;
}
impl<F> SecretResolver for F
where
	F: Send + Sync + Fn(&str) -> Result<TokenSecret, ConfigError>,
{
	fn resolve(&self, app_key: &str) -> Result<TokenSecret, ConfigError> {
		self(app_key)
	}
}
impl SecretResolver for HashMap<AppKey, TokenSecret> {
	fn resolve(&self, app_key: &str) -> Result<TokenSecret, ConfigError> {
		self.get(app_key)
			.cloned()
			.ok_or_else(|| ConfigError::SecretUnresolvable { app_key: app_key.into(), source: None })
	}
}

/// Parameters with every reserved field filled in, plus the digest that signs them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedParams {
	/// Original parameters plus `app_key`, `random_str`, `timestamp`, and `sign`.
	pub params: JsonMap<String, JsonValue>,
	/// 32-character lowercase hex digest.
	pub sign: String,
}

/// Signs outbound requests and verifies inbound ones.
#[derive(Clone)]
pub struct SignatureEngine {
	config: SignatureConfig,
	resolver: Option<Arc<dyn SecretResolver>>,
}
impl SignatureEngine {
	/// Creates an engine that signs with, and verifies against, its own secret.
	pub fn new(config: SignatureConfig) -> Self {
		Self { config, resolver: None }
	}

	/// Resolves secrets per calling app key instead of using the engine's own secret.
	pub fn with_resolver(mut self, resolver: impl 'static + SecretResolver) -> Self {
		self.resolver = Some(Arc::new(resolver));

		self
	}

	/// Returns the engine configuration.
	pub fn config(&self) -> &SignatureConfig {
		&self.config
	}

	/// Verifies `provided` with default options at the current time.
	pub fn verify(
		&self,
		params: &JsonMap<String, JsonValue>,
		provided: &str,
	) -> Result<SignatureReport> {
		self.verify_at(params, provided, &VerifyOptions::default(), OffsetDateTime::now_utc())
	}

	/// Verifies `provided` with explicit options at the current time.
	pub fn verify_with(
		&self,
		params: &JsonMap<String, JsonValue>,
		provided: &str,
		options: &VerifyOptions,
	) -> Result<SignatureReport> {
		self.verify_at(params, provided, options, OffsetDateTime::now_utc())
	}

	/// Verifies `provided` at `now`.
	///
	/// Digest mismatch and staleness are both evaluated and accumulated in the report. Empty
	/// parameters and unresolvable secrets are hard errors instead.
	pub fn verify_at(
		&self,
		params: &JsonMap<String, JsonValue>,
		provided: &str,
		options: &VerifyOptions,
		now: OffsetDateTime,
	) -> Result<SignatureReport> {
		obs::observe_now(Operation::VerifySignature, "verify", || {
			if params.is_empty() {
				return Err(Error::InvalidRequest {
					reason: "request parameters cannot be empty".into(),
				});
			}

			let app_key = string_field(params, "app_key").unwrap_or_else(|| self.config.app_key.clone());
			let secret = self.resolve_secret(&app_key, options.secret.as_ref())?;
			let random_str = string_field(params, "random_str").unwrap_or_default();
			let timestamp = timestamp_field(params).unwrap_or(0);
			let expected = sign(params, &app_key, secret.expose(), &random_str, timestamp);
			let mut report = SignatureReport::default();

			if !bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
				report.push(SignatureFailure::Invalid, &options.messages);
			}

			let window = options.window_or(&self.config)?;

			if options.is_expired(window, timestamp, now) {
				report.push(SignatureFailure::Expired, &options.messages);
			}

			Ok(report)
		})
	}

	/// Validates the reserved field shapes, then verifies the embedded `sign` at the current
	/// time.
	pub fn verify_request(&self, params: &JsonMap<String, JsonValue>) -> Result<SignatureReport> {
		self.verify_request_at(params, &VerifyOptions::default(), OffsetDateTime::now_utc())
	}

	/// Validates the reserved field shapes, then verifies the embedded `sign` at `now`.
	pub fn verify_request_at(
		&self,
		params: &JsonMap<String, JsonValue>,
		options: &VerifyOptions,
		now: OffsetDateTime,
	) -> Result<SignatureReport> {
		let request = SignedRequest::from_params(params);
		let errors = request.validate();

		if !errors.is_empty() {
			let fields = errors.keys().copied().collect::<Vec<_>>().join(", ");

			return Err(Error::InvalidRequest {
				reason: format!("malformed signed-request fields: {fields}"),
			});
		}

		self.verify_at(params, &request.sign, options, now)
	}

	/// Signs outbound parameters at the current time.
	pub fn make_sign(&self, params: JsonMap<String, JsonValue>) -> Result<SignedParams> {
		self.make_sign_at(params, OffsetDateTime::now_utc())
	}

	/// Signs outbound parameters, filling `app_key`, `random_str`, and `timestamp` when absent.
	pub fn make_sign_at(
		&self,
		mut params: JsonMap<String, JsonValue>,
		now: OffsetDateTime,
	) -> Result<SignedParams> {
		obs::observe_now(Operation::MakeSign, "make_sign", move || {
			let app_key = string_field(&params, "app_key").unwrap_or_else(|| self.config.app_key.clone());
			let random_str = string_field(&params, "random_str").unwrap_or_else(random_nonce);
			let timestamp = timestamp_field(&params).unwrap_or_else(|| now.unix_timestamp());
			let secret = self.resolve_secret(&app_key, None)?;
			let digest = sign(&params, &app_key, secret.expose(), &random_str, timestamp);

			params.insert("app_key".into(), app_key.into());
			params.insert("random_str".into(), random_str.into());
			params.insert("timestamp".into(), timestamp.into());
			params.insert("sign".into(), digest.clone().into());

			Ok(SignedParams { params, sign: digest })
		})
	}

	fn resolve_secret(
		&self,
		app_key: &str,
		explicit: Option<&TokenSecret>,
	) -> Result<TokenSecret, ConfigError> {
		let secret = match (explicit, &self.resolver) {
			(Some(secret), _) => secret.clone(),
			(None, Some(resolver)) => resolver.resolve(app_key)?,
			(None, None) => self.config.app_secret.clone(),
		};

		if secret.is_empty() {
			return Err(ConfigError::SecretUnresolvable { app_key: app_key.into(), source: None });
		}

		Ok(secret)
	}
}
impl Debug for SignatureEngine {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SignatureEngine")
			.field("config", &self.config)
			.field("resolver", &self.resolver.as_ref().map(|_| ".."))
			.finish()
	}
}

/// Computes the double MD5 digest binding the identity prefix to the canonical parameters.
pub fn sign(
	params: &JsonMap<String, JsonValue>,
	app_key: &str,
	app_secret: &str,
	random_str: &str,
	timestamp: i64,
) -> String {
	let payload = format!(
		"app_key={app_key}&app_secret={app_secret}&random_str={random_str}&timestamp={timestamp}{}",
		canonicalize(params)
	);

	md5_hex(md5_hex(payload.as_bytes()).as_bytes())
}

/// Generates a random alphanumeric nonce of [`NONCE_LEN`] characters.
pub fn random_nonce() -> String {
	rand::rng().sample_iter(Alphanumeric).take(NONCE_LEN).map(char::from).collect()
}

fn md5_hex(bytes: &[u8]) -> String {
	hex::encode(Md5::digest(bytes))
}

fn string_field(params: &JsonMap<String, JsonValue>, name: &str) -> Option<String> {
	params.get(name).map(canonical::render_scalar).filter(|value| !value.is_empty())
}

fn timestamp_field(params: &JsonMap<String, JsonValue>) -> Option<i64> {
	let timestamp = match params.get("timestamp")? {
		JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
		JsonValue::String(s) => s.trim().parse().ok(),
		_ => None,
	};

	timestamp.filter(|ts| *ts > 0)
}
