//! Session token lifecycle: issue, parse, refresh, and revoke HS256 tokens.
//!
//! [`TokenService`] is the only component that signs or verifies tokens. It owns one
//! [`TokenDriver`] for server-side session bookkeeping and one [`RevocationStore`] shared with
//! every other node of the deployment. Revocation wins over every other check: a revoked token
//! is rejected even while its signature and expiry are fine, until the entry lapses at the
//! token's own expiry.

pub mod builder;
pub mod extract;

pub use builder::TokenServiceBuilder;
pub use extract::extract_token;

// crates.io
use async_lock::OnceCell;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
// self
use crate::{
	_prelude::*,
	auth::{TokenClaims, TokenSecret, TokenSource, TokenStatus},
	config::TokenConfig,
	driver::{TokenDriver, TokenIdRequest},
	error::ConfigError,
	obs::{self, Operation},
	store::{self, RevocationStore},
};

/// A freshly signed token together with the claims it carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedToken {
	/// Encoded token handed to the client.
	pub token: TokenSecret,
	/// Claims embedded in [`token`](Self::token).
	pub claims: TokenClaims,
}

/// Issues, verifies, refreshes, and revokes session tokens.
///
/// Cloning is cheap and every clone shares the driver, the revocation store, and the warm-up
/// state.
#[derive(Clone)]
pub struct TokenService {
	config: Arc<TokenConfig>,
	driver: Arc<dyn TokenDriver>,
	revocations: Arc<dyn RevocationStore>,
	encoding_key: EncodingKey,
	decoding_key: DecodingKey,
	validation: Validation,
	warmed: Arc<OnceCell<usize>>,
}
impl TokenService {
	/// Starts building a service for the given settings.
	pub fn builder(config: TokenConfig) -> TokenServiceBuilder {
		TokenServiceBuilder::new(config)
	}

	pub(crate) fn from_parts(
		config: TokenConfig,
		driver: Arc<dyn TokenDriver>,
		revocations: Arc<dyn RevocationStore>,
	) -> Self {
		let key = config.sign_key.expose().as_bytes();
		let encoding_key = EncodingKey::from_secret(key);
		let decoding_key = DecodingKey::from_secret(key);
		// Expiry and not-before are evaluated by `TokenClaims::status_at` so expired tokens
		// remain readable for refresh.
		let mut validation = Validation::new(Algorithm::HS256);

		validation.validate_exp = false;
		validation.validate_nbf = false;
		validation.validate_aud = false;
		validation.required_spec_claims.clear();

		Self {
			config: Arc::new(config),
			driver,
			revocations,
			encoding_key,
			decoding_key,
			validation,
			warmed: Arc::new(OnceCell::new()),
		}
	}

	/// Returns the service settings.
	pub fn config(&self) -> &TokenConfig {
		&self.config
	}

	/// Issues a token for the subject at the current time.
	pub async fn make_token(
		&self,
		subject_id: u64,
		subject_name: impl Into<String>,
	) -> Result<IssuedToken> {
		self.make_token_at(subject_id, subject_name, OffsetDateTime::now_utc()).await
	}

	/// Issues a token for the subject at `now`.
	pub async fn make_token_at(
		&self,
		subject_id: u64,
		subject_name: impl Into<String>,
		now: OffsetDateTime,
	) -> Result<IssuedToken> {
		let subject_name = subject_name.into();

		obs::observe(Operation::MakeToken, "make_token", async {
			let issued_at = now.unix_timestamp();
			let expire_time = self.config.expiry_from(now)?.unix_timestamp();
			let jti = self
				.driver
				.new_token_id(&TokenIdRequest {
					subject_id,
					subject_name: &subject_name,
					issued_at,
					expire_time,
					previous: None,
				})
				.await?;
			let claims = TokenClaims {
				subject_id,
				subject_name: subject_name.clone(),
				expire_time,
				issued_at,
				not_before: issued_at,
				issuer: self.config.issuer.clone(),
				jti,
			};

			self.sign_and_persist(claims).await
		})
		.await
	}

	/// Reads and verifies the token carried by `request` at the current time.
	pub async fn parse_token(&self, request: &dyn TokenSource) -> Result<TokenClaims> {
		self.parse_token_at(request, OffsetDateTime::now_utc()).await
	}

	/// Reads and verifies the token carried by `request` at `now`.
	pub async fn parse_token_at(
		&self,
		request: &dyn TokenSource,
		now: OffsetDateTime,
	) -> Result<TokenClaims> {
		obs::observe(Operation::ParseToken, "parse_token", async {
			let claims = self.read_claims(request).await?;

			self.ensure_not_revoked(&claims, now).await?;

			match claims.status_at(now, self.config.leeway()) {
				TokenStatus::Active => Ok(claims),
				TokenStatus::Expired => Err(Error::TokenExpired),
				TokenStatus::Pending => Err(Error::TokenInvalid),
			}
		})
		.await
	}

	/// Exchanges the token carried by `request` for a new one at the current time.
	pub async fn refresh_token(&self, request: &dyn TokenSource) -> Result<IssuedToken> {
		self.refresh_token_at(request, OffsetDateTime::now_utc()).await
	}

	/// Exchanges the token carried by `request` for a new one at `now`.
	///
	/// Expired tokens are accepted as long as their first issuance lies within the refresh
	/// window. The new token keeps `issued_at` and `not_before` and gets a new expiry and
	/// `jti`. The old token is left untouched.
	pub async fn refresh_token_at(
		&self,
		request: &dyn TokenSource,
		now: OffsetDateTime,
	) -> Result<IssuedToken> {
		obs::observe(Operation::RefreshToken, "refresh_token", async {
			let claims = self.read_claims(request).await?;

			self.ensure_not_revoked(&claims, now).await?;

			if claims.status_at(now, self.config.leeway()) == TokenStatus::Pending {
				return Err(Error::TokenInvalid);
			}
			if claims.age_at(now) > self.config.max_refresh()? {
				return Err(Error::TokenExpiredMaxRefresh);
			}

			let expire_time = self.config.expiry_from(now)?.unix_timestamp();
			let jti = self
				.driver
				.new_token_id(&TokenIdRequest {
					subject_id: claims.subject_id,
					subject_name: &claims.subject_name,
					issued_at: claims.issued_at,
					expire_time,
					previous: Some(&claims.jti),
				})
				.await?;

			self.sign_and_persist(TokenClaims { expire_time, jti, ..claims }).await
		})
		.await
	}

	/// Revokes `claims` at the current time.
	pub async fn invalidate(&self, claims: &TokenClaims) -> Result<()> {
		self.invalidate_at(claims, OffsetDateTime::now_utc()).await
	}

	/// Revokes `claims` at `now`.
	///
	/// The driver is told first. When it fails nothing is written to the revocation store.
	/// The revocation entry lives until the token's own expiry; already expired tokens need
	/// none.
	pub async fn invalidate_at(&self, claims: &TokenClaims, now: OffsetDateTime) -> Result<()> {
		obs::observe(Operation::Invalidate, "invalidate", async {
			self.driver.invalidate_token(claims).await?;

			if !claims.remaining_at(now).is_positive() {
				return Ok(());
			}

			let key = store::revocation_key(&self.config.issuer, &claims.jti);

			self.revocations.revoke(&key, claims.expires_at(), now).await?;

			Ok(())
		})
		.await
	}

	/// Replays the driver's unexpired invalidations into the revocation store.
	///
	/// Runs at most once per service (clones included); later calls return the first run's
	/// count. A failed run may be retried.
	pub async fn init_revocation_cache(&self) -> Result<usize> {
		self.init_revocation_cache_at(OffsetDateTime::now_utc()).await
	}

	/// Same as [`init_revocation_cache`](Self::init_revocation_cache), evaluated at `now`.
	pub async fn init_revocation_cache_at(&self, now: OffsetDateTime) -> Result<usize> {
		let count = self
			.warmed
			.get_or_try_init(|| {
				obs::observe(Operation::WarmRevocations, "init_revocation_cache", async move {
					let tokens = self.driver.unexpired_invalidated_tokens(now).await?;

					for claims in &tokens {
						let key = store::revocation_key(&self.config.issuer, &claims.jti);

						self.revocations.revoke(&key, claims.expires_at(), now).await?;
					}

					obs::log_count(Operation::WarmRevocations, "init_revocation_cache", tokens.len());

					Ok(tokens.len())
				})
			})
			.await?;

		Ok(*count)
	}

	/// Returns `true` once the revocation cache has been warmed.
	pub fn is_warmed(&self) -> bool {
		self.warmed.is_initialized()
	}

	/// Returns `true` when `claims` carry a revoked token id at `now`.
	pub async fn is_revoked_at(&self, claims: &TokenClaims, now: OffsetDateTime) -> Result<bool> {
		let key = store::revocation_key(&self.config.issuer, &claims.jti);

		Ok(self.revocations.is_revoked(&key, now).await?)
	}

	async fn read_claims(&self, request: &dyn TokenSource) -> Result<TokenClaims> {
		let token = extract_token(&self.config, request)?;
		let token = self.driver.preprocess_token(token, request).await?;

		self.decode(&token)
	}

	fn decode(&self, token: &str) -> Result<TokenClaims> {
		if jsonwebtoken::decode_header(token).is_err() {
			return Err(Error::TokenMalformed);
		}

		jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
			.map(|data| data.claims)
			.map_err(|e| match e.kind() {
				ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Utf8(_) =>
					Error::TokenMalformed,
				_ => Error::TokenInvalid,
			})
	}

	async fn ensure_not_revoked(&self, claims: &TokenClaims, now: OffsetDateTime) -> Result<()> {
		if self.is_revoked_at(claims, now).await? {
			return Err(Error::TokenInvalid);
		}

		Ok(())
	}

	async fn sign_and_persist(&self, claims: TokenClaims) -> Result<IssuedToken> {
		let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
			.map_err(ConfigError::TokenSigning)?;

		self.driver.persist_token(&token, &claims).await?;

		Ok(IssuedToken { token: TokenSecret::new(token), claims })
	}
}
impl Debug for TokenService {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenService")
			.field("config", &self.config)
			.field("warmed", &self.is_warmed())
			.finish_non_exhaustive()
	}
}
