//! In-process driver that tracks issued and invalidated sessions.

// self
use crate::{
	_prelude::*,
	auth::{TokenClaims, TokenId, TokenSource},
	driver::{self, DriverError, DriverFuture, TokenDriver, TokenIdRequest},
};

#[derive(Debug, Default)]
struct Sessions {
	issued: HashMap<TokenId, TokenClaims>,
	invalidated: HashMap<TokenId, TokenClaims>,
}

/// Thread-safe driver that remembers every issued and invalidated token.
///
/// Suitable for tests and single-node deployments. It plays the durable source of truth that
/// [`TokenService::init_revocation_cache`](crate::token::TokenService::init_revocation_cache)
/// replays into a fresh revocation store.
#[derive(Clone, Debug, Default)]
pub struct MemoryDriver(Arc<RwLock<Sessions>>);
impl MemoryDriver {
	/// Number of tokens persisted so far, refreshed tokens included.
	pub fn issued_count(&self) -> usize {
		self.0.read().issued.len()
	}

	/// Returns `true` when the token id has been invalidated.
	pub fn is_invalidated(&self, jti: &str) -> bool {
		self.0.read().invalidated.contains_key(jti)
	}

	/// Returns the claims recorded for an issued token id.
	pub fn issued(&self, jti: &str) -> Option<TokenClaims> {
		self.0.read().issued.get(jti).cloned()
	}

	fn persist_now(&self, claims: &TokenClaims) -> Result<(), DriverError> {
		let mut guard = self.0.write();

		if guard.issued.contains_key(&claims.jti) {
			return Err(DriverError::Backend {
				message: format!("Token id {} was already persisted", claims.jti),
			});
		}

		guard.issued.insert(claims.jti.clone(), claims.clone());

		Ok(())
	}

	fn invalidate_now(&self, claims: &TokenClaims) {
		self.0.write().invalidated.insert(claims.jti.clone(), claims.clone());
	}

	fn unexpired_now(&self, now: OffsetDateTime) -> Vec<TokenClaims> {
		let now = now.unix_timestamp();

		self.0
			.read()
			.invalidated
			.values()
			.filter(|claims| claims.expire_time > now)
			.cloned()
			.collect()
	}
}
impl TokenDriver for MemoryDriver {
	fn preprocess_token<'a>(
		&'a self,
		token: String,
		_request: &'a dyn TokenSource,
	) -> DriverFuture<'a, String> {
		Box::pin(async move { Ok(token) })
	}

	fn new_token_id<'a>(&'a self, request: &'a TokenIdRequest<'a>) -> DriverFuture<'a, TokenId> {
		Box::pin(async move { Ok(driver::random_token_id(request)) })
	}

	fn persist_token<'a>(
		&'a self,
		_token: &'a str,
		claims: &'a TokenClaims,
	) -> DriverFuture<'a, ()> {
		Box::pin(async move { self.persist_now(claims) })
	}

	fn invalidate_token<'a>(&'a self, claims: &'a TokenClaims) -> DriverFuture<'a, ()> {
		Box::pin(async move {
			self.invalidate_now(claims);

			Ok(())
		})
	}

	fn unexpired_invalidated_tokens(
		&self,
		now: OffsetDateTime,
	) -> DriverFuture<'_, Vec<TokenClaims>> {
		Box::pin(async move { Ok(self.unexpired_now(now)) })
	}
}
