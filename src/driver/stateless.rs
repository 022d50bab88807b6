//! Driver for purely self-contained tokens with no server-side session tracking.

// self
use crate::{
	_prelude::*,
	auth::{TokenClaims, TokenId, TokenSource},
	driver::{self, DriverFuture, TokenDriver, TokenIdRequest},
};

/// Passes tokens through untouched and keeps no state; revocations live only in the
/// [`RevocationStore`](crate::store::RevocationStore).
#[derive(Clone, Copy, Debug, Default)]
pub struct StatelessDriver;
impl TokenDriver for StatelessDriver {
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
		_claims: &'a TokenClaims,
	) -> DriverFuture<'a, ()> {
		Box::pin(async { Ok(()) })
	}

	fn invalidate_token<'a>(&'a self, _claims: &'a TokenClaims) -> DriverFuture<'a, ()> {
		Box::pin(async { Ok(()) })
	}

	fn unexpired_invalidated_tokens(
		&self,
		_now: OffsetDateTime,
	) -> DriverFuture<'_, Vec<TokenClaims>> {
		Box::pin(async { Ok(Vec::new()) })
	}
}
