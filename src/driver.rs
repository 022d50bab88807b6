//! Token driver hooks that let deployments track sessions server-side.
//!
//! A [`TokenService`](crate::token::TokenService) owns exactly one driver, supplied at
//! construction. Hooks may block on I/O; the service awaits them inline and never retries.

pub mod memory;
pub mod stateless;

pub use memory::MemoryDriver;
pub use stateless::StatelessDriver;

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{TokenClaims, TokenId, TokenSource},
};

/// Boxed future returned by [`TokenDriver`] hooks.
pub type DriverFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DriverError>> + 'a + Send>>;

/// Capability set a deployment plugs into the token service.
pub trait TokenDriver
where
	Self: Send + Sync,
{
	/// Normalizes a raw token before it is parsed (e.g. unwrapping an external envelope).
	fn preprocess_token<'a>(
		&'a self,
		token: String,
		request: &'a dyn TokenSource,
	) -> DriverFuture<'a, String>;

	/// Produces a fresh, unique `jti` for the claims about to be signed.
	fn new_token_id<'a>(&'a self, request: &'a TokenIdRequest<'a>) -> DriverFuture<'a, TokenId>;

	/// Records a freshly signed token.
	fn persist_token<'a>(&'a self, token: &'a str, claims: &'a TokenClaims)
	-> DriverFuture<'a, ()>;

	/// Marks a token as invalidated in the driver's source of truth.
	fn invalidate_token<'a>(&'a self, claims: &'a TokenClaims) -> DriverFuture<'a, ()>;

	/// Lists invalidated tokens that have not expired at `now`.
	fn unexpired_invalidated_tokens(&self, now: OffsetDateTime)
	-> DriverFuture<'_, Vec<TokenClaims>>;
}

/// Claims about to be signed, handed to [`TokenDriver::new_token_id`].
#[derive(Clone, Copy, Debug)]
pub struct TokenIdRequest<'a> {
	/// Subject identifier.
	pub subject_id: u64,
	/// Subject display name.
	pub subject_name: &'a str,
	/// First issuance instant (unix seconds).
	pub issued_at: i64,
	/// Expiry the new token will carry (unix seconds).
	pub expire_time: i64,
	/// Token id being replaced, when refreshing.
	pub previous: Option<&'a TokenId>,
}

/// Error type produced by [`TokenDriver`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum DriverError {
	/// Driver refused the token outright.
	#[error("Token driver rejected the token: {reason}.")]
	Rejected {
		/// Human-readable reason.
		reason: String,
	},
	/// Backend-level failure inside the driver.
	#[error("Token driver failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Generates a random, URL-safe token id bound to the subject and issuance instant.
pub fn random_token_id(request: &TokenIdRequest) -> TokenId {
	let mut nonce = [0_u8; 32];

	rand::rng().fill_bytes(&mut nonce);

	let mut hasher = Sha256::new();

	hasher.update(nonce);
	hasher.update(request.subject_id.to_be_bytes());
	hasher.update(request.expire_time.to_be_bytes());

	TokenId::from_encoded_digest(URL_SAFE_NO_PAD.encode(hasher.finalize()))
}
