// std
use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};
// crates.io
use url::Url;
// self
use access_core::{
	auth::{RequestParts, TokenClaims, TokenId, TokenSource},
	config::{AccessConfig, TokenConfig},
	driver::{DriverError, DriverFuture, MemoryDriver, TokenDriver, TokenIdRequest},
	error::Error,
	store::{MemoryRevocationStore, RevocationStore},
	time::{Duration, OffsetDateTime},
	token::TokenService,
};

const CONFIG: &str = r#"{
	"app": { "name": "shop" },
	"jwt": { "sign_key": "integration-key", "expire_time": 30, "max_refresh_time": 600 }
}"#;

fn token_config() -> TokenConfig {
	AccessConfig::from_json_str(CONFIG).expect("Config fixture should load.").token_config()
}

fn node(driver: &MemoryDriver, revocations: &MemoryRevocationStore) -> TokenService {
	TokenService::builder(token_config())
		.driver(Arc::new(driver.clone()))
		.revocations(Arc::new(revocations.clone()))
		.build()
		.expect("Token service should build from the config fixture.")
}

/// Records invalidations but refuses to acknowledge them.
#[derive(Debug, Default)]
struct RefusingDriver(MemoryDriver);
impl TokenDriver for RefusingDriver {
	fn preprocess_token<'a>(
		&'a self,
		token: String,
		request: &'a dyn TokenSource,
	) -> DriverFuture<'a, String> {
		self.0.preprocess_token(token, request)
	}

	fn new_token_id<'a>(&'a self, request: &'a TokenIdRequest<'a>) -> DriverFuture<'a, TokenId> {
		self.0.new_token_id(request)
	}

	fn persist_token<'a>(
		&'a self,
		token: &'a str,
		claims: &'a TokenClaims,
	) -> DriverFuture<'a, ()> {
		self.0.persist_token(token, claims)
	}

	fn invalidate_token<'a>(&'a self, _claims: &'a TokenClaims) -> DriverFuture<'a, ()> {
		Box::pin(async { Err(DriverError::Backend { message: "session table offline".into() }) })
	}

	fn unexpired_invalidated_tokens(
		&self,
		now: OffsetDateTime,
	) -> DriverFuture<'_, Vec<TokenClaims>> {
		self.0.unexpired_invalidated_tokens(now)
	}
}

/// Expects tokens in a `wrapped:` envelope and fails id or persistence hooks on demand.
#[derive(Debug, Default)]
struct EnvelopeDriver {
	inner: MemoryDriver,
	fail_ids: AtomicBool,
	fail_persist: AtomicBool,
}
impl EnvelopeDriver {
	fn outage(message: &str) -> DriverError {
		DriverError::Backend { message: message.into() }
	}
}
impl TokenDriver for EnvelopeDriver {
	fn preprocess_token<'a>(
		&'a self,
		token: String,
		_request: &'a dyn TokenSource,
	) -> DriverFuture<'a, String> {
		Box::pin(async move {
			token
				.strip_prefix("wrapped:")
				.map(str::to_owned)
				.ok_or_else(|| DriverError::Rejected { reason: "missing envelope".into() })
		})
	}

	fn new_token_id<'a>(&'a self, request: &'a TokenIdRequest<'a>) -> DriverFuture<'a, TokenId> {
		if self.fail_ids.load(Ordering::SeqCst) {
			return Box::pin(async { Err(Self::outage("id sequence offline")) });
		}

		self.inner.new_token_id(request)
	}

	fn persist_token<'a>(
		&'a self,
		token: &'a str,
		claims: &'a TokenClaims,
	) -> DriverFuture<'a, ()> {
		if self.fail_persist.load(Ordering::SeqCst) {
			return Box::pin(async { Err(Self::outage("session table offline")) });
		}

		self.inner.persist_token(token, claims)
	}

	fn invalidate_token<'a>(&'a self, claims: &'a TokenClaims) -> DriverFuture<'a, ()> {
		self.inner.invalidate_token(claims)
	}

	fn unexpired_invalidated_tokens(
		&self,
		now: OffsetDateTime,
	) -> DriverFuture<'_, Vec<TokenClaims>> {
		self.inner.unexpired_invalidated_tokens(now)
	}
}

fn enveloped(driver: &Arc<EnvelopeDriver>) -> TokenService {
	TokenService::builder(token_config())
		.driver(driver.clone())
		.build()
		.expect("Token service should build.")
}

fn wrapped(token: &str) -> RequestParts {
	RequestParts::new().with_bearer(format!("wrapped:{token}"))
}

#[tokio::test]
async fn revocation_is_visible_across_nodes() {
	let driver = MemoryDriver::default();
	let revocations = MemoryRevocationStore::default();
	let node_a = node(&driver, &revocations);
	let node_b = node(&driver, &revocations);
	let issued = node_a.make_token(42, "carol").await.expect("Issuing should succeed.");
	let url = Url::parse(&format!("https://api.example.com/orders?token={}", issued.token.expose()))
		.expect("Request URL fixture should parse.");
	let request = RequestParts::from_url(&url);
	let parsed = node_b.parse_token(&request).await.expect("Node B should accept the token.");

	assert_eq!(parsed.subject_id, 42);
	assert_eq!(driver.issued_count(), 1);

	node_a.invalidate(&parsed).await.expect("Invalidation should succeed.");

	assert!(driver.is_invalidated(&parsed.jti));
	assert!(matches!(node_b.parse_token(&request).await, Err(Error::TokenInvalid)));
	assert_eq!(revocations.live_entries_at(OffsetDateTime::now_utc()), 1);
}

#[tokio::test]
async fn refreshed_tokens_are_persisted_and_independent() {
	let driver = MemoryDriver::default();
	let revocations = MemoryRevocationStore::default();
	let service = node(&driver, &revocations);
	let now = OffsetDateTime::now_utc();
	let issued = service.make_token_at(7, "dave", now).await.expect("Issuing should succeed.");
	let request = RequestParts::new().with_header("token", issued.token.expose());
	let refreshed = service
		.refresh_token_at(&request, now + Duration::minutes(45))
		.await
		.expect("Expired token inside the refresh window should refresh.");

	assert_eq!(driver.issued_count(), 2);
	assert_eq!(driver.issued(&refreshed.claims.jti), Some(refreshed.claims.clone()));

	service.invalidate(&refreshed.claims).await.expect("Invalidation should succeed.");

	let original = service.parse_token_at(&request, now + Duration::minutes(1)).await;

	assert!(original.is_ok(), "Revoking the refreshed token must not revoke its predecessor.");
}

#[tokio::test]
async fn driver_failure_blocks_the_revocation_record() {
	let revocations = MemoryRevocationStore::default();
	let service = TokenService::builder(token_config())
		.driver(Arc::new(RefusingDriver::default()))
		.revocations(Arc::new(revocations.clone()))
		.build()
		.expect("Token service should build.");
	let issued = service.make_token(1, "erin").await.expect("Issuing should succeed.");
	let err = service
		.invalidate(&issued.claims)
		.await
		.expect_err("Unacknowledged invalidation must fail.");

	assert!(matches!(err, Error::Driver(DriverError::Backend { .. })));
	assert!(err.is_fail_closed());
	assert!(revocations.is_empty());

	let request = RequestParts::new().with_bearer(issued.token.expose());

	assert!(service.parse_token(&request).await.is_ok());
}

#[tokio::test]
async fn expired_tokens_need_no_revocation_record() {
	let driver = MemoryDriver::default();
	let revocations = MemoryRevocationStore::default();
	let service = node(&driver, &revocations);
	let issued_at = OffsetDateTime::now_utc() - Duration::hours(2);
	let issued = service.make_token_at(3, "frank", issued_at).await.expect("Issuing should succeed.");

	service.invalidate(&issued.claims).await.expect("Invalidation should succeed.");

	assert!(driver.is_invalidated(&issued.claims.jti));
	assert!(revocations.is_empty());
	assert!(
		!revocations
			.is_revoked(&format!("shop:invalid-token:{}", issued.claims.jti), OffsetDateTime::now_utc())
			.await
			.expect("Lookup should succeed.")
	);
}

#[tokio::test]
async fn missing_tokens_are_reported() {
	let service = node(&MemoryDriver::default(), &MemoryRevocationStore::default());
	let request = RequestParts::new().with_header("Authorization", "Basic dXNlcjpwYXNz");

	assert!(matches!(service.parse_token(&request).await, Err(Error::TokenMissing)));
	assert!(matches!(service.refresh_token(&request).await, Err(Error::TokenMissing)));
}

#[tokio::test]
async fn driver_failures_abort_issuance_and_refresh() {
	let driver = Arc::new(EnvelopeDriver::default());
	let service = enveloped(&driver);

	driver.fail_ids.store(true, Ordering::SeqCst);

	assert!(matches!(service.make_token(1, "gina").await, Err(Error::Driver(_))));

	driver.fail_ids.store(false, Ordering::SeqCst);
	driver.fail_persist.store(true, Ordering::SeqCst);

	assert!(matches!(service.make_token(1, "gina").await, Err(Error::Driver(_))));
	assert_eq!(driver.inner.issued_count(), 0);

	driver.fail_persist.store(false, Ordering::SeqCst);

	let issued = service.make_token(1, "gina").await.expect("Issuing should succeed.");
	let request = wrapped(issued.token.expose());

	driver.fail_ids.store(true, Ordering::SeqCst);

	assert!(matches!(service.refresh_token(&request).await, Err(Error::Driver(_))));

	driver.fail_ids.store(false, Ordering::SeqCst);
	driver.fail_persist.store(true, Ordering::SeqCst);

	let err = service.refresh_token(&request).await.expect_err("Unpersisted refresh must fail.");

	assert!(matches!(err, Error::Driver(DriverError::Backend { .. })));
	assert!(err.is_fail_closed());
	assert_eq!(driver.inner.issued_count(), 1);
}

#[tokio::test]
async fn preprocessed_tokens_are_what_gets_parsed() {
	let driver = Arc::new(EnvelopeDriver::default());
	let service = enveloped(&driver);
	let issued = service.make_token(8, "hana").await.expect("Issuing should succeed.");
	let parsed = service
		.parse_token(&wrapped(issued.token.expose()))
		.await
		.expect("Unwrapped token should parse.");

	assert_eq!(parsed, issued.claims);

	let bare = RequestParts::new().with_bearer(issued.token.expose());

	assert!(matches!(
		service.parse_token(&bare).await,
		Err(Error::Driver(DriverError::Rejected { .. }))
	));
	assert!(matches!(
		service.refresh_token(&bare).await,
		Err(Error::Driver(DriverError::Rejected { .. }))
	));
}
