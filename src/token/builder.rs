//! Validated construction of token services.

// self
use crate::{
	_prelude::*,
	config::TokenConfig,
	driver::{StatelessDriver, TokenDriver},
	error::ConfigError,
	store::{MemoryRevocationStore, RevocationStore},
	token::TokenService,
};

/// Builder for [`TokenService`] values.
pub struct TokenServiceBuilder {
	/// Token settings.
	pub config: TokenConfig,
	/// Session driver; defaults to [`StatelessDriver`].
	pub driver: Option<Arc<dyn TokenDriver>>,
	/// Revocation store; defaults to a fresh [`MemoryRevocationStore`].
	pub revocations: Option<Arc<dyn RevocationStore>>,
}
impl TokenServiceBuilder {
	/// Creates a builder seeded with the provided settings.
	pub fn new(config: TokenConfig) -> Self {
		Self { config, driver: None, revocations: None }
	}

	/// Binds the session driver.
	pub fn driver(mut self, driver: Arc<dyn TokenDriver>) -> Self {
		self.driver = Some(driver);

		self
	}

	/// Binds the shared revocation store.
	pub fn revocations(mut self, revocations: Arc<dyn RevocationStore>) -> Self {
		self.revocations = Some(revocations);

		self
	}

	/// Validates the settings and builds a service whose revocation cache is not yet warmed.
	pub fn build(self) -> Result<TokenService, ConfigError> {
		if self.config.sign_key.is_empty() {
			return Err(ConfigError::EmptySigningKey);
		}
		if !self.config.lifetime()?.is_positive() || !self.config.max_refresh()?.is_positive() {
			return Err(ConfigError::NonPositiveLifetime);
		}

		self.config.expiry_from(OffsetDateTime::now_utc())?;

		let driver = self.driver.unwrap_or_else(|| Arc::new(StatelessDriver));
		let revocations =
			self.revocations.unwrap_or_else(|| Arc::new(MemoryRevocationStore::default()));

		Ok(TokenService::from_parts(self.config, driver, revocations))
	}

	/// Builds the service and replays the driver's invalidated tokens into the revocation
	/// store before returning it.
	pub async fn build_warmed(self) -> Result<TokenService> {
		let service = self.build()?;

		service.init_revocation_cache().await?;

		Ok(service)
	}
}
impl Debug for TokenServiceBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenServiceBuilder")
			.field("config", &self.config)
			.field("driver", &self.driver.as_ref().map(|_| ".."))
			.field("revocations", &self.revocations.as_ref().map(|_| ".."))
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn empty_key_and_lifetime_are_rejected() {
		assert!(matches!(
			TokenServiceBuilder::new(TokenConfig::new("", "app")).build(),
			Err(ConfigError::EmptySigningKey)
		));
		assert!(matches!(
			TokenServiceBuilder::new(TokenConfig::new("key", "app").with_expire_time(0)).build(),
			Err(ConfigError::NonPositiveLifetime)
		));
		assert!(TokenServiceBuilder::new(TokenConfig::new("key", "app")).build().is_ok());
	}

	#[test]
	fn unrepresentable_lifetimes_are_rejected() {
		assert!(matches!(
			TokenServiceBuilder::new(TokenConfig::new("key", "app").with_expire_time(10_000_000_000))
				.build(),
			Err(ConfigError::DurationOutOfRange { field: "expire_time", .. })
		));
		assert!(matches!(
			TokenServiceBuilder::new(TokenConfig::new("key", "app").with_max_refresh_time(i64::MAX))
				.build(),
			Err(ConfigError::DurationOutOfRange { field: "max_refresh_time", .. })
		));
	}
}
