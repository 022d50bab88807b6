//! Token lookup across the query string and headers.

// self
use crate::{_prelude::*, auth::TokenSource, config::TokenConfig};

const AUTHORIZATION: &str = "Authorization";
const BEARER: &str = "Bearer";

/// Locates the raw token carried by `request`.
///
/// The configured query parameter wins, then the bare configured header, then
/// `Authorization: Bearer <token>`. Anything else is [`Error::TokenMissing`].
pub fn extract_token(config: &TokenConfig, request: &dyn TokenSource) -> Result<String> {
	if let Some(token) = request.query_param(&config.query_param).filter(|t| !t.is_empty()) {
		return Ok(token.to_owned());
	}
	if let Some(token) = request.header(&config.header).filter(|t| !t.is_empty()) {
		return Ok(token.to_owned());
	}

	match request.header(AUTHORIZATION).and_then(|value| value.split_once(' ')) {
		Some((BEARER, token)) if !token.is_empty() => Ok(token.to_owned()),
		_ => Err(Error::TokenMissing),
	}
}
