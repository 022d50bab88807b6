//! Framework-agnostic view of an inbound request, used to locate session tokens.

// crates.io
use url::Url;
// self
use crate::_prelude::*;

/// Read access to the parts of an inbound request that may carry a token.
///
/// Edge layers implement this for their own request type; [`RequestParts`] is a plain owned
/// implementation for adapters and tests.
pub trait TokenSource
where
	Self: Send + Sync,
{
	/// Returns the first value of the named query parameter.
	fn query_param(&self, name: &str) -> Option<&str>;

	/// Returns the named header value. Lookups are case-insensitive.
	fn header(&self, name: &str) -> Option<&str>;
}

/// Owned query parameters and headers of a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestParts {
	query: HashMap<String, String>,
	headers: HashMap<String, String>,
}
impl RequestParts {
	/// Creates an empty request view.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a view from the query string of a URL; the first occurrence of a key wins.
	pub fn from_url(url: &Url) -> Self {
		let mut parts = Self::new();

		for (name, value) in url.query_pairs() {
			parts.query.entry(name.into_owned()).or_insert_with(|| value.into_owned());
		}

		parts
	}

	/// Adds (or replaces) a query parameter.
	pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.insert(name.into(), value.into());

		self
	}

	/// Adds (or replaces) a header.
	pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Convenience helper that sets `Authorization: Bearer <token>`.
	pub fn with_bearer(self, token: impl AsRef<str>) -> Self {
		let value = format!("Bearer {}", token.as_ref());

		self.with_header("Authorization", value)
	}
}
impl TokenSource for RequestParts {
	fn query_param(&self, name: &str) -> Option<&str> {
		self.query.get(name).map(String::as_str)
	}

	fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}
}
