//! Shape validation of the reserved signed-request fields.

// self
use crate::{_prelude::*, signature::canonical};

/// Field-name keyed validation messages.
pub type FieldErrors = BTreeMap<&'static str, Vec<String>>;

/// The reserved fields every signed request carries, rendered as strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignedRequest {
	/// Calling application key.
	pub app_key: String,
	/// Per-request nonce.
	pub random_str: String,
	/// Unix seconds when the request was signed.
	pub timestamp: String,
	/// Hex digest supplied by the caller.
	pub sign: String,
}
impl SignedRequest {
	/// Reads the reserved fields out of a parameter map; missing fields become empty.
	pub fn from_params(params: &JsonMap<String, JsonValue>) -> Self {
		let field = |name: &str| params.get(name).map(canonical::render_scalar).unwrap_or_default();

		Self {
			app_key: field("app_key"),
			random_str: field("random_str"),
			timestamp: field("timestamp"),
			sign: field("sign"),
		}
	}

	/// Checks field shapes, returning messages for every field that fails.
	pub fn validate(&self) -> FieldErrors {
		let mut errors = FieldErrors::new();

		check(&mut errors, "app_key", &self.app_key, |v| v.chars().count() >= 2, || {
			"app_key must be at least 2 characters.".into()
		});
		check(&mut errors, "random_str", &self.random_str, |v| v.chars().count() == 10, || {
			"random_str must be exactly 10 characters.".into()
		});
		check(
			&mut errors,
			"timestamp",
			&self.timestamp,
			|v| v.len() == 10 && v.bytes().all(|b| b.is_ascii_digit()),
			|| "timestamp must be a 10-digit integer.".into(),
		);
		check(&mut errors, "sign", &self.sign, |v| v.chars().count() == 32, || {
			"sign must be exactly 32 characters.".into()
		});

		errors
	}
}

fn check(
	errors: &mut FieldErrors,
	field: &'static str,
	value: &str,
	rule: impl FnOnce(&str) -> bool,
	message: impl FnOnce() -> String,
) {
	if value.is_empty() {
		errors.entry(field).or_default().push(format!("{field} is required."));
	} else if !rule(value) {
		errors.entry(field).or_default().push(message());
	}
}
