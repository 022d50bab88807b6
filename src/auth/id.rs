//! Validated identifiers for calling applications and token issuances.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const MAX_IDENTIFIER_CHARS: usize = 128;

/// Reasons an identifier is refused.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// Fewer characters than the identifier kind requires.
	#[error("{kind} needs at least {min} characters.")]
	TooShort {
		/// Identifier kind.
		kind: &'static str,
		/// Required character count.
		min: usize,
	},
	/// Whitespace anywhere in the value.
	#[error("{kind} must not contain whitespace.")]
	ContainsWhitespace {
		/// Identifier kind.
		kind: &'static str,
	},
	/// More characters than any identifier may carry.
	#[error("{kind} is longer than {max} characters.")]
	TooLong {
		/// Identifier kind.
		kind: &'static str,
		/// Allowed character count.
		max: usize,
	},
}

macro_rules! def_id {
	($name:ident, $doc:literal, $min:expr) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Validates `value` and wraps it.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				let value = value.into();

				check(stringify!($name), $min, &value)?;

				Ok(Self(value))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &str {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, IdentifierError> {
				Self::new(value)
			}
		}
		impl From<$name> for String {
			fn from(id: $name) -> Self {
				id.0
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(raw: &str) -> Result<Self, IdentifierError> {
				Self::new(raw)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, "{}({})", stringify!($name), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

def_id! { AppKey, "Key of an application that signs app-to-app requests.", 2 }
def_id! { TokenId, "Unique identifier (`jti`) of a single token issuance.", 1 }

impl TokenId {
	// URL-safe base64 digests are 43 characters without whitespace.
	pub(crate) fn from_encoded_digest(encoded: String) -> Self {
		Self(encoded)
	}
}

fn check(kind: &'static str, min: usize, value: &str) -> Result<(), IdentifierError> {
	let chars = value.chars().count();

	if chars < min {
		Err(IdentifierError::TooShort { kind, min })
	} else if chars > MAX_IDENTIFIER_CHARS {
		Err(IdentifierError::TooLong { kind, max: MAX_IDENTIFIER_CHARS })
	} else if value.chars().any(char::is_whitespace) {
		Err(IdentifierError::ContainsWhitespace { kind })
	} else {
		Ok(())
	}
}
