//! Access control core for API services: session tokens with distributed revocation, canonical
//! request signatures, and layered admission rate limits.
//!
//! The three services share one shape: they are constructed explicitly with their collaborators
//! (driver, resolver, stores), hold no global state, and return typed errors instead of rendering
//! responses. Edge layers decide how to map [`error::Error`] onto their transport.
//!
//! - [`token::TokenService`] issues, parses, refreshes, and revokes HS256 session tokens.
//! - [`signature::SignatureEngine`] canonicalizes nested parameters and verifies app-to-app
//!   signatures with a freshness window.
//! - [`limiter::RateLimiter`] admits or denies requests against aligned fixed windows while
//!   charging each request once across layered checks.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod driver;
pub mod error;
pub mod limiter;
pub mod obs;
pub mod signature;
pub mod store;
pub mod token;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Map as JsonMap, Value as JsonValue};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};

	pub use crate::error::{Error, Result};
}

pub use serde_json;
pub use time;
#[cfg(test)] use {color_eyre as _, tokio as _};
