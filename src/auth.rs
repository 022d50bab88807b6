//! Auth-domain identifiers, claims, secrets, and the request surface tokens are read from.

pub mod claims;
pub mod id;
pub mod request;
pub mod secret;

pub use claims::*;
pub use id::*;
pub use request::*;
pub use secret::*;
