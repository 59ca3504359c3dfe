//! Authentication against the hosted backend
//!
//! The backend exposes a password grant and a refresh-token grant on its
//! auth endpoint. Tokens are cached in the config file.

pub mod session;
pub mod tokens;

pub use session::{login, logout, status};
pub use tokens::{StoredToken, TokenStore};
