//! Authentication module for logins and the session token lifecycle.
//!
//! This module provides:
//! - `CredentialExchange`: trades a username/password pair for a sign-in payload
//! - `SessionManager`: token and session hooks (reuse, refresh, invalidate, hydrate)
//! - `SessionStore`: the session token sealed on disk
//! - `CredentialStore`: remembered passwords via the OS keyring
//!
//! Access tokens are refreshed 2 seconds before the server-reported expiry.

pub mod credentials;
pub mod error;
pub mod exchange;
pub mod refresh;
pub mod session;
pub mod store;

pub use credentials::{CredentialStore, Credentials};
pub use error::AuthError;
pub use exchange::CredentialExchange;
pub use refresh::RefreshGuard;
pub use session::{SessionManager, SessionToken, SessionView, TokenBundle, TokenError};
pub use store::SessionStore;
