//! Core library for sessiongate.
//!
//! Credentials-based login against an external identity API, access/refresh
//! token rotation for the resulting session, profile hydration of the
//! session view, and account registration.
//!
//! Everything is built from one [`Config`] resolved at startup:
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use sessiongate_core::{ApiClient, Config, CredentialExchange, Credentials, SessionManager, SessionView};
//!
//! let config = Config::load()?;
//! let api = ApiClient::new(&config)?;
//! let exchange = CredentialExchange::new(api.clone());
//! let sessions = SessionManager::new(api);
//!
//! let payload = exchange.authorize(&Credentials::new("jsmith", "hunter22")).await?;
//! let token = sessions.token_hook(None, Some(&payload)).await;
//! let view = sessions.session_hook(SessionView::default(), token.as_ref()).await;
//! # let _ = view;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod registration;

pub use api::{ApiClient, ApiError};
pub use auth::{
    AuthError, CredentialExchange, CredentialStore, Credentials, SessionManager, SessionStore,
    SessionToken, SessionView, TokenBundle, TokenError,
};
pub use config::Config;
pub use models::{UserPayload, UserProfile};
pub use registration::{FieldError, Registrar, RegistrationError, RegistrationForm};
