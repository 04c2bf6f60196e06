//! Wire models for the external identity API.
//!
//! - `UserPayload`: sign-in response carrying the initial token pair
//! - `RefreshResponse`: token-refresh response
//! - `UserProfile`: profile used to hydrate the session view

pub mod payload;
pub mod profile;

pub use payload::{RefreshResponse, UserPayload};
pub use profile::UserProfile;
