//! REST API client module for the external identity service.
//!
//! This module provides the `ApiClient` for the sign-in, sign-up,
//! token-refresh and profile endpoints.
//!
//! Profile requests use bearer token authentication; refresh requests carry
//! the refresh token in a dedicated header.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
