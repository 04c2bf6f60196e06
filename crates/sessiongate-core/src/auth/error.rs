use std::sync::Arc;

use thiserror::Error;

use crate::api::ApiError;

/// Failure kinds of the login and session lifecycle. None of them is fatal
/// to the process; each is scoped to one login attempt or session read.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The identity service refused the credentials. No session is created.
    #[error("Credentials rejected by the identity service")]
    CredentialRejected,

    /// The exchange never produced a usable answer.
    #[error("Identity service unreachable or misbehaving: {0}")]
    Transport(#[source] ApiError),

    /// The refresh token could not be traded for a new token pair. The cause
    /// is shared with every caller that waited on the same refresh.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(#[source] Arc<ApiError>),

    /// The profile endpoint did not return a usable profile.
    #[error("Profile fetch failed: {0}")]
    ProfileFetchFailed(#[source] ApiError),
}
