use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::models::{UserPayload, UserProfile};

use super::refresh::RefreshGuard;
use super::AuthError;

/// Subtracted from the server-reported lifetime so the token is refreshed
/// before the server expires it.
pub const EXPIRY_SAFETY_MARGIN_MS: i64 = 2000;

/// Reason a session token can no longer be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenError {
    RefreshTokenTokenError,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::RefreshTokenTokenError => write!(f, "RefreshTokenTokenError"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TokenError>,
}

impl TokenBundle {
    /// Build a bundle for a token pair issued at `now` with a lifetime of
    /// `expires_in` seconds.
    pub fn issue(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let lifetime_ms = expires_in
            .saturating_mul(1000)
            .saturating_sub(EXPIRY_SAFETY_MARGIN_MS);
        let expires_at = Duration::try_milliseconds(lifetime_ms)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(if lifetime_ms > 0 { DateTime::<Utc>::MAX_UTC } else { now });

        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
            error: None,
        }
    }

    pub fn from_payload(payload: &UserPayload, now: DateTime<Utc>) -> Self {
        Self::issue(&payload.access_token, &payload.refresh_token, payload.expires_in, now)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_minutes().max(0)
    }
}

/// The token state stored for a session.
///
/// `Invalid` serializes to exactly `{"error": "RefreshTokenTokenError"}`;
/// the previous tokens are gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionToken {
    Active(TokenBundle),
    Invalid { error: TokenError },
}

impl SessionToken {
    pub fn refresh_failed() -> Self {
        SessionToken::Invalid {
            error: TokenError::RefreshTokenTokenError,
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        match self {
            SessionToken::Active(bundle) => Some(&bundle.access_token),
            SessionToken::Invalid { .. } => None,
        }
    }

    pub fn error(&self) -> Option<TokenError> {
        match self {
            SessionToken::Active(bundle) => bundle.error,
            SessionToken::Invalid { error } => Some(*error),
        }
    }
}

/// What request handlers get to see of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub access_token: Option<String>,
    pub user: Option<UserProfile>,
    pub error: Option<TokenError>,
}

/// Drives the session token through issue, reuse, refresh and
/// invalidation, and hydrates the view handed to request handlers.
#[derive(Clone)]
pub struct SessionManager {
    api: ApiClient,
    refreshes: Arc<RefreshGuard>,
}

impl SessionManager {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            refreshes: Arc::new(RefreshGuard::default()),
        }
    }

    /// Decide the token for this access.
    ///
    /// A sign-in payload replaces whatever was stored. The resulting token
    /// is reused while unexpired and refreshed otherwise; a failed refresh
    /// yields an invalid token. Returns `None` for an anonymous session.
    pub async fn token_hook(
        &self,
        current: Option<SessionToken>,
        user: Option<&UserPayload>,
    ) -> Option<SessionToken> {
        let token = match user {
            Some(payload) => {
                debug!("Seeding session token from sign-in payload");
                SessionToken::Active(TokenBundle::from_payload(payload, Utc::now()))
            }
            None => current?,
        };

        let bundle = match token {
            SessionToken::Active(bundle) if !bundle.is_expired() => {
                return Some(SessionToken::Active(bundle));
            }
            SessionToken::Active(bundle) => bundle,
            invalid @ SessionToken::Invalid { .. } => return Some(invalid),
        };

        info!(expired_at = %bundle.expires_at, "Access token expired, refreshing");
        match self.refresh(&bundle).await {
            Ok(refreshed) => Some(SessionToken::Active(refreshed)),
            Err(e) => {
                warn!(error = %e, "Token refresh failed, invalidating session");
                Some(SessionToken::refresh_failed())
            }
        }
    }

    /// Trade the bundle's refresh token for a new bundle. Never retries and
    /// never falls back to the old tokens.
    pub async fn refresh(&self, bundle: &TokenBundle) -> Result<TokenBundle, AuthError> {
        let api = self.api.clone();
        let refresh_token = bundle.refresh_token.clone();

        self.refreshes
            .run(&bundle.refresh_token, || async move {
                match api.refresh_token(&refresh_token).await {
                    Ok(response) => Ok(TokenBundle::issue(
                        response.access_token,
                        response.refresh_token,
                        response.expires_in,
                        Utc::now(),
                    )),
                    Err(e) => Err(Arc::new(e)),
                }
            })
            .await
            .map_err(AuthError::RefreshFailed)
    }

    /// Project the token onto the view and hydrate the user profile.
    ///
    /// A failed profile fetch leaves `view.user` as it was. Without an
    /// access token no request is made.
    pub async fn session_hook(&self, mut view: SessionView, token: Option<&SessionToken>) -> SessionView {
        view.access_token = token.and_then(SessionToken::access_token).map(str::to_string);
        view.error = token.and_then(SessionToken::error);

        let Some(access_token) = view.access_token.as_deref() else {
            return view;
        };

        match self.hydrate_profile(access_token).await {
            Ok(profile) => view.user = Some(profile),
            Err(e) => warn!(error = %e, "Keeping previous user after profile fetch failure"),
        }
        view
    }

    pub async fn hydrate_profile(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        self.api
            .fetch_profile(access_token)
            .await
            .map(UserProfile::with_display_name)
            .map_err(AuthError::ProfileFetchFailed)
    }
}
