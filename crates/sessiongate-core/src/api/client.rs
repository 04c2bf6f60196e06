//! API client for communicating with the external identity API.
//!
//! This module provides the `ApiClient` struct for the sign-in, sign-up,
//! token-refresh and profile endpoints. It only speaks HTTP; deciding what
//! a response means for the session is left to the `auth` module.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::{Config, Endpoints};
use crate::models::{RefreshResponse, UserProfile};

use super::ApiError;

/// Header carrying the refresh token on token-refresh requests
pub const REFRESH_TOKEN_HEADER: &str = "refresh-token";

/// API client for the identity service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    endpoints: Endpoints,
}

impl ApiClient {
    /// Create a new API client from the resolved configuration
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url()?,
            endpoints: config.endpoints.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Exchange a username/password pair for the raw sign-in payload.
    ///
    /// The body is returned as untyped JSON so callers can judge whether it
    /// counts as a successful login.
    pub async fn sign_in(&self, username: &str, password: &SecretString) -> Result<Value, ApiError> {
        let url = self.url(&self.endpoints.sign_in);
        debug!(url = %url, username = username, "Sending sign-in request");

        let body = serde_json::json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::read_json(response).await
    }

    /// Trade a refresh token for a new token pair.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
        let url = self.url(&self.endpoints.refresh);
        debug!(url = %url, "Sending token refresh request");

        let response = self
            .client
            .post(&url)
            .header(REFRESH_TOKEN_HEADER, refresh_token)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::read_json(response).await
    }

    /// Fetch the profile of the user owning `access_token`.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, ApiError> {
        let url = self.url(&self.endpoints.profile);
        debug!(url = %url, "Fetching user profile");

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::read_json(response).await
    }

    /// Submit a registration form.
    pub async fn sign_up<B: Serialize>(&self, form: &B) -> Result<(), ApiError> {
        let url = self.url(&self.endpoints.sign_up);
        debug!(url = %url, "Sending sign-up request");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(form)
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Read the body and parse it as JSON, keeping parse failures apart
    /// from transport failures.
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}
