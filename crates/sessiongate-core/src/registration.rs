//! Account registration: form validation and submission to the sign-up
//! endpoint.

use std::fmt;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};

pub const PASSWORD_MIN_CHARS: usize = 6;
pub const PASSWORD_MAX_CHARS: usize = 32;

pub const PRIVACY_POLICY_MESSAGE: &str = "You must agree to the privacy policy";
pub const REGISTERED_MESSAGE: &str = "User registered successfully.";
const REGISTRATION_FAILED_MESSAGE: &str = "User Registration Failed";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
    pub privacy_policy: bool,
}

fn serialize_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("Invalid registration form: {}", join_errors(.0))]
    Invalid(Vec<FieldError>),

    /// The server refused the registration; the detail belongs to `field`.
    #[error("{field}: {detail}")]
    Rejected { field: &'static str, detail: String },

    #[error("Sign-up request failed: {0}")]
    Transport(#[source] ApiError),
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

impl RegistrationForm {
    /// Build a form from user input, trimming surrounding whitespace from the
    /// names and email. The password is kept as typed.
    pub fn new(
        first_name: &str,
        last_name: &str,
        email: &str,
        password: SecretString,
        privacy_policy: bool,
    ) -> Self {
        Self {
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            email: email.trim().to_string(),
            password,
            privacy_policy,
        }
    }

    /// Check every field, collecting all failures. The email is checked
    /// exactly as it will be sent.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.first_name.trim().is_empty() {
            errors.push(FieldError::new("firstName", "firstName is a required field"));
        }
        if self.last_name.trim().is_empty() {
            errors.push(FieldError::new("lastName", "lastName is a required field"));
        }

        if self.email.trim().is_empty() {
            errors.push(FieldError::new("email", "email is a required field"));
        } else if !valid_email(&self.email) {
            errors.push(FieldError::new("email", "email must be a valid email"));
        }

        let password_chars = self.password.expose_secret().chars().count();
        if password_chars == 0 {
            errors.push(FieldError::new("password", "password is a required field"));
        } else if password_chars < PASSWORD_MIN_CHARS {
            errors.push(FieldError::new(
                "password",
                format!("password must be at least {} characters", PASSWORD_MIN_CHARS),
            ));
        } else if password_chars > PASSWORD_MAX_CHARS {
            errors.push(FieldError::new(
                "password",
                format!("password must be at most {} characters", PASSWORD_MAX_CHARS),
            ));
        }

        if !self.privacy_policy {
            errors.push(FieldError::new("privacyPolicy", PRIVACY_POLICY_MESSAGE));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Clone)]
pub struct Registrar {
    api: ApiClient,
}

impl Registrar {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Validate the form and submit it. Returns the confirmation message.
    pub async fn register(&self, form: &RegistrationForm) -> Result<&'static str, RegistrationError> {
        form.validate().map_err(RegistrationError::Invalid)?;

        match self.api.sign_up(form).await {
            Ok(()) => {
                info!(email = %form.email, "User registered");
                Ok(REGISTERED_MESSAGE)
            }
            Err(ApiError::NetworkError(e)) => {
                warn!(error = %e, "Sign-up request failed");
                Err(RegistrationError::Transport(ApiError::NetworkError(e)))
            }
            Err(e) => {
                let detail = e
                    .response_body()
                    .and_then(error_detail)
                    .unwrap_or_else(|| REGISTRATION_FAILED_MESSAGE.to_string());
                info!(email = %form.email, detail = %detail, "Registration rejected");
                Err(RegistrationError::Rejected { field: "email", detail })
            }
        }
    }
}

/// Pull a string `detail` out of a JSON error body.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("detail")?.as_str().map(str::to_string)
}
