//! Credential exchange: trade a username/password pair for the sign-in
//! payload that seeds a new session.

use serde_json::Value;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::UserPayload;

use super::{AuthError, Credentials};

#[derive(Clone)]
pub struct CredentialExchange {
    api: ApiClient,
}

impl CredentialExchange {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Forward the credentials to the sign-in endpoint.
    ///
    /// A 2xx JSON body that is truthy counts as a login. An empty or falsy
    /// body and any 4xx answer are rejections; everything else is reported
    /// as a transport failure.
    pub async fn authorize(&self, credentials: &Credentials) -> Result<UserPayload, AuthError> {
        let body = match self.api.sign_in(&credentials.username, &credentials.password).await {
            Ok(body) => body,
            Err(e) if e.is_rejection() => {
                info!(username = %credentials.username, error = %e, "Sign-in rejected");
                return Err(AuthError::CredentialRejected);
            }
            Err(e) => {
                warn!(username = %credentials.username, error = %e, "Sign-in request failed");
                return Err(AuthError::Transport(e));
            }
        };

        if !is_truthy(&body) {
            info!(username = %credentials.username, "Sign-in returned an empty payload");
            return Err(AuthError::CredentialRejected);
        }

        let payload: UserPayload = serde_json::from_value(body).map_err(|e| {
            AuthError::Transport(ApiError::InvalidResponse(format!("sign-in payload: {}", e)))
        })?;

        info!(username = %credentials.username, "Sign-in accepted");
        Ok(payload)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn exchange_for(server: &MockServer) -> CredentialExchange {
        let api = ApiClient::new(&Config::with_base_url(server.uri())).expect("client");
        CredentialExchange::new(api)
    }

    #[test]
    fn test_is_truthy() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!({})));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!({"access_token": "A1"})));
        assert!(is_truthy(&json!(1)));
    }

    #[tokio::test]
    async fn test_valid_credentials_return_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/sign-in"))
            .and(body_json(json!({"username": "jsmith", "password": "hunter22"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "A1",
                "refresh_token": "R1",
                "expires_in": 3600,
                "id": 7
            })))
            .expect(1)
            .mount(&server)
            .await;

        let payload = exchange_for(&server)
            .authorize(&Credentials::new("jsmith", "hunter22"))
            .await
            .unwrap();
        assert_eq!(payload.access_token, "A1");
        assert_eq!(payload.refresh_token, "R1");
        assert_eq!(payload.extra.get("id"), Some(&json!(7)));
    }

    #[tokio::test]
    async fn test_unauthorized_is_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "bad password"})))
            .mount(&server)
            .await;

        let result = exchange_for(&server)
            .authorize(&Credentials::new("jsmith", "wrong"))
            .await;
        assert!(matches!(result, Err(AuthError::CredentialRejected)));
    }

    #[tokio::test]
    async fn test_null_body_is_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let result = exchange_for(&server)
            .authorize(&Credentials::new("jsmith", "wrong"))
            .await;
        assert!(matches!(result, Err(AuthError::CredentialRejected)));
    }

    #[tokio::test]
    async fn test_server_error_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = exchange_for(&server)
            .authorize(&Credentials::new("jsmith", "hunter22"))
            .await;
        assert!(matches!(result, Err(AuthError::Transport(ApiError::ServerError(_)))));
    }

    #[tokio::test]
    async fn test_missing_sign_in_route_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let result = exchange_for(&server)
            .authorize(&Credentials::new("jsmith", "hunter22"))
            .await;
        assert!(matches!(result, Err(AuthError::Transport(ApiError::NotFound(_)))));
    }

    #[tokio::test]
    async fn test_payload_without_tokens_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .mount(&server)
            .await;

        let result = exchange_for(&server)
            .authorize(&Credentials::new("jsmith", "hunter22"))
            .await;
        assert!(matches!(result, Err(AuthError::Transport(ApiError::InvalidResponse(_)))));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_failure() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let api = ApiClient::new(&Config::with_base_url(format!("http://127.0.0.1:{}", port))).unwrap();
        let exchange = CredentialExchange::new(api);

        let result = exchange.authorize(&Credentials::new("jsmith", "hunter22")).await;
        assert!(matches!(result, Err(AuthError::Transport(ApiError::NetworkError(_)))));
    }
}
