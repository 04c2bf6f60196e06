use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Sign-in response body: the token fields plus whatever else the server
/// returned about the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPayload {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(deserialize_with = "deserialize_expires_in")]
    pub expires_in: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Token-refresh response body. The refresh endpoint names its refresh
/// token field in camelCase, unlike sign-in.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(rename = "refreshToken", alias = "refresh_token")]
    pub refresh_token: String,
    #[serde(deserialize_with = "deserialize_expires_in")]
    pub expires_in: i64,
}

/// Accept `expires_in` as an integer, a float, or a numeric string.
/// Fractional parts are dropped.
fn deserialize_expires_in<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(secs) => Ok(secs),
        Raw::Float(secs) if secs.is_finite() => Ok(secs.trunc() as i64),
        Raw::Float(secs) => Err(de::Error::custom(format!("invalid expires_in: {secs}"))),
        Raw::Text(text) => parse_seconds(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid expires_in: {text:?}"))),
    }
}

fn parse_seconds(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|secs| secs.is_finite())
            .map(|secs| secs.trunc() as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_payload_keeps_extra_fields() {
        let payload: UserPayload = serde_json::from_value(json!({
            "access_token": "A1",
            "refresh_token": "R1",
            "expires_in": 3600,
            "email": "jane@example.com"
        }))
        .unwrap();
        assert_eq!(payload.expires_in, 3600);
        assert_eq!(payload.extra.get("email"), Some(&json!("jane@example.com")));
    }

    #[test]
    fn test_expires_in_accepts_strings_and_floats() {
        let payload: UserPayload = serde_json::from_value(json!({
            "access_token": "A1", "refresh_token": "R1", "expires_in": " 900 "
        }))
        .unwrap();
        assert_eq!(payload.expires_in, 900);

        let payload: UserPayload = serde_json::from_value(json!({
            "access_token": "A1", "refresh_token": "R1", "expires_in": 59.9
        }))
        .unwrap();
        assert_eq!(payload.expires_in, 59);
    }

    #[test]
    fn test_expires_in_rejects_garbage() {
        let result = serde_json::from_value::<UserPayload>(json!({
            "access_token": "A1", "refresh_token": "R1", "expires_in": "soon"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_refresh_response_accepts_both_spellings() {
        let camel: RefreshResponse = serde_json::from_value(json!({
            "access_token": "A2", "refreshToken": "R2", "expires_in": "3600"
        }))
        .unwrap();
        let snake: RefreshResponse = serde_json::from_value(json!({
            "access_token": "A2", "refresh_token": "R2", "expires_in": 3600
        }))
        .unwrap();
        assert_eq!(camel, snake);
    }
}
