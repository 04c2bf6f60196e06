use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User profile as returned by the profile endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "firstName", default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }

    /// Replace `name` with the first/last name concatenation.
    pub fn with_display_name(mut self) -> Self {
        self.name = Some(self.full_name());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_name_overrides_server_name() {
        let profile: UserProfile = serde_json::from_value(json!({
            "firstName": "Jane",
            "lastName": "Doe",
            "name": "jdoe",
            "email": "jane@example.com"
        }))
        .unwrap();
        let profile = profile.with_display_name();
        assert_eq!(profile.name.as_deref(), Some("Jane Doe"));
        assert_eq!(profile.extra.get("email"), Some(&json!("jane@example.com")));
    }

    #[test]
    fn test_full_name_with_missing_parts() {
        let profile = UserProfile {
            last_name: Some("Doe".to_string()),
            ..Default::default()
        };
        assert_eq!(profile.full_name(), "Doe");
        assert_eq!(UserProfile::default().full_name(), "");
    }

    #[test]
    fn test_serializes_camel_case() {
        let profile = UserProfile {
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            ..Default::default()
        }
        .with_display_name();
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value, json!({"firstName": "Jane", "lastName": "Doe", "name": "Jane Doe"}));
    }
}
