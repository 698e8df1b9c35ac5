use serde::{Deserialize, Serialize};

/// The signed-in user as returned by login and registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl UserSummary {
    /// Full name when known, otherwise the username.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Body of `POST /auth/login/`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Body of `POST /auth/register/`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub first_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub last_name: String,
}

/// Token pair plus user, returned by login and registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: String,
    pub user: UserSummary,
}

/// Response of `POST /auth/token/refresh/`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access: String,
    /// Present when the backend rotates refresh tokens.
    #[serde(default)]
    pub refresh: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> UserSummary {
        UserSummary {
            id: 1,
            username: "mira".to_string(),
            email: String::new(),
            first_name: first.to_string(),
            last_name: last.to_string(),
        }
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        assert_eq!(user("Mira", "Okafor").display_name(), "Mira Okafor");
        assert_eq!(user("Mira", "").display_name(), "Mira");
        assert_eq!(user("", "").display_name(), "mira");
    }

    #[test]
    fn test_registration_omits_empty_optional_fields() {
        let body = Registration {
            username: "mira".to_string(),
            password: "hunter22".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"username": "mira", "password": "hunter22"}));
    }

    #[test]
    fn test_auth_tokens_parse() {
        let json = r#"{"user": {"id": 4, "username": "mira", "email": "m@example.com", "first_name": "", "last_name": ""}, "refresh": "r1", "access": "a1"}"#;
        let tokens: AuthTokens = serde_json::from_str(json).unwrap();
        assert_eq!(tokens.access, "a1");
        assert_eq!(tokens.refresh, "r1");
        assert_eq!(tokens.user.id, 4);
    }
}
