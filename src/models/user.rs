//! User-related models

use serde::{Deserialize, Serialize};

/// Account role. Gates which admin screens the client offers; the server
/// enforces the real authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// User profile
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub image: Option<String>,
}

impl User {
    /// Display name, e.g. "Juan dela Cruz".
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Two-letter initials for avatar placeholders.
    pub fn initials(&self) -> String {
        let mut s = String::new();
        if let Some(c) = self.first_name.chars().next() {
            s.extend(c.to_uppercase());
        }
        if let Some(c) = self.last_name.chars().next() {
            s.extend(c.to_uppercase());
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_deserializes_lowercase() {
        let u: User =
            serde_json::from_str(r#"{"id":1,"first_name":"A","last_name":"B","role":"admin"}"#)
                .unwrap();
        assert_eq!(u.role, Role::Admin);
    }

    #[test]
    fn role_defaults_to_user_when_missing() {
        let u: User = serde_json::from_str(r#"{"id":2,"first_name":"A","last_name":"B"}"#).unwrap();
        assert_eq!(u.role, Role::User);
    }

    #[test]
    fn initials_are_uppercased() {
        let u = User {
            id: 1,
            first_name: "juan".into(),
            last_name: "cruz".into(),
            ..Default::default()
        };
        assert_eq!(u.initials(), "JC");
        assert_eq!(u.full_name(), "juan cruz");
    }
}
