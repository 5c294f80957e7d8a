use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Staff,
    User,
}

impl UserRole {
    pub fn from_staff_flag(is_staff: bool) -> Self {
        if is_staff {
            UserRole::Staff
        } else {
            UserRole::User
        }
    }

    pub fn is_staff(self) -> bool {
        self == UserRole::Staff
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Staff => write!(f, "staff"),
            UserRole::User => write!(f, "user"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub is_staff: bool,
    pub created_at: String,
}

impl User {
    pub fn role(&self) -> UserRole {
        UserRole::from_staff_flag(self.is_staff)
    }
}

/// Canonical form emails are stored and looked up in.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

impl Actor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A catalog row without its relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub duration: u32,
    /// Path of the poster relative to the media root.
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_staff_flag() {
        assert_eq!(UserRole::from_staff_flag(true), UserRole::Staff);
        assert_eq!(UserRole::from_staff_flag(false), UserRole::User);
        assert!(UserRole::Staff.is_staff());
        assert!(!UserRole::User.is_staff());
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&UserRole::Staff).unwrap(), "\"staff\"");
        assert_eq!(UserRole::User.to_string(), "user");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Admin@Cinema.LOCAL "), "admin@cinema.local");
    }

    #[test]
    fn test_actor_full_name() {
        let actor = Actor {
            id: 1,
            first_name: "Ricardo".to_string(),
            last_name: "Alonso".to_string(),
        };
        assert_eq!(actor.full_name(), "Ricardo Alonso");
    }
}
