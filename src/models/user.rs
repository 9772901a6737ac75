use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The identity of an authenticated actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
}

/// A stored username/password-hash pair. The plaintext password never reaches this type.
#[derive(Debug, Clone, FromRow)]
pub struct CredentialRecord {
    pub id: Uuid,
    /// Unique and case-sensitive.
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl CredentialRecord {
    pub fn new(username: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            password_hash,
            created_at: Utc::now(),
        }
    }

    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_from_record() {
        let record = CredentialRecord::new("alice".to_string(), "$2b$04$hash".to_string());
        let principal = record.principal();
        assert_eq!(principal.id, record.id);
        assert_eq!(principal.username, "alice");
    }

    #[test]
    fn test_principal_json_has_no_hash() {
        let record = CredentialRecord::new("alice".to_string(), "secret-hash".to_string());
        let json = serde_json::to_string(&record.principal()).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
