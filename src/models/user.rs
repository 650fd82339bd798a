use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account row as stored, including the password hash.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of an account; what the API returns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Data needed to create an account; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            email: record.email,
            created_at: record.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_user_drops_password_hash() {
        let record = UserRecord {
            id: 4,
            username: "budi".into(),
            email: "budi@example.com".into(),
            password_hash: "$2b$12$abc".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(User::from(record)).unwrap();

        assert_eq!(json["id"], 4);
        assert_eq!(json["email"], "budi@example.com");
        assert!(json.get("password_hash").is_none());
    }
}
