use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct User {
    pub id: i64,                       // assigned by the database
    pub username: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password: String,              // Argon2 PHC string, never exposed in JSON
    pub middle_name: Option<String>,
    pub surname: Option<String>,
    pub bio: Option<String>,
    pub active: bool,                  // false means soft-deleted
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
