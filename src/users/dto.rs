use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use validator::{Validate, ValidationError};

use crate::users::repo_types::User;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// Request body for user creation.
///
/// Required strings default to empty when missing or null, so that they are
/// reported by validation instead of failing JSON decoding.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(
        custom(function = "not_blank"),
        length(min = 3, max = 50, message = "must be between 3 and 50 characters")
    )]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(custom(function = "email_shape"))]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            name: user.name,
            middle_name: user.middle_name,
            surname: user.surname,
            bio: user.bio,
            active: user.active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("is required".into());
        return Err(err);
    }
    Ok(())
}

fn email_shape(value: &str) -> Result<(), ValidationError> {
    not_blank(value)?;
    if !is_valid_email(value) {
        let mut err = ValidationError::new("email");
        err.message = Some("must be a valid email address".into());
        return Err(err);
    }
    Ok(())
}
