//! User model and related types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// User roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stored user, including the password hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i32,
    pub display_name: String,
    /// Login identifier, matched exactly
    pub email: String,
    pub role: Role,
    /// Argon2 PHC string
    pub password_hash: String,
}

impl UserRecord {
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

/// User record before an id has been assigned
#[derive(Debug, Clone)]
pub struct NewUser {
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}

/// Public user representation (never carries the hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i32,
    pub display_name: String,
    pub email: String,
    pub role: Role,
}

impl From<&UserRecord> for User {
    fn from(record: &UserRecord) -> Self {
        User {
            id: record.id,
            display_name: record.display_name.clone(),
            email: record.email.clone(),
            role: record.role,
        }
    }
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User::from(&record)
    }
}

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 1, message = "Display name is required"))]
    pub display_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

/// Passwords need 8+ characters, an uppercase letter and a digit
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let error = |message: &'static str| {
        let mut error = ValidationError::new("password_strength");
        error.message = Some(message.into());
        error
    };

    if password.chars().count() < 8 {
        return Err(error("Password must be at least 8 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(error("Password must contain an uppercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(error("Password must contain a digit"));
    }
    Ok(())
}
