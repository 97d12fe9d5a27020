use chrono::{Duration, Utc};
use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::credentials;
use crate::error::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_changed_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset_token_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset_expires_at: Option<DateTime>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[default]
    User,
    Guide,
    LeadGuide,
    Admin,
}

/// The outward projection of a user; none of the credential fields leave the
/// crate through this type.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserPublic {
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserDto {
    #[validate(length(min = 1, message = "A name must be provided"))]
    pub name: String,
    #[validate(
        email(message = "Email is invalid"),
        length(min = 10, max = 40, message = "An email must be between 10 and 40 characters")
    )]
    pub email: String,
    pub photo: Option<String>,
    #[validate(length(min = 8, message = "A password must have at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords are not the same"))]
    pub password_confirm: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordDto {
    #[validate(length(min = 8, message = "A password must have at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords are not the same"))]
    pub password_confirm: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordDto {
    #[validate(length(equal = 64, message = "Invalid reset token"))]
    pub token: String,
    #[validate(length(min = 8, message = "A password must have at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords are not the same"))]
    pub password_confirm: String,
}

impl User {
    /// Replace the stored hash with one derived from `plaintext`. The
    /// confirmation was already checked at the DTO boundary and is never seen
    /// here.
    pub fn set_password(&mut self, plaintext: &str) -> Result<()> {
        self.password_hash = credentials::hash_password(plaintext)?;
        Ok(())
    }

    pub fn verify_password(&self, candidate: &str) -> bool {
        credentials::verify_password(candidate, &self.password_hash)
    }

    /// Record a password change, backdated by one second. Only called for
    /// existing documents; registration leaves the field unset.
    pub fn stamp_password_change(&mut self) {
        let changed =
            Utc::now() - Duration::seconds(credentials::PASSWORD_CHANGE_BACKDATE_SECONDS);
        self.password_changed_at = Some(DateTime::from_millis(changed.timestamp_millis()));
    }

    /// Whether the password changed after a credential issued at
    /// `issued_at_secs` (epoch seconds). Never-changed passwords answer false.
    pub fn password_changed_after(&self, issued_at_secs: i64) -> bool {
        match self.password_changed_at {
            Some(changed) => changed.timestamp_millis() / 1000 > issued_at_secs,
            None => false,
        }
    }

    /// Start a reset: stores the token digest and a 10-minute expiry, returns
    /// the raw token for out-of-band delivery. The raw value is never kept.
    pub fn issue_reset_token(&mut self) -> String {
        let raw = credentials::generate_reset_token();
        self.password_reset_token_hash = Some(credentials::hash_reset_token(&raw));
        let expires = Utc::now() + Duration::minutes(credentials::RESET_TOKEN_TTL_MINUTES);
        self.password_reset_expires_at = Some(DateTime::from_millis(expires.timestamp_millis()));
        raw
    }

    /// A raw token is accepted only while a reset is pending, unexpired and
    /// the digests agree. Every failure cause answers the same false.
    pub fn reset_token_matches(&self, raw: &str) -> bool {
        let stored = match &self.password_reset_token_hash {
            Some(digest) => digest,
            None => return false,
        };
        let expires = match self.password_reset_expires_at {
            Some(at) => at,
            None => return false,
        };
        if expires.timestamp_millis() <= Utc::now().timestamp_millis() {
            return false;
        }
        *stored == credentials::hash_reset_token(raw)
    }

    pub fn clear_reset_token(&mut self) {
        self.password_reset_token_hash = None;
        self.password_reset_expires_at = None;
    }

    pub fn public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            photo: self.photo.clone(),
            role: self.role,
        }
    }
}
