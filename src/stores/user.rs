use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use validator::Validate;

use crate::credentials;
use crate::error::{is_duplicate_key, Error, Result};
use crate::models::user::{ChangePasswordDto, CreateUserDto, ResetPasswordDto, Role, User};

pub struct UserStore {
    users: Collection<User>,
}

impl UserStore {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection("users"),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users.create_index(index, None).await?;
        Ok(())
    }

    /// Create an account. The password confirmation lives and dies at the DTO
    /// boundary; `password_changed_at` stays unset on creation.
    pub async fn register(&self, dto: CreateUserDto) -> Result<User> {
        dto.validate()?;

        let password_hash = credentials::hash_password(&dto.password)?;
        let user = User {
            id: None,
            name: dto.name,
            email: normalize_email(&dto.email),
            photo: dto.photo,
            role: Role::User,
            password_hash,
            password_changed_at: None,
            password_reset_token_hash: None,
            password_reset_expires_at: None,
            active: true,
        };

        let inserted = match self.users.insert_one(&user, None).await {
            Ok(result) => result,
            Err(e) if is_duplicate_key(&e) => return Err(Error::DuplicateEmail),
            Err(e) => return Err(e.into()),
        };

        log::info!("registered user {}", user.email);

        Ok(User {
            id: inserted.inserted_id.as_object_id(),
            ..user
        })
    }

    /// Default reads exclude soft-deleted accounts.
    pub async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>> {
        let user = self
            .users
            .find_one(doc! { "_id": id, "active": { "$ne": false } }, None)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .users
            .find_one(
                doc! { "email": normalize_email(email), "active": { "$ne": false } },
                None,
            )
            .await?;
        Ok(user)
    }

    /// Re-hash, stamp the backdated change time and drop any pending reset in
    /// one partial update. Returns None for an unknown or inactive account.
    pub async fn change_password(
        &self,
        id: ObjectId,
        dto: ChangePasswordDto,
    ) -> Result<Option<User>> {
        dto.validate()?;

        let mut user = match self.find_by_id(id).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        user.set_password(&dto.password)?;
        user.stamp_password_change();
        user.clear_reset_token();

        self.users
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": {
                        "password_hash": &user.password_hash,
                        "password_changed_at": user.password_changed_at,
                    },
                    "$unset": {
                        "password_reset_token_hash": "",
                        "password_reset_expires_at": "",
                    },
                },
                None,
            )
            .await?;

        Ok(Some(user))
    }

    /// Issue a reset token for the account with this email and persist its
    /// digest and expiry. Returns the raw token, or None when no active
    /// account matches; what to reveal about that is the caller's call.
    pub async fn request_password_reset(&self, email: &str) -> Result<Option<String>> {
        let mut user = match self.find_by_email(email).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        let raw_token = user.issue_reset_token();

        self.users
            .update_one(
                doc! { "email": &user.email },
                doc! { "$set": {
                    "password_reset_token_hash": user.password_reset_token_hash.clone(),
                    "password_reset_expires_at": user.password_reset_expires_at,
                } },
                None,
            )
            .await?;

        Ok(Some(raw_token))
    }

    /// Complete a pending reset. The lookup is by token digest with an
    /// unexpired window; wrong, expired and unknown tokens are one and the
    /// same rejection. Consuming the token clears both reset fields, so a
    /// second attempt with the same raw token fails.
    pub async fn reset_password(&self, dto: ResetPasswordDto) -> Result<User> {
        dto.validate()?;

        let digest = credentials::hash_reset_token(&dto.token);
        let now = DateTime::from_millis(Utc::now().timestamp_millis());
        let mut user = match self
            .users
            .find_one(
                doc! {
                    "password_reset_token_hash": digest,
                    "password_reset_expires_at": { "$gt": now },
                    "active": { "$ne": false },
                },
                None,
            )
            .await?
        {
            Some(user) => user,
            None => return Err(Error::ResetRejected),
        };

        user.set_password(&dto.password)?;
        user.stamp_password_change();
        user.clear_reset_token();

        self.users
            .update_one(
                doc! { "email": &user.email },
                doc! {
                    "$set": {
                        "password_hash": &user.password_hash,
                        "password_changed_at": user.password_changed_at,
                    },
                    "$unset": {
                        "password_reset_token_hash": "",
                        "password_reset_expires_at": "",
                    },
                },
                None,
            )
            .await?;

        log::info!("password reset completed for {}", user.email);

        Ok(user)
    }

    /// Soft delete: the account disappears from default reads but stays
    /// stored.
    pub async fn deactivate(&self, id: ObjectId) -> Result<bool> {
        let result = self
            .users
            .update_one(doc! { "_id": id }, doc! { "$set": { "active": false } }, None)
            .await?;
        Ok(result.modified_count > 0)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized_for_storage_and_lookup() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
        assert_eq!(normalize_email("ada@example.com"), "ada@example.com");
    }
}
