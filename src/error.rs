use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("a review for this tour by this author already exists")]
    DuplicateReview,

    #[error("an account with this email already exists")]
    DuplicateEmail,

    /// Wrong token, expired token and no pending reset all collapse into this
    /// one rejection; callers must not be able to tell them apart.
    #[error("reset token is invalid or has expired")]
    ResetRejected,

    #[error("password hashing failed")]
    Hash(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Database(#[from] mongodb::error::Error),

    #[error("malformed document in store: {0}")]
    Decode(#[from] mongodb::bson::de::Error),
}

/// True when the server rejected a write for violating a unique index.
pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        _ => false,
    }
}
