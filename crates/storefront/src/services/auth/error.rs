//! Authentication error types.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] furni_core::EmailError),

    /// Wrong password, or no account for the email on sign-in.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No account for the email.
    #[error("user not found")]
    UserNotFound,

    /// An account already exists for the email.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Account or session records could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Message suitable for showing to the shopper.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address.",
            Self::InvalidCredentials => {
                "Invalid email or password. Please check your credentials and try again."
            }
            Self::UserNotFound => {
                "No account found with this email. Please check your email or sign up."
            }
            Self::UserAlreadyExists => {
                "This email is already registered. Please use a different email or try signing in."
            }
            Self::WeakPassword(_) => "Password should be at least 6 characters long.",
            Self::Storage(_) | Self::PasswordHash => {
                "An unexpected error occurred. Please try again."
            }
        }
    }
}
