//! Unified error handling with Sentry integration.
//!
//! Every storefront operation returns `Result<T, StorefrontError>`. Callers
//! decide how to present an error; [`report`] captures the server-class ones
//! (storage failures) to Sentry before they are shown.

use thiserror::Error;

use crate::services::auth::AuthError;
use crate::storage::StorageError;

/// Error type for storefront operations.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// An argument is outside the accepted range (e.g. a zero quantity).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The entry an operation targets does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The underlying key-value store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The action is not allowed in the current state (e.g. cancelling a
    /// shipped order).
    #[error("{0}")]
    PolicyViolation(String),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// No shopper is signed in.
    #[error("Please sign in to continue")]
    Unauthenticated,
}

impl StorefrontError {
    /// Returns `true` for failures of the device rather than of the request.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Auth(AuthError::Storage(_)))
    }

    /// Message suitable for showing to the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Storage(_) => "Something went wrong saving your changes. Please try again.".to_string(),
            Self::Auth(err) => err.user_message().to_string(),
            Self::InvalidArgument(msg) | Self::PolicyViolation(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Log an error and capture it to Sentry if it is internal.
pub fn report(err: &StorefrontError) {
    if err.is_internal() {
        let event_id = sentry::capture_error(err);
        tracing::error!(
            error = %err,
            sentry_event_id = %event_id,
            "Storefront error"
        );
    } else {
        tracing::warn!(error = %err, "Storefront request rejected");
    }
}

/// Set the Sentry user context for the signed-in shopper.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for shopper actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "3")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorefrontError::NotFound("product 12 is not in the cart".to_string());
        assert_eq!(err.to_string(), "Not found: product 12 is not in the cart");

        let err = StorefrontError::InvalidArgument("quantity must be positive".to_string());
        assert_eq!(err.to_string(), "Invalid argument: quantity must be positive");
    }

    #[test]
    fn test_internal_classification() {
        let storage = StorefrontError::Storage(StorageError::Backend("disk full".to_string()));
        assert!(storage.is_internal());
        assert!(!StorefrontError::Unauthenticated.is_internal());
        assert!(!StorefrontError::PolicyViolation("late".to_string()).is_internal());
    }

    #[test]
    fn test_user_message_hides_storage_details() {
        let err = StorefrontError::Storage(StorageError::Backend("disk full".to_string()));
        assert!(!err.user_message().contains("disk full"));

        let err = StorefrontError::PolicyViolation(
            "This order can only be cancelled within 10 minutes of placement.".to_string(),
        );
        assert_eq!(
            err.user_message(),
            "This order can only be cancelled within 10 minutes of placement."
        );
    }
}
