//! Authentication gateway.
//!
//! The storefront only needs to know whether someone is signed in and who.
//! [`AuthGateway`] is that contract; [`LocalAuthGateway`] implements it on the
//! device with Argon2 password hashes kept in the key-value store.

mod error;

pub use error::AuthError;

use std::future::Future;
use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tracing::{info, instrument, warn};

use furni_core::{AccountId, Email};

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::storage::{KeyValueStore, Keyed, PersistedList, StorageError, keys};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// The signed-in shopper.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: AccountId,
    pub email: Email,
}

/// Sign-up, sign-in and the presence signal gating the ledgers.
pub trait AuthGateway: Send + Sync + 'static {
    /// Create an account and sign it in.
    fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<AuthUser, AuthError>> + Send;

    /// Sign in to an existing account.
    fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<AuthUser, AuthError>> + Send;

    /// End the current session. Signing out while signed out is not an error.
    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// Request a password reset for `email`.
    fn reset_password(&self, email: &str) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// The signed-in shopper, if any.
    fn current_user(&self) -> Option<AuthUser>;

    /// Observe sign-in and sign-out.
    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRecord {
    id: AccountId,
    email: Email,
    password_hash: String,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password_reset_requested_at: Option<DateTime<Utc>>,
}

impl AccountRecord {
    fn user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            email: self.email.clone(),
        }
    }
}

impl Keyed for AccountRecord {
    type Key = AccountId;

    fn key(&self) -> AccountId {
        self.id
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    account_id: AccountId,
    signed_in_at: DateTime<Utc>,
}

/// Accounts and session kept in a local [`KeyValueStore`].
pub struct LocalAuthGateway<S> {
    store: Arc<S>,
    accounts: PersistedList<S, AccountRecord>,
    presence: watch::Sender<Option<AuthUser>>,
    session_lock: Mutex<()>,
}

impl<S: KeyValueStore> LocalAuthGateway<S> {
    /// Open the gateway, restoring a previously signed-in session.
    ///
    /// A session pointing at an account that no longer exists is discarded.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the stored records cannot be read.
    pub async fn open(store: Arc<S>) -> Result<Self, AuthError> {
        let gateway = Self {
            accounts: PersistedList::new(Arc::clone(&store), keys::ACCOUNTS),
            store,
            presence: watch::Sender::new(None),
            session_lock: Mutex::new(()),
        };

        if let Some(text) = gateway.store.get(keys::AUTH_SESSION).await? {
            let session: SessionRecord =
                serde_json::from_str(&text).map_err(StorageError::from)?;
            let user = gateway
                .accounts
                .read(|s| s.get(session.account_id).map(AccountRecord::user))
                .await?;
            match user {
                Some(user) => {
                    set_sentry_user(&user.id, Some(user.email.as_str()));
                    gateway.presence.send_replace(Some(user));
                }
                None => {
                    warn!(account_id = %session.account_id, "Discarding session for unknown account");
                    gateway.store.remove(keys::AUTH_SESSION).await?;
                }
            }
        }

        Ok(gateway)
    }

    async fn start_session(&self, user: AuthUser) -> Result<AuthUser, AuthError> {
        let _guard = self.session_lock.lock().await;
        let record = SessionRecord {
            account_id: user.id,
            signed_in_at: Utc::now(),
        };
        let text = serde_json::to_string(&record).map_err(StorageError::from)?;
        self.store.set(keys::AUTH_SESSION, text).await?;

        set_sentry_user(&user.id, Some(user.email.as_str()));
        self.presence.send_replace(Some(user.clone()));
        Ok(user)
    }
}

impl<S: KeyValueStore> AuthGateway for LocalAuthGateway<S> {
    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &SecretString) -> Result<AuthUser, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password.expose_secret())?;
        let password_hash = hash_password(password.expose_secret())?;

        let user = self
            .accounts
            .update(|accounts| -> Result<AuthUser, AuthError> {
                if accounts.iter().any(|a| a.email == email) {
                    return Err(AuthError::UserAlreadyExists);
                }
                let record = AccountRecord {
                    id: AccountId::generate(),
                    email,
                    password_hash,
                    created_at: Utc::now(),
                    password_reset_requested_at: None,
                };
                let user = record.user();
                accounts.push(record);
                Ok(user)
            })
            .await?;

        info!(account_id = %user.id, "Account created");
        self.start_session(user).await
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<AuthUser, AuthError> {
        let email = Email::parse(email)?;
        let account = self
            .accounts
            .read(|s| s.items().iter().find(|a| a.email == email).cloned())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password.expose_secret(), &account.password_hash)?;

        info!(account_id = %account.id, "Signed in");
        self.start_session(account.user()).await
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), AuthError> {
        let _guard = self.session_lock.lock().await;
        self.store.remove(keys::AUTH_SESSION).await?;
        clear_sentry_user();
        if self.presence.send_replace(None).is_some() {
            info!("Signed out");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        let now = Utc::now();
        self.accounts
            .update(|accounts| -> Result<(), AuthError> {
                let account = accounts
                    .iter_mut()
                    .find(|a| a.email == email)
                    .ok_or(AuthError::UserNotFound)?;
                account.password_reset_requested_at = Some(now);
                Ok(())
            })
            .await?;
        info!("Password reset requested");
        Ok(())
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.presence.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.presence.subscribe()
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    async fn gateway() -> (Arc<MemoryStore>, LocalAuthGateway<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let gateway = LocalAuthGateway::open(Arc::clone(&store)).await.unwrap();
        (store, gateway)
    }

    #[tokio::test]
    async fn test_sign_up_signs_in() {
        let (_, auth) = gateway().await;
        let mut presence = auth.subscribe();
        assert!(auth.current_user().is_none());

        let user = auth.sign_up(" Ada@Example.com ", &secret("hunter22")).await.unwrap();
        assert_eq!(user.email.as_str(), "ada@example.com");
        assert!(presence.has_changed().unwrap());
        assert_eq!(presence.borrow_and_update().as_ref(), Some(&user));
        assert_eq!(auth.current_user(), Some(user));
    }

    #[tokio::test]
    async fn test_duplicate_sign_up() {
        let (_, auth) = gateway().await;
        auth.sign_up("ada@example.com", &secret("hunter22")).await.unwrap();
        let again = auth.sign_up("ADA@example.com", &secret("another1")).await;
        assert!(matches!(again, Err(AuthError::UserAlreadyExists)));
    }

    #[tokio::test]
    async fn test_weak_password_and_bad_email() {
        let (_, auth) = gateway().await;
        assert!(matches!(
            auth.sign_up("ada@example.com", &secret("12345")).await,
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            auth.sign_up("not-an-email", &secret("123456")).await,
            Err(AuthError::InvalidEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_in_checks_password() {
        let (_, auth) = gateway().await;
        let created = auth.sign_up("ada@example.com", &secret("hunter22")).await.unwrap();
        auth.sign_out().await.unwrap();
        assert!(auth.current_user().is_none());

        assert!(matches!(
            auth.sign_in("ada@example.com", &secret("wrong-pass")).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.sign_in("bob@example.com", &secret("hunter22")).await,
            Err(AuthError::InvalidCredentials)
        ));

        let user = auth.sign_in("ada@example.com", &secret("hunter22")).await.unwrap();
        assert_eq!(user, created);
    }

    #[tokio::test]
    async fn test_session_survives_reopen() {
        let (store, auth) = gateway().await;
        let user = auth.sign_up("ada@example.com", &secret("hunter22")).await.unwrap();
        drop(auth);

        let reopened = LocalAuthGateway::open(Arc::clone(&store)).await.unwrap();
        assert_eq!(reopened.current_user(), Some(user));

        reopened.sign_out().await.unwrap();
        let again = LocalAuthGateway::open(store).await.unwrap();
        assert!(again.current_user().is_none());
    }

    #[tokio::test]
    async fn test_stale_session_is_discarded() {
        let store = Arc::new(MemoryStore::new());
        let orphan = SessionRecord {
            account_id: AccountId::generate(),
            signed_in_at: Utc::now(),
        };
        store
            .set(keys::AUTH_SESSION, serde_json::to_string(&orphan).unwrap())
            .await
            .unwrap();

        let auth = LocalAuthGateway::open(Arc::clone(&store)).await.unwrap();
        assert!(auth.current_user().is_none());
        assert!(store.get(keys::AUTH_SESSION).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_password() {
        let (store, auth) = gateway().await;
        auth.sign_up("ada@example.com", &secret("hunter22")).await.unwrap();

        auth.reset_password("ada@example.com").await.unwrap();
        let stored = store.get(keys::ACCOUNTS).await.unwrap().unwrap();
        assert!(stored.contains("passwordResetRequestedAt"));

        assert!(matches!(
            auth.reset_password("bob@example.com").await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_password_hash_not_stored_in_clear() {
        let (store, auth) = gateway().await;
        auth.sign_up("ada@example.com", &secret("hunter22")).await.unwrap();
        let stored = store.get(keys::ACCOUNTS).await.unwrap().unwrap();
        assert!(!stored.contains("hunter22"));
        assert!(stored.contains("$argon2"));
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            AuthError::UserAlreadyExists.user_message(),
            "This email is already registered. Please use a different email or try signing in."
        );
        assert!(
            AuthError::Storage(StorageError::Backend("x".to_string()))
                .user_message()
                .starts_with("An unexpected error")
        );
    }
}
