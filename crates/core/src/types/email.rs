//! Shopper email addresses.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Why a string was rejected as an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email address is required")]
    Empty,

    #[error("email address is longer than {max} characters")]
    TooLong { max: usize },

    /// Zero or several `@` characters.
    #[error("email address must contain exactly one @")]
    MissingAtSymbol,

    #[error("email address has nothing before the @")]
    EmptyLocalPart,

    /// The part after `@` is empty, has no dot, or starts or ends with one.
    #[error("email address domain `{0}` is not valid")]
    InvalidDomain(String),

    #[error("email address cannot contain whitespace")]
    Whitespace,
}

/// The sign-in identifier of an account.
///
/// Input is trimmed and lowercased, so `" Shopper@Example.com "` and
/// `"shopper@example.com"` are the same account.
///
/// ## Examples
///
/// ```
/// use furni_core::Email;
///
/// assert!(Email::parse("shopper@example.com").is_ok());
/// assert!(Email::parse("shopper@localhost").is_err());
/// assert_eq!(Email::parse(" A@B.co ").map(|e| e.to_string()), Ok("a@b.co".to_string()));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LENGTH: usize = 254;

    /// Validate and normalize an address.
    ///
    /// # Errors
    ///
    /// Returns the first [`EmailError`] the trimmed input violates.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let address = input.trim().to_lowercase();
        match address.len() {
            0 => return Err(EmailError::Empty),
            n if n > Self::MAX_LENGTH => {
                return Err(EmailError::TooLong {
                    max: Self::MAX_LENGTH,
                });
            }
            _ => {}
        }
        if address.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let mut parts = address.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(EmailError::MissingAtSymbol);
        };
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        let domain_ok = domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.');
        if !domain_ok {
            return Err(EmailError::InvalidDomain(domain.to_string()));
        }

        Ok(Self(address))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}
