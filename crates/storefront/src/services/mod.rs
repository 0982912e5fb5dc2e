//! Services the storefront depends on.
//!
//! - `auth` - Account sign-up, sign-in and the signed-in presence signal
pub mod auth;
