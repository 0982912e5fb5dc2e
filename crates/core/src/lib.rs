//! Furni Core - Shared types library.
//!
//! This crate provides common types used across all Furni components:
//! - `storefront` - Cart, favorites, orders and authentication for a signed-in shopper
//! - `cli` - Command-line driver for the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no storage access,
//! no clocks. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, statuses and products

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
