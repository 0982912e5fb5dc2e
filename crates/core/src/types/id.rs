//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally passing an order ID where a product ID is expected.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a type-safe integer ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_i32()`
/// - `Display`, `FromStr`, `From<i32>` and `Into<i32>` implementations
///
/// # Example
///
/// ```rust
/// # use furni_core::define_id;
/// define_id!(ShelfId);
/// define_id!(BinId);
///
/// let shelf = ShelfId::new(1);
/// let bin = BinId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: ShelfId = bin;
/// # let _ = (shelf, bin);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i32>().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(ProductId);
define_id!(OrderId);

/// Identifier of a shopper account issued by the authentication gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Generate a fresh random account ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_id_from_str_trims() {
        let id: ProductId = " 42 ".parse().unwrap();
        assert_eq!(id, ProductId::new(42));
        assert!("forty-two".parse::<ProductId>().is_err());
    }

    #[test]
    fn test_ids_serialize_transparently() {
        assert_eq!(serde_json::to_string(&OrderId::new(7)).unwrap(), "7");
        let parsed: ProductId = serde_json::from_str("3").unwrap();
        assert_eq!(parsed.as_i32(), 3);
    }

    #[test]
    fn test_account_ids_are_unique() {
        assert_ne!(AccountId::generate(), AccountId::generate());
    }
}
