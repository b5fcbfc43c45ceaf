//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. Commerce backends
//! hand out opaque string identifiers, so the wrappers are string-backed.

use serde::{Deserialize, Serialize};

/// Macro to define a type-safe ID wrapper around an opaque string.
///
/// Creates a newtype wrapper with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>` and `From<&str>` implementations
///
/// # Example
///
/// ```rust
/// # use driftwood_core::define_id;
/// define_id!(CustomerId);
/// define_id!(OrderId);
///
/// let customer_id = CustomerId::new("gid://shop/Customer/1");
///
/// // These are different types, so this won't compile:
/// // let _: OrderId = customer_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper, returning the identifier.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Whether the identifier is the empty placeholder.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

// Define standard entity IDs
define_id!(CheckoutId);
define_id!(LineItemId);
define_id!(VariantId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = CheckoutId::new("gid://shop/Cart/abc123");
        assert_eq!(id.as_str(), "gid://shop/Cart/abc123");
        assert_eq!(id.to_string(), "gid://shop/Cart/abc123");
        assert_eq!(id.clone().into_inner(), "gid://shop/Cart/abc123");
    }

    #[test]
    fn test_id_equality() {
        assert_eq!(VariantId::new("123"), VariantId::from("123"));
        assert_ne!(VariantId::new("123"), VariantId::new("456"));
    }

    #[test]
    fn test_id_serde_transparent() {
        let id = LineItemId::new("li_1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"li_1\"");
        let back: LineItemId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_empty_placeholder() {
        assert!(CheckoutId::new("").is_empty());
        assert!(!CheckoutId::new("c1").is_empty());
    }
}
