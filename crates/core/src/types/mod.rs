//! Shared type definitions.

pub mod id;
pub mod money;

pub use id::{CheckoutId, LineItemId, VariantId};
pub use money::Money;
