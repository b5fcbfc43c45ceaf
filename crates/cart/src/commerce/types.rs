//! Domain types for the cart core.
//!
//! These types provide a clean, ergonomic API separate from the raw wire
//! structs. Prices, titles, and images are denormalized display data owned
//! by the backend; the core never computes them.

use driftwood_core::{CheckoutId, LineItemId, Money, VariantId};
use serde::{Deserialize, Serialize};

/// A product or variant image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Image URL.
    pub url: String,
    /// Alt text for accessibility.
    pub alt_text: Option<String>,
}

/// A line item in the checkout.
///
/// `quantity` is kept strictly positive: any mutation that would bring it
/// to zero removes the line instead (see [`crate::CheckoutClient::decrement`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Line id, unique within the owning checkout.
    pub id: LineItemId,
    /// Catalog variant this line refers to (read-only).
    pub variant_id: VariantId,
    /// Quantity of the variant in the cart.
    pub quantity: u32,
    /// Product title.
    pub title: String,
    /// Variant title, when the variant is not the product default.
    pub variant_title: Option<String>,
    /// Price per unit.
    pub unit_price: Money,
    /// Total price for the line.
    pub line_price: Money,
    /// Variant or product image.
    pub image: Option<Image>,
}

/// A checkout session.
///
/// Created once per store context and persisted across reloads; recreated
/// when the backend rejects the persisted id. The hosted `web_url` is where
/// payment happens - this core never processes payment itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    /// Opaque session id, unique per store context.
    pub id: CheckoutId,
    /// Hosted checkout URL for payment redirection.
    pub web_url: String,
    /// Ordered line items, keyed by unique line id.
    pub line_items: Vec<LineItem>,
    /// Subtotal before tax/shipping.
    pub subtotal: Money,
    /// Total amount.
    pub total: Money,
}

impl Checkout {
    /// The empty placeholder used before the first fetch resolves.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            id: CheckoutId::new(""),
            web_url: String::new(),
            line_items: Vec::new(),
            subtotal: Money::default(),
            total: Money::default(),
        }
    }

    /// Sum of all line quantities. Always recomputed, never stored.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.line_items.iter().map(|line| line.quantity).sum()
    }

    /// Find a line by id.
    #[must_use]
    pub fn line(&self, id: &LineItemId) -> Option<&LineItem> {
        self.line_items.iter().find(|line| &line.id == id)
    }
}

impl Default for Checkout {
    fn default() -> Self {
        Self::empty()
    }
}

/// Input for adding a line to the checkout.
#[derive(Debug, Clone, Serialize)]
pub struct LineItemInput {
    /// Normalized variant id.
    pub variant_id: VariantId,
    /// Quantity to add.
    pub quantity: u32,
}

/// Input for setting an absolute quantity on an existing line.
#[derive(Debug, Clone, Serialize)]
pub struct LineItemUpdateInput {
    /// Line id within the session.
    pub id: LineItemId,
    /// New absolute quantity.
    pub quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn line(id: &str, quantity: u32) -> LineItem {
        LineItem {
            id: LineItemId::new(id),
            variant_id: VariantId::new("v1"),
            quantity,
            title: "Print".to_string(),
            variant_title: None,
            unit_price: Money::new(Decimal::new(2500, 2), "USD"),
            line_price: Money::new(
                Decimal::new(2500 * i64::from(quantity), 2),
                "USD",
            ),
            image: None,
        }
    }

    #[test]
    fn test_empty_checkout() {
        let checkout = Checkout::empty();
        assert!(checkout.id.is_empty());
        assert!(checkout.line_items.is_empty());
        assert_eq!(checkout.total_quantity(), 0);
    }

    #[test]
    fn test_total_quantity_is_sum_of_lines() {
        let mut checkout = Checkout::empty();
        checkout.line_items = vec![line("li_1", 2), line("li_2", 3)];
        assert_eq!(checkout.total_quantity(), 5);
    }

    #[test]
    fn test_line_lookup() {
        let mut checkout = Checkout::empty();
        checkout.line_items = vec![line("li_1", 1)];
        assert!(checkout.line(&LineItemId::new("li_1")).is_some());
        assert!(checkout.line(&LineItemId::new("li_2")).is_none());
    }
}
