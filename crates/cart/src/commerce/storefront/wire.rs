//! GraphQL documents and wire types for the Storefront cart API.
//!
//! The cart surface is five operations sharing one cart selection, so the
//! documents are written by hand and deserialized with `serde` instead of
//! schema codegen. Field names follow the API's camelCase convention.

use serde::Deserialize;

/// Shared cart selection appended to every document.
const CART_FRAGMENT: &str = r"
fragment CartFields on Cart {
  id
  checkoutUrl
  cost {
    subtotalAmount { amount currencyCode }
    totalAmount { amount currencyCode }
  }
  lines(first: 100) {
    edges {
      node {
        id
        quantity
        cost {
          amountPerQuantity { amount currencyCode }
          totalAmount { amount currencyCode }
        }
        merchandise {
          ... on ProductVariant {
            id
            title
            price { amount currencyCode }
            image { url altText }
            product { title }
          }
        }
      }
    }
  }
}";

const CREATE_CART: &str = r"
mutation CreateCart($input: CartInput!) {
  cartCreate(input: $input) {
    cart { ...CartFields }
    userErrors { field message code }
  }
}";

const GET_CART: &str = r"
query GetCart($cartId: ID!) {
  cart(id: $cartId) { ...CartFields }
}";

const ADD_LINES: &str = r"
mutation AddToCart($cartId: ID!, $lines: [CartLineInput!]!) {
  cartLinesAdd(cartId: $cartId, lines: $lines) {
    cart { ...CartFields }
    userErrors { field message code }
  }
}";

const UPDATE_LINES: &str = r"
mutation UpdateCartLines($cartId: ID!, $lines: [CartLineUpdateInput!]!) {
  cartLinesUpdate(cartId: $cartId, lines: $lines) {
    cart { ...CartFields }
    userErrors { field message code }
  }
}";

const REMOVE_LINES: &str = r"
mutation RemoveFromCart($cartId: ID!, $lineIds: [ID!]!) {
  cartLinesRemove(cartId: $cartId, lineIds: $lineIds) {
    cart { ...CartFields }
    userErrors { field message code }
  }
}";

/// The five cart operations.
#[derive(Debug, Clone, Copy)]
pub(super) enum Operation {
    CreateCart,
    GetCart,
    AddLines,
    UpdateLines,
    RemoveLines,
}

impl Operation {
    /// The full document: operation plus shared fragment.
    pub(super) fn document(self) -> String {
        let op = match self {
            Self::CreateCart => CREATE_CART,
            Self::GetCart => GET_CART,
            Self::AddLines => ADD_LINES,
            Self::UpdateLines => UPDATE_LINES,
            Self::RemoveLines => REMOVE_LINES,
        };
        format!("{op}\n{CART_FRAGMENT}")
    }
}

// =============================================================================
// Identifier expansion
// =============================================================================

/// Expand a normalized variant scalar to the API's gid form.
pub(super) fn expand_variant_gid(id: &str) -> String {
    if id.starts_with("gid://") {
        id.to_string()
    } else {
        format!("gid://shopify/ProductVariant/{id}")
    }
}

/// Expand a normalized line scalar to the API's gid form.
pub(super) fn expand_line_gid(id: &str) -> String {
    if id.starts_with("gid://") {
        id.to_string()
    } else {
        format!("gid://shopify/CartLine/{id}")
    }
}

/// Expand a normalized checkout scalar to the API's gid form.
pub(super) fn expand_cart_gid(id: &str) -> String {
    if id.starts_with("gid://") {
        id.to_string()
    } else {
        format!("gid://shopify/Cart/{id}")
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireMoney {
    pub amount: String,
    pub currency_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireImage {
    pub url: String,
    pub alt_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireProduct {
    pub title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireMerchandise {
    pub id: String,
    pub title: String,
    pub price: WireMoney,
    pub image: Option<WireImage>,
    pub product: WireProduct,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireLineCost {
    pub amount_per_quantity: WireMoney,
    pub total_amount: WireMoney,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireLine {
    pub id: String,
    pub quantity: i64,
    pub cost: WireLineCost,
    pub merchandise: WireMerchandise,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireEdge<T> {
    pub node: T,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireConnection<T> {
    pub edges: Vec<WireEdge<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireCost {
    pub subtotal_amount: WireMoney,
    pub total_amount: WireMoney,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireCart {
    pub id: String,
    pub checkout_url: String,
    pub cost: WireCost,
    pub lines: WireConnection<WireLine>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireUserError {
    #[allow(dead_code)]
    pub field: Option<Vec<String>>,
    pub message: String,
    #[allow(dead_code)]
    pub code: Option<String>,
}

/// Mutation payload: cart plus user errors.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CartPayload {
    pub cart: Option<WireCart>,
    pub user_errors: Vec<WireUserError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateCartData {
    pub cart_create: Option<CartPayload>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GetCartData {
    pub cart: Option<WireCart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AddLinesData {
    pub cart_lines_add: Option<CartPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpdateLinesData {
    pub cart_lines_update: Option<CartPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RemoveLinesData {
    pub cart_lines_remove: Option<CartPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_carry_fragment() {
        for op in [
            Operation::CreateCart,
            Operation::GetCart,
            Operation::AddLines,
            Operation::UpdateLines,
            Operation::RemoveLines,
        ] {
            let doc = op.document();
            assert!(doc.contains("fragment CartFields on Cart"), "{doc}");
            assert!(doc.contains("...CartFields"), "{doc}");
        }
    }

    #[test]
    fn test_expand_variant_gid() {
        assert_eq!(
            expand_variant_gid("123"),
            "gid://shopify/ProductVariant/123"
        );
        assert_eq!(
            expand_variant_gid("gid://shopify/ProductVariant/123"),
            "gid://shopify/ProductVariant/123"
        );
    }

    #[test]
    fn test_expand_line_gid() {
        assert_eq!(expand_line_gid("abc"), "gid://shopify/CartLine/abc");
    }
}
