//! Wire-to-domain conversion for Storefront cart responses.

use driftwood_core::{CheckoutId, LineItemId, Money, VariantId};
use rust_decimal::Decimal;

use crate::commerce::CommerceError;
use crate::commerce::types::{Checkout, Image, LineItem};
use crate::ids::normalize_or_raw;

use super::wire::{WireCart, WireLine, WireMoney};

pub(super) fn convert_cart(cart: WireCart) -> Result<Checkout, CommerceError> {
    let line_items = cart
        .lines
        .edges
        .into_iter()
        .map(|edge| convert_line(edge.node))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Checkout {
        id: CheckoutId::new(normalize_or_raw(&cart.id)),
        web_url: cart.checkout_url,
        line_items,
        subtotal: convert_money(cart.cost.subtotal_amount)?,
        total: convert_money(cart.cost.total_amount)?,
    })
}

fn convert_line(line: WireLine) -> Result<LineItem, CommerceError> {
    let quantity = u32::try_from(line.quantity)
        .map_err(|_| CommerceError::InvalidData(format!("quantity out of range: {}", line.quantity)))?;

    Ok(LineItem {
        id: LineItemId::new(normalize_or_raw(&line.id)),
        variant_id: VariantId::new(normalize_or_raw(&line.merchandise.id)),
        quantity,
        title: line.merchandise.product.title,
        variant_title: non_default_title(line.merchandise.title),
        unit_price: convert_money(line.cost.amount_per_quantity)?,
        line_price: convert_money(line.cost.total_amount)?,
        image: line.merchandise.image.map(|img| Image {
            url: img.url,
            alt_text: img.alt_text,
        }),
    })
}

fn convert_money(money: WireMoney) -> Result<Money, CommerceError> {
    let amount = money
        .amount
        .parse::<Decimal>()
        .map_err(|e| CommerceError::InvalidData(format!("bad amount {:?}: {e}", money.amount)))?;
    Ok(Money::new(amount, money.currency_code))
}

/// Single-variant products report the placeholder "Default Title".
fn non_default_title(title: String) -> Option<String> {
    if title == "Default Title" {
        None
    } else {
        Some(title)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn wire_cart_json() -> serde_json::Value {
        serde_json::json!({
            "id": "gid://shopify/Cart/chk_1",
            "checkoutUrl": "https://shop.example/checkout/chk_1",
            "cost": {
                "subtotalAmount": { "amount": "50.00", "currencyCode": "USD" },
                "totalAmount": { "amount": "54.00", "currencyCode": "USD" }
            },
            "lines": { "edges": [ { "node": {
                "id": "gid://shopify/CartLine/li_1",
                "quantity": 2,
                "cost": {
                    "amountPerQuantity": { "amount": "25.00", "currencyCode": "USD" },
                    "totalAmount": { "amount": "50.00", "currencyCode": "USD" }
                },
                "merchandise": {
                    "id": "gid://shopify/ProductVariant/123",
                    "title": "Default Title",
                    "price": { "amount": "25.00", "currencyCode": "USD" },
                    "image": { "url": "https://cdn.example/p.jpg", "altText": null },
                    "product": { "title": "Dune Print" }
                }
            } } ] }
        })
    }

    #[test]
    fn test_convert_cart_normalizes_ids() {
        let wire: WireCart = serde_json::from_value(wire_cart_json()).unwrap();
        let checkout = convert_cart(wire).unwrap();

        assert_eq!(checkout.id.as_str(), "chk_1");
        assert_eq!(checkout.line_items.len(), 1);
        let line = &checkout.line_items[0];
        assert_eq!(line.id.as_str(), "li_1");
        assert_eq!(line.variant_id.as_str(), "123");
        assert_eq!(line.quantity, 2);
        assert_eq!(line.title, "Dune Print");
        assert_eq!(line.variant_title, None);
        assert_eq!(checkout.total_quantity(), 2);
    }

    #[test]
    fn test_convert_cart_parses_decimal_amounts() {
        let wire: WireCart = serde_json::from_value(wire_cart_json()).unwrap();
        let checkout = convert_cart(wire).unwrap();
        assert_eq!(checkout.subtotal.display(), "$50.00");
        assert_eq!(checkout.total.display(), "$54.00");
    }

    #[test]
    fn test_convert_cart_bad_amount() {
        let mut json = wire_cart_json();
        json["cost"]["subtotalAmount"]["amount"] = "not-a-number".into();
        let wire: WireCart = serde_json::from_value(json).unwrap();
        assert!(matches!(
            convert_cart(wire),
            Err(CommerceError::InvalidData(_))
        ));
    }

    #[test]
    fn test_convert_cart_out_of_range_quantity() {
        let mut json = wire_cart_json();
        json["lines"]["edges"][0]["node"]["quantity"] = (-1).into();
        let wire: WireCart = serde_json::from_value(json).unwrap();
        let err = convert_cart(wire).unwrap_err();
        assert!(err.to_string().contains("quantity out of range"));
    }

    #[test]
    fn test_named_variant_title_kept() {
        let mut json = wire_cart_json();
        json["lines"]["edges"][0]["node"]["merchandise"]["title"] = "A2 / Matte".into();
        let wire: WireCart = serde_json::from_value(json).unwrap();
        let checkout = convert_cart(wire).unwrap();
        assert_eq!(
            checkout.line_items[0].variant_title.as_deref(),
            Some("A2 / Matte")
        );
    }
}
