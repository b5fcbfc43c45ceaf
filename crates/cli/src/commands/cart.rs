//! Cart commands: wire the coordinator to a file-backed session and print
//! the resulting snapshot.

use driftwood_cart::storage::FileStore;
use driftwood_cart::{
    CartCoordinator, CartSnapshot, CartState, CheckoutClient, ShopConfig, StorefrontBackend,
};
use driftwood_core::LineItemId;
use tracing::info;

/// Session file in the working directory, shared across invocations.
const SESSION_FILE: &str = ".driftwood-checkout.json";

type Cart = CartCoordinator<StorefrontBackend, FileStore>;

/// Build the coordinator from environment configuration.
///
/// # Errors
///
/// Returns an error if `SHOPIFY_STORE` or `SHOPIFY_STOREFRONT_TOKEN` are
/// missing or malformed.
pub fn coordinator() -> Result<Cart, Box<dyn std::error::Error>> {
    let config = ShopConfig::from_env()?;
    let backend = StorefrontBackend::new(&config);
    let store = FileStore::new(SESSION_FILE);
    Ok(CartCoordinator::new(CheckoutClient::new(backend, store)))
}

/// Fetch and print the current cart.
pub async fn show(cart: &Cart) {
    let snapshot = cart.refresh().await;
    print_snapshot(&snapshot);
}

/// Add one unit of a variant.
pub async fn add(cart: &Cart, variant_ref: &str) {
    info!(variant_ref, "Adding item");
    let snapshot = cart.add_line_item(variant_ref).await;
    print_snapshot(&snapshot);
}

/// Remove a line entirely.
pub async fn remove(cart: &Cart, line_id: &str) {
    let snapshot = cart.remove_line_item(&LineItemId::from(line_id)).await;
    print_snapshot(&snapshot);
}

/// Raise a line's quantity by one.
pub async fn increment(cart: &Cart, line_id: &str) {
    cart.mark_outdated();
    let snapshot = cart.increment_line_item(&LineItemId::from(line_id)).await;
    print_snapshot(&snapshot);
}

/// Lower a line's quantity by one.
pub async fn decrement(cart: &Cart, line_id: &str) {
    cart.mark_outdated();
    let snapshot = cart.decrement_line_item(&LineItemId::from(line_id)).await;
    print_snapshot(&snapshot);
}

/// Print the hosted checkout URL.
///
/// # Errors
///
/// Returns the mandated user-facing message when the URL cannot be
/// resolved.
#[allow(clippy::print_stdout)]
pub async fn checkout_url(cart: &Cart) -> Result<(), Box<dyn std::error::Error>> {
    let url = cart.begin_checkout().await?;
    println!("{url}");
    Ok(())
}

/// Clear the displayed cart, keeping the session.
pub fn clear(cart: &Cart) {
    let snapshot = cart.clear_after_order();
    print_snapshot(&snapshot);
}

#[allow(clippy::print_stdout)]
fn print_snapshot(snapshot: &CartSnapshot) {
    if let CartState::Failed { message } = &snapshot.state {
        println!("cart error: {message}");
    }

    if snapshot.checkout.line_items.is_empty() {
        println!("cart is empty");
        return;
    }

    for line in &snapshot.checkout.line_items {
        let variant = line
            .variant_title
            .as_deref()
            .map_or_else(String::new, |v| format!(" ({v})"));
        println!(
            "{:>3} x {}{}  {}  [{}]",
            line.quantity,
            line.title,
            variant,
            line.line_price.display(),
            line.id
        );
    }
    println!(
        "{} items, subtotal {}, total {}",
        snapshot.cart_count(),
        snapshot.checkout.subtotal.display(),
        snapshot.checkout.total.display()
    );
}
