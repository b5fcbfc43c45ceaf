//! Session lifecycle tests for the checkout client.
//!
//! These exercise session creation, recovery, and line-item mutation
//! against the in-memory mock backend, with the persisted session
//! reference held in a shared [`MemoryStore`].

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use driftwood_cart::CheckoutClient;
use driftwood_cart::storage::{CheckoutStore, MemoryStore};
use driftwood_integration_tests::MockBackend;

fn client() -> (
    MockBackend,
    Arc<MemoryStore>,
    CheckoutClient<MockBackend, Arc<MemoryStore>>,
) {
    let backend = MockBackend::new();
    let store = Arc::new(MemoryStore::new());
    let client = CheckoutClient::new(backend.clone(), Arc::clone(&store));
    (backend, store, client)
}

// =============================================================================
// Session Creation
// =============================================================================

#[tokio::test]
async fn test_init_is_idempotent() {
    let (backend, _store, client) = client();

    let first = client.init().await.unwrap();
    let second = client.init().await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(backend.create_calls(), 1);
}

#[tokio::test]
async fn test_init_reuses_persisted_session_across_clients() {
    let backend = MockBackend::new();
    let store = Arc::new(MemoryStore::new());

    let first = CheckoutClient::new(backend.clone(), Arc::clone(&store));
    let created = first.init().await.unwrap();

    // A fresh client over the same store picks up the same session,
    // as a page reload would.
    let second = CheckoutClient::new(backend.clone(), Arc::clone(&store));
    let recovered = second.init().await.unwrap();

    assert_eq!(created.id, recovered.id);
    assert_eq!(backend.create_calls(), 1);
}

#[tokio::test]
async fn test_add_creates_session_with_first_line() {
    let (backend, store, client) = client();

    let checkout = client
        .add_line_item("gid://shopify/ProductVariant/123")
        .await
        .unwrap();

    assert_eq!(checkout.line_items.len(), 1);
    let line = &checkout.line_items[0];
    assert_eq!(line.variant_id.as_str(), "123");
    assert_eq!(line.quantity, 1);

    // One create, seeded with the line
    assert_eq!(backend.create_calls(), 1);
    let persisted = store.load().unwrap().unwrap();
    assert_eq!(persisted.checkout_session_id, checkout.id);
}

// =============================================================================
// Session Recovery
// =============================================================================

#[tokio::test]
async fn test_rejected_session_is_replaced_and_old_id_forgotten() {
    let (backend, store, client) = client();

    let old = client.init().await.unwrap();
    backend.reject_session(&old.id);

    let fresh = client.fetch_checkout().await.unwrap();

    assert_ne!(fresh.id, old.id);
    assert!(fresh.line_items.is_empty());

    let persisted = store.load().unwrap().unwrap();
    assert_eq!(persisted.checkout_session_id, fresh.id);
    assert_ne!(persisted.checkout_session_id, old.id);
}

#[tokio::test]
async fn test_fetch_without_session_creates_one() {
    let (backend, store, client) = client();

    let checkout = client.fetch_checkout().await.unwrap();

    assert!(checkout.line_items.is_empty());
    assert_eq!(backend.create_calls(), 1);
    assert!(store.load().unwrap().is_some());
}

// =============================================================================
// Line-Item Mutations
// =============================================================================

#[tokio::test]
async fn test_adding_same_variant_twice_merges_into_one_line() {
    let (_backend, _store, client) = client();

    client.add_line_item("v1").await.unwrap();
    let checkout = client.add_line_item("v1").await.unwrap();

    assert_eq!(checkout.line_items.len(), 1);
    assert_eq!(checkout.line_items[0].quantity, 2);
    assert_eq!(checkout.total_quantity(), 2);
}

#[tokio::test]
async fn test_increment_sets_absolute_quantity() {
    let (_backend, _store, client) = client();

    let checkout = client.add_line_item("v1").await.unwrap();
    let line_id = checkout.line_items[0].id.clone();

    let checkout = client.increment(&line_id, 1).await.unwrap();
    assert_eq!(checkout.line_items[0].quantity, 2);

    let checkout = client.increment(&line_id, 2).await.unwrap();
    assert_eq!(checkout.line_items[0].quantity, 3);
}

#[tokio::test]
async fn test_decrement_at_quantity_one_removes_the_line() {
    let (_backend, _store, client) = client();

    let checkout = client.add_line_item("v1").await.unwrap();
    let line_id = checkout.line_items[0].id.clone();

    let checkout = client.decrement(&line_id, 1).await.unwrap();

    // Never leaves a quantity-0 entry behind
    assert!(checkout.line(&line_id).is_none());
    assert!(checkout.line_items.is_empty());
}

#[tokio::test]
async fn test_remove_drops_line_regardless_of_quantity() {
    let (_backend, _store, client) = client();

    client.add_line_item("v1").await.unwrap();
    client.add_line_item("v1").await.unwrap();
    let checkout = client.add_line_item("v1").await.unwrap();
    let line_id = checkout.line_items[0].id.clone();
    assert_eq!(checkout.line_items[0].quantity, 3);

    let checkout = client.remove_line_item(&line_id).await.unwrap();
    assert!(checkout.line_items.is_empty());
}

// =============================================================================
// Identifier Resolution
// =============================================================================

#[tokio::test]
async fn test_gid_and_base64_references_resolve_to_the_same_variant() {
    let (_backend, _store, client) = client();

    client
        .add_line_item("gid://shopify/ProductVariant/123")
        .await
        .unwrap();
    // base64("gid://shopify/ProductVariant/123")
    let checkout = client
        .add_line_item("Z2lkOi8vc2hvcGlmeS9Qcm9kdWN0VmFyaWFudC8xMjM=")
        .await
        .unwrap();

    assert_eq!(checkout.line_items.len(), 1);
    assert_eq!(checkout.line_items[0].variant_id.as_str(), "123");
    assert_eq!(checkout.line_items[0].quantity, 2);
}

#[tokio::test]
async fn test_malformed_reference_is_rejected_without_a_backend_call() {
    let (backend, _store, client) = client();

    let err = client.add_line_item("not/a/valid/reference").await.unwrap_err();

    assert!(matches!(
        err,
        driftwood_cart::CommerceError::IdentifierResolution(_)
    ));
    assert_eq!(backend.create_calls(), 0);
}
