//! Driftwood cart/checkout core.
//!
//! This crate is the stateful heart of the Driftwood storefront: a
//! [`CheckoutClient`] that wraps a remote commerce backend (session
//! lifecycle, line-item mutations, identifier normalization) and a
//! [`CartCoordinator`] that owns the in-memory cart snapshot, serializes
//! mutations, and notifies subscribers on every change. Presentation layers
//! (cart drawer, product page, navbar badge) consume the coordinator; they
//! never talk to the backend directly.
//!
//! # Architecture
//!
//! ```text
//! UI event ──► CartCoordinator ──► CheckoutClient ──► CommerceBackend (API)
//!                   │                     │
//!                   │                     └─► CheckoutStore (durable session id)
//!                   └─► subscribers (snapshot on every transition)
//! ```
//!
//! The coordinator is the only owner of [`CartSnapshot`]; the client is
//! stateless apart from the persisted checkout session reference.
//!
//! # Example
//!
//! ```rust,ignore
//! use driftwood_cart::commerce::storefront::StorefrontBackend;
//! use driftwood_cart::config::ShopConfig;
//! use driftwood_cart::storage::FileStore;
//! use driftwood_cart::{CartCoordinator, CheckoutClient};
//!
//! let config = ShopConfig::from_env()?;
//! let backend = StorefrontBackend::new(&config);
//! let store = FileStore::new("checkout.json");
//! let cart = CartCoordinator::new(CheckoutClient::new(backend, store));
//!
//! let _sub = cart.subscribe(|snapshot| render_badge(snapshot.cart_count()));
//! cart.add_line_item("gid://shopify/ProductVariant/123").await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod commerce;
pub mod config;
pub mod coordinator;
pub mod ids;
pub mod storage;

pub use checkout::CheckoutClient;
pub use commerce::storefront::StorefrontBackend;
pub use commerce::{CommerceBackend, CommerceError};
pub use config::ShopConfig;
pub use coordinator::{CartCoordinator, CartSnapshot, CartState, CheckoutError, Subscription};
