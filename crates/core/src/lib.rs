//! Driftwood Core - Shared types library.
//!
//! This crate provides common types used across all Driftwood components:
//!
//! - `cart` - Headless cart/checkout core (commerce client + coordinator)
//! - `cli` - Command-line smoke-test tool for the cart backend
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and decimal money

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
