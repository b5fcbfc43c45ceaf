//! Commerce backend abstraction and error types.
//!
//! # Architecture
//!
//! - [`CommerceBackend`] is the seam between the cart core and the remote
//!   commerce API: five primitives (create, fetch, add, update, remove)
//!   that every operation of the [`crate::CheckoutClient`] maps onto.
//! - [`storefront`] implements it against the Shopify Storefront API with
//!   type-safe GraphQL over `reqwest`.
//! - The backend is source of truth - no local sync, every mutation adopts
//!   the authoritative response.

pub mod storefront;
pub mod types;

pub use types::{Checkout, Image, LineItem, LineItemInput, LineItemUpdateInput};

use driftwood_core::CheckoutId;
use thiserror::Error;

/// Errors that can occur when interacting with the commerce backend.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response payload failed domain conversion (e.g., malformed amount).
    #[error("Invalid response data: {0}")]
    InvalidData(String),

    /// The stored checkout session id was rejected by the backend
    /// (expired or unknown). Recoverable: clear storage and re-init.
    #[error("Checkout session invalid: {0}")]
    SessionInvalid(CheckoutId),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// User error from a mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),

    /// A variant or line-item reference could not be normalized.
    #[error("Unresolvable identifier: {0}")]
    IdentifierResolution(String),

    /// Checkout session state could not be persisted or loaded.
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StoreError),
}

impl CommerceError {
    /// Whether this error means the persisted session id is no longer
    /// honored by the backend and a fresh session must be created.
    #[must_use]
    pub const fn is_session_invalid(&self) -> bool {
        matches!(self, Self::SessionInvalid(_))
    }
}

/// The remote commerce API surface the cart core depends on.
///
/// Four catalog-side concerns (products, variants, prices, images) are
/// read-only denormalized data inside the returned [`Checkout`]; the trait
/// only covers session and line-item lifecycle.
pub trait CommerceBackend: Send + Sync {
    /// Allocate a new checkout session, optionally seeded with lines.
    fn create_checkout(
        &self,
        lines: Vec<LineItemInput>,
    ) -> impl Future<Output = Result<Checkout, CommerceError>> + Send;

    /// Fetch an existing session by id.
    ///
    /// Implementations must return [`CommerceError::SessionInvalid`] when
    /// the backend no longer recognizes the id.
    fn fetch_checkout(
        &self,
        id: &CheckoutId,
    ) -> impl Future<Output = Result<Checkout, CommerceError>> + Send;

    /// Add line items to a session.
    fn add_line_items(
        &self,
        id: &CheckoutId,
        lines: Vec<LineItemInput>,
    ) -> impl Future<Output = Result<Checkout, CommerceError>> + Send;

    /// Set absolute quantities on existing lines.
    fn update_line_items(
        &self,
        id: &CheckoutId,
        updates: Vec<LineItemUpdateInput>,
    ) -> impl Future<Output = Result<Checkout, CommerceError>> + Send;

    /// Remove lines entirely, regardless of quantity.
    fn remove_line_items(
        &self,
        id: &CheckoutId,
        line_ids: Vec<driftwood_core::LineItemId>,
    ) -> impl Future<Output = Result<Checkout, CommerceError>> + Send;
}

/// A GraphQL error returned by the commerce API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut parts = Vec::new();

            if !e.message.is_empty() {
                parts.push(e.message.clone());
            }

            if !e.path.is_empty() {
                let path_str = e
                    .path
                    .iter()
                    .map(|p| match p {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                parts.push(format!("path: {path_str}"));
            }

            if let Some(loc) = e.locations.first() {
                parts.push(format!("at line {}:{}", loc.line, loc.column));
            }

            if parts.is_empty() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                parts.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}
