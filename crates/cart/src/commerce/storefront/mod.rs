//! Shopify Storefront API backend implementation.
//!
//! Hand-written cart documents POSTed with `reqwest`; responses come back
//! in the standard GraphQL envelope (`graphql_client::Response`). Cart
//! state is mutable and never cached.

mod conversions;
mod wire;

use std::sync::Arc;

use graphql_client::Response;
use secrecy::ExposeSecret;
use tracing::instrument;

use driftwood_core::{CheckoutId, LineItemId};

use crate::config::ShopConfig;

use super::types::{Checkout, LineItemInput, LineItemUpdateInput};
use super::{CommerceBackend, CommerceError, GraphQLError, GraphQLErrorLocation};

use conversions::convert_cart;
use wire::{
    AddLinesData, CartPayload, CreateCartData, GetCartData, Operation, RemoveLinesData,
    UpdateLinesData, expand_cart_gid, expand_line_gid, expand_variant_gid,
};

/// Backend for the Shopify Storefront cart API.
///
/// Cheaply cloneable; all clones share one HTTP connection pool.
#[derive(Clone)]
pub struct StorefrontBackend {
    inner: Arc<StorefrontBackendInner>,
}

struct StorefrontBackendInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl StorefrontBackend {
    /// Create a new Storefront API backend.
    ///
    /// Configuration is validated when [`ShopConfig`] is constructed, so
    /// this cannot fail.
    #[must_use]
    pub fn new(config: &ShopConfig) -> Self {
        Self {
            inner: Arc::new(StorefrontBackendInner {
                client: reqwest::Client::new(),
                endpoint: config.endpoint(),
                access_token: config.storefront_token.expose_secret().to_string(),
            }),
        }
    }

    /// Execute one of the cart documents.
    async fn execute<D: serde::de::DeserializeOwned>(
        &self,
        operation: Operation,
        variables: serde_json::Value,
    ) -> Result<D, CommerceError> {
        let request_body = serde_json::json!({
            "query": operation.document(),
            "variables": variables,
        });

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header(
                "Shopify-Storefront-Private-Token",
                &self.inner.access_token,
            )
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        // Check for rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CommerceError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Storefront API returned non-success status"
            );
            return Err(CommerceError::GraphQL(vec![GraphQLError {
                message: format!(
                    "HTTP {status}: {}",
                    response_text.chars().take(200).collect::<String>()
                ),
                locations: vec![],
                path: vec![],
            }]));
        }

        let response: Response<D> = match serde_json::from_str(&response_text) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse Storefront GraphQL response"
                );
                return Err(CommerceError::Parse(e));
            }
        };

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            tracing::debug!(errors = ?errors, "GraphQL errors in response");

            return Err(CommerceError::GraphQL(
                errors
                    .into_iter()
                    .map(|e| GraphQLError {
                        message: e.message,
                        locations: e.locations.map_or_else(Vec::new, |locs| {
                            locs.into_iter()
                                .map(|l| GraphQLErrorLocation {
                                    line: i64::from(l.line),
                                    column: i64::from(l.column),
                                })
                                .collect()
                        }),
                        path: e.path.map_or_else(Vec::new, |p| {
                            p.into_iter()
                                .map(|fragment| match fragment {
                                    graphql_client::PathFragment::Key(s) => {
                                        serde_json::Value::String(s)
                                    }
                                    graphql_client::PathFragment::Index(i) => {
                                        serde_json::Value::Number(i.into())
                                    }
                                })
                                .collect()
                        }),
                    })
                    .collect(),
            ));
        }

        response.data.ok_or_else(|| {
            tracing::error!(
                body = %response_text.chars().take(500).collect::<String>(),
                "Storefront GraphQL response has no data and no errors"
            );
            CommerceError::GraphQL(vec![GraphQLError {
                message: "No data in response".to_string(),
                locations: vec![],
                path: vec![],
            }])
        })
    }

    /// Unwrap a mutation payload: surface user errors, adopt the cart.
    fn unwrap_payload(
        payload: Option<CartPayload>,
        operation: &str,
    ) -> Result<Checkout, CommerceError> {
        if let Some(payload) = payload {
            if !payload.user_errors.is_empty() {
                return Err(CommerceError::UserError(
                    payload
                        .user_errors
                        .into_iter()
                        .map(|e| e.message)
                        .collect::<Vec<_>>()
                        .join("; "),
                ));
            }

            if let Some(cart) = payload.cart {
                return convert_cart(cart);
            }
        }

        Err(CommerceError::GraphQL(vec![GraphQLError {
            message: format!("Failed to {operation}"),
            locations: vec![],
            path: vec![],
        }]))
    }
}

fn line_inputs_json(lines: &[LineItemInput]) -> serde_json::Value {
    serde_json::Value::Array(
        lines
            .iter()
            .map(|line| {
                serde_json::json!({
                    "merchandiseId": expand_variant_gid(line.variant_id.as_str()),
                    "quantity": line.quantity,
                })
            })
            .collect(),
    )
}

impl CommerceBackend for StorefrontBackend {
    #[instrument(skip(self, lines))]
    async fn create_checkout(
        &self,
        lines: Vec<LineItemInput>,
    ) -> Result<Checkout, CommerceError> {
        let variables = serde_json::json!({
            "input": { "lines": line_inputs_json(&lines) },
        });

        let data: CreateCartData = self.execute(Operation::CreateCart, variables).await?;
        Self::unwrap_payload(data.cart_create, "create checkout")
    }

    #[instrument(skip(self), fields(checkout_id = %id))]
    async fn fetch_checkout(&self, id: &CheckoutId) -> Result<Checkout, CommerceError> {
        let variables = serde_json::json!({
            "cartId": expand_cart_gid(id.as_str()),
        });

        let data: GetCartData = self.execute(Operation::GetCart, variables).await?;

        // A null cart means the backend no longer honors the id
        data.cart.map_or_else(
            || Err(CommerceError::SessionInvalid(id.clone())),
            convert_cart,
        )
    }

    #[instrument(skip(self, lines), fields(checkout_id = %id))]
    async fn add_line_items(
        &self,
        id: &CheckoutId,
        lines: Vec<LineItemInput>,
    ) -> Result<Checkout, CommerceError> {
        let variables = serde_json::json!({
            "cartId": expand_cart_gid(id.as_str()),
            "lines": line_inputs_json(&lines),
        });

        let data: AddLinesData = self.execute(Operation::AddLines, variables).await?;
        Self::unwrap_payload(data.cart_lines_add, "add line items")
    }

    #[instrument(skip(self, updates), fields(checkout_id = %id))]
    async fn update_line_items(
        &self,
        id: &CheckoutId,
        updates: Vec<LineItemUpdateInput>,
    ) -> Result<Checkout, CommerceError> {
        let lines = serde_json::Value::Array(
            updates
                .iter()
                .map(|update| {
                    serde_json::json!({
                        "id": expand_line_gid(update.id.as_str()),
                        "quantity": update.quantity,
                    })
                })
                .collect(),
        );
        let variables = serde_json::json!({
            "cartId": expand_cart_gid(id.as_str()),
            "lines": lines,
        });

        let data: UpdateLinesData = self.execute(Operation::UpdateLines, variables).await?;
        Self::unwrap_payload(data.cart_lines_update, "update line items")
    }

    #[instrument(skip(self, line_ids), fields(checkout_id = %id))]
    async fn remove_line_items(
        &self,
        id: &CheckoutId,
        line_ids: Vec<LineItemId>,
    ) -> Result<Checkout, CommerceError> {
        let variables = serde_json::json!({
            "cartId": expand_cart_gid(id.as_str()),
            "lineIds": line_ids
                .iter()
                .map(|line_id| expand_line_gid(line_id.as_str()))
                .collect::<Vec<_>>(),
        });

        let data: RemoveLinesData = self.execute(Operation::RemoveLines, variables).await?;
        Self::unwrap_payload(data.cart_lines_remove, "remove line items")
    }
}
