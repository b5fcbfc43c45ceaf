//! Test support for the Driftwood cart.
//!
//! [`MockBackend`] is an in-memory stand-in for the Storefront API with
//! the same observable semantics: opaque session ids, merge-on-add for
//! repeated variants, absolute quantity updates, and scripted failures
//! (session invalidation, mutation rejection) for exercising the
//! coordinator's degradation paths.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use rust_decimal::Decimal;

use driftwood_cart::commerce::types::{
    Checkout, LineItem, LineItemInput, LineItemUpdateInput,
};
use driftwood_cart::{CommerceBackend, CommerceError};
use driftwood_core::{CheckoutId, LineItemId, Money, VariantId};

/// Unit price every mock variant sells for.
const UNIT_PRICE_CENTS: i64 = 2500;

#[derive(Debug, Clone)]
struct MockLine {
    id: LineItemId,
    variant_id: VariantId,
    quantity: u32,
}

#[derive(Debug, Default)]
struct MockState {
    carts: HashMap<CheckoutId, Vec<MockLine>>,
    fail_mutations_with: Option<String>,
    next_cart: u64,
    next_line: u64,
    create_calls: u64,
}

/// Scriptable in-memory commerce backend.
///
/// Cheaply cloneable; all clones share one state.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the backend reject the given session id from now on, as a
    /// real backend does for expired or completed checkouts.
    pub fn reject_session(&self, id: &CheckoutId) {
        self.lock().carts.remove(id);
    }

    /// Make every subsequent mutation fail with a user error.
    pub fn fail_mutations(&self, message: &str) {
        self.lock().fail_mutations_with = Some(message.to_string());
    }

    /// Stop failing mutations.
    pub fn heal(&self) {
        self.lock().fail_mutations_with = None;
    }

    /// How many sessions have been created.
    #[must_use]
    pub fn create_calls(&self) -> u64 {
        self.lock().create_calls
    }

    fn render(id: &CheckoutId, lines: &[MockLine]) -> Checkout {
        let unit = Decimal::new(UNIT_PRICE_CENTS, 2);
        let line_items: Vec<LineItem> = lines
            .iter()
            .map(|line| LineItem {
                id: line.id.clone(),
                variant_id: line.variant_id.clone(),
                quantity: line.quantity,
                title: format!("Print {}", line.variant_id),
                variant_title: None,
                unit_price: Money::new(unit, "USD"),
                line_price: Money::new(unit * Decimal::from(line.quantity), "USD"),
                image: None,
            })
            .collect();
        let subtotal = line_items
            .iter()
            .fold(Decimal::ZERO, |acc, line| acc + line.line_price.amount);
        Checkout {
            id: id.clone(),
            web_url: format!("https://shop.example/checkout/{id}"),
            line_items,
            subtotal: Money::new(subtotal, "USD"),
            total: Money::new(subtotal, "USD"),
        }
    }

    fn mutate(
        &self,
        id: &CheckoutId,
        apply: impl FnOnce(&mut MockState, &mut Vec<MockLine>),
    ) -> Result<Checkout, CommerceError> {
        let mut state = self.lock();
        if let Some(message) = state.fail_mutations_with.clone() {
            return Err(CommerceError::UserError(message));
        }
        let mut lines = state
            .carts
            .remove(id)
            .ok_or_else(|| CommerceError::SessionInvalid(id.clone()))?;
        apply(&mut state, &mut lines);
        state.carts.insert(id.clone(), lines.clone());
        Ok(Self::render(id, &lines))
    }
}

fn add_lines(state: &mut MockState, lines: &mut Vec<MockLine>, inputs: Vec<LineItemInput>) {
    for input in inputs {
        if let Some(existing) = lines
            .iter_mut()
            .find(|line| line.variant_id == input.variant_id)
        {
            existing.quantity += input.quantity;
        } else {
            state.next_line += 1;
            lines.push(MockLine {
                id: LineItemId::new(format!("line_{}", state.next_line)),
                variant_id: input.variant_id,
                quantity: input.quantity,
            });
        }
    }
}

impl CommerceBackend for MockBackend {
    async fn create_checkout(
        &self,
        inputs: Vec<LineItemInput>,
    ) -> Result<Checkout, CommerceError> {
        let mut state = self.lock();
        if let Some(message) = state.fail_mutations_with.clone() {
            return Err(CommerceError::UserError(message));
        }
        state.next_cart += 1;
        state.create_calls += 1;
        let id = CheckoutId::new(format!("cart_{}", state.next_cart));
        let mut lines = Vec::new();
        add_lines(&mut state, &mut lines, inputs);
        state.carts.insert(id.clone(), lines.clone());
        Ok(Self::render(&id, &lines))
    }

    async fn fetch_checkout(&self, id: &CheckoutId) -> Result<Checkout, CommerceError> {
        let state = self.lock();
        state
            .carts
            .get(id)
            .map(|lines| Self::render(id, lines))
            .ok_or_else(|| CommerceError::SessionInvalid(id.clone()))
    }

    async fn add_line_items(
        &self,
        id: &CheckoutId,
        inputs: Vec<LineItemInput>,
    ) -> Result<Checkout, CommerceError> {
        self.mutate(id, |state, lines| add_lines(state, lines, inputs))
    }

    async fn update_line_items(
        &self,
        id: &CheckoutId,
        updates: Vec<LineItemUpdateInput>,
    ) -> Result<Checkout, CommerceError> {
        self.mutate(id, |_, lines| {
            for update in updates {
                if update.quantity == 0 {
                    lines.retain(|line| line.id != update.id);
                } else if let Some(line) = lines.iter_mut().find(|line| line.id == update.id) {
                    line.quantity = update.quantity;
                }
            }
        })
    }

    async fn remove_line_items(
        &self,
        id: &CheckoutId,
        line_ids: Vec<LineItemId>,
    ) -> Result<Checkout, CommerceError> {
        self.mutate(id, |_, lines| {
            lines.retain(|line| !line_ids.contains(&line.id));
        })
    }
}
