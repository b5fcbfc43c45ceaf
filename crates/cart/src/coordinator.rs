//! Cart state coordination and change notification.
//!
//! [`CartCoordinator`] is the single owner of the displayed cart. It
//! serializes mutations through a per-session queue, adopts the backend's
//! authoritative response after every settled operation, and pushes each
//! state transition to subscribers. Failures degrade to the last known
//! good cart; the coordinator never panics and never leaves the cart
//! stuck in a loading state.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use driftwood_core::LineItemId;

use crate::checkout::CheckoutClient;
use crate::commerce::types::Checkout;
use crate::commerce::{CommerceBackend, CommerceError};
use crate::storage::CheckoutStore;

/// Where the cart currently is in its lifecycle.
///
/// Exactly one state holds at a time. `Mutating` and `Refetching` are the
/// only loading states; `Failed` is a resting state that keeps the last
/// known good cart on display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartState {
    /// Nothing in flight.
    Idle,
    /// A line-item mutation is in flight.
    Mutating,
    /// A refetch of the authoritative cart is in flight.
    Refetching,
    /// The last operation failed; the displayed cart is stale but valid.
    Failed {
        /// Human-readable description of the failure.
        message: String,
    },
}

impl CartState {
    /// True while a backend call is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Mutating | Self::Refetching)
    }
}

/// Immutable view of the cart handed to subscribers and callers.
#[derive(Debug, Clone)]
pub struct CartSnapshot {
    /// Last known authoritative checkout.
    pub checkout: Checkout,
    /// Current lifecycle state.
    pub state: CartState,
    /// Set when the displayed cart may lag the backend and should be
    /// refetched before the next mutation.
    pub is_outdated: bool,
    /// Message from the most recent failure, if any.
    pub last_error: Option<String>,
}

impl CartSnapshot {
    fn empty() -> Self {
        Self {
            checkout: Checkout::empty(),
            state: CartState::Idle,
            is_outdated: false,
            last_error: None,
        }
    }

    /// Total units across all line items. Always derived, never stored.
    #[must_use]
    pub fn cart_count(&self) -> u32 {
        self.checkout.total_quantity()
    }

    /// True while a backend call is in flight.
    #[must_use]
    pub const fn loading(&self) -> bool {
        self.state.is_loading()
    }
}

/// Failure starting the hosted checkout redirect.
///
/// The display string is the one user-facing error this crate mandates.
#[derive(Debug, Error)]
#[error("Something went wrong. Please try again.")]
pub struct CheckoutError {
    #[source]
    source: CommerceError,
}

impl CheckoutError {
    /// The underlying commerce failure, for logs.
    #[must_use]
    pub const fn commerce_error(&self) -> &CommerceError {
        &self.source
    }
}

type SubscriberFn = Arc<dyn Fn(&CartSnapshot) + Send + Sync>;

/// Subscriber registry, shared between the coordinator and the RAII
/// subscription handles.
struct Registry {
    subscribers: Mutex<Vec<(u64, SubscriberFn)>>,
    next_id: AtomicU64,
}

impl Registry {
    fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    fn add(self: &Arc<Self>, callback: SubscriberFn) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, callback));
        Subscription {
            registry: Arc::downgrade(self),
            id,
        }
    }

    fn remove(&self, id: u64) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(sub_id, _)| *sub_id != id);
    }

    fn notify(&self, snapshot: &CartSnapshot) {
        let subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for (_, callback) in subscribers {
            callback(snapshot);
        }
    }
}

/// Handle to an active subscription. Dropping it unsubscribes.
pub struct Subscription {
    registry: Weak<Registry>,
    id: u64,
}

impl Subscription {
    /// Unsubscribe explicitly. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Owner of the displayed cart state.
///
/// Cheaply cloneable; all clones share the snapshot, the subscriber
/// registry, and the mutation queue.
pub struct CartCoordinator<B, S> {
    inner: Arc<CoordinatorInner<B, S>>,
}

impl<B, S> Clone for CartCoordinator<B, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<B, S> {
    client: CheckoutClient<B, S>,
    snapshot: Mutex<CartSnapshot>,
    registry: Arc<Registry>,
    // Serializes mutations and refreshes per session, FIFO.
    op_queue: tokio::sync::Mutex<()>,
}

impl<B, S> CartCoordinator<B, S>
where
    B: CommerceBackend,
    S: CheckoutStore,
{
    /// Create a coordinator over a checkout client. The cart starts empty
    /// and idle; call [`refresh`](Self::refresh) to load the persisted
    /// session's contents.
    pub fn new(client: CheckoutClient<B, S>) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                client,
                snapshot: Mutex::new(CartSnapshot::empty()),
                registry: Arc::new(Registry::new()),
                op_queue: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn get_snapshot(&self) -> CartSnapshot {
        self.inner
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Total units across all line items.
    #[must_use]
    pub fn cart_count(&self) -> u32 {
        self.get_snapshot().cart_count()
    }

    /// True while a backend call is in flight.
    #[must_use]
    pub fn loading(&self) -> bool {
        self.get_snapshot().loading()
    }

    /// Register a callback invoked with the new snapshot after every
    /// state transition. The returned handle unsubscribes on drop.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&CartSnapshot) + Send + Sync + 'static,
    {
        self.inner.registry.add(Arc::new(callback))
    }

    /// Apply a change to the snapshot and notify subscribers.
    fn transition(&self, apply: impl FnOnce(&mut CartSnapshot)) -> CartSnapshot {
        let updated = {
            let mut snapshot = self
                .inner
                .snapshot
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            apply(&mut snapshot);
            snapshot.clone()
        };
        self.inner.registry.notify(&updated);
        updated
    }

    /// Run one queued operation with the stuck-loading guard armed.
    ///
    /// Refreshes first when the cart is marked outdated, then hands the
    /// reconciled snapshot to the operation. The guard restores `Idle` if
    /// the future is dropped mid-flight, so the cart can never rest in a
    /// loading state.
    async fn run_queued<F, Fut>(&self, loading_state: CartState, op: F) -> CartSnapshot
    where
        F: FnOnce(CheckoutClient<B, S>, CartSnapshot) -> Fut,
        Fut: Future<Output = Result<Checkout, CommerceError>>,
    {
        let _queued = self.inner.op_queue.lock().await;
        let _guard = SettleGuard { coordinator: self };

        if self.get_snapshot().is_outdated {
            match self.inner.client.fetch_checkout().await {
                Ok(checkout) => {
                    self.transition(|s| {
                        s.checkout = checkout;
                        s.is_outdated = false;
                    });
                }
                Err(err) => {
                    warn!(error = %err, "Pre-mutation refresh failed; continuing with stale cart");
                }
            }
        }

        let current = self.transition(|s| s.state = loading_state);

        match op(self.inner.client.clone(), current).await {
            Ok(checkout) => {
                debug!(items = checkout.line_items.len(), "Adopting authoritative cart");
                self.transition(|s| {
                    s.checkout = checkout;
                    s.state = CartState::Idle;
                    s.is_outdated = false;
                    s.last_error = None;
                })
            }
            Err(CommerceError::IdentifierResolution(detail)) => {
                // Malformed reference: logged no-op, cart unchanged.
                warn!(detail = %detail, "Ignoring unresolvable item reference");
                self.transition(|s| s.state = CartState::Idle)
            }
            Err(err) => {
                warn!(error = %err, "Cart operation failed; keeping last known good cart");
                let message = err.to_string();
                self.transition(|s| {
                    s.state = CartState::Failed {
                        message: message.clone(),
                    };
                    s.last_error = Some(message);
                })
            }
        }
    }

    /// Add one unit of a variant. Accepts raw ids, `gid://` URLs, and
    /// base64-encoded `gid://` URLs.
    #[instrument(skip(self))]
    pub async fn add_line_item(&self, variant_ref: &str) -> CartSnapshot {
        let variant_ref = variant_ref.to_string();
        self.run_queued(CartState::Mutating, move |client, _| async move {
            client.add_line_item(&variant_ref).await
        })
        .await
    }

    /// Remove a line entirely.
    #[instrument(skip(self), fields(line_id = %id))]
    pub async fn remove_line_item(&self, id: &LineItemId) -> CartSnapshot {
        let id = id.clone();
        self.run_queued(CartState::Mutating, move |client, _| async move {
            client.remove_line_item(&id).await
        })
        .await
    }

    /// Raise a line's quantity by one. The current quantity is read from
    /// the reconciled snapshot so the absolute update reflects what the
    /// user sees.
    #[instrument(skip(self), fields(line_id = %id))]
    pub async fn increment_line_item(&self, id: &LineItemId) -> CartSnapshot {
        let id = id.clone();
        self.run_queued(CartState::Mutating, move |client, snapshot| async move {
            client.increment(&id, line_quantity(&snapshot, &id)).await
        })
        .await
    }

    /// Lower a line's quantity by one; at quantity one the line is
    /// removed.
    #[instrument(skip(self), fields(line_id = %id))]
    pub async fn decrement_line_item(&self, id: &LineItemId) -> CartSnapshot {
        let id = id.clone();
        self.run_queued(CartState::Mutating, move |client, snapshot| async move {
            client.decrement(&id, line_quantity(&snapshot, &id)).await
        })
        .await
    }

    /// Refetch the authoritative cart, clearing the outdated flag.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> CartSnapshot {
        let _queued = self.inner.op_queue.lock().await;
        let _guard = SettleGuard { coordinator: self };

        self.transition(|s| s.state = CartState::Refetching);

        match self.inner.client.fetch_checkout().await {
            Ok(checkout) => self.transition(|s| {
                s.checkout = checkout;
                s.state = CartState::Idle;
                s.is_outdated = false;
                s.last_error = None;
            }),
            Err(err) => {
                warn!(error = %err, "Cart refresh failed; keeping last known good cart");
                let message = err.to_string();
                self.transition(|s| {
                    s.state = CartState::Failed {
                        message: message.clone(),
                    };
                    s.last_error = Some(message);
                })
            }
        }
    }

    /// Flag the displayed cart as possibly stale. The next mutation or
    /// [`refresh`](Self::refresh) reconciles it. Page-navigation hook.
    pub fn mark_outdated(&self) {
        self.transition(|s| s.is_outdated = true);
    }

    /// Resolve the hosted checkout URL for final payment.
    ///
    /// Ensures the session is current and returns its web URL; the
    /// caller performs the navigation. No loading state is parked here
    /// since a successful call leaves the page.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`], whose display string is the mandated
    /// user-facing failure message. The underlying cause is logged.
    #[instrument(skip(self))]
    pub async fn begin_checkout(&self) -> Result<Url, CheckoutError> {
        let _queued = self.inner.op_queue.lock().await;

        let result = async {
            let checkout = self.inner.client.fetch_checkout().await?;
            let url = Url::parse(&checkout.web_url).map_err(|e| {
                CommerceError::InvalidData(format!("invalid checkout URL: {e}"))
            })?;
            self.transition(|s| {
                s.checkout = checkout;
                s.is_outdated = false;
            });
            Ok(url)
        }
        .await;

        result.map_err(|source: CommerceError| {
            warn!(error = %source, "Failed to start hosted checkout");
            CheckoutError { source }
        })
    }

    /// Reset the displayed cart after order completion.
    ///
    /// The order-confirmation page calls this unconditionally on mount.
    /// Only display state is cleared; the persisted session reference is
    /// left alone and the next refresh reconciles with the backend.
    pub fn clear_after_order(&self) -> CartSnapshot {
        self.transition(|s| {
            s.checkout = Checkout::empty();
            s.state = CartState::Idle;
            s.is_outdated = true;
            s.last_error = None;
        })
    }
}

fn line_quantity(snapshot: &CartSnapshot, id: &LineItemId) -> u32 {
    snapshot.checkout.line(id).map_or(1, |line| line.quantity)
}

/// Restores a resting state if an operation's future is dropped while a
/// loading state is set.
struct SettleGuard<'a, B, S>
where
    B: CommerceBackend,
    S: CheckoutStore,
{
    coordinator: &'a CartCoordinator<B, S>,
}

impl<B, S> Drop for SettleGuard<'_, B, S>
where
    B: CommerceBackend,
    S: CheckoutStore,
{
    fn drop(&mut self) {
        let snapshot = self.coordinator.get_snapshot();
        if snapshot.loading() {
            self.coordinator.transition(|s| {
                if s.state.is_loading() {
                    s.state = CartState::Idle;
                }
            });
        }
    }
}
