//! Checkout session lifecycle and line-item operations.
//!
//! [`CheckoutClient`] owns the persisted session reference and translates
//! cart intents (add, remove, step quantity) into backend calls. It holds
//! no cart state of its own: every operation returns the backend's
//! authoritative [`Checkout`] and the caller decides what to display.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, instrument, warn};

use driftwood_core::{CheckoutId, LineItemId, VariantId};

use crate::commerce::types::{Checkout, LineItemInput, LineItemUpdateInput};
use crate::commerce::{CommerceBackend, CommerceError};
use crate::ids::normalize_reference;
use crate::storage::{CheckoutStore, PersistedCheckout};

/// Cached copy of the persisted session reference.
#[derive(Debug, Clone)]
struct SessionRef {
    id: CheckoutId,
    web_url: Option<String>,
}

/// Client for one checkout session.
///
/// Cheaply cloneable; all clones share the session cache and store.
pub struct CheckoutClient<B, S> {
    inner: Arc<CheckoutClientInner<B, S>>,
}

impl<B, S> Clone for CheckoutClient<B, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CheckoutClientInner<B, S> {
    backend: B,
    store: S,
    // In-process cache over the store; the store stays authoritative
    // across restarts.
    session: Mutex<Option<SessionRef>>,
}

impl<B, S> CheckoutClient<B, S>
where
    B: CommerceBackend,
    S: CheckoutStore,
{
    /// Create a client over a backend and a session store.
    pub fn new(backend: B, store: S) -> Self {
        Self {
            inner: Arc::new(CheckoutClientInner {
                backend,
                store,
                session: Mutex::new(None),
            }),
        }
    }

    /// The current session id, if one exists in cache or storage.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::Storage`] if the store cannot be read.
    pub fn session_id(&self) -> Result<Option<CheckoutId>, CommerceError> {
        Ok(self.session_ref()?.map(|s| s.id))
    }

    fn session_ref(&self) -> Result<Option<SessionRef>, CommerceError> {
        let mut cache = self
            .inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = cache.as_ref() {
            return Ok(Some(session.clone()));
        }

        let Some(persisted) = self.inner.store.load()? else {
            return Ok(None);
        };
        let session = SessionRef {
            id: persisted.checkout_session_id,
            web_url: persisted.checkout_web_url,
        };
        *cache = Some(session.clone());
        Ok(Some(session))
    }

    fn remember_session(&self, checkout: &Checkout) -> Result<(), CommerceError> {
        let session = SessionRef {
            id: checkout.id.clone(),
            web_url: Some(checkout.web_url.clone()),
        };
        self.inner.store.save(&PersistedCheckout {
            checkout_session_id: session.id.clone(),
            checkout_web_url: session.web_url.clone(),
        })?;
        *self
            .inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(session);
        Ok(())
    }

    fn forget_session(&self) -> Result<(), CommerceError> {
        self.inner.store.clear()?;
        *self
            .inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    /// Ensure a checkout session exists and return its current contents.
    ///
    /// Reuses the cached or persisted session when present; otherwise
    /// creates an empty one. Idempotent: calling it again returns the same
    /// session.
    ///
    /// # Errors
    ///
    /// Propagates backend and storage failures.
    #[instrument(skip(self))]
    pub async fn init(&self) -> Result<Checkout, CommerceError> {
        if self.session_ref()?.is_some() {
            return self.fetch_checkout().await;
        }
        self.create_checkout().await
    }

    /// Create a fresh empty checkout session and persist its reference.
    ///
    /// # Errors
    ///
    /// Propagates backend and storage failures. No retry at this layer.
    #[instrument(skip(self))]
    pub async fn create_checkout(&self) -> Result<Checkout, CommerceError> {
        let checkout = self.inner.backend.create_checkout(Vec::new()).await?;
        self.remember_session(&checkout)?;
        info!(checkout_id = %checkout.id, "Created checkout session");
        Ok(checkout)
    }

    /// Fetch the current checkout from the backend.
    ///
    /// When the backend rejects the stored session id (expired or
    /// completed), the stale reference is deleted and a fresh empty
    /// session takes its place; the fresh checkout is returned.
    ///
    /// # Errors
    ///
    /// Propagates backend and storage failures other than an invalid
    /// session id, which is recovered here.
    #[instrument(skip(self))]
    pub async fn fetch_checkout(&self) -> Result<Checkout, CommerceError> {
        let Some(session) = self.session_ref()? else {
            return self.create_checkout().await;
        };

        match self.inner.backend.fetch_checkout(&session.id).await {
            Ok(checkout) => Ok(checkout),
            Err(err) if err.is_session_invalid() => {
                warn!(
                    checkout_id = %session.id,
                    "Stored checkout session rejected; starting a fresh one"
                );
                self.forget_session()?;
                self.create_checkout().await
            }
            Err(err) => Err(err),
        }
    }

    /// Add one unit of a variant to the cart.
    ///
    /// `variant_ref` may be a raw id, a `gid://` URL, or a base64-encoded
    /// `gid://` URL. Creates the session with the line when none exists
    /// yet.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::IdentifierResolution`] for a malformed
    /// reference; otherwise propagates backend and storage failures.
    #[instrument(skip(self))]
    pub async fn add_line_item(&self, variant_ref: &str) -> Result<Checkout, CommerceError> {
        let variant_id = VariantId::new(normalize_reference(variant_ref)?);
        let line = LineItemInput {
            variant_id,
            quantity: 1,
        };

        let Some(session) = self.session_ref()? else {
            let checkout = self.inner.backend.create_checkout(vec![line]).await?;
            self.remember_session(&checkout)?;
            info!(checkout_id = %checkout.id, "Created checkout session with first item");
            return Ok(checkout);
        };

        self.inner
            .backend
            .add_line_items(&session.id, vec![line])
            .await
    }

    /// Remove a line entirely, regardless of its quantity.
    ///
    /// # Errors
    ///
    /// Propagates backend and storage failures.
    #[instrument(skip(self), fields(line_id = %id))]
    pub async fn remove_line_item(&self, id: &LineItemId) -> Result<Checkout, CommerceError> {
        let session = self.require_session()?;
        self.inner
            .backend
            .remove_line_items(&session.id, vec![id.clone()])
            .await
    }

    /// Raise a line's quantity by one, setting the absolute value.
    ///
    /// # Errors
    ///
    /// Propagates backend and storage failures.
    #[instrument(skip(self), fields(line_id = %id))]
    pub async fn increment(
        &self,
        id: &LineItemId,
        current: u32,
    ) -> Result<Checkout, CommerceError> {
        let session = self.require_session()?;
        self.inner
            .backend
            .update_line_items(
                &session.id,
                vec![LineItemUpdateInput {
                    id: id.clone(),
                    quantity: current.saturating_add(1),
                }],
            )
            .await
    }

    /// Lower a line's quantity by one. At quantity one or below the line
    /// is removed instead.
    ///
    /// # Errors
    ///
    /// Propagates backend and storage failures.
    #[instrument(skip(self), fields(line_id = %id))]
    pub async fn decrement(
        &self,
        id: &LineItemId,
        current: u32,
    ) -> Result<Checkout, CommerceError> {
        if current <= 1 {
            return self.remove_line_item(id).await;
        }
        let session = self.require_session()?;
        self.inner
            .backend
            .update_line_items(
                &session.id,
                vec![LineItemUpdateInput {
                    id: id.clone(),
                    quantity: current - 1,
                }],
            )
            .await
    }

    fn require_session(&self) -> Result<SessionRef, CommerceError> {
        self.session_ref()?.ok_or_else(|| {
            CommerceError::InvalidData("no checkout session exists".to_string())
        })
    }
}
