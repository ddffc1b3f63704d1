//! The cart store.
//!
//! A single actor task owns the cart. [`CartHandle`]s send it commands over a
//! bounded channel and await the reply, so mutations are applied one at a
//! time and each sees the result of the previous one. Stock lookups happen
//! inside the actor for the same reason: two adds racing on the network can't
//! both compute their update from the same stale cart.
//!
//! Each command either commits (persist, then replace the in-memory cart and
//! publish it) or leaves everything as it was. Failures are returned to the
//! caller and reported to the notification sink.
//!
//! ```text
//!   CartHandle ──Command──▶ mpsc ──▶ CartActor ──▶ Catalog (stock, product)
//!        ▲                              │
//!        └──────── oneshot reply ◀──────┤──▶ KeyValueStore (set)
//!   watch::Receiver<Cart> ◀── publish ──┘──▶ NotificationSink
//! ```

use std::sync::Arc;

use rocketshoes_core::{Cart, LineItem, ProductId, UpdateProductAmount};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, instrument, warn};

use crate::catalog::Catalog;
use crate::config::DEFAULT_STORAGE_KEY;
use crate::error::{CartError, Result};
use crate::notify::{NotificationSink, messages};
use crate::storage::{KeyValueStore, StorageError};

const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// What a successful command changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartEvent {
    /// New line item appended at amount 1.
    Added { product_id: ProductId },
    /// Existing line item's amount went up by one.
    Incremented { product_id: ProductId, amount: u32 },
    /// Line item removed.
    Removed { product_id: ProductId },
    /// Line item's amount replaced.
    AmountUpdated { product_id: ProductId, amount: u32 },
}

type Reply = oneshot::Sender<Result<CartEvent>>;

#[derive(Debug)]
enum Command {
    Add {
        product_id: ProductId,
        reply: Reply,
    },
    Remove {
        product_id: ProductId,
        reply: Reply,
    },
    UpdateAmount {
        request: UpdateProductAmount,
        reply: Reply,
    },
}

// =============================================================================
// CartStore
// =============================================================================

/// Assembles the cart actor from its collaborators.
pub struct CartStore {
    catalog: Arc<dyn Catalog>,
    storage: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn NotificationSink>,
    key: String,
    queue_capacity: usize,
}

impl CartStore {
    /// Create a store using the default storage key and queue capacity.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn Catalog>,
        storage: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            catalog,
            storage,
            notifier,
            key: DEFAULT_STORAGE_KEY.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Store the cart under `key` instead of the default.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Bound the number of commands waiting for the actor (minimum 1).
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Load the stored cart and start the actor.
    ///
    /// Must be called from within a Tokio runtime. The actor stops once every
    /// handle has been dropped.
    pub async fn spawn(self) -> CartHandle {
        let cart = load_cart(self.storage.as_ref(), &self.key).await;
        info!(key = %self.key, items = cart.len(), "Cart store started");

        let (state, state_rx) = watch::channel(cart.clone());
        let (commands, commands_rx) = mpsc::channel(self.queue_capacity);

        let actor = CartActor {
            catalog: self.catalog,
            storage: self.storage,
            notifier: self.notifier,
            key: self.key,
            cart,
            state,
        };
        tokio::spawn(actor.run(commands_rx));

        CartHandle {
            commands,
            state: state_rx,
        }
    }
}

/// Read and sanitize the stored cart. Anything unreadable yields an empty cart.
async fn load_cart(storage: &dyn KeyValueStore, key: &str) -> Cart {
    let blob = match storage.get(key).await {
        Ok(Some(blob)) => blob,
        Ok(None) => return Cart::new(),
        Err(e) => {
            warn!(error = %e, "Failed to read stored cart, starting empty");
            return Cart::new();
        }
    };

    match serde_json::from_str::<Vec<LineItem>>(&blob) {
        Ok(items) => {
            let (cart, dropped) = Cart::normalize(items);
            if dropped > 0 {
                warn!(dropped, "Dropped duplicate or empty line items from stored cart");
            }
            cart
        }
        Err(e) => {
            warn!(error = %e, "Stored cart is unreadable, starting empty");
            Cart::new()
        }
    }
}

// =============================================================================
// CartHandle
// =============================================================================

/// Cloneable access to a running cart store.
#[derive(Debug, Clone)]
pub struct CartHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<Cart>,
}

impl CartHandle {
    /// The last committed cart.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.state.borrow().clone()
    }

    /// Observe every committed cart.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.state.clone()
    }

    /// Add one unit of a product, appending it if it isn't in the cart yet.
    ///
    /// # Errors
    ///
    /// - [`CartError::OutOfStock`] if stock doesn't cover one more unit
    /// - [`CartError::Catalog`] if the product or stock lookup fails
    /// - [`CartError::Storage`] if the cart can't be persisted
    pub async fn add_product(&self, product_id: ProductId) -> Result<CartEvent> {
        self.request(|reply| Command::Add { product_id, reply })
            .await
    }

    /// Remove a product's line item.
    ///
    /// # Errors
    ///
    /// - [`CartError::NotInCart`] if the product has no line item
    /// - [`CartError::Storage`] if the cart can't be persisted
    pub async fn remove_product(&self, product_id: ProductId) -> Result<CartEvent> {
        self.request(|reply| Command::Remove { product_id, reply })
            .await
    }

    /// Set a line item's amount, checked against current stock.
    ///
    /// # Errors
    ///
    /// - [`CartError::InvalidAmount`] if `amount < 1`
    /// - [`CartError::NotInCart`] if the product has no line item
    /// - [`CartError::OutOfStock`] if stock is below `amount`
    /// - [`CartError::Catalog`] if the stock lookup fails
    /// - [`CartError::Storage`] if the cart can't be persisted
    pub async fn update_product_amount(&self, request: UpdateProductAmount) -> Result<CartEvent> {
        self.request(|reply| Command::UpdateAmount { request, reply })
            .await
    }

    async fn request(&self, command: impl FnOnce(Reply) -> Command) -> Result<CartEvent> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| CartError::StoreClosed)?;
        response.await.map_err(|_| CartError::StoreClosed)?
    }
}

// =============================================================================
// CartActor
// =============================================================================

struct CartActor {
    catalog: Arc<dyn Catalog>,
    storage: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn NotificationSink>,
    key: String,
    cart: Cart,
    state: watch::Sender<Cart>,
}

impl CartActor {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        while let Some(command) = commands.recv().await {
            // A caller that stopped waiting doesn't cancel the command.
            match command {
                Command::Add { product_id, reply } => {
                    let _ = reply.send(self.add_product(product_id).await);
                }
                Command::Remove { product_id, reply } => {
                    let _ = reply.send(self.remove_product(product_id).await);
                }
                Command::UpdateAmount { request, reply } => {
                    let _ = reply.send(self.update_product_amount(request).await);
                }
            }
        }
        debug!("Cart store stopped");
    }

    #[instrument(skip_all, fields(product_id = %product_id))]
    async fn add_product(&mut self, product_id: ProductId) -> Result<CartEvent> {
        let result = self.try_add_product(product_id).await;
        match &result {
            Ok(CartEvent::Added { .. }) => self.notifier.success(messages::PRODUCT_ADDED),
            Ok(_) => {}
            Err(e) => self.report(e, messages::ADD_FAILED),
        }
        result
    }

    async fn try_add_product(&mut self, product_id: ProductId) -> Result<CartEvent> {
        if let Some(current) = self.cart.get(product_id).map(|item| item.amount) {
            let stock = self.catalog.stock(product_id).await?;
            if stock.available_amount <= current {
                return Err(CartError::OutOfStock {
                    product_id,
                    requested: u64::from(current) + 1,
                    available: stock.available_amount,
                });
            }

            // current < available <= u32::MAX
            let amount = current + 1;
            let cart = self
                .cart
                .with_amount(product_id, amount)
                .ok_or(CartError::NotInCart(product_id))?;
            self.commit(cart).await?;
            return Ok(CartEvent::Incremented { product_id, amount });
        }

        let (product, stock) = tokio::try_join!(
            self.catalog.product(product_id),
            self.catalog.stock(product_id)
        )?;
        if stock.available_amount == 0 {
            return Err(CartError::OutOfStock {
                product_id,
                requested: 1,
                available: 0,
            });
        }

        let cart = self
            .cart
            .with_added(product)
            .ok_or(CartError::NotInCart(product_id))?;
        self.commit(cart).await?;
        Ok(CartEvent::Added { product_id })
    }

    #[instrument(skip_all, fields(product_id = %product_id))]
    async fn remove_product(&mut self, product_id: ProductId) -> Result<CartEvent> {
        let result = match self.cart.without(product_id) {
            Some(cart) => self
                .commit(cart)
                .await
                .map(|()| CartEvent::Removed { product_id }),
            None => Err(CartError::NotInCart(product_id)),
        };
        if let Err(e) = &result {
            self.report(e, messages::REMOVE_FAILED);
        }
        result
    }

    #[instrument(skip_all, fields(product_id = %request.product_id, amount = request.amount))]
    async fn update_product_amount(&mut self, request: UpdateProductAmount) -> Result<CartEvent> {
        let result = self.try_update_product_amount(request).await;
        if let Err(e) = &result {
            self.report(e, messages::UPDATE_FAILED);
        }
        result
    }

    async fn try_update_product_amount(
        &mut self,
        UpdateProductAmount { product_id, amount }: UpdateProductAmount,
    ) -> Result<CartEvent> {
        let requested = u64::try_from(amount)
            .ok()
            .filter(|&requested| requested >= 1)
            .ok_or(CartError::InvalidAmount(amount))?;

        if !self.cart.contains(product_id) {
            return Err(CartError::NotInCart(product_id));
        }

        let stock = self.catalog.stock(product_id).await?;
        if requested > u64::from(stock.available_amount) {
            return Err(CartError::OutOfStock {
                product_id,
                requested,
                available: stock.available_amount,
            });
        }

        // requested <= available, so it fits
        let amount = u32::try_from(requested).map_err(|_| CartError::InvalidAmount(amount))?;
        let cart = self
            .cart
            .with_amount(product_id, amount)
            .ok_or(CartError::NotInCart(product_id))?;
        self.commit(cart).await?;
        Ok(CartEvent::AmountUpdated { product_id, amount })
    }

    /// Persist `cart`, then make it the current cart.
    async fn commit(&mut self, cart: Cart) -> Result<()> {
        let blob = serde_json::to_string(&cart).map_err(StorageError::from)?;
        self.storage.set(&self.key, &blob).await?;

        debug!(items = cart.len(), "Cart committed");
        self.state.send_replace(cart.clone());
        self.cart = cart;
        Ok(())
    }

    /// Log a failure and tell the user.
    fn report(&self, error: &CartError, fallback: &str) {
        let message = match error {
            CartError::OutOfStock { .. } => messages::OUT_OF_STOCK,
            _ => fallback,
        };
        warn!(error = %error, kind = ?error.kind(), "Cart operation failed");
        self.notifier.error(message);
    }
}
