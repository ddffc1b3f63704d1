//! The cart store end to end: HTTP catalog, file storage, channel notifications.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rocketshoes_cart::catalog::HttpCatalog;
use rocketshoes_cart::config::{CatalogConfig, DEFAULT_STORAGE_KEY};
use rocketshoes_cart::notify::{ChannelNotifier, Notification, NotificationLevel, messages};
use rocketshoes_cart::storage::{FileStore, KeyValueStore};
use rocketshoes_cart::{CartError, CartEvent, CartHandle, CartStore, ErrorKind};
use rocketshoes_core::{Cart, ProductId, UpdateProductAmount};
use rocketshoes_integration_tests::{FakeCatalog, Fault};
use rust_decimal::Decimal;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

struct Shop {
    server: FakeCatalog,
    dir: TempDir,
    notifications: UnboundedReceiver<Notification>,
    cart: CartHandle,
}

impl Shop {
    async fn open() -> Self {
        let server = FakeCatalog::start().await;
        server.insert_product(1, "Tênis de Caminhada Leve Confortável", 179.9, 3);
        server.insert_product(2, "Tênis VR Caminhada Confortável", 139.5, 5);
        server.insert_product(3, "Tênis Adidas Duramo Lite", 219.75, 0);

        let dir = TempDir::new().unwrap();
        let (cart, notifications) = spawn_cart(&server, &dir).await;
        Self {
            server,
            dir,
            notifications,
            cart,
        }
    }

    /// A second store over the same catalog and storage directory.
    async fn reopen(&self) -> CartHandle {
        spawn_cart(&self.server, &self.dir).await.0
    }

    fn drain(&mut self) -> Vec<Notification> {
        let mut received = Vec::new();
        while let Ok(notification) = self.notifications.try_recv() {
            received.push(notification);
        }
        received
    }

    async fn stored_blob(&self) -> Option<String> {
        FileStore::new(self.dir.path())
            .get(DEFAULT_STORAGE_KEY)
            .await
            .unwrap()
    }
}

async fn spawn_cart(
    server: &FakeCatalog,
    dir: &TempDir,
) -> (CartHandle, UnboundedReceiver<Notification>) {
    let catalog = HttpCatalog::new(&CatalogConfig::new(server.base_url())).unwrap();
    let (notifier, rx) = ChannelNotifier::channel();
    let cart = CartStore::new(
        Arc::new(catalog),
        Arc::new(FileStore::new(dir.path())),
        Arc::new(notifier),
    )
    .spawn()
    .await;
    (cart, rx)
}

fn error(message: &str) -> Notification {
    Notification {
        level: NotificationLevel::Error,
        message: message.to_string(),
    }
}

fn success(message: &str) -> Notification {
    Notification {
        level: NotificationLevel::Success,
        message: message.to_string(),
    }
}

fn amounts(cart: &Cart) -> Vec<(i32, u32)> {
    cart.iter()
        .map(|item| (item.product_id().as_i32(), item.amount))
        .collect()
}

#[tokio::test]
async fn test_shopping_session() {
    let mut shop = Shop::open().await;
    assert!(shop.cart.cart().is_empty());
    assert_eq!(shop.stored_blob().await, None);

    let event = shop.cart.add_product(ProductId::new(1)).await.unwrap();
    assert_eq!(event, CartEvent::Added { product_id: ProductId::new(1) });
    assert_eq!(shop.drain(), vec![success(messages::PRODUCT_ADDED)]);

    let event = shop.cart.add_product(ProductId::new(1)).await.unwrap();
    assert_eq!(
        event,
        CartEvent::Incremented { product_id: ProductId::new(1), amount: 2 }
    );
    // Incrementing is silent.
    assert!(shop.drain().is_empty());

    shop.cart.add_product(ProductId::new(2)).await.unwrap();
    shop.cart
        .update_product_amount(UpdateProductAmount { product_id: ProductId::new(2), amount: 4 })
        .await
        .unwrap();
    assert_eq!(amounts(&shop.cart.cart()), vec![(1, 2), (2, 4)]);

    // 2 x 179.90 + 4 x 139.50
    assert_eq!(shop.cart.cart().total(), Decimal::new(91780, 2));
    assert_eq!(shop.cart.cart().total_quantity(), 6);

    shop.cart.remove_product(ProductId::new(1)).await.unwrap();
    assert_eq!(amounts(&shop.cart.cart()), vec![(2, 4)]);

    let stored: Cart = serde_json::from_str(&shop.stored_blob().await.unwrap()).unwrap();
    assert_eq!(stored, shop.cart.cart());
}

#[tokio::test]
async fn test_add_beyond_stock_rejected() {
    let mut shop = Shop::open().await;
    for _ in 0..3 {
        shop.cart.add_product(ProductId::new(1)).await.unwrap();
    }
    shop.drain();
    let requests_before = shop.server.stock_requests();

    let result = shop.cart.add_product(ProductId::new(1)).await;
    match result {
        Err(CartError::OutOfStock { requested, available, .. }) => {
            assert_eq!(requested, 4);
            assert_eq!(available, 3);
        }
        other => panic!("expected OutOfStock, got {other:?}"),
    }

    assert_eq!(shop.server.stock_requests(), requests_before + 1);
    assert_eq!(amounts(&shop.cart.cart()), vec![(1, 3)]);
    assert_eq!(shop.drain(), vec![error(messages::OUT_OF_STOCK)]);
}

#[tokio::test]
async fn test_add_product_with_no_stock() {
    let mut shop = Shop::open().await;

    let err = shop.cart.add_product(ProductId::new(3)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfStock);
    assert!(shop.cart.cart().is_empty());
    assert_eq!(shop.stored_blob().await, None);
    assert_eq!(shop.drain(), vec![error(messages::OUT_OF_STOCK)]);
}

#[tokio::test]
async fn test_unknown_product_reports_add_failure() {
    let mut shop = Shop::open().await;

    let err = shop.cart.add_product(ProductId::new(99)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(shop.cart.cart().is_empty());
    assert_eq!(shop.drain(), vec![error(messages::ADD_FAILED)]);
}

#[tokio::test]
async fn test_update_validations() {
    let mut shop = Shop::open().await;
    shop.cart.add_product(ProductId::new(2)).await.unwrap();
    shop.drain();
    let requests_before = shop.server.stock_requests();

    // Below one is rejected without asking the stock service.
    let err = shop
        .cart
        .update_product_amount(UpdateProductAmount { product_id: ProductId::new(2), amount: 0 })
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::InvalidAmount(0)));
    assert_eq!(shop.server.stock_requests(), requests_before);

    let err = shop
        .cart
        .update_product_amount(UpdateProductAmount { product_id: ProductId::new(2), amount: 6 })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfStock);

    // Exactly the available stock is allowed.
    shop.cart
        .update_product_amount(UpdateProductAmount { product_id: ProductId::new(2), amount: 5 })
        .await
        .unwrap();
    assert_eq!(amounts(&shop.cart.cart()), vec![(2, 5)]);

    assert_eq!(
        shop.drain(),
        vec![error(messages::UPDATE_FAILED), error(messages::OUT_OF_STOCK)]
    );
}

#[tokio::test]
async fn test_remove_missing_product() {
    let mut shop = Shop::open().await;

    let err = shop.cart.remove_product(ProductId::new(1)).await.unwrap_err();
    assert!(matches!(err, CartError::NotInCart(id) if id == ProductId::new(1)));
    assert_eq!(shop.drain(), vec![error(messages::REMOVE_FAILED)]);
}

#[tokio::test]
async fn test_catalog_outage_leaves_cart_unchanged() {
    let mut shop = Shop::open().await;
    shop.cart.add_product(ProductId::new(1)).await.unwrap();
    shop.drain();
    let before = shop.cart.cart();

    shop.server.set_fault(Some(Fault::RateLimited { retry_after: 7 }));
    let err = shop.cart.add_product(ProductId::new(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);

    shop.server.set_fault(Some(Fault::ServerError));
    let err = shop
        .cart
        .update_product_amount(UpdateProductAmount { product_id: ProductId::new(1), amount: 2 })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);

    assert_eq!(shop.cart.cart(), before);
    assert_eq!(
        shop.drain(),
        vec![error(messages::ADD_FAILED), error(messages::UPDATE_FAILED)]
    );

    // Recovers once the catalog does.
    shop.server.set_fault(None);
    shop.cart.add_product(ProductId::new(1)).await.unwrap();
    assert_eq!(amounts(&shop.cart.cart()), vec![(1, 2)]);
}

#[tokio::test]
async fn test_stock_drop_between_operations() {
    let mut shop = Shop::open().await;
    shop.cart.add_product(ProductId::new(2)).await.unwrap();
    shop.drain();

    shop.server.set_stock(2, 1);
    let err = shop.cart.add_product(ProductId::new(2)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfStock);
    assert_eq!(amounts(&shop.cart.cart()), vec![(2, 1)]);
    assert_eq!(shop.drain(), vec![error(messages::OUT_OF_STOCK)]);
}

#[tokio::test]
async fn test_cart_survives_restart() {
    let shop = Shop::open().await;
    shop.cart.add_product(ProductId::new(2)).await.unwrap();
    shop.cart.add_product(ProductId::new(1)).await.unwrap();
    shop.cart
        .update_product_amount(UpdateProductAmount { product_id: ProductId::new(2), amount: 3 })
        .await
        .unwrap();

    let reopened = shop.reopen().await;
    assert_eq!(reopened.cart(), shop.cart.cart());
    assert_eq!(amounts(&reopened.cart()), vec![(2, 3), (1, 1)]);

    // The restored cart keeps working against live stock.
    reopened.add_product(ProductId::new(1)).await.unwrap();
    assert_eq!(amounts(&reopened.cart()), vec![(2, 3), (1, 2)]);
}

#[tokio::test]
async fn test_concurrent_adds_respect_stock() {
    let mut shop = Shop::open().await;

    let adds = (0..6).map(|_| {
        let cart = shop.cart.clone();
        tokio::spawn(async move { cart.add_product(ProductId::new(1)).await })
    });
    let mut added = 0;
    for handle in adds.collect::<Vec<_>>() {
        if handle.await.unwrap().is_ok() {
            added += 1;
        }
    }

    assert_eq!(added, 3);
    assert_eq!(amounts(&shop.cart.cart()), vec![(1, 3)]);

    let notifications = shop.drain();
    assert_eq!(notifications.len(), 4);
    assert_eq!(
        notifications
            .iter()
            .filter(|n| n == &&success(messages::PRODUCT_ADDED))
            .count(),
        1
    );
    assert_eq!(
        notifications
            .iter()
            .filter(|n| n == &&error(messages::OUT_OF_STOCK))
            .count(),
        3
    );
}

#[tokio::test]
async fn test_corrupt_blob_starts_empty() {
    let server = FakeCatalog::start().await;
    server.insert_product(1, "Tênis de Caminhada Leve Confortável", 179.9, 3);
    let dir = TempDir::new().unwrap();
    FileStore::new(dir.path())
        .set(DEFAULT_STORAGE_KEY, "{not a cart")
        .await
        .unwrap();

    let (cart, _rx) = spawn_cart(&server, &dir).await;
    assert!(cart.cart().is_empty());

    cart.add_product(ProductId::new(1)).await.unwrap();
    assert_eq!(amounts(&cart.cart()), vec![(1, 1)]);
}
