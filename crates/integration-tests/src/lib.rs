//! Integration tests for the RocketShoes cart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rocketshoes-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `catalog_client` - `HttpCatalog` against a live HTTP server
//! - `cart_flow` - The cart store end to end: HTTP catalog, file storage, notifications
//!
//! The tests need no external services: [`FakeCatalog`] serves the catalog
//! API from an in-process `axum` server on an ephemeral port.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use url::Url;

/// Misbehavior the fake catalog can be told to exhibit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// 429 with a `Retry-After` header.
    RateLimited { retry_after: u64 },
    /// 500 with a plain-text body.
    ServerError,
    /// 200 with a body that isn't JSON.
    Garbage,
}

#[derive(Default)]
struct CatalogState {
    products: Mutex<HashMap<i32, Value>>,
    stock: Mutex<HashMap<i32, u32>>,
    fault: Mutex<Option<Fault>>,
    last_authorization: Mutex<Option<String>>,
    product_requests: AtomicUsize,
    stock_requests: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CatalogState {
    fn observe(&self, headers: &HeaderMap) -> Option<Response> {
        *lock(&self.last_authorization) = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        lock(&self.fault).map(|fault| match fault {
            Fault::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after.to_string())],
                "slow down",
            )
                .into_response(),
            Fault::ServerError => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
            Fault::Garbage => (StatusCode::OK, "<html>not json</html>").into_response(),
        })
    }
}

async fn product(
    State(state): State<Arc<CatalogState>>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Response {
    state.product_requests.fetch_add(1, Ordering::SeqCst);
    if let Some(response) = state.observe(&headers) {
        return response;
    }

    let found = lock(&state.products).get(&id).cloned();
    match found {
        Some(product) => Json(product).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({}))).into_response(),
    }
}

async fn stock(
    State(state): State<Arc<CatalogState>>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Response {
    state.stock_requests.fetch_add(1, Ordering::SeqCst);
    if let Some(response) = state.observe(&headers) {
        return response;
    }

    let found = lock(&state.stock).get(&id).copied();
    match found {
        Some(amount) => Json(json!({ "id": id, "amount": amount })).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({}))).into_response(),
    }
}

/// An in-process catalog service.
///
/// Serves `GET /products/{id}` and `GET /stock/{id}` until dropped.
pub struct FakeCatalog {
    addr: SocketAddr,
    state: Arc<CatalogState>,
    server: JoinHandle<()>,
}

impl FakeCatalog {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener can't be bound.
    pub async fn start() -> Self {
        let state = Arc::new(CatalogState::default());
        let app = Router::new()
            .route("/products/{id}", get(product))
            .route("/stock/{id}", get(stock))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake catalog");
        let addr = listener.local_addr().expect("Failed to read local address");

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL to point `HttpCatalog` at.
    ///
    /// # Panics
    ///
    /// Never in practice; the address always forms a valid URL.
    #[must_use]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).expect("Socket address is a valid URL")
    }

    /// Register a product and its stock. Returns the product record served.
    pub fn insert_product(&self, id: i32, title: &str, price: f64, stock: u32) -> Value {
        let record = json!({
            "id": id,
            "title": title,
            "price": price,
            "image": format!("https://rocketshoes.test/images/{id}.jpg"),
        });
        lock(&self.state.products).insert(id, record.clone());
        lock(&self.state.stock).insert(id, stock);
        record
    }

    pub fn set_stock(&self, id: i32, stock: u32) {
        lock(&self.state.stock).insert(id, stock);
    }

    /// Make every request fail with `fault`, or clear it with `None`.
    pub fn set_fault(&self, fault: Option<Fault>) {
        *lock(&self.state.fault) = fault;
    }

    #[must_use]
    pub fn product_requests(&self) -> usize {
        self.state.product_requests.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn stock_requests(&self) -> usize {
        self.state.stock_requests.load(Ordering::SeqCst)
    }

    /// `Authorization` header of the most recent request.
    #[must_use]
    pub fn last_authorization(&self) -> Option<String> {
        lock(&self.state.last_authorization).clone()
    }
}

impl Drop for FakeCatalog {
    fn drop(&mut self) {
        self.server.abort();
    }
}
