use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

pub const PATH_HEALTH: &str = "/health";
pub const PATH_PRODUCTS: &str = "/api/products";
pub const PATH_PRODUCT_DETAIL: &str = "/api/products/{id}";
pub const PATH_SEARCH: &str = "/api/search";
pub const PATH_PURCHASE: &str = "/api/purchase";
pub const PATH_PURCHASES: &str = "/api/purchases";

/// Simulated backend imperfections: per-endpoint processing delays and
/// failure rates. `Default` matches the shop's production-like behavior;
/// [`FaultProfile::none`] makes every response fast and deterministic.
#[derive(Debug, Clone, Copy)]
pub struct FaultProfile {
    pub listing_delay_max: Duration,
    pub detail_delay_max: Duration,
    pub search_delay_max: Duration,
    pub payment_delay_max: Duration,
    pub listing_failure_rate: f64,
    pub payment_failure_rate: f64,
}

impl Default for FaultProfile {
    fn default() -> Self {
        Self {
            listing_delay_max: Duration::from_millis(100),
            detail_delay_max: Duration::from_millis(200),
            search_delay_max: Duration::from_millis(150),
            payment_delay_max: Duration::from_millis(500),
            listing_failure_rate: 0.05,
            payment_failure_rate: 0.03,
        }
    }
}

impl FaultProfile {
    pub fn none() -> Self {
        Self {
            listing_delay_max: Duration::ZERO,
            detail_delay_max: Duration::ZERO,
            search_delay_max: Duration::ZERO,
            payment_delay_max: Duration::ZERO,
            listing_failure_rate: 0.0,
            payment_failure_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub category: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub order_id: String,
    pub product_id: u32,
    pub product_name: String,
    pub quantity: i64,
    pub total: f64,
    pub customer_id: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default)]
pub struct ShopStats {
    requests_total: Arc<AtomicU64>,
    purchases_total: Arc<AtomicU64>,
}

impl ShopStats {
    fn inc_requests_total(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_purchases_total(&self) {
        self.purchases_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn purchases_total(&self) -> u64 {
        self.purchases_total.load(Ordering::Relaxed)
    }
}

/// Shared handler state: the catalog, the purchase history and the fault
/// profile. Process lifetime, never persisted.
#[derive(Debug, Clone)]
pub struct ShopState {
    products: Arc<Mutex<Vec<Product>>>,
    purchases: Arc<Mutex<Vec<PurchaseRecord>>>,
    faults: FaultProfile,
    stats: ShopStats,
}

impl ShopState {
    pub fn new(faults: FaultProfile) -> Self {
        Self::with_products(faults, default_catalog())
    }

    pub fn with_products(faults: FaultProfile, products: Vec<Product>) -> Self {
        Self {
            products: Arc::new(Mutex::new(products)),
            purchases: Arc::new(Mutex::new(Vec::new())),
            faults,
            stats: ShopStats::default(),
        }
    }

    pub fn stats(&self) -> &ShopStats {
        &self.stats
    }

    pub fn products(&self) -> Vec<Product> {
        lock(&self.products).clone()
    }

    pub fn purchases(&self) -> Vec<PurchaseRecord> {
        lock(&self.purchases).clone()
    }
}

pub fn default_catalog() -> Vec<Product> {
    [
        (1, "Laptop", 999.99, 10, "electronics"),
        (2, "Mouse", 29.99, 50, "accessories"),
        (3, "Keyboard", 89.99, 25, "accessories"),
        (4, "Monitor", 299.99, 15, "electronics"),
        (5, "Headphones", 149.99, 30, "accessories"),
    ]
    .into_iter()
    .map(|(id, name, price, stock, category)| Product {
        id,
        name: name.to_string(),
        price,
        stock,
        category: category.to_string(),
    })
    .collect()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn timestamp() -> String {
    humantime::format_rfc3339_millis(SystemTime::now()).to_string()
}

async fn random_delay(max: Duration) {
    if max.is_zero() {
        return;
    }
    sleep(max.mul_f64(fastrand::f64())).await;
}

fn roll_failure(rate: f64) -> bool {
    rate > 0.0 && fastrand::f64() < rate
}

fn random_order_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    (0..9)
        .map(|_| ALPHABET[fastrand::usize(..ALPHABET.len())] as char)
        .collect()
}

fn error_body(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({ "error": message, "timestamp": timestamp() })),
    )
}

fn insufficient_stock(available: i64, requested: i64) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "Insufficient stock",
            "available": available,
            "requested": requested,
            "timestamp": timestamp(),
        })),
    )
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "healthy", "timestamp": timestamp() }))
}

async fn handle_list_products(State(state): State<ShopState>) -> (StatusCode, Json<Value>) {
    state.stats.inc_requests_total();
    random_delay(state.faults.listing_delay_max).await;

    if roll_failure(state.faults.listing_failure_rate) {
        return error_body(StatusCode::INTERNAL_SERVER_ERROR, "Database connection failed");
    }

    let products = lock(&state.products).clone();
    (
        StatusCode::OK,
        Json(json!({
            "products": products,
            "total": products.len(),
            "timestamp": timestamp(),
        })),
    )
}

async fn handle_product_detail(
    State(state): State<ShopState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    state.stats.inc_requests_total();
    random_delay(state.faults.detail_delay_max).await;

    // Non-numeric ids fall through to the not-found branch.
    let product = id.parse::<u32>().ok().and_then(|id| {
        let products = lock(&state.products);
        products.iter().find(|p| p.id == id).cloned()
    });

    match product {
        Some(product) => (
            StatusCode::OK,
            Json(json!({ "product": product, "timestamp": timestamp() })),
        ),
        None => error_body(StatusCode::NOT_FOUND, "Product not found"),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchQuery {
    q: Option<String>,
    category: Option<String>,
    min_price: Option<String>,
    max_price: Option<String>,
}

/// A present but non-numeric bound parses as NaN, and NaN comparisons match
/// no product.
fn price_bound(raw: Option<&str>) -> Option<f64> {
    raw.filter(|s| !s.is_empty())
        .map(|s| s.parse().unwrap_or(f64::NAN))
}

fn filter_products(products: &[Product], query: &SearchQuery) -> Vec<Product> {
    // Empty-string filters are treated as absent.
    let q = query
        .q
        .as_deref()
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    let min_price = price_bound(query.min_price.as_deref());
    let max_price = price_bound(query.max_price.as_deref());

    products
        .iter()
        .filter(|p| q.as_deref().is_none_or(|q| p.name.to_lowercase().contains(q)))
        .filter(|p| category.is_none_or(|c| p.category == c))
        .filter(|p| min_price.is_none_or(|min| p.price >= min))
        .filter(|p| max_price.is_none_or(|max| p.price <= max))
        .cloned()
        .collect()
}

async fn handle_search(
    State(state): State<ShopState>,
    Query(query): Query<SearchQuery>,
) -> (StatusCode, Json<Value>) {
    state.stats.inc_requests_total();
    random_delay(state.faults.search_delay_max).await;

    let results = {
        let products = lock(&state.products);
        filter_products(&products, &query)
    };

    (
        StatusCode::OK,
        Json(json!({
            "products": results,
            "total": results.len(),
            "filters": {
                "q": query.q,
                "category": query.category,
                "minPrice": query.min_price,
                "maxPrice": query.max_price,
            },
            "timestamp": timestamp(),
        })),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseRequest {
    product_id: Option<u32>,
    quantity: Option<i64>,
    customer_id: Option<String>,
}

async fn handle_purchase(
    State(state): State<ShopState>,
    Json(body): Json<PurchaseRequest>,
) -> (StatusCode, Json<Value>) {
    state.stats.inc_requests_total();

    let (Some(product_id), Some(quantity)) = (body.product_id, body.quantity) else {
        return error_body(StatusCode::BAD_REQUEST, "Invalid product ID or quantity");
    };
    if product_id == 0 || quantity <= 0 {
        return error_body(StatusCode::BAD_REQUEST, "Invalid product ID or quantity");
    }

    // Unknown products and short stock are rejected before the payment delay.
    {
        let products = lock(&state.products);
        let Some(product) = products.iter().find(|p| p.id == product_id) else {
            return error_body(StatusCode::NOT_FOUND, "Product not found");
        };
        if product.stock < quantity {
            return insufficient_stock(product.stock, quantity);
        }
    }

    random_delay(state.faults.payment_delay_max).await;

    if roll_failure(state.faults.payment_failure_rate) {
        return error_body(StatusCode::INTERNAL_SERVER_ERROR, "Payment processing failed");
    }

    // The lock was released across the payment delay, so the stock has to be
    // re-checked before it is decremented.
    let (order_total, product_name, product_price, remaining) = {
        let mut products = lock(&state.products);
        let Some(product) = products.iter_mut().find(|p| p.id == product_id) else {
            return error_body(StatusCode::NOT_FOUND, "Product not found");
        };
        if product.stock < quantity {
            return insufficient_stock(product.stock, quantity);
        }
        product.stock -= quantity;
        (
            product.price * quantity as f64,
            product.name.clone(),
            product.price,
            product.stock,
        )
    };

    let order_id = random_order_id();
    lock(&state.purchases).push(PurchaseRecord {
        order_id: order_id.clone(),
        product_id,
        product_name: product_name.clone(),
        quantity,
        total: order_total,
        customer_id: body.customer_id.unwrap_or_else(|| "anonymous".to_string()),
        timestamp: timestamp(),
    });
    state.stats.inc_purchases_total();

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "orderId": order_id,
            "total": order_total,
            "product": {
                "id": product_id,
                "name": product_name,
                "price": product_price,
            },
            "quantity": quantity,
            "remainingStock": remaining,
            "timestamp": timestamp(),
        })),
    )
}

async fn handle_purchase_history(State(state): State<ShopState>) -> Json<Value> {
    let purchases = lock(&state.purchases).clone();
    Json(json!({ "purchases": purchases }))
}

#[derive(Debug, Deserialize)]
struct CreateProductRequest {
    name: Option<String>,
    price: Option<f64>,
    stock: Option<i64>,
    category: Option<String>,
}

async fn handle_create_product(
    State(state): State<ShopState>,
    Json(body): Json<CreateProductRequest>,
) -> (StatusCode, Json<Value>) {
    let missing = || {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing required fields: name, price, stock, category" })),
        )
    };

    let (Some(name), Some(price), Some(stock), Some(category)) =
        (body.name, body.price, body.stock, body.category)
    else {
        return missing();
    };
    // Empty strings and zero values fail the required-fields check too.
    if name.is_empty() || price == 0.0 || stock == 0 || category.is_empty() {
        return missing();
    }

    let product = {
        let mut products = lock(&state.products);
        let id = products.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let product = Product {
            id,
            name,
            price,
            stock,
            category,
        };
        products.push(product.clone());
        product
    };

    (StatusCode::CREATED, Json(json!({ "product": product })))
}

async fn handle_unknown_route(uri: Uri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "path": uri.path(),
            "timestamp": timestamp(),
        })),
    )
}

pub fn router(state: ShopState) -> Router {
    Router::new()
        .route(PATH_HEALTH, get(handle_health))
        .route(PATH_PRODUCTS, get(handle_list_products).post(handle_create_product))
        .route(PATH_PRODUCT_DETAIL, get(handle_product_detail))
        .route(PATH_SEARCH, get(handle_search))
        .route(PATH_PURCHASE, post(handle_purchase))
        .route(PATH_PURCHASES, get(handle_purchase_history))
        .fallback(handle_unknown_route)
        .with_state(state)
}

/// A shop bound to an ephemeral local port, for embedding in tests.
pub struct ShopServer {
    addr: SocketAddr,
    base_url: String,
    state: ShopState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl ShopServer {
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with_state(ShopState::new(FaultProfile::default())).await
    }

    pub async fn start_with(faults: FaultProfile) -> std::io::Result<Self> {
        Self::start_with_state(ShopState::new(faults)).await
    }

    pub async fn start_with_state(state: ShopState) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let app = router(state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        let base_url = format!("http://{addr}");

        Ok(Self {
            addr,
            base_url,
            state,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn state(&self) -> &ShopState {
        &self.state
    }

    pub fn stats(&self) -> &ShopStats {
        &self.state.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ShopServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
