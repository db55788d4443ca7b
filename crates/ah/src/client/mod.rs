//! Albert Heijn API client implementation.
//!
//! REST endpoints with `reqwest`, product detail over the GraphQL
//! endpoint with a hand-written query. Read-only responses are cached
//! using `moka` (5-minute TTL).

mod cache;
mod types;

pub use types::{BatchEntry, BatchFailure, BatchReport, ListEntry, Product};

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use boodschap_core::{CartSnapshot, ListEntryId, ProductId};

use crate::auth::{AuthManager, TokenStore};
use crate::config::AhConfig;
use crate::error::{AhError, AuthError};

use cache::CacheValue;
use types::{ProductDetailData, ProductListEnvelope, WireListEnvelope, WireOrder};

const API_BASE: &str = "https://api.ah.nl";
const GRAPHQL_URL: &str = "https://api.ah.nl/graphql";

// The mobile backend gates on app identification headers.
const USER_AGENT: &str = "Appie/8.22.3";
const X_APPLICATION: &str = "AHWEBSHOP";

const CACHE_TTL: Duration = Duration::from_secs(300);
const CACHE_CAPACITY: u64 = 1000;

const PRODUCT_QUERY: &str = "\
query product($id: Int!) {
  product(id: $id) {
    id
    title
    brand
    unitSize
    isOrderable
    isBonus
    bonusMechanism
    price { now was unitSize }
  }
}";

/// Which token class an endpoint requires.
#[derive(Debug, Clone, Copy)]
enum Access {
    /// Anonymous token is sufficient.
    Public,
    /// A logged-in user token is required.
    User,
}

/// Client for the Albert Heijn mobile API.
///
/// Provides typed access to search, product detail, the bonus listing,
/// the shopping list, and the order cart. Read paths are cached for
/// 5 minutes.
#[derive(Clone)]
pub struct AhClient {
    inner: Arc<AhClientInner>,
}

struct AhClientInner {
    http: reqwest::Client,
    auth: AuthManager,
    cache: Cache<String, CacheValue>,
}

#[derive(Serialize)]
struct GraphQLRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorMessage>>,
}

#[derive(Deserialize)]
struct GraphQLErrorMessage {
    message: String,
}

impl AhClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &AhConfig) -> Result<Self, AhError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        headers.insert("x-application", HeaderValue::from_static(X_APPLICATION));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        let auth = AuthManager::new(http.clone(), TokenStore::new(config.token_path()));
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(AhClientInner { http, auth, cache }),
        })
    }

    /// The authentication manager, for login/logout commands.
    #[must_use]
    pub fn auth(&self) -> &AuthManager {
        &self.inner.auth
    }

    // =========================================================================
    // Catalog (anonymous access)
    // =========================================================================

    /// Search products by free text.
    ///
    /// # Errors
    ///
    /// Returns [`AhError::InvalidInput`] for an empty query, otherwise
    /// the usual transport/backend errors.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>, AhError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AhError::InvalidInput("empty search query".into()));
        }

        let cache_key = format!("search:{query}:{limit}");
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("cache hit for search");
            return Ok(products);
        }

        let envelope: ProductListEnvelope = self
            .get_json(
                "/mobile-services/product/search/v2",
                &[
                    ("query", query.to_string()),
                    ("size", limit.to_string()),
                    ("sortOn", "RELEVANCE".to_string()),
                ],
                Access::Public,
            )
            .await?;

        let products: Vec<Product> = envelope
            .products
            .into_iter()
            .take(limit)
            .map(Product::from)
            .collect();

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get product details by id.
    ///
    /// # Errors
    ///
    /// Returns [`AhError::NotFound`] for an unknown id.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<Product, AhError> {
        let cache_key = format!("product:{id}");
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("cache hit for product");
            return Ok(*product);
        }

        let data: ProductDetailData = self
            .graphql(
                PRODUCT_QUERY,
                serde_json::json!({ "id": id.as_i64() }),
                Access::Public,
            )
            .await?;

        let wire = data
            .product
            .ok_or_else(|| AhError::NotFound(format!("product {id}")))?;
        let product = Product::from(wire);

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Current bonus (promotional) products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn bonus(&self) -> Result<Vec<Product>, AhError> {
        let cache_key = "bonus".to_string();
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("cache hit for bonus listing");
            return Ok(products);
        }

        let envelope: ProductListEnvelope = self
            .get_json("/mobile-services/bonuspage/v1/spotlight", &[], Access::Public)
            .await?;

        let products: Vec<Product> = envelope.products.into_iter().map(Product::from).collect();
        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    // =========================================================================
    // Shopping list (authenticated)
    // =========================================================================

    /// Read the shopping list.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or no user is logged
    /// in.
    #[instrument(skip(self))]
    pub async fn list_items(&self) -> Result<Vec<ListEntry>, AhError> {
        let envelope: WireListEnvelope = self
            .get_json("/mobile-services/shoppinglist/v2/items", &[], Access::User)
            .await?;
        Ok(envelope.items.into_iter().map(ListEntry::from).collect())
    }

    /// Add one product to the shopping list.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn add_list_item(&self, id: ProductId, qty: u32) -> Result<(), AhError> {
        let body = serde_json::json!({
            "items": [{ "productId": id.as_i64(), "quantity": qty.max(1) }]
        });
        self.send_no_content(
            Method::POST,
            "/mobile-services/shoppinglist/v2/items",
            Some(&body),
            Access::User,
        )
        .await
    }

    /// Remove an entry from the shopping list.
    ///
    /// # Errors
    ///
    /// Returns [`AhError::NotFound`] for an unknown entry id.
    #[instrument(skip(self), fields(entry = %entry))]
    pub async fn remove_list_item(&self, entry: &ListEntryId) -> Result<(), AhError> {
        self.send_no_content(
            Method::DELETE,
            &format!("/mobile-services/shoppinglist/v2/items/{entry}"),
            None,
            Access::User,
        )
        .await
    }

    /// Add a batch of products to the shopping list, sequentially.
    ///
    /// Failures are reported per item; already-applied items are not
    /// rolled back.
    #[instrument(skip_all, fields(count = entries.len()))]
    pub async fn batch_add_list(&self, entries: &[BatchEntry]) -> BatchReport {
        let mut report = BatchReport::default();
        for entry in entries {
            match self.add_list_item(entry.id, entry.qty).await {
                Ok(()) => report.applied.push(*entry),
                Err(e) => {
                    warn!(id = %entry.id, error = %e, "batch list add failed");
                    report.failed.push(BatchFailure {
                        id: entry.id,
                        qty: entry.qty,
                        code: e.code(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }

    // =========================================================================
    // Order cart (authenticated)
    // =========================================================================

    /// Fetch the current order cart. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or no user is logged
    /// in.
    #[instrument(skip(self))]
    pub async fn order(&self) -> Result<CartSnapshot, AhError> {
        let raw = self
            .request_value(
                Method::GET,
                &format!("{API_BASE}/mobile-services/order/v2/order"),
                &[],
                None,
                Access::User,
            )
            .await?;
        let wire: WireOrder = serde_json::from_value(raw.clone())?;
        wire.into_snapshot(raw)
    }

    /// Add one product to the order cart.
    ///
    /// # Errors
    ///
    /// Returns [`AhError::NotFound`] for an unknown product id.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn add_order_item(&self, id: ProductId, qty: u32) -> Result<(), AhError> {
        let body = serde_json::json!({
            "items": [{ "productId": id.as_i64(), "quantity": qty.max(1) }]
        });
        self.send_no_content(
            Method::POST,
            "/mobile-services/order/v2/order/items",
            Some(&body),
            Access::User,
        )
        .await
    }

    /// Add a batch of products to the order cart, sequentially.
    ///
    /// Failures are reported per item; already-applied items are not
    /// rolled back.
    #[instrument(skip_all, fields(count = entries.len()))]
    pub async fn batch_add_order(&self, entries: &[BatchEntry]) -> BatchReport {
        let mut report = BatchReport::default();
        for entry in entries {
            match self.add_order_item(entry.id, entry.qty).await {
                Ok(()) => report.applied.push(*entry),
                Err(e) => {
                    warn!(id = %entry.id, error = %e, "batch order add failed");
                    report.failed.push(BatchFailure {
                        id: entry.id,
                        qty: entry.qty,
                        code: e.code(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Empty the order cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn clear_order(&self) -> Result<(), AhError> {
        self.send_no_content(
            Method::DELETE,
            "/mobile-services/order/v2/order",
            None,
            Access::User,
        )
        .await
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    async fn token(&self, access: Access) -> Result<crate::auth::Token, AhError> {
        match access {
            Access::Public => self.inner.auth.public_token().await,
            Access::User => self.inner.auth.ensure_valid().await,
        }
        .map_err(AhError::Auth)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        access: Access,
    ) -> Result<T, AhError> {
        let value = self
            .request_value(Method::GET, &format!("{API_BASE}{path}"), query, None, access)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn send_no_content(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        access: Access,
    ) -> Result<(), AhError> {
        self.request_value(method, &format!("{API_BASE}{path}"), &[], body, access)
            .await?;
        Ok(())
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
        access: Access,
    ) -> Result<T, AhError> {
        let request = GraphQLRequest { query, variables };
        let value = self
            .request_value(
                Method::POST,
                GRAPHQL_URL,
                &[],
                Some(&serde_json::to_value(&request)?),
                access,
            )
            .await?;

        let response: GraphQLResponse<T> = serde_json::from_value(value)?;
        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            let joined = errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(AhError::GraphQL(joined));
        }

        response
            .data
            .ok_or_else(|| AhError::GraphQL("no data in response".to_string()))
    }

    /// Send a request with a valid token. A 401 triggers exactly one
    /// token refresh and retry; a second 401 is fatal.
    async fn request_value(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
        access: Access,
    ) -> Result<serde_json::Value, AhError> {
        let mut token = self.token(access).await?;
        let mut refreshed = false;

        loop {
            let mut request = self
                .inner
                .http
                .request(method.clone(), url)
                .bearer_auth(&token.access_token);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;

            if response.status() == StatusCode::UNAUTHORIZED && !refreshed {
                debug!("401 from backend, refreshing token once");
                refreshed = true;
                token = self.inner.auth.refresh_stored().await.map_err(AhError::Auth)?;
                continue;
            }

            return Self::decode(response, url).await;
        }
    }

    async fn decode(response: reqwest::Response, url: &str) -> Result<serde_json::Value, AhError> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(AhError::Auth(AuthError::ReauthRequired(
                "still unauthorized after token refresh".to_string(),
            )));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(AhError::NotFound(url.to_string()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(AhError::RateLimited(retry_after));
        }

        let text = response.text().await?;

        if !status.is_success() {
            return Err(AhError::Backend(format!(
                "HTTP {status}: {}",
                text.chars().take(200).collect::<String>()
            )));
        }

        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }

        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %text.chars().take(500).collect::<String>(),
                    "failed to parse backend response"
                );
                Err(AhError::Parse(e))
            }
        }
    }
}
