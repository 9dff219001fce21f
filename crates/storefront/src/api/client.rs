//! Backend REST client implementation.
//!
//! Caches the product listing and product detail using `moka`.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use shopeasy_core::listing::ListingQuery;
use shopeasy_core::otp::OtpCode;
use shopeasy_core::stats::Stats;
use shopeasy_core::{
    Address, AddressId, CartAction, CartItemId, CartSnapshot, Email, NewAddress, Order, OrderId,
    OrderStatus, ProductDraft, ProductId, User,
};

use super::ApiError;
use super::cache::{CacheKey, CacheValue};
use super::types::{
    AddToCartRequest, AddToCartResponse, CheckoutSession, ErrorBody, IdRequest, LoginRequest,
    MessageResponse, OrderList, OrderRequest, PaymentVerification, ProductDetail, ProductPage,
    StatusRequest, VerifyPaymentRequest, VerifyRequest, VerifyResponse,
};
use crate::config::ApiConfig;

/// Header carrying the session token.
const TOKEN_HEADER: &str = "token";

/// Maximum cached catalogue responses.
const CACHE_CAPACITY: u64 = 500;

/// An image selected in the admin product form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the commerce backend.
///
/// Cheap to clone; all clones share one connection pool and one cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig, cache_ttl: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("shopeasy-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                cache,
            }),
        })
    }

    /// Resolve an endpoint path relative to the backend base URL.
    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Start a request, attaching the session token when given.
    fn request(&self, method: Method, url: Url, token: Option<&SecretString>) -> RequestBuilder {
        let builder = self.inner.client.request(method, url);
        match token {
            Some(token) => builder.header(TOKEN_HEADER, token.expose_secret()),
            None => builder,
        }
    }

    /// Send a request and decode the JSON body.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message);
            if status.is_server_error() {
                tracing::error!(
                    status = %status,
                    body = %body.chars().take(500).collect::<String>(),
                    "Backend returned server error"
                );
            } else {
                debug!(status = %status, message = ?message, "Backend rejected request");
            }
            return Err(ApiError::Status { status, message });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }

    /// Check that the backend accepts connections.
    ///
    /// Any HTTP answer counts; only transport failures are errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    pub async fn ping(&self) -> Result<(), ApiError> {
        self.inner
            .client
            .get(self.inner.base_url.clone())
            .send()
            .await?;
        Ok(())
    }

    // =========================================================================
    // User Methods
    // =========================================================================

    /// Email a one-time password.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the address or is unreachable.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn send_otp(&self, email: &Email) -> Result<MessageResponse, ApiError> {
        let request = self
            .request(Method::POST, self.url("api/user/login")?, None)
            .json(&LoginRequest { email });
        self.execute(request).await
    }

    /// Exchange a one-time password for a session token.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is rejected or the backend is unreachable.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn verify_otp(&self, email: &Email, otp: &OtpCode) -> Result<VerifyResponse, ApiError> {
        let request = self
            .request(Method::POST, self.url("api/user/verify")?, None)
            .json(&VerifyRequest { email, otp });
        self.execute(request).await
    }

    /// The user the token belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid or the backend is unreachable.
    #[instrument(skip_all)]
    pub async fn current_user(&self, token: &SecretString) -> Result<User, ApiError> {
        let request = self.request(Method::GET, self.url("api/user/my")?, Some(token));
        self.execute(request).await
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// The user's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn cart(&self, token: &SecretString) -> Result<CartSnapshot, ApiError> {
        let request = self.request(Method::GET, self.url("api/cart/all")?, Some(token));
        self.execute(request).await
    }

    /// Add one unit of a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails (out of stock, not signed in).
    #[instrument(skip(self, token), fields(product_id = %product))]
    pub async fn add_to_cart(
        &self,
        token: &SecretString,
        product: &ProductId,
    ) -> Result<AddToCartResponse, ApiError> {
        let request = self
            .request(Method::POST, self.url("api/cart/add")?, Some(token))
            .json(&AddToCartRequest { product });
        self.execute(request).await
    }

    /// Increment or decrement a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(item_id = %item, action = action.as_str()))]
    pub async fn update_cart(
        &self,
        token: &SecretString,
        item: &CartItemId,
        action: CartAction,
    ) -> Result<MessageResponse, ApiError> {
        let mut url = self.url("api/cart/update")?;
        url.query_pairs_mut().append_pair("action", action.as_str());
        let request = self
            .request(Method::POST, url, Some(token))
            .json(&IdRequest { id: item.as_str() });
        self.execute(request).await
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(item_id = %item))]
    pub async fn remove_from_cart(
        &self,
        token: &SecretString,
        item: &CartItemId,
    ) -> Result<MessageResponse, ApiError> {
        let url = self.url(&format!("api/cart/remove/{}", urlencoding::encode(item.as_str())))?;
        let request = self.request(Method::GET, url, Some(token));
        self.execute(request).await
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// One page of the catalogue.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(page = query.page(), search = query.search()))]
    pub async fn products(&self, query: &ListingQuery) -> Result<ProductPage, ApiError> {
        let pairs = query.to_api_pairs();
        let cache_key = CacheKey::Listing(pairs.clone());

        if let Some(CacheValue::Listing(page)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product listing");
            return Ok(*page);
        }

        let mut url = self.url("api/product/all")?;
        url.query_pairs_mut().extend_pairs(&pairs);
        let page: ProductPage = self.execute(self.request(Method::GET, url, None)).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Listing(Box::new(page.clone())))
            .await;

        Ok(page)
    }

    /// A product and its related products.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist or the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<ProductDetail, ApiError> {
        let cache_key = CacheKey::Product(id.clone());

        if let Some(CacheValue::Product(detail)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*detail);
        }

        let url = self.url(&format!("api/product/{}", urlencoding::encode(id.as_str())))?;
        let detail: ProductDetail = self.execute(self.request(Method::GET, url, None)).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(detail.clone())))
            .await;

        Ok(detail)
    }

    /// Create a product with its images (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if an image has an invalid content type or the
    /// request fails.
    #[instrument(skip(self, token, images), fields(title = %draft.title, images = images.len()))]
    pub async fn create_product(
        &self,
        token: &SecretString,
        draft: &ProductDraft,
        images: Vec<ImageUpload>,
    ) -> Result<MessageResponse, ApiError> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in draft.form_fields() {
            form = form.text(name, value);
        }
        for image in images {
            let part = reqwest::multipart::Part::bytes(image.bytes)
                .file_name(image.file_name)
                .mime_str(&image.content_type)?;
            form = form.part("files", part);
        }

        let request = self
            .request(Method::POST, self.url("api/product/new")?, Some(token))
            .multipart(form);
        let response = self.execute(request).await?;
        self.invalidate_catalogue();
        Ok(response)
    }

    /// Update a product's fields (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token, draft), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        token: &SecretString,
        id: &ProductId,
        draft: &ProductDraft,
    ) -> Result<MessageResponse, ApiError> {
        let url = self.url(&format!("api/product/{}", urlencoding::encode(id.as_str())))?;
        let request = self.request(Method::PUT, url, Some(token)).json(draft);
        let response = self.execute(request).await?;
        self.invalidate_catalogue();
        Ok(response)
    }

    /// Drop every cached listing and product.
    pub fn invalidate_catalogue(&self) {
        debug!("Invalidating catalogue cache");
        self.inner.cache.invalidate_all();
    }

    // =========================================================================
    // Address Methods
    // =========================================================================

    /// Saved delivery addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn addresses(&self, token: &SecretString) -> Result<Vec<Address>, ApiError> {
        let request = self.request(Method::GET, self.url("api/address/all")?, Some(token));
        self.execute(request).await
    }

    /// One saved address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address does not exist or the request fails.
    #[instrument(skip(self, token), fields(address_id = %id))]
    pub async fn address(&self, token: &SecretString, id: &AddressId) -> Result<Address, ApiError> {
        let url = self.url(&format!("api/address/{}", urlencoding::encode(id.as_str())))?;
        self.execute(self.request(Method::GET, url, Some(token))).await
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn add_address(
        &self,
        token: &SecretString,
        address: &NewAddress,
    ) -> Result<MessageResponse, ApiError> {
        let request = self
            .request(Method::POST, self.url("api/address/new")?, Some(token))
            .json(address);
        self.execute(request).await
    }

    /// Delete a saved address.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(address_id = %id))]
    pub async fn delete_address(
        &self,
        token: &SecretString,
        id: &AddressId,
    ) -> Result<MessageResponse, ApiError> {
        let url = self.url(&format!("api/address/{}", urlencoding::encode(id.as_str())))?;
        self.execute(self.request(Method::DELETE, url, Some(token))).await
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// The signed-in user's orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn orders(&self, token: &SecretString) -> Result<Vec<Order>, ApiError> {
        let request = self.request(Method::GET, self.url("api/order/all")?, Some(token));
        let list: OrderList = self.execute(request).await?;
        Ok(list.orders)
    }

    /// One order.
    ///
    /// # Errors
    ///
    /// Returns an error if the order does not exist or the request fails.
    #[instrument(skip(self, token), fields(order_id = %id))]
    pub async fn order(&self, token: &SecretString, id: &OrderId) -> Result<Order, ApiError> {
        let url = self.url(&format!("api/order/{}", urlencoding::encode(id.as_str())))?;
        self.execute(self.request(Method::GET, url, Some(token))).await
    }

    /// Every order in the store (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn all_orders(&self, token: &SecretString) -> Result<Vec<Order>, ApiError> {
        let request = self.request(Method::GET, self.url("api/order/admin/all")?, Some(token));
        self.execute(request).await
    }

    /// Place a cash-on-delivery order for the whole cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn place_cod_order(
        &self,
        token: &SecretString,
        order: &OrderRequest,
    ) -> Result<MessageResponse, ApiError> {
        let request = self
            .request(Method::POST, self.url("api/order/new/cod")?, Some(token))
            .json(order);
        self.execute(request).await
    }

    /// Start a hosted online payment for the whole cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn start_online_payment(
        &self,
        token: &SecretString,
        order: &OrderRequest,
    ) -> Result<CheckoutSession, ApiError> {
        let request = self
            .request(Method::POST, self.url("api/order/new/online")?, Some(token))
            .json(order);
        self.execute(request).await
    }

    /// Confirm a completed online payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn verify_payment(
        &self,
        token: &SecretString,
        session_id: &str,
    ) -> Result<PaymentVerification, ApiError> {
        let request = self
            .request(Method::POST, self.url("api/order/verify/payment")?, Some(token))
            .json(&VerifyPaymentRequest { session_id });
        self.execute(request).await
    }

    /// Move an order to a new status (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the transition.
    #[instrument(skip(self, token), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(
        &self,
        token: &SecretString,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<MessageResponse, ApiError> {
        let url = self.url(&format!("api/order/{}", urlencoding::encode(id.as_str())))?;
        let request = self
            .request(Method::POST, url, Some(token))
            .json(&StatusRequest { status });
        self.execute(request).await
    }

    // =========================================================================
    // Admin Statistics
    // =========================================================================

    /// Payment method counts and per-product sales (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn stats(&self, token: &SecretString) -> Result<Stats, ApiError> {
        let request = self.request(Method::GET, self.url("api/stats")?, Some(token));
        self.execute(request).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn client_for(server: &MockServer) -> ApiClient {
        let config = ApiConfig::new(&server.uri(), Duration::from_secs(5)).unwrap();
        ApiClient::new(&config, Duration::from_secs(60)).unwrap()
    }

    fn token() -> SecretString {
        SecretString::from("tok-123")
    }

    #[tokio::test]
    async fn test_verify_sends_numeric_otp() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/user/verify"))
            .and(body_json(serde_json::json!({"email": "a@b.co", "otp": 123_456})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "Welcome",
                "token": "jwt",
                "user": {"_id": "u1", "email": "a@b.co", "role": "user"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let email = Email::parse("a@b.co").unwrap();
        let otp = OtpCode::parse("123456").unwrap();
        let response = client.verify_otp(&email, &otp).await.unwrap();

        assert_eq!(response.token, "jwt");
        assert_eq!(response.user.id.as_str(), "u1");
    }

    #[tokio::test]
    async fn test_error_body_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/user/verify"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(serde_json::json!({"message": "Invalid OTP"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .verify_otp(
                &Email::parse("a@b.co").unwrap(),
                &OtpCode::parse("000000").unwrap(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.user_message("Login failed"), "Invalid OTP");
    }

    #[tokio::test]
    async fn test_token_header_is_attached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cart/all"))
            .and(header("token", "tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "cart": [], "sumOfQuantities": 0, "subTotal": 0
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let cart = client.cart(&token()).await.unwrap();
        assert_eq!(cart.total_quantity, 0);
    }

    #[tokio::test]
    async fn test_update_cart_sends_action_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/cart/update"))
            .and(query_param("action", "dec"))
            .and(body_json(serde_json::json!({"id": "line-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client
            .update_cart(&token(), &CartItemId::new("line-1"), CartAction::Dec)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_listing_is_cached_until_invalidated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/product/all"))
            .and(query_param("page", "1"))
            .and(query_param("sortByPrice", "lowToHigh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "products": [{"_id": "p1", "title": "Mug", "price": 250}],
                "categories": ["kitchen"],
                "totalPages": 1,
                "newProduct": []
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let query = ListingQuery::new().with_sort(Some(shopeasy_core::listing::PriceSort::LowToHigh));

        let first = client.products(&query).await.unwrap();
        let second = client.products(&query).await.unwrap();
        assert_eq!(first.products.len(), 1);
        assert_eq!(second.categories, vec!["kitchen"]);

        client.invalidate_catalogue();
        client.products(&query).await.unwrap();
    }

    #[tokio::test]
    async fn test_rate_limited_reads_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/stats"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.stats(&token()).await.unwrap_err();
        assert!(matches!(err, ApiError::RateLimited(7)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user/my"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.current_user(&token()).await.unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }

    #[tokio::test]
    async fn test_order_status_update_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/order/o-9"))
            .and(body_json(serde_json::json!({"status": "Shipped"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "Order updated"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let response = client
            .update_order_status(&token(), &OrderId::new("o-9"), OrderStatus::Shipped)
            .await
            .unwrap();
        assert_eq!(response.or("Updated"), "Order updated");
    }
}
