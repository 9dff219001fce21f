//! Integration tests for the ShopEasy storefront.
//!
//! Each [`TestContext`] serves the real router on an ephemeral port, backed
//! by a `wiremock` server standing in for the commerce backend.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopeasy-integration-tests
//! ```

#![allow(clippy::missing_panics_doc)]

use std::net::SocketAddr;

use reqwest::{Client, Response, redirect::Policy};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shopeasy_storefront::{app, config::StorefrontConfig, state::AppState};

/// A running storefront and its mocked backend.
pub struct TestContext {
    pub backend: MockServer,
    pub base_url: String,
    /// Keeps cookies; never follows redirects so tests can assert on them.
    pub client: Client,
}

impl TestContext {
    /// Start a storefront with rate limiting off.
    pub async fn new() -> Self {
        let backend = MockServer::start().await;
        let api_url = backend.uri();

        let config = StorefrontConfig::from_lookup(|key| match key {
            "SHOPEASY_BASE_URL" => Some("http://127.0.0.1".to_string()),
            "SHOPEASY_API_URL" => Some(api_url.clone()),
            "SHOPEASY_RATE_LIMIT" => Some("false".to_string()),
            _ => None,
        })
        .expect("test configuration is valid");
        let state = AppState::new(config).expect("application state builds");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("listener has an address");
        tokio::spawn(async move {
            axum::serve(
                listener,
                app(state).into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("storefront serves");
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .expect("client builds");

        Self {
            backend,
            base_url: format!("http://{addr}"),
            client,
        }
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET succeeds")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST succeeds")
    }

    /// Mount an empty catalogue so pages that list products render.
    pub async fn mock_empty_catalogue(&self) {
        Mock::given(method("GET"))
            .and(path("/api/product/all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "products": [],
                "categories": [],
                "totalPages": 1,
                "newProduct": []
            })))
            .mount(&self.backend)
            .await;
    }

    /// Sign in through the OTP pages as `email` with the given role.
    ///
    /// The backend hands out `tok-{role}` and a cart of `cart_quantity` units.
    pub async fn sign_in(&self, email: &str, role: &str, cart_quantity: u32) {
        let token = format!("tok-{role}");

        Mock::given(method("POST"))
            .and(path("/api/user/login"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"message": "OTP sent successfully"})),
            )
            .mount(&self.backend)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/user/verify"))
            .and(body_partial_json(json!({"email": email, "otp": 123_456})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Verified successfully",
                "token": token,
                "user": {"_id": format!("user-{role}"), "email": email, "role": role}
            })))
            .mount(&self.backend)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/cart/all"))
            .and(header("token", token.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cart": [{
                    "_id": "c1",
                    "quantity": cart_quantity,
                    "product": {"_id": "p1", "title": "Mug", "price": 250, "stock": 10}
                }],
                "sumOfQuantities": cart_quantity,
                "subTotal": 250 * cart_quantity
            })))
            .mount(&self.backend)
            .await;

        let login = self.post_form("/login", &[("email", email)]).await;
        assert_eq!(location(&login), "/verify");

        let digits: Vec<(&str, &str)> = ["1", "2", "3", "4", "5", "6"]
            .into_iter()
            .map(|d| ("digit", d))
            .collect();
        let verify = self.post_form("/verify", &digits).await;
        assert_eq!(location(&verify), "/");
    }
}

/// The `Location` header of a redirect, or "" when there is none.
#[must_use]
pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
