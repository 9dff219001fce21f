//! Admin console access control.

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use shopeasy_integration_tests::{TestContext, location};

#[tokio::test]
async fn test_guest_is_sent_to_login() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/admin").await;
    assert_eq!(location(&response), "/login");

    let login = ctx.get("/login").await.text().await.unwrap();
    assert!(login.contains("Please login to continue"));
}

#[tokio::test]
async fn test_shopper_is_sent_home() {
    let ctx = TestContext::new().await;
    ctx.mock_empty_catalogue().await;
    ctx.sign_in("shopper@shop.test", "user", 0).await;

    for page in ["/admin", "/admin/orders", "/admin/info"] {
        let response = ctx.get(page).await;
        assert_eq!(location(&response), "/", "{page}");
    }
}

#[tokio::test]
async fn test_admin_sees_payment_split() {
    let ctx = TestContext::new().await;
    ctx.mock_empty_catalogue().await;
    ctx.sign_in("admin@shop.test", "admin", 0).await;

    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cod": 1,
            "online": 3,
            "data": [{"title": "Mug", "sold": 5}]
        })))
        .mount(&ctx.backend)
        .await;

    let page = ctx.get("/admin/info").await;
    assert!(page.status().is_success());
    let body = page.text().await.unwrap();
    assert!(body.contains("Mug"));
    assert!(body.contains("75"));
}
