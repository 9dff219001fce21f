//! Product listing query handling.

use reqwest::StatusCode;
use shopeasy_integration_tests::TestContext;

#[tokio::test]
async fn test_unusable_page_number_shows_first_page() {
    let ctx = TestContext::new().await;
    ctx.mock_empty_catalogue().await;

    for query in ["?page=abc", "?page=", "?page=-1&sort=sideways"] {
        let response = ctx.get(&format!("/products{query}")).await;
        assert_eq!(response.status(), StatusCode::OK, "{query}");
    }
}
