//! End-to-end tests for the checkout wizard over HTTP.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
    response::Response,
};
use crumb_storefront::checkout::ProductCatalog;
use crumb_storefront::config::StorefrontConfig;
use crumb_storefront::state::AppState;
use tower::ServiceExt;

/// A router plus the session cookie it handed out.
struct TestClient {
    app: Router,
    cookie: Option<String>,
}

/// Response status, headers and body text.
struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl TestResponse {
    async fn read(response: Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        Self {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }

    fn is_processing(&self) -> bool {
        self.body.contains("Placing your order")
    }
}

impl TestClient {
    fn new() -> Self {
        Self::with_submission_delay(Duration::from_millis(10))
    }

    fn with_submission_delay(delay: Duration) -> Self {
        let delay_ms = delay.as_millis().to_string();
        let config = StorefrontConfig::from_lookup(|key| match key {
            "CRUMB_BASE_URL" => Some("http://localhost:3000".to_string()),
            "CRUMB_SUBMISSION_DELAY_MS" => Some(delay_ms.clone()),
            _ => None,
        })
        .expect("test configuration is valid");

        Self {
            app: crumb_storefront::app(AppState::new(config, ProductCatalog::default())),
            cookie: None,
        }
    }

    async fn get(&mut self, uri: &str) -> TestResponse {
        let request = self.request("GET", uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn post(&mut self, uri: &str, form: &[(&str, &str)]) -> TestResponse {
        let request = self.form_request(uri, form);
        self.send(request).await
    }

    fn form_request(&self, uri: &str, form: &[(&str, &str)]) -> Request<Body> {
        let body = serde_urlencoded::to_string(form).unwrap();
        self.request("POST", uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn request(&self, method: &str, uri: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(uri);
        match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }

        TestResponse::read(response).await
    }

    /// Follow the processing page until the order resolves.
    async fn wait_for_outcome(&mut self) -> TestResponse {
        for _ in 0..100 {
            let response = self.get("/checkout").await;
            if !response.is_processing() {
                return response;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("order never resolved");
    }
}

fn location(response: &TestResponse) -> &str {
    response
        .headers
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

const VALID_DETAILS: &[(&str, &str)] = &[
    ("product_id", "1"),
    ("quantity", "3"),
    ("name", "Ada Lovelace"),
    ("email", "ada@example.com"),
    ("phone", "555-0100"),
    ("address", "12 Analytical Way"),
];

const VALID_PAYMENT: &[(&str, &str)] = &[
    ("card_number", "4242 4242 4242 4242"),
    ("expiration", "04/29"),
    ("cvv", "123"),
];

// ============================================================================
// Basics
// ============================================================================

#[tokio::test]
async fn test_health() {
    let mut client = TestClient::new();
    let response = client.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "ok");
}

#[tokio::test]
async fn test_home_lists_catalog() {
    let mut client = TestClient::new();
    let response = client.get("/").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Classic Oat Granola"));
    assert!(response.body.contains("/checkout?product=2"));
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let mut client = TestClient::new();
    let response = client.get("/checkout").await;

    let csp = response
        .headers
        .get(header::CONTENT_SECURITY_POLICY)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(csp.contains("'nonce-"));
    assert_eq!(response.headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    assert!(response.headers.contains_key("x-request-id"));
}

// ============================================================================
// Step 1
// ============================================================================

#[tokio::test]
async fn test_checkout_starts_on_customer_step() {
    let mut client = TestClient::new();
    let response = client.get("/checkout").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("action=\"/checkout/details\""));
    assert!(response.body.contains("<strong id=\"order-total\">$45.00</strong>"));
    assert!(client.cookie.as_deref().unwrap().starts_with("crumb_session="));
}

#[tokio::test]
async fn test_product_query_preselects() {
    let mut client = TestClient::new();
    let response = client.get("/checkout?product=3").await;

    assert!(response.body.contains("<strong id=\"order-total\">$52.50</strong>"));
    assert!(response.body.contains("<option value=\"3\" selected>"));
}

#[tokio::test]
async fn test_selection_returns_new_total() {
    let mut client = TestClient::new();
    client.get("/checkout").await;

    let response = client
        .post("/checkout/selection", &[("product_id", "1"), ("quantity", "3")])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body.trim(), "<strong id=\"order-total\">$135.00</strong>");

    let response = client
        .post("/checkout/selection", &[("quantity", "0")])
        .await;
    assert_eq!(response.body.trim(), "<strong id=\"order-total\">$45.00</strong>");

    let response = client
        .post("/checkout/selection", &[("quantity", "lots")])
        .await;
    assert_eq!(response.body.trim(), "<strong id=\"order-total\">$45.00</strong>");
}

#[tokio::test]
async fn test_field_blur_reports_error_fragment() {
    let mut client = TestClient::new();
    client.get("/checkout").await;

    let response = client
        .post("/checkout/fields/email", &[("value", "ada@example")])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("id=\"error-email\""));
    assert!(response.body.contains("Enter a valid email address"));

    let response = client
        .post("/checkout/fields/email", &[("value", "ada@example.com")])
        .await;
    assert!(!response.body.contains("Enter a valid email address"));
}

#[tokio::test]
async fn test_unknown_field_is_not_found() {
    let mut client = TestClient::new();
    let response = client
        .post("/checkout/fields/favourite_colour", &[("value", "teal")])
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_details_rerender_with_errors() {
    let mut client = TestClient::new();
    client.get("/checkout").await;

    let response = client
        .post(
            "/checkout/details",
            &[("name", "Ada"), ("email", "not-an-email"), ("phone", ""), ("address", " ")],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("action=\"/checkout/details\""));
    assert!(response.body.contains("Enter a valid email address"));
    assert!(response.body.contains("Phone is required"));
    assert!(response.body.contains("Address is required"));
    assert!(!response.body.contains("Name is required"));
    assert!(response.body.contains("value=\"Ada\""));
}

// ============================================================================
// Full flow
// ============================================================================

#[tokio::test]
async fn test_full_checkout_reaches_confirmation() {
    let mut client = TestClient::new();
    client.get("/checkout").await;

    let response = client.post("/checkout/details", VALID_DETAILS).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/checkout");

    let response = client.get("/checkout").await;
    assert!(response.body.contains("id=\"payment-form\""));
    assert!(response.body.contains("$135.00"));
    assert!(response.body.contains("Ordering as Ada Lovelace"));

    let response = client.post("/checkout/payment", VALID_PAYMENT).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let response = client.wait_for_outcome().await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Thank you, Ada Lovelace!"));
    assert!(response.body.contains("<dd id=\"order-total\">$135.00</dd>"));
    assert!(response.body.contains("Card ending in 4242"));
    assert!(response.body.contains("action=\"/checkout/reset\""));
}

#[tokio::test]
async fn test_invalid_payment_stays_on_payment_step() {
    let mut client = TestClient::new();
    client.get("/checkout").await;
    client.post("/checkout/details", VALID_DETAILS).await;

    let response = client
        .post(
            "/checkout/payment",
            &[("card_number", "4242424242424242"), ("expiration", "13/29"), ("cvv", "")],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Expiration must be in MM/YY format"));
    assert!(response.body.contains("CVV is required"));
    assert!(response.body.contains("value=\"4242 4242 4242 4242\""));
}

#[tokio::test]
async fn test_back_keeps_customer_details() {
    let mut client = TestClient::new();
    client.get("/checkout").await;
    client.post("/checkout/details", VALID_DETAILS).await;

    let response = client.post("/checkout/back", &[]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let response = client.get("/checkout").await;
    assert!(response.body.contains("action=\"/checkout/details\""));
    assert!(response.body.contains("value=\"Ada Lovelace\""));
    assert!(response.body.contains("value=\"ada@example.com\""));
    assert!(response.body.contains("value=\"3\""));
}

#[tokio::test]
async fn test_repeat_payment_after_confirmation_is_ignored() {
    let mut client = TestClient::new();
    client.get("/checkout").await;
    client.post("/checkout/details", VALID_DETAILS).await;
    client.post("/checkout/payment", VALID_PAYMENT).await;

    let first = client.wait_for_outcome().await;
    let response = client.post("/checkout/payment", VALID_PAYMENT).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let second = client.get("/checkout").await;

    assert!(first.body.contains("Thank you"));
    assert!(second.body.contains("Thank you"));
    let order_number = |body: &str| {
        body.split("<strong>")
            .nth(1)
            .and_then(|rest| rest.split("</strong>").next())
            .map(str::to_string)
    };
    assert_eq!(order_number(&first.body), order_number(&second.body));
}

#[tokio::test]
async fn test_reset_starts_over() {
    let mut client = TestClient::new();
    client.get("/checkout").await;
    client.post("/checkout/details", VALID_DETAILS).await;
    client.post("/checkout/payment", VALID_PAYMENT).await;
    client.wait_for_outcome().await;

    let response = client.post("/checkout/reset", &[]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = client.get("/checkout").await;
    assert!(response.body.contains("action=\"/checkout/details\""));
    assert!(!response.body.contains("Ada Lovelace"));
    assert!(response.body.contains("<strong id=\"order-total\">$45.00</strong>"));
}

#[tokio::test]
async fn test_home_discards_checkout() {
    let mut client = TestClient::new();
    client.get("/checkout").await;
    client.post("/checkout/details", VALID_DETAILS).await;

    client.get("/").await;

    let response = client.get("/checkout").await;
    assert!(response.body.contains("action=\"/checkout/details\""));
    assert!(!response.body.contains("Ada Lovelace"));
}

// ============================================================================
// Submission in flight
// ============================================================================

/// Fill both steps and return a client sitting on the payment step.
async fn client_at_payment(delay: Duration) -> TestClient {
    let mut client = TestClient::with_submission_delay(delay);
    client.get("/checkout").await;
    let response = client.post("/checkout/details", VALID_DETAILS).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    client
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_payments_place_one_order() {
    for _ in 0..20 {
        let mut client = client_at_payment(Duration::from_millis(100)).await;

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let request = client.form_request("/checkout/payment", VALID_PAYMENT);
                let app = client.app.clone();
                tokio::spawn(async move {
                    TestResponse::read(app.oneshot(request).await.unwrap()).await
                })
            })
            .collect();

        let mut placed = 0;
        let mut duplicates = 0;
        for handle in handles {
            let response = handle.await.unwrap();
            match response.status {
                StatusCode::SEE_OTHER => placed += 1,
                StatusCode::OK if response.is_processing() => duplicates += 1,
                other => panic!("unexpected status {other}"),
            }
        }
        assert_eq!((placed, duplicates), (1, 1));

        let outcome = client.wait_for_outcome().await;
        assert!(outcome.body.contains("Thank you, Ada Lovelace!"));
    }
}

#[tokio::test]
async fn test_processing_page_while_submitting() {
    let mut client = client_at_payment(Duration::from_millis(200)).await;

    let response = client.post("/checkout/payment", VALID_PAYMENT).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let response = client.get("/checkout").await;
    assert!(response.is_processing());
    assert!(response.body.contains("http-equiv=\"refresh\""));

    let response = client.post("/checkout/payment", VALID_PAYMENT).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.is_processing());
}

#[tokio::test]
async fn test_field_edit_during_submission_keeps_order() {
    let mut client = client_at_payment(Duration::from_millis(200)).await;
    client.post("/checkout/payment", VALID_PAYMENT).await;

    let response = client
        .post("/checkout/fields/cvv", &[("value", "")])
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let outcome = client.wait_for_outcome().await;
    assert!(outcome.body.contains("Thank you, Ada Lovelace!"));
}

#[tokio::test]
async fn test_home_during_submission_discards_order() {
    let mut client = client_at_payment(Duration::from_millis(200)).await;
    client.post("/checkout/payment", VALID_PAYMENT).await;

    client.get("/").await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    let response = client.get("/checkout").await;
    assert!(response.body.contains("action=\"/checkout/details\""));
    assert!(!response.body.contains("Thank you"));
    assert!(!response.body.contains("Ada Lovelace"));
}

#[tokio::test]
async fn test_reset_during_submission_discards_order() {
    let mut client = client_at_payment(Duration::from_millis(200)).await;
    client.post("/checkout/payment", VALID_PAYMENT).await;

    let response = client.post("/checkout/reset", &[]).await;
    assert_eq!(location(&response), "/");
    tokio::time::sleep(Duration::from_millis(400)).await;

    let response = client.get("/checkout").await;
    assert!(response.body.contains("action=\"/checkout/details\""));
    assert!(!response.body.contains("Thank you"));
}

#[tokio::test]
async fn test_form_values_with_reserved_characters_roundtrip() {
    let mut client = TestClient::new();
    client.get("/checkout").await;

    let address = "12 Main St #4 & Co, a=b?c, Zürich";
    let response = client
        .post(
            "/checkout/details",
            &[
                ("name", "Ada"),
                ("email", "ada@example.com"),
                ("phone", "+1 555 0100"),
                ("address", address),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    client.post("/checkout/back", &[]).await;
    let response = client.get("/checkout").await;
    assert!(response.body.contains("value=\"12 Main St #4 &amp; Co, a=b?c, Zürich\""));
    assert!(response.body.contains("value=\"+1 555 0100\""));
}
