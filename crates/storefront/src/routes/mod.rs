//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Landing page (discards any checkout)
//! GET  /health                    - Health check
//!
//! # Checkout
//! GET  /checkout                  - Current step (?product=ID preselects)
//! POST /checkout/selection        - Product/quantity change (total fragment)
//! POST /checkout/fields/{field}   - Field edit + blur validation (error fragment)
//! POST /checkout/details          - Submit step 1
//! POST /checkout/back             - Return to step 1
//! POST /checkout/payment          - Submit step 2 and place the order
//! POST /checkout/reset            - Discard checkout, back to landing page
//! ```

pub mod checkout;
pub mod home;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/selection", post(checkout::selection))
        .route("/fields/{field}", post(checkout::field))
        .route("/details", post(checkout::details))
        .route("/back", post(checkout::back))
        .route("/payment", post(checkout::payment))
        .route("/reset", post(checkout::reset))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health))
        .nest("/checkout", checkout_routes())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}
