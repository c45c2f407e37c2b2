//! Landing page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tower_sessions::Session;
use tracing::instrument;

use super::checkout::{ProductOption, WIZARD_SESSION_KEY};
use crate::error::Result;
use crate::filters;
use crate::middleware::CspNonce;
use crate::state::AppState;

/// Landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub products: Vec<ProductOption>,
    pub nonce: String,
}

/// Display the landing page.
///
/// Leaving the checkout for the landing page discards the checkout.
#[instrument(skip(state, session, nonce))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
) -> Result<HomeTemplate> {
    if session.remove_value(WIZARD_SESSION_KEY).await?.is_some() {
        tracing::debug!("Discarded checkout on return to landing page");
    }

    Ok(HomeTemplate {
        products: ProductOption::list(state.catalog(), None),
        nonce,
    })
}
