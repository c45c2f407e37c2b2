//! Per-request CSP nonce.
//!
//! The checkout pages carry one small inline script (disabling the "Place
//! order" button on submit). It runs only if its `nonce` attribute matches
//! the nonce in the response's `Content-Security-Policy` header, and both
//! come from the [`CspNonce`] generated here.

use std::fmt;

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;

/// Random bytes per nonce (128 bits).
const NONCE_BYTES: usize = 16;

/// Base64 nonce for inline `<script>` tags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CspNonce(pub String);

impl CspNonce {
    /// Draw a fresh nonce from the thread RNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self(STANDARD.encode(bytes))
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CspNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attach a new [`CspNonce`] to the request.
///
/// Sits outside `security_headers_middleware`, which reads the nonce back
/// from the request extensions.
pub async fn csp_nonce_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(CspNonce::generate());
    next.run(request).await
}

/// Handlers take the nonce as an extractor and pass it to their template.
///
/// Without the middleware the nonce is empty; inline scripts are then
/// blocked, which leaves the checkout working with plain form posts.
impl<S> FromRequestParts<S> for CspNonce
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(nonce) = parts.extensions.get::<Self>() {
            return Ok(nonce.clone());
        }
        tracing::warn!("No CSP nonce on request; is csp_nonce_middleware installed?");
        Ok(Self(String::new()))
    }
}
