//! Order submission.
//!
//! Submission goes through [`PaymentProcessor`]. The only implementation
//! shipped is [`SimulatedProcessor`], which waits a fixed delay and always
//! succeeds. A real gateway would implement the same trait and report
//! failures through [`SubmissionError`].

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crumb_core::{Price, Quantity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OrderDraft;

/// Why a submission did not go through.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum SubmissionError {
    #[error("card declined: {0}")]
    Declined(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("payment provider timed out")]
    Timeout,
}

impl SubmissionError {
    /// Message safe to show the buyer.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Declined(_) => "Your card was declined. Please check the details or use another card.",
            Self::Network(_) | Self::Timeout => {
                "We couldn't reach the payment provider. Please try again."
            }
        }
    }
}

/// Receipt for a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub order_number: String,
    pub buyer_name: String,
    pub email: String,
    pub product_name: String,
    pub quantity: Quantity,
    pub total: Price,
    pub card_last4: String,
    pub placed_at: DateTime<Utc>,
}

impl Confirmation {
    /// Build a receipt from a submitted draft.
    #[must_use]
    pub fn for_draft(draft: &OrderDraft) -> Self {
        let id = Uuid::new_v4().simple().to_string().to_uppercase();
        let order_number = format!("CR-{}", id.get(..8).unwrap_or(&id));

        Self {
            order_number,
            buyer_name: draft.buyer.name.trim().to_owned(),
            email: draft.buyer.email.trim().to_owned(),
            product_name: draft.product().name.clone(),
            quantity: draft.quantity(),
            total: draft.total_price(),
            card_last4: draft.payment.card_last4().to_owned(),
            placed_at: Utc::now(),
        }
    }
}

/// Something that can take payment for a validated draft.
pub trait PaymentProcessor: Send + Sync {
    /// Charge for the draft and return a receipt.
    fn process(
        &self,
        draft: &OrderDraft,
    ) -> impl Future<Output = Result<Confirmation, SubmissionError>> + Send;
}

/// Stand-in processor: sleeps, then succeeds.
#[derive(Debug, Clone)]
pub struct SimulatedProcessor {
    delay: Duration,
}

impl SimulatedProcessor {
    /// Delay used when none is configured.
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(1500);

    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for SimulatedProcessor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}

impl PaymentProcessor for SimulatedProcessor {
    async fn process(&self, draft: &OrderDraft) -> Result<Confirmation, SubmissionError> {
        tracing::debug!(delay_ms = self.delay.as_millis(), "Simulating payment");
        tokio::time::sleep(self.delay).await;
        Ok(Confirmation::for_draft(draft))
    }
}
