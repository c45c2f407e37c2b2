//! Checkout state machine.

use crumb_core::{Price, ProductId, Quantity, QuantityError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    Confirmation, Field, OrderDraft, ProductCatalog, Step, SubmissionError, ValidationErrors,
    validate, validate_step,
};

/// Where the buyer is in the checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardState {
    CollectingCustomerAndOrder,
    CollectingPayment,
    /// A submission is in flight. Always resolves to another state.
    Submitting,
    Confirmed,
}

impl WizardState {
    /// The form step shown in this state, if any.
    #[must_use]
    pub const fn step(self) -> Option<Step> {
        match self {
            Self::CollectingCustomerAndOrder => Some(Step::CustomerAndOrder),
            Self::CollectingPayment => Some(Step::Payment),
            Self::Submitting | Self::Confirmed => None,
        }
    }

    /// Whether the draft may still be edited.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        self.step().is_some()
    }
}

/// Result of asking the wizard to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The wizard entered this state.
    Moved(WizardState),
    /// The wizard entered `Submitting`; the outcome must be reported for
    /// this submission id.
    Submitted(Uuid),
    /// Validation failed; errors have been populated.
    Blocked,
    /// A submission is already running; nothing happened.
    AlreadySubmitting,
    /// The request does not apply to the current state.
    Ignored,
}

/// One buyer's checkout session.
///
/// Owns the draft, the current state and the current validation errors.
/// Created fresh per session and dropped on "return to start".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutWizard {
    state: WizardState,
    draft: OrderDraft,
    errors: ValidationErrors,
    submission_error: Option<SubmissionError>,
    confirmation: Option<Confirmation>,
    submission_id: Option<Uuid>,
}

impl CheckoutWizard {
    /// Start a checkout with the catalog's first product and a quantity of 1.
    #[must_use]
    pub fn new(catalog: &ProductCatalog) -> Self {
        Self {
            state: WizardState::CollectingCustomerAndOrder,
            draft: OrderDraft::new(catalog.first().clone()),
            errors: ValidationErrors::new(),
            submission_error: None,
            confirmation: None,
            submission_id: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> WizardState {
        self.state
    }

    #[must_use]
    pub const fn draft(&self) -> &OrderDraft {
        &self.draft
    }

    #[must_use]
    pub const fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    #[must_use]
    pub fn total_price(&self) -> Price {
        self.draft.total_price()
    }

    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        matches!(self.state, WizardState::Submitting)
    }

    /// Error from the last failed submission, cleared on the next attempt.
    #[must_use]
    pub const fn submission_error(&self) -> Option<&SubmissionError> {
        self.submission_error.as_ref()
    }

    /// Id of the submission in flight, present only while `Submitting`.
    #[must_use]
    pub const fn submission_id(&self) -> Option<Uuid> {
        self.submission_id
    }

    /// Receipt, present once the wizard is `Confirmed`.
    #[must_use]
    pub const fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }

    /// Select a different product. Unknown IDs are ignored.
    ///
    /// Returns `true` if the selection changed.
    pub fn select_product(&mut self, catalog: &ProductCatalog, id: ProductId) -> bool {
        if !self.state.is_editable() {
            return false;
        }
        let Some(product) = catalog.get(id) else {
            tracing::debug!(%id, "Ignoring unknown product");
            return false;
        };
        if product.id == self.draft.product().id {
            return false;
        }
        self.draft.set_product(product.clone());
        true
    }

    /// Set the quantity from raw user input.
    ///
    /// Numbers below 1 are clamped to 1.
    ///
    /// # Errors
    ///
    /// Returns an error for non-numeric input; the previous quantity is kept.
    pub fn set_quantity(&mut self, raw: &str) -> Result<Quantity, QuantityError> {
        let quantity = Quantity::parse(raw)?;
        if self.state.is_editable() {
            self.draft.set_quantity(quantity);
        }
        Ok(self.draft.quantity())
    }

    /// Store a new value for a field and clear its error.
    ///
    /// The error is cleared without re-validating; use [`Self::blur_field`]
    /// to surface a new one.
    pub fn update_field(&mut self, field: Field, value: &str) {
        if !self.state.is_editable() {
            return;
        }
        self.draft.set_value(field, value);
        self.errors.clear(field);
    }

    /// Re-validate one field after the buyer leaves it.
    ///
    /// Returns the field's current error, if any.
    pub fn blur_field(&mut self, field: Field) -> Option<&str> {
        if self.state.is_editable() {
            self.errors
                .set(field, validate(field, self.draft.value(field)));
        }
        self.errors.get(field)
    }

    /// Move from customer details to payment if step 1 validates.
    pub fn advance(&mut self) -> Transition {
        if self.state != WizardState::CollectingCustomerAndOrder {
            return Transition::Ignored;
        }
        if !self.check_step(Step::CustomerAndOrder) {
            tracing::debug!(invalid = self.errors.len(), "Customer details incomplete");
            return Transition::Blocked;
        }
        self.move_to(WizardState::CollectingPayment)
    }

    /// Go back from payment to customer details. Entered values are kept.
    pub fn retreat(&mut self) -> Transition {
        if self.state != WizardState::CollectingPayment {
            return Transition::Ignored;
        }
        self.submission_error = None;
        self.move_to(WizardState::CollectingCustomerAndOrder)
    }

    /// Start submitting if step 2 validates.
    ///
    /// A successful start returns [`Transition::Submitted`] with a fresh
    /// submission id. While `Submitting`, further calls return
    /// [`Transition::AlreadySubmitting`] and change nothing.
    pub fn submit(&mut self) -> Transition {
        match self.state {
            WizardState::Submitting => Transition::AlreadySubmitting,
            WizardState::CollectingPayment => {
                self.submission_error = None;
                if !self.check_step(Step::Payment) {
                    tracing::debug!(invalid = self.errors.len(), "Payment details incomplete");
                    return Transition::Blocked;
                }
                let id = Uuid::new_v4();
                self.submission_id = Some(id);
                self.move_to(WizardState::Submitting);
                Transition::Submitted(id)
            }
            WizardState::CollectingCustomerAndOrder | WizardState::Confirmed => {
                Transition::Ignored
            }
        }
    }

    /// Apply the outcome of the submission `id` started by [`Self::submit`].
    ///
    /// Success confirms the order. Failure returns to the payment step with
    /// the draft intact. Outcomes for any other submission are ignored.
    pub fn complete_submission(
        &mut self,
        id: Uuid,
        result: Result<Confirmation, SubmissionError>,
    ) -> Transition {
        if self.state != WizardState::Submitting || self.submission_id != Some(id) {
            return Transition::Ignored;
        }
        self.submission_id = None;
        match result {
            Ok(confirmation) => {
                tracing::info!(
                    order_number = %confirmation.order_number,
                    total = %confirmation.total,
                    "Order confirmed"
                );
                self.confirmation = Some(confirmation);
                self.move_to(WizardState::Confirmed)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Order submission failed");
                self.submission_error = Some(err);
                self.move_to(WizardState::CollectingPayment)
            }
        }
    }

    fn check_step(&mut self, step: Step) -> bool {
        let step_errors = validate_step(step, &self.draft);
        self.errors.replace_step(step, &step_errors);
        step_errors.is_empty()
    }

    fn move_to(&mut self, next: WizardState) -> Transition {
        tracing::debug!(from = ?self.state, to = ?next, "Checkout transition");
        self.state = next;
        Transition::Moved(next)
    }
}
