//! Checkout route handlers.
//!
//! The wizard lives in the session under [`WIZARD_SESSION_KEY`]. Every
//! handler loads it, applies one user action, stores it back, and renders
//! or redirects; the session lock middleware keeps two requests for one
//! session from interleaving. Full-page form posts follow
//! post/redirect/get; the `selection` and `field` endpoints return small
//! HTML fragments for the progressive-enhancement script.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use crumb_core::ProductId;
use serde::Deserialize;
use tower_sessions::{Session, SessionStore, session::Id, session_store};
use tracing::{Instrument, instrument};
use uuid::Uuid;

use crate::checkout::{
    CheckoutWizard, Confirmation, Field, OrderDraft, PaymentProcessor, ProductCatalog, Step,
    SubmissionError, Transition, WizardState,
};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{CspNonce, RequestId};
use crate::state::AppState;

/// Session key holding the serialized [`CheckoutWizard`].
pub const WIZARD_SESSION_KEY: &str = "checkout_wizard";

// =============================================================================
// View Models
// =============================================================================

/// A product in a picker or listing.
#[derive(Clone)]
pub struct ProductOption {
    pub id: i32,
    pub name: String,
    pub price: String,
    pub image: String,
    pub selected: bool,
}

impl ProductOption {
    /// All catalog products, marking `selected` if given.
    #[must_use]
    pub fn list(catalog: &ProductCatalog, selected: Option<ProductId>) -> Vec<Self> {
        catalog
            .iter()
            .map(|product| Self {
                id: product.id.as_i32(),
                name: product.name.clone(),
                price: product.unit_price.to_string(),
                image: product.image.clone(),
                selected: Some(product.id) == selected,
            })
            .collect()
    }
}

/// One text input with its current value and error.
#[derive(Clone)]
pub struct FieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub value: String,
    pub error: Option<String>,
    pub input_type: &'static str,
    pub input_mode: &'static str,
    pub autocomplete: &'static str,
    pub placeholder: &'static str,
    /// Render the value in groups of four (card numbers).
    pub grouped: bool,
}

impl FieldView {
    fn new(wizard: &CheckoutWizard, field: Field) -> Self {
        let (input_type, input_mode, autocomplete, placeholder) = match field {
            Field::Name => ("text", "text", "name", ""),
            Field::Email => ("email", "email", "email", "you@example.com"),
            Field::Phone => ("tel", "tel", "tel", ""),
            Field::Address => ("text", "text", "street-address", ""),
            Field::CardNumber => ("text", "numeric", "cc-number", "1234 5678 9012 3456"),
            Field::Expiration => ("text", "numeric", "cc-exp", "MM/YY"),
            Field::Cvv => ("text", "numeric", "cc-csc", "123"),
        };

        Self {
            name: field.as_str(),
            label: field.label(),
            value: wizard.draft().value(field).to_string(),
            error: wizard.errors().get(field).map(str::to_string),
            input_type,
            input_mode,
            autocomplete,
            placeholder,
            grouped: field == Field::CardNumber,
        }
    }

    fn for_step(wizard: &CheckoutWizard, step: Step) -> Vec<Self> {
        step.fields()
            .iter()
            .map(|&field| Self::new(wizard, field))
            .collect()
    }
}

/// Order recap shown on the payment step.
#[derive(Clone)]
pub struct OrderSummaryView {
    pub product_name: String,
    pub image: String,
    pub unit_price: String,
    pub quantity: u32,
    pub total: String,
    pub buyer_name: String,
}

impl From<&CheckoutWizard> for OrderSummaryView {
    fn from(wizard: &CheckoutWizard) -> Self {
        let draft = wizard.draft();
        Self {
            product_name: draft.product().name.clone(),
            image: draft.product().image.clone(),
            unit_price: draft.product().unit_price.to_string(),
            quantity: draft.quantity().get(),
            total: wizard.total_price().to_string(),
            buyer_name: draft.buyer.name.trim().to_string(),
        }
    }
}

/// Receipt shown once the order is placed.
#[derive(Clone)]
pub struct ConfirmationView {
    pub order_number: String,
    pub buyer_name: String,
    pub email: String,
    pub product_name: String,
    pub quantity: u32,
    pub total: String,
    pub card_last4: String,
    pub placed_at: String,
}

impl From<&Confirmation> for ConfirmationView {
    fn from(confirmation: &Confirmation) -> Self {
        Self {
            order_number: confirmation.order_number.clone(),
            buyer_name: confirmation.buyer_name.clone(),
            email: confirmation.email.clone(),
            product_name: confirmation.product_name.clone(),
            quantity: confirmation.quantity.get(),
            total: confirmation.total.to_string(),
            card_last4: confirmation.card_last4.clone(),
            placed_at: confirmation
                .placed_at
                .format("%B %-d, %Y at %H:%M UTC")
                .to_string(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Step 1: customer and order details.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/customer.html")]
pub struct CustomerStepTemplate {
    pub products: Vec<ProductOption>,
    pub quantity: u32,
    pub total: String,
    pub fields: Vec<FieldView>,
    pub nonce: String,
}

/// Step 2: payment details.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentStepTemplate {
    pub summary: OrderSummaryView,
    pub fields: Vec<FieldView>,
    pub submission_error: Option<String>,
    pub nonce: String,
}

/// Shown while a submission is in flight.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/processing.html")]
pub struct ProcessingTemplate {
    pub nonce: String,
}

/// Order confirmation.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub confirmation: ConfirmationView,
    pub nonce: String,
}

/// Inline error fragment for a single field.
#[derive(Template, WebTemplate)]
#[template(path = "partials/field_error.html")]
pub struct FieldErrorTemplate {
    pub name: &'static str,
    pub error: Option<String>,
}

/// Order total fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/order_total.html")]
pub struct OrderTotalTemplate {
    pub total: String,
}

/// Render whatever the wizard's current state calls for.
fn render_step(wizard: &CheckoutWizard, catalog: &ProductCatalog, nonce: String) -> Response {
    match wizard.state() {
        WizardState::CollectingCustomerAndOrder => CustomerStepTemplate {
            products: ProductOption::list(catalog, Some(wizard.draft().product().id)),
            quantity: wizard.draft().quantity().get(),
            total: wizard.total_price().to_string(),
            fields: FieldView::for_step(wizard, Step::CustomerAndOrder),
            nonce,
        }
        .into_response(),
        WizardState::CollectingPayment => PaymentStepTemplate {
            summary: OrderSummaryView::from(wizard),
            fields: FieldView::for_step(wizard, Step::Payment),
            submission_error: wizard
                .submission_error()
                .map(|err| err.user_message().to_string()),
            nonce,
        }
        .into_response(),
        WizardState::Submitting => ProcessingTemplate { nonce }.into_response(),
        WizardState::Confirmed => match wizard.confirmation() {
            Some(confirmation) => ConfirmationTemplate {
                confirmation: ConfirmationView::from(confirmation),
                nonce,
            }
            .into_response(),
            None => ProcessingTemplate { nonce }.into_response(),
        },
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Load the session's wizard, starting a fresh one if there is none.
async fn load_wizard(session: &Session, catalog: &ProductCatalog) -> CheckoutWizard {
    match session.get::<CheckoutWizard>(WIZARD_SESSION_KEY).await {
        Ok(Some(wizard)) => wizard,
        Ok(None) => {
            tracing::debug!("Starting new checkout");
            CheckoutWizard::new(catalog)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Discarding unreadable checkout state");
            CheckoutWizard::new(catalog)
        }
    }
}

/// Store the wizard in the session.
async fn store_wizard(session: &Session, wizard: &CheckoutWizard) -> Result<()> {
    session.insert(WIZARD_SESSION_KEY, wizard).await?;
    Ok(())
}

/// Apply optional product and quantity inputs.
fn apply_selection(
    wizard: &mut CheckoutWizard,
    catalog: &ProductCatalog,
    product_id: Option<&str>,
    quantity: Option<&str>,
) {
    if let Some(raw) = product_id {
        match raw.parse::<ProductId>() {
            Ok(id) => {
                wizard.select_product(catalog, id);
            }
            Err(_) => tracing::debug!(product_id = raw, "Ignoring malformed product id"),
        }
    }
    if let Some(raw) = quantity {
        if let Err(e) = wizard.set_quantity(raw) {
            tracing::debug!(error = %e, "Keeping previous quantity");
        }
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Query string for the checkout page.
#[derive(Debug, Deserialize)]
pub struct ShowQuery {
    pub product: Option<String>,
}

/// Product/quantity change.
#[derive(Debug, Deserialize)]
pub struct SelectionForm {
    pub product_id: Option<String>,
    pub quantity: Option<String>,
}

/// Single field edit.
#[derive(Debug, Deserialize)]
pub struct FieldForm {
    #[serde(default)]
    pub value: String,
}

/// Step 1 form data.
#[derive(Debug, Deserialize)]
pub struct DetailsForm {
    pub product_id: Option<String>,
    pub quantity: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

/// Step 2 form data.
#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub expiration: String,
    #[serde(default)]
    pub cvv: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the current checkout step.
#[instrument(skip(state, session, nonce))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Query(query): Query<ShowQuery>,
) -> Result<Response> {
    let mut wizard = load_wizard(&session, state.catalog()).await;
    apply_selection(&mut wizard, state.catalog(), query.product.as_deref(), None);
    store_wizard(&session, &wizard).await?;

    Ok(render_step(&wizard, state.catalog(), nonce))
}

/// Change product or quantity; returns the new total.
#[instrument(skip(state, session))]
pub async fn selection(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SelectionForm>,
) -> Result<OrderTotalTemplate> {
    let mut wizard = load_wizard(&session, state.catalog()).await;
    apply_selection(
        &mut wizard,
        state.catalog(),
        form.product_id.as_deref(),
        form.quantity.as_deref(),
    );
    store_wizard(&session, &wizard).await?;

    Ok(OrderTotalTemplate {
        total: wizard.total_price().to_string(),
    })
}

/// Store one field's value and validate it; returns the field's error slot.
#[instrument(skip(state, session, form))]
pub async fn field(
    State(state): State<AppState>,
    session: Session,
    Path(field): Path<String>,
    Form(form): Form<FieldForm>,
) -> Result<FieldErrorTemplate> {
    let field: Field = field.parse()?;

    let mut wizard = load_wizard(&session, state.catalog()).await;
    wizard.update_field(field, &form.value);
    let error = wizard.blur_field(field).map(str::to_string);
    store_wizard(&session, &wizard).await?;

    Ok(FieldErrorTemplate {
        name: field.as_str(),
        error,
    })
}

/// Submit customer and order details.
#[instrument(skip(state, session, nonce, form))]
pub async fn details(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Form(form): Form<DetailsForm>,
) -> Result<Response> {
    let mut wizard = load_wizard(&session, state.catalog()).await;
    apply_selection(
        &mut wizard,
        state.catalog(),
        form.product_id.as_deref(),
        form.quantity.as_deref(),
    );
    wizard.update_field(Field::Name, &form.name);
    wizard.update_field(Field::Email, &form.email);
    wizard.update_field(Field::Phone, &form.phone);
    wizard.update_field(Field::Address, &form.address);

    let transition = wizard.advance();
    store_wizard(&session, &wizard).await?;

    match transition {
        Transition::Blocked => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            render_step(&wizard, state.catalog(), nonce),
        )
            .into_response()),
        Transition::Moved(_) => {
            let product_id = wizard.draft().product().id.to_string();
            add_breadcrumb(
                "checkout",
                "Entered payment step",
                Some(&[("product_id", product_id.as_str())]),
            );
            Ok(Redirect::to("/checkout").into_response())
        }
        Transition::Submitted(_) | Transition::AlreadySubmitting | Transition::Ignored => {
            Ok(Redirect::to("/checkout").into_response())
        }
    }
}

/// Go back to customer details.
#[instrument(skip(state, session))]
pub async fn back(State(state): State<AppState>, session: Session) -> Result<Redirect> {
    let mut wizard = load_wizard(&session, state.catalog()).await;
    wizard.retreat();
    store_wizard(&session, &wizard).await?;

    Ok(Redirect::to("/checkout"))
}

/// Submit payment details and place the order.
///
/// The wizard is saved in `Submitting` before this returns; the browser is
/// sent to the processing view until the outcome lands. A concurrent request
/// for the same session waits on the session lock, then sees `Submitting`
/// and does nothing. The processor runs on its own task so the state always
/// resolves, even if the client disconnects.
#[instrument(skip(state, session, nonce, request_id, form))]
pub async fn payment(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
    request_id: RequestId,
    Form(form): Form<PaymentForm>,
) -> Result<Response> {
    let mut wizard = load_wizard(&session, state.catalog()).await;
    wizard.update_field(Field::CardNumber, &form.card_number);
    wizard.update_field(Field::Expiration, &form.expiration);
    wizard.update_field(Field::Cvv, &form.cvv);

    match wizard.submit() {
        Transition::Submitted(submission) => {
            store_wizard(&session, &wizard).await?;
            session.save().await?;
            let session_id = session.id().ok_or(AppError::MissingSessionId)?;
            add_breadcrumb("checkout", "Submitted order", None);

            let span = tracing::info_span!(
                "order_submission",
                request_id = %request_id,
                %submission,
            );
            tokio::spawn(
                run_submission(state, session_id, submission, wizard.draft().clone())
                    .instrument(span),
            );

            Ok(Redirect::to("/checkout").into_response())
        }
        Transition::AlreadySubmitting => {
            tracing::info!("Ignoring duplicate order submission");
            Ok(ProcessingTemplate { nonce }.into_response())
        }
        Transition::Blocked => {
            store_wizard(&session, &wizard).await?;
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                render_step(&wizard, state.catalog(), nonce),
            )
                .into_response())
        }
        Transition::Moved(_) | Transition::Ignored => Ok(Redirect::to("/checkout").into_response()),
    }
}

/// Charge for the draft, then record the outcome in the session.
async fn run_submission(state: AppState, session_id: Id, submission: Uuid, draft: OrderDraft) {
    let result = state.processor().process(&draft).await;

    if let Err(e) = record_outcome(&state, session_id, submission, result).await {
        let event_id = sentry::capture_error(&e);
        tracing::error!(
            error = %e,
            sentry_event_id = %event_id,
            "Failed to record order outcome"
        );
    }
}

/// Apply a submission outcome to the stored wizard.
///
/// Runs under the session lock against the store itself, since the request
/// that started the submission is long gone. If the buyer left the checkout
/// in the meantime, the stored wizard is missing or belongs to a newer
/// checkout, and the outcome is dropped.
async fn record_outcome(
    state: &AppState,
    session_id: Id,
    submission: Uuid,
    result: std::result::Result<Confirmation, SubmissionError>,
) -> std::result::Result<(), session_store::Error> {
    let _guard = state.session_locks().acquire(&session_id.to_string()).await;
    let store = state.session_store();

    let Some(mut record) = store.load(&session_id).await? else {
        tracing::info!("Session ended before the order resolved");
        return Ok(());
    };
    let Some(value) = record.data.get(WIZARD_SESSION_KEY) else {
        tracing::info!("Checkout discarded before the order resolved");
        return Ok(());
    };
    let mut wizard: CheckoutWizard = serde_json::from_value(value.clone())
        .map_err(|e| session_store::Error::Decode(e.to_string()))?;

    if wizard.complete_submission(submission, result) == Transition::Ignored {
        tracing::info!("Checkout moved on before the order resolved");
        return Ok(());
    }

    let value =
        serde_json::to_value(&wizard).map_err(|e| session_store::Error::Encode(e.to_string()))?;
    record.data.insert(WIZARD_SESSION_KEY.to_owned(), value);
    store.save(&record).await
}

/// Discard the checkout and return to the landing page.
#[instrument(skip(session))]
pub async fn reset(session: Session) -> Result<Redirect> {
    session.remove_value(WIZARD_SESSION_KEY).await?;
    Ok(Redirect::to("/"))
}
