//! Checkout wizard.
//!
//! A two-step order flow: customer and order details, then payment details,
//! followed by a simulated submission and a confirmation.
//!
//! ```text
//! CollectingCustomerAndOrder --advance()--> CollectingPayment
//!            ^                                  |        |
//!            +------------retreat()-------------+     submit()
//!                                                        v
//!                         Confirmed <--processor-- Submitting
//! ```
//!
//! Everything in this module is synchronous except the payment processor.
//! Routes own the I/O (session storage, rendering) and pass the wizard
//! around explicitly.

pub mod catalog;
pub mod draft;
pub mod payment;
pub mod validation;
pub mod wizard;

pub use catalog::{CatalogError, Product, ProductCatalog};
pub use draft::{BuyerDetails, OrderDraft, PaymentDetails};
pub use payment::{Confirmation, PaymentProcessor, SimulatedProcessor, SubmissionError};
pub use validation::{Field, Step, ValidationErrors, validate, validate_step};
pub use wizard::{CheckoutWizard, Transition, WizardState};
