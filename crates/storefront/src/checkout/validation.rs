//! Field validation for the checkout form.
//!
//! All functions here are pure. Messages are user-facing and rendered inline
//! next to the offending input.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crumb_core::Email;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::OrderDraft;

static EXPIRATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0[1-9]|1[0-2])/\d{2}$").expect("Invalid regex"));

/// A wizard step that collects form input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    CustomerAndOrder,
    Payment,
}

impl Step {
    /// Fields collected on this step, in display order.
    #[must_use]
    pub const fn fields(self) -> &'static [Field] {
        match self {
            Self::CustomerAndOrder => &[Field::Name, Field::Email, Field::Phone, Field::Address],
            Self::Payment => &[Field::CardNumber, Field::Expiration, Field::Cvv],
        }
    }

    /// One-based step number shown in the progress indicator.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::CustomerAndOrder => 1,
            Self::Payment => 2,
        }
    }
}

/// A validated text input on the checkout form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Email,
    Phone,
    Address,
    CardNumber,
    Expiration,
    Cvv,
}

impl Field {
    /// The form input name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::CardNumber => "card_number",
            Self::Expiration => "expiration",
            Self::Cvv => "cvv",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::Address => "Address",
            Self::CardNumber => "Card number",
            Self::Expiration => "Expiration date",
            Self::Cvv => "CVV",
        }
    }

    /// The step whose form owns this field.
    #[must_use]
    pub const fn step(self) -> Step {
        match self {
            Self::Name | Self::Email | Self::Phone | Self::Address => Step::CustomerAndOrder,
            Self::CardNumber | Self::Expiration | Self::Cvv => Step::Payment,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a form names a field the checkout does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown checkout field: {0}")]
pub struct UnknownField(pub String);

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            "address" => Ok(Self::Address),
            "card_number" | "cardNumber" => Ok(Self::CardNumber),
            "expiration" => Ok(Self::Expiration),
            "cvv" => Ok(Self::Cvv),
            other => Err(UnknownField(other.to_owned())),
        }
    }
}

/// Validate a single field value.
///
/// Returns the error message to show, or `None` if the value is valid.
#[must_use]
pub fn validate(field: Field, value: &str) -> Option<String> {
    let value = value.trim();

    match field {
        Field::Email => {
            if value.is_empty() {
                Some("Email is required".to_owned())
            } else if Email::parse(value).is_err() {
                Some("Enter a valid email address".to_owned())
            } else {
                None
            }
        }
        Field::Expiration => {
            if value.is_empty() {
                Some("Expiration date is required".to_owned())
            } else if EXPIRATION_RE.is_match(value) {
                None
            } else {
                Some("Expiration must be in MM/YY format".to_owned())
            }
        }
        Field::Name | Field::Phone | Field::Address | Field::CardNumber | Field::Cvv => {
            value
                .is_empty()
                .then(|| format!("{} is required", field.label()))
        }
    }
}

/// Validate every field of a step against the draft.
#[must_use]
pub fn validate_step(step: Step, draft: &OrderDraft) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for &field in step.fields() {
        errors.set(field, validate(field, draft.value(field)));
    }
    errors
}

/// Current per-field error messages.
///
/// A field missing from the map is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<Field, String>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Error message for a field, if it is currently invalid.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Set or clear a field's error.
    pub fn set(&mut self, field: Field, message: Option<String>) {
        match message {
            Some(message) => {
                self.0.insert(field, message);
            }
            None => {
                self.0.remove(&field);
            }
        }
    }

    /// Clear a field's error.
    pub fn clear(&mut self, field: Field) {
        self.0.remove(&field);
    }

    /// Replace the errors of every field in `step` with `other`'s.
    pub fn replace_step(&mut self, step: Step, other: &Self) {
        for &field in step.fields() {
            self.set(field, other.get(field).map(str::to_owned));
        }
    }

    /// Invalid fields in display order.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }
}
