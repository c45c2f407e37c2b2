//! The in-progress order.

use crumb_core::{Price, Quantity, digits_only};
use serde::{Deserialize, Serialize};

use super::{Field, Product};

/// Longest card number accepted, in digits.
pub const MAX_CARD_DIGITS: usize = 19;

/// Longest CVV accepted, in digits.
pub const MAX_CVV_DIGITS: usize = 4;

/// Buyer contact details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

/// Payment card details.
///
/// `card_number` and `cvv` only ever hold ASCII digits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub card_number: String,
    pub expiration: String,
    pub cvv: String,
}

impl PaymentDetails {
    /// Last four digits of the card, for receipts.
    #[must_use]
    pub fn card_last4(&self) -> &str {
        let start = self.card_number.len().saturating_sub(4);
        self.card_number.get(start..).unwrap_or_default()
    }
}

/// Everything the buyer has entered so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub buyer: BuyerDetails,
    pub payment: PaymentDetails,
    product: Product,
    quantity: Quantity,
}

impl OrderDraft {
    /// A blank draft for `product` with a quantity of 1.
    #[must_use]
    pub fn new(product: Product) -> Self {
        Self {
            buyer: BuyerDetails::default(),
            payment: PaymentDetails::default(),
            product,
            quantity: Quantity::MIN,
        }
    }

    #[must_use]
    pub const fn product(&self) -> &Product {
        &self.product
    }

    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Unit price times quantity. Computed on every call.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.product.unit_price.times(self.quantity)
    }

    /// Current stored value of a field.
    #[must_use]
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.buyer.name,
            Field::Email => &self.buyer.email,
            Field::Phone => &self.buyer.phone,
            Field::Address => &self.buyer.address,
            Field::CardNumber => &self.payment.card_number,
            Field::Expiration => &self.payment.expiration,
            Field::Cvv => &self.payment.cvv,
        }
    }

    pub(super) fn set_value(&mut self, field: Field, value: &str) {
        match field {
            Field::Name => value.clone_into(&mut self.buyer.name),
            Field::Email => value.clone_into(&mut self.buyer.email),
            Field::Phone => value.clone_into(&mut self.buyer.phone),
            Field::Address => value.clone_into(&mut self.buyer.address),
            Field::CardNumber => {
                self.payment.card_number = digits_capped(value, MAX_CARD_DIGITS);
            }
            Field::Expiration => value.trim().clone_into(&mut self.payment.expiration),
            Field::Cvv => self.payment.cvv = digits_capped(value, MAX_CVV_DIGITS),
        }
    }

    pub(super) fn set_product(&mut self, product: Product) {
        self.product = product;
    }

    pub(super) const fn set_quantity(&mut self, quantity: Quantity) {
        self.quantity = quantity;
    }
}

fn digits_capped(value: &str, max: usize) -> String {
    let mut digits = digits_only(value);
    digits.truncate(max);
    digits
}
