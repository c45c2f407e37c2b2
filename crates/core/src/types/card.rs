//! Payment card number helpers.
//!
//! Card numbers are stored as bare digits. Grouping is a display concern
//! only and never feeds back into the stored value.

/// Strip everything except ASCII digits.
#[must_use]
pub fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Format a card number with a space after every 4 digits.
///
/// Non-digit characters in the input are ignored.
///
/// ```
/// use crumb_core::group_card_number;
///
/// assert_eq!(group_card_number("4242424242424242"), "4242 4242 4242 4242");
/// assert_eq!(group_card_number("42424"), "4242 4");
/// ```
#[must_use]
pub fn group_card_number(input: &str) -> String {
    let digits = digits_only(input);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 4);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && i % 4 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    grouped
}
