//! Custom Askama template filters.

use std::fmt::Display;

/// Groups card digits in fours for display.
///
/// Usage in templates: `{{ card_number|card_groups }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn card_groups(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(crumb_core::group_card_number(&value.to_string()))
}

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}
