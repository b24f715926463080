use crate::error::{BilldeskError, BilldeskResult};
use chrono::{DateTime, NaiveDate};

pub fn parse_date_safe(date_str: &str) -> Option<NaiveDate> {
    let date_str = date_str.trim();
    if date_str.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_str, "%Y%m%d"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(date_str)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

pub fn parse_required_date(field: &str, value: &str) -> BilldeskResult<NaiveDate> {
    parse_date_safe(value)
        .ok_or_else(|| BilldeskError::Validation(format!("Invalid {}: '{}'", field, value)))
}

/// Blank strings become `None`, everything else is trimmed.
pub fn trim_to_option(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn require_text(field: &str, value: &str) -> BilldeskResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BilldeskError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

pub fn require_non_negative(field: &str, value: f64) -> BilldeskResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(BilldeskError::Validation(format!(
            "{} must be a non-negative number",
            field
        )));
    }
    Ok(())
}

pub fn require_positive(field: &str, value: f64) -> BilldeskResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(BilldeskError::Validation(format!(
            "{} must be greater than zero",
            field
        )));
    }
    Ok(())
}

pub fn require_percentage(field: &str, value: f64) -> BilldeskResult<()> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(BilldeskError::Validation(format!(
            "{} must be between 0 and 100",
            field
        )));
    }
    Ok(())
}
