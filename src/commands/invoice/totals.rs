//! Invoice arithmetic.
//!
//! Rates are tax-inclusive. Per line:
//!
//! ```text
//! total = quantity * rate * (1 - discount / 100)
//! tax   = total - total / (1 + tax_rate / 100)
//! ```
//!
//! and for the invoice:
//!
//! ```text
//! subtotal  = sum(line total)
//! total     = subtotal - manual_discount + previous_balance + charges
//! remaining = total - paid_amount
//! ```
//!
//! Tax is reported, never added on top. Everything runs in `Decimal`; values
//! are truncated to two places only when they leave this module.

use crate::error::{BilldeskError, BilldeskResult};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

pub fn to_decimal(field: &str, value: f64) -> BilldeskResult<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| BilldeskError::Validation(format!("{} is not a valid amount", field)))
}

/// Two-decimal truncation used for every stored or reported amount.
pub fn truncate_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

pub fn from_decimal(value: Decimal) -> f64 {
    truncate_money(value).to_f64().unwrap_or_default()
}

fn overflow() -> BilldeskError {
    BilldeskError::Validation("Amount is too large".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineAmounts {
    pub quantity: Decimal,
    pub rate: Decimal,
    pub discount_percent: Decimal,
    pub tax_percent: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineTotals {
    /// quantity * rate before the line discount.
    pub gross: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    /// Tax contained in `total`.
    pub tax: Decimal,
}

impl LineAmounts {
    pub fn totals(&self) -> BilldeskResult<LineTotals> {
        let gross = self.quantity.checked_mul(self.rate).ok_or_else(overflow)?;
        let keep = Decimal::ONE - self.discount_percent / HUNDRED;
        let total = gross.checked_mul(keep).ok_or_else(overflow)?;
        let tax = total
            .checked_div(Decimal::ONE + self.tax_percent / HUNDRED)
            .and_then(|net| total.checked_sub(net))
            .ok_or_else(overflow)?;
        let discount = gross.checked_sub(total).ok_or_else(overflow)?;

        Ok(LineTotals {
            gross,
            discount,
            total,
            tax,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Adjustments {
    pub manual_discount: Decimal,
    pub previous_balance: Decimal,
    pub charges: Decimal,
    pub paid_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceTotals {
    pub lines: Vec<LineTotals>,
    pub subtotal: Decimal,
    /// Line discounts plus the manual discount; informational.
    pub total_discount: Decimal,
    /// Tax contained in the subtotal; informational.
    pub total_tax: Decimal,
    pub total: Decimal,
    pub remaining: Decimal,
}

pub fn compute_totals(lines: &[LineAmounts], adjustments: Adjustments) -> BilldeskResult<InvoiceTotals> {
    let lines = lines
        .iter()
        .map(LineAmounts::totals)
        .collect::<BilldeskResult<Vec<_>>>()?;

    let subtotal = checked_sum(lines.iter().map(|l| l.total))?;
    let line_discount = checked_sum(lines.iter().map(|l| l.discount))?;
    let total_tax = checked_sum(lines.iter().map(|l| l.tax))?;

    let total = subtotal
        .checked_sub(adjustments.manual_discount)
        .and_then(|t| t.checked_add(adjustments.previous_balance))
        .and_then(|t| t.checked_add(adjustments.charges))
        .ok_or_else(overflow)?;
    let remaining = total
        .checked_sub(adjustments.paid_amount)
        .ok_or_else(overflow)?;
    let total_discount = line_discount
        .checked_add(adjustments.manual_discount)
        .ok_or_else(overflow)?;

    Ok(InvoiceTotals {
        subtotal,
        total_discount,
        total_tax,
        total,
        remaining,
        lines,
    })
}

fn checked_sum(mut values: impl Iterator<Item = Decimal>) -> BilldeskResult<Decimal> {
    values.try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v).ok_or_else(overflow))
}

/// Outstanding amount of a stored invoice.
pub fn remaining_amount(total: f64, paid_amount: f64) -> f64 {
    Decimal::from_f64(total)
        .zip(Decimal::from_f64(paid_amount))
        .and_then(|(total, paid)| total.checked_sub(paid))
        .map(from_decimal)
        .unwrap_or(total - paid_amount)
}
