//! Monthly invoice numbers: `YY` + `MM` + six-digit counter, e.g. `2503000042`.

use crate::error::{BilldeskError, BilldeskResult};
use chrono::{Datelike, NaiveDate};
use sqlx::SqliteConnection;

pub const INVOICE_NUMBER_LEN: usize = 10;
pub const MAX_MONTHLY_COUNTER: i64 = 999_999;

pub fn format_invoice_number(year: i32, month: u32, counter: i64) -> BilldeskResult<String> {
    if !(1..=12).contains(&month) {
        return Err(BilldeskError::Internal(format!("Invalid month {}", month)));
    }
    if !(1..=MAX_MONTHLY_COUNTER).contains(&counter) {
        return Err(BilldeskError::Internal(format!(
            "Invoice counter {} for {}-{:02} is outside 1..={}",
            counter, year, month, MAX_MONTHLY_COUNTER
        )));
    }

    Ok(format!("{:02}{:02}{:06}", year.rem_euclid(100), month, counter))
}

pub fn is_valid_invoice_number(number: &str) -> bool {
    if number.len() != INVOICE_NUMBER_LEN || !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    matches!(number[2..4].parse::<u32>(), Ok(1..=12)) && &number[4..] != "000000"
}

/// Bumps the `(year, month)` counter and formats the new number.
///
/// Must run on the connection of the transaction that inserts the invoice,
/// and before any read in it: the upsert takes SQLite's write lock, so
/// concurrent creations serialize here and a rollback returns the number.
pub async fn next_invoice_number(
    conn: &mut SqliteConnection,
    on: NaiveDate,
) -> BilldeskResult<String> {
    let year = on.year();
    let month = on.month();

    let counter: i64 = sqlx::query_scalar(
        "INSERT INTO invoice_counter (year, month, counter) VALUES (?, ?, 1)
         ON CONFLICT(year, month) DO UPDATE SET counter = counter + 1
         RETURNING counter",
    )
    .bind(year)
    .bind(month as i64)
    .fetch_one(&mut *conn)
    .await?;

    let number = format_invoice_number(year, month, counter)?;
    debug_assert!(is_valid_invoice_number(&number));
    Ok(number)
}
