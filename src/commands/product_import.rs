//! Bulk product import from already-parsed spreadsheet rows.
//!
//! Rows are keyed by product code: a known code updates that product and
//! replaces its units, an unknown code creates it. Category, unit and company
//! names are resolved case-insensitively and created on first sight. Each row
//! commits on its own so one bad row never discards the rest.

use crate::commands::catalog::{find_or_create_by_name, LookupTable};
use crate::commands::product::{insert_product, update_product_row, ProductInput, ProductUnitInput};
use crate::db::DbPool;
use crate::error::{BilldeskError, BilldeskResult};
use crate::extract::JsonBody;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::SqliteConnection;

/// Spreadsheet cells arrive as numbers or as text depending on the sheet.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Cell {
    Number(f64),
    Text(String),
}

fn number_cell<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Cell>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Cell::Number(n)) => Ok(Some(n)),
        Some(Cell::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Cell::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("'{}' is not a number", s))),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportUnit {
    pub unit_name: String,
    #[serde(default, deserialize_with = "number_cell")]
    pub conversion_rate: Option<f64>,
    #[serde(default, deserialize_with = "number_cell")]
    pub retail_rate: Option<f64>,
    #[serde(default, deserialize_with = "number_cell")]
    pub wholesale_rate: Option<f64>,
}

/// `additional_units` may be a real array or the JSON text of one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AdditionalUnits {
    List(Vec<ImportUnit>),
    Encoded(String),
}

impl AdditionalUnits {
    fn into_units(self) -> BilldeskResult<Vec<ImportUnit>> {
        match self {
            AdditionalUnits::List(units) => Ok(units),
            AdditionalUnits::Encoded(text) if text.trim().is_empty() => Ok(Vec::new()),
            AdditionalUnits::Encoded(text) => Ok(serde_json::from_str(&text)?),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportRow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    pub category_name: Option<String>,
    #[serde(default)]
    pub base_unit_name: String,
    #[serde(default, deserialize_with = "number_cell")]
    pub base_rate: Option<f64>,
    #[serde(default, deserialize_with = "number_cell")]
    pub base_wholesale_rate: Option<f64>,
    #[serde(default, deserialize_with = "number_cell")]
    pub purchase_rate: Option<f64>,
    pub hsn_code: Option<String>,
    pub company_name: Option<String>,
    #[serde(default, deserialize_with = "number_cell")]
    pub tax_percentage: Option<f64>,
    pub additional_units: Option<AdditionalUnits>,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub rows: Vec<ImportRow>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ImportFailure {
    /// 1-based position in the submitted rows.
    pub row: usize,
    pub code: String,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub errors: Vec<ImportFailure>,
}

enum RowOutcome {
    Created,
    Updated,
}

async fn optional_lookup(
    conn: &mut SqliteConnection,
    table: LookupTable,
    name: Option<&str>,
) -> BilldeskResult<Option<i64>> {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => Ok(Some(find_or_create_by_name(conn, table, name).await?)),
        None => Ok(None),
    }
}

async fn resolve_row(conn: &mut SqliteConnection, row: ImportRow) -> BilldeskResult<ProductInput> {
    let base_rate = row
        .base_rate
        .ok_or_else(|| BilldeskError::Validation("Base rate is required".to_string()))?;

    let category_id = optional_lookup(conn, LookupTable::Categories, row.category_name.as_deref()).await?;
    let company_id =
        optional_lookup(conn, LookupTable::ProductCompanies, row.company_name.as_deref()).await?;
    let base_unit_id = find_or_create_by_name(conn, LookupTable::Units, &row.base_unit_name).await?;

    let extra = match row.additional_units {
        Some(units) => units.into_units()?,
        None => Vec::new(),
    };

    let mut multi_units = Vec::with_capacity(extra.len());
    for unit in extra {
        let unit_id = find_or_create_by_name(conn, LookupTable::Units, &unit.unit_name).await?;
        let retail_rate = unit.retail_rate.unwrap_or(0.0);
        multi_units.push(ProductUnitInput {
            unit_id,
            conversion_rate: unit.conversion_rate.unwrap_or(1.0),
            retail_rate,
            wholesale_rate: unit.wholesale_rate.unwrap_or(retail_rate),
        });
    }

    ProductInput {
        name: row.name,
        code: row.code,
        category_id,
        base_unit_id,
        base_rate,
        base_wholesale_rate: row.base_wholesale_rate,
        purchase_rate: row.purchase_rate,
        hsn_code: row.hsn_code,
        company_id,
        tax_percentage: row.tax_percentage,
        multi_units,
    }
    .validated()
}

async fn import_row(pool: &DbPool, row: ImportRow) -> BilldeskResult<RowOutcome> {
    let mut tx = pool.begin().await?;
    let input = resolve_row(&mut tx, row).await?;

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE code = ?")
        .bind(&input.code)
        .fetch_optional(&mut *tx)
        .await?;

    let outcome = match existing {
        Some(id) => {
            update_product_row(&mut tx, id, &input).await?;
            RowOutcome::Updated
        }
        None => {
            insert_product(&mut tx, &input).await?;
            RowOutcome::Created
        }
    };

    tx.commit().await?;
    Ok(outcome)
}

pub async fn import_products_internal(pool: &DbPool, rows: Vec<ImportRow>) -> BilldeskResult<ImportReport> {
    let mut report = ImportReport {
        total: rows.len(),
        ..Default::default()
    };

    for (index, row) in rows.into_iter().enumerate() {
        let code = row.code.trim().to_string();
        match import_row(pool, row).await {
            Ok(RowOutcome::Created) => report.created += 1,
            Ok(RowOutcome::Updated) => report.updated += 1,
            Err(err) => {
                tracing::warn!("Import row {} ({}) failed: {}", index + 1, code, err);
                report.failed += 1;
                report.errors.push(ImportFailure {
                    row: index + 1,
                    code,
                    error: err.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "Product import finished: {} created, {} updated, {} failed",
        report.created,
        report.updated,
        report.failed
    );
    Ok(report)
}

pub async fn import_products(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ImportRequest>,
) -> BilldeskResult<Json<ImportReport>> {
    Ok(Json(import_products_internal(&state.pool, payload.rows).await?))
}
