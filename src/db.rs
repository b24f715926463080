use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{FromRow, Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{BilldeskError, BilldeskResult};

pub type DbPool = Pool<Sqlite>;

pub async fn init_pool(database_url: &str) -> BilldeskResult<DbPool> {
    let opts = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| BilldeskError::Internal(format!("Invalid DB URL: {}", e)))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    Ok(SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(opts)
        .await?)
}

/// Single-connection in-memory database with the schema applied.
///
/// The connection is never recycled: an in-memory SQLite database lives only
/// as long as its connection.
#[cfg(test)]
pub async fn init_memory_pool() -> BilldeskResult<DbPool> {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| BilldeskError::Internal(format!("Invalid DB URL: {}", e)))?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(opts)
        .await?;

    init_database(&pool).await?;
    Ok(pool)
}

pub async fn init_database(pool: &DbPool) -> BilldeskResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database schema is up to date");
    Ok(())
}

// ---------------------------------------------------------------------------
// Enumerations stored as TEXT
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CustomerType {
    Wholesale,
    #[default]
    Retail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Created,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Created => "created",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = BilldeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "draft" => Ok(InvoiceStatus::Draft),
            "created" => Ok(InvoiceStatus::Created),
            "paid" => Ok(InvoiceStatus::Paid),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(BilldeskError::Validation(format!(
                "Invalid invoice status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SchemeType {
    Category,
    Product,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Flat,
    BuyXGetY,
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub created_at: Option<NaiveDateTime>,
}

/// Shared row shape of `categories`, `units` and `product_companies`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LookupEntry {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub code: String,
    #[serde(rename = "categoryId")]
    pub category_id: Option<i64>,
    #[serde(rename = "baseUnitId")]
    pub base_unit_id: i64,
    #[serde(rename = "baseRate")]
    pub base_rate: f64,
    #[serde(rename = "baseWholesaleRate")]
    pub base_wholesale_rate: Option<f64>,
    #[serde(rename = "purchaseRate")]
    pub purchase_rate: Option<f64>,
    #[serde(rename = "hsnCode")]
    pub hsn_code: Option<String>,
    #[serde(rename = "companyId")]
    pub company_id: Option<i64>,
    #[serde(rename = "taxPercentage")]
    pub tax_percentage: Option<f64>,
    pub created_at: Option<NaiveDateTime>,
    #[sqlx(default)]
    pub category_name: Option<String>,
    #[sqlx(default)]
    pub base_unit_name: Option<String>,
    #[sqlx(default)]
    pub company_name: Option<String>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<Vec<ProductUnit>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductUnit {
    pub id: i64,
    #[serde(rename = "productId")]
    pub product_id: i64,
    #[serde(rename = "unitId")]
    pub unit_id: i64,
    #[serde(rename = "conversionRate")]
    pub conversion_rate: f64,
    #[serde(rename = "retailRate")]
    pub retail_rate: f64,
    #[serde(rename = "wholesaleRate")]
    pub wholesale_rate: f64,
    #[sqlx(default)]
    pub unit_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub customer_type: CustomerType,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String,
    pub customer_id: i64,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub subtotal: f64,
    pub manual_discount: f64,
    pub previous_balance: f64,
    pub total_discount: f64,
    pub total_tax: f64,
    pub charges: f64,
    pub paid_amount: f64,
    pub total: f64,
    pub status: InvoiceStatus,
    pub created_at: Option<NaiveDateTime>,
    #[sqlx(default)]
    pub customer_name: Option<String>,
    #[sqlx(default)]
    pub customer_email: Option<String>,
    #[sqlx(default)]
    pub customer_phone: Option<String>,
    #[sqlx(default)]
    pub customer_address: Option<String>,
    #[sqlx(skip)]
    pub remaining_amount: f64,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<InvoiceItem>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InvoiceItem {
    pub id: i64,
    pub invoice_id: i64,
    pub product_id: i64,
    pub unit_id: i64,
    pub quantity: f64,
    pub rate: f64,
    pub discount: f64,
    pub total: f64,
    pub created_at: Option<NaiveDateTime>,
    #[sqlx(default)]
    pub product_name: Option<String>,
    #[sqlx(default)]
    pub product_code: Option<String>,
    #[sqlx(default)]
    pub unit_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub gst: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub logo: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Scheme {
    pub id: i64,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub scheme_type: SchemeType,
    pub discount_type: DiscountType,
    pub discount_value: Option<f64>,
    pub buy_quantity: Option<i64>,
    pub free_quantity: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: Option<NaiveDateTime>,
    #[sqlx(skip)]
    pub categories: Vec<SchemeCategoryRef>,
    #[sqlx(skip)]
    pub products: Vec<SchemeProductRef>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SchemeCategoryRef {
    #[serde(skip)]
    pub scheme_id: i64,
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SchemeProductRef {
    #[serde(skip)]
    pub scheme_id: i64,
    pub id: i64,
    pub name: String,
    pub code: String,
    #[serde(rename = "unitId")]
    pub unit_id: i64,
    pub quantity: f64,
    #[sqlx(default)]
    pub unit_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Document {
    pub id: i64,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub unit_id: Option<i64>,
    pub title: String,
    pub content: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    #[sqlx(default)]
    pub category_name: Option<String>,
    #[sqlx(default)]
    pub unit_name: Option<String>,
}
