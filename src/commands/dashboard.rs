use crate::commands::invoice::totals::{from_decimal, to_decimal};
use crate::db::DbPool;
use crate::error::{BilldeskError, BilldeskResult};
use crate::extract::QueryParams;
use crate::state::AppState;
use axum::{extract::State, Json};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const DEFAULT_TOP_LIMIT: i64 = 5;

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct DashboardStats {
    pub total_sales: f64,
    pub monthly_sales: f64,
    pub yearly_sales: f64,
    pub total_invoices: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SalesChart {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopCustomer {
    pub name: String,
    pub total_purchase: f64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopProduct {
    pub name: String,
    pub quantity: f64,
    pub total: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopQuery {
    pub limit: Option<i64>,
}

fn money(value: f64) -> BilldeskResult<f64> {
    Ok(from_decimal(to_decimal("amount", value)?))
}

fn top_limit(limit: Option<i64>) -> i64 {
    match limit {
        Some(n) if n > 0 => n.min(100),
        _ => DEFAULT_TOP_LIMIT,
    }
}

pub async fn dashboard_stats_internal(pool: &DbPool, today: NaiveDate) -> BilldeskResult<DashboardStats> {
    let month = today.format("%Y-%m").to_string();
    let year = today.format("%Y").to_string();

    let sql = r#"
        SELECT
            CAST(COALESCE(SUM(total), 0.0) AS REAL),
            CAST(COALESCE(SUM(CASE WHEN strftime('%Y-%m', invoice_date) = ? THEN total END), 0.0) AS REAL),
            CAST(COALESCE(SUM(CASE WHEN strftime('%Y', invoice_date) = ? THEN total END), 0.0) AS REAL),
            COUNT(*)
        FROM invoices
        WHERE status != 'cancelled'
    "#;

    let (total, monthly, yearly, count): (f64, f64, f64, i64) = sqlx::query_as(sql)
        .bind(&month)
        .bind(&year)
        .fetch_one(pool)
        .await?;

    Ok(DashboardStats {
        total_sales: money(total)?,
        monthly_sales: money(monthly)?,
        yearly_sales: money(yearly)?,
        total_invoices: count,
    })
}

/// Sales per month of `year`, or per day of `month` when given.
pub async fn sales_chart_internal(
    pool: &DbPool,
    year: i32,
    month: Option<u32>,
) -> BilldeskResult<SalesChart> {
    let (bucket_format, period_format, period, labels) = match month {
        None => (
            "%m",
            "%Y",
            format!("{:04}", year),
            MONTH_LABELS.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
        ),
        Some(month) => {
            let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
                BilldeskError::Validation(format!("Invalid month {} for year {}", month, year))
            })?;
            let next = if month == 12 {
                NaiveDate::from_ymd_opt(year + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(year, month + 1, 1)
            }
            .ok_or_else(|| BilldeskError::Validation(format!("Invalid year {}", year)))?;
            let days = (next - first).num_days();
            (
                "%d",
                "%Y-%m",
                format!("{:04}-{:02}", year, month),
                (1..=days).map(|d| d.to_string()).collect(),
            )
        }
    };

    let rows: Vec<(i64, f64)> = sqlx::query_as(
        r#"
        SELECT
            CAST(strftime(?, invoice_date) AS INTEGER) AS bucket,
            CAST(COALESCE(SUM(total), 0.0) AS REAL) AS amount
        FROM invoices
        WHERE status != 'cancelled' AND strftime(?, invoice_date) = ?
        GROUP BY bucket
        "#,
    )
    .bind(bucket_format)
    .bind(period_format)
    .bind(&period)
    .fetch_all(pool)
    .await?;

    let mut data = vec![0.0; labels.len()];
    for (bucket, amount) in rows {
        if let Some(slot) = usize::try_from(bucket - 1).ok().and_then(|i| data.get_mut(i)) {
            *slot = money(amount)?;
        }
    }

    Ok(SalesChart { labels, data })
}

pub async fn top_customers_internal(pool: &DbPool, limit: Option<i64>) -> BilldeskResult<Vec<TopCustomer>> {
    let mut rows = sqlx::query_as::<_, TopCustomer>(
        r#"
        SELECT c.name, CAST(SUM(i.total) AS REAL) AS total_purchase
        FROM invoices i
        JOIN customers c ON i.customer_id = c.id
        WHERE i.status != 'cancelled'
        GROUP BY c.id, c.name
        ORDER BY total_purchase DESC
        LIMIT ?
        "#,
    )
    .bind(top_limit(limit))
    .fetch_all(pool)
    .await?;

    for row in &mut rows {
        row.total_purchase = money(row.total_purchase)?;
    }
    Ok(rows)
}

pub async fn top_products_internal(pool: &DbPool, limit: Option<i64>) -> BilldeskResult<Vec<TopProduct>> {
    let mut rows = sqlx::query_as::<_, TopProduct>(
        r#"
        SELECT
            p.name,
            CAST(SUM(ii.quantity) AS REAL) AS quantity,
            CAST(SUM(ii.quantity * ii.rate) AS REAL) AS total
        FROM invoice_items ii
        JOIN invoices i ON ii.invoice_id = i.id
        JOIN products p ON ii.product_id = p.id
        WHERE i.status != 'cancelled'
        GROUP BY p.id, p.name
        ORDER BY total DESC
        LIMIT ?
        "#,
    )
    .bind(top_limit(limit))
    .fetch_all(pool)
    .await?;

    for row in &mut rows {
        row.total = money(row.total)?;
    }
    Ok(rows)
}

// Axum handlers

pub async fn get_dashboard_stats(State(state): State<AppState>) -> BilldeskResult<Json<DashboardStats>> {
    let today = Local::now().date_naive();
    Ok(Json(dashboard_stats_internal(&state.pool, today).await?))
}

pub async fn get_sales_chart(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ChartQuery>,
) -> BilldeskResult<Json<SalesChart>> {
    let year = query.year.unwrap_or_else(|| Local::now().year());
    Ok(Json(sales_chart_internal(&state.pool, year, query.month).await?))
}

pub async fn get_top_customers(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<TopQuery>,
) -> BilldeskResult<Json<Vec<TopCustomer>>> {
    Ok(Json(top_customers_internal(&state.pool, query.limit).await?))
}

pub async fn get_top_products(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<TopQuery>,
) -> BilldeskResult<Json<Vec<TopProduct>>> {
    Ok(Json(top_products_internal(&state.pool, query.limit).await?))
}
