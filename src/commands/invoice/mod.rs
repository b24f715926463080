pub mod numbering;
pub mod totals;

use crate::commands::pricing::select_rate;
use crate::commands::product::fetch_product;
use crate::commands::utils::{
    parse_required_date, require_non_negative, require_percentage, require_positive,
};
use crate::commands::{IdResponse, MessageResponse};
use crate::db::{CustomerType, DbPool, Invoice, InvoiceItem, InvoiceStatus, Product};
use crate::error::{BilldeskError, BilldeskResult};
use crate::extract::{JsonBody, PathParams, QueryParams};
use crate::state::AppState;
use axum::{extract::State, Json};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use std::collections::HashMap;
use std::str::FromStr;

use numbering::next_invoice_number;
use totals::{compute_totals, from_decimal, remaining_amount, to_decimal, Adjustments, LineAmounts};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItemInput {
    pub product_id: i64,
    pub unit_id: i64,
    pub quantity: f64,
    /// Resolved from the product and customer type when absent.
    pub rate: Option<f64>,
    #[serde(default)]
    pub discount: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceInput {
    pub customer_id: i64,
    pub invoice_date: String,
    pub due_date: String,
    pub items: Vec<InvoiceItemInput>,
    #[serde(default)]
    pub manual_discount: f64,
    #[serde(default)]
    pub previous_balance: f64,
    #[serde(default)]
    pub charges: f64,
    #[serde(default)]
    pub paid_amount: f64,
    pub status: Option<InvoiceStatus>,
}

#[derive(Debug, Serialize)]
pub struct CreatedInvoice {
    pub id: i64,
    pub invoice_number: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusChanged {
    pub id: i64,
    pub status: InvoiceStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceFilter {
    pub status: Option<String>,
    pub customer_id: Option<i64>,
}

struct ValidatedInput {
    invoice_date: NaiveDate,
    due_date: NaiveDate,
    adjustments: Adjustments,
}

fn validate_input(input: &InvoiceInput) -> BilldeskResult<ValidatedInput> {
    let invoice_date = parse_required_date("invoice date", &input.invoice_date)?;
    let due_date = parse_required_date("due date", &input.due_date)?;
    if due_date < invoice_date {
        return Err(BilldeskError::Validation(
            "Due date cannot be before the invoice date".to_string(),
        ));
    }

    if input.items.is_empty() {
        return Err(BilldeskError::Validation(
            "An invoice needs at least one item".to_string(),
        ));
    }
    for item in &input.items {
        require_positive("Quantity", item.quantity)?;
        if let Some(rate) = item.rate {
            require_non_negative("Rate", rate)?;
        }
        require_percentage("Item discount", item.discount)?;
    }

    require_non_negative("Manual discount", input.manual_discount)?;
    require_non_negative("Charges", input.charges)?;
    require_non_negative("Paid amount", input.paid_amount)?;

    Ok(ValidatedInput {
        invoice_date,
        due_date,
        adjustments: Adjustments {
            manual_discount: to_decimal("Manual discount", input.manual_discount)?,
            previous_balance: to_decimal("Previous balance", input.previous_balance)?,
            charges: to_decimal("Charges", input.charges)?,
            paid_amount: to_decimal("Paid amount", input.paid_amount)?,
        },
    })
}

struct PreparedItem {
    product_id: i64,
    unit_id: i64,
    quantity: f64,
    rate: f64,
    discount: f64,
    amounts: LineAmounts,
}

async fn customer_type_of(conn: &mut SqliteConnection, customer_id: i64) -> BilldeskResult<CustomerType> {
    sqlx::query_scalar::<_, CustomerType>("SELECT type FROM customers WHERE id = ?")
        .bind(customer_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| BilldeskError::Validation(format!("Customer {} not found", customer_id)))
}

/// Looks up each line's product, fills in missing rates and builds the
/// decimal amounts.
async fn prepare_items(
    conn: &mut SqliteConnection,
    customer_type: CustomerType,
    items: &[InvoiceItemInput],
) -> BilldeskResult<Vec<PreparedItem>> {
    let mut products: HashMap<i64, Product> = HashMap::new();
    let mut prepared = Vec::with_capacity(items.len());

    for item in items {
        if !products.contains_key(&item.product_id) {
            let product = fetch_product(conn, item.product_id).await?.ok_or_else(|| {
                BilldeskError::Validation(format!("Product {} not found", item.product_id))
            })?;
            products.insert(item.product_id, product);
        }
        let product = &products[&item.product_id];
        let units = product.units.as_deref().unwrap_or(&[]);

        // The unit must belong to the product even when the rate is supplied.
        let list_rate = select_rate(product, units, item.unit_id, customer_type)?;
        let rate = item.rate.unwrap_or(list_rate);

        prepared.push(PreparedItem {
            product_id: item.product_id,
            unit_id: item.unit_id,
            quantity: item.quantity,
            rate,
            discount: item.discount,
            amounts: LineAmounts {
                quantity: to_decimal("Quantity", item.quantity)?,
                rate: to_decimal("Rate", rate)?,
                discount_percent: to_decimal("Item discount", item.discount)?,
                tax_percent: to_decimal("Tax percentage", product.tax_percentage.unwrap_or(0.0))?,
            },
        });
    }

    Ok(prepared)
}

struct Priced {
    items: Vec<PreparedItem>,
    totals: totals::InvoiceTotals,
}

async fn price_invoice(
    conn: &mut SqliteConnection,
    input: &InvoiceInput,
    adjustments: Adjustments,
) -> BilldeskResult<Priced> {
    let customer_type = customer_type_of(conn, input.customer_id).await?;
    let items = prepare_items(conn, customer_type, &input.items).await?;
    let amounts: Vec<LineAmounts> = items.iter().map(|i| i.amounts).collect();
    let totals = compute_totals(&amounts, adjustments)?;
    Ok(Priced { items, totals })
}

/// Items are replaced wholesale on every save.
async fn replace_items(
    conn: &mut SqliteConnection,
    invoice_id: i64,
    priced: &Priced,
) -> BilldeskResult<()> {
    sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?")
        .bind(invoice_id)
        .execute(&mut *conn)
        .await?;

    for (item, line) in priced.items.iter().zip(&priced.totals.lines) {
        sqlx::query(
            "INSERT INTO invoice_items (
                invoice_id, product_id, unit_id, quantity, rate, discount, total
            ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(invoice_id)
        .bind(item.product_id)
        .bind(item.unit_id)
        .bind(item.quantity)
        .bind(item.rate)
        .bind(item.discount)
        .bind(from_decimal(line.total))
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

pub async fn create_invoice_internal(
    pool: &DbPool,
    input: InvoiceInput,
    today: NaiveDate,
) -> BilldeskResult<CreatedInvoice> {
    let validated = validate_input(&input)?;

    let mut tx = pool.begin().await?;
    let invoice_number = next_invoice_number(&mut tx, today).await?;
    let priced = price_invoice(&mut tx, &input, validated.adjustments).await?;
    let totals = &priced.totals;
    let adj = validated.adjustments;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO invoices (
            invoice_number, customer_id, invoice_date, due_date,
            subtotal, manual_discount, previous_balance, total_discount,
            total_tax, charges, paid_amount, total, status
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&invoice_number)
    .bind(input.customer_id)
    .bind(validated.invoice_date)
    .bind(validated.due_date)
    .bind(from_decimal(totals.subtotal))
    .bind(from_decimal(adj.manual_discount))
    .bind(from_decimal(adj.previous_balance))
    .bind(from_decimal(totals.total_discount))
    .bind(from_decimal(totals.total_tax))
    .bind(from_decimal(adj.charges))
    .bind(from_decimal(adj.paid_amount))
    .bind(from_decimal(totals.total))
    .bind(input.status.unwrap_or_default())
    .fetch_one(&mut *tx)
    .await?;

    replace_items(&mut tx, id, &priced).await?;
    tx.commit().await?;

    tracing::info!(
        "Created invoice {} ({}) for customer {}, total {}",
        invoice_number,
        id,
        input.customer_id,
        from_decimal(totals.total)
    );

    Ok(CreatedInvoice { id, invoice_number })
}

/// Recomputes totals and replaces the items; the invoice number never changes.
pub async fn update_invoice_internal(pool: &DbPool, id: i64, input: InvoiceInput) -> BilldeskResult<()> {
    let validated = validate_input(&input)?;

    let mut tx = pool.begin().await?;

    let current: Option<InvoiceStatus> =
        sqlx::query_scalar("SELECT status FROM invoices WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    let current = current.ok_or_else(|| BilldeskError::NotFound("Invoice not found".to_string()))?;

    let priced = price_invoice(&mut tx, &input, validated.adjustments).await?;
    let totals = &priced.totals;
    let adj = validated.adjustments;

    sqlx::query(
        "UPDATE invoices SET
            customer_id = ?, invoice_date = ?, due_date = ?,
            subtotal = ?, manual_discount = ?, previous_balance = ?,
            total_discount = ?, total_tax = ?, charges = ?,
            paid_amount = ?, total = ?, status = ?
         WHERE id = ?",
    )
    .bind(input.customer_id)
    .bind(validated.invoice_date)
    .bind(validated.due_date)
    .bind(from_decimal(totals.subtotal))
    .bind(from_decimal(adj.manual_discount))
    .bind(from_decimal(adj.previous_balance))
    .bind(from_decimal(totals.total_discount))
    .bind(from_decimal(totals.total_tax))
    .bind(from_decimal(adj.charges))
    .bind(from_decimal(adj.paid_amount))
    .bind(from_decimal(totals.total))
    .bind(input.status.unwrap_or(current))
    .bind(id)
    .execute(&mut *tx)
    .await?;

    replace_items(&mut tx, id, &priced).await?;
    tx.commit().await?;
    Ok(())
}

/// Any status may follow any other.
pub async fn update_invoice_status_internal(
    pool: &DbPool,
    id: i64,
    status: &str,
) -> BilldeskResult<InvoiceStatus> {
    let status = InvoiceStatus::from_str(status)?;

    let result = sqlx::query("UPDATE invoices SET status = ? WHERE id = ?")
        .bind(status)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(BilldeskError::NotFound("Invoice not found".to_string()));
    }

    tracing::info!("Invoice {} moved to {}", id, status.as_str());
    Ok(status)
}

pub async fn list_invoices_internal(pool: &DbPool, filter: InvoiceFilter) -> BilldeskResult<Vec<Invoice>> {
    let status = filter
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(InvoiceStatus::from_str)
        .transpose()?;

    let mut invoices = sqlx::query_as::<_, Invoice>(
        r#"
        SELECT
            i.*,
            c.name AS customer_name,
            c.phone AS customer_phone
        FROM invoices i
        LEFT JOIN customers c ON i.customer_id = c.id
        WHERE (? IS NULL OR i.status = ?)
          AND (? IS NULL OR i.customer_id = ?)
        ORDER BY i.created_at DESC, i.id DESC
        "#,
    )
    .bind(status)
    .bind(status)
    .bind(filter.customer_id)
    .bind(filter.customer_id)
    .fetch_all(pool)
    .await?;

    for invoice in &mut invoices {
        invoice.remaining_amount = remaining_amount(invoice.total, invoice.paid_amount);
    }

    Ok(invoices)
}

pub async fn get_invoice_internal(pool: &DbPool, id: i64) -> BilldeskResult<Invoice> {
    let mut invoice = sqlx::query_as::<_, Invoice>(
        r#"
        SELECT
            i.*,
            c.name AS customer_name,
            c.email AS customer_email,
            c.phone AS customer_phone,
            c.address AS customer_address
        FROM invoices i
        LEFT JOIN customers c ON i.customer_id = c.id
        WHERE i.id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| BilldeskError::NotFound("Invoice not found".to_string()))?;

    let items = sqlx::query_as::<_, InvoiceItem>(
        r#"
        SELECT
            ii.*,
            p.name AS product_name,
            p.code AS product_code,
            u.name AS unit_name
        FROM invoice_items ii
        LEFT JOIN products p ON ii.product_id = p.id
        LEFT JOIN units u ON ii.unit_id = u.id
        WHERE ii.invoice_id = ?
        ORDER BY ii.id
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    invoice.remaining_amount = remaining_amount(invoice.total, invoice.paid_amount);
    invoice.items = Some(items);
    Ok(invoice)
}

pub async fn delete_invoice_internal(pool: &DbPool, id: i64) -> BilldeskResult<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM invoices WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(BilldeskError::NotFound("Invoice not found".to_string()));
    }

    tx.commit().await?;
    Ok(())
}

// Axum handlers

pub async fn list_invoices(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<InvoiceFilter>,
) -> BilldeskResult<Json<Vec<Invoice>>> {
    Ok(Json(list_invoices_internal(&state.pool, filter).await?))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
) -> BilldeskResult<Json<Invoice>> {
    Ok(Json(get_invoice_internal(&state.pool, id).await?))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<InvoiceInput>,
) -> BilldeskResult<Json<CreatedInvoice>> {
    let today = Local::now().date_naive();
    Ok(Json(create_invoice_internal(&state.pool, payload, today).await?))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
    JsonBody(payload): JsonBody<InvoiceInput>,
) -> BilldeskResult<Json<IdResponse>> {
    update_invoice_internal(&state.pool, id, payload).await?;
    Ok(Json(IdResponse { id }))
}

pub async fn update_invoice_status(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
    JsonBody(payload): JsonBody<StatusInput>,
) -> BilldeskResult<Json<StatusChanged>> {
    let status = update_invoice_status_internal(&state.pool, id, &payload.status).await?;
    Ok(Json(StatusChanged { id, status }))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
) -> BilldeskResult<Json<MessageResponse>> {
    delete_invoice_internal(&state.pool, id).await?;
    Ok(Json(MessageResponse::new("Invoice deleted successfully")))
}
