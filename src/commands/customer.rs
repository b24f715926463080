use crate::commands::invoice::totals::{from_decimal, to_decimal};
use crate::commands::utils::{require_text, trim_to_option};
use crate::commands::{IdResponse, MessageResponse};
use crate::db::{Customer, CustomerType, DbPool};
use crate::error::{BilldeskError, BilldeskResult};
use crate::extract::{JsonBody, PathParams, QueryParams};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CustomerInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "type", default)]
    pub customer_type: CustomerType,
}

#[derive(Deserialize)]
pub struct CustomerSearchQuery {
    #[serde(alias = "q", default)]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct CustomerBalance {
    pub customer_id: i64,
    pub balance: f64,
}

pub async fn create_customer_internal(pool: &DbPool, input: CustomerInput) -> BilldeskResult<i64> {
    let name = require_text("Customer name", &input.name)?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO customers (name, email, phone, address, type)
         VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&name)
    .bind(trim_to_option(input.email))
    .bind(trim_to_option(input.phone))
    .bind(trim_to_option(input.address))
    .bind(input.customer_type)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

pub async fn update_customer_internal(
    pool: &DbPool,
    id: i64,
    input: CustomerInput,
) -> BilldeskResult<()> {
    let name = require_text("Customer name", &input.name)?;

    let result = sqlx::query(
        "UPDATE customers SET name = ?, email = ?, phone = ?, address = ?, type = ?
         WHERE id = ?",
    )
    .bind(&name)
    .bind(trim_to_option(input.email))
    .bind(trim_to_option(input.phone))
    .bind(trim_to_option(input.address))
    .bind(input.customer_type)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(BilldeskError::NotFound("Customer not found".to_string()));
    }
    Ok(())
}

pub async fn get_customer_internal(pool: &DbPool, id: i64) -> BilldeskResult<Customer> {
    sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| BilldeskError::NotFound("Customer not found".to_string()))
}

pub async fn list_customers_internal(pool: &DbPool) -> BilldeskResult<Vec<Customer>> {
    Ok(
        sqlx::query_as::<_, Customer>("SELECT * FROM customers ORDER BY name")
            .fetch_all(pool)
            .await?,
    )
}

pub async fn search_customers_internal(pool: &DbPool, query: &str) -> BilldeskResult<Vec<Customer>> {
    let pattern = format!("%{}%", query.trim());
    Ok(sqlx::query_as::<_, Customer>(
        "SELECT * FROM customers
         WHERE name LIKE ? OR phone LIKE ? OR email LIKE ?
         ORDER BY name",
    )
    .bind(&pattern)
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(pool)
    .await?)
}

pub async fn delete_customer_internal(pool: &DbPool, id: i64) -> BilldeskResult<()> {
    let result = sqlx::query("DELETE FROM customers WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(BilldeskError::NotFound("Customer not found".to_string()));
    }
    Ok(())
}

/// Outstanding amount over the customer's issued (`created`) invoices.
pub async fn customer_balance_internal(pool: &DbPool, id: i64) -> BilldeskResult<CustomerBalance> {
    get_customer_internal(pool, id).await?;

    let rows: Vec<(f64, f64)> = sqlx::query_as(
        "SELECT total, paid_amount FROM invoices WHERE customer_id = ? AND status = 'created'",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let mut balance = rust_decimal::Decimal::ZERO;
    for (total, paid) in rows {
        balance += to_decimal("total", total)? - to_decimal("paid amount", paid)?;
    }

    Ok(CustomerBalance {
        customer_id: id,
        balance: from_decimal(balance),
    })
}

// Axum handlers

pub async fn list_customers(State(state): State<AppState>) -> BilldeskResult<Json<Vec<Customer>>> {
    Ok(Json(list_customers_internal(&state.pool).await?))
}

pub async fn search_customers(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<CustomerSearchQuery>,
) -> BilldeskResult<Json<Vec<Customer>>> {
    Ok(Json(search_customers_internal(&state.pool, &params.query).await?))
}

pub async fn get_customer(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
) -> BilldeskResult<Json<Customer>> {
    Ok(Json(get_customer_internal(&state.pool, id).await?))
}

pub async fn create_customer(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CustomerInput>,
) -> BilldeskResult<Json<IdResponse>> {
    let id = create_customer_internal(&state.pool, payload).await?;
    Ok(Json(IdResponse { id }))
}

pub async fn update_customer(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
    JsonBody(payload): JsonBody<CustomerInput>,
) -> BilldeskResult<Json<IdResponse>> {
    update_customer_internal(&state.pool, id, payload).await?;
    Ok(Json(IdResponse { id }))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
) -> BilldeskResult<Json<MessageResponse>> {
    delete_customer_internal(&state.pool, id).await?;
    Ok(Json(MessageResponse::new("Customer deleted successfully")))
}

pub async fn get_customer_balance(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
) -> BilldeskResult<Json<CustomerBalance>> {
    Ok(Json(customer_balance_internal(&state.pool, id).await?))
}
