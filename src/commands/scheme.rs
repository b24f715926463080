//! Promotional schemes. They are stored and listed only; invoice totals never
//! consult them.

use crate::commands::utils::{parse_date_safe, parse_required_date, require_positive, require_text};
use crate::commands::{IdResponse, MessageResponse};
use crate::db::{DbPool, DiscountType, Scheme, SchemeCategoryRef, SchemeProductRef, SchemeType};
use crate::error::{BilldeskError, BilldeskResult};
use crate::extract::{JsonBody, PathParams, QueryParams};
use crate::state::AppState;
use axum::{extract::State, Json};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::SqliteConnection;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeProductInput {
    pub id: i64,
    pub unit_id: i64,
    #[serde(default = "one")]
    pub quantity: f64,
}

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeInput {
    pub name: String,
    #[serde(rename = "type")]
    pub scheme_type: SchemeType,
    pub discount_type: DiscountType,
    pub discount_value: Option<f64>,
    pub buy_quantity: Option<i64>,
    pub free_quantity: Option<i64>,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub categories: Vec<i64>,
    #[serde(default)]
    pub products: Vec<SchemeProductInput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeFilter {
    pub active_on: Option<String>,
}

/// A scheme input that passed validation, with parsed dates.
#[derive(Debug)]
pub struct ValidScheme {
    pub input: SchemeInput,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

pub fn validate_scheme(mut input: SchemeInput) -> BilldeskResult<ValidScheme> {
    input.name = require_text("Scheme name", &input.name)?;

    match input.discount_type {
        DiscountType::Percentage => {
            let value = input.discount_value.unwrap_or(0.0);
            if !(value > 0.0 && value <= 100.0) {
                return Err(BilldeskError::Validation(
                    "Percentage discount must be greater than 0 and at most 100".to_string(),
                ));
            }
        }
        DiscountType::Flat => {
            require_positive("Flat discount", input.discount_value.unwrap_or(0.0))?;
        }
        DiscountType::BuyXGetY => {
            if input.buy_quantity.unwrap_or(0) <= 0 || input.free_quantity.unwrap_or(0) <= 0 {
                return Err(BilldeskError::Validation(
                    "Buy and free quantities must be greater than zero".to_string(),
                ));
            }
        }
    }

    let start_date = parse_required_date("start date", &input.start_date)?;
    let end_date = parse_required_date("end date", &input.end_date)?;
    if start_date > end_date {
        return Err(BilldeskError::Validation(
            "Start date cannot be after the end date".to_string(),
        ));
    }

    for product in &input.products {
        require_positive("Scheme product quantity", product.quantity)?;
    }

    Ok(ValidScheme {
        input,
        start_date,
        end_date,
    })
}

async fn replace_targets(
    conn: &mut SqliteConnection,
    scheme_id: i64,
    scheme: &SchemeInput,
) -> BilldeskResult<()> {
    sqlx::query("DELETE FROM scheme_categories WHERE scheme_id = ?")
        .bind(scheme_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM scheme_products WHERE scheme_id = ?")
        .bind(scheme_id)
        .execute(&mut *conn)
        .await?;

    match scheme.scheme_type {
        SchemeType::Category => {
            for category_id in &scheme.categories {
                sqlx::query("INSERT INTO scheme_categories (scheme_id, category_id) VALUES (?, ?)")
                    .bind(scheme_id)
                    .bind(category_id)
                    .execute(&mut *conn)
                    .await?;
            }
        }
        SchemeType::Product => {
            for product in &scheme.products {
                sqlx::query(
                    "INSERT INTO scheme_products (scheme_id, product_id, unit_id, quantity)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(scheme_id)
                .bind(product.id)
                .bind(product.unit_id)
                .bind(product.quantity)
                .execute(&mut *conn)
                .await?;
            }
        }
    }

    Ok(())
}

pub async fn create_scheme_internal(pool: &DbPool, input: SchemeInput) -> BilldeskResult<i64> {
    let valid = validate_scheme(input)?;
    let scheme = &valid.input;

    let mut tx = pool.begin().await?;
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO schemes (
            name, type, discount_type, discount_value, buy_quantity, free_quantity,
            start_date, end_date
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&scheme.name)
    .bind(scheme.scheme_type)
    .bind(scheme.discount_type)
    .bind(scheme.discount_value)
    .bind(scheme.buy_quantity)
    .bind(scheme.free_quantity)
    .bind(valid.start_date)
    .bind(valid.end_date)
    .fetch_one(&mut *tx)
    .await?;

    replace_targets(&mut tx, id, scheme).await?;
    tx.commit().await?;

    tracing::info!("Created scheme '{}' ({})", scheme.name, id);
    Ok(id)
}

pub async fn update_scheme_internal(pool: &DbPool, id: i64, input: SchemeInput) -> BilldeskResult<()> {
    let valid = validate_scheme(input)?;
    let scheme = &valid.input;

    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        "UPDATE schemes SET
            name = ?, type = ?, discount_type = ?, discount_value = ?,
            buy_quantity = ?, free_quantity = ?, start_date = ?, end_date = ?
         WHERE id = ?",
    )
    .bind(&scheme.name)
    .bind(scheme.scheme_type)
    .bind(scheme.discount_type)
    .bind(scheme.discount_value)
    .bind(scheme.buy_quantity)
    .bind(scheme.free_quantity)
    .bind(valid.start_date)
    .bind(valid.end_date)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(BilldeskError::NotFound("Scheme not found".to_string()));
    }

    replace_targets(&mut tx, id, scheme).await?;
    tx.commit().await?;
    Ok(())
}

/// Fills in the category and product targets of each scheme.
async fn attach_targets(pool: &DbPool, schemes: &mut [Scheme]) -> BilldeskResult<()> {
    if schemes.is_empty() {
        return Ok(());
    }

    let categories = sqlx::query_as::<_, SchemeCategoryRef>(
        r#"
        SELECT sc.scheme_id, c.id, c.name
        FROM scheme_categories sc
        JOIN categories c ON sc.category_id = c.id
        ORDER BY c.name
        "#,
    )
    .fetch_all(pool)
    .await?;

    let products = sqlx::query_as::<_, SchemeProductRef>(
        r#"
        SELECT sp.scheme_id, p.id, p.name, p.code, sp.unit_id, sp.quantity,
               u.name AS unit_name
        FROM scheme_products sp
        JOIN products p ON sp.product_id = p.id
        LEFT JOIN units u ON sp.unit_id = u.id
        ORDER BY p.name
        "#,
    )
    .fetch_all(pool)
    .await?;

    for scheme in schemes.iter_mut() {
        scheme.categories = categories
            .iter()
            .filter(|c| c.scheme_id == scheme.id)
            .cloned()
            .collect();
        scheme.products = products
            .iter()
            .filter(|p| p.scheme_id == scheme.id)
            .cloned()
            .collect();
    }

    Ok(())
}

pub async fn list_schemes_internal(pool: &DbPool, filter: SchemeFilter) -> BilldeskResult<Vec<Scheme>> {
    let active_on = match filter.active_on.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_date_safe(raw).ok_or_else(|| {
            BilldeskError::Validation(format!("Invalid activeOn date: '{}'", raw))
        })?),
    };

    let mut schemes = sqlx::query_as::<_, Scheme>(
        "SELECT * FROM schemes
         WHERE (? IS NULL OR (start_date <= ? AND end_date >= ?))
         ORDER BY created_at DESC, id DESC",
    )
    .bind(active_on)
    .bind(active_on)
    .bind(active_on)
    .fetch_all(pool)
    .await?;

    attach_targets(pool, &mut schemes).await?;
    Ok(schemes)
}

pub async fn get_scheme_internal(pool: &DbPool, id: i64) -> BilldeskResult<Scheme> {
    let scheme = sqlx::query_as::<_, Scheme>("SELECT * FROM schemes WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| BilldeskError::NotFound("Scheme not found".to_string()))?;

    let mut schemes = [scheme];
    attach_targets(pool, &mut schemes).await?;
    let [scheme] = schemes;
    Ok(scheme)
}

pub async fn delete_scheme_internal(pool: &DbPool, id: i64) -> BilldeskResult<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM scheme_categories WHERE scheme_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM scheme_products WHERE scheme_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM schemes WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(BilldeskError::NotFound("Scheme not found".to_string()));
    }

    tx.commit().await?;
    Ok(())
}

// Axum handlers

pub async fn list_schemes(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<SchemeFilter>,
) -> BilldeskResult<Json<Vec<Scheme>>> {
    Ok(Json(list_schemes_internal(&state.pool, filter).await?))
}

pub async fn get_scheme(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
) -> BilldeskResult<Json<Scheme>> {
    Ok(Json(get_scheme_internal(&state.pool, id).await?))
}

pub async fn create_scheme(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SchemeInput>,
) -> BilldeskResult<Json<IdResponse>> {
    let id = create_scheme_internal(&state.pool, payload).await?;
    Ok(Json(IdResponse { id }))
}

pub async fn update_scheme(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
    JsonBody(payload): JsonBody<SchemeInput>,
) -> BilldeskResult<Json<IdResponse>> {
    update_scheme_internal(&state.pool, id, payload).await?;
    Ok(Json(IdResponse { id }))
}

pub async fn delete_scheme(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
) -> BilldeskResult<Json<MessageResponse>> {
    delete_scheme_internal(&state.pool, id).await?;
    Ok(Json(MessageResponse::new("Scheme deleted successfully")))
}
