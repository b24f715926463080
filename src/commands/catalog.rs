//! Categories, units and product companies: three lookup tables with the same
//! `(id, name, description)` shape.

use crate::commands::utils::{require_text, trim_to_option};
use crate::commands::MessageResponse;
use crate::db::{DbPool, LookupEntry};
use crate::error::{BilldeskError, BilldeskResult};
use crate::extract::{JsonBody, PathParams};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupTable {
    Categories,
    Units,
    ProductCompanies,
}

impl LookupTable {
    fn table(&self) -> &'static str {
        match self {
            LookupTable::Categories => "categories",
            LookupTable::Units => "units",
            LookupTable::ProductCompanies => "product_companies",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            LookupTable::Categories => "Category",
            LookupTable::Units => "Unit",
            LookupTable::ProductCompanies => "Product company",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LookupInput {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct LookupSaved {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

pub async fn create_entry(
    pool: &DbPool,
    table: LookupTable,
    input: LookupInput,
) -> BilldeskResult<LookupSaved> {
    let name = require_text("Name", &input.name)?;
    let description = trim_to_option(input.description);

    let id: i64 = sqlx::query_scalar(&format!(
        "INSERT INTO {} (name, description) VALUES (?, ?) RETURNING id",
        table.table()
    ))
    .bind(&name)
    .bind(&description)
    .fetch_one(pool)
    .await?;

    Ok(LookupSaved {
        id,
        name,
        description,
    })
}

pub async fn update_entry(
    pool: &DbPool,
    table: LookupTable,
    id: i64,
    input: LookupInput,
) -> BilldeskResult<LookupSaved> {
    let name = require_text("Name", &input.name)?;
    let description = trim_to_option(input.description);

    let result = sqlx::query(&format!(
        "UPDATE {} SET name = ?, description = ? WHERE id = ?",
        table.table()
    ))
    .bind(&name)
    .bind(&description)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(BilldeskError::NotFound(format!("{} not found", table.label())));
    }

    Ok(LookupSaved {
        id,
        name,
        description,
    })
}

pub async fn list_entries(pool: &DbPool, table: LookupTable) -> BilldeskResult<Vec<LookupEntry>> {
    Ok(sqlx::query_as::<_, LookupEntry>(&format!(
        "SELECT id, name, description, created_at FROM {} ORDER BY name",
        table.table()
    ))
    .fetch_all(pool)
    .await?)
}

pub async fn delete_entry(
    pool: &DbPool,
    table: LookupTable,
    id: i64,
) -> BilldeskResult<MessageResponse> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", table.table()))
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(BilldeskError::NotFound(format!("{} not found", table.label())));
    }

    Ok(MessageResponse::new(format!(
        "{} deleted successfully",
        table.label()
    )))
}

/// Case-insensitive name lookup that inserts the entry when it is missing.
pub async fn find_or_create_by_name(
    conn: &mut SqliteConnection,
    table: LookupTable,
    name: &str,
) -> BilldeskResult<i64> {
    let name = require_text(table.label(), name)?;

    let existing: Option<i64> = sqlx::query_scalar(&format!(
        "SELECT id FROM {} WHERE lower(name) = lower(?) ORDER BY id LIMIT 1",
        table.table()
    ))
    .bind(&name)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = existing {
        return Ok(id);
    }

    let id: i64 = sqlx::query_scalar(&format!(
        "INSERT INTO {} (name) VALUES (?) RETURNING id",
        table.table()
    ))
    .bind(&name)
    .fetch_one(&mut *conn)
    .await?;

    tracing::info!("Created {} '{}' ({})", table.label().to_lowercase(), name, id);
    Ok(id)
}

// Axum handlers

pub async fn list_categories(State(state): State<AppState>) -> BilldeskResult<Json<Vec<LookupEntry>>> {
    Ok(Json(list_entries(&state.pool, LookupTable::Categories).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LookupInput>,
) -> BilldeskResult<Json<LookupSaved>> {
    Ok(Json(create_entry(&state.pool, LookupTable::Categories, payload).await?))
}

pub async fn update_category(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
    JsonBody(payload): JsonBody<LookupInput>,
) -> BilldeskResult<Json<LookupSaved>> {
    Ok(Json(update_entry(&state.pool, LookupTable::Categories, id, payload).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
) -> BilldeskResult<Json<MessageResponse>> {
    Ok(Json(delete_entry(&state.pool, LookupTable::Categories, id).await?))
}

pub async fn list_units(State(state): State<AppState>) -> BilldeskResult<Json<Vec<LookupEntry>>> {
    Ok(Json(list_entries(&state.pool, LookupTable::Units).await?))
}

pub async fn create_unit(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LookupInput>,
) -> BilldeskResult<Json<LookupSaved>> {
    Ok(Json(create_entry(&state.pool, LookupTable::Units, payload).await?))
}

pub async fn update_unit(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
    JsonBody(payload): JsonBody<LookupInput>,
) -> BilldeskResult<Json<LookupSaved>> {
    Ok(Json(update_entry(&state.pool, LookupTable::Units, id, payload).await?))
}

pub async fn delete_unit(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
) -> BilldeskResult<Json<MessageResponse>> {
    Ok(Json(delete_entry(&state.pool, LookupTable::Units, id).await?))
}

pub async fn list_product_companies(
    State(state): State<AppState>,
) -> BilldeskResult<Json<Vec<LookupEntry>>> {
    Ok(Json(list_entries(&state.pool, LookupTable::ProductCompanies).await?))
}

pub async fn create_product_company(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LookupInput>,
) -> BilldeskResult<Json<LookupSaved>> {
    Ok(Json(
        create_entry(&state.pool, LookupTable::ProductCompanies, payload).await?,
    ))
}

pub async fn update_product_company(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
    JsonBody(payload): JsonBody<LookupInput>,
) -> BilldeskResult<Json<LookupSaved>> {
    Ok(Json(
        update_entry(&state.pool, LookupTable::ProductCompanies, id, payload).await?,
    ))
}

pub async fn delete_product_company(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
) -> BilldeskResult<Json<MessageResponse>> {
    Ok(Json(
        delete_entry(&state.pool, LookupTable::ProductCompanies, id).await?,
    ))
}
