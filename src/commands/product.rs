use crate::commands::pricing::select_rate;
use crate::commands::utils::{
    require_non_negative, require_percentage, require_positive, require_text, trim_to_option,
};
use crate::commands::{IdResponse, MessageResponse};
use crate::db::{CustomerType, DbPool, Product, ProductUnit};
use crate::error::{BilldeskError, BilldeskResult};
use crate::extract::{JsonBody, PathParams, QueryParams};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

const PRODUCT_SELECT: &str = r#"
    SELECT
        p.id, p.name, p.code, p.category_id, p.base_unit_id, p.base_rate,
        p.base_wholesale_rate, p.purchase_rate, p.hsn_code, p.company_id,
        p.tax_percentage, p.created_at,
        c.name AS category_name,
        u.name AS base_unit_name,
        pc.name AS company_name
    FROM products p
    LEFT JOIN categories c ON p.category_id = c.id
    LEFT JOIN units u ON p.base_unit_id = u.id
    LEFT JOIN product_companies pc ON p.company_id = pc.id
"#;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUnitInput {
    pub unit_id: i64,
    pub conversion_rate: f64,
    pub retail_rate: f64,
    pub wholesale_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub code: String,
    pub category_id: Option<i64>,
    pub base_unit_id: i64,
    pub base_rate: f64,
    pub base_wholesale_rate: Option<f64>,
    pub purchase_rate: Option<f64>,
    pub hsn_code: Option<String>,
    pub company_id: Option<i64>,
    pub tax_percentage: Option<f64>,
    #[serde(default)]
    pub multi_units: Vec<ProductUnitInput>,
}

impl ProductInput {
    /// Trims text fields and checks numeric ranges.
    pub fn validated(mut self) -> BilldeskResult<Self> {
        self.name = require_text("Product name", &self.name)?;
        self.code = require_text("Product code", &self.code)?;
        self.hsn_code = trim_to_option(self.hsn_code);

        require_non_negative("Base rate", self.base_rate)?;
        if let Some(rate) = self.base_wholesale_rate {
            require_non_negative("Wholesale rate", rate)?;
        }
        if let Some(rate) = self.purchase_rate {
            require_non_negative("Purchase rate", rate)?;
        }
        if let Some(tax) = self.tax_percentage {
            require_percentage("Tax percentage", tax)?;
        }

        for unit in &self.multi_units {
            require_positive("Conversion rate", unit.conversion_rate)?;
            require_non_negative("Retail rate", unit.retail_rate)?;
            require_non_negative("Wholesale rate", unit.wholesale_rate)?;
            if unit.unit_id == self.base_unit_id {
                return Err(BilldeskError::Validation(
                    "Additional units must differ from the base unit".to_string(),
                ));
            }
        }

        let mut seen = std::collections::HashSet::new();
        if !self.multi_units.iter().all(|u| seen.insert(u.unit_id)) {
            return Err(BilldeskError::Validation(
                "Each additional unit may appear only once".to_string(),
            ));
        }

        Ok(self)
    }
}

fn code_conflict(err: BilldeskError) -> BilldeskError {
    if err.is_unique_violation() {
        BilldeskError::Conflict("Product code already exists".to_string())
    } else {
        err
    }
}

pub async fn insert_product(conn: &mut SqliteConnection, input: &ProductInput) -> BilldeskResult<i64> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO products (
            name, code, category_id, base_unit_id, base_rate,
            base_wholesale_rate, purchase_rate, hsn_code, company_id, tax_percentage
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&input.name)
    .bind(&input.code)
    .bind(input.category_id)
    .bind(input.base_unit_id)
    .bind(input.base_rate)
    .bind(input.base_wholesale_rate)
    .bind(input.purchase_rate)
    .bind(&input.hsn_code)
    .bind(input.company_id)
    .bind(input.tax_percentage)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| code_conflict(e.into()))?;

    replace_product_units(conn, id, &input.multi_units).await?;
    Ok(id)
}

/// Returns false when no product has this id.
pub async fn update_product_row(
    conn: &mut SqliteConnection,
    id: i64,
    input: &ProductInput,
) -> BilldeskResult<bool> {
    let result = sqlx::query(
        "UPDATE products SET
            name = ?, code = ?, category_id = ?, base_unit_id = ?, base_rate = ?,
            base_wholesale_rate = ?, purchase_rate = ?, hsn_code = ?,
            company_id = ?, tax_percentage = ?
         WHERE id = ?",
    )
    .bind(&input.name)
    .bind(&input.code)
    .bind(input.category_id)
    .bind(input.base_unit_id)
    .bind(input.base_rate)
    .bind(input.base_wholesale_rate)
    .bind(input.purchase_rate)
    .bind(&input.hsn_code)
    .bind(input.company_id)
    .bind(input.tax_percentage)
    .bind(id)
    .execute(&mut *conn)
    .await
    .map_err(|e| code_conflict(e.into()))?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    replace_product_units(conn, id, &input.multi_units).await?;
    Ok(true)
}

/// Packaging units are replaced wholesale, never diffed.
async fn replace_product_units(
    conn: &mut SqliteConnection,
    product_id: i64,
    units: &[ProductUnitInput],
) -> BilldeskResult<()> {
    sqlx::query("DELETE FROM product_units WHERE product_id = ?")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    for unit in units {
        sqlx::query(
            "INSERT INTO product_units (
                product_id, unit_id, conversion_rate, retail_rate, wholesale_rate
            ) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(product_id)
        .bind(unit.unit_id)
        .bind(unit.conversion_rate)
        .bind(unit.retail_rate)
        .bind(unit.wholesale_rate)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

pub async fn fetch_product(conn: &mut SqliteConnection, id: i64) -> BilldeskResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!("{} WHERE p.id = ?", PRODUCT_SELECT))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(mut product) = product else {
        return Ok(None);
    };

    product.units = Some(fetch_product_units(conn, id).await?);
    Ok(Some(product))
}

pub async fn fetch_product_units(
    conn: &mut SqliteConnection,
    product_id: i64,
) -> BilldeskResult<Vec<ProductUnit>> {
    Ok(sqlx::query_as::<_, ProductUnit>(
        r#"
        SELECT pu.id, pu.product_id, pu.unit_id, pu.conversion_rate,
               pu.retail_rate, pu.wholesale_rate, u.name AS unit_name
        FROM product_units pu
        LEFT JOIN units u ON pu.unit_id = u.id
        WHERE pu.product_id = ?
        ORDER BY pu.id
        "#,
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?)
}

pub async fn create_product_internal(pool: &DbPool, input: ProductInput) -> BilldeskResult<i64> {
    let input = input.validated()?;
    let mut tx = pool.begin().await?;
    let id = insert_product(&mut tx, &input).await?;
    tx.commit().await?;

    tracing::info!("Created product {} ({})", input.code, id);
    Ok(id)
}

pub async fn update_product_internal(
    pool: &DbPool,
    id: i64,
    input: ProductInput,
) -> BilldeskResult<()> {
    let input = input.validated()?;
    let mut tx = pool.begin().await?;
    if !update_product_row(&mut tx, id, &input).await? {
        return Err(BilldeskError::NotFound("Product not found".to_string()));
    }
    tx.commit().await?;
    Ok(())
}

pub async fn get_product_internal(pool: &DbPool, id: i64) -> BilldeskResult<Product> {
    let mut conn = pool.acquire().await?;
    fetch_product(&mut conn, id)
        .await?
        .ok_or_else(|| BilldeskError::NotFound("Product not found".to_string()))
}

pub async fn list_products_internal(pool: &DbPool) -> BilldeskResult<Vec<Product>> {
    Ok(
        sqlx::query_as::<_, Product>(&format!("{} ORDER BY p.name", PRODUCT_SELECT))
            .fetch_all(pool)
            .await?,
    )
}

pub async fn delete_product_internal(pool: &DbPool, id: i64) -> BilldeskResult<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM product_units WHERE product_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(BilldeskError::NotFound("Product not found".to_string()));
    }

    tx.commit().await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuery {
    pub unit_id: Option<i64>,
    pub customer_type: Option<CustomerType>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub product_id: i64,
    pub unit_id: i64,
    pub customer_type: CustomerType,
    pub rate: f64,
}

pub async fn quote_price_internal(
    pool: &DbPool,
    product_id: i64,
    query: PriceQuery,
) -> BilldeskResult<PriceQuote> {
    let product = get_product_internal(pool, product_id).await?;
    let unit_id = query.unit_id.unwrap_or(product.base_unit_id);
    let customer_type = query.customer_type.unwrap_or_default();
    let units = product.units.as_deref().unwrap_or(&[]);
    let rate = select_rate(&product, units, unit_id, customer_type)?;

    Ok(PriceQuote {
        product_id,
        unit_id,
        customer_type,
        rate,
    })
}

// Axum handlers

pub async fn list_products(State(state): State<AppState>) -> BilldeskResult<Json<Vec<Product>>> {
    let products = list_products_internal(&state.pool).await?;
    tracing::debug!("Fetched {} products from database", products.len());
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
) -> BilldeskResult<Json<Product>> {
    Ok(Json(get_product_internal(&state.pool, id).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ProductInput>,
) -> BilldeskResult<Json<IdResponse>> {
    let id = create_product_internal(&state.pool, payload).await?;
    Ok(Json(IdResponse { id }))
}

pub async fn update_product(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
    JsonBody(payload): JsonBody<ProductInput>,
) -> BilldeskResult<Json<IdResponse>> {
    update_product_internal(&state.pool, id, payload).await?;
    Ok(Json(IdResponse { id }))
}

pub async fn delete_product(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
) -> BilldeskResult<Json<MessageResponse>> {
    delete_product_internal(&state.pool, id).await?;
    Ok(Json(MessageResponse::new("Product deleted successfully")))
}

pub async fn quote_price(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
    QueryParams(query): QueryParams<PriceQuery>,
) -> BilldeskResult<Json<PriceQuote>> {
    Ok(Json(quote_price_internal(&state.pool, id, query).await?))
}
