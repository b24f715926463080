use crate::commands::utils::{require_text, trim_to_option};
use crate::db::{Company, DbPool};
use crate::error::{BilldeskError, BilldeskResult};
use crate::extract::JsonBody;
use crate::state::AppState;
use axum::{extract::State, Json};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::OnceLock;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static PHONE_RE: OnceLock<Regex> = OnceLock::new();
static GST_RE: OnceLock<Regex> = OnceLock::new();

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"))
}

fn phone_re() -> &'static Regex {
    PHONE_RE.get_or_init(|| Regex::new(r"^[+]?[\d\s-]{10,}$").expect("phone pattern"))
}

/// 15-character Indian GSTIN.
fn gst_re() -> &'static Regex {
    GST_RE.get_or_init(|| {
        Regex::new(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z]{1}[1-9A-Z]{1}Z[0-9A-Z]{1}$").expect("GSTIN pattern")
    })
}

pub fn is_valid_email(value: &str) -> bool {
    email_re().is_match(value)
}

pub fn is_valid_phone(value: &str) -> bool {
    phone_re().is_match(value)
}

pub fn is_valid_gst(value: &str) -> bool {
    gst_re().is_match(value)
}

#[derive(Debug, Default, Deserialize)]
pub struct CompanyInput {
    pub name: String,
    pub address: Option<String>,
    pub gst: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompanySaved {
    pub id: i64,
    pub logo: Option<String>,
    pub message: String,
}

struct CleanCompany {
    name: String,
    address: Option<String>,
    gst: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    logo: Option<String>,
}

fn clean(input: CompanyInput) -> BilldeskResult<CleanCompany> {
    let name = require_text("Company name", &input.name)?;
    let email = trim_to_option(input.email);
    let phone = trim_to_option(input.phone);
    let gst = trim_to_option(input.gst);

    if let Some(email) = &email {
        if !is_valid_email(email) {
            return Err(BilldeskError::Validation("Invalid email format".to_string()));
        }
    }
    if let Some(phone) = &phone {
        if !is_valid_phone(phone) {
            return Err(BilldeskError::Validation("Invalid phone number format".to_string()));
        }
    }
    if let Some(gst) = &gst {
        if !is_valid_gst(gst) {
            return Err(BilldeskError::Validation("Invalid GST number format".to_string()));
        }
    }

    Ok(CleanCompany {
        name,
        address: trim_to_option(input.address),
        gst,
        phone,
        email,
        // stored verbatim
        logo: input.logo.filter(|l| !l.is_empty()),
    })
}

pub async fn get_company_internal(pool: &DbPool) -> BilldeskResult<Option<Company>> {
    Ok(
        sqlx::query_as::<_, Company>("SELECT * FROM company ORDER BY id LIMIT 1")
            .fetch_optional(pool)
            .await?,
    )
}

/// Updates the single company row, creating it on first save.
pub async fn save_company_internal(pool: &DbPool, input: CompanyInput) -> BilldeskResult<CompanySaved> {
    let company = clean(input)?;
    let mut tx = pool.begin().await?;

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM company ORDER BY id LIMIT 1")
        .fetch_optional(&mut *tx)
        .await?;

    let id = if let Some(id) = existing {
        sqlx::query(
            "UPDATE company SET name = ?, address = ?, gst = ?, phone = ?, email = ?, logo = ?
             WHERE id = ?",
        )
        .bind(&company.name)
        .bind(&company.address)
        .bind(&company.gst)
        .bind(&company.phone)
        .bind(&company.email)
        .bind(&company.logo)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        id
    } else {
        sqlx::query_scalar(
            "INSERT INTO company (name, address, gst, phone, email, logo)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&company.name)
        .bind(&company.address)
        .bind(&company.gst)
        .bind(&company.phone)
        .bind(&company.email)
        .bind(&company.logo)
        .fetch_one(&mut *tx)
        .await?
    };

    tx.commit().await?;
    tracing::info!("Saved company details ({})", id);

    Ok(CompanySaved {
        id,
        logo: company.logo,
        message: "Company details saved successfully".to_string(),
    })
}

// Axum handlers

pub async fn get_company(State(state): State<AppState>) -> BilldeskResult<Json<Value>> {
    match get_company_internal(&state.pool).await? {
        Some(company) => Ok(Json(serde_json::to_value(company)?)),
        None => Ok(Json(json!({}))),
    }
}

pub async fn save_company(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CompanyInput>,
) -> BilldeskResult<Json<CompanySaved>> {
    Ok(Json(save_company_internal(&state.pool, payload).await?))
}
