use crate::db::{DbPool, User};
use crate::error::{BilldeskError, BilldeskResult};
use crate::extract::JsonBody;
use crate::state::AppState;
use axum::{extract::State, Json};
use bcrypt::{hash, verify, DEFAULT_COST};
use serde::{Deserialize, Serialize};

// bcrypt's minimum cost keeps the test suite fast.
const HASH_COST: u32 = if cfg!(test) { 4 } else { DEFAULT_COST };

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
}

fn normalize(credentials: &Credentials) -> BilldeskResult<String> {
    let email = credentials.email.trim().to_lowercase();
    if email.is_empty() || credentials.password.is_empty() {
        return Err(BilldeskError::Validation(
            "Email and password are required".to_string(),
        ));
    }
    Ok(email)
}

pub async fn sign_up_internal(pool: &DbPool, credentials: Credentials) -> BilldeskResult<AuthUser> {
    let email = normalize(&credentials)?;
    let password_hash = hash(&credentials.password, HASH_COST)?;

    let result = sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (email, password_hash) VALUES (?, ?) RETURNING id",
    )
    .bind(&email)
    .bind(password_hash)
    .fetch_one(pool)
    .await;

    match result {
        Ok(id) => {
            tracing::info!("User created: {} ({})", email, id);
            Ok(AuthUser { id, email })
        }
        Err(e) => {
            let err = BilldeskError::from(e);
            if err.is_unique_violation() {
                Err(BilldeskError::Conflict("Email already exists".to_string()))
            } else {
                Err(err)
            }
        }
    }
}

pub async fn sign_in_internal(pool: &DbPool, credentials: Credentials) -> BilldeskResult<AuthUser> {
    let email = normalize(&credentials)?;

    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, password_hash, created_at FROM users WHERE email = ?",
    )
    .bind(&email)
    .fetch_optional(pool)
    .await?;

    let invalid = || BilldeskError::Auth("Invalid credentials".to_string());
    let user = user.ok_or_else(invalid)?;

    if !verify(&credentials.password, &user.password_hash)? {
        tracing::info!("Rejected sign-in for {}", email);
        return Err(invalid());
    }

    Ok(AuthUser {
        id: user.id,
        email: user.email,
    })
}

pub async fn sign_up(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<Credentials>,
) -> BilldeskResult<Json<AuthUser>> {
    Ok(Json(sign_up_internal(&state.pool, payload).await?))
}

pub async fn sign_in(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<Credentials>,
) -> BilldeskResult<Json<AuthUser>> {
    Ok(Json(sign_in_internal(&state.pool, payload).await?))
}
