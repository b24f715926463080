use crate::commands::utils::{require_text, trim_to_option};
use crate::db::{DbPool, Document};
use crate::error::BilldeskResult;
use crate::extract::{JsonBody, PathParams};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInput {
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub unit_id: Option<i64>,
    pub title: String,
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentSaved {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
}

pub async fn create_document_internal(pool: &DbPool, input: DocumentInput) -> BilldeskResult<DocumentSaved> {
    let title = require_text("Title", &input.title)?;
    let content = trim_to_option(input.content);

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO documents (user_id, category_id, unit_id, title, content)
         VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(input.user_id)
    .bind(input.category_id)
    .bind(input.unit_id)
    .bind(&title)
    .bind(&content)
    .fetch_one(pool)
    .await?;

    Ok(DocumentSaved { id, title, content })
}

pub async fn list_user_documents_internal(pool: &DbPool, user_id: i64) -> BilldeskResult<Vec<Document>> {
    Ok(sqlx::query_as::<_, Document>(
        r#"
        SELECT d.*, c.name AS category_name, u.name AS unit_name
        FROM documents d
        LEFT JOIN categories c ON d.category_id = c.id
        LEFT JOIN units u ON d.unit_id = u.id
        WHERE d.user_id = ?
        ORDER BY d.created_at DESC, d.id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

// Axum handlers

pub async fn create_document(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<DocumentInput>,
) -> BilldeskResult<Json<DocumentSaved>> {
    Ok(Json(create_document_internal(&state.pool, payload).await?))
}

pub async fn list_user_documents(
    State(state): State<AppState>,
    PathParams(user_id): PathParams<i64>,
) -> BilldeskResult<Json<Vec<Document>>> {
    Ok(Json(list_user_documents_internal(&state.pool, user_id).await?))
}
