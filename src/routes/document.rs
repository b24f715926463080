use crate::commands;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/documents", post(commands::document::create_document))
        .route(
            "/api/documents/:user_id",
            get(commands::document::list_user_documents),
        )
}
