use crate::commands;
use crate::state::AppState;
use axum::{routing::post, Router};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(commands::auth::sign_up))
        .route("/api/auth/signin", post(commands::auth::sign_in))
}
