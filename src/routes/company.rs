use crate::commands;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/company",
        get(commands::company::get_company).put(commands::company::save_company),
    )
}
