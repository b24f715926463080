use crate::commands;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/schemes",
            get(commands::scheme::list_schemes).post(commands::scheme::create_scheme),
        )
        .route(
            "/api/schemes/:id",
            get(commands::scheme::get_scheme)
                .put(commands::scheme::update_scheme)
                .delete(commands::scheme::delete_scheme),
        )
}
