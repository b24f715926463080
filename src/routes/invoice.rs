use crate::commands;
use crate::state::AppState;
use axum::{
    routing::{get, patch},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/invoices",
            get(commands::invoice::list_invoices).post(commands::invoice::create_invoice),
        )
        .route(
            "/api/invoices/:id",
            get(commands::invoice::get_invoice)
                .put(commands::invoice::update_invoice)
                .delete(commands::invoice::delete_invoice),
        )
        .route(
            "/api/invoices/:id/status",
            patch(commands::invoice::update_invoice_status),
        )
}
