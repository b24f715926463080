use crate::commands;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/products",
            get(commands::product::list_products).post(commands::product::create_product),
        )
        .route(
            "/api/products/import",
            post(commands::product_import::import_products),
        )
        .route(
            "/api/products/:id",
            get(commands::product::get_product)
                .put(commands::product::update_product)
                .delete(commands::product::delete_product),
        )
        .route(
            "/api/products/:id/price",
            get(commands::product::quote_price),
        )
}
