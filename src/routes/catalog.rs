use crate::commands;
use crate::state::AppState;
use axum::{
    routing::{get, put},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/categories",
            get(commands::catalog::list_categories).post(commands::catalog::create_category),
        )
        .route(
            "/api/categories/:id",
            put(commands::catalog::update_category).delete(commands::catalog::delete_category),
        )
        .route(
            "/api/units",
            get(commands::catalog::list_units).post(commands::catalog::create_unit),
        )
        .route(
            "/api/units/:id",
            put(commands::catalog::update_unit).delete(commands::catalog::delete_unit),
        )
        .route(
            "/api/product-companies",
            get(commands::catalog::list_product_companies)
                .post(commands::catalog::create_product_company),
        )
        .route(
            "/api/product-companies/:id",
            put(commands::catalog::update_product_company)
                .delete(commands::catalog::delete_product_company),
        )
}
