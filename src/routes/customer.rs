use crate::commands;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/customers",
            get(commands::customer::list_customers).post(commands::customer::create_customer),
        )
        .route(
            "/api/customers/search",
            get(commands::customer::search_customers),
        )
        .route(
            "/api/customers/:id",
            get(commands::customer::get_customer)
                .put(commands::customer::update_customer)
                .delete(commands::customer::delete_customer),
        )
        .route(
            "/api/customers/:id/balance",
            get(commands::customer::get_customer_balance),
        )
}
