use crate::commands;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/dashboard/stats",
            get(commands::dashboard::get_dashboard_stats),
        )
        .route(
            "/api/dashboard/sales-chart",
            get(commands::dashboard::get_sales_chart),
        )
        .route(
            "/api/dashboard/top-customers",
            get(commands::dashboard::get_top_customers),
        )
        .route(
            "/api/dashboard/top-products",
            get(commands::dashboard::get_top_products),
        )
}
