use crate::state::AppState;
use axum::Router;

pub mod auth;
pub mod catalog;
pub mod company;
pub mod customer;
pub mod dashboard;
pub mod document;
pub mod invoice;
pub mod product;
pub mod scheme;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(catalog::router())
        .merge(product::router())
        .merge(customer::router())
        .merge(invoice::router())
        .merge(company::router())
        .merge(scheme::router())
        .merge(document::router())
        .merge(dashboard::router())
}
