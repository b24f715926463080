pub mod auth;
pub mod catalog;
pub mod company;
pub mod customer;
pub mod dashboard;
pub mod document;
pub mod invoice;
pub mod pricing;
pub mod product;
pub mod product_import;
pub mod scheme;
pub mod utils;

use serde::Serialize;

#[derive(Debug, Serialize, PartialEq)]
pub struct IdResponse {
    pub id: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
