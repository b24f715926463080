use crate::db::{CustomerType, Product, ProductUnit};
use crate::error::{BilldeskError, BilldeskResult};

/// Rate a line item picks up for `unit_id` when sold to a customer of the
/// given type.
///
/// The base unit uses the product's own rates (wholesale falls back to the
/// retail base rate when unset); any other unit must be one of the product's
/// packaging units.
pub fn select_rate(
    product: &Product,
    units: &[ProductUnit],
    unit_id: i64,
    customer_type: CustomerType,
) -> BilldeskResult<f64> {
    if unit_id == product.base_unit_id {
        return Ok(match customer_type {
            CustomerType::Wholesale => product.base_wholesale_rate.unwrap_or(product.base_rate),
            CustomerType::Retail => product.base_rate,
        });
    }

    let unit = units
        .iter()
        .find(|u| u.unit_id == unit_id)
        .ok_or_else(|| {
            BilldeskError::Validation(format!(
                "Unit {} is not configured for product {}",
                unit_id, product.code
            ))
        })?;

    Ok(match customer_type {
        CustomerType::Wholesale => unit.wholesale_rate,
        CustomerType::Retail => unit.retail_rate,
    })
}
