//! Product catalog and stock movements

use crate::db::tables::{is_constraint_violation, StockChange};
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Business, MovementKind, Product, ProductInput, StockMovement};

fn validate(input: &ProductInput) -> AppResult<()> {
    if input.name.trim().is_empty() {
        return Err(AppError::validation("Product name is required"));
    }
    if input.price < 0 || input.cost < 0 {
        return Err(AppError::validation("Price and cost cannot be negative"));
    }
    if input.min_stock < 0 {
        return Err(AppError::validation("Minimum stock cannot be negative"));
    }
    Ok(())
}

fn map_sku_conflict(e: rusqlite::Error) -> AppError {
    if is_constraint_violation(&e) {
        AppError::conflict("Another product already uses this SKU")
    } else {
        e.into()
    }
}

pub fn create_product(db: &Database, business: &Business, input: &ProductInput, initial_stock: i64) -> AppResult<Product> {
    validate(input)?;
    if initial_stock < 0 {
        return Err(AppError::validation("Stock cannot be negative"));
    }
    db.create_product(business.id, input, initial_stock)
        .map_err(map_sku_conflict)
}

pub fn update_product(db: &Database, business: &Business, product_id: i64, input: &ProductInput) -> AppResult<Product> {
    validate(input)?;
    db.update_product(business.id, product_id, input)
        .map_err(map_sku_conflict)?
        .ok_or_else(|| AppError::not_found("Product"))
}

pub fn move_stock(
    db: &Database,
    business: &Business,
    product_id: i64,
    kind: MovementKind,
    quantity: i64,
    reason: Option<&str>,
    created_by: i64,
) -> AppResult<(Product, StockMovement)> {
    match kind {
        MovementKind::In | MovementKind::Out if quantity <= 0 => {
            return Err(AppError::validation("Quantity must be greater than zero"));
        }
        MovementKind::Adjustment if quantity < 0 => {
            return Err(AppError::validation("Stock cannot be adjusted below zero"));
        }
        _ => {}
    }

    match db.apply_stock_movement(business.id, product_id, kind, quantity, reason, Some(created_by))? {
        StockChange::Applied(product, movement) => {
            if product.is_low_stock() {
                log::info!(
                    "[INVENTORY] {} is low on stock ({} left, minimum {})",
                    product.name,
                    product.stock,
                    product.min_stock
                );
            }
            Ok((product, movement))
        }
        StockChange::ProductNotFound => Err(AppError::not_found("Product")),
        StockChange::InsufficientStock { available } => Err(AppError::validation(format!(
            "Not enough stock: {} available",
            available
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::seeded_db;

    fn wax() -> ProductInput {
        ProductInput {
            name: "Wax".to_string(),
            sku: None,
            price: 1_000,
            cost: 500,
            min_stock: 1,
            is_active: true,
        }
    }

    #[test]
    fn test_movement_rules() {
        let (db, seed) = seeded_db();
        let business = db.get_business(seed.business_id).unwrap().unwrap();
        let product = create_product(&db, &business, &wax(), 2).unwrap();

        assert!(move_stock(&db, &business, product.id, MovementKind::In, 0, None, seed.user_id).is_err());
        let err = move_stock(&db, &business, product.id, MovementKind::Out, 3, None, seed.user_id).unwrap_err();
        assert_eq!(err.to_string(), "Not enough stock: 2 available");

        let (product, movement) =
            move_stock(&db, &business, product.id, MovementKind::In, 5, Some("delivery"), seed.user_id).unwrap();
        assert_eq!(product.stock, 7);
        assert_eq!(movement.created_by, Some(seed.user_id));
    }

    #[test]
    fn test_negative_initial_stock() {
        let (db, seed) = seeded_db();
        let business = db.get_business(seed.business_id).unwrap().unwrap();
        assert!(create_product(&db, &business, &wax(), -1).is_err());
    }
}
