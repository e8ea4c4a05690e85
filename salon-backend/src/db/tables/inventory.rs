//! Product and stock movement database operations

use chrono::Utc;
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use super::parse_enum;
use crate::db::Database;
use crate::models::{MovementKind, Product, ProductInput, StockMovement};

const PRODUCT_COLUMNS: &str =
    "id, business_id, name, sku, price, cost, stock, min_stock, is_active, created_at, updated_at";

/// Outcome of applying a stock movement
#[derive(Debug)]
pub enum StockChange {
    Applied(Product, StockMovement),
    ProductNotFound,
    InsufficientStock { available: i64 },
}

impl Database {
    pub fn create_product(&self, business_id: i64, input: &ProductInput, initial_stock: i64) -> SqliteResult<Product> {
        let id = {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO products (business_id, name, sku, price, cost, stock, min_stock, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                rusqlite::params![
                    business_id,
                    input.name,
                    input.sku,
                    input.price,
                    input.cost,
                    initial_stock,
                    input.min_stock,
                    input.is_active,
                    Utc::now()
                ],
            )?;
            conn.last_insert_rowid()
        };

        self.get_product(business_id, id)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn get_product(&self, business_id: i64, id: i64) -> SqliteResult<Option<Product>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {} FROM products WHERE id = ?1 AND business_id = ?2", PRODUCT_COLUMNS),
            [id, business_id],
            Self::row_to_product,
        )
        .optional()
    }

    pub fn list_products(&self, business_id: i64) -> SqliteResult<Vec<Product>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM products WHERE business_id = ?1 ORDER BY name",
            PRODUCT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([business_id], Self::row_to_product)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// Active products at or below their minimum stock
    pub fn list_low_stock_products(&self, business_id: i64) -> SqliteResult<Vec<Product>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM products WHERE business_id = ?1 AND is_active = 1 AND stock <= min_stock
             ORDER BY stock - min_stock, name",
            PRODUCT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([business_id], Self::row_to_product)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// Update descriptive fields. Stock only changes through movements.
    pub fn update_product(&self, business_id: i64, id: i64, input: &ProductInput) -> SqliteResult<Option<Product>> {
        let rows = {
            let conn = self.conn.lock();
            conn.execute(
                "UPDATE products SET name = ?1, sku = ?2, price = ?3, cost = ?4, min_stock = ?5,
                 is_active = ?6, updated_at = ?7 WHERE id = ?8 AND business_id = ?9",
                rusqlite::params![
                    input.name,
                    input.sku,
                    input.price,
                    input.cost,
                    input.min_stock,
                    input.is_active,
                    Utc::now(),
                    id,
                    business_id
                ],
            )?
        };
        if rows == 0 {
            return Ok(None);
        }
        self.get_product(business_id, id)
    }

    /// Read the stock, apply the movement and log it in one transaction
    pub fn apply_stock_movement(
        &self,
        business_id: i64,
        product_id: i64,
        kind: MovementKind,
        quantity: i64,
        reason: Option<&str>,
        created_by: Option<i64>,
    ) -> SqliteResult<StockChange> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let product = tx
            .query_row(
                &format!("SELECT {} FROM products WHERE id = ?1 AND business_id = ?2", PRODUCT_COLUMNS),
                [product_id, business_id],
                Self::row_to_product,
            )
            .optional()?;
        let Some(mut product) = product else {
            return Ok(StockChange::ProductNotFound);
        };
        let Some(next) = kind.apply(product.stock, quantity) else {
            return Ok(StockChange::InsufficientStock {
                available: product.stock,
            });
        };

        let now = Utc::now();
        tx.execute(
            "UPDATE products SET stock = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![next, now, product_id],
        )?;
        tx.execute(
            "INSERT INTO stock_movements (product_id, kind, quantity, resulting_stock, reason, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![product_id, kind.as_ref(), quantity, next, reason, created_by, now],
        )?;
        let movement_id = tx.last_insert_rowid();
        tx.commit()?;

        product.stock = next;
        product.updated_at = now;
        let movement = StockMovement {
            id: movement_id,
            product_id,
            kind,
            quantity,
            resulting_stock: next,
            reason: reason.map(str::to_string),
            created_by,
            created_at: now,
        };
        Ok(StockChange::Applied(product, movement))
    }

    pub fn list_stock_movements(&self, product_id: i64, limit: i64) -> SqliteResult<Vec<StockMovement>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, product_id, kind, quantity, resulting_stock, reason, created_by, created_at
             FROM stock_movements WHERE product_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map([product_id, limit], |row| {
                Ok(StockMovement {
                    id: row.get(0)?,
                    product_id: row.get(1)?,
                    kind: parse_enum(2, row.get(2)?)?,
                    quantity: row.get(3)?,
                    resulting_stock: row.get(4)?,
                    reason: row.get(5)?,
                    created_by: row.get(6)?,
                    created_at: row.get(7)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    fn row_to_product(row: &Row) -> SqliteResult<Product> {
        Ok(Product {
            id: row.get(0)?,
            business_id: row.get(1)?,
            name: row.get(2)?,
            sku: row.get(3)?,
            price: row.get(4)?,
            cost: row.get(5)?,
            stock: row.get(6)?,
            min_stock: row.get(7)?,
            is_active: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tables::is_constraint_violation;
    use crate::db::test_support::seeded_db;

    fn shampoo() -> ProductInput {
        ProductInput {
            name: "Shampoo".to_string(),
            sku: Some("SH-01".to_string()),
            price: 3_500_000,
            cost: 2_000_000,
            min_stock: 2,
            is_active: true,
        }
    }

    #[test]
    fn test_out_movement_cannot_go_negative() {
        let (db, seed) = seeded_db();
        let product = db.create_product(seed.business_id, &shampoo(), 3).unwrap();

        let change = db
            .apply_stock_movement(seed.business_id, product.id, MovementKind::Out, 5, None, None)
            .unwrap();
        assert!(matches!(change, StockChange::InsufficientStock { available: 3 }));

        let change = db
            .apply_stock_movement(seed.business_id, product.id, MovementKind::Out, 2, Some("sale"), None)
            .unwrap();
        let StockChange::Applied(product, movement) = change else {
            panic!("expected movement to apply");
        };
        assert_eq!(product.stock, 1);
        assert_eq!(movement.resulting_stock, 1);
        assert_eq!(db.list_stock_movements(product.id, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_low_stock_list() {
        let (db, seed) = seeded_db();
        let product = db.create_product(seed.business_id, &shampoo(), 10).unwrap();
        assert!(db.list_low_stock_products(seed.business_id).unwrap().is_empty());

        db.apply_stock_movement(seed.business_id, product.id, MovementKind::Adjustment, 2, None, None)
            .unwrap();
        let low = db.list_low_stock_products(seed.business_id).unwrap();
        assert_eq!(low.len(), 1);
        assert!(low[0].is_low_stock());
    }

    #[test]
    fn test_sku_unique_per_business() {
        let (db, seed) = seeded_db();
        db.create_product(seed.business_id, &shampoo(), 0).unwrap();
        let err = db.create_product(seed.business_id, &shampoo(), 0).unwrap_err();
        assert!(is_constraint_violation(&err));
    }

    #[test]
    fn test_movement_on_foreign_product() {
        let (db, seed) = seeded_db();
        let product = db.create_product(seed.business_id, &shampoo(), 1).unwrap();
        let change = db
            .apply_stock_movement(seed.business_id + 1, product.id, MovementKind::In, 1, None, None)
            .unwrap();
        assert!(matches!(change, StockChange::ProductNotFound));
    }
}
