use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub business_id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub price: i64,
    pub cost: i64,
    pub stock: i64,
    pub min_stock: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        self.is_active && self.stock <= self.min_stock
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub sku: Option<String>,
    pub price: i64,
    #[serde(default)]
    pub cost: i64,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MovementKind {
    In,
    Out,
    /// Sets the stock to an absolute quantity (physical count)
    Adjustment,
}

impl MovementKind {
    /// Stock level after applying `quantity`, or `None` if it would go negative
    pub fn apply(&self, stock: i64, quantity: i64) -> Option<i64> {
        let next = match self {
            MovementKind::In => stock.checked_add(quantity)?,
            MovementKind::Out => stock.checked_sub(quantity)?,
            MovementKind::Adjustment => quantity,
        };
        (next >= 0).then_some(next)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    pub kind: MovementKind,
    pub quantity: i64,
    pub resulting_stock: i64,
    pub reason: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_movements() {
        assert_eq!(MovementKind::In.apply(3, 2), Some(5));
        assert_eq!(MovementKind::Out.apply(3, 3), Some(0));
        assert_eq!(MovementKind::Out.apply(3, 4), None);
        assert_eq!(MovementKind::Adjustment.apply(3, 10), Some(10));
        assert_eq!(MovementKind::Adjustment.apply(3, -1), None);
    }
}
