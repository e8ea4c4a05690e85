use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_PREFIX_LEN: usize = 4;
pub const MAX_PREFIX_LEN: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceSettings {
    pub business_id: i64,
    pub prefix: String,
    pub next_number: i64,
    /// Tax rate in basis points (1900 = 19%)
    pub tax_rate_bps: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub business_id: i64,
    pub appointment_id: i64,
    pub number: i64,
    pub full_number: String,
    pub subtotal: i64,
    pub tax: i64,
    pub total: i64,
    pub issued_at: DateTime<Utc>,
}

/// Normalize and validate an invoice prefix: 4-10 ASCII letters or digits, uppercased
pub fn normalize_prefix(prefix: &str) -> Result<String, String> {
    let prefix = prefix.trim();
    if prefix.len() < MIN_PREFIX_LEN || prefix.len() > MAX_PREFIX_LEN {
        return Err(format!(
            "Invoice prefix must be between {} and {} characters",
            MIN_PREFIX_LEN, MAX_PREFIX_LEN
        ));
    }
    if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Invoice prefix may only contain letters and digits".to_string());
    }
    Ok(prefix.to_ascii_uppercase())
}

pub fn format_invoice_number(prefix: &str, number: i64) -> String {
    format!("{}-{:06}", prefix, number)
}

/// Tax in cents for `subtotal` at `tax_rate_bps`, rounded half up
pub fn compute_tax(subtotal: i64, tax_rate_bps: i64) -> i64 {
    let raw = subtotal.max(0) as i128 * tax_rate_bps as i128;
    ((raw + 5_000) / 10_000) as i64
}
