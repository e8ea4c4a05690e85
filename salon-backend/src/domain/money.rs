//! Currency formatting for amounts stored in minor units (cents)

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Cop,
    Mxn,
    Usd,
}

impl Currency {
    fn thousands_separator(&self) -> char {
        match self {
            Currency::Cop => '.',
            Currency::Mxn | Currency::Usd => ',',
        }
    }

    /// Number of fraction digits shown to users
    pub fn display_decimals(&self) -> u32 {
        match self {
            Currency::Cop => 0,
            Currency::Mxn | Currency::Usd => 2,
        }
    }
}

/// Format an amount in cents for display.
///
/// COP drops the fraction (rounding half away from zero) and renders as
/// `$ 1.234.567`; MXN and USD render as `$1,234.50`.
pub fn format_currency(amount_cents: i64, currency: Currency) -> String {
    let sign = if amount_cents < 0 { "-" } else { "" };
    let abs = amount_cents.unsigned_abs();

    match currency.display_decimals() {
        0 => {
            let units = (abs + 50) / 100;
            format!("{}$ {}", sign, group_digits(units, currency.thousands_separator()))
        }
        _ => {
            let units = abs / 100;
            let cents = abs % 100;
            format!(
                "{}${}.{:02}",
                sign,
                group_digits(units, currency.thousands_separator()),
                cents
            )
        }
    }
}

fn group_digits(value: u64, separator: char) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}
