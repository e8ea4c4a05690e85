//! Rule-based intent detection on the customer's message

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use strum::{AsRefStr, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Intent {
    Booking,
    Availability,
    Pricing,
    Cancellation,
    Greeting,
    Other,
}

// Spanish and English keywords; checked in this order, first match wins
static CANCELLATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(cancel\w*|anul\w*|reprogram\w*|reschedul\w*|no\s+(puedo|podr[eé])\s+ir)\b")
        .unwrap()
});
static BOOKING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(reserv\w*|agend\w*|book\w*|cita|citas|appointment\w*|apart\w*|turno)\b")
        .unwrap()
});
static AVAILABILITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(disponib\w*|availab\w*|horario\w*|espacio\w*|cupo\w*|free|open|abierto\w*|hora\w*)\b")
        .unwrap()
});
static PRICING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\b(precio\w*|cu[aá]nto\s+(cuesta|vale|cobran)|cost\w*|price\w*|tarifa\w*|valor)\b|\$)")
        .unwrap()
});
static GREETING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(hola|buen[oa]s(\s+(d[ií]as|tardes|noches))?|hello|hi|hey|good\s+(morning|afternoon|evening))\b")
        .unwrap()
});

pub fn classify_intent(text: &str) -> Intent {
    let rules: [(&Lazy<Regex>, Intent); 5] = [
        (&CANCELLATION, Intent::Cancellation),
        (&BOOKING, Intent::Booking),
        (&PRICING, Intent::Pricing),
        (&AVAILABILITY, Intent::Availability),
        (&GREETING, Intent::Greeting),
    ];
    rules
        .iter()
        .find(|(pattern, _)| pattern.is_match(text))
        .map(|(_, intent)| *intent)
        .unwrap_or(Intent::Other)
}
