//! Client records and medical history

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Business, Client, ClientInput, MedicalRecord, MedicalRecordInput};

/// Keep digits only so the same number typed differently matches
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn clean(input: &ClientInput) -> AppResult<ClientInput> {
    let full_name = input.full_name.trim();
    if full_name.is_empty() {
        return Err(AppError::validation("Client name is required"));
    }
    let phone = input
        .phone
        .as_deref()
        .map(normalize_phone)
        .filter(|p| !p.is_empty());
    if phone.as_ref().is_some_and(|p| p.len() < 7) {
        return Err(AppError::validation("Phone number is too short"));
    }
    Ok(ClientInput {
        full_name: full_name.to_string(),
        phone,
        email: input
            .email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty()),
    })
}

pub fn create_client(db: &Database, business: &Business, input: &ClientInput) -> AppResult<Client> {
    let input = clean(input)?;
    Ok(db.create_client(business.id, &input)?)
}

pub fn update_client(db: &Database, business: &Business, client_id: i64, input: &ClientInput) -> AppResult<Client> {
    let input = clean(input)?;
    db.update_client(business.id, client_id, &input)?
        .ok_or_else(|| AppError::not_found("Client"))
}

/// Existing client with this phone, or a new one
pub fn find_or_create_by_phone(db: &Database, business_id: i64, full_name: &str, phone: &str) -> AppResult<Client> {
    let phone = normalize_phone(phone);
    if phone.len() < 7 {
        return Err(AppError::validation("A valid phone number is required"));
    }
    if let Some(client) = db.find_client_by_phone(business_id, &phone)? {
        return Ok(client);
    }
    let input = ClientInput {
        full_name: full_name.trim().to_string(),
        phone: Some(phone),
        email: None,
    };
    if input.full_name.is_empty() {
        return Err(AppError::validation("Client name is required"));
    }
    Ok(db.create_client(business_id, &input)?)
}

pub fn add_medical_record(
    db: &Database,
    business: &Business,
    client_id: i64,
    input: &MedicalRecordInput,
    created_by: i64,
) -> AppResult<MedicalRecord> {
    db.get_client(business.id, client_id)?
        .ok_or_else(|| AppError::not_found("Client"))?;
    let empty = [&input.allergies, &input.conditions, &input.notes]
        .iter()
        .all(|field| field.as_deref().is_none_or(|v| v.trim().is_empty()));
    if empty {
        return Err(AppError::validation("A medical record needs at least one field"));
    }
    Ok(db.create_medical_record(business.id, client_id, input, Some(created_by))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::seeded_db;

    #[test]
    fn test_phone_normalization() {
        assert_eq!(normalize_phone("+57 300-111 2233"), "573001112233");
    }

    #[test]
    fn test_find_or_create_reuses_client() {
        let (db, seed) = seeded_db();
        let existing = find_or_create_by_phone(&db, seed.business_id, "Sofi", "+57 300 111 2233").unwrap();
        assert_eq!(existing.id, seed.client_id);

        let new = find_or_create_by_phone(&db, seed.business_id, "Pedro", "3109998877").unwrap();
        assert_ne!(new.id, seed.client_id);
        assert!(find_or_create_by_phone(&db, seed.business_id, "X", "12").is_err());
    }

    #[test]
    fn test_empty_medical_record_rejected() {
        let (db, seed) = seeded_db();
        let business = db.get_business(seed.business_id).unwrap().unwrap();
        let empty = MedicalRecordInput {
            allergies: Some("  ".to_string()),
            conditions: None,
            notes: None,
        };
        assert!(add_medical_record(&db, &business, seed.client_id, &empty, seed.user_id).is_err());

        let record = MedicalRecordInput {
            allergies: Some("Latex".to_string()),
            conditions: None,
            notes: None,
        };
        add_medical_record(&db, &business, seed.client_id, &record, seed.user_id).unwrap();
        assert_eq!(db.list_medical_records(seed.business_id, seed.client_id).unwrap().len(), 1);
    }
}
