pub mod sqlite;
pub mod tables;

pub use sqlite::Database;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, Utc};

    use super::Database;
    use crate::domain::Currency;
    use crate::models::{BusinessInput, ClientInput, ServiceInput, SpecialistInput};

    /// Ids of a freshly seeded tenant with one of everything
    pub struct Seed {
        pub account_id: i64,
        pub user_id: i64,
        pub business_id: i64,
        pub specialist_id: i64,
        pub service_id: i64,
        pub client_id: i64,
    }

    pub fn business_input(name: &str) -> BusinessInput {
        BusinessInput {
            name: name.to_string(),
            phone: None,
            address: None,
            currency: Currency::Cop,
            opening_time: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            closing_time: chrono::NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            whatsapp_phone_number_id: None,
        }
    }

    pub fn seeded_db() -> (Database, Seed) {
        let db = Database::new(":memory:").unwrap();
        let (account, owner) = db
            .create_account_with_owner(
                "Glow Studio",
                "Ana Ruiz",
                "ana@glow.co",
                "hash",
                Utc::now() + Duration::days(14),
            )
            .unwrap();

        let mut input = business_input("Glow Centro");
        input.whatsapp_phone_number_id = Some("1098765".to_string());
        let business = db.create_business(account.id, &input).unwrap();

        let specialist = db
            .create_specialist(
                business.id,
                &SpecialistInput {
                    name: "Laura".to_string(),
                    phone: None,
                    email: None,
                    is_active: true,
                },
            )
            .unwrap();
        let service = db
            .create_service(
                business.id,
                &ServiceInput {
                    name: "Manicure".to_string(),
                    duration_minutes: 60,
                    price: 5_000_000,
                    is_active: true,
                },
            )
            .unwrap();
        let client = db
            .create_client(
                business.id,
                &ClientInput {
                    full_name: "Sofia Gomez".to_string(),
                    phone: Some("573001112233".to_string()),
                    email: None,
                },
            )
            .unwrap();

        let seed = Seed {
            account_id: account.id,
            user_id: owner.id,
            business_id: business.id,
            specialist_id: specialist.id,
            service_id: service.id,
            client_id: client.id,
        };
        (db, seed)
    }
}
