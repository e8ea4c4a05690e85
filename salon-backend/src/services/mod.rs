//! Business operations on top of the database layer. Controllers call these;
//! every function validates input and returns `AppResult`.

pub mod agent_links;
pub mod appointments;
pub mod auth;
pub mod businesses;
pub mod catalog;
pub mod clients;
pub mod commissions;
pub mod dashboard;
pub mod inventory;
pub mod invoices;
pub mod subscriptions;
pub mod whatsapp;
