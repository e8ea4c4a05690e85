pub mod account;
pub mod agent;
pub mod appointment;
pub mod business;
pub mod catalog;
pub mod client;
pub mod commission;
pub mod goal;
pub mod inventory;
pub mod invoice;
pub mod subscription;
pub mod whatsapp;

pub use account::{AuthSession, BusinessAccount, User, UserRole};
pub use agent::{AgentFeedback, AgentLink, AgentMessage, AgentSession};
pub use appointment::{
    Appointment, AppointmentPayment, AppointmentStatus, AppointmentView, DueReminder, PaymentMethod,
    PaymentStatus,
};
pub use business::{Business, BusinessInput};
pub use catalog::{Service, ServiceInput, Specialist, SpecialistInput};
pub use client::{Client, ClientInput, MedicalRecord, MedicalRecordInput};
pub use commission::{Commission, CommissionConfig, CommissionKind, CommissionStatus, CommissionSummary};
pub use goal::{Goal, GoalMetric, GoalProgress};
pub use inventory::{MovementKind, Product, ProductInput, StockMovement};
pub use invoice::{Invoice, InvoiceSettings};
pub use subscription::{Plan, Subscription, SubscriptionPayment, SubscriptionStatus};
pub use whatsapp::{Conversation, MessageDirection, WhatsAppMessage};
