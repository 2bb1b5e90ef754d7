pub mod auth;
pub mod dashboard;
pub mod invoices;
pub mod orders;
pub mod uploads;
