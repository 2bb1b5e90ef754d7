pub mod approval;
pub mod auth;
pub mod invoice_parser;
pub mod notifier;
pub mod order_service;
pub mod pdf_text;
pub mod storage;
pub mod supabase;
