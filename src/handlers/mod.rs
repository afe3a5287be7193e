pub mod activity_logs;
pub mod clients;
pub mod invoices;
pub mod products;
pub mod settings;
