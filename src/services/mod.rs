pub mod activity_log_service;
pub mod calculator;
pub mod invoice_service;

pub use activity_log_service::ActivityLogService;
pub use invoice_service::InvoiceService;
