pub mod activity;
pub mod auth;
pub mod client;
pub mod invoice;
pub mod product;
pub mod settings;
