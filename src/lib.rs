pub mod catalog;
pub mod config;
pub mod deck;
pub mod error;
pub mod filter;
pub mod formula;
pub mod models;
pub mod session;
pub mod store;
pub mod table;
