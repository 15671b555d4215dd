pub mod config;
pub mod fingerprint;
pub mod index;
pub mod merge;
pub mod models;
pub mod services;
pub mod store;
