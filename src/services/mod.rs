pub mod auth;
pub mod credentials;
pub mod cron;
pub mod encryption;
pub mod file_storage;
pub mod metrics;
pub mod tokens;
