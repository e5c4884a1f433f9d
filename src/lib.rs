/// jobtrack-client - Job application tracker client
///
/// Async client library for the job tracker backend: session handling with
/// transparent credential refresh, route guarding, and typed access to
/// applications and dashboard statistics.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod core;

pub use client::JobTracker;
pub use config::AppConfig;


pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
