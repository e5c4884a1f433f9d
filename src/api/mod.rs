//! Typed consumers of the job tracker backend.
//!
//! Every consumer goes through the shared [`Pipeline`](crate::auth::Pipeline),
//! so credential handling is never repeated per endpoint. Sign-in is the
//! exception: [`SocialLoginApi`] talks to the transport directly.

pub mod applications;
pub mod auth;
pub mod client;
pub mod dashboard;
pub mod models;
pub mod signal;

pub use applications::{ApplicationsApi, ListQuery};
pub use auth::SocialLoginApi;
pub use client::ApiClient;
pub use dashboard::DashboardApi;
pub use models::{
    ApplicationPatch, ApplicationStatus, DashboardStats, JobApplication, NewApplication, Page,
    StatusAudit, StatusCount,
};
pub use signal::RefreshSignal;
