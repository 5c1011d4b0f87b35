//! Database models and DTOs for all domain entities.

pub mod api_key;
pub mod membership;
pub mod pagination;
pub mod project;
pub mod scan_config;
pub mod scan_job;
pub mod user;
