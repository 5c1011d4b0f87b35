//! Business logic services.

pub mod access;
pub mod api_keys;
pub mod auth;
pub mod dispatch;
pub mod jobs;
pub mod memberships;
pub mod projects;
pub mod results;
pub mod scan_configs;
