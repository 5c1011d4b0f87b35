//! Request middleware: authentication and access extractors.

pub mod auth;
pub mod rbac;
