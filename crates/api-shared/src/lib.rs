//! # API Shared
//!
//! Shared utilities and definitions for the MedAssist APIs.
//!
//! Contains:
//! - Request and response bodies (`dto` module), documented for OpenAPI
//! - Shared services like `HealthService`
//! - Authentication utilities for resolving the acting user from a request header
//!
//! Used by `api-rest` and the `medassist` CLI for common functionality.

pub mod auth;
pub mod dto;
pub mod health;

pub use dto::*;
pub use health::{HealthRes, HealthService};
