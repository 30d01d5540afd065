//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by domain.

pub mod content;
pub mod health;
pub mod sessions;

pub use health::{health_check, liveness, readiness};
