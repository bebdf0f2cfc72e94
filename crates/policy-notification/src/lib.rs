//! Eligibility validation and delivery of insurance policy notifications.

pub mod config;
pub mod error;
pub mod notifications;
pub mod telemetry;
