//! Core domain types and logic.

pub mod shipment;
pub mod filter;
pub mod aggregate;
pub mod overview;
pub mod forecast;
pub mod analysis;
pub mod session;
pub mod access;
pub mod advisor;
pub mod config_validation;
pub mod error;
