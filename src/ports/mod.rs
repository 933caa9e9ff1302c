//! Port traits the domain depends on; adapters implement them.

pub mod config_port;
pub mod data_port;
pub mod forecast_port;
pub mod language_model_port;
pub mod report_port;
