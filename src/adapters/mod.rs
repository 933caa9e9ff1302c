//! Concrete adapter implementations for ports.

pub mod cached_source;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod html_report;
#[cfg(feature = "llm")]
pub mod openai_adapter;
pub mod seasonal_trend_model;
