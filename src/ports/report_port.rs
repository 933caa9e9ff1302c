//! Report generation port trait.

use crate::domain::analysis::ExporterAnalysis;
use crate::domain::error::ShipscopeError;

/// Port for writing exporter analysis reports.
pub trait ReportPort {
    fn write(&self, analysis: &ExporterAnalysis, output_path: &str) -> Result<(), ShipscopeError>;
}
