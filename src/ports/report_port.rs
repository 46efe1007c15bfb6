//! Report export port trait.

use crate::domain::error::ShopError;
use crate::domain::finance::FinanceReport;

/// Port for exporting finance reports.
pub trait ReportPort {
    fn write_finance(&self, report: &FinanceReport, output_path: &str) -> Result<(), ShopError>;
}
