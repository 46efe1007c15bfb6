//! CSV export of finance reports.

use crate::domain::error::ShopError;
use crate::domain::finance::FinanceReport;
use crate::ports::report_port::ReportPort;
use std::io::Write;
use tracing::info;

const HEADER: [&str; 5] = ["date", "sales", "trade_complements", "trade_gains", "total"];

fn csv_error(e: csv::Error) -> ShopError {
    ShopError::Io(std::io::Error::other(e))
}

/// Writes one row per active day, oldest first, then a `TOTAL` row.
/// Amounts are plain whole FCFA so spreadsheets can sum them.
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn write_to<W: Write>(&self, report: &FinanceReport, out: W) -> Result<(), ShopError> {
        let mut wtr = csv::Writer::from_writer(out);
        wtr.write_record(HEADER).map_err(csv_error)?;

        for entry in &report.entries {
            wtr.write_record([
                entry.date.format("%Y-%m-%d").to_string(),
                entry.sales.to_string(),
                entry.trade_complements.to_string(),
                entry.trade_gains.to_string(),
                entry.total().to_string(),
            ])
            .map_err(csv_error)?;
        }

        let totals = &report.totals;
        wtr.write_record([
            "TOTAL".to_string(),
            totals.sales.to_string(),
            totals.complements.to_string(),
            totals.gains.to_string(),
            totals.grand_total().to_string(),
        ])
        .map_err(csv_error)?;

        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_finance(&self, report: &FinanceReport, output_path: &str) -> Result<(), ShopError> {
        let file = std::fs::File::create(output_path)?;
        self.write_to(report, file)?;
        info!(path = output_path, days = report.entries.len(), "finance report exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::closing::Reconciliation;
    use crate::domain::finance::{FinanceEntry, FinanceTotals};
    use crate::domain::period::{day_range, Period};
    use chrono::{FixedOffset, NaiveDate};
    use tempfile::TempDir;

    fn report() -> FinanceReport {
        let day = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let entries = vec![
            FinanceEntry {
                date: day.pred_opt().unwrap(),
                sales: 85_000,
                trade_complements: 0,
                trade_gains: 0,
            },
            FinanceEntry {
                date: day,
                sales: 170_000,
                trade_complements: 25_000,
                trade_gains: -5_000,
            },
        ];
        FinanceReport {
            period: Period::Week,
            range: day_range(day, FixedOffset::east_opt(0).unwrap()),
            totals: FinanceTotals::from_entries(&entries),
            entries,
            movements: Vec::new(),
            today: Reconciliation {
                date: day,
                recorded: None,
                computed: 195_000,
            },
        }
    }

    #[test]
    fn rows_then_totals() {
        let mut buf = Vec::new();
        CsvReportAdapter.write_to(&report(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "date,sales,trade_complements,trade_gains,total");
        assert_eq!(lines[1], "2026-10-15,85000,0,0,85000");
        assert_eq!(lines[2], "2026-10-16,170000,25000,-5000,195000");
        assert_eq!(lines[3], "TOTAL,255000,25000,-5000,280000");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn write_finance_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("finance.csv");
        CsvReportAdapter
            .write_finance(&report(), path.to_str().unwrap())
            .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("date,sales"));
    }

    #[test]
    fn write_finance_into_missing_directory_fails() {
        let result = CsvReportAdapter.write_finance(&report(), "/nonexistent/dir/finance.csv");
        assert!(matches!(result, Err(ShopError::Io(_))));
    }
}
