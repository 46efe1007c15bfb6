//! Daily closing (clôture): computing a day's receipts and recording them.
//!
//! A day's receipts are the sale totals plus the trade complements taken in
//! cash that day. At most one receipt is kept per calendar date; recording
//! again overwrites it.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use super::clock::ShopClock;
use super::error::ShopError;
use super::money::Amount;
use super::period::day_range;
use super::sales::Sale;
use super::trade::Trade;
use crate::ports::store_port::{RecordQuery, StorePort};

#[derive(Debug, Clone, PartialEq)]
pub struct DailyReceipt {
    pub id: Uuid,
    pub receipt_date: NaiveDate,
    pub total_amount: Amount,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReceipt {
    pub receipt_date: NaiveDate,
    pub total_amount: Amount,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosingSummary {
    pub date: NaiveDate,
    pub sales_count: usize,
    pub trades_count: usize,
    pub sales_total: Amount,
    pub complements_total: Amount,
}

impl ClosingSummary {
    pub fn from_records(date: NaiveDate, sales: &[Sale], trades: &[Trade]) -> Self {
        Self {
            date,
            sales_count: sales.len(),
            trades_count: trades.len(),
            sales_total: sales.iter().map(|s| s.total_price).sum(),
            complements_total: trades.iter().map(|t| t.client_complement).sum(),
        }
    }

    pub fn total(&self) -> Amount {
        self.sales_total + self.complements_total
    }

    pub fn note(&self) -> String {
        format!(
            "Clôture automatique — {} vente(s), {} troc(s)",
            self.sales_count, self.trades_count
        )
    }
}

/// Recorded receipt of a day against what the sales and trades add up to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub date: NaiveDate,
    pub recorded: Option<Amount>,
    pub computed: Amount,
}

impl Reconciliation {
    /// Recorded minus computed; `None` until a receipt is recorded.
    pub fn variance(&self) -> Option<Amount> {
        self.recorded.map(|r| r - self.computed)
    }
}

pub fn closing_summary(
    store: &dyn StorePort,
    clock: &ShopClock,
    date: NaiveDate,
) -> Result<ClosingSummary, ShopError> {
    let query = RecordQuery::within(day_range(date, clock.offset()).to_utc());
    let sales = store.list_sales(&query)?;
    let trades = store.list_trades(&query)?;
    Ok(ClosingSummary::from_records(date, &sales, &trades))
}

/// Close today: store today's computed receipts with an automatic note.
pub fn close_day(
    store: &dyn StorePort,
    clock: &ShopClock,
) -> Result<(ClosingSummary, DailyReceipt), ShopError> {
    let summary = closing_summary(store, clock, clock.today())?;
    let receipt = store.upsert_receipt(&NewReceipt {
        receipt_date: summary.date,
        total_amount: summary.total(),
        notes: Some(summary.note()),
        created_at: clock.now_utc(),
    })?;
    info!(
        date = %summary.date,
        sales = summary.sales_count,
        trades = summary.trades_count,
        total = summary.total(),
        "day closed"
    );
    Ok((summary, receipt))
}

/// Record a counted receipt by hand, for `date` or today.
pub fn record_receipt(
    store: &dyn StorePort,
    clock: &ShopClock,
    date: Option<NaiveDate>,
    amount: Option<Amount>,
    notes: Option<&str>,
) -> Result<DailyReceipt, ShopError> {
    let amount = amount.ok_or_else(|| ShopError::required("amount"))?;
    if amount < 0 {
        return Err(ShopError::validation("amount", "must not be negative"));
    }
    let receipt = store.upsert_receipt(&NewReceipt {
        receipt_date: date.unwrap_or_else(|| clock.today()),
        total_amount: amount,
        notes: notes.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
        created_at: clock.now_utc(),
    })?;
    info!(date = %receipt.receipt_date, amount, "receipt recorded");
    Ok(receipt)
}

pub fn reconcile(
    store: &dyn StorePort,
    clock: &ShopClock,
    date: NaiveDate,
) -> Result<Reconciliation, ShopError> {
    let recorded = store.get_receipt(date)?.map(|r| r.total_amount);
    let computed = closing_summary(store, clock, date)?.total();
    Ok(Reconciliation {
        date,
        recorded,
        computed,
    })
}

pub fn list_receipts(
    store: &dyn StorePort,
    first: NaiveDate,
    last: NaiveDate,
) -> Result<Vec<DailyReceipt>, ShopError> {
    if first > last {
        return Err(ShopError::validation(
            "date range",
            format!("{first} is after {last}"),
        ));
    }
    store.list_receipts(first, last)
}
