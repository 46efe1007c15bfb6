//! Finance view: cash movements, per-day buckets and totals over a period.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::fmt;

use super::clock::ShopClock;
use super::closing::{reconcile, Reconciliation};
use super::error::ShopError;
use super::money::Amount;
use super::period::{local_date, DateRange, Period};
use super::sales::Sale;
use super::trade::Trade;
use crate::ports::store_port::{RecordQuery, StorePort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementKind {
    Sale,
    Trade,
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MovementKind::Sale => "Vente",
            MovementKind::Trade => "Troc",
        })
    }
}

/// One cash movement: a sale total or a trade complement.
#[derive(Debug, Clone, PartialEq)]
pub struct Movement {
    pub kind: MovementKind,
    pub description: String,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinanceEntry {
    pub date: NaiveDate,
    pub sales: Amount,
    pub trade_complements: Amount,
    pub trade_gains: Amount,
}

impl FinanceEntry {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            sales: 0,
            trade_complements: 0,
            trade_gains: 0,
        }
    }

    /// Cash received that day. Trade gains are not cash and stay out.
    pub fn total(&self) -> Amount {
        self.sales + self.trade_complements
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinanceTotals {
    pub sales: Amount,
    pub complements: Amount,
    pub gains: Amount,
}

impl FinanceTotals {
    pub fn from_entries(entries: &[FinanceEntry]) -> Self {
        entries.iter().fold(Self::default(), |acc, e| Self {
            sales: acc.sales + e.sales,
            complements: acc.complements + e.trade_complements,
            gains: acc.gains + e.trade_gains,
        })
    }

    pub fn grand_total(&self) -> Amount {
        self.sales + self.complements
    }
}

#[derive(Debug, Clone)]
pub struct FinanceReport {
    pub period: Period,
    pub range: DateRange,
    pub entries: Vec<FinanceEntry>,
    pub movements: Vec<Movement>,
    pub totals: FinanceTotals,
    pub today: Reconciliation,
}

/// Newest first.
pub fn build_movements(sales: &[Sale], trades: &[Trade]) -> Vec<Movement> {
    let mut movements: Vec<Movement> = sales
        .iter()
        .map(|s| Movement {
            kind: MovementKind::Sale,
            description: s.product_label.clone().unwrap_or_default(),
            amount: s.total_price,
            created_at: s.created_at,
        })
        .chain(trades.iter().map(|t| Movement {
            kind: MovementKind::Trade,
            description: t.client_phone_label(),
            amount: t.client_complement,
            created_at: t.created_at,
        }))
        .collect();
    movements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    movements
}

/// Bucket sales and trades by shop-local date, oldest day first. Days
/// without activity are omitted.
pub fn daily_entries(sales: &[Sale], trades: &[Trade], offset: FixedOffset) -> Vec<FinanceEntry> {
    let mut by_day: BTreeMap<NaiveDate, FinanceEntry> = BTreeMap::new();

    for sale in sales {
        let day = local_date(sale.created_at, offset);
        by_day
            .entry(day)
            .or_insert_with(|| FinanceEntry::empty(day))
            .sales += sale.total_price;
    }

    for trade in trades {
        let day = local_date(trade.created_at, offset);
        let entry = by_day.entry(day).or_insert_with(|| FinanceEntry::empty(day));
        entry.trade_complements += trade.client_complement;
        entry.trade_gains += trade.trade_gain;
    }

    by_day.into_values().collect()
}

pub fn finance_report(
    store: &dyn StorePort,
    clock: &ShopClock,
    period: Period,
) -> Result<FinanceReport, ShopError> {
    let range = period.range(clock.now())?;
    let query = RecordQuery::within(range.to_utc());

    let sales = store.list_sales(&query)?;
    let trades = store.list_trades(&query)?;

    let entries = daily_entries(&sales, &trades, clock.offset());
    let totals = FinanceTotals::from_entries(&entries);
    let movements = build_movements(&sales, &trades);
    let today = reconcile(store, clock, clock.today())?;

    Ok(FinanceReport {
        period,
        range,
        entries,
        movements,
        totals,
        today,
    })
}
