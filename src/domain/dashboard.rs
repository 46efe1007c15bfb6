//! Dashboard: today's figures, the last seven days of activity and a short
//! feed of the latest operations.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Utc};
use std::collections::BTreeMap;

use super::clock::ShopClock;
use super::error::ShopError;
use super::finance::MovementKind;
use super::money::Amount;
use super::period::{day_range, end_of_day, local_date, start_of_day, TimeRange};
use super::sales::Sale;
use super::stock::{ProductQuery, StockView};
use super::trade::Trade;
use crate::ports::store_port::{RecordQuery, StorePort};

pub const CHART_DAYS: u64 = 7;
pub const RECENT_PER_KIND: usize = 5;
pub const RECENT_SHOWN: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashStats {
    pub references: usize,
    pub total_units: i64,
    pub sales_today: usize,
    pub revenue_today: Amount,
    pub trades_today: usize,
    /// Recorded receipt for today, 0 until the day is closed.
    pub receipt_today: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityPoint {
    pub date: NaiveDate,
    pub sales: usize,
    pub trades: usize,
}

impl ActivityPoint {
    pub fn label(&self) -> String {
        self.date.format("%d/%m").to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecentActivity {
    pub kind: MovementKind,
    pub description: String,
    pub amount: Option<Amount>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub stats: DashStats,
    pub activity: Vec<ActivityPoint>,
    pub recent: Vec<RecentActivity>,
}

/// One point per day from `first` to `last` inclusive, empty days included.
pub fn activity_chart(
    first: NaiveDate,
    last: NaiveDate,
    sales: &[Sale],
    trades: &[Trade],
    offset: FixedOffset,
) -> Vec<ActivityPoint> {
    let mut days: BTreeMap<NaiveDate, ActivityPoint> = first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|date| {
            (
                date,
                ActivityPoint {
                    date,
                    sales: 0,
                    trades: 0,
                },
            )
        })
        .collect();

    for sale in sales {
        if let Some(point) = days.get_mut(&local_date(sale.created_at, offset)) {
            point.sales += 1;
        }
    }
    for trade in trades {
        if let Some(point) = days.get_mut(&local_date(trade.created_at, offset)) {
            point.trades += 1;
        }
    }

    days.into_values().collect()
}

fn nonzero(amount: Amount) -> Option<Amount> {
    (amount != 0).then_some(amount)
}

/// Merge the latest sales and trades newest first, keeping [`RECENT_SHOWN`].
pub fn recent_activity(sales: &[Sale], trades: &[Trade]) -> Vec<RecentActivity> {
    let mut feed: Vec<RecentActivity> = sales
        .iter()
        .map(|s| RecentActivity {
            kind: MovementKind::Sale,
            description: format!("Vente: {}", s.product_label.as_deref().unwrap_or("")),
            amount: nonzero(s.total_price),
            created_at: s.created_at,
        })
        .chain(trades.iter().map(|t| RecentActivity {
            kind: MovementKind::Trade,
            description: format!("Troc: {}", t.client_phone_label()),
            amount: nonzero(t.trade_gain),
            created_at: t.created_at,
        }))
        .collect();
    feed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    feed.truncate(RECENT_SHOWN);
    feed
}

pub fn load_dashboard(store: &dyn StorePort, clock: &ShopClock) -> Result<Dashboard, ShopError> {
    let today = clock.today();
    let offset = clock.offset();

    let stock = StockView::from_products(store.list_products(&ProductQuery::default())?)?;

    let today_query = RecordQuery::within(day_range(today, offset).to_utc());
    let sales_today = store.list_sales(&today_query)?;
    let trades_today = store.list_trades(&today_query)?;
    let receipt_today = store.get_receipt(today)?.map_or(0, |r| r.total_amount);

    let first = today
        .checked_sub_days(Days::new(CHART_DAYS - 1))
        .unwrap_or(today);
    let week = RecordQuery::within(TimeRange {
        start: start_of_day(first, offset).with_timezone(&Utc),
        end: end_of_day(today, offset).with_timezone(&Utc),
    });
    let week_sales = store.list_sales(&week)?;
    let week_trades = store.list_trades(&week)?;
    let activity = activity_chart(first, today, &week_sales, &week_trades, offset);

    let latest_sales = store.list_sales(&RecordQuery::recent(RECENT_PER_KIND))?;
    let latest_trades = store.list_trades(&RecordQuery::recent(RECENT_PER_KIND))?;
    let recent = recent_activity(&latest_sales, &latest_trades);

    Ok(Dashboard {
        stats: DashStats {
            references: stock.references,
            total_units: stock.total_units,
            sales_today: sales_today.len(),
            revenue_today: sales_today.iter().map(|s| s.total_price).sum(),
            trades_today: trades_today.len(),
            receipt_today,
        },
        activity,
        recent,
    })
}
