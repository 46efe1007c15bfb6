//! Sales page: recording sales and listing recent ones.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use super::clock::ShopClock;
use super::error::ShopError;
use super::money::{checked_sum, out_of_range, Amount};
use super::period::day_range;
use super::stock::require_product;
use crate::ports::store_port::{RecordQuery, StorePort};

/// Number of rows the list views fetch.
pub const RECENT_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct Sale {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_label: Option<String>,
    pub quantity: i64,
    pub unit_price: Amount,
    pub total_price: Amount,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSale {
    pub product_id: Uuid,
    pub quantity: i64,
    pub unit_price: Amount,
    pub total_price: Amount,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SaleForm {
    pub product_id: Uuid,
    pub quantity: i64,
    /// Defaults to the product's unit price.
    pub unit_price: Option<Amount>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SalesView {
    pub sales: Vec<Sale>,
    pub revenue: Amount,
}

pub fn record_sale(
    store: &dyn StorePort,
    clock: &ShopClock,
    form: &SaleForm,
) -> Result<Sale, ShopError> {
    if form.quantity < 1 {
        return Err(ShopError::validation("quantity", "must be at least 1"));
    }

    let product = require_product(store, form.product_id)?;
    let unit_price = form
        .unit_price
        .or(product.unit_price)
        .ok_or_else(|| ShopError::required("unit_price"))?;
    if unit_price < 0 {
        return Err(ShopError::validation("unit_price", "must not be negative"));
    }

    let total_price = form
        .quantity
        .checked_mul(unit_price)
        .ok_or_else(|| out_of_range("total_price"))?;

    if product.quantity < form.quantity {
        return Err(ShopError::InsufficientStock {
            product: product.label(),
            available: product.quantity,
            requested: form.quantity,
        });
    }

    let sale = store.insert_sale(&NewSale {
        product_id: product.id,
        quantity: form.quantity,
        unit_price,
        total_price,
        notes: form
            .notes
            .as_ref()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        created_at: clock.now_utc(),
    })?;

    info!(
        product = %product.label(),
        quantity = sale.quantity,
        total = sale.total_price,
        "sale recorded"
    );
    Ok(sale)
}

/// Latest sales, optionally restricted to one shop-local day.
pub fn list_sales(
    store: &dyn StorePort,
    clock: &ShopClock,
    day: Option<NaiveDate>,
) -> Result<SalesView, ShopError> {
    let query = RecordQuery {
        range: day.map(|d| day_range(d, clock.offset()).to_utc()),
        limit: Some(RECENT_LIMIT),
    };
    let sales = store.list_sales(&query)?;
    let revenue = checked_sum("revenue", sales.iter().map(|s| s.total_price))?;
    Ok(SalesView { sales, revenue })
}
