//! Shop data store port trait.
//!
//! Adapters own the stock contract: inserting a stock entry adds its quantity
//! to the product, inserting a sale subtracts the sold quantity, and inserting
//! a trade takes one unit of the shop product out of stock. Deleting a product
//! that sales or trades still reference fails with
//! [`ShopError::ProductInUse`].

use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::brand::Brand;
use crate::domain::buyback::{Buyback, NewBuyback};
use crate::domain::closing::{DailyReceipt, NewReceipt};
use crate::domain::error::ShopError;
use crate::domain::period::TimeRange;
use crate::domain::sales::{NewSale, Sale};
use crate::domain::stock::{NewProduct, NewStockEntry, Product, ProductQuery, ProductUpdate, StockEntry};
use crate::domain::trade::{NewTrade, Trade};

/// Filter for sales, trades and buybacks. Results are always newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub range: Option<TimeRange>,
    pub limit: Option<usize>,
}

impl RecordQuery {
    pub fn recent(limit: usize) -> Self {
        Self {
            range: None,
            limit: Some(limit),
        }
    }

    pub fn within(range: TimeRange) -> Self {
        Self {
            range: Some(range),
            limit: None,
        }
    }
}

pub trait StorePort {
    /// Create the schema and seed brands where the adapter owns them.
    /// Remote stores are provisioned elsewhere.
    fn initialize(&self) -> Result<(), ShopError> {
        Ok(())
    }

    /// Brands ordered by name.
    fn list_brands(&self) -> Result<Vec<Brand>, ShopError>;
    /// Case-insensitive exact match.
    fn find_brand_by_name(&self, name: &str) -> Result<Option<Brand>, ShopError>;
    fn insert_brand(&self, name: &str) -> Result<Brand, ShopError>;

    fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, ShopError>;
    fn get_product(&self, id: Uuid) -> Result<Option<Product>, ShopError>;
    /// Product of `brand_id` whose model matches case-insensitively.
    fn find_product(&self, brand_id: Uuid, model: &str) -> Result<Option<Product>, ShopError>;
    /// Inserts with zero quantity; stock arrives through stock entries.
    fn insert_product(&self, product: &NewProduct) -> Result<Product, ShopError>;
    fn update_product(&self, id: Uuid, update: &ProductUpdate) -> Result<(), ShopError>;
    fn delete_product(&self, id: Uuid) -> Result<(), ShopError>;

    fn insert_stock_entry(&self, entry: &NewStockEntry) -> Result<StockEntry, ShopError>;

    fn list_sales(&self, query: &RecordQuery) -> Result<Vec<Sale>, ShopError>;
    fn insert_sale(&self, sale: &NewSale) -> Result<Sale, ShopError>;

    fn list_trades(&self, query: &RecordQuery) -> Result<Vec<Trade>, ShopError>;
    fn insert_trade(&self, trade: &NewTrade) -> Result<Trade, ShopError>;

    fn list_buybacks(&self, query: &RecordQuery) -> Result<Vec<Buyback>, ShopError>;
    fn insert_buyback(&self, buyback: &NewBuyback) -> Result<Buyback, ShopError>;

    fn get_receipt(&self, date: NaiveDate) -> Result<Option<DailyReceipt>, ShopError>;
    /// Insert or overwrite the receipt of `receipt.receipt_date`.
    fn upsert_receipt(&self, receipt: &NewReceipt) -> Result<DailyReceipt, ShopError>;
    /// Receipts between `first` and `last` inclusive, most recent date first.
    fn list_receipts(&self, first: NaiveDate, last: NaiveDate) -> Result<Vec<DailyReceipt>, ShopError>;
}
