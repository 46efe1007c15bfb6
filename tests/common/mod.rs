#![allow(dead_code)]

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use esstore::domain::brand::{Brand, DEFAULT_BRANDS};
use esstore::domain::buyback::{Buyback, NewBuyback};
use esstore::domain::clock::ShopClock;
use esstore::domain::closing::{DailyReceipt, NewReceipt};
use esstore::domain::error::ShopError;
use esstore::domain::money::Amount;
use esstore::domain::sales::{NewSale, Sale};
use esstore::domain::stock::{
    product_label, NewProduct, NewStockEntry, Product, ProductOrder, ProductQuery, ProductUpdate,
    StockEntry,
};
use esstore::domain::trade::{NewTrade, Trade};
use esstore::ports::store_port::{RecordQuery, StorePort};
use std::cell::RefCell;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    brands: Vec<Brand>,
    products: Vec<Product>,
    stock_entries: Vec<StockEntry>,
    sales: Vec<Sale>,
    trades: Vec<Trade>,
    buybacks: Vec<Buyback>,
    receipts: Vec<DailyReceipt>,
}

/// In-memory store applying the same stock rules as the database adapters.
#[derive(Default)]
pub struct MockStore {
    tables: RefCell<Tables>,
    /// When set, every call fails with this database error.
    pub failure: Option<String>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded() -> Self {
        let store = Self::new();
        for name in DEFAULT_BRANDS {
            store.insert_brand(name).unwrap();
        }
        store
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn stock_entries(&self) -> Vec<StockEntry> {
        self.tables.borrow().stock_entries.clone()
    }

    fn check(&self) -> Result<(), ShopError> {
        match &self.failure {
            Some(reason) => Err(ShopError::Database {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn with_label(tables: &Tables, product: &Product) -> Product {
        let mut product = product.clone();
        product.brand_name = tables
            .brands
            .iter()
            .find(|b| b.id == product.brand_id)
            .map(|b| b.name.clone());
        product
    }

    fn label_of(tables: &Tables, product_id: Uuid) -> Option<String> {
        tables
            .products
            .iter()
            .find(|p| p.id == product_id)
            .map(|p| Self::with_label(tables, p).label())
    }

    fn adjust(tables: &mut Tables, product_id: Uuid, delta: i64) -> Result<(), ShopError> {
        let product = tables
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| ShopError::NotFound {
                entity: "product",
                id: product_id.to_string(),
            })?;
        if product.quantity + delta < 0 {
            return Err(ShopError::DatabaseQuery {
                reason: "CHECK constraint failed: quantity >= 0".into(),
            });
        }
        product.quantity += delta;
        Ok(())
    }
}

fn select<T: Clone>(
    rows: &[T],
    query: &RecordQuery,
    created_at: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut picked: Vec<T> = rows
        .iter()
        .filter(|r| query.range.is_none_or(|range| range.contains(created_at(r))))
        .cloned()
        .collect();
    picked.sort_by_key(|r| std::cmp::Reverse(created_at(r)));
    if let Some(limit) = query.limit {
        picked.truncate(limit);
    }
    picked
}

impl StorePort for MockStore {
    fn list_brands(&self) -> Result<Vec<Brand>, ShopError> {
        self.check()?;
        let mut brands = self.tables.borrow().brands.clone();
        brands.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(brands)
    }

    fn find_brand_by_name(&self, name: &str) -> Result<Option<Brand>, ShopError> {
        self.check()?;
        Ok(self
            .tables
            .borrow()
            .brands
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(name.trim()))
            .cloned())
    }

    fn insert_brand(&self, name: &str) -> Result<Brand, ShopError> {
        self.check()?;
        let brand = Brand {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.tables.borrow_mut().brands.push(brand.clone());
        Ok(brand)
    }

    fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, ShopError> {
        self.check()?;
        let tables = self.tables.borrow();
        let mut products: Vec<Product> = tables
            .products
            .iter()
            .filter(|p| query.brand_id.is_none_or(|id| p.brand_id == id))
            .filter(|p| !query.in_stock_only || p.quantity > 0)
            .map(|p| Self::with_label(&tables, p))
            .collect();
        match query.order {
            ProductOrder::Newest => products.sort_by_key(|p| std::cmp::Reverse(p.created_at)),
            ProductOrder::Model => products.sort_by(|a, b| a.model.cmp(&b.model)),
        }
        Ok(products)
    }

    fn get_product(&self, id: Uuid) -> Result<Option<Product>, ShopError> {
        self.check()?;
        let tables = self.tables.borrow();
        Ok(tables
            .products
            .iter()
            .find(|p| p.id == id)
            .map(|p| Self::with_label(&tables, p)))
    }

    fn find_product(&self, brand_id: Uuid, model: &str) -> Result<Option<Product>, ShopError> {
        self.check()?;
        let tables = self.tables.borrow();
        Ok(tables
            .products
            .iter()
            .find(|p| p.brand_id == brand_id && p.model.eq_ignore_ascii_case(model.trim()))
            .map(|p| Self::with_label(&tables, p)))
    }

    fn insert_product(&self, product: &NewProduct) -> Result<Product, ShopError> {
        self.check()?;
        let mut tables = self.tables.borrow_mut();
        let created = Product {
            id: Uuid::new_v4(),
            brand_id: product.brand_id,
            brand_name: None,
            model: product.model.clone(),
            description: product.description.clone(),
            unit_price: product.unit_price,
            quantity: 0,
            created_at: product.created_at,
            updated_at: product.created_at,
        };
        tables.products.push(created.clone());
        Ok(Self::with_label(&tables, &created))
    }

    fn update_product(&self, id: Uuid, update: &ProductUpdate) -> Result<(), ShopError> {
        self.check()?;
        let mut tables = self.tables.borrow_mut();
        let product = tables
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ShopError::NotFound {
                entity: "product",
                id: id.to_string(),
            })?;
        if let Some(quantity) = update.quantity {
            product.quantity = quantity;
        }
        product.unit_price = update.unit_price;
        product.updated_at = update.updated_at;
        Ok(())
    }

    fn delete_product(&self, id: Uuid) -> Result<(), ShopError> {
        self.check()?;
        let mut tables = self.tables.borrow_mut();
        let referenced = tables.sales.iter().any(|s| s.product_id == id)
            || tables.trades.iter().any(|t| t.shop_product_id == id);
        if referenced {
            return Err(ShopError::ProductInUse {
                product: id.to_string(),
            });
        }
        let before = tables.products.len();
        tables.products.retain(|p| p.id != id);
        if tables.products.len() == before {
            return Err(ShopError::NotFound {
                entity: "product",
                id: id.to_string(),
            });
        }
        tables.stock_entries.retain(|e| e.product_id != id);
        Ok(())
    }

    fn insert_stock_entry(&self, entry: &NewStockEntry) -> Result<StockEntry, ShopError> {
        self.check()?;
        let mut tables = self.tables.borrow_mut();
        Self::adjust(&mut tables, entry.product_id, entry.quantity)?;
        let created = StockEntry {
            id: Uuid::new_v4(),
            product_id: entry.product_id,
            quantity: entry.quantity,
            unit_price: entry.unit_price,
            notes: entry.notes.clone(),
            created_at: entry.created_at,
        };
        tables.stock_entries.push(created.clone());
        Ok(created)
    }

    fn list_sales(&self, query: &RecordQuery) -> Result<Vec<Sale>, ShopError> {
        self.check()?;
        Ok(select(&self.tables.borrow().sales, query, |s| s.created_at))
    }

    fn insert_sale(&self, sale: &NewSale) -> Result<Sale, ShopError> {
        self.check()?;
        let mut tables = self.tables.borrow_mut();
        Self::adjust(&mut tables, sale.product_id, -sale.quantity)?;
        let created = Sale {
            id: Uuid::new_v4(),
            product_id: sale.product_id,
            product_label: Self::label_of(&tables, sale.product_id),
            quantity: sale.quantity,
            unit_price: sale.unit_price,
            total_price: sale.total_price,
            notes: sale.notes.clone(),
            created_at: sale.created_at,
        };
        tables.sales.push(created.clone());
        Ok(created)
    }

    fn list_trades(&self, query: &RecordQuery) -> Result<Vec<Trade>, ShopError> {
        self.check()?;
        Ok(select(&self.tables.borrow().trades, query, |t| t.created_at))
    }

    fn insert_trade(&self, trade: &NewTrade) -> Result<Trade, ShopError> {
        self.check()?;
        let mut tables = self.tables.borrow_mut();
        Self::adjust(&mut tables, trade.shop_product_id, -1)?;
        let created = Trade {
            id: Uuid::new_v4(),
            client_phone_brand: trade.client_phone_brand.clone(),
            client_phone_model: trade.client_phone_model.clone(),
            client_phone_value: trade.client_phone_value,
            client_phone_description: trade.client_phone_description.clone(),
            shop_product_id: trade.shop_product_id,
            shop_product_label: Self::label_of(&tables, trade.shop_product_id),
            shop_phone_price: trade.shop_phone_price,
            shop_phone_description: trade.shop_phone_description.clone(),
            client_complement: trade.client_complement,
            trade_gain: trade.trade_gain,
            notes: trade.notes.clone(),
            created_at: trade.created_at,
        };
        tables.trades.push(created.clone());
        Ok(created)
    }

    fn list_buybacks(&self, query: &RecordQuery) -> Result<Vec<Buyback>, ShopError> {
        self.check()?;
        Ok(select(&self.tables.borrow().buybacks, query, |b| b.created_at))
    }

    fn insert_buyback(&self, buyback: &NewBuyback) -> Result<Buyback, ShopError> {
        self.check()?;
        let created = Buyback {
            id: Uuid::new_v4(),
            client_name: buyback.client_name.clone(),
            brand_name: buyback.brand_name.clone(),
            model: buyback.model.clone(),
            description: buyback.description.clone(),
            purchase_price: buyback.purchase_price,
            notes: buyback.notes.clone(),
            created_at: buyback.created_at,
        };
        self.tables.borrow_mut().buybacks.push(created.clone());
        Ok(created)
    }

    fn get_receipt(&self, date: NaiveDate) -> Result<Option<DailyReceipt>, ShopError> {
        self.check()?;
        Ok(self
            .tables
            .borrow()
            .receipts
            .iter()
            .find(|r| r.receipt_date == date)
            .cloned())
    }

    fn upsert_receipt(&self, receipt: &NewReceipt) -> Result<DailyReceipt, ShopError> {
        self.check()?;
        let mut tables = self.tables.borrow_mut();
        if let Some(existing) = tables
            .receipts
            .iter_mut()
            .find(|r| r.receipt_date == receipt.receipt_date)
        {
            existing.total_amount = receipt.total_amount;
            existing.notes = receipt.notes.clone();
            return Ok(existing.clone());
        }
        let created = DailyReceipt {
            id: Uuid::new_v4(),
            receipt_date: receipt.receipt_date,
            total_amount: receipt.total_amount,
            notes: receipt.notes.clone(),
            created_at: receipt.created_at,
        };
        tables.receipts.push(created.clone());
        Ok(created)
    }

    fn list_receipts(
        &self,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Vec<DailyReceipt>, ShopError> {
        self.check()?;
        let mut receipts: Vec<DailyReceipt> = self
            .tables
            .borrow()
            .receipts
            .iter()
            .filter(|r| r.receipt_date >= first && r.receipt_date <= last)
            .cloned()
            .collect();
        receipts.sort_by_key(|r| std::cmp::Reverse(r.receipt_date));
        Ok(receipts)
    }
}

pub fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

pub fn at(date: &str, time: &str) -> DateTime<Utc> {
    let naive = chrono::NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M")
        .unwrap();
    Utc.from_utc_datetime(&naive)
}

pub fn clock_at(date: &str, time: &str) -> ShopClock {
    ShopClock::frozen_at(utc(), at(date, time))
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Stock `quantity` units of `brand model` at `price` and return the product.
pub fn stock_product(
    store: &dyn StorePort,
    clock: &ShopClock,
    brand: &str,
    model: &str,
    quantity: i64,
    price: Amount,
) -> Product {
    let brand = esstore::domain::brand::resolve_brand(store, brand).unwrap();
    let outcome = esstore::domain::stock::receive_stock(
        store,
        clock,
        &esstore::domain::stock::StockIntake {
            brand_id: brand.id,
            model: model.to_string(),
            quantity,
            unit_price: Some(price),
            description: format!("{model} neuf"),
        },
    )
    .unwrap();
    store.get_product(outcome.product_id()).unwrap().unwrap()
}

pub fn expected_label(brand: &str, model: &str) -> String {
    product_label(Some(brand), model)
}
