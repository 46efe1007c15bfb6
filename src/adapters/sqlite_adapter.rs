//! SQLite store adapter.
//!
//! Instants are stored as RFC 3339 UTC text with microseconds so that text
//! order matches time order. Ids are UUID text. The stock contract is
//! enforced by triggers.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::brand::{Brand, DEFAULT_BRANDS};
use crate::domain::buyback::{Buyback, NewBuyback};
use crate::domain::closing::{DailyReceipt, NewReceipt};
use crate::domain::error::ShopError;
use crate::domain::sales::{NewSale, Sale};
use crate::domain::stock::{
    product_label, NewProduct, NewStockEntry, Product, ProductOrder, ProductQuery, ProductUpdate,
    StockEntry,
};
use crate::domain::trade::{NewTrade, Trade};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::{RecordQuery, StorePort};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS brands (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE
);
CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    brand_id TEXT NOT NULL REFERENCES brands(id),
    model TEXT NOT NULL,
    description TEXT,
    unit_price INTEGER,
    quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_products_brand ON products(brand_id);
CREATE TABLE IF NOT EXISTS stock_entries (
    id TEXT PRIMARY KEY,
    product_id TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    unit_price INTEGER,
    notes TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS sales (
    id TEXT PRIMARY KEY,
    product_id TEXT NOT NULL REFERENCES products(id),
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    unit_price INTEGER NOT NULL,
    total_price INTEGER NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sales_created ON sales(created_at);
CREATE TABLE IF NOT EXISTS trades (
    id TEXT PRIMARY KEY,
    client_phone_brand TEXT NOT NULL,
    client_phone_model TEXT NOT NULL,
    client_phone_value INTEGER,
    client_phone_description TEXT,
    shop_product_id TEXT NOT NULL REFERENCES products(id),
    shop_phone_price INTEGER NOT NULL,
    shop_phone_description TEXT,
    client_complement INTEGER NOT NULL DEFAULT 0,
    trade_gain INTEGER NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_trades_created ON trades(created_at);
CREATE TABLE IF NOT EXISTS buybacks (
    id TEXT PRIMARY KEY,
    client_name TEXT,
    brand_name TEXT NOT NULL,
    model TEXT NOT NULL,
    description TEXT,
    purchase_price INTEGER NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_buybacks_created ON buybacks(created_at);
CREATE TABLE IF NOT EXISTS daily_receipts (
    id TEXT PRIMARY KEY,
    receipt_date TEXT NOT NULL UNIQUE,
    total_amount INTEGER NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL
);
CREATE TRIGGER IF NOT EXISTS stock_entry_adds_quantity AFTER INSERT ON stock_entries
BEGIN
    UPDATE products SET quantity = quantity + NEW.quantity, updated_at = NEW.created_at
    WHERE id = NEW.product_id;
END;
CREATE TRIGGER IF NOT EXISTS sale_removes_quantity AFTER INSERT ON sales
BEGIN
    UPDATE products SET quantity = quantity - NEW.quantity, updated_at = NEW.created_at
    WHERE id = NEW.product_id;
END;
CREATE TRIGGER IF NOT EXISTS trade_removes_shop_phone AFTER INSERT ON trades
BEGIN
    UPDATE products SET quantity = quantity - 1, updated_at = NEW.created_at
    WHERE id = NEW.shop_product_id;
END;
";

const PRODUCT_SELECT: &str = "SELECT p.id, p.brand_id, b.name, p.model, p.description, p.unit_price,
            p.quantity, p.created_at, p.updated_at
     FROM products p LEFT JOIN brands b ON b.id = p.brand_id";

const SALE_SELECT: &str = "SELECT s.id, s.product_id, b.name, p.model, s.quantity, s.unit_price,
            s.total_price, s.notes, s.created_at
     FROM sales s
     LEFT JOIN products p ON p.id = s.product_id
     LEFT JOIN brands b ON b.id = p.brand_id";

const TRADE_SELECT: &str = "SELECT t.id, t.client_phone_brand, t.client_phone_model,
            t.client_phone_value, t.client_phone_description, t.shop_product_id, b.name, p.model,
            t.shop_phone_price, t.shop_phone_description, t.client_complement, t.trade_gain,
            t.notes, t.created_at
     FROM trades t
     LEFT JOIN products p ON p.id = t.shop_product_id
     LEFT JOIN brands b ON b.id = p.brand_id";

const BUYBACK_SELECT: &str = "SELECT x.id, x.client_name, x.brand_name, x.model, x.description,
            x.purchase_price, x.notes, x.created_at
     FROM buybacks x";

const RECEIPT_SELECT: &str =
    "SELECT r.id, r.receipt_date, r.total_amount, r.notes, r.created_at FROM daily_receipts r";

/// Time filter, newest-first order and limit shared by the record listings.
/// `LIMIT -1` means no limit in SQLite.
fn record_clause(alias: &str) -> String {
    format!(
        " WHERE (?1 IS NULL OR {alias}.created_at >= ?1)
            AND (?2 IS NULL OR {alias}.created_at <= ?2)
          ORDER BY {alias}.created_at DESC LIMIT ?3"
    )
}

fn record_params(query: &RecordQuery) -> (Option<String>, Option<String>, i64) {
    (
        query.range.map(|r| stamp(r.start)),
        query.range.map(|r| stamp(r.end)),
        query
            .limit
            .map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX)),
    )
}

pub(crate) fn stamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text).map_err(|e| conversion_error(idx, e))
}

fn instant_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|e| conversion_error(idx, e))
}

fn label_from(brand: Option<String>, model: Option<String>) -> Option<String> {
    model.map(|m| product_label(brand.as_deref(), &m))
}

fn brand_row(row: &Row<'_>) -> rusqlite::Result<Brand> {
    Ok(Brand {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
    })
}

fn product_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: uuid_at(row, 0)?,
        brand_id: uuid_at(row, 1)?,
        brand_name: row.get(2)?,
        model: row.get(3)?,
        description: row.get(4)?,
        unit_price: row.get(5)?,
        quantity: row.get(6)?,
        created_at: instant_at(row, 7)?,
        updated_at: instant_at(row, 8)?,
    })
}

fn sale_row(row: &Row<'_>) -> rusqlite::Result<Sale> {
    Ok(Sale {
        id: uuid_at(row, 0)?,
        product_id: uuid_at(row, 1)?,
        product_label: label_from(row.get(2)?, row.get(3)?),
        quantity: row.get(4)?,
        unit_price: row.get(5)?,
        total_price: row.get(6)?,
        notes: row.get(7)?,
        created_at: instant_at(row, 8)?,
    })
}

fn trade_row(row: &Row<'_>) -> rusqlite::Result<Trade> {
    Ok(Trade {
        id: uuid_at(row, 0)?,
        client_phone_brand: row.get(1)?,
        client_phone_model: row.get(2)?,
        client_phone_value: row.get(3)?,
        client_phone_description: row.get(4)?,
        shop_product_id: uuid_at(row, 5)?,
        shop_product_label: label_from(row.get(6)?, row.get(7)?),
        shop_phone_price: row.get(8)?,
        shop_phone_description: row.get(9)?,
        client_complement: row.get(10)?,
        trade_gain: row.get(11)?,
        notes: row.get(12)?,
        created_at: instant_at(row, 13)?,
    })
}

fn buyback_row(row: &Row<'_>) -> rusqlite::Result<Buyback> {
    Ok(Buyback {
        id: uuid_at(row, 0)?,
        client_name: row.get(1)?,
        brand_name: row.get(2)?,
        model: row.get(3)?,
        description: row.get(4)?,
        purchase_price: row.get(5)?,
        notes: row.get(6)?,
        created_at: instant_at(row, 7)?,
    })
}

fn receipt_row(row: &Row<'_>) -> rusqlite::Result<DailyReceipt> {
    Ok(DailyReceipt {
        id: uuid_at(row, 0)?,
        receipt_date: date_at(row, 1)?,
        total_amount: row.get(2)?,
        notes: row.get(3)?,
        created_at: instant_at(row, 4)?,
    })
}

fn query_error(e: rusqlite::Error) -> ShopError {
    ShopError::DatabaseQuery {
        reason: e.to_string(),
    }
}

/// Databases created with `ON DELETE RESTRICT` report a plain constraint
/// failure, so the message is checked as well as the extended code.
fn is_foreign_key_violation(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, message) => {
            err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
                || (err.code == rusqlite::ErrorCode::ConstraintViolation
                    && message
                        .as_deref()
                        .is_some_and(|m| m.contains("FOREIGN KEY constraint failed")))
        }
        _ => false,
    }
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ShopError> {
        let db_path =
            config
                .get_non_empty("sqlite", "path")
                .ok_or_else(|| ShopError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).clamp(1, 64) as u32;

        let manager = SqliteConnectionManager::file(&db_path)
            .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| ShopError::Database {
                    reason: e.to_string(),
                })?;

        debug!(path = %db_path, pool_size, "sqlite store opened");
        Ok(Self { pool })
    }

    /// Single-connection in-memory store; every pooled connection to
    /// `:memory:` would otherwise see its own empty database.
    pub fn in_memory() -> Result<Self, ShopError> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| ShopError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), ShopError> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA).map_err(query_error)?;

        let mut seeded = 0;
        for name in DEFAULT_BRANDS {
            seeded += conn
                .execute(
                    "INSERT OR IGNORE INTO brands (id, name) VALUES (?1, ?2)",
                    params![Uuid::new_v4().to_string(), name],
                )
                .map_err(query_error)?;
        }
        if seeded > 0 {
            info!(seeded, "default brands seeded");
        }
        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, ShopError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| ShopError::Database {
                reason: e.to_string(),
            })
    }

    fn query_all<T, P>(
        &self,
        sql: &str,
        params: P,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>, ShopError>
    where
        P: rusqlite::Params,
    {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(query_error)?;
        let rows = stmt.query_map(params, map).map_err(query_error)?;
        let items = rows.collect::<Result<Vec<T>, _>>().map_err(query_error)?;
        Ok(items)
    }

    fn query_one<T, P>(
        &self,
        sql: &str,
        params: P,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Option<T>, ShopError>
    where
        P: rusqlite::Params,
    {
        let conn = self.conn()?;
        conn.query_row(sql, params, map)
            .optional()
            .map_err(query_error)
    }

    fn fetch_inserted<T>(
        &self,
        entity: &'static str,
        select: &str,
        alias: &str,
        id: Uuid,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<T, ShopError> {
        let sql = format!("{select} WHERE {alias}.id = ?1");
        self.query_one(&sql, params![id.to_string()], map)?
            .ok_or_else(|| ShopError::NotFound {
                entity,
                id: id.to_string(),
            })
    }
}

impl StorePort for SqliteAdapter {
    fn initialize(&self) -> Result<(), ShopError> {
        self.initialize_schema()
    }

    fn list_brands(&self) -> Result<Vec<Brand>, ShopError> {
        self.query_all(
            "SELECT id, name FROM brands ORDER BY name COLLATE NOCASE",
            [],
            brand_row,
        )
    }

    fn find_brand_by_name(&self, name: &str) -> Result<Option<Brand>, ShopError> {
        self.query_one(
            "SELECT id, name FROM brands WHERE name = ?1 COLLATE NOCASE",
            params![name.trim()],
            brand_row,
        )
    }

    fn insert_brand(&self, name: &str) -> Result<Brand, ShopError> {
        let brand = Brand {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
        };
        self.conn()?
            .execute(
                "INSERT INTO brands (id, name) VALUES (?1, ?2)",
                params![brand.id.to_string(), brand.name],
            )
            .map_err(query_error)?;
        Ok(brand)
    }

    fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, ShopError> {
        let order = match query.order {
            ProductOrder::Newest => "p.created_at DESC",
            ProductOrder::Model => "p.model COLLATE NOCASE ASC",
        };
        let sql = format!(
            "{PRODUCT_SELECT}
             WHERE (?1 IS NULL OR p.brand_id = ?1) AND (?2 = 0 OR p.quantity > 0)
             ORDER BY {order}"
        );
        self.query_all(
            &sql,
            params![query.brand_id.map(|b| b.to_string()), query.in_stock_only],
            product_row,
        )
    }

    fn get_product(&self, id: Uuid) -> Result<Option<Product>, ShopError> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.id = ?1");
        self.query_one(&sql, params![id.to_string()], product_row)
    }

    fn find_product(&self, brand_id: Uuid, model: &str) -> Result<Option<Product>, ShopError> {
        let sql = format!(
            "{PRODUCT_SELECT} WHERE p.brand_id = ?1 AND lower(p.model) = lower(?2) LIMIT 1"
        );
        self.query_one(&sql, params![brand_id.to_string(), model.trim()], product_row)
    }

    fn insert_product(&self, product: &NewProduct) -> Result<Product, ShopError> {
        let id = Uuid::new_v4();
        let now = stamp(product.created_at);
        self.conn()?
            .execute(
                "INSERT INTO products (id, brand_id, model, description, unit_price, quantity,
                                       created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)",
                params![
                    id.to_string(),
                    product.brand_id.to_string(),
                    product.model,
                    product.description,
                    product.unit_price,
                    now
                ],
            )
            .map_err(query_error)?;
        self.fetch_inserted("product", PRODUCT_SELECT, "p", id, product_row)
    }

    fn update_product(&self, id: Uuid, update: &ProductUpdate) -> Result<(), ShopError> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE products
                 SET quantity = COALESCE(?1, quantity), unit_price = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![
                    update.quantity,
                    update.unit_price,
                    stamp(update.updated_at),
                    id.to_string()
                ],
            )
            .map_err(query_error)?;
        if changed == 0 {
            return Err(ShopError::NotFound {
                entity: "product",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn delete_product(&self, id: Uuid) -> Result<(), ShopError> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM products WHERE id = ?1", params![id.to_string()])
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    ShopError::ProductInUse {
                        product: id.to_string(),
                    }
                } else {
                    query_error(e)
                }
            })?;
        if deleted == 0 {
            return Err(ShopError::NotFound {
                entity: "product",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn insert_stock_entry(&self, entry: &NewStockEntry) -> Result<StockEntry, ShopError> {
        let id = Uuid::new_v4();
        self.conn()?
            .execute(
                "INSERT INTO stock_entries (id, product_id, quantity, unit_price, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.to_string(),
                    entry.product_id.to_string(),
                    entry.quantity,
                    entry.unit_price,
                    entry.notes,
                    stamp(entry.created_at)
                ],
            )
            .map_err(query_error)?;
        Ok(StockEntry {
            id,
            product_id: entry.product_id,
            quantity: entry.quantity,
            unit_price: entry.unit_price,
            notes: entry.notes.clone(),
            created_at: entry.created_at,
        })
    }

    fn list_sales(&self, query: &RecordQuery) -> Result<Vec<Sale>, ShopError> {
        let sql = format!("{SALE_SELECT}{}", record_clause("s"));
        let (start, end, limit) = record_params(query);
        self.query_all(&sql, params![start, end, limit], sale_row)
    }

    fn insert_sale(&self, sale: &NewSale) -> Result<Sale, ShopError> {
        let id = Uuid::new_v4();
        self.conn()?
            .execute(
                "INSERT INTO sales (id, product_id, quantity, unit_price, total_price, notes,
                                    created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.to_string(),
                    sale.product_id.to_string(),
                    sale.quantity,
                    sale.unit_price,
                    sale.total_price,
                    sale.notes,
                    stamp(sale.created_at)
                ],
            )
            .map_err(query_error)?;
        self.fetch_inserted("sale", SALE_SELECT, "s", id, sale_row)
    }

    fn list_trades(&self, query: &RecordQuery) -> Result<Vec<Trade>, ShopError> {
        let sql = format!("{TRADE_SELECT}{}", record_clause("t"));
        let (start, end, limit) = record_params(query);
        self.query_all(&sql, params![start, end, limit], trade_row)
    }

    fn insert_trade(&self, trade: &NewTrade) -> Result<Trade, ShopError> {
        let id = Uuid::new_v4();
        self.conn()?
            .execute(
                "INSERT INTO trades (id, client_phone_brand, client_phone_model,
                                     client_phone_value, client_phone_description,
                                     shop_product_id, shop_phone_price, shop_phone_description,
                                     client_complement, trade_gain, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    id.to_string(),
                    trade.client_phone_brand,
                    trade.client_phone_model,
                    trade.client_phone_value,
                    trade.client_phone_description,
                    trade.shop_product_id.to_string(),
                    trade.shop_phone_price,
                    trade.shop_phone_description,
                    trade.client_complement,
                    trade.trade_gain,
                    trade.notes,
                    stamp(trade.created_at)
                ],
            )
            .map_err(query_error)?;
        self.fetch_inserted("trade", TRADE_SELECT, "t", id, trade_row)
    }

    fn list_buybacks(&self, query: &RecordQuery) -> Result<Vec<Buyback>, ShopError> {
        let sql = format!("{BUYBACK_SELECT}{}", record_clause("x"));
        let (start, end, limit) = record_params(query);
        self.query_all(&sql, params![start, end, limit], buyback_row)
    }

    fn insert_buyback(&self, buyback: &NewBuyback) -> Result<Buyback, ShopError> {
        let id = Uuid::new_v4();
        self.conn()?
            .execute(
                "INSERT INTO buybacks (id, client_name, brand_name, model, description,
                                       purchase_price, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.to_string(),
                    buyback.client_name,
                    buyback.brand_name,
                    buyback.model,
                    buyback.description,
                    buyback.purchase_price,
                    buyback.notes,
                    stamp(buyback.created_at)
                ],
            )
            .map_err(query_error)?;
        self.fetch_inserted("buyback", BUYBACK_SELECT, "x", id, buyback_row)
    }

    fn get_receipt(&self, date: NaiveDate) -> Result<Option<DailyReceipt>, ShopError> {
        let sql = format!("{RECEIPT_SELECT} WHERE r.receipt_date = ?1");
        self.query_one(&sql, params![date.format("%Y-%m-%d").to_string()], receipt_row)
    }

    fn upsert_receipt(&self, receipt: &NewReceipt) -> Result<DailyReceipt, ShopError> {
        let date = receipt.receipt_date.format("%Y-%m-%d").to_string();
        self.conn()?
            .execute(
                "INSERT INTO daily_receipts (id, receipt_date, total_amount, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(receipt_date) DO UPDATE SET
                     total_amount = excluded.total_amount,
                     notes = excluded.notes,
                     created_at = excluded.created_at",
                params![
                    Uuid::new_v4().to_string(),
                    date,
                    receipt.total_amount,
                    receipt.notes,
                    stamp(receipt.created_at)
                ],
            )
            .map_err(query_error)?;
        self.get_receipt(receipt.receipt_date)?
            .ok_or_else(|| ShopError::NotFound {
                entity: "receipt",
                id: date,
            })
    }

    fn list_receipts(
        &self,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Vec<DailyReceipt>, ShopError> {
        let sql = format!(
            "{RECEIPT_SELECT} WHERE r.receipt_date >= ?1 AND r.receipt_date <= ?2
             ORDER BY r.receipt_date DESC"
        );
        self.query_all(
            &sql,
            params![
                first.format("%Y-%m-%d").to_string(),
                last.format("%Y-%m-%d").to_string()
            ],
            receipt_row,
        )
    }
}
