//! PostgreSQL store adapter.
//!
//! Talks to the same schema the hosted store exposes over REST. Amount
//! columns may be `numeric` there, so they are cast to `bigint` both ways.
//! The stock contract comes from the server-side triggers.

use chrono::{DateTime, NaiveDate, Utc};
use postgres::error::SqlState;
use postgres::types::ToSql;
use postgres::{NoTls, Row};
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;
use tracing::debug;
use uuid::Uuid;

use crate::domain::brand::Brand;
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

type Params<'a> = &'a [&'a (dyn ToSql + Sync)];

const PRODUCT_SELECT: &str = "SELECT p.id, p.brand_id, b.name, p.model, p.description, \
            p.unit_price::bigint, p.quantity::bigint, p.created_at, p.updated_at \
     FROM public.products p LEFT JOIN public.brands b ON b.id = p.brand_id";

const SALE_SELECT: &str = "SELECT s.id, s.product_id, b.name, p.model, s.quantity::bigint, \
            s.unit_price::bigint, s.total_price::bigint, s.notes, s.created_at \
     FROM public.sales s \
     LEFT JOIN public.products p ON p.id = s.product_id \
     LEFT JOIN public.brands b ON b.id = p.brand_id";

const TRADE_SELECT: &str = "SELECT t.id, t.client_phone_brand, t.client_phone_model, \
            t.client_phone_value::bigint, t.client_phone_description, t.shop_product_id, \
            b.name, p.model, t.shop_phone_price::bigint, t.shop_phone_description, \
            t.client_complement::bigint, t.trade_gain::bigint, t.notes, t.created_at \
     FROM public.trades t \
     LEFT JOIN public.products p ON p.id = t.shop_product_id \
     LEFT JOIN public.brands b ON b.id = p.brand_id";

const BUYBACK_SELECT: &str = "SELECT x.id, x.client_name, x.brand_name, x.model, x.description, \
            x.purchase_price::bigint, x.notes, x.created_at \
     FROM public.buybacks x";

const RECEIPT_SELECT: &str = "SELECT r.id, r.receipt_date, r.total_amount::bigint, r.notes, \
            r.created_at \
     FROM public.daily_receipts r";

/// `LIMIT NULL` is no limit in PostgreSQL.
fn record_clause(alias: &str) -> String {
    format!(
        " WHERE ($1::timestamptz IS NULL OR {alias}.created_at >= $1) \
            AND ($2::timestamptz IS NULL OR {alias}.created_at <= $2) \
          ORDER BY {alias}.created_at DESC LIMIT $3"
    )
}

fn record_params(
    query: &RecordQuery,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>, Option<i64>) {
    (
        query.range.map(|r| r.start),
        query.range.map(|r| r.end),
        query.limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX)),
    )
}

fn query_error(e: postgres::Error) -> ShopError {
    ShopError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn label_from(brand: Option<String>, model: Option<String>) -> Option<String> {
    model.map(|m| product_label(brand.as_deref(), &m))
}

fn brand_row(row: &Row) -> Brand {
    Brand {
        id: row.get(0),
        name: row.get(1),
    }
}

fn product_row(row: &Row) -> Product {
    Product {
        id: row.get(0),
        brand_id: row.get(1),
        brand_name: row.get(2),
        model: row.get(3),
        description: row.get(4),
        unit_price: row.get(5),
        quantity: row.get(6),
        created_at: row.get(7),
        updated_at: row.get(8),
    }
}

fn sale_row(row: &Row) -> Sale {
    Sale {
        id: row.get(0),
        product_id: row.get(1),
        product_label: label_from(row.get(2), row.get(3)),
        quantity: row.get(4),
        unit_price: row.get(5),
        total_price: row.get(6),
        notes: row.get(7),
        created_at: row.get(8),
    }
}

fn trade_row(row: &Row) -> Trade {
    Trade {
        id: row.get(0),
        client_phone_brand: row.get(1),
        client_phone_model: row.get(2),
        client_phone_value: row.get(3),
        client_phone_description: row.get(4),
        shop_product_id: row.get(5),
        shop_product_label: label_from(row.get(6), row.get(7)),
        shop_phone_price: row.get(8),
        shop_phone_description: row.get(9),
        client_complement: row.get(10),
        trade_gain: row.get(11),
        notes: row.get(12),
        created_at: row.get(13),
    }
}

fn buyback_row(row: &Row) -> Buyback {
    Buyback {
        id: row.get(0),
        client_name: row.get(1),
        brand_name: row.get(2),
        model: row.get(3),
        description: row.get(4),
        purchase_price: row.get(5),
        notes: row.get(6),
        created_at: row.get(7),
    }
}

fn receipt_row(row: &Row) -> DailyReceipt {
    DailyReceipt {
        id: row.get(0),
        receipt_date: row.get(1),
        total_amount: row.get(2),
        notes: row.get(3),
        created_at: row.get(4),
    }
}

pub struct PostgresAdapter {
    pool: Pool<PostgresConnectionManager<NoTls>>,
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ShopError> {
        let connection_string = config
            .get_non_empty("postgres", "connection_string")
            .ok_or_else(|| ShopError::ConfigMissing {
                section: "postgres".into(),
                key: "connection_string".into(),
            })?;

        let pg_config = connection_string
            .parse::<postgres::Config>()
            .map_err(|e| ShopError::ConfigInvalid {
                section: "postgres".into(),
                key: "connection_string".into(),
                reason: e.to_string(),
            })?;

        let pool_size = config.get_int("postgres", "pool_size", 4).clamp(1, 64) as u32;
        let manager = PostgresConnectionManager::new(pg_config, NoTls);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| ShopError::Database {
                reason: e.to_string(),
            })?;

        debug!(pool_size, "postgres store opened");
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<PostgresConnectionManager<NoTls>>, ShopError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| ShopError::Database {
                reason: e.to_string(),
            })
    }

    fn query_all<T>(&self, sql: &str, params: Params<'_>, map: fn(&Row) -> T) -> Result<Vec<T>, ShopError> {
        let rows = self.conn()?.query(sql, params).map_err(query_error)?;
        Ok(rows.iter().map(map).collect())
    }

    fn query_one<T>(
        &self,
        sql: &str,
        params: Params<'_>,
        map: fn(&Row) -> T,
    ) -> Result<Option<T>, ShopError> {
        let row = self.conn()?.query_opt(sql, params).map_err(query_error)?;
        Ok(row.as_ref().map(map))
    }

    fn fetch_inserted<T>(
        &self,
        entity: &'static str,
        select: &str,
        alias: &str,
        id: Uuid,
        map: fn(&Row) -> T,
    ) -> Result<T, ShopError> {
        let sql = format!("{select} WHERE {alias}.id = $1");
        self.query_one(&sql, &[&id], map)?
            .ok_or_else(|| ShopError::NotFound {
                entity,
                id: id.to_string(),
            })
    }
}

impl StorePort for PostgresAdapter {
    fn list_brands(&self) -> Result<Vec<Brand>, ShopError> {
        self.query_all("SELECT id, name FROM public.brands ORDER BY name", &[], brand_row)
    }

    fn find_brand_by_name(&self, name: &str) -> Result<Option<Brand>, ShopError> {
        self.query_one(
            "SELECT id, name FROM public.brands WHERE lower(name) = lower($1) LIMIT 1",
            &[&name.trim()],
            brand_row,
        )
    }

    fn insert_brand(&self, name: &str) -> Result<Brand, ShopError> {
        self.query_one(
            "INSERT INTO public.brands (id, name) VALUES ($1, $2) RETURNING id, name",
            &[&Uuid::new_v4(), &name.trim()],
            brand_row,
        )?
        .ok_or_else(|| ShopError::DatabaseQuery {
            reason: "brand insert returned no row".into(),
        })
    }

    fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, ShopError> {
        let order = match query.order {
            ProductOrder::Newest => "p.created_at DESC",
            ProductOrder::Model => "lower(p.model) ASC",
        };
        let sql = format!(
            "{PRODUCT_SELECT} \
             WHERE ($1::uuid IS NULL OR p.brand_id = $1) AND (NOT $2 OR p.quantity > 0) \
             ORDER BY {order}"
        );
        self.query_all(&sql, &[&query.brand_id, &query.in_stock_only], product_row)
    }

    fn get_product(&self, id: Uuid) -> Result<Option<Product>, ShopError> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.id = $1");
        self.query_one(&sql, &[&id], product_row)
    }

    fn find_product(&self, brand_id: Uuid, model: &str) -> Result<Option<Product>, ShopError> {
        let sql = format!(
            "{PRODUCT_SELECT} WHERE p.brand_id = $1 AND lower(p.model) = lower($2) LIMIT 1"
        );
        self.query_one(&sql, &[&brand_id, &model.trim()], product_row)
    }

    fn insert_product(&self, product: &NewProduct) -> Result<Product, ShopError> {
        let id = Uuid::new_v4();
        self.conn()?
            .execute(
                "INSERT INTO public.products \
                     (id, brand_id, model, description, unit_price, quantity, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5::bigint, 0, $6, $6)",
                &[
                    &id,
                    &product.brand_id,
                    &product.model,
                    &product.description,
                    &product.unit_price,
                    &product.created_at,
                ],
            )
            .map_err(query_error)?;
        self.fetch_inserted("product", PRODUCT_SELECT, "p", id, product_row)
    }

    fn update_product(&self, id: Uuid, update: &ProductUpdate) -> Result<(), ShopError> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE public.products \
                 SET quantity = COALESCE($1::bigint, quantity), unit_price = $2::bigint, \
                     updated_at = $3 \
                 WHERE id = $4",
                &[&update.quantity, &update.unit_price, &update.updated_at, &id],
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
            .execute("DELETE FROM public.products WHERE id = $1", &[&id])
            .map_err(|e| {
                if e.code() == Some(&SqlState::FOREIGN_KEY_VIOLATION) {
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
                "INSERT INTO public.stock_entries \
                     (id, product_id, quantity, unit_price, notes, created_at) \
                 VALUES ($1, $2, $3::bigint, $4::bigint, $5, $6)",
                &[
                    &id,
                    &entry.product_id,
                    &entry.quantity,
                    &entry.unit_price,
                    &entry.notes,
                    &entry.created_at,
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
        self.query_all(&sql, &[&start, &end, &limit], sale_row)
    }

    fn insert_sale(&self, sale: &NewSale) -> Result<Sale, ShopError> {
        let id = Uuid::new_v4();
        self.conn()?
            .execute(
                "INSERT INTO public.sales \
                     (id, product_id, quantity, unit_price, total_price, notes, created_at) \
                 VALUES ($1, $2, $3::bigint, $4::bigint, $5::bigint, $6, $7)",
                &[
                    &id,
                    &sale.product_id,
                    &sale.quantity,
                    &sale.unit_price,
                    &sale.total_price,
                    &sale.notes,
                    &sale.created_at,
                ],
            )
            .map_err(query_error)?;
        self.fetch_inserted("sale", SALE_SELECT, "s", id, sale_row)
    }

    fn list_trades(&self, query: &RecordQuery) -> Result<Vec<Trade>, ShopError> {
        let sql = format!("{TRADE_SELECT}{}", record_clause("t"));
        let (start, end, limit) = record_params(query);
        self.query_all(&sql, &[&start, &end, &limit], trade_row)
    }

    fn insert_trade(&self, trade: &NewTrade) -> Result<Trade, ShopError> {
        let id = Uuid::new_v4();
        self.conn()?
            .execute(
                "INSERT INTO public.trades \
                     (id, client_phone_brand, client_phone_model, client_phone_value, \
                      client_phone_description, shop_product_id, shop_phone_price, \
                      shop_phone_description, client_complement, trade_gain, notes, created_at) \
                 VALUES ($1, $2, $3, $4::bigint, $5, $6, $7::bigint, $8, $9::bigint, \
                         $10::bigint, $11, $12)",
                &[
                    &id,
                    &trade.client_phone_brand,
                    &trade.client_phone_model,
                    &trade.client_phone_value,
                    &trade.client_phone_description,
                    &trade.shop_product_id,
                    &trade.shop_phone_price,
                    &trade.shop_phone_description,
                    &trade.client_complement,
                    &trade.trade_gain,
                    &trade.notes,
                    &trade.created_at,
                ],
            )
            .map_err(query_error)?;
        self.fetch_inserted("trade", TRADE_SELECT, "t", id, trade_row)
    }

    fn list_buybacks(&self, query: &RecordQuery) -> Result<Vec<Buyback>, ShopError> {
        let sql = format!("{BUYBACK_SELECT}{}", record_clause("x"));
        let (start, end, limit) = record_params(query);
        self.query_all(&sql, &[&start, &end, &limit], buyback_row)
    }

    fn insert_buyback(&self, buyback: &NewBuyback) -> Result<Buyback, ShopError> {
        let id = Uuid::new_v4();
        self.conn()?
            .execute(
                "INSERT INTO public.buybacks \
                     (id, client_name, brand_name, model, description, purchase_price, notes, \
                      created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6::bigint, $7, $8)",
                &[
                    &id,
                    &buyback.client_name,
                    &buyback.brand_name,
                    &buyback.model,
                    &buyback.description,
                    &buyback.purchase_price,
                    &buyback.notes,
                    &buyback.created_at,
                ],
            )
            .map_err(query_error)?;
        self.fetch_inserted("buyback", BUYBACK_SELECT, "x", id, buyback_row)
    }

    fn get_receipt(&self, date: NaiveDate) -> Result<Option<DailyReceipt>, ShopError> {
        let sql = format!("{RECEIPT_SELECT} WHERE r.receipt_date = $1");
        self.query_one(&sql, &[&date], receipt_row)
    }

    fn upsert_receipt(&self, receipt: &NewReceipt) -> Result<DailyReceipt, ShopError> {
        self.query_one(
            "INSERT INTO public.daily_receipts (id, receipt_date, total_amount, notes, created_at) \
             VALUES ($1, $2, $3::bigint, $4, $5) \
             ON CONFLICT (receipt_date) DO UPDATE SET \
                 total_amount = EXCLUDED.total_amount, \
                 notes = EXCLUDED.notes, \
                 created_at = EXCLUDED.created_at \
             RETURNING id, receipt_date, total_amount::bigint, notes, created_at",
            &[
                &Uuid::new_v4(),
                &receipt.receipt_date,
                &receipt.total_amount,
                &receipt.notes,
                &receipt.created_at,
            ],
            receipt_row,
        )?
        .ok_or_else(|| ShopError::DatabaseQuery {
            reason: "receipt upsert returned no row".into(),
        })
    }

    fn list_receipts(
        &self,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Vec<DailyReceipt>, ShopError> {
        let sql = format!(
            "{RECEIPT_SELECT} WHERE r.receipt_date BETWEEN $1 AND $2 ORDER BY r.receipt_date DESC"
        );
        self.query_all(&sql, &[&first, &last], receipt_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapConfig(HashMap<(&'static str, &'static str), &'static str>);

    impl ConfigPort for MapConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.0
                .iter()
                .find(|((s, k), _)| *s == section && *k == key)
                .map(|(_, v)| v.to_string())
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
    }

    #[test]
    fn from_config_missing_connection_string() {
        let config = MapConfig(HashMap::new());
        let result = PostgresAdapter::from_config(&config);
        match result {
            Err(ShopError::ConfigMissing { section, key }) => {
                assert_eq!(section, "postgres");
                assert_eq!(key, "connection_string");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn from_config_rejects_malformed_connection_string() {
        let config = MapConfig(HashMap::from([(
            ("postgres", "connection_string"),
            "host=localhost port=notaport",
        )]));
        assert!(matches!(
            PostgresAdapter::from_config(&config),
            Err(ShopError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn record_params_pass_limit_through() {
        let (start, end, limit) = record_params(&RecordQuery::recent(5));
        assert!(start.is_none() && end.is_none());
        assert_eq!(limit, Some(5));
    }
}
