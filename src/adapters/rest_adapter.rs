//! Hosted store adapter speaking the PostgREST dialect (Supabase).
//!
//! Every table lives under `/rest/v1/<table>`. Requests carry the anon key
//! both as `apikey` and as a bearer token. Writes ask for the written row
//! back with `Prefer: return=representation`. The stock contract is enforced
//! by database triggers on the server.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::brand::Brand;
use crate::domain::buyback::{Buyback, NewBuyback};
use crate::domain::closing::{DailyReceipt, NewReceipt};
use crate::domain::error::ShopError;
use crate::domain::money::Amount;
use crate::domain::sales::{NewSale, Sale};
use crate::domain::stock::{
    product_label, NewProduct, NewStockEntry, Product, ProductOrder, ProductQuery, ProductUpdate,
    StockEntry,
};
use crate::domain::trade::{NewTrade, Trade};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::{RecordQuery, StorePort};

pub const URL_ENV: &str = "SUPABASE_URL";
pub const KEY_ENV: &str = "SUPABASE_ANON_KEY";

const DEFAULT_TIMEOUT_SECS: i64 = 15;
const FOREIGN_KEY_VIOLATION: &str = "23503";

const PRODUCT_SELECT: &str = "*,brands(name)";
const RECORD_SELECT: &str = "*,products(model,brands(name))";

/// Connection settings for the hosted store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestConfig {
    pub url: String,
    pub anon_key: String,
    pub timeout: Duration,
}

fn is_placeholder(value: &str) -> bool {
    let lower = value.to_lowercase();
    ["placeholder", "your-project", "your-anon-key"]
        .iter()
        .any(|p| lower.contains(p))
}

impl RestConfig {
    /// `[rest] url / anon_key / timeout_secs`, with `SUPABASE_URL` and
    /// `SUPABASE_ANON_KEY` taking precedence.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ShopError> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    pub fn resolve(
        config: &dyn ConfigPort,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ShopError> {
        let setting = |env_name: &str, key: &str| -> Result<String, ShopError> {
            let value = env(env_name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .or_else(|| config.get_non_empty("rest", key))
                .ok_or_else(|| ShopError::ConfigMissing {
                    section: "rest".into(),
                    key: key.into(),
                })?;
            if is_placeholder(&value) {
                return Err(ShopError::ConfigInvalid {
                    section: "rest".into(),
                    key: key.into(),
                    reason: "still set to a placeholder value".into(),
                });
            }
            Ok(value)
        };

        let url = setting(URL_ENV, "url")?;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ShopError::ConfigInvalid {
                section: "rest".into(),
                key: "url".into(),
                reason: format!("'{url}' is not an http(s) URL"),
            });
        }
        let anon_key = setting(KEY_ENV, "anon_key")?;

        let timeout_secs = config.get_int("rest", "timeout_secs", DEFAULT_TIMEOUT_SECS);
        if timeout_secs <= 0 {
            return Err(ShopError::ConfigInvalid {
                section: "rest".into(),
                key: "timeout_secs".into(),
                reason: "must be positive".into(),
            });
        }

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
            timeout: Duration::from_secs(timeout_secs as u64),
        })
    }
}

// ---------------------------------------------------------------------------
// Wire rows
// ---------------------------------------------------------------------------

/// Amount columns may be `numeric` server-side and arrive as `85000.0`.
fn amount<'de, D: Deserializer<'de>>(d: D) -> Result<Amount, D::Error> {
    let n = serde_json::Number::deserialize(d)?;
    number_to_amount(&n).ok_or_else(|| serde::de::Error::custom(format!("bad amount {n}")))
}

fn opt_amount<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Amount>, D::Error> {
    match Option::<serde_json::Number>::deserialize(d)? {
        None => Ok(None),
        Some(n) => number_to_amount(&n)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("bad amount {n}"))),
    }
}

fn number_to_amount(n: &serde_json::Number) -> Option<Amount> {
    n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as Amount))
}

#[derive(Debug, Deserialize)]
struct BrandName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ProductRef {
    model: String,
    brands: Option<BrandName>,
}

impl ProductRef {
    fn label(&self) -> String {
        product_label(self.brands.as_ref().map(|b| b.name.as_str()), &self.model)
    }
}

#[derive(Debug, Deserialize)]
struct BrandRow {
    id: Uuid,
    name: String,
}

impl From<BrandRow> for Brand {
    fn from(row: BrandRow) -> Self {
        Brand {
            id: row.id,
            name: row.name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProductRow {
    id: Uuid,
    brand_id: Uuid,
    model: String,
    description: Option<String>,
    #[serde(default, deserialize_with = "opt_amount")]
    unit_price: Option<Amount>,
    quantity: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    brands: Option<BrandName>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            brand_id: row.brand_id,
            brand_name: row.brands.map(|b| b.name),
            model: row.model,
            description: row.description,
            unit_price: row.unit_price,
            quantity: row.quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StockEntryRow {
    id: Uuid,
    product_id: Uuid,
    quantity: i64,
    #[serde(default, deserialize_with = "opt_amount")]
    unit_price: Option<Amount>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct SaleRow {
    id: Uuid,
    product_id: Uuid,
    quantity: i64,
    #[serde(deserialize_with = "amount")]
    unit_price: Amount,
    #[serde(deserialize_with = "amount")]
    total_price: Amount,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    products: Option<ProductRef>,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Sale {
            id: row.id,
            product_id: row.product_id,
            product_label: row.products.as_ref().map(ProductRef::label),
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TradeRow {
    id: Uuid,
    client_phone_brand: String,
    client_phone_model: String,
    #[serde(default, deserialize_with = "opt_amount")]
    client_phone_value: Option<Amount>,
    client_phone_description: Option<String>,
    shop_product_id: Uuid,
    #[serde(deserialize_with = "amount")]
    shop_phone_price: Amount,
    shop_phone_description: Option<String>,
    #[serde(deserialize_with = "amount")]
    client_complement: Amount,
    #[serde(deserialize_with = "amount")]
    trade_gain: Amount,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    products: Option<ProductRef>,
}

impl From<TradeRow> for Trade {
    fn from(row: TradeRow) -> Self {
        Trade {
            id: row.id,
            client_phone_brand: row.client_phone_brand,
            client_phone_model: row.client_phone_model,
            client_phone_value: row.client_phone_value,
            client_phone_description: row.client_phone_description,
            shop_product_id: row.shop_product_id,
            shop_product_label: row.products.as_ref().map(ProductRef::label),
            shop_phone_price: row.shop_phone_price,
            shop_phone_description: row.shop_phone_description,
            client_complement: row.client_complement,
            trade_gain: row.trade_gain,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BuybackRow {
    id: Uuid,
    client_name: Option<String>,
    brand_name: String,
    model: String,
    description: Option<String>,
    #[serde(deserialize_with = "amount")]
    purchase_price: Amount,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<BuybackRow> for Buyback {
    fn from(row: BuybackRow) -> Self {
        Buyback {
            id: row.id,
            client_name: row.client_name,
            brand_name: row.brand_name,
            model: row.model,
            description: row.description,
            purchase_price: row.purchase_price,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReceiptRow {
    id: Uuid,
    receipt_date: NaiveDate,
    #[serde(deserialize_with = "amount")]
    total_amount: Amount,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ReceiptRow> for DailyReceipt {
    fn from(row: ReceiptRow) -> Self {
        DailyReceipt {
            id: row.id,
            receipt_date: row.receipt_date,
            total_amount: row.total_amount,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    quantity: Option<i64>,
    unit_price: Option<Amount>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ProductInsert<'a> {
    brand_id: Uuid,
    model: &'a str,
    description: Option<&'a str>,
    unit_price: Option<Amount>,
    quantity: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// PostgREST error body.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

pub struct RestAdapter {
    base_url: String,
    client: Client,
}

type Query = Vec<(&'static str, String)>;

fn stamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn record_query(query: &RecordQuery) -> Query {
    let mut params: Query = vec![
        ("select", RECORD_SELECT.to_string()),
        ("order", "created_at.desc".to_string()),
    ];
    if let Some(range) = query.range {
        params.push(("created_at", format!("gte.{}", stamp(range.start))));
        params.push(("created_at", format!("lte.{}", stamp(range.end))));
    }
    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }
    params
}

fn network_error(e: reqwest::Error) -> ShopError {
    ShopError::Database {
        reason: e.to_string(),
    }
}

fn header(value: &str, key: &str) -> Result<HeaderValue, ShopError> {
    HeaderValue::from_str(value).map_err(|e| ShopError::ConfigInvalid {
        section: "rest".into(),
        key: key.into(),
        reason: e.to_string(),
    })
}

impl RestAdapter {
    pub fn new(config: RestConfig) -> Result<Self, ShopError> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header(&config.anon_key, "anon_key")?);
        headers.insert(
            AUTHORIZATION,
            header(&format!("Bearer {}", config.anon_key), "anon_key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(network_error)?;

        info!(url = %config.url, "hosted store configured");
        Ok(Self {
            base_url: config.url,
            client,
        })
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ShopError> {
        Self::new(RestConfig::from_config(config)?)
    }

    fn table(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, ShopError> {
        let response = request.send().map_err(network_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let parsed: ApiErrorBody = serde_json::from_str(&body).unwrap_or_default();
        let message = match (parsed.code, parsed.message) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (None, Some(message)) => message,
            (Some(code), None) => code,
            (None, None) if body.is_empty() => status.to_string(),
            (None, None) => body,
        };
        warn!(status = status.as_u16(), %message, "store request failed");
        Err(ShopError::Api {
            status: status.as_u16(),
            message,
        })
    }

    fn rows<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Vec<T>, ShopError> {
        self.send(request)?.json::<Vec<T>>().map_err(|e| ShopError::Api {
            status: 200,
            message: format!("unexpected response body: {e}"),
        })
    }

    fn select<T: DeserializeOwned>(&self, table: &str, query: &Query) -> Result<Vec<T>, ShopError> {
        debug!(table, "select");
        self.rows(self.client.get(self.table(table)).query(query))
    }

    fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        mut query: Query,
    ) -> Result<Option<T>, ShopError> {
        query.push(("limit", "1".to_string()));
        Ok(self.select(table, &query)?.into_iter().next())
    }

    fn insert<B: Serialize, T: DeserializeOwned>(
        &self,
        entity: &'static str,
        table: &str,
        select: &str,
        body: &B,
    ) -> Result<T, ShopError> {
        debug!(table, "insert");
        let request = self
            .client
            .post(self.table(table))
            .query(&[("select", select)])
            .header("Prefer", "return=representation")
            .json(body);
        self.rows(request)?
            .into_iter()
            .next()
            .ok_or_else(|| ShopError::Api {
                status: 201,
                message: format!("{entity} insert returned no row"),
            })
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

impl StorePort for RestAdapter {
    fn list_brands(&self) -> Result<Vec<Brand>, ShopError> {
        let rows: Vec<BrandRow> = self.select(
            "brands",
            &vec![("select", "id,name".into()), ("order", "name.asc".into())],
        )?;
        Ok(rows.into_iter().map(Brand::from).collect())
    }

    fn find_brand_by_name(&self, name: &str) -> Result<Option<Brand>, ShopError> {
        let row: Option<BrandRow> = self.select_one(
            "brands",
            vec![
                ("select", "id,name".into()),
                ("name", format!("ilike.{}", name.trim())),
            ],
        )?;
        Ok(row.map(Brand::from))
    }

    fn insert_brand(&self, name: &str) -> Result<Brand, ShopError> {
        let row: BrandRow = self.insert(
            "brand",
            "brands",
            "id,name",
            &serde_json::json!({ "name": name.trim() }),
        )?;
        Ok(row.into())
    }

    fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, ShopError> {
        let order = match query.order {
            ProductOrder::Newest => "created_at.desc",
            ProductOrder::Model => "model.asc",
        };
        let mut params: Query = vec![("select", PRODUCT_SELECT.into()), ("order", order.into())];
        if let Some(brand_id) = query.brand_id {
            params.push(("brand_id", eq(brand_id)));
        }
        if query.in_stock_only {
            params.push(("quantity", "gt.0".into()));
        }
        let rows: Vec<ProductRow> = self.select("products", &params)?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    fn get_product(&self, id: Uuid) -> Result<Option<Product>, ShopError> {
        let row: Option<ProductRow> = self.select_one(
            "products",
            vec![("select", PRODUCT_SELECT.into()), ("id", eq(id))],
        )?;
        Ok(row.map(Product::from))
    }

    fn find_product(&self, brand_id: Uuid, model: &str) -> Result<Option<Product>, ShopError> {
        let row: Option<ProductRow> = self.select_one(
            "products",
            vec![
                ("select", PRODUCT_SELECT.into()),
                ("brand_id", eq(brand_id)),
                ("model", format!("ilike.{}", model.trim())),
            ],
        )?;
        Ok(row.map(Product::from))
    }

    fn insert_product(&self, product: &NewProduct) -> Result<Product, ShopError> {
        let row: ProductRow = self.insert(
            "product",
            "products",
            PRODUCT_SELECT,
            &ProductInsert {
                brand_id: product.brand_id,
                model: &product.model,
                description: product.description.as_deref(),
                unit_price: product.unit_price,
                quantity: 0,
                created_at: product.created_at,
                updated_at: product.created_at,
            },
        )?;
        Ok(row.into())
    }

    fn update_product(&self, id: Uuid, update: &ProductUpdate) -> Result<(), ShopError> {
        let request = self
            .client
            .patch(self.table("products"))
            .query(&[("id", eq(id)), ("select", "id".to_string())])
            .header("Prefer", "return=representation")
            .json(&ProductPatch {
                quantity: update.quantity,
                unit_price: update.unit_price,
                updated_at: update.updated_at,
            });
        let touched: Vec<serde_json::Value> = self.rows(request)?;
        if touched.is_empty() {
            return Err(ShopError::NotFound {
                entity: "product",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn delete_product(&self, id: Uuid) -> Result<(), ShopError> {
        let request = self
            .client
            .delete(self.table("products"))
            .query(&[("id", eq(id)), ("select", "id".to_string())])
            .header("Prefer", "return=representation");
        let deleted: Vec<serde_json::Value> = match self.rows(request) {
            Err(ShopError::Api { message, .. }) if message.starts_with(FOREIGN_KEY_VIOLATION) => {
                return Err(ShopError::ProductInUse {
                    product: id.to_string(),
                });
            }
            other => other?,
        };
        if deleted.is_empty() {
            return Err(ShopError::NotFound {
                entity: "product",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn insert_stock_entry(&self, entry: &NewStockEntry) -> Result<StockEntry, ShopError> {
        let row: StockEntryRow = self.insert(
            "stock entry",
            "stock_entries",
            "*",
            &serde_json::json!({
                "product_id": entry.product_id,
                "quantity": entry.quantity,
                "unit_price": entry.unit_price,
                "notes": entry.notes,
                "created_at": entry.created_at,
            }),
        )?;
        Ok(StockEntry {
            id: row.id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            notes: row.notes,
            created_at: row.created_at,
        })
    }

    fn list_sales(&self, query: &RecordQuery) -> Result<Vec<Sale>, ShopError> {
        let rows: Vec<SaleRow> = self.select("sales", &record_query(query))?;
        Ok(rows.into_iter().map(Sale::from).collect())
    }

    fn insert_sale(&self, sale: &NewSale) -> Result<Sale, ShopError> {
        let row: SaleRow = self.insert(
            "sale",
            "sales",
            RECORD_SELECT,
            &serde_json::json!({
                "product_id": sale.product_id,
                "quantity": sale.quantity,
                "unit_price": sale.unit_price,
                "total_price": sale.total_price,
                "notes": sale.notes,
                "created_at": sale.created_at,
            }),
        )?;
        Ok(row.into())
    }

    fn list_trades(&self, query: &RecordQuery) -> Result<Vec<Trade>, ShopError> {
        let rows: Vec<TradeRow> = self.select("trades", &record_query(query))?;
        Ok(rows.into_iter().map(Trade::from).collect())
    }

    fn insert_trade(&self, trade: &NewTrade) -> Result<Trade, ShopError> {
        let row: TradeRow = self.insert(
            "trade",
            "trades",
            RECORD_SELECT,
            &serde_json::json!({
                "client_phone_brand": trade.client_phone_brand,
                "client_phone_model": trade.client_phone_model,
                "client_phone_value": trade.client_phone_value,
                "client_phone_description": trade.client_phone_description,
                "shop_product_id": trade.shop_product_id,
                "shop_phone_price": trade.shop_phone_price,
                "shop_phone_description": trade.shop_phone_description,
                "client_complement": trade.client_complement,
                "trade_gain": trade.trade_gain,
                "notes": trade.notes,
                "created_at": trade.created_at,
            }),
        )?;
        Ok(row.into())
    }

    fn list_buybacks(&self, query: &RecordQuery) -> Result<Vec<Buyback>, ShopError> {
        let mut params = record_query(query);
        params[0] = ("select", "*".into());
        let rows: Vec<BuybackRow> = self.select("buybacks", &params)?;
        Ok(rows.into_iter().map(Buyback::from).collect())
    }

    fn insert_buyback(&self, buyback: &NewBuyback) -> Result<Buyback, ShopError> {
        let row: BuybackRow = self.insert(
            "buyback",
            "buybacks",
            "*",
            &serde_json::json!({
                "client_name": buyback.client_name,
                "brand_name": buyback.brand_name,
                "model": buyback.model,
                "description": buyback.description,
                "purchase_price": buyback.purchase_price,
                "notes": buyback.notes,
                "created_at": buyback.created_at,
            }),
        )?;
        Ok(row.into())
    }

    fn get_receipt(&self, date: NaiveDate) -> Result<Option<DailyReceipt>, ShopError> {
        let row: Option<ReceiptRow> = self.select_one(
            "daily_receipts",
            vec![("select", "*".into()), ("receipt_date", eq(date))],
        )?;
        Ok(row.map(DailyReceipt::from))
    }

    fn upsert_receipt(&self, receipt: &NewReceipt) -> Result<DailyReceipt, ShopError> {
        let request = self
            .client
            .post(self.table("daily_receipts"))
            .query(&[("on_conflict", "receipt_date"), ("select", "*")])
            .header("Prefer", "return=representation,resolution=merge-duplicates")
            .json(&serde_json::json!({
                "receipt_date": receipt.receipt_date,
                "total_amount": receipt.total_amount,
                "notes": receipt.notes,
                "created_at": receipt.created_at,
            }));
        let row: ReceiptRow = self
            .rows(request)?
            .into_iter()
            .next()
            .ok_or_else(|| ShopError::Api {
                status: 201,
                message: "receipt upsert returned no row".into(),
            })?;
        Ok(row.into())
    }

    fn list_receipts(
        &self,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Vec<DailyReceipt>, ShopError> {
        let rows: Vec<ReceiptRow> = self.select(
            "daily_receipts",
            &vec![
                ("select", "*".into()),
                ("receipt_date", format!("gte.{first}")),
                ("receipt_date", format!("lte.{last}")),
                ("order", "receipt_date.desc".into()),
            ],
        )?;
        Ok(rows.into_iter().map(DailyReceipt::from).collect())
    }
}
