//! Inventory: products, stock entries and the stock page operations.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use super::clock::ShopClock;
use super::error::ShopError;
use super::money::{checked_sum, out_of_range, Amount};
use crate::ports::store_port::StorePort;

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub brand_name: Option<String>,
    pub model: String,
    pub description: Option<String>,
    pub unit_price: Option<Amount>,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// `BRAND model`, or just the model when the brand is not loaded.
    pub fn label(&self) -> String {
        product_label(self.brand_name.as_deref(), &self.model)
    }

    /// `None` without a price or when the value does not fit in an [`Amount`].
    pub fn stock_value(&self) -> Option<Amount> {
        self.unit_price
            .and_then(|price| price.checked_mul(self.quantity))
    }

    /// Case-insensitive substring match on model or brand name.
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.model.to_lowercase().contains(&query)
            || self
                .brand_name
                .as_ref()
                .is_some_and(|b| b.to_lowercase().contains(&query))
    }
}

pub fn product_label(brand: Option<&str>, model: &str) -> String {
    match brand {
        Some(b) if !b.is_empty() => format!("{b} {model}"),
        _ => model.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub brand_id: Uuid,
    pub model: String,
    pub description: Option<String>,
    pub unit_price: Option<Amount>,
    pub created_at: DateTime<Utc>,
}

/// Manual correction of a product. `unit_price: None` clears the price.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductUpdate {
    pub quantity: Option<i64>,
    pub unit_price: Option<Amount>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockEntry {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub unit_price: Option<Amount>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStockEntry {
    pub product_id: Uuid,
    pub quantity: i64,
    pub unit_price: Option<Amount>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductOrder {
    #[default]
    Newest,
    Model,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub brand_id: Option<Uuid>,
    pub in_stock_only: bool,
    pub order: ProductOrder,
}

/// The "new product / stock entry" form.
#[derive(Debug, Clone)]
pub struct StockIntake {
    pub brand_id: Uuid,
    pub model: String,
    pub quantity: i64,
    pub unit_price: Option<Amount>,
    pub description: String,
}

impl StockIntake {
    pub fn validate(&self) -> Result<(), ShopError> {
        if self.model.trim().is_empty() {
            return Err(ShopError::required("model"));
        }
        if self.quantity < 1 {
            return Err(ShopError::validation("quantity", "must be at least 1"));
        }
        if self.description.trim().is_empty() {
            return Err(ShopError::required("description"));
        }
        if self.unit_price.is_some_and(|p| p < 0) {
            return Err(ShopError::validation("unit_price", "must not be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeOutcome {
    Created { product_id: Uuid },
    Restocked { product_id: Uuid },
}

impl IntakeOutcome {
    pub fn product_id(&self) -> Uuid {
        match self {
            IntakeOutcome::Created { product_id } | IntakeOutcome::Restocked { product_id } => {
                *product_id
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct StockView {
    pub products: Vec<Product>,
    pub total_units: i64,
    pub references: usize,
    pub valuation: Amount,
}

impl StockView {
    pub fn from_products(products: Vec<Product>) -> Result<Self, ShopError> {
        let total_units = checked_sum("total_units", products.iter().map(|p| p.quantity))?;
        let values = products
            .iter()
            .filter(|p| p.unit_price.is_some())
            .map(|p| p.stock_value().ok_or_else(|| out_of_range("valuation")))
            .collect::<Result<Vec<Amount>, ShopError>>()?;
        let valuation = checked_sum("valuation", values)?;
        let references = products.len();
        Ok(Self {
            products,
            total_units,
            references,
            valuation,
        })
    }
}

/// Find a product by brand and model (case-insensitive), creating it with
/// zero quantity when absent. Returns the product and whether it was created.
pub fn find_or_create_product(
    store: &dyn StorePort,
    brand_id: Uuid,
    model: &str,
    unit_price: Option<Amount>,
    description: Option<String>,
    now: DateTime<Utc>,
) -> Result<(Product, bool), ShopError> {
    let model = model.trim();
    if let Some(existing) = store.find_product(brand_id, model)? {
        return Ok((existing, false));
    }
    let created = store.insert_product(&NewProduct {
        brand_id,
        model: model.to_string(),
        description,
        unit_price,
        created_at: now,
    })?;
    Ok((created, true))
}

pub fn receive_stock(
    store: &dyn StorePort,
    clock: &ShopClock,
    intake: &StockIntake,
) -> Result<IntakeOutcome, ShopError> {
    intake.validate()?;
    let now = clock.now_utc();

    let (product, created) = find_or_create_product(
        store,
        intake.brand_id,
        &intake.model,
        intake.unit_price,
        Some(intake.description.trim().to_string()),
        now,
    )?;

    store.insert_stock_entry(&NewStockEntry {
        product_id: product.id,
        quantity: intake.quantity,
        unit_price: intake.unit_price,
        notes: None,
        created_at: now,
    })?;

    info!(
        product = %product.label(),
        quantity = intake.quantity,
        created,
        "stock received"
    );

    Ok(if created {
        IntakeOutcome::Created {
            product_id: product.id,
        }
    } else {
        IntakeOutcome::Restocked {
            product_id: product.id,
        }
    })
}

pub fn list_stock(
    store: &dyn StorePort,
    brand_id: Option<Uuid>,
    search: Option<&str>,
) -> Result<StockView, ShopError> {
    let products = store.list_products(&ProductQuery {
        brand_id,
        in_stock_only: false,
        order: ProductOrder::Newest,
    })?;
    let products = match search {
        Some(q) => products.into_iter().filter(|p| p.matches_search(q)).collect(),
        None => products,
    };
    StockView::from_products(products)
}

/// Products that can be sold or traded away, ordered by model.
pub fn sellable_products(
    store: &dyn StorePort,
    brand_id: Option<Uuid>,
) -> Result<Vec<Product>, ShopError> {
    store.list_products(&ProductQuery {
        brand_id,
        in_stock_only: true,
        order: ProductOrder::Model,
    })
}

pub fn require_product(store: &dyn StorePort, id: Uuid) -> Result<Product, ShopError> {
    store.get_product(id)?.ok_or_else(|| ShopError::NotFound {
        entity: "product",
        id: id.to_string(),
    })
}

pub fn edit_product(
    store: &dyn StorePort,
    clock: &ShopClock,
    id: Uuid,
    quantity: Option<i64>,
    unit_price: Option<Amount>,
) -> Result<Product, ShopError> {
    if quantity.is_some_and(|q| q < 0) {
        return Err(ShopError::validation("quantity", "must not be negative"));
    }
    if unit_price.is_some_and(|p| p < 0) {
        return Err(ShopError::validation("unit_price", "must not be negative"));
    }
    require_product(store, id)?;

    store.update_product(
        id,
        &ProductUpdate {
            quantity,
            unit_price,
            updated_at: clock.now_utc(),
        },
    )?;

    let updated = require_product(store, id)?;
    info!(product = %updated.label(), quantity = updated.quantity, "product updated");
    Ok(updated)
}

pub fn delete_product(store: &dyn StorePort, id: Uuid) -> Result<Product, ShopError> {
    let product = require_product(store, id)?;
    match store.delete_product(id) {
        Ok(()) => {
            info!(product = %product.label(), "product deleted");
            Ok(product)
        }
        Err(ShopError::ProductInUse { .. }) => Err(ShopError::ProductInUse {
            product: product.label(),
        }),
        Err(e) => Err(e),
    }
}
