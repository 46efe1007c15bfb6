//! Buybacks (rachat): the shop buys a customer's phone outright and puts it
//! into stock.

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::clock::ShopClock;
use super::error::ShopError;
use super::money::Amount;
use super::sales::RECENT_LIMIT;
use super::stock::{find_or_create_product, NewStockEntry};
use crate::ports::store_port::{RecordQuery, StorePort};

#[derive(Debug, Clone, PartialEq)]
pub struct Buyback {
    pub id: Uuid,
    pub client_name: Option<String>,
    pub brand_name: String,
    pub model: String,
    pub description: Option<String>,
    pub purchase_price: Amount,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBuyback {
    pub client_name: Option<String>,
    pub brand_name: String,
    pub model: String,
    pub description: Option<String>,
    pub purchase_price: Amount,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct BuybackForm {
    pub client_name: Option<String>,
    pub brand_name: String,
    pub model: String,
    pub description: Option<String>,
    pub purchase_price: Option<Amount>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BuybackOutcome {
    pub buyback: Buyback,
    /// The product the phone was stocked under, `None` when the brand is unknown.
    pub stocked_product: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct BuybacksView {
    pub buybacks: Vec<Buyback>,
    pub total_spent: Amount,
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn stock_entry_note(client_name: Option<&str>) -> String {
    match client_name {
        Some(name) => format!("Rachat client — {name}"),
        None => "Rachat client".to_string(),
    }
}

pub fn record_buyback(
    store: &dyn StorePort,
    clock: &ShopClock,
    form: &BuybackForm,
) -> Result<BuybackOutcome, ShopError> {
    let brand_name = form.brand_name.trim();
    if brand_name.is_empty() {
        return Err(ShopError::required("brand"));
    }
    let model = form.model.trim();
    if model.is_empty() {
        return Err(ShopError::required("model"));
    }
    let price = form
        .purchase_price
        .ok_or_else(|| ShopError::required("purchase_price"))?;
    if price <= 0 {
        return Err(ShopError::validation("purchase_price", "must be positive"));
    }

    let now = clock.now_utc();
    let client_name = trimmed(&form.client_name);
    let description = trimmed(&form.description);

    let buyback = store.insert_buyback(&NewBuyback {
        client_name: client_name.clone(),
        brand_name: brand_name.to_string(),
        model: model.to_string(),
        description: description.clone(),
        purchase_price: price,
        notes: trimmed(&form.notes),
        created_at: now,
    })?;

    let Some(brand) = store.find_brand_by_name(brand_name)? else {
        warn!(brand = brand_name, model, "buyback recorded but brand unknown, phone not stocked");
        return Ok(BuybackOutcome {
            buyback,
            stocked_product: None,
        });
    };

    let product_description = description.unwrap_or_else(|| {
        format!("Racheté le {}", clock.today().format("%d/%m/%Y"))
    });
    let (product, _) = find_or_create_product(
        store,
        brand.id,
        model,
        Some(price),
        Some(product_description),
        now,
    )?;

    store.insert_stock_entry(&NewStockEntry {
        product_id: product.id,
        quantity: 1,
        unit_price: Some(price),
        notes: Some(stock_entry_note(client_name.as_deref())),
        created_at: now,
    })?;

    info!(
        product = %product.label(),
        price,
        "buyback recorded and phone stocked"
    );

    Ok(BuybackOutcome {
        buyback,
        stocked_product: Some(product.id),
    })
}

pub fn list_buybacks(store: &dyn StorePort) -> Result<BuybacksView, ShopError> {
    let buybacks = store.list_buybacks(&RecordQuery::recent(RECENT_LIMIT))?;
    let total_spent = buybacks.iter().map(|b| b.purchase_price).sum();
    Ok(BuybacksView {
        buybacks,
        total_spent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_mentions_client_when_known() {
        assert_eq!(stock_entry_note(Some("Awa")), "Rachat client — Awa");
        assert_eq!(stock_entry_note(None), "Rachat client");
    }
}
