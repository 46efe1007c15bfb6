//! Trade-ins (troc): the customer hands over a phone, takes a shop phone and
//! pays a complement.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use super::error::ShopError;
use super::clock::ShopClock;
use super::money::{checked_sum, out_of_range, Amount};
use super::sales::RECENT_LIMIT;
use super::stock::require_product;
use crate::ports::store_port::{RecordQuery, StorePort};

/// Shop gain on a trade: what the shop receives (cash complement plus the
/// estimated value of the customer's phone) minus the price of the phone it
/// gives away. `None` when the result does not fit in an [`Amount`].
pub fn trade_gain(
    complement: Amount,
    client_value: Option<Amount>,
    shop_price: Amount,
) -> Option<Amount> {
    complement
        .checked_add(client_value.unwrap_or(0))?
        .checked_sub(shop_price)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub id: Uuid,
    pub client_phone_brand: String,
    pub client_phone_model: String,
    pub client_phone_value: Option<Amount>,
    pub client_phone_description: Option<String>,
    pub shop_product_id: Uuid,
    pub shop_product_label: Option<String>,
    pub shop_phone_price: Amount,
    pub shop_phone_description: Option<String>,
    pub client_complement: Amount,
    pub trade_gain: Amount,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Trade {
    pub fn client_phone_label(&self) -> String {
        format!("{} {}", self.client_phone_brand, self.client_phone_model)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTrade {
    pub client_phone_brand: String,
    pub client_phone_model: String,
    pub client_phone_value: Option<Amount>,
    pub client_phone_description: Option<String>,
    pub shop_product_id: Uuid,
    pub shop_phone_price: Amount,
    pub shop_phone_description: Option<String>,
    pub client_complement: Amount,
    pub trade_gain: Amount,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct TradeForm {
    pub client_brand: String,
    pub client_model: String,
    pub client_value: Option<Amount>,
    pub client_description: Option<String>,
    pub shop_product_id: Option<Uuid>,
    /// Defaults to the shop product's unit price.
    pub shop_price: Option<Amount>,
    pub shop_description: Option<String>,
    pub complement: Option<Amount>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TradesView {
    pub trades: Vec<Trade>,
    pub total_gain: Amount,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn record_trade(
    store: &dyn StorePort,
    clock: &ShopClock,
    form: &TradeForm,
) -> Result<Trade, ShopError> {
    let client_brand = form.client_brand.trim();
    if client_brand.is_empty() {
        return Err(ShopError::required("client_brand"));
    }
    let client_model = form.client_model.trim();
    if client_model.is_empty() {
        return Err(ShopError::required("client_model"));
    }
    let shop_product_id = form
        .shop_product_id
        .ok_or_else(|| ShopError::required("shop_product"))?;

    let product = require_product(store, shop_product_id)?;
    if product.quantity < 1 {
        return Err(ShopError::InsufficientStock {
            product: product.label(),
            available: product.quantity,
            requested: 1,
        });
    }

    let shop_price = form
        .shop_price
        .or(product.unit_price)
        .ok_or_else(|| ShopError::required("shop_price"))?;
    let complement = form.complement.unwrap_or(0);
    for (field, value) in [
        ("shop_price", Some(shop_price)),
        ("complement", Some(complement)),
        ("client_value", form.client_value),
    ] {
        if value.is_some_and(|v| v < 0) {
            return Err(ShopError::validation(field, "must not be negative"));
        }
    }

    let gain = trade_gain(complement, form.client_value, shop_price)
        .ok_or_else(|| out_of_range("trade_gain"))?;

    let trade = store.insert_trade(&NewTrade {
        client_phone_brand: client_brand.to_string(),
        client_phone_model: client_model.to_string(),
        client_phone_value: form.client_value,
        client_phone_description: non_blank(&form.client_description),
        shop_product_id,
        shop_phone_price: shop_price,
        shop_phone_description: non_blank(&form.shop_description),
        client_complement: complement,
        trade_gain: gain,
        notes: non_blank(&form.notes),
        created_at: clock.now_utc(),
    })?;

    info!(
        client_phone = %trade.client_phone_label(),
        shop_phone = %product.label(),
        complement,
        gain,
        "trade recorded"
    );
    Ok(trade)
}

pub fn list_trades(store: &dyn StorePort) -> Result<TradesView, ShopError> {
    let trades = store.list_trades(&RecordQuery::recent(RECENT_LIMIT))?;
    let total_gain = checked_sum("total_gain", trades.iter().map(|t| t.trade_gain))?;
    Ok(TradesView { trades, total_gain })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn gain_from_complement_and_estimate() {
        assert_eq!(trade_gain(20_000, Some(45_000), 60_000), Some(5_000));
    }

    #[test]
    fn gain_without_estimate_counts_zero() {
        assert_eq!(trade_gain(30_000, None, 60_000), Some(-30_000));
    }

    #[test]
    fn gain_can_be_negative() {
        assert_eq!(trade_gain(0, Some(40_000), 75_000), Some(-35_000));
    }

    #[test]
    fn gain_overflow_is_none() {
        assert_eq!(trade_gain(10, Some(Amount::MAX), 0), None);
        assert_eq!(trade_gain(0, None, Amount::MIN), None);
    }

    #[test]
    fn client_label_joins_brand_and_model() {
        let trade = Trade {
            id: Uuid::nil(),
            client_phone_brand: "SAMSUNG".into(),
            client_phone_model: "A14".into(),
            client_phone_value: None,
            client_phone_description: None,
            shop_product_id: Uuid::nil(),
            shop_product_label: None,
            shop_phone_price: 0,
            shop_phone_description: None,
            client_complement: 0,
            trade_gain: 0,
            notes: None,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        };
        assert_eq!(trade.client_phone_label(), "SAMSUNG A14");
    }

    proptest! {
        #[test]
        fn raising_complement_raises_gain_one_for_one(
            complement in 0i64..10_000_000,
            value in proptest::option::of(0i64..10_000_000),
            price in 0i64..10_000_000,
            extra in 0i64..1_000_000,
        ) {
            prop_assert_eq!(
                trade_gain(complement + extra, value, price).unwrap()
                    - trade_gain(complement, value, price).unwrap(),
                extra
            );
        }
    }
}
