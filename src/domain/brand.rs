//! Phone brands.

use tracing::info;
use uuid::Uuid;

use super::error::ShopError;
use crate::ports::store_port::StorePort;

/// Brands seeded into a fresh local store.
pub const DEFAULT_BRANDS: [&str; 8] = [
    "ITEL",
    "TECNO",
    "INFINIX",
    "SAMSUNG",
    "APPLE",
    "REDMI",
    "GOOGLE PIXEL",
    "AUTRE",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Brand {
    pub id: Uuid,
    pub name: String,
}

/// Resolve a brand by name, case-insensitively.
pub fn resolve_brand(store: &dyn StorePort, name: &str) -> Result<Brand, ShopError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ShopError::required("brand"));
    }
    store
        .find_brand_by_name(name)?
        .ok_or_else(|| ShopError::NotFound {
            entity: "brand",
            id: name.to_string(),
        })
}

pub fn add_brand(store: &dyn StorePort, name: &str) -> Result<Brand, ShopError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ShopError::required("brand"));
    }
    if let Some(existing) = store.find_brand_by_name(name)? {
        return Err(ShopError::validation(
            "brand",
            format!("'{}' already exists", existing.name),
        ));
    }
    let brand = store.insert_brand(name)?;
    info!(brand = %brand.name, "brand added");
    Ok(brand)
}
