//! Concrete adapter implementations for ports.

#[cfg(feature = "postgres")]
pub mod postgres_adapter;
#[cfg(feature = "rest")]
pub mod rest_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
pub mod csv_adapter;
pub mod file_config_adapter;

use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::domain::error::ShopError;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;

/// `[store] backend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Rest,
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "rest" | "supabase" => Ok(Self::Rest),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(ShopError::ConfigInvalid {
                section: "store".into(),
                key: "backend".into(),
                reason: format!("unknown backend '{other}' (expected sqlite, rest or postgres)"),
            }),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sqlite => "sqlite",
            Self::Rest => "rest",
            Self::Postgres => "postgres",
        })
    }
}

impl StoreBackend {
    /// Defaults to SQLite when `[store] backend` is absent.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ShopError> {
        config
            .get_non_empty("store", "backend")
            .map_or(Ok(Self::Sqlite), |b| b.parse())
    }
}

fn not_compiled(backend: StoreBackend) -> ShopError {
    ShopError::ConfigInvalid {
        section: "store".into(),
        key: "backend".into(),
        reason: format!("esstore was built without the '{backend}' feature"),
    }
}

/// Open the configured store. A local SQLite store gets its schema created
/// on first use.
pub fn open_store(config: &dyn ConfigPort) -> Result<Box<dyn StorePort>, ShopError> {
    let backend = StoreBackend::from_config(config)?;
    info!(%backend, "opening store");

    match backend {
        #[cfg(feature = "sqlite")]
        StoreBackend::Sqlite => {
            let store = sqlite_adapter::SqliteAdapter::from_config(config)?;
            store.initialize_schema()?;
            Ok(Box::new(store))
        }
        #[cfg(feature = "rest")]
        StoreBackend::Rest => Ok(Box::new(rest_adapter::RestAdapter::from_config(config)?)),
        #[cfg(feature = "postgres")]
        StoreBackend::Postgres => Ok(Box::new(postgres_adapter::PostgresAdapter::from_config(
            config,
        )?)),
        #[allow(unreachable_patterns)]
        other => Err(not_compiled(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    #[test]
    fn backend_names() {
        assert_eq!("SQLite".parse::<StoreBackend>().unwrap(), StoreBackend::Sqlite);
        assert_eq!("supabase".parse::<StoreBackend>().unwrap(), StoreBackend::Rest);
        assert_eq!("postgresql".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert!("mysql".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn backend_defaults_to_sqlite() {
        let config = FileConfigAdapter::from_string("[shop]\nname = X\n").unwrap();
        assert_eq!(
            StoreBackend::from_config(&config).unwrap(),
            StoreBackend::Sqlite
        );
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn open_store_creates_sqlite_schema() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = dir.path().join("shop.db");
        let config = FileConfigAdapter::from_string(&format!(
            "[store]\nbackend = sqlite\n[sqlite]\npath = {}\n",
            db.display()
        ))
        .unwrap();

        let store = open_store(&config).unwrap();
        assert!(!store.list_brands().unwrap().is_empty());
    }
}
