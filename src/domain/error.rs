//! Domain error types.

/// Top-level error type for esstore.
#[derive(Debug, thiserror::Error)]
pub enum ShopError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("store API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("insufficient stock for {product}: {available} available, {requested} requested")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    #[error("product {product} is referenced by existing sales or trades")]
    ProductInUse { product: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ShopError {
    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        ShopError::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn required(field: &str) -> Self {
        Self::validation(field, "is required")
    }
}

impl From<&ShopError> for std::process::ExitCode {
    fn from(err: &ShopError) -> Self {
        let code: u8 = match err {
            ShopError::Io(_) => 1,
            ShopError::ConfigParse { .. }
            | ShopError::ConfigMissing { .. }
            | ShopError::ConfigInvalid { .. } => 2,
            ShopError::Database { .. }
            | ShopError::DatabaseQuery { .. }
            | ShopError::Api { .. } => 3,
            ShopError::Validation { .. }
            | ShopError::NotFound { .. }
            | ShopError::InsufficientStock { .. }
            | ShopError::ProductInUse { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
