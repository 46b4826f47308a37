use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid fixture: {0}")]
    Fixture(String),

    #[error("unknown fixture object: {0}")]
    UnknownObject(i64),

    #[error("no virtual property {class}.{field}")]
    UnknownVirtual { class: String, field: String },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog error: {0}")]
    Catalog(#[from] lexo_meta::CatalogError),

    #[error("store error: {0}")]
    Store(#[from] lexo_store::StoreError),

    #[error("cache error: {0}")]
    Cache(#[from] lexo_cache::CacheError),

    #[error("virtual property error: {0}")]
    Virtual(#[from] lexo_virtual::VirtualError),
}

pub type SdkResult<T> = Result<T, SdkError>;
