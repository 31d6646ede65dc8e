//! Zero-driver data access abstractions, grounded in
//! `r2e-data/src/lib.rs`'s "zero database driver dependencies"
//! philosophy: this crate defines `Entity`/`Repository`/`Page`/
//! `Pageable`/`DataError` and nothing more. Concrete backends (SQL,
//! key-value, object storage) are a separate crate's problem and are
//! out of scope here (spec Non-goals: "DAL is trait-only").

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// A record with a stable identifier, storable through a [`Repository`].
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    type Id: ToString + Send + Sync + Clone;

    fn id(&self) -> Self::Id;
}

/// Failure modes a concrete `Repository` implementation maps its own
/// errors into.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("entity not found: {0}")]
    NotFound(String),
    #[error("entity already exists: {0}")]
    Duplicate(String),
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<DataError> for taskwire_core::error::TaskError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::NotFound(m) => taskwire_core::error::TaskError::NotFound(m),
            DataError::Duplicate(m) => taskwire_core::error::TaskError::Duplicate(m),
            DataError::Backend(m) => taskwire_core::error::TaskError::ExternalError(m),
        }
    }
}

/// A single page of a larger result set.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Pagination request parameters.
#[derive(Debug, Clone, Copy)]
pub struct Pageable {
    pub page: u32,
    pub page_size: u32,
}

impl Pageable {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size: page_size.max(1) }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64) * (self.page_size as u64)
    }
}

impl Default for Pageable {
    fn default() -> Self {
        Self { page: 0, page_size: 20 }
    }
}

/// Driver-agnostic CRUD surface a handler depends on, implemented by a
/// separate crate per concrete backend (spec Non-goals: no SQL/NoSQL
/// driver ships here).
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    async fn get(&self, id: &E::Id) -> Result<E, DataError>;
    async fn list(&self, page: Pageable) -> Result<Page<E>, DataError>;
    async fn create(&self, entity: E) -> Result<E, DataError>;
    async fn update(&self, entity: E) -> Result<E, DataError>;
    async fn delete(&self, id: &E::Id) -> Result<(), DataError>;
}

/// Minimal key-value surface for session-adjacent or cache-adjacent
/// state that a handler wants durable rather than in-process (spec
/// Non-goals: no concrete cache/KV driver ships here either).
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, DataError>;
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), DataError>;
    async fn delete(&self, key: &str) -> Result<(), DataError>;
}
