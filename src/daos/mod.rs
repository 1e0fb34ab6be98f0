//! Persistence collaborators.
//!
//! The service layer only sees the `Dao` trait. `PgDao` talks to Postgres
//! through sqlx; `MemoryDao` keeps rows in process for tests and for running
//! the API without a database.

pub mod memory;
pub mod postgres;

pub use memory::MemoryDao;
pub use postgres::PgDao;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::Token;
use crate::error::AppError;
use crate::models::{Resource, GENERATED_COLUMNS};
use crate::pipeline::{ParentIds, QueryParams};

/// One page of list results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub rows: Vec<T>,
    /// Total number of matching rows across all pages.
    pub count: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Storage operations for one resource.
///
/// `update`, `patch` and `delete` return the number of affected rows; the
/// service turns zero into a not-found failure.
#[async_trait]
pub trait Dao<R: Resource>: Send + Sync {
    async fn list(
        &self,
        token: &Token,
        parent_ids: Option<&ParentIds>,
        params: &QueryParams,
    ) -> Result<PagedResult<R::Ws>, AppError>;

    async fn get(
        &self,
        token: &Token,
        parent_ids: Option<&ParentIds>,
        params: &QueryParams,
    ) -> Result<Option<R::Ws>, AppError>;

    async fn create(
        &self,
        token: &Token,
        parent_ids: Option<&ParentIds>,
        ws: &R::Ws,
    ) -> Result<R::Ws, AppError>;

    async fn update(
        &self,
        token: &Token,
        parent_ids: Option<&ParentIds>,
        id: i64,
        ws: &R::Ws,
    ) -> Result<u64, AppError>;

    async fn patch(
        &self,
        token: &Token,
        parent_ids: Option<&ParentIds>,
        id: i64,
        ws: &R::Ws,
    ) -> Result<u64, AppError>;

    async fn delete(
        &self,
        token: &Token,
        parent_ids: Option<&ParentIds>,
        id: i64,
    ) -> Result<u64, AppError>;
}

/// Serializes a WS into its JSON object, keeping only storable columns.
pub(crate) fn ws_object<R: Resource>(ws: &R::Ws) -> Result<Map<String, Value>, AppError> {
    match serde_json::to_value(ws) {
        Ok(Value::Object(object)) => Ok(object
            .into_iter()
            .filter(|(key, _)| {
                R::COLUMNS.contains(&key.as_str()) && !GENERATED_COLUMNS.contains(&key.as_str())
            })
            .collect()),
        Ok(_) => Err(AppError::InternalServerError(format!(
            "{} did not serialize to an object",
            R::NAME
        ))),
        Err(e) => Err(AppError::InternalServerError(e.to_string())),
    }
}

/// Only the keys a patch may touch.
pub(crate) fn patchable(object: Map<String, Value>, updatable: &[&str]) -> Map<String, Value> {
    object
        .into_iter()
        .filter(|(key, _)| updatable.contains(&key.as_str()))
        .collect()
}

pub(crate) fn row_to_ws<R: Resource>(row: Value) -> Result<R::Ws, AppError> {
    serde_json::from_value(row).map_err(|e| {
        AppError::InternalServerError(format!("Stored {} row is malformed: {}", R::NAME, e))
    })
}
