//! Storage backend contract.
//!
//! # Responsibility
//! - Execute compiled plans and identity-keyed writes against one backend.
//!
//! # Invariants
//! - Bindings arrive already ordered by slot; stores never reorder them.
//! - Rows are returned in backend order, which is the plan's sort order.

use crate::model::meta::EntityMeta;
use crate::model::value::Value;
use crate::projection::Row;
use crate::query::bulk::BulkPlan;
use crate::query::plan::CompiledPlan;
use crate::repo::error::RepoResult;

mod sqlite;

pub use sqlite::SqliteStore;

/// Backend executing compiled plans.
pub trait Store {
    fn fetch(&self, plan: &CompiledPlan, values: Vec<Value>) -> RepoResult<Vec<Row>>;

    /// Number of rows `fetch` would return for the same plan and bindings.
    fn count(&self, plan: &CompiledPlan, values: Vec<Value>) -> RepoResult<u64>;

    /// Applies a bulk update and returns the number of affected rows.
    fn bulk_update(&self, plan: &BulkPlan, values: Vec<Value>) -> RepoResult<usize>;

    /// Inserts one row of attribute values and returns the assigned identity.
    fn insert(&self, meta: &'static EntityMeta, values: Vec<Value>) -> RepoResult<i64>;

    /// Overwrites every attribute of the row `id`; returns affected rows.
    fn update(&self, meta: &'static EntityMeta, id: i64, values: Vec<Value>) -> RepoResult<usize>;

    /// Deletes the row `id`; returns affected rows.
    fn delete(&self, meta: &'static EntityMeta, id: i64) -> RepoResult<usize>;
}
