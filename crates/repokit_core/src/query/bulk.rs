//! Bulk update declarations.
//!
//! A bulk update applies one `SET` list to every row matching a descriptor
//! filter in a single statement. Bindings are consumed assignments first,
//! then filter criteria, in declaration order.

use crate::model::meta::{Attribute, EntityMeta};
use crate::model::value::{Value, ValueKind};
use crate::query::compile::compile_predicate;
use crate::query::descriptor::QueryDescriptor;
use crate::query::params::{ParamSpec, Params};
use crate::query::plan::{resolve_path, Predicate};
use crate::repo::error::{RepoError, RepoResult};
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `column = ?`
    Set,
    /// `column = column + ?`
    Increment,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BulkUpdate {
    assignments: Vec<(String, AssignOp)>,
    filter: QueryDescriptor,
}

impl BulkUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: impl Into<String>) -> Self {
        self.assignments.push((path.into(), AssignOp::Set));
        self
    }

    pub fn increment(mut self, path: impl Into<String>) -> Self {
        self.assignments.push((path.into(), AssignOp::Increment));
        self
    }

    /// Restricts the update to rows matching `filter`; sort, limit and
    /// projection on the descriptor are ignored.
    pub fn filter(mut self, filter: QueryDescriptor) -> Self {
        self.filter = filter;
        self
    }
}

/// Compiled form of a [`BulkUpdate`].
#[derive(Debug, Clone)]
pub struct BulkPlan {
    name: String,
    target: &'static EntityMeta,
    assignments: Vec<(&'static Attribute, AssignOp)>,
    predicate: Option<Predicate>,
    params: ParamSpec,
}

impl BulkPlan {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &'static EntityMeta {
        self.target
    }

    pub fn assignments(&self) -> &[(&'static Attribute, AssignOp)] {
        &self.assignments
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    pub fn params(&self) -> &ParamSpec {
        &self.params
    }

    pub fn bind(&self, params: &Params) -> RepoResult<Vec<Value>> {
        self.params.bind(params)
    }
}

/// Compiles a bulk update against `target`.
///
/// Only local, non-identity attributes may be assigned. `Increment` needs a
/// numeric attribute.
pub fn compile_bulk(
    name: &str,
    target: &'static EntityMeta,
    update: &BulkUpdate,
) -> RepoResult<BulkPlan> {
    if update.assignments.is_empty() {
        return Err(RepoError::InvalidQuery(format!(
            "bulk update `{name}` assigns nothing"
        )));
    }

    let mut assignments = Vec::with_capacity(update.assignments.len());
    for (path, op) in &update.assignments {
        let resolved = resolve_path(target, path)?;
        if resolved.relation.is_some() || std::ptr::eq(resolved.attribute, &target.id) {
            return Err(RepoError::InvalidQuery(format!(
                "bulk update `{name}` cannot assign `{path}`"
            )));
        }
        if *op == AssignOp::Increment && resolved.attribute.kind == ValueKind::Text {
            return Err(RepoError::UnsupportedOperator {
                operator: "Increment".to_string(),
                reason: format!("`{path}` is a text attribute"),
            });
        }
        assignments.push((resolved.attribute, *op));
    }

    let mut next_slot = assignments.len();
    let predicate = compile_predicate(target, &update.filter, &mut next_slot)?;

    debug!(
        "event=plan_compile module=query status=ok plan={name} kind=bulk params={next_slot}"
    );

    Ok(BulkPlan {
        name: name.to_string(),
        target,
        assignments,
        predicate,
        params: ParamSpec::Positional(next_slot),
    })
}
