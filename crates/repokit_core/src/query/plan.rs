//! Compiled, immutable query plans.
//!
//! # Invariants
//! - A plan never holds bound values; every execution supplies fresh ones.
//! - Sort keys and selected paths are resolved at compile time.
//! - Deriving a paged or re-sorted plan never mutates the original.

use crate::model::meta::{EntityMeta, ResolvedPath};
use crate::model::value::Value;
use crate::query::operator::Operator;
use crate::query::params::{ParamSpec, Params};
use crate::query::sort::{Direction, Sort};
use crate::repo::error::{RepoError, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;

static RESULT_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid result column regex"));

/// Predicate tree over resolved attribute paths.
///
/// `slot` is the index of the first binding consumed by a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        path: ResolvedPath,
        operator: Operator,
        slot: usize,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub(crate) fn visit_paths<'a>(&'a self, visit: &mut impl FnMut(&'a ResolvedPath)) {
        match self {
            Self::Compare { path, .. } => visit(path),
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.visit_paths(visit);
                }
            }
        }
    }
}

/// Sort key of a compiled plan.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Path(ResolvedPath),
    /// Output column of a raw template, validated as a bare identifier.
    Column(String),
}

#[derive(Debug, Clone)]
pub(crate) enum PlanSource {
    Derived {
        predicate: Option<Predicate>,
        selection: Vec<ResolvedPath>,
    },
    Raw {
        sql: String,
    },
}

#[derive(Debug, Clone)]
pub struct CompiledPlan {
    name: String,
    target: &'static EntityMeta,
    pub(crate) source: PlanSource,
    sort: Vec<(SortKey, Direction)>,
    limit: Option<u64>,
    offset: Option<u64>,
    params: ParamSpec,
}

impl CompiledPlan {
    pub(crate) fn derived(
        name: &str,
        target: &'static EntityMeta,
        predicate: Option<Predicate>,
        selection: Vec<ResolvedPath>,
        sort: Vec<(SortKey, Direction)>,
        limit: Option<u64>,
        param_count: usize,
    ) -> Self {
        Self {
            name: name.to_string(),
            target,
            source: PlanSource::Derived {
                predicate,
                selection,
            },
            sort,
            limit,
            offset: None,
            params: ParamSpec::Positional(param_count),
        }
    }

    pub(crate) fn raw(
        name: &str,
        target: &'static EntityMeta,
        sql: String,
        params: ParamSpec,
    ) -> Self {
        Self {
            name: name.to_string(),
            target,
            source: PlanSource::Raw { sql },
            sort: Vec::new(),
            limit: None,
            offset: None,
            params,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &'static EntityMeta {
        self.target
    }

    pub fn params(&self) -> &ParamSpec {
        &self.params
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn sort_keys(&self) -> &[(SortKey, Direction)] {
        &self.sort
    }

    pub fn is_raw(&self) -> bool {
        matches!(self.source, PlanSource::Raw { .. })
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        match &self.source {
            PlanSource::Derived { predicate, .. } => predicate.as_ref(),
            PlanSource::Raw { .. } => None,
        }
    }

    /// Selected column count, known up front for derived plans only.
    pub fn column_count(&self) -> Option<usize> {
        match &self.source {
            PlanSource::Derived { selection, .. } => Some(selection.len()),
            PlanSource::Raw { .. } => None,
        }
    }

    /// Orders `params` into slot order; fails before any store round-trip.
    pub fn bind(&self, params: &Params) -> RepoResult<Vec<Value>> {
        self.params.bind(params)
    }

    /// Appends `sort` after the plan's static sort keys.
    ///
    /// Derived plans resolve each property against the target entity; raw
    /// plans accept bare result-column identifiers only.
    pub fn with_sort(&self, sort: &Sort) -> RepoResult<Self> {
        let mut plan = self.clone();
        for order in sort.orders() {
            let key = match &self.source {
                PlanSource::Derived { .. } => SortKey::Path(resolve_path(self.target, &order.property)?),
                PlanSource::Raw { .. } => {
                    if !RESULT_COLUMN.is_match(&order.property) {
                        return Err(unknown_attribute(self.target, &order.property));
                    }
                    SortKey::Column(order.property.clone())
                }
            };
            plan.sort.push((key, order.direction));
        }
        Ok(plan)
    }

    /// Restricts execution to `limit` rows starting at `offset`.
    ///
    /// A static top-N limit still caps the window: rows at or past the cap
    /// are never returned, whatever the offset.
    pub fn with_window(&self, limit: Option<u64>, offset: u64) -> Self {
        let mut plan = self.clone();
        plan.limit = match self.limit {
            Some(cap) => {
                let remaining = cap.saturating_sub(offset);
                Some(limit.map_or(remaining, |requested| requested.min(remaining)))
            }
            None => limit,
        };
        plan.offset = (offset > 0).then_some(offset);
        plan
    }

    pub(crate) fn is_windowed(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }
}

pub(crate) fn resolve_path(target: &'static EntityMeta, path: &str) -> RepoResult<ResolvedPath> {
    target
        .resolve(path)
        .ok_or_else(|| unknown_attribute(target, path))
}

pub(crate) fn unknown_attribute(target: &'static EntityMeta, path: &str) -> RepoError {
    RepoError::UnknownAttribute {
        entity: target.name,
        path: path.to_string(),
    }
}
