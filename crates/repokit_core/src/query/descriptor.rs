//! Declarative query descriptors.
//!
//! A descriptor is plain data: criteria grouped into conjunctions, an
//! optional static sort, an optional top-N limit and an optional projection.
//! `and` extends the current conjunction; `or` opens a new one, so the
//! predicate is an OR of ANDs evaluated in declaration order.

use crate::query::operator::Operator;
use crate::query::sort::{Order, Sort};
use crate::repo::error::RepoResult;

/// One `path operator ?` comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    pub path: String,
    pub operator: Operator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    groups: Vec<Vec<Criterion>>,
    sort: Sort,
    limit: Option<u64>,
    selection: Option<Vec<String>>,
}

impl Default for QueryDescriptor {
    fn default() -> Self {
        Self {
            groups: vec![Vec::new()],
            sort: Sort::unsorted(),
            limit: None,
            selection: None,
        }
    }
}

impl QueryDescriptor {
    /// Descriptor matching every row.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, path: impl Into<String>, operator: Operator) -> Self {
        let criterion = Criterion {
            path: path.into(),
            operator,
        };
        match self.groups.last_mut() {
            Some(group) => group.push(criterion),
            None => self.groups.push(vec![criterion]),
        }
        self
    }

    /// Like [`Self::and`], with the operator given as a keyword.
    pub fn and_keyword(self, path: impl Into<String>, keyword: &str) -> RepoResult<Self> {
        let operator = Operator::from_keyword(keyword)?;
        Ok(self.and(path, operator))
    }

    /// Starts a new conjunction group with this criterion.
    pub fn or(mut self, path: impl Into<String>, operator: Operator) -> Self {
        let criterion = Criterion {
            path: path.into(),
            operator,
        };
        match self.groups.last_mut() {
            Some(group) if group.is_empty() => group.push(criterion),
            _ => self.groups.push(vec![criterion]),
        }
        self
    }

    pub fn order_by(mut self, order: Order) -> Self {
        self.sort = self.sort.and(order);
        self
    }

    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Caps the result at the first `limit` rows (`findTop3By...`).
    pub fn top(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Selects attribute paths instead of the full entity row.
    pub fn select<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.selection = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Non-empty conjunction groups in declaration order.
    pub fn groups(&self) -> impl Iterator<Item = &[Criterion]> {
        self.groups
            .iter()
            .filter(|group| !group.is_empty())
            .map(Vec::as_slice)
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn selection(&self) -> Option<&[String]> {
        self.selection.as_deref()
    }
}
