//! Parameter bindings supplied per query execution.

use crate::model::value::Value;
use crate::repo::error::{RepoError, RepoResult};

/// Values for one execution of a compiled plan.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// Bound in placeholder order.
    Positional(Vec<Value>),
    /// Bound by placeholder name; only raw templates declare names.
    Named(Vec<(String, Value)>),
}

impl Default for Params {
    fn default() -> Self {
        Self::Positional(Vec::new())
    }
}

impl Params {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Named(
            pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Positional(values) => values.len(),
            Self::Named(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds positional [`Params`] from any values convertible into `Value`.
///
/// ```
/// use repokit_core::bindings;
/// let params = bindings!["AAA", 15];
/// assert_eq!(params.len(), 2);
/// ```
#[macro_export]
macro_rules! bindings {
    () => {
        $crate::query::Params::Positional(::std::vec::Vec::new())
    };
    ($($value:expr),+ $(,)?) => {
        $crate::query::Params::Positional(::std::vec![$($crate::model::value::Value::from($value)),+])
    };
}

/// Placeholder layout of a compiled plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSpec {
    Positional(usize),
    /// Distinct names in first-appearance order; name `i` binds slot `i + 1`.
    Named(Vec<String>),
}

impl ParamSpec {
    pub fn count(&self) -> usize {
        match self {
            Self::Positional(count) => *count,
            Self::Named(names) => names.len(),
        }
    }

    /// Orders `params` into slot order, rejecting any count or name mismatch.
    pub(crate) fn bind(&self, params: &Params) -> RepoResult<Vec<Value>> {
        let expected = self.count();
        if params.len() != expected {
            return Err(RepoError::ParameterMismatch {
                expected,
                actual: params.len(),
            });
        }

        match (self, params) {
            (_, Params::Positional(values)) => Ok(values.clone()),
            (Self::Positional(_), Params::Named(pairs)) => {
                let name = pairs
                    .first()
                    .map_or_else(String::new, |(name, _)| name.clone());
                Err(RepoError::MissingParameter(name))
            }
            (Self::Named(names), Params::Named(pairs)) => {
                if let Some((unknown, _)) = pairs.iter().find(|(name, _)| !names.contains(name)) {
                    return Err(RepoError::MissingParameter(unknown.clone()));
                }
                names
                    .iter()
                    .map(|name| {
                        pairs
                            .iter()
                            .find(|(candidate, _)| candidate == name)
                            .map(|(_, value)| value.clone())
                            .ok_or_else(|| RepoError::MissingParameter(name.clone()))
                    })
                    .collect()
            }
        }
    }
}
