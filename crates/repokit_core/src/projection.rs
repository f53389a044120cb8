//! Row materialization into entities and projection shapes.
//!
//! # Responsibility
//! - Carry ordered column values returned by the store.
//! - Convert rows one-to-one into any [`FromRow`] shape.
//!
//! # Invariants
//! - A row is only mapped when its width equals the target `ARITY`.
//! - Conversion failures surface as `InvalidData`, never as silent defaults.

use crate::model::value::Value;
use crate::repo::error::{RepoError, RepoResult};

/// Ordered, typed column values of one result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consumes the row into a sequential column reader.
    pub fn columns(self) -> Columns {
        Columns {
            inner: self.values.into_iter(),
            position: 0,
        }
    }
}

/// Sequential reader over one row's columns.
pub struct Columns {
    inner: std::vec::IntoIter<Value>,
    position: usize,
}

impl Columns {
    /// Reads and converts the next column.
    pub fn next_value<T: FromValue>(&mut self) -> RepoResult<T> {
        let position = self.position;
        self.position += 1;
        let value = self.inner.next().ok_or_else(|| {
            RepoError::InvalidData(format!("row has no column at position {position}"))
        })?;
        T::from_value(value).map_err(|err| match err {
            RepoError::InvalidData(message) => {
                RepoError::InvalidData(format!("column {position}: {message}"))
            }
            other => other,
        })
    }
}

/// Conversion from one column value.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> RepoResult<Self>;
}

/// Conversion from one full row; `ARITY` is the expected column count.
pub trait FromRow: Sized {
    const ARITY: usize;

    fn from_row(row: Row) -> RepoResult<Self>;
}

/// Maps rows into `T`, rejecting any row whose width disagrees with `T::ARITY`.
pub fn project<T: FromRow>(rows: Vec<Row>) -> RepoResult<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            ensure_arity::<T>(row.len())?;
            T::from_row(row)
        })
        .collect()
}

/// Fails with `ProjectionArity` unless `actual == T::ARITY`.
pub fn ensure_arity<T: FromRow>(actual: usize) -> RepoResult<()> {
    if actual != T::ARITY {
        return Err(RepoError::ProjectionArity {
            expected: T::ARITY,
            actual,
        });
    }
    Ok(())
}

pub(crate) fn type_mismatch(expected: &str, found: &Value) -> RepoError {
    RepoError::InvalidData(format!("expected {expected}, found {}", found.type_name()))
}

impl FromValue for Value {
    fn from_value(value: Value) -> RepoResult<Self> {
        Ok(value)
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> RepoResult<Self> {
        match value {
            Value::Integer(number) => Ok(number),
            other => Err(type_mismatch("integer", &other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> RepoResult<Self> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide)
            .map_err(|_| RepoError::InvalidData(format!("integer {wide} out of range for i32")))
    }
}

impl FromValue for u64 {
    fn from_value(value: Value) -> RepoResult<Self> {
        let wide = i64::from_value(value)?;
        u64::try_from(wide)
            .map_err(|_| RepoError::InvalidData(format!("integer {wide} out of range for u64")))
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> RepoResult<Self> {
        match value {
            Value::Real(number) => Ok(number),
            Value::Integer(number) => Ok(number as f64),
            other => Err(type_mismatch("real", &other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> RepoResult<Self> {
        match value {
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            Value::Integer(other) => Err(RepoError::InvalidData(format!(
                "integer {other} is not a boolean"
            ))),
            other => Err(type_mismatch("boolean", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> RepoResult<Self> {
        match value {
            Value::Text(text) => Ok(text),
            other => Err(type_mismatch("text", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> RepoResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

macro_rules! scalar_from_row {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromRow for $ty {
                const ARITY: usize = 1;

                fn from_row(row: Row) -> RepoResult<Self> {
                    row.columns().next_value()
                }
            }
        )*
    };
}

scalar_from_row!(i64, i32, u64, f64, bool, String, Value);

impl<T: FromValue> FromRow for Option<T> {
    const ARITY: usize = 1;

    fn from_row(row: Row) -> RepoResult<Self> {
        row.columns().next_value()
    }
}

macro_rules! tuple_from_row {
    ($arity:expr; $($name:ident),+) => {
        impl<$($name: FromValue),+> FromRow for ($($name,)+) {
            const ARITY: usize = $arity;

            fn from_row(row: Row) -> RepoResult<Self> {
                let mut columns = row.columns();
                Ok(($(columns.next_value::<$name>()?,)+))
            }
        }
    };
}

tuple_from_row!(2; A, B);
tuple_from_row!(3; A, B, C);
tuple_from_row!(4; A, B, C, D);
