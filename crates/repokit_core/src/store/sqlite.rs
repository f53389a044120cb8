//! SQLite-backed [`Store`].

use crate::model::meta::EntityMeta;
use crate::model::value::Value;
use crate::projection::Row;
use crate::query::bulk::BulkPlan;
use crate::query::plan::CompiledPlan;
use crate::query::sql::{
    delete_by_id_sql, insert_sql, render_bulk_update, render_count, render_select,
    update_by_id_sql, Statement,
};
use crate::repo::error::{RepoError, RepoResult};
use crate::store::Store;
use log::debug;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use std::time::Instant;

/// Store over a borrowed SQLite connection.
///
/// Transactions are the caller's concern: wrap calls in
/// `Connection::unchecked_transaction` to make them atomic.
pub struct SqliteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    fn execute(&self, label: &str, sql: &str, values: Vec<Value>) -> RepoResult<usize> {
        let started_at = Instant::now();
        let bindings = to_sql_values(values)?;
        let binding_count = bindings.len();
        let changed = self.conn.execute(sql, params_from_iter(bindings))?;
        debug!(
            "event=query_exec module=store status=ok plan={label} kind=write params={binding_count} rows={changed} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(changed)
    }
}

impl Store for SqliteStore<'_> {
    fn fetch(&self, plan: &CompiledPlan, values: Vec<Value>) -> RepoResult<Vec<Row>> {
        let started_at = Instant::now();
        let Statement { sql, values } = render_select(plan, values)?;
        let binding_count = values.len();

        let mut stmt = self.conn.prepare(&sql)?;
        let width = stmt.column_count();
        let mut rows = stmt.query(params_from_iter(to_sql_values(values)?))?;
        let mut fetched = Vec::new();
        while let Some(row) = rows.next()? {
            let mut columns = Vec::with_capacity(width);
            for index in 0..width {
                columns.push(from_sql_value(row.get_ref(index)?, index)?);
            }
            fetched.push(Row::new(columns));
        }

        debug!(
            "event=query_exec module=store status=ok plan={} kind=select params={binding_count} rows={} duration_ms={}",
            plan.name(),
            fetched.len(),
            started_at.elapsed().as_millis()
        );
        Ok(fetched)
    }

    fn count(&self, plan: &CompiledPlan, values: Vec<Value>) -> RepoResult<u64> {
        let started_at = Instant::now();
        let Statement { sql, values } = render_count(plan, values)?;
        let binding_count = values.len();
        let total: i64 = self.conn.query_row(
            &sql,
            params_from_iter(to_sql_values(values)?),
            |row| row.get(0),
        )?;
        debug!(
            "event=query_exec module=store status=ok plan={} kind=count params={binding_count} rows=1 duration_ms={}",
            plan.name(),
            started_at.elapsed().as_millis()
        );
        u64::try_from(total)
            .map_err(|_| RepoError::InvalidData(format!("negative row count {total}")))
    }

    fn bulk_update(&self, plan: &BulkPlan, values: Vec<Value>) -> RepoResult<usize> {
        let Statement { sql, values } = render_bulk_update(plan, values)?;
        self.execute(plan.name(), &sql, values)
    }

    fn insert(&self, meta: &'static EntityMeta, values: Vec<Value>) -> RepoResult<i64> {
        ensure_width(meta, values.len())?;
        self.execute(&format!("{}.insert", meta.name), &insert_sql(meta), values)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, meta: &'static EntityMeta, id: i64, mut values: Vec<Value>) -> RepoResult<usize> {
        ensure_width(meta, values.len())?;
        values.push(Value::Integer(id));
        self.execute(&format!("{}.update", meta.name), &update_by_id_sql(meta), values)
    }

    fn delete(&self, meta: &'static EntityMeta, id: i64) -> RepoResult<usize> {
        self.execute(
            &format!("{}.delete", meta.name),
            &delete_by_id_sql(meta),
            vec![Value::Integer(id)],
        )
    }
}

fn ensure_width(meta: &EntityMeta, actual: usize) -> RepoResult<()> {
    if actual != meta.attributes.len() {
        return Err(RepoError::ProjectionArity {
            expected: meta.attributes.len(),
            actual,
        });
    }
    Ok(())
}

fn to_sql_values(values: Vec<Value>) -> RepoResult<Vec<SqlValue>> {
    values.into_iter().map(to_sql_value).collect()
}

fn to_sql_value(value: Value) -> RepoResult<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Integer(number) => SqlValue::Integer(number),
        Value::Real(number) => SqlValue::Real(number),
        Value::Text(text) => SqlValue::Text(text),
        Value::List(_) => {
            return Err(RepoError::InvalidQuery(
                "list bindings are only valid for `In`/`NotIn`".to_string(),
            ));
        }
    })
}

fn from_sql_value(value: ValueRef<'_>, index: usize) -> RepoResult<Value> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(number) => Ok(Value::Integer(number)),
        ValueRef::Real(number) => Ok(Value::Real(number)),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|text| Value::Text(text.to_string()))
            .map_err(|_| RepoError::InvalidData(format!("column {index}: text is not utf-8"))),
        ValueRef::Blob(_) => Err(RepoError::InvalidData(format!(
            "column {index}: blob values are not supported"
        ))),
    }
}
