//! SQL rendering for compiled plans.
//!
//! # Responsibility
//! - Render select, count and bulk-update statements for the SQLite store.
//! - Pair each rendered statement with its bindings in placeholder order.
//!
//! # Invariants
//! - Bound values are never spliced into SQL text; only LIMIT/OFFSET
//!   integers are rendered inline.
//! - The root table is aliased `e`; each joined relation `r` is `j_r`.
//! - Relationship hops are LEFT JOINs on the owning foreign key, so a
//!   member without a team still matches predicates on its own columns.

use crate::model::meta::{EntityMeta, Relation, ResolvedPath};
use crate::model::value::Value;
use crate::query::bulk::{AssignOp, BulkPlan};
use crate::query::operator::Operator;
use crate::query::plan::{CompiledPlan, PlanSource, Predicate, SortKey};
use crate::query::sort::Direction;
use crate::repo::error::{RepoError, RepoResult};

const ROOT_ALIAS: &str = "e";

/// Rendered SQL plus bindings in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Statement {
    pub(crate) sql: String,
    pub(crate) values: Vec<Value>,
}

/// Renders the row-fetching statement of `plan`.
pub(crate) fn render_select(plan: &CompiledPlan, values: Vec<Value>) -> RepoResult<Statement> {
    match &plan.source {
        PlanSource::Raw { sql } => {
            let mut rendered = if plan.sort_keys().is_empty() && !plan.is_windowed() {
                sql.clone()
            } else {
                subquery("SELECT *", sql)
            };
            push_order_by(&mut rendered, plan, false);
            push_window(&mut rendered, plan.limit(), plan.offset());
            Ok(Statement {
                sql: rendered,
                values,
            })
        }
        PlanSource::Derived {
            predicate,
            selection,
        } => {
            let target = plan.target();
            let mut joins = Vec::new();
            for path in selection {
                note_join(&mut joins, path);
            }
            if let Some(predicate) = predicate {
                predicate.visit_paths(&mut |path| note_join(&mut joins, path));
            }
            for (key, _) in plan.sort_keys() {
                if let SortKey::Path(path) = key {
                    note_join(&mut joins, path);
                }
            }

            let columns = selection
                .iter()
                .map(column_expr)
                .collect::<Vec<_>>()
                .join(", ");
            let mut sql = format!("SELECT {columns} FROM {} {ROOT_ALIAS}", target.table);
            push_joins(&mut sql, &joins);
            let bound = push_where(&mut sql, predicate.as_ref(), &values)?;
            push_order_by(&mut sql, plan, true);
            push_window(&mut sql, plan.limit(), plan.offset());
            Ok(Statement { sql, values: bound })
        }
    }
}

/// Renders a `COUNT(*)` over the rows `plan` would return, window included.
pub(crate) fn render_count(plan: &CompiledPlan, values: Vec<Value>) -> RepoResult<Statement> {
    match &plan.source {
        PlanSource::Raw { sql } => {
            let mut inner = sql.clone();
            if plan.is_windowed() {
                inner = subquery("SELECT *", &inner);
                push_window(&mut inner, plan.limit(), plan.offset());
            }
            Ok(Statement {
                sql: subquery("SELECT COUNT(*)", &inner),
                values,
            })
        }
        PlanSource::Derived { predicate, .. } => {
            let target = plan.target();
            let mut joins = Vec::new();
            if let Some(predicate) = predicate {
                predicate.visit_paths(&mut |path| note_join(&mut joins, path));
            }

            let projection = if plan.is_windowed() { "1" } else { "COUNT(*)" };
            let mut sql = format!("SELECT {projection} FROM {} {ROOT_ALIAS}", target.table);
            push_joins(&mut sql, &joins);
            let bound = push_where(&mut sql, predicate.as_ref(), &values)?;
            if plan.is_windowed() {
                push_window(&mut sql, plan.limit(), plan.offset());
                sql = format!("SELECT COUNT(*) FROM ({sql})");
            }
            Ok(Statement { sql, values: bound })
        }
    }
}

/// Wraps a raw template as a subquery. The closing parenthesis goes on its own
/// line so a trailing `--` comment in the template cannot swallow it.
fn subquery(projection: &str, raw: &str) -> String {
    format!("{projection} FROM ({raw}\n)")
}

/// Renders a single `UPDATE` covering every row matched by the plan filter.
///
/// Filters are expressed as an identity subquery so related-entity paths can
/// join without aliasing the updated table.
pub(crate) fn render_bulk_update(plan: &BulkPlan, values: Vec<Value>) -> RepoResult<Statement> {
    let target = plan.target();
    let assignment_count = plan.assignments().len();
    if values.len() < assignment_count {
        return Err(RepoError::ParameterMismatch {
            expected: plan.params().count(),
            actual: values.len(),
        });
    }

    let assignments = plan
        .assignments()
        .iter()
        .map(|(attribute, op)| match op {
            AssignOp::Set => format!("{} = ?", attribute.column),
            AssignOp::Increment => format!("{0} = {0} + ?", attribute.column),
        })
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!("UPDATE {} SET {assignments}", target.table);
    let mut bound = values[..assignment_count].to_vec();

    if let Some(predicate) = plan.predicate() {
        let mut joins = Vec::new();
        predicate.visit_paths(&mut |path| note_join(&mut joins, path));
        let mut filter = format!(
            "SELECT {ROOT_ALIAS}.{id} FROM {table} {ROOT_ALIAS}",
            id = target.id.column,
            table = target.table
        );
        push_joins(&mut filter, &joins);
        let filter_values = push_where(&mut filter, Some(predicate), &values)?;
        sql.push_str(&format!(" WHERE {} IN ({filter})", target.id.column));
        bound.extend(filter_values);
    }

    Ok(Statement { sql, values: bound })
}

pub(crate) fn insert_sql(meta: &EntityMeta) -> String {
    if meta.attributes.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", meta.table);
    }
    let columns = meta
        .attributes
        .iter()
        .map(|attribute| attribute.column)
        .collect::<Vec<_>>();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        meta.table,
        columns.join(", ")
    )
}

pub(crate) fn update_by_id_sql(meta: &EntityMeta) -> String {
    let id = meta.id.column;
    let assignments = if meta.attributes.is_empty() {
        format!("{id} = {id}")
    } else {
        meta.attributes
            .iter()
            .map(|attribute| format!("{} = ?", attribute.column))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!("UPDATE {} SET {assignments} WHERE {id} = ?", meta.table)
}

pub(crate) fn delete_by_id_sql(meta: &EntityMeta) -> String {
    format!("DELETE FROM {} WHERE {} = ?", meta.table, meta.id.column)
}

fn note_join(joins: &mut Vec<&'static Relation>, path: &ResolvedPath) {
    if let Some(relation) = path.relation {
        if !joins.iter().any(|known| std::ptr::eq(*known, relation)) {
            joins.push(relation);
        }
    }
}

fn push_joins(sql: &mut String, joins: &[&'static Relation]) {
    for relation in joins {
        sql.push_str(&format!(
            " LEFT JOIN {table} j_{name} ON j_{name}.{target_id} = {ROOT_ALIAS}.{fk}",
            table = relation.target.table,
            name = relation.name,
            target_id = relation.target.id.column,
            fk = relation.column,
        ));
    }
}

fn column_expr(path: &ResolvedPath) -> String {
    match path.relation {
        Some(relation) => format!("j_{}.{}", relation.name, path.attribute.column),
        None => format!("{ROOT_ALIAS}.{}", path.attribute.column),
    }
}

fn push_where(
    sql: &mut String,
    predicate: Option<&Predicate>,
    values: &[Value],
) -> RepoResult<Vec<Value>> {
    let mut bound = Vec::new();
    if let Some(predicate) = predicate {
        let clause = render_predicate(predicate, values, &mut bound)?;
        sql.push_str(" WHERE ");
        sql.push_str(&clause);
    }
    Ok(bound)
}

fn render_predicate(
    predicate: &Predicate,
    values: &[Value],
    bound: &mut Vec<Value>,
) -> RepoResult<String> {
    match predicate {
        Predicate::Compare {
            path,
            operator,
            slot,
        } => render_comparison(path, *operator, *slot, values, bound),
        Predicate::And(children) => join_children(children, " AND ", values, bound),
        Predicate::Or(children) => join_children(children, " OR ", values, bound),
    }
}

fn join_children(
    children: &[Predicate],
    separator: &str,
    values: &[Value],
    bound: &mut Vec<Value>,
) -> RepoResult<String> {
    let parts = children
        .iter()
        .map(|child| render_predicate(child, values, bound))
        .collect::<RepoResult<Vec<_>>>()?;
    Ok(format!("({})", parts.join(separator)))
}

fn render_comparison(
    path: &ResolvedPath,
    operator: Operator,
    slot: usize,
    values: &[Value],
    bound: &mut Vec<Value>,
) -> RepoResult<String> {
    let column = column_expr(path);
    let value = |offset: usize| -> RepoResult<&Value> {
        values
            .get(slot + offset)
            .ok_or_else(|| RepoError::ParameterMismatch {
                expected: slot + offset + 1,
                actual: values.len(),
            })
    };

    let sql = match operator {
        Operator::IsNull => format!("{column} IS NULL"),
        Operator::IsNotNull => format!("{column} IS NOT NULL"),
        Operator::Equals | Operator::NotEquals => {
            let value = scalar(operator, value(0)?)?;
            let negate = operator == Operator::NotEquals;
            if value.is_null() {
                let not = if negate { " NOT" } else { "" };
                format!("{column} IS{not} NULL")
            } else {
                bound.push(value.clone());
                let symbol = if negate { "<>" } else { "=" };
                format!("{column} {symbol} ?")
            }
        }
        Operator::GreaterThan
        | Operator::GreaterThanEqual
        | Operator::LessThan
        | Operator::LessThanEqual => {
            bound.push(scalar(operator, value(0)?)?.clone());
            let symbol = match operator {
                Operator::GreaterThan => ">",
                Operator::GreaterThanEqual => ">=",
                Operator::LessThan => "<",
                _ => "<=",
            };
            format!("{column} {symbol} ?")
        }
        Operator::Between => {
            bound.push(scalar(operator, value(0)?)?.clone());
            bound.push(scalar(operator, value(1)?)?.clone());
            format!("{column} BETWEEN ? AND ?")
        }
        Operator::In | Operator::NotIn => {
            let items = match value(0)? {
                Value::List(items) => items.as_slice(),
                single => std::slice::from_ref(single),
            };
            for item in items {
                bound.push(scalar(operator, item)?.clone());
            }
            let placeholders = vec!["?"; items.len()].join(", ");
            let keyword = if operator == Operator::In { "IN" } else { "NOT IN" };
            format!("{column} {keyword} ({placeholders})")
        }
        Operator::Like | Operator::NotLike => {
            bound.push(scalar(operator, value(0)?)?.clone());
            let keyword = if operator == Operator::Like { "LIKE" } else { "NOT LIKE" };
            format!("{column} {keyword} ?")
        }
        Operator::StartingWith | Operator::EndingWith | Operator::Containing => {
            let pattern = match scalar(operator, value(0)?)? {
                Value::Null => Value::Null,
                Value::Text(text) => {
                    let escaped = escape_like(text);
                    Value::Text(match operator {
                        Operator::StartingWith => format!("{escaped}%"),
                        Operator::EndingWith => format!("%{escaped}"),
                        _ => format!("%{escaped}%"),
                    })
                }
                other => {
                    return Err(RepoError::InvalidQuery(format!(
                        "`{operator}` on `{}` needs a text binding, got {}",
                        path.attribute.name,
                        other.type_name()
                    )));
                }
            };
            bound.push(pattern);
            format!("{column} LIKE ? ESCAPE '\\'")
        }
    };
    Ok(sql)
}

fn scalar(operator: Operator, value: &Value) -> RepoResult<&Value> {
    if let Value::List(_) = value {
        return Err(RepoError::InvalidQuery(format!(
            "`{operator}` takes a single value, got a list"
        )));
    }
    Ok(value)
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn push_order_by(sql: &mut String, plan: &CompiledPlan, derived: bool) {
    let mut keys = plan
        .sort_keys()
        .iter()
        .map(|(key, direction)| {
            let expr = match key {
                SortKey::Path(path) => column_expr(path),
                SortKey::Column(column) => column.clone(),
            };
            format!("{expr} {}", direction.as_sql())
        })
        .collect::<Vec<_>>();

    // Windows over derived plans need a total order to page deterministically.
    if derived && plan.is_windowed() {
        let target = plan.target();
        let sorted_by_id = plan.sort_keys().iter().any(|(key, _)| {
            matches!(key, SortKey::Path(path)
                if path.relation.is_none() && std::ptr::eq(path.attribute, &target.id))
        });
        if !sorted_by_id {
            keys.push(format!(
                "{ROOT_ALIAS}.{} {}",
                target.id.column,
                Direction::Asc.as_sql()
            ));
        }
    }

    if !keys.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&keys.join(", "));
    }
}

fn push_window(sql: &mut String, limit: Option<u64>, offset: Option<u64>) {
    match (limit, offset) {
        (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
        (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
        (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
        (None, None) => {}
    }
}
