//! Query plan compiler.
//!
//! # Responsibility
//! - Turn a [`QueryDescriptor`] into a predicate tree over resolved paths.
//! - Turn a raw SQL template into a plan with a validated placeholder layout.
//!
//! # Invariants
//! - Every failure here happens before any store round-trip.
//! - Raw templates are never rewritten with values, only with placeholder
//!   renumbering.

use crate::model::meta::{EntityMeta, ResolvedPath};
use crate::model::value::ValueKind;
use crate::query::descriptor::{Criterion, QueryDescriptor};
use crate::query::operator::Operator;
use crate::query::params::ParamSpec;
use crate::query::plan::{resolve_path, CompiledPlan, Predicate, SortKey};
use crate::repo::error::{RepoError, RepoResult};
use log::debug;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Matches, in priority order: string literals, quoted identifiers, line
/// comments, block comments, numbered/anonymous positional placeholders and
/// named placeholders. Only the last three groups are placeholders.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"'(?:[^']|'')*'|"(?:[^"]|"")*"|--[^\n]*|/\*(?s:.*?)\*/|\?(?P<number>[0-9]+)?|:(?P<name>[A-Za-z_][A-Za-z0-9_]*)"#,
    )
    .expect("valid placeholder regex")
});

/// Compiles a derived-query descriptor against `target`.
///
/// Criteria are ANDed in declaration order within each group; groups are
/// ORed. Slots are numbered in the same order, so bindings follow the
/// descriptor left to right.
pub fn compile_descriptor(
    name: &str,
    target: &'static EntityMeta,
    descriptor: &QueryDescriptor,
) -> RepoResult<CompiledPlan> {
    let mut next_slot = 0;
    let predicate = compile_predicate(target, descriptor, &mut next_slot)?;

    let selection = match descriptor.selection() {
        Some(paths) if paths.is_empty() => {
            return Err(RepoError::InvalidQuery(format!(
                "query `{name}` selects no columns"
            )));
        }
        Some(paths) => paths
            .iter()
            .map(|path| resolve_path(target, path))
            .collect::<RepoResult<Vec<ResolvedPath>>>()?,
        None => target.row_paths(),
    };

    let sort = descriptor
        .sort()
        .orders()
        .iter()
        .map(|order| Ok((SortKey::Path(resolve_path(target, &order.property)?), order.direction)))
        .collect::<RepoResult<Vec<_>>>()?;

    debug!(
        "event=plan_compile module=query status=ok plan={name} kind=derived params={next_slot} columns={}",
        selection.len()
    );

    Ok(CompiledPlan::derived(
        name,
        target,
        predicate,
        selection,
        sort,
        descriptor.limit(),
        next_slot,
    ))
}

/// Builds the OR-of-ANDs predicate of `descriptor`, numbering slots from
/// `next_slot` onwards.
pub(crate) fn compile_predicate(
    target: &'static EntityMeta,
    descriptor: &QueryDescriptor,
    next_slot: &mut usize,
) -> RepoResult<Option<Predicate>> {
    let mut groups = Vec::new();
    for group in descriptor.groups() {
        let mut comparisons = Vec::with_capacity(group.len());
        for criterion in group {
            comparisons.push(compile_criterion(target, criterion, next_slot)?);
        }
        groups.push(conjunction(comparisons));
    }
    Ok(match groups.len() {
        0 => None,
        1 => groups.pop(),
        _ => Some(Predicate::Or(groups)),
    })
}

fn compile_criterion(
    target: &'static EntityMeta,
    criterion: &Criterion,
    next_slot: &mut usize,
) -> RepoResult<Predicate> {
    let path = resolve_path(target, &criterion.path)?;
    check_operator(&path, criterion.operator)?;
    let slot = *next_slot;
    *next_slot += criterion.operator.arity();
    Ok(Predicate::Compare {
        path,
        operator: criterion.operator,
        slot,
    })
}

fn conjunction(mut comparisons: Vec<Predicate>) -> Predicate {
    if comparisons.len() == 1 {
        comparisons.remove(0)
    } else {
        Predicate::And(comparisons)
    }
}

fn check_operator(path: &ResolvedPath, operator: Operator) -> RepoResult<()> {
    if operator.requires_text() && path.attribute.kind != ValueKind::Text {
        return Err(RepoError::UnsupportedOperator {
            operator: operator.keyword().to_string(),
            reason: format!(
                "`{}` is a {} attribute; pattern operators need text",
                path.attribute.name, path.attribute.kind
            ),
        });
    }
    Ok(())
}

/// Compiles a raw SQL template with `?`, `?N` or `:name` placeholders.
///
/// Named placeholders are renumbered to `?N` in first-appearance order so the
/// store binds a plain positional list. Mixing styles is rejected.
pub fn compile_raw(
    name: &str,
    target: &'static EntityMeta,
    template: &str,
) -> RepoResult<CompiledPlan> {
    let trimmed = template.trim().trim_end_matches(';').trim_end();
    if trimmed.is_empty() {
        return Err(RepoError::InvalidQuery(format!(
            "query `{name}` has an empty template"
        )));
    }

    let scan = scan_placeholders(trimmed)?;
    debug!(
        "event=plan_compile module=query status=ok plan={name} kind=raw params={}",
        scan.spec.count()
    );
    Ok(CompiledPlan::raw(name, target, scan.sql, scan.spec))
}

struct PlaceholderScan {
    sql: String,
    spec: ParamSpec,
}

#[derive(Default)]
struct ScanState {
    anonymous: usize,
    highest_number: usize,
    names: Vec<String>,
}

fn scan_placeholders(template: &str) -> RepoResult<PlaceholderScan> {
    let mut state = ScanState::default();
    let sql = PLACEHOLDER
        .replace_all(template, |captures: &Captures<'_>| rewrite_placeholder(captures, &mut state))
        .into_owned();

    let styles = [
        state.anonymous > 0,
        state.highest_number > 0,
        !state.names.is_empty(),
    ];
    if styles.iter().filter(|used| **used).count() > 1 {
        return Err(RepoError::InvalidQuery(
            "template mixes `?`, `?N` and `:name` placeholders".to_string(),
        ));
    }

    let spec = if state.names.is_empty() {
        ParamSpec::Positional(state.anonymous.max(state.highest_number))
    } else {
        ParamSpec::Named(state.names)
    };
    Ok(PlaceholderScan { sql, spec })
}

fn rewrite_placeholder(captures: &Captures<'_>, state: &mut ScanState) -> String {
    let whole = &captures[0];
    if let Some(name) = captures.name("name") {
        let name = name.as_str();
        let index = match state.names.iter().position(|known| known == name) {
            Some(index) => index,
            None => {
                state.names.push(name.to_string());
                state.names.len() - 1
            }
        };
        return format!("?{}", index + 1);
    }
    if let Some(number) = captures.name("number") {
        // Oversized numbers are left for the store to reject.
        if let Ok(number) = number.as_str().parse::<usize>() {
            state.highest_number = state.highest_number.max(number);
        }
        return whole.to_string();
    }
    if whole == "?" {
        state.anonymous += 1;
    }
    whole.to_string()
}
