//! Static entity metadata and the `Entity` contract.
//!
//! # Responsibility
//! - Describe table, identity column and attribute layout per entity type.
//! - Resolve attribute paths (`age`, `team.name`) to physical columns.
//!
//! # Invariants
//! - Row layout for an entity is always `[id, attributes...]` in declaration order.
//! - Paths traverse at most one relationship hop.

use crate::model::value::{Value, ValueKind};
use crate::projection::FromRow;
use std::fmt::{Debug, Display};

/// Name of the identity attribute in attribute paths.
pub const ID_ATTRIBUTE: &str = "id";

/// One persisted scalar attribute.
#[derive(Debug, PartialEq, Eq)]
pub struct Attribute {
    /// Name used in attribute paths.
    pub name: &'static str,
    pub column: &'static str,
    pub kind: ValueKind,
}

/// Owning-side many-to-one relationship stored as a foreign-key column.
#[derive(Debug)]
pub struct Relation {
    /// Name used as the first segment of a path (`team` in `team.name`).
    pub name: &'static str,
    /// Foreign-key column on the owning table.
    pub column: &'static str,
    pub target: &'static EntityMeta,
}

/// Table layout of one entity type.
#[derive(Debug)]
pub struct EntityMeta {
    /// Display name used in errors and logs.
    pub name: &'static str,
    pub table: &'static str,
    pub id: Attribute,
    /// Non-identity columns in row order.
    pub attributes: &'static [Attribute],
    pub relations: &'static [Relation],
}

/// An attribute path resolved against an entity.
///
/// `relation` is `None` for columns of the root table.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedPath {
    pub relation: Option<&'static Relation>,
    pub attribute: &'static Attribute,
}

impl PartialEq for ResolvedPath {
    fn eq(&self, other: &Self) -> bool {
        let same_relation = match (self.relation, other.relation) {
            (Some(left), Some(right)) => std::ptr::eq(left, right),
            (None, None) => true,
            _ => false,
        };
        same_relation && std::ptr::eq(self.attribute, other.attribute)
    }
}

impl EntityMeta {
    /// Number of columns in a full entity row.
    pub fn row_width(&self) -> usize {
        self.attributes.len() + 1
    }

    /// Looks up an attribute of this table, including the identity.
    pub fn attribute(&'static self, name: &str) -> Option<&'static Attribute> {
        if name == ID_ATTRIBUTE {
            return Some(&self.id);
        }
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    pub fn relation(&'static self, name: &str) -> Option<&'static Relation> {
        self.relations.iter().find(|relation| relation.name == name)
    }

    /// Resolves `attr` or `relation.attr`; `relation.id` maps to the local
    /// foreign-key column so no join is needed.
    pub fn resolve(&'static self, path: &str) -> Option<ResolvedPath> {
        match path.split_once('.') {
            None => self.attribute(path).map(|attribute| ResolvedPath {
                relation: None,
                attribute,
            }),
            Some((relation_name, rest)) => {
                let relation = self.relation(relation_name)?;
                if rest == ID_ATTRIBUTE {
                    let attribute = self
                        .attributes
                        .iter()
                        .find(|attribute| attribute.column == relation.column)?;
                    return Some(ResolvedPath {
                        relation: None,
                        attribute,
                    });
                }
                if rest.contains('.') {
                    return None;
                }
                relation.target.attribute(rest).map(|attribute| ResolvedPath {
                    relation: Some(relation),
                    attribute,
                })
            }
        }
    }

    /// Paths selecting a full entity row: identity then attributes.
    pub fn row_paths(&'static self) -> Vec<ResolvedPath> {
        std::iter::once(&self.id)
            .chain(self.attributes.iter())
            .map(|attribute| ResolvedPath {
                relation: None,
                attribute,
            })
            .collect()
    }
}

/// A persisted record with store-assigned surrogate identity.
pub trait Entity: FromRow {
    type Id: Copy + Eq + Debug + Display + From<i64> + Into<i64>;

    fn meta() -> &'static EntityMeta;

    /// `None` until the first successful insert.
    fn id(&self) -> Option<Self::Id>;

    /// Records the identity assigned by the store on first insert.
    ///
    /// Repositories call this exactly once; identity is immutable afterwards.
    fn assign_id(&mut self, id: Self::Id);

    /// Non-identity column values in [`EntityMeta::attributes`] order.
    fn column_values(&self) -> Vec<Value>;
}

#[cfg(test)]
mod tests {
    use crate::model::member::MEMBER_META;
    use crate::model::team::TEAM_META;

    #[test]
    fn resolves_local_and_related_paths() {
        let username = MEMBER_META.resolve("username").unwrap();
        assert!(username.relation.is_none());
        assert_eq!(username.attribute.column, "username");

        let team_name = MEMBER_META.resolve("team.name").unwrap();
        assert_eq!(team_name.relation.unwrap().name, "team");
        assert_eq!(team_name.attribute.column, "name");

        let id = MEMBER_META.resolve("id").unwrap();
        assert_eq!(id.attribute.column, "member_id");
    }

    #[test]
    fn relation_id_resolves_to_foreign_key_column() {
        let path = MEMBER_META.resolve("team.id").unwrap();
        assert!(path.relation.is_none());
        assert_eq!(path.attribute.column, "team_id");
    }

    #[test]
    fn rejects_unknown_and_deep_paths() {
        assert!(MEMBER_META.resolve("nickname").is_none());
        assert!(MEMBER_META.resolve("club.name").is_none());
        assert!(MEMBER_META.resolve("team.name.length").is_none());
        assert!(TEAM_META.resolve("members").is_none());
    }

    #[test]
    fn row_width_counts_identity() {
        assert_eq!(MEMBER_META.row_width(), 4);
        assert_eq!(MEMBER_META.row_paths().len(), 4);
        assert_eq!(TEAM_META.row_width(), 2);
    }
}
