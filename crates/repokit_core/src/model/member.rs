//! Member entity.
//!
//! # Invariants
//! - `id` is `None` before first persist and never changes afterwards.
//! - `team_id` is the owning side of the member/team link; it changes only
//!   through [`crate::model::roster::Roster::change_team`].

use crate::model::meta::{Attribute, Entity, EntityMeta, Relation};
use crate::model::team::{TeamId, TEAM_META};
use crate::model::value::{Value, ValueKind};
use crate::projection::{FromRow, FromValue, Row};
use crate::repo::error::RepoResult;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Store-assigned member identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberId(pub i64);

impl Display for MemberId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MemberId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<MemberId> for i64 {
    fn from(value: MemberId) -> Self {
        value.0
    }
}

impl From<MemberId> for Value {
    fn from(value: MemberId) -> Self {
        Value::Integer(value.0)
    }
}

impl FromValue for MemberId {
    fn from_value(value: Value) -> RepoResult<Self> {
        i64::from_value(value).map(Self)
    }
}

static MEMBER_RELATIONS: [Relation; 1] = [Relation {
    name: "team",
    column: "team_id",
    target: &TEAM_META,
}];

pub static MEMBER_META: EntityMeta = EntityMeta {
    name: "Member",
    table: "member",
    id: Attribute {
        name: "id",
        column: "member_id",
        kind: ValueKind::Integer,
    },
    attributes: &[
        Attribute {
            name: "username",
            column: "username",
            kind: ValueKind::Text,
        },
        Attribute {
            name: "age",
            column: "age",
            kind: ValueKind::Integer,
        },
        Attribute {
            name: "team_id",
            column: "team_id",
            kind: ValueKind::Integer,
        },
    ],
    relations: &MEMBER_RELATIONS,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    id: Option<MemberId>,
    pub username: String,
    pub age: i32,
    team_id: Option<TeamId>,
}

impl Member {
    pub fn new(username: impl Into<String>, age: i32) -> Self {
        Self {
            id: None,
            username: username.into(),
            age,
            team_id: None,
        }
    }

    /// Member with age `0`.
    pub fn named(username: impl Into<String>) -> Self {
        Self::new(username, 0)
    }

    pub fn team_id(&self) -> Option<TeamId> {
        self.team_id
    }

    pub(crate) fn set_team_id(&mut self, team_id: Option<TeamId>) {
        self.team_id = team_id;
    }
}

/// Identity-based equality: persisted members compare by id, transient
/// members are only equal to themselves.
impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(left), Some(right)) => left == right,
            _ => std::ptr::eq(self, other),
        }
    }
}

impl FromRow for Member {
    const ARITY: usize = 4;

    fn from_row(row: Row) -> RepoResult<Self> {
        let mut columns = row.columns();
        Ok(Self {
            id: Some(columns.next_value()?),
            username: columns.next_value()?,
            age: columns.next_value()?,
            team_id: columns.next_value()?,
        })
    }
}

impl Entity for Member {
    type Id = MemberId;

    fn meta() -> &'static EntityMeta {
        &MEMBER_META
    }

    fn id(&self) -> Option<MemberId> {
        self.id
    }

    fn assign_id(&mut self, id: MemberId) {
        debug_assert!(self.id.is_none(), "member identity is immutable");
        self.id = Some(id);
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.username.as_str()),
            Value::from(self.age),
            Value::from(self.team_id),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::{Member, MemberId, MEMBER_META};
    use crate::model::meta::Entity;

    #[test]
    fn transient_members_equal_only_themselves() {
        let first = Member::new("AAA", 10);
        let twin = first.clone();
        let alias = &first;
        assert_eq!(&first, alias);
        assert_ne!(first, twin);
    }

    #[test]
    fn persisted_members_compare_by_identity() {
        let mut first = Member::new("AAA", 10);
        first.assign_id(MemberId(7));
        let mut renamed = first.clone();
        renamed.username = "haha".to_string();
        assert_eq!(first, renamed);

        let mut other = Member::new("AAA", 10);
        other.assign_id(MemberId(8));
        assert_ne!(first, other);
    }

    #[test]
    fn column_values_follow_meta_order() {
        let member = Member::new("AAA", 10);
        assert_eq!(member.column_values().len(), MEMBER_META.attributes.len());
    }
}
