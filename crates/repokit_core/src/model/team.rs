//! Team entity.

use crate::model::member::MemberId;
use crate::model::meta::{Attribute, Entity, EntityMeta};
use crate::model::value::{Value, ValueKind};
use crate::projection::{FromRow, FromValue, Row};
use crate::repo::error::RepoResult;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Store-assigned team identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub i64);

impl Display for TeamId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TeamId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<TeamId> for i64 {
    fn from(value: TeamId) -> Self {
        value.0
    }
}

impl From<TeamId> for Value {
    fn from(value: TeamId) -> Self {
        Value::Integer(value.0)
    }
}

impl FromValue for TeamId {
    fn from_value(value: Value) -> RepoResult<Self> {
        i64::from_value(value).map(Self)
    }
}

pub static TEAM_META: EntityMeta = EntityMeta {
    name: "Team",
    table: "team",
    id: Attribute {
        name: "id",
        column: "team_id",
        kind: ValueKind::Integer,
    },
    attributes: &[Attribute {
        name: "name",
        column: "name",
        kind: ValueKind::Text,
    }],
    relations: &[],
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    id: Option<TeamId>,
    pub name: String,
    /// Inverse side of `Member::team_id`. Never persisted; maintained by
    /// [`crate::model::roster::Roster::change_team`].
    #[serde(skip)]
    members: Vec<MemberId>,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn members(&self) -> &[MemberId] {
        &self.members
    }

    pub(crate) fn register_member(&mut self, member: MemberId) {
        if !self.members.contains(&member) {
            self.members.push(member);
        }
    }
}

impl PartialEq for Team {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(left), Some(right)) => left == right,
            _ => std::ptr::eq(self, other),
        }
    }
}

impl FromRow for Team {
    const ARITY: usize = 2;

    fn from_row(row: Row) -> RepoResult<Self> {
        let mut columns = row.columns();
        Ok(Self {
            id: Some(columns.next_value()?),
            name: columns.next_value()?,
            members: Vec::new(),
        })
    }
}

impl Entity for Team {
    type Id = TeamId;

    fn meta() -> &'static EntityMeta {
        &TEAM_META
    }

    fn id(&self) -> Option<TeamId> {
        self.id
    }

    fn assign_id(&mut self, id: TeamId) {
        debug_assert!(self.id.is_none(), "team identity is immutable");
        self.id = Some(id);
    }

    fn column_values(&self) -> Vec<Value> {
        vec![Value::from(self.name.as_str())]
    }
}
