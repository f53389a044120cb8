//! Non-entity read shapes.

use crate::model::member::MemberId;
use crate::projection::{FromRow, Row};
use crate::repo::error::RepoResult;
use serde::{Deserialize, Serialize};

/// Member summary joined with its team name; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDto {
    pub id: MemberId,
    pub username: String,
    pub team_name: Option<String>,
}

impl MemberDto {
    pub fn new(id: MemberId, username: impl Into<String>, team_name: Option<String>) -> Self {
        Self {
            id,
            username: username.into(),
            team_name,
        }
    }
}

impl FromRow for MemberDto {
    const ARITY: usize = 3;

    fn from_row(row: Row) -> RepoResult<Self> {
        let mut columns = row.columns();
        Ok(Self {
            id: columns.next_value()?,
            username: columns.next_value()?,
            team_name: columns.next_value()?,
        })
    }
}
