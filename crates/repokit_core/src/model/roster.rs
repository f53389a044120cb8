//! Identity-indexed arena for the member/team object graph.
//!
//! # Responsibility
//! - Own persisted `Member`/`Team` instances keyed by identity.
//! - Provide the only sanctioned mutator for the bidirectional team link.
//!
//! # Invariants
//! - Only persisted entities (identity present) enter the arena.
//! - `change_team` never removes a member from a previous team's list;
//!   stale back-references are the caller's to clean up.

use crate::model::member::{Member, MemberId};
use crate::model::meta::Entity;
use crate::model::team::{Team, TeamId};
use crate::repo::error::{RepoError, RepoResult};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct Roster {
    members: BTreeMap<MemberId, Member>,
    teams: BTreeMap<TeamId, Team>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a persisted member, replacing any instance with the same id.
    ///
    /// If the member already points at a team held in the arena, the team's
    /// inverse list is updated as well.
    pub fn insert_member(&mut self, member: Member) -> RepoResult<MemberId> {
        let id = member.id().ok_or_else(|| transient("Member"))?;
        if let Some(team) = member.team_id().and_then(|team_id| self.teams.get_mut(&team_id)) {
            team.register_member(id);
        }
        self.members.insert(id, member);
        Ok(id)
    }

    /// Adds a persisted team; members already in the arena that reference it
    /// are registered on its inverse list.
    pub fn insert_team(&mut self, mut team: Team) -> RepoResult<TeamId> {
        let id = team.id().ok_or_else(|| transient("Team"))?;
        for member in self.members.values() {
            if member.team_id() == Some(id) {
                if let Some(member_id) = member.id() {
                    team.register_member(member_id);
                }
            }
        }
        self.teams.insert(id, team);
        Ok(id)
    }

    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.get(&id)
    }

    /// Mutable access for scalar attributes; the team link stays guarded.
    pub fn member_mut(&mut self, id: MemberId) -> Option<&mut Member> {
        self.members.get_mut(&id)
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.get(&id)
    }

    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    /// Links `member` to `team`: sets the owning side and appends to the
    /// inverse side when the team is held in this arena.
    ///
    /// Returns `NotFound` when the member is not in the arena.
    pub fn change_team(&mut self, member: MemberId, team: TeamId) -> RepoResult<()> {
        let owner = self.members.get_mut(&member).ok_or(RepoError::NotFound {
            entity: "Member",
            id: member.0,
        })?;
        owner.set_team_id(Some(team));

        if let Some(inverse) = self.teams.get_mut(&team) {
            inverse.register_member(member);
        }
        Ok(())
    }

    /// Drops a member instance, e.g. after a bulk update made it stale.
    pub fn evict_member(&mut self, id: MemberId) -> Option<Member> {
        self.members.remove(&id)
    }

    /// Drops every held member; teams keep their inverse lists.
    pub fn evict_members(&mut self) {
        self.members.clear();
    }
}

fn transient(entity: &str) -> RepoError {
    RepoError::InvalidQuery(format!("{entity} must be persisted before joining a roster"))
}
