//! Member repository: the declared query set for [`Member`].
//!
//! # Responsibility
//! - Name and declare every member query once per process.
//! - Expose typed methods so callers never pass query names by hand.
//!
//! # Invariants
//! - Declarations compile on first construction; later constructions reuse
//!   the cached plans.

use crate::bindings;
use crate::model::dto::MemberDto;
use crate::model::member::{Member, MemberId};
use crate::model::value::Value;
use crate::paging::{Page, PageRequest, Slice};
use crate::query::bulk::{BulkPlan, BulkUpdate};
use crate::query::cache::PlanCache;
use crate::query::descriptor::QueryDescriptor;
use crate::query::operator::Operator;
use crate::query::params::Params;
use crate::query::plan::CompiledPlan;
use crate::query::sort::Sort;
use crate::repo::error::RepoResult;
use crate::repo::repository::{CrudRepository, Repository};
use crate::store::Store;
use once_cell::sync::Lazy;
use std::sync::Arc;

pub const FIND_BY_USERNAME_AND_AGE_GREATER_THAN: &str = "Member.findByUsernameAndAgeGreaterThan";
pub const FIND_USER: &str = "Member.findUser";
pub const FIND_USERNAME_LIST: &str = "Member.findUsernameList";
pub const FIND_MEMBER_DTO: &str = "Member.findMemberDto";
pub const FIND_BY_NAMES: &str = "Member.findByNames";
pub const FIND_LIST_BY_USERNAME: &str = "Member.findListByUsername";
pub const FIND_MEMBER_BY_USERNAME: &str = "Member.findMemberByUsername";
pub const FIND_BY_AGE: &str = "Member.findByAge";
pub const FIND_BY_TEAM_NAME: &str = "Member.findByTeamName";
pub const BULK_AGE_PLUS: &str = "Member.bulkAgePlus";

static MEMBER_PLANS: Lazy<Arc<PlanCache<CompiledPlan>>> = Lazy::new(Arc::default);
static MEMBER_BULK_PLANS: Lazy<Arc<PlanCache<BulkPlan>>> = Lazy::new(Arc::default);

pub struct MemberRepository<'s, S: Store + ?Sized> {
    inner: Repository<'s, Member, S>,
}

impl<'s, S: Store + ?Sized> MemberRepository<'s, S> {
    pub fn new(store: &'s S) -> RepoResult<Self> {
        let inner = Repository::with_caches(
            store,
            Arc::clone(&MEMBER_PLANS),
            Arc::clone(&MEMBER_BULK_PLANS),
        );

        inner.define(
            FIND_BY_USERNAME_AND_AGE_GREATER_THAN,
            &QueryDescriptor::new()
                .and("username", Operator::Equals)
                .and("age", Operator::GreaterThan),
        )?;
        inner.define_raw(
            FIND_USER,
            "SELECT member_id, username, age, team_id FROM member \
             WHERE username = :username AND age = :age",
        )?;
        inner.define_raw(FIND_USERNAME_LIST, "SELECT username FROM member")?;
        inner.define(
            FIND_MEMBER_DTO,
            &QueryDescriptor::new()
                .select(["id", "username", "team.name"])
                .and("team.id", Operator::IsNotNull),
        )?;
        inner.define(
            FIND_BY_NAMES,
            &QueryDescriptor::new().and("username", Operator::In),
        )?;
        inner.define(
            FIND_LIST_BY_USERNAME,
            &QueryDescriptor::new().and("username", Operator::Equals),
        )?;
        inner.define(
            FIND_MEMBER_BY_USERNAME,
            &QueryDescriptor::new().and("username", Operator::Equals),
        )?;
        inner.define(FIND_BY_AGE, &QueryDescriptor::new().and("age", Operator::Equals))?;
        inner.define(
            FIND_BY_TEAM_NAME,
            &QueryDescriptor::new().and("team.name", Operator::Equals),
        )?;
        inner.define_bulk(
            BULK_AGE_PLUS,
            &BulkUpdate::new()
                .increment("age")
                .filter(QueryDescriptor::new().and("age", Operator::GreaterThanEqual)),
        )?;

        Ok(Self { inner })
    }

    /// Underlying engine, for ad hoc queries against the same caches.
    pub fn repository(&self) -> &Repository<'s, Member, S> {
        &self.inner
    }

    pub fn find_by_username_and_age_greater_than(
        &self,
        username: &str,
        age: i32,
    ) -> RepoResult<Vec<Member>> {
        self.inner
            .find_many(FIND_BY_USERNAME_AND_AGE_GREATER_THAN, &bindings![username, age])
    }

    pub fn find_user(&self, username: &str, age: i32) -> RepoResult<Vec<Member>> {
        self.inner.find_many(
            FIND_USER,
            &Params::named([("username", Value::from(username)), ("age", Value::from(age))]),
        )
    }

    pub fn find_username_list(&self) -> RepoResult<Vec<String>> {
        self.inner.find_many(FIND_USERNAME_LIST, &Params::none())
    }

    /// Members that belong to a team, joined with the team name.
    pub fn find_member_dto(&self) -> RepoResult<Vec<MemberDto>> {
        self.inner.find_many(FIND_MEMBER_DTO, &Params::none())
    }

    pub fn find_by_names<N: AsRef<str>>(&self, names: &[N]) -> RepoResult<Vec<Member>> {
        let names = Value::list(names.iter().map(|name| name.as_ref()));
        self.inner
            .find_many(FIND_BY_NAMES, &Params::Positional(vec![names]))
    }

    pub fn find_list_by_username(&self, username: &str) -> RepoResult<Vec<Member>> {
        self.inner
            .find_many(FIND_LIST_BY_USERNAME, &bindings![username])
    }

    /// Fails with `NonUniqueResult` when the username is shared.
    pub fn find_member_by_username(&self, username: &str) -> RepoResult<Option<Member>> {
        self.inner
            .find_one(FIND_MEMBER_BY_USERNAME, &bindings![username])
    }

    pub fn find_by_age_page(&self, age: i32, request: &PageRequest) -> RepoResult<Page<Member>> {
        self.inner.page(FIND_BY_AGE, &bindings![age], request)
    }

    pub fn find_by_age_slice(&self, age: i32, request: &PageRequest) -> RepoResult<Slice<Member>> {
        self.inner.slice(FIND_BY_AGE, &bindings![age], request)
    }

    pub fn find_by_team_name(&self, team_name: &str) -> RepoResult<Vec<Member>> {
        self.inner
            .find_many(FIND_BY_TEAM_NAME, &bindings![team_name])
    }

    /// Adds one to the age of every member aged `age` or older.
    ///
    /// Members fetched before the call keep their old age until refreshed.
    pub fn bulk_age_plus(&self, age: i32) -> RepoResult<usize> {
        self.inner.bulk_update(BULK_AGE_PLUS, &bindings![1, age])
    }

    pub fn refresh(&self, member: &mut Member) -> RepoResult<()> {
        self.inner.refresh(member)
    }
}

impl<S: Store + ?Sized> CrudRepository<Member> for MemberRepository<'_, S> {
    fn save(&self, entity: &mut Member) -> RepoResult<MemberId> {
        self.inner.save(entity)
    }

    fn find_by_id(&self, id: MemberId) -> RepoResult<Option<Member>> {
        self.inner.find_by_id(id)
    }

    fn exists_by_id(&self, id: MemberId) -> RepoResult<bool> {
        self.inner.exists_by_id(id)
    }

    fn find_all(&self) -> RepoResult<Vec<Member>> {
        self.inner.find_all()
    }

    fn find_all_sorted(&self, sort: &Sort) -> RepoResult<Vec<Member>> {
        self.inner.find_all_sorted(sort)
    }

    fn count(&self) -> RepoResult<u64> {
        self.inner.count()
    }

    fn delete(&self, entity: &Member) -> RepoResult<()> {
        self.inner.delete(entity)
    }

    fn delete_by_id(&self, id: MemberId) -> RepoResult<()> {
        self.inner.delete_by_id(id)
    }
}
