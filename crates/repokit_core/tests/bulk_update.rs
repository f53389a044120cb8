use repokit_core::db::open_db_in_memory;
use repokit_core::query::{BulkUpdate, Operator, QueryDescriptor};
use repokit_core::{
    bindings, CrudRepository, Entity, Member, MemberRepository, RepoError, Repository, Roster,
    SqliteStore, Team,
};

#[test]
fn bulk_age_plus_reports_affected_rows() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let repo = MemberRepository::new(&store).unwrap();
    for (index, age) in [10, 19, 20, 21, 40].into_iter().enumerate() {
        repo.save(&mut Member::new(format!("member{index}"), age))
            .unwrap();
    }

    assert_eq!(repo.bulk_age_plus(20).unwrap(), 3);

    let mut ages: Vec<i32> = repo
        .find_all()
        .unwrap()
        .into_iter()
        .map(|member| member.age)
        .collect();
    ages.sort_unstable();
    assert_eq!(ages, vec![10, 19, 21, 22, 41]);
}

#[test]
fn zero_affected_rows_is_not_an_error() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let repo = MemberRepository::new(&store).unwrap();
    repo.save(&mut Member::new("AAA", 10)).unwrap();

    assert_eq!(repo.bulk_age_plus(100).unwrap(), 0);
}

#[test]
fn held_entities_stay_stale_until_refreshed() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let repo = MemberRepository::new(&store).unwrap();

    let mut held = Member::new("member5", 40);
    repo.save(&mut held).unwrap();

    repo.bulk_age_plus(20).unwrap();
    assert_eq!(held.age, 40);

    let reloaded = repo.find_member_by_username("member5").unwrap().unwrap();
    assert_eq!(reloaded.age, 41);

    repo.refresh(&mut held).unwrap();
    assert_eq!(held.age, 41);

    let mut transient = Member::new("nobody", 1);
    assert!(matches!(
        repo.refresh(&mut transient),
        Err(RepoError::InvalidQuery(_))
    ));
}

#[test]
fn save_after_bulk_update_overwrites_with_stale_state() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let repo = MemberRepository::new(&store).unwrap();

    let mut held = Member::new("member1", 30);
    let id = repo.save(&mut held).unwrap();
    repo.bulk_age_plus(20).unwrap();

    repo.save(&mut held).unwrap();
    assert_eq!(repo.find_by_id(id).unwrap().unwrap().age, 30);
}

#[test]
fn bulk_update_filtered_by_related_attribute() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let members = MemberRepository::new(&store).unwrap();
    let teams: Repository<'_, Team, _> = Repository::new(&store);

    let mut team = Team::new("teamA");
    let team_id = teams.save(&mut team).unwrap();
    let mut roster = Roster::new();
    roster.insert_team(team).unwrap();

    for (username, age) in [("AAA", 10), ("BBB", 20)] {
        let mut member = Member::new(username, age);
        let id = members.save(&mut member).unwrap();
        roster.insert_member(member).unwrap();
        if username == "AAA" {
            roster.change_team(id, team_id).unwrap();
            members.save(roster.member_mut(id).unwrap()).unwrap();
        }
    }

    let engine = members.repository();
    engine
        .define_bulk(
            "Member.resetAgeByTeamName",
            &BulkUpdate::new()
                .set("age")
                .filter(QueryDescriptor::new().and("team.name", Operator::Equals)),
        )
        .unwrap();
    let affected = engine
        .bulk_update("Member.resetAgeByTeamName", &bindings![0, "teamA"])
        .unwrap();
    assert_eq!(affected, 1);

    let aaa = members.find_member_by_username("AAA").unwrap().unwrap();
    assert_eq!(aaa.age, 0);
    assert_eq!(aaa.team_id(), Some(team_id));
    let bbb = members.find_member_by_username("BBB").unwrap().unwrap();
    assert_eq!(bbb.age, 20);
    assert!(roster.member(bbb.id().unwrap()).is_some());
}

#[test]
fn bulk_binding_count_is_checked() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let repo = MemberRepository::new(&store).unwrap();

    let err = repo
        .repository()
        .bulk_update(
            repokit_core::repo::member_repo::BULK_AGE_PLUS,
            &bindings![1],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::ParameterMismatch {
            expected: 2,
            actual: 1
        }
    ));
}
