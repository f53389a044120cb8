use repokit_core::db::open_db_in_memory;
use repokit_core::query::{Operator, Order, QueryDescriptor};
use repokit_core::{
    bindings, CrudRepository, Member, MemberRepository, RepoError, SqliteStore, Value,
};
use rusqlite::Connection;

fn seeded(conn: &Connection, members: &[(&str, i32)]) {
    let store = SqliteStore::new(conn);
    let repo = MemberRepository::new(&store).unwrap();
    for (username, age) in members {
        repo.save(&mut Member::new(*username, *age)).unwrap();
    }
}

fn usernames(members: &[Member]) -> Vec<&str> {
    members.iter().map(|member| member.username.as_str()).collect()
}

#[test]
fn username_and_age_greater_than() {
    let conn = open_db_in_memory().unwrap();
    seeded(&conn, &[("AAA", 10), ("BBB", 20)]);
    let store = SqliteStore::new(&conn);
    let repo = MemberRepository::new(&store).unwrap();

    let found = repo.find_by_username_and_age_greater_than("AAA", 5).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!((found[0].username.as_str(), found[0].age), ("AAA", 10));

    assert!(repo
        .find_by_username_and_age_greater_than("AAA", 15)
        .unwrap()
        .is_empty());
}

#[test]
fn disjunction_groups_and_static_sort() {
    let conn = open_db_in_memory().unwrap();
    seeded(&conn, &[("AAA", 10), ("BBB", 20), ("CCC", 30), ("DDD", 40)]);
    let store = SqliteStore::new(&conn);
    let repo = MemberRepository::new(&store).unwrap();
    let engine = repo.repository();

    engine
        .define(
            "Member.youngOrNamed",
            &QueryDescriptor::new()
                .and("age", Operator::LessThan)
                .or("username", Operator::Equals)
                .order_by(Order::desc("age")),
        )
        .unwrap();
    let found: Vec<Member> = engine
        .find_many("Member.youngOrNamed", &bindings![15, "CCC"])
        .unwrap();
    assert_eq!(usernames(&found), vec!["CCC", "AAA"]);
}

#[test]
fn between_and_top_limit() {
    let conn = open_db_in_memory().unwrap();
    seeded(&conn, &[("AAA", 10), ("BBB", 20), ("CCC", 30), ("DDD", 40)]);
    let store = SqliteStore::new(&conn);
    let repo = MemberRepository::new(&store).unwrap();
    let engine = repo.repository();

    engine
        .define(
            "Member.findTop2ByAgeBetweenOrderByAgeAsc",
            &QueryDescriptor::new()
                .and("age", Operator::Between)
                .order_by(Order::asc("age"))
                .top(2),
        )
        .unwrap();
    let found: Vec<Member> = engine
        .find_many("Member.findTop2ByAgeBetweenOrderByAgeAsc", &bindings![15, 45])
        .unwrap();
    assert_eq!(usernames(&found), vec!["BBB", "CCC"]);
}

#[test]
fn pattern_operators_match_literally() {
    let conn = open_db_in_memory().unwrap();
    seeded(&conn, &[("member_1", 10), ("memberX1", 10), ("other", 10)]);
    let store = SqliteStore::new(&conn);
    let repo = MemberRepository::new(&store).unwrap();
    let engine = repo.repository();

    engine
        .define(
            "Member.findByUsernameStartingWith",
            &QueryDescriptor::new()
                .and("username", Operator::StartingWith)
                .order_by(Order::asc("username")),
        )
        .unwrap();
    let loose: Vec<Member> = engine
        .find_many("Member.findByUsernameStartingWith", &bindings!["member"])
        .unwrap();
    assert_eq!(usernames(&loose), vec!["memberX1", "member_1"]);

    let literal: Vec<Member> = engine
        .find_many("Member.findByUsernameStartingWith", &bindings!["member_"])
        .unwrap();
    assert_eq!(usernames(&literal), vec!["member_1"]);
}

#[test]
fn null_binding_matches_missing_team() {
    let conn = open_db_in_memory().unwrap();
    seeded(&conn, &[("AAA", 10)]);
    let store = SqliteStore::new(&conn);
    let repo = MemberRepository::new(&store).unwrap();
    let engine = repo.repository();

    engine
        .define(
            "Member.findByTeamId",
            &QueryDescriptor::new().and("team.id", Operator::Equals),
        )
        .unwrap();
    let found: Vec<Member> = engine
        .find_many("Member.findByTeamId", &bindings![Value::Null])
        .unwrap();
    assert_eq!(usernames(&found), vec!["AAA"]);
}

#[test]
fn scalar_and_tuple_projections() {
    let conn = open_db_in_memory().unwrap();
    seeded(&conn, &[("AAA", 10), ("BBB", 20)]);
    let store = SqliteStore::new(&conn);
    let repo = MemberRepository::new(&store).unwrap();
    let engine = repo.repository();

    engine
        .define(
            "Member.namesAndAges",
            &QueryDescriptor::new()
                .select(["username", "age"])
                .order_by(Order::desc("age")),
        )
        .unwrap();
    let pairs: Vec<(String, i32)> = engine
        .find_many("Member.namesAndAges", &bindings![])
        .unwrap();
    assert_eq!(
        pairs,
        vec![("BBB".to_string(), 20), ("AAA".to_string(), 10)]
    );

    let err = engine
        .find_many::<String>("Member.namesAndAges", &bindings![])
        .unwrap_err();
    assert!(matches!(err, RepoError::ProjectionArity { .. }));
}

#[test]
fn compile_errors_surface_before_execution() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let repo = MemberRepository::new(&store).unwrap();
    let engine = repo.repository();

    let err = engine
        .define(
            "Member.findByAgeContaining",
            &QueryDescriptor::new().and("age", Operator::Containing),
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::UnsupportedOperator { .. }));

    let err = QueryDescriptor::new()
        .and_keyword("username", "SoundsLike")
        .unwrap_err();
    assert!(matches!(err, RepoError::UnsupportedOperator { .. }));

    let err = repo
        .repository()
        .find_many::<Member>(
            repokit_core::repo::member_repo::FIND_BY_USERNAME_AND_AGE_GREATER_THAN,
            &bindings!["AAA"],
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
