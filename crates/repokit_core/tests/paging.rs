use repokit_core::db::open_db_in_memory;
use repokit_core::query::{Order, QueryDescriptor};
use repokit_core::{
    bindings, CrudRepository, Direction, Entity, Member, MemberDto, MemberRepository, Page,
    PageRequest, RepoError, Repository, Slice, SqliteStore, Sort,
};
use rusqlite::Connection;

fn seed_five_members(conn: &Connection) {
    let store = SqliteStore::new(conn);
    let repo = MemberRepository::new(&store).unwrap();
    for index in 1..=5 {
        repo.save(&mut Member::new(format!("member{index}"), 10))
            .unwrap();
    }
}

fn first_page_by_name_desc() -> PageRequest {
    PageRequest::of(0, 3)
        .unwrap()
        .with_sort(Sort::by(Direction::Desc, &["username"]))
}

fn usernames<'a>(members: impl IntoIterator<Item = &'a Member>) -> Vec<String> {
    members
        .into_iter()
        .map(|member| member.username.clone())
        .collect()
}

#[test]
fn page_carries_total_and_flags() {
    let conn = open_db_in_memory().unwrap();
    seed_five_members(&conn);
    let store = SqliteStore::new(&conn);
    let repo = MemberRepository::new(&store).unwrap();

    let page = repo
        .find_by_age_page(10, &first_page_by_name_desc())
        .unwrap();

    assert_eq!(usernames(page.content()), vec!["member5", "member4", "member3"]);
    assert_eq!(page.total_elements(), 5);
    assert_eq!(page.total_pages(), 2);
    assert_eq!(page.number(), 0);
    assert!(page.is_first());
    assert!(page.has_next());
    assert!(!page.is_last());
}

#[test]
fn second_page_holds_the_remainder() {
    let conn = open_db_in_memory().unwrap();
    seed_five_members(&conn);
    let store = SqliteStore::new(&conn);
    let repo = MemberRepository::new(&store).unwrap();

    let page = repo
        .find_by_age_page(10, &first_page_by_name_desc().next())
        .unwrap();
    assert_eq!(usernames(page.content()), vec!["member2", "member1"]);
    assert!(page.is_last());
    assert!(!page.has_next());
    assert!(page.has_previous());
}

#[test]
fn slice_matches_page_without_total() {
    let conn = open_db_in_memory().unwrap();
    seed_five_members(&conn);
    let store = SqliteStore::new(&conn);
    let repo = MemberRepository::new(&store).unwrap();

    let request = first_page_by_name_desc();
    let page = repo.find_by_age_page(10, &request).unwrap();
    let slice = repo.find_by_age_slice(10, &request).unwrap();

    assert_eq!(usernames(slice.content()), usernames(page.content()));
    assert_eq!(slice.has_next(), page.has_next());
    assert_eq!(slice.is_last(), page.is_last());

    let json = serde_json::to_value(&slice).unwrap();
    assert!(json.get("total_elements").is_none());
    assert_eq!(json["has_next"], true);

    let last = repo
        .find_by_age_slice(10, &request.next())
        .unwrap();
    assert_eq!(last.number_of_elements(), 2);
    assert!(last.is_last());
}

#[test]
fn ties_page_deterministically_by_identity() {
    let conn = open_db_in_memory().unwrap();
    seed_five_members(&conn);
    let store = SqliteStore::new(&conn);
    let repo = MemberRepository::new(&store).unwrap();

    let request = PageRequest::of(0, 2)
        .unwrap()
        .with_sort(Sort::by(Direction::Asc, &["age"]));
    let mut seen = Vec::new();
    let mut current = request;
    loop {
        let page = repo.find_by_age_page(10, &current).unwrap();
        seen.extend(usernames(page.content()));
        if page.is_last() {
            break;
        }
        current = current.next();
    }
    assert_eq!(
        seen,
        vec!["member1", "member2", "member3", "member4", "member5"]
    );
}

#[test]
fn page_maps_to_dto_keeping_metadata() {
    let conn = open_db_in_memory().unwrap();
    seed_five_members(&conn);
    let store = SqliteStore::new(&conn);
    let repo = MemberRepository::new(&store).unwrap();

    let page = repo
        .find_by_age_page(10, &first_page_by_name_desc())
        .unwrap();
    let dtos = page.map(|member| {
        MemberDto::new(
            member.id().expect("persisted member"),
            member.username,
            None,
        )
    });

    assert_eq!(dtos.total_elements(), 5);
    assert_eq!(dtos.content()[0].username, "member5");

    let json = serde_json::to_value(&dtos).unwrap();
    assert_eq!(json["total_pages"], 2);
    assert_eq!(json["content"][0]["username"], "member5");
}

#[test]
fn find_all_page_and_empty_result() {
    let conn = open_db_in_memory().unwrap();
    seed_five_members(&conn);
    let store = SqliteStore::new(&conn);
    let repo = MemberRepository::new(&store).unwrap();

    let all = repo
        .repository()
        .find_all_page(&PageRequest::of(1, 4).unwrap())
        .unwrap();
    assert_eq!(all.number_of_elements(), 1);
    assert_eq!(all.total_elements(), 5);

    let empty = repo
        .find_by_age_page(99, &PageRequest::of(0, 3).unwrap())
        .unwrap();
    assert!(empty.content().is_empty());
    assert_eq!(empty.total_pages(), 0);
    assert!(empty.is_last());
    assert_eq!(repo.count().unwrap(), 5);
}

#[test]
fn unknown_sort_property_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::new(&conn);
    let repo = MemberRepository::new(&store).unwrap();

    let request = PageRequest::of(0, 3)
        .unwrap()
        .with_sort(Sort::by(Direction::Asc, &["nickname"]));
    let err = repo.find_by_age_page(10, &request).unwrap_err();
    assert!(matches!(err, RepoError::UnknownAttribute { .. }));
}

#[test]
fn top_n_cap_holds_on_later_pages() {
    let conn = open_db_in_memory().unwrap();
    seed_five_members(&conn);
    let store = SqliteStore::new(&conn);
    let repo: Repository<'_, Member, _> = Repository::new(&store);
    repo.define(
        "Member.firstThreeByName",
        &QueryDescriptor::new()
            .order_by(Order::asc("username"))
            .top(3),
    )
    .unwrap();

    let params = bindings![];
    let request = PageRequest::of(0, 2).unwrap();
    let first: Page<Member> = repo
        .page("Member.firstThreeByName", &params, &request)
        .unwrap();
    let second: Page<Member> = repo
        .page("Member.firstThreeByName", &params, &request.next())
        .unwrap();

    assert_eq!(first.total_elements(), 3);
    assert_eq!(first.total_pages(), 2);
    assert_eq!(usernames(first.content()), vec!["member1", "member2"]);
    assert_eq!(usernames(second.content()), vec!["member3"]);
    assert!(second.is_last());

    let slice: Slice<Member> = repo
        .slice("Member.firstThreeByName", &params, &request.next())
        .unwrap();
    assert_eq!(usernames(slice.content()), vec!["member3"]);
    assert!(!slice.has_next());

    let beyond: Page<Member> = repo
        .page("Member.firstThreeByName", &params, &request.next().next())
        .unwrap();
    assert!(beyond.content().is_empty());
    assert_eq!(beyond.total_elements(), 3);
}

#[test]
fn raw_template_with_trailing_comment_pages_and_sorts() {
    let conn = open_db_in_memory().unwrap();
    seed_five_members(&conn);
    let store = SqliteStore::new(&conn);
    let repo: Repository<'_, Member, _> = Repository::new(&store);
    repo.define_raw(
        "Member.rawByAge",
        "SELECT member_id, username, age, team_id FROM member WHERE age = ? -- by age",
    )
    .unwrap();
    repo.define_raw(
        "Member.rawByName",
        "SELECT member_id, username, age, team_id FROM member WHERE username = ? -- by name",
    )
    .unwrap();

    let request = PageRequest::of(0, 2)
        .unwrap()
        .with_sort(Sort::by(Direction::Desc, &["username"]));
    let page: Page<Member> = repo
        .page("Member.rawByAge", &bindings![10], &request)
        .unwrap();
    assert_eq!(usernames(page.content()), vec!["member5", "member4"]);
    assert_eq!(page.total_elements(), 5);
    assert_eq!(page.total_pages(), 3);

    let slice: Slice<Member> = repo
        .slice("Member.rawByAge", &bindings![10], &request.next())
        .unwrap();
    assert_eq!(usernames(slice.content()), vec!["member3", "member2"]);
    assert!(slice.has_next());

    let single: Option<Member> = repo
        .find_one("Member.rawByName", &bindings!["member3"])
        .unwrap();
    assert_eq!(single.map(|member| member.username).as_deref(), Some("member3"));

    let err = repo
        .find_one::<Member>("Member.rawByAge", &bindings![10])
        .unwrap_err();
    assert!(matches!(err, RepoError::NonUniqueResult { .. }));
}

#[test]
fn deserialized_request_rejects_zero_size() {
    let err = serde_json::from_str::<PageRequest>(r#"{"page":0,"size":0}"#).unwrap_err();
    assert!(err.to_string().contains("page size"));

    let request: PageRequest = serde_json::from_str(r#"{"page":2,"size":5}"#).unwrap();
    assert_eq!(request, PageRequest::of(2, 5).unwrap());
    assert_eq!(request.offset(), 10);
}
