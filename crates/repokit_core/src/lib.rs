//! Typed repositories and query derivation over SQLite.
//! Entities, declarative query descriptors, paging and bulk updates compile
//! into immutable plans executed by a `Store`.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod paging;
pub mod projection;
pub mod query;
pub mod repo;
pub mod store;

pub use config::{DbConfig, LoggingConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::dto::MemberDto;
pub use model::member::{Member, MemberId};
pub use model::meta::{Entity, EntityMeta};
pub use model::roster::Roster;
pub use model::team::{Team, TeamId};
pub use model::value::Value;
pub use paging::{Page, PageRequest, Slice};
pub use projection::{project, FromRow, FromValue, Row};
pub use query::{
    BulkUpdate, Direction, Operator, Order, Params, QueryDescriptor, Sort,
};
pub use repo::{CrudRepository, MemberRepository, RepoError, RepoResult, Repository};
pub use store::{SqliteStore, Store};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
