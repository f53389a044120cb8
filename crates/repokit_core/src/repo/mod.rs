//! Repository layer: CRUD contract, generic engine and declared query sets.
//!
//! # Responsibility
//! - Define the CRUD contract every entity repository implements.
//! - Dispatch named queries to compiled plans and materialize results.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `NonUniqueResult`)
//!   in addition to store transport errors.
//! - Transaction boundaries belong to the caller's connection.

pub mod error;
pub mod member_repo;
pub mod repository;

pub use error::{RepoError, RepoResult};
pub use member_repo::MemberRepository;
pub use repository::{CrudRepository, Repository};
