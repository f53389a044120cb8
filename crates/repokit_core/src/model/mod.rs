//! Entity model: typed values, table metadata and example entities.
//!
//! # Responsibility
//! - Define the `Entity` contract the repository engine is generic over.
//! - Keep bidirectional relationship maintenance behind `Roster`.
//!
//! # Invariants
//! - Identity is store-assigned and immutable after first persist.
//! - Entity equality is identity-based once persisted.

pub mod dto;
pub mod member;
pub mod meta;
pub mod roster;
pub mod team;
pub mod value;
