//! Query declaration, compilation and rendering.

pub mod bulk;
pub mod cache;
pub mod compile;
pub mod descriptor;
pub mod operator;
pub mod params;
pub mod plan;
pub mod sort;
pub(crate) mod sql;

pub use bulk::{compile_bulk, AssignOp, BulkPlan, BulkUpdate};
pub use cache::PlanCache;
pub use compile::{compile_descriptor, compile_raw};
pub use descriptor::{Criterion, QueryDescriptor};
pub use operator::Operator;
pub use params::{ParamSpec, Params};
pub use plan::{CompiledPlan, Predicate, SortKey};
pub use sort::{Direction, Order, Sort};
