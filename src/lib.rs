//! # filter-logic
//!
//! Boolean composition of independently authored query filters.
//!
//! Leaf filters constrain one aspect of a query each and know nothing about
//! each other; they simply AND-append predicates onto a shared
//! [`QueryBuilder`]. [`FilterLogic`] adds the reserved specification keys
//! `and`, `or` and `not`: it runs the other filters of a resource against
//! nested sub-specifications, recovers exactly what each produced through
//! marker-diff extraction, and recombines the pieces under the requested
//! boolean operators.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use filter_logic::filter::DateFilter;
//! use filter_logic::{FilterContext, FilterLogic, FilterRegistry, PropertyFilter};
//! use filter_logic::{QueryBuilder, QueryNameGenerator};
//!
//! # fn main() -> filter_logic::FilterResult<()> {
//! let mut registry = FilterRegistry::new();
//! registry.register("date", Arc::new(DateFilter::new([("dd", None)])));
//! registry.configure("TestEntity", ["date", "logic"]);
//! let logic = FilterLogic::new(Arc::new(registry), "logic");
//!
//! let mut qb = QueryBuilder::new("TestEntity", "o");
//! let mut r#gen = QueryNameGenerator::new();
//! let spec = serde_json::from_str(
//!     r#"{"or": {"dd": {"before": "2021-01-01", "after": "2021-03-03"}}}"#,
//! ).unwrap();
//! logic.apply(&mut qb, &mut r#gen, "TestEntity", None, &FilterContext::new(spec))?;
//!
//! assert_eq!(
//!     qb.to_dql(),
//!     "SELECT o FROM TestEntity o WHERE o.dd <= :dd_p1 OR o.dd >= :dd_p2",
//! );
//! # Ok(())
//! # }
//! ```
//!
//! Specifications are order-preserving nested maps ([`FilterSpec`]),
//! typically deserialized from a query string or JSON document. Filters that
//! implement [`ExpressionGenerator`] hand expressions back directly and skip
//! the marker protocol.
//!
//! Under `or`, constraints on joined associations usually need LEFT join
//! semantics; see [`FilterLogic::coerce_inner_joins`] and the fake-join
//! bracketing pair in [`filter::fake_join`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod error;
pub mod expr;
pub mod filter;
pub mod join;
pub mod logic;
pub mod logging;
pub mod marker;
pub mod name_gen;
pub mod query;
pub mod registry;
pub mod spec;
pub mod value;

pub use error::{FilterError, FilterResult};
pub use expr::{CmpOp, Expr};
pub use filter::{ExpressionGenerator, FilterContext, FilterDescription, FilterKind, PropertyFilter};
pub use join::{ConditionType, Join, JoinKind};
pub use logic::FilterLogic;
pub use name_gen::QueryNameGenerator;
pub use query::{Direction, QueryBuilder};
pub use registry::FilterRegistry;
pub use spec::{FilterSpec, LogicOp, SpecMap};
pub use value::FilterValue;
