//! Leaf filter contracts and the filter suite.
//!
//! A leaf filter is an independently authored unit that mutates the shared
//! [`QueryBuilder`](crate::QueryBuilder) to add one kind of predicate. Filters
//! only ever AND-append onto the WHERE clause; the compositor recovers their
//! output through marker-diff extraction. Filters that additionally implement
//! [`ExpressionGenerator`] hand their expressions back directly and skip the
//! marker protocol.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::error::FilterResult;
use crate::expr::Expr;
use crate::join::add_join_once;
use crate::name_gen::QueryNameGenerator;
use crate::query::QueryBuilder;
use crate::spec::{FilterSpec, SpecMap};

pub mod boolean;
pub mod date;
pub mod empty_or_null;
pub mod exists;
pub mod fake_join;
pub mod numeric;
pub mod order;
pub mod range;
pub mod search;

pub use boolean::BooleanFilter;
pub use date::{DateFilter, NullManagement};
pub use empty_or_null::EmptyOrNullFilter;
pub use exists::ExistsFilter;
pub use fake_join::{AddFakeLeftJoin, RemoveFakeLeftJoin, FAKE_JOIN};
pub use numeric::NumericFilter;
pub use order::OrderFilter;
pub use range::RangeFilter;
pub use search::SearchFilter;

/// Per-request context handed to every filter.
///
/// Carries the filter specification under `filters`, mirroring the shape the
/// surrounding framework delivers.
#[derive(Debug, Clone, Default)]
pub struct FilterContext {
    /// The filter specification for this application, if any.
    pub filters: Option<FilterSpec>,
}

impl FilterContext {
    /// Context carrying the given specification.
    pub fn new(filters: FilterSpec) -> Self {
        Self {
            filters: Some(filters),
        }
    }

    /// Context without any specification.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The specification as a map, if present and map-shaped.
    pub fn filters_map(&self) -> Option<&SpecMap> {
        self.filters.as_ref().and_then(FilterSpec::as_map)
    }
}

/// What a filter contributes to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Adds constraints to the WHERE clause; eligible for logic composition.
    Constraint,
    /// Only affects result ordering; excluded from logic composition.
    Ordering,
}

/// Description of one accepted specification parameter, for documentation
/// surfaces. Not consulted by the composition logic.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterDescription {
    /// The entity property the parameter constrains.
    pub property: SmolStr,
    /// The specification parameter name, e.g. `dd[before]`.
    pub parameter: SmolStr,
    /// Kind of value expected.
    pub value_kind: &'static str,
    /// Whether the parameter is required.
    pub required: bool,
}

impl FilterDescription {
    /// An optional parameter description.
    pub fn optional(
        property: impl Into<SmolStr>,
        parameter: impl Into<SmolStr>,
        value_kind: &'static str,
    ) -> Self {
        Self {
            property: property.into(),
            parameter: parameter.into(),
            value_kind,
            required: false,
        }
    }
}

/// The contract every leaf filter implements.
///
/// `apply` mutates the query by AND-appending predicates and possibly adding
/// joins and parameters. A filter must not retain a reference to the builder
/// beyond its own call.
pub trait PropertyFilter: Send + Sync {
    /// Stable type name, matched against the compositor's name pattern.
    fn name(&self) -> &'static str;

    /// What this filter contributes to a query.
    fn kind(&self) -> FilterKind {
        FilterKind::Constraint
    }

    /// Parameter descriptions for `resource`.
    fn description(&self, resource: &str) -> Vec<FilterDescription>;

    /// Apply this filter to the query under construction.
    fn apply(
        &self,
        qb: &mut QueryBuilder,
        r#gen: &mut QueryNameGenerator,
        resource: &str,
        operation: Option<&str>,
        ctx: &FilterContext,
    ) -> FilterResult<()>;

    /// The expression-generator capability, when implemented.
    ///
    /// The compositor checks this once per filter at resolution time and
    /// bypasses marker-diff extraction for filters that have it.
    fn expression_generator(&self) -> Option<&dyn ExpressionGenerator> {
        None
    }
}

/// Capability to hand expressions back directly instead of appending them to
/// the WHERE clause. Joins and parameters are still added to the builder.
pub trait ExpressionGenerator: Send + Sync {
    /// Generate the expressions for this filter's part of the specification.
    fn generate_expressions(
        &self,
        qb: &mut QueryBuilder,
        r#gen: &mut QueryNameGenerator,
        resource: &str,
        operation: Option<&str>,
        ctx: &FilterContext,
    ) -> FilterResult<Vec<Expr>>;
}

/// Ordered property configuration shared by the concrete filters, mapping a
/// property name to filter-specific settings.
pub type Properties<T> = IndexMap<SmolStr, T>;

/// Resolve `property` to an aliased field reference, joining through the
/// first path segment when the property is nested.
pub(crate) fn property_field(
    qb: &mut QueryBuilder,
    r#gen: &mut QueryNameGenerator,
    property: &str,
) -> SmolStr {
    match property.split_once('.') {
        Some((association, rest)) => {
            let alias = add_join_once(qb, r#gen, association);
            SmolStr::new(format!("{alias}.{rest}"))
        }
        None => SmolStr::new(format!("{}.{property}", qb.root_alias())),
    }
}

/// The final segment of a property path, used for parameter naming.
pub(crate) fn property_leaf(property: &str) -> &str {
    property.rsplit('.').next().unwrap_or(property)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_property_field_plain() {
        let mut qb = QueryBuilder::new("TestEntity", "o");
        let mut r#gen = QueryNameGenerator::new();
        assert_eq!(property_field(&mut qb, &mut r#gen, "dd"), "o.dd");
        assert!(qb.joins().is_empty());
    }

    #[test]
    fn test_property_field_nested_joins_once() {
        let mut qb = QueryBuilder::new("TestEntity", "o");
        let mut r#gen = QueryNameGenerator::new();
        assert_eq!(property_field(&mut qb, &mut r#gen, "toMany.text"), "toMany_a1.text");
        assert_eq!(property_field(&mut qb, &mut r#gen, "toMany.numb"), "toMany_a1.numb");
        assert_eq!(qb.joins().values().flatten().count(), 1);
    }

    #[test]
    fn test_property_leaf() {
        assert_eq!(property_leaf("toMany.text"), "text");
        assert_eq!(property_leaf("dd"), "dd");
    }
}
