//! Ordering filter: `order[property]=asc|desc`.
//!
//! Ordering-only; the compositor excludes it from logic composition.

use smol_str::SmolStr;

use super::{FilterContext, FilterDescription, FilterKind, Properties, PropertyFilter};
use crate::error::FilterResult;
use crate::name_gen::QueryNameGenerator;
use crate::query::{Direction, QueryBuilder};

/// Specification key the order filter answers to.
pub const ORDER_PARAMETER: &str = "order";

/// Sorts the result set by configured properties.
#[derive(Debug)]
pub struct OrderFilter {
    properties: Properties<()>,
}

impl OrderFilter {
    /// An order filter over the given properties.
    pub fn new(properties: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        Self {
            properties: properties.into_iter().map(|p| (p.into(), ())).collect(),
        }
    }
}

impl PropertyFilter for OrderFilter {
    fn name(&self) -> &'static str {
        "OrderFilter"
    }

    fn kind(&self) -> FilterKind {
        FilterKind::Ordering
    }

    fn description(&self, _resource: &str) -> Vec<FilterDescription> {
        self.properties
            .keys()
            .map(|p| {
                FilterDescription::optional(p.clone(), format!("{ORDER_PARAMETER}[{p}]"), "asc|desc")
            })
            .collect()
    }

    fn apply(
        &self,
        qb: &mut QueryBuilder,
        _gen: &mut QueryNameGenerator,
        _resource: &str,
        _operation: Option<&str>,
        ctx: &FilterContext,
    ) -> FilterResult<()> {
        let Some(params) = ctx
            .filters_map()
            .and_then(|m| m.get(ORDER_PARAMETER))
            .and_then(|v| v.as_map())
        else {
            return Ok(());
        };
        for property in self.properties.keys() {
            let direction = match params.get(property.as_str()).and_then(|v| v.as_str()) {
                Some("asc") => Direction::Asc,
                Some("desc") => Direction::Desc,
                _ => continue,
            };
            let field = format!("{}.{property}", qb.root_alias());
            qb.add_order_by(field, direction);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_orders_without_touching_where() {
        let filter = OrderFilter::new(["dd"]);
        let mut qb = QueryBuilder::new("TestEntity", "o");
        let mut r#gen = QueryNameGenerator::new();
        let ctx = FilterContext::new(serde_json::from_str(r#"{"order": {"dd": "desc"}}"#).unwrap());
        filter.apply(&mut qb, &mut r#gen, "TestEntity", None, &ctx).unwrap();
        assert_eq!(qb.to_dql(), "SELECT o FROM TestEntity o ORDER BY o.dd DESC");
        assert_eq!(filter.kind(), FilterKind::Ordering);
    }
}
