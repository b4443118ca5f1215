//! Equality filter for numeric properties.

use smol_str::SmolStr;

use super::{
    property_field, property_leaf, FilterContext, FilterDescription, Properties, PropertyFilter,
};
use crate::error::FilterResult;
use crate::expr::Expr;
use crate::name_gen::QueryNameGenerator;
use crate::query::QueryBuilder;

/// Matches a numeric property for equality, e.g. `numb=7.2`.
#[derive(Debug)]
pub struct NumericFilter {
    properties: Properties<()>,
}

impl NumericFilter {
    /// A numeric filter over the given properties.
    pub fn new(properties: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        Self {
            properties: properties.into_iter().map(|p| (p.into(), ())).collect(),
        }
    }
}

impl PropertyFilter for NumericFilter {
    fn name(&self) -> &'static str {
        "NumericFilter"
    }

    fn description(&self, _resource: &str) -> Vec<FilterDescription> {
        self.properties
            .keys()
            .map(|p| FilterDescription::optional(p.clone(), p.clone(), "number"))
            .collect()
    }

    fn apply(
        &self,
        qb: &mut QueryBuilder,
        r#gen: &mut QueryNameGenerator,
        _resource: &str,
        _operation: Option<&str>,
        ctx: &FilterContext,
    ) -> FilterResult<()> {
        let Some(map) = ctx.filters_map() else {
            return Ok(());
        };
        for property in self.properties.keys() {
            let Some(value) = map.get(property.as_str()).and_then(|v| v.as_number()) else {
                continue;
            };
            let field = property_field(qb, r#gen, property);
            let param = r#gen.parameter_name(property_leaf(property));
            qb.set_parameter(param.clone(), value);
            qb.and_where(Expr::eq(field, param));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FilterValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_equality_on_configured_property() {
        let filter = NumericFilter::new(["numb"]);
        let mut qb = QueryBuilder::new("TestEntity", "o");
        let mut r#gen = QueryNameGenerator::new();
        let ctx = FilterContext::new(serde_json::from_str(r#"{"numb": "7.2"}"#).unwrap());
        filter.apply(&mut qb, &mut r#gen, "TestEntity", None, &ctx).unwrap();
        assert_eq!(qb.where_part().unwrap().to_string(), "o.numb = :numb_p1");
        assert_eq!(qb.parameter("numb_p1"), Some(&FilterValue::Float(7.2)));
    }

    #[test]
    fn test_map_values_are_skipped() {
        // A map value belongs to a range-style filter, not this one.
        let filter = NumericFilter::new(["numb"]);
        let mut qb = QueryBuilder::new("TestEntity", "o");
        let mut r#gen = QueryNameGenerator::new();
        let ctx = FilterContext::new(serde_json::from_str(r#"{"numb": {"lte": "55"}}"#).unwrap());
        filter.apply(&mut qb, &mut r#gen, "TestEntity", None, &ctx).unwrap();
        assert_eq!(qb.where_part(), None);
    }
}
