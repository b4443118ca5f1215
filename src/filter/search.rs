//! Exact-match search filter for string properties.

use smol_str::SmolStr;

use super::{
    property_field, property_leaf, FilterContext, FilterDescription, Properties, PropertyFilter,
};
use crate::error::FilterResult;
use crate::expr::Expr;
use crate::name_gen::QueryNameGenerator;
use crate::query::QueryBuilder;

/// Matches a string property exactly, e.g. `text=hello`. Supports nested
/// property paths, joining through the association.
#[derive(Debug)]
pub struct SearchFilter {
    properties: Properties<()>,
}

impl SearchFilter {
    /// An exact-match search filter over the given properties.
    pub fn new(properties: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        Self {
            properties: properties.into_iter().map(|p| (p.into(), ())).collect(),
        }
    }
}

impl PropertyFilter for SearchFilter {
    fn name(&self) -> &'static str {
        "SearchFilter"
    }

    fn description(&self, _resource: &str) -> Vec<FilterDescription> {
        self.properties
            .keys()
            .map(|p| FilterDescription::optional(p.clone(), p.clone(), "string"))
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
            let Some(value) = map.get(property.as_str()).and_then(|v| v.scalar_value()) else {
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
    use crate::join::JoinKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_exact_match() {
        let filter = SearchFilter::new(["text"]);
        let mut qb = QueryBuilder::new("TestEntity", "o");
        let mut r#gen = QueryNameGenerator::new();
        let ctx = FilterContext::new(serde_json::from_str(r#"{"text": "hello"}"#).unwrap());
        filter.apply(&mut qb, &mut r#gen, "TestEntity", None, &ctx).unwrap();
        assert_eq!(qb.where_part().unwrap().to_string(), "o.text = :text_p1");
    }

    #[test]
    fn test_nested_property_adds_inner_join() {
        let filter = SearchFilter::new(["toMany.text"]);
        let mut qb = QueryBuilder::new("TestEntity", "o");
        let mut r#gen = QueryNameGenerator::new();
        let ctx =
            FilterContext::new(serde_json::from_str(r#"{"toMany.text": "hello"}"#).unwrap());
        filter.apply(&mut qb, &mut r#gen, "TestEntity", None, &ctx).unwrap();
        assert_eq!(
            qb.where_part().unwrap().to_string(),
            "toMany_a1.text = :text_p1"
        );
        let join = qb.joins().values().flatten().next().unwrap();
        assert_eq!(join.kind, JoinKind::Inner);
        assert_eq!(join.join, "o.toMany");
    }
}
