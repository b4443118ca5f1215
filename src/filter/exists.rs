//! Existence filter: `exists[property]=true|false`.

use smol_str::SmolStr;

use super::{property_field, FilterContext, FilterDescription, Properties, PropertyFilter};
use crate::error::FilterResult;
use crate::expr::Expr;
use crate::name_gen::QueryNameGenerator;
use crate::query::QueryBuilder;

/// Specification key the exists filter answers to.
pub const EXISTS_PARAMETER: &str = "exists";

/// Constrains nullable properties on presence: `exists[dd]=true` requires
/// `dd IS NOT NULL`, `exists[dd]=false` requires `dd IS NULL`.
#[derive(Debug)]
pub struct ExistsFilter {
    properties: Properties<()>,
}

impl ExistsFilter {
    /// An exists filter over the given nullable properties.
    pub fn new(properties: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        Self {
            properties: properties.into_iter().map(|p| (p.into(), ())).collect(),
        }
    }
}

impl PropertyFilter for ExistsFilter {
    fn name(&self) -> &'static str {
        "ExistsFilter"
    }

    fn description(&self, _resource: &str) -> Vec<FilterDescription> {
        self.properties
            .keys()
            .map(|p| {
                FilterDescription::optional(p.clone(), format!("{EXISTS_PARAMETER}[{p}]"), "bool")
            })
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
        let Some(params) = ctx
            .filters_map()
            .and_then(|m| m.get(EXISTS_PARAMETER))
            .and_then(|v| v.as_map())
        else {
            return Ok(());
        };
        for property in self.properties.keys() {
            let Some(wanted) = params.get(property.as_str()).and_then(|v| v.as_bool()) else {
                continue;
            };
            let field = property_field(qb, r#gen, property);
            let expr = if wanted {
                Expr::is_not_null(field)
            } else {
                Expr::is_null(field)
            };
            qb.and_where(expr);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_true_and_false() {
        let filter = ExistsFilter::new(["bool", "dd"]);
        let mut qb = QueryBuilder::new("TestEntity", "o");
        let mut r#gen = QueryNameGenerator::new();
        let ctx = FilterContext::new(
            serde_json::from_str(r#"{"exists": {"bool": "true", "dd": "false"}}"#).unwrap(),
        );
        filter.apply(&mut qb, &mut r#gen, "TestEntity", None, &ctx).unwrap();
        assert_eq!(
            qb.where_part().unwrap().to_string(),
            "o.bool IS NOT NULL AND o.dd IS NULL"
        );
    }

    #[test]
    fn test_no_exists_key_is_a_no_op() {
        let filter = ExistsFilter::new(["bool"]);
        let mut qb = QueryBuilder::new("TestEntity", "o");
        let mut r#gen = QueryNameGenerator::new();
        let ctx = FilterContext::new(serde_json::from_str(r#"{"bool": "true"}"#).unwrap());
        filter.apply(&mut qb, &mut r#gen, "TestEntity", None, &ctx).unwrap();
        assert_eq!(qb.where_part(), None);
    }
}
