//! Equality filter for boolean properties.

use smol_str::SmolStr;

use super::{
    property_field, property_leaf, FilterContext, FilterDescription, Properties, PropertyFilter,
};
use crate::error::FilterResult;
use crate::expr::Expr;
use crate::name_gen::QueryNameGenerator;
use crate::query::QueryBuilder;
use crate::value::FilterValue;

/// Matches a boolean property, e.g. `bool=true`.
#[derive(Debug)]
pub struct BooleanFilter {
    properties: Properties<()>,
}

impl BooleanFilter {
    /// A boolean filter over the given properties.
    pub fn new(properties: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        Self {
            properties: properties.into_iter().map(|p| (p.into(), ())).collect(),
        }
    }
}

impl PropertyFilter for BooleanFilter {
    fn name(&self) -> &'static str {
        "BooleanFilter"
    }

    fn description(&self, _resource: &str) -> Vec<FilterDescription> {
        self.properties
            .keys()
            .map(|p| FilterDescription::optional(p.clone(), p.clone(), "bool"))
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
            let Some(value) = map.get(property.as_str()).and_then(|v| v.as_bool()) else {
                continue;
            };
            let field = property_field(qb, r#gen, property);
            let param = r#gen.parameter_name(property_leaf(property));
            qb.set_parameter(param.clone(), FilterValue::Bool(value));
            qb.and_where(Expr::eq(field, param));
        }
        Ok(())
    }
}
