//! Range filter with `lt`, `lte`, `gt`, `gte` and `between` parameters.

use smol_str::SmolStr;

use super::{
    property_field, property_leaf, FilterContext, FilterDescription, Properties, PropertyFilter,
};
use crate::error::FilterResult;
use crate::expr::{CmpOp, Expr};
use crate::name_gen::QueryNameGenerator;
use crate::query::QueryBuilder;
use crate::spec::FilterSpec;

/// Filters a numeric property by range, e.g. `numb[lte]=55&numb[gt]=2.7` or
/// `numb[between]=2..10`.
#[derive(Debug)]
pub struct RangeFilter {
    properties: Properties<()>,
}

impl RangeFilter {
    /// A range filter over the given properties.
    pub fn new(properties: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        Self {
            properties: properties.into_iter().map(|p| (p.into(), ())).collect(),
        }
    }

    fn comparison_op(key: &str) -> Option<CmpOp> {
        match key {
            "lt" => Some(CmpOp::Lt),
            "lte" => Some(CmpOp::Lte),
            "gt" => Some(CmpOp::Gt),
            "gte" => Some(CmpOp::Gte),
            _ => None,
        }
    }
}

impl PropertyFilter for RangeFilter {
    fn name(&self) -> &'static str {
        "RangeFilter"
    }

    fn description(&self, _resource: &str) -> Vec<FilterDescription> {
        self.properties
            .keys()
            .flat_map(|p| {
                ["lt", "lte", "gt", "gte", "between"].into_iter().map(move |param| {
                    FilterDescription::optional(p.clone(), format!("{p}[{param}]"), "number")
                })
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
        let Some(map) = ctx.filters_map() else {
            return Ok(());
        };
        for property in self.properties.keys() {
            let Some(FilterSpec::Map(params)) = map.get(property.as_str()) else {
                continue;
            };
            for (key, value) in params {
                if key == "between" {
                    let Some((min, max)) = value.as_str().and_then(|s| s.split_once("..")) else {
                        continue;
                    };
                    let (Some(min), Some(max)) = (
                        FilterSpec::String(min.to_string()).as_number(),
                        FilterSpec::String(max.to_string()).as_number(),
                    ) else {
                        continue;
                    };
                    let field = property_field(qb, r#gen, property);
                    let min_param = r#gen.parameter_name(property_leaf(property));
                    qb.set_parameter(min_param.clone(), min);
                    let max_param = r#gen.parameter_name(property_leaf(property));
                    qb.set_parameter(max_param.clone(), max);
                    qb.and_where(Expr::and_x([
                        Expr::cmp(field.clone(), CmpOp::Gte, min_param),
                        Expr::cmp(field, CmpOp::Lte, max_param),
                    ]));
                    continue;
                }
                let Some(op) = Self::comparison_op(key) else {
                    continue;
                };
                let Some(bound) = value.as_number() else {
                    continue;
                };
                let field = property_field(qb, r#gen, property);
                let param = r#gen.parameter_name(property_leaf(property));
                qb.set_parameter(param.clone(), bound);
                qb.and_where(Expr::cmp(field, op, param));
            }
        }
        Ok(())
    }
}
