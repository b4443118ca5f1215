//! Filter matching properties that are empty or NULL.
//!
//! `emptyOrNull[text]=true` matches rows where `text` is `''` or NULL;
//! `false` requires a non-empty, non-null value. Implements the
//! expression-generator capability, so the compositor receives its
//! expressions directly instead of diffing the WHERE clause.

use smol_str::SmolStr;

use super::{
    property_field, property_leaf, ExpressionGenerator, FilterContext, FilterDescription,
    Properties, PropertyFilter,
};
use crate::error::FilterResult;
use crate::expr::Expr;
use crate::name_gen::QueryNameGenerator;
use crate::query::QueryBuilder;
use crate::value::FilterValue;

/// Specification key the empty-or-null filter answers to.
pub const EMPTY_OR_NULL_PARAMETER: &str = "emptyOrNull";

/// Matches string properties on emptiness or NULL-ness.
#[derive(Debug)]
pub struct EmptyOrNullFilter {
    properties: Properties<()>,
}

impl EmptyOrNullFilter {
    /// An empty-or-null filter over the given properties.
    pub fn new(properties: impl IntoIterator<Item = impl Into<SmolStr>>) -> Self {
        Self {
            properties: properties.into_iter().map(|p| (p.into(), ())).collect(),
        }
    }
}

impl PropertyFilter for EmptyOrNullFilter {
    fn name(&self) -> &'static str {
        "EmptyOrNullFilter"
    }

    fn description(&self, _resource: &str) -> Vec<FilterDescription> {
        self.properties
            .keys()
            .map(|p| {
                FilterDescription::optional(
                    p.clone(),
                    format!("{EMPTY_OR_NULL_PARAMETER}[{p}]"),
                    "bool",
                )
            })
            .collect()
    }

    fn apply(
        &self,
        qb: &mut QueryBuilder,
        r#gen: &mut QueryNameGenerator,
        resource: &str,
        operation: Option<&str>,
        ctx: &FilterContext,
    ) -> FilterResult<()> {
        for expr in self.generate_expressions(qb, r#gen, resource, operation, ctx)? {
            qb.and_where(expr);
        }
        Ok(())
    }

    fn expression_generator(&self) -> Option<&dyn ExpressionGenerator> {
        Some(self)
    }
}

impl ExpressionGenerator for EmptyOrNullFilter {
    fn generate_expressions(
        &self,
        qb: &mut QueryBuilder,
        r#gen: &mut QueryNameGenerator,
        _resource: &str,
        _operation: Option<&str>,
        ctx: &FilterContext,
    ) -> FilterResult<Vec<Expr>> {
        let Some(params) = ctx
            .filters_map()
            .and_then(|m| m.get(EMPTY_OR_NULL_PARAMETER))
            .and_then(|v| v.as_map())
        else {
            return Ok(Vec::new());
        };
        let mut expressions = Vec::new();
        for property in self.properties.keys() {
            let Some(wanted) = params.get(property.as_str()).and_then(|v| v.as_bool()) else {
                continue;
            };
            let field = property_field(qb, r#gen, property);
            let param = r#gen.parameter_name(property_leaf(property));
            qb.set_parameter(param.clone(), FilterValue::String(String::new()));
            let empty = Expr::eq(field.clone(), param);
            let expr = if wanted {
                Expr::or_x([empty, Expr::is_null(field)])
            } else {
                Expr::and_x([Expr::not(empty), Expr::is_not_null(field)])
            };
            expressions.push(expr);
        }
        Ok(expressions)
    }
}
