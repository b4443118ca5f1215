//! Date filter with configurable null handling.

use chrono::NaiveDate;
use smol_str::SmolStr;

use super::{
    property_field, property_leaf, FilterContext, FilterDescription, Properties, PropertyFilter,
};
use crate::error::FilterResult;
use crate::expr::{CmpOp, Expr};
use crate::name_gen::QueryNameGenerator;
use crate::query::QueryBuilder;
use crate::spec::FilterSpec;

/// How a date comparison treats NULL values of the property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullManagement {
    /// Require the property to be non-null alongside every comparison.
    ///
    /// Each comparison is grouped as `property IS NOT NULL AND comparison` so
    /// the pieces stay correct when placed under OR by the compositor.
    ExcludeNull,
    /// NULL values also match `before` / `strictly_before` comparisons.
    /// `after`-side comparisons then explicitly exclude NULL.
    IncludeNullBefore,
    /// NULL values also match `after` / `strictly_after` comparisons.
    /// `before`-side comparisons then explicitly exclude NULL.
    IncludeNullAfter,
    /// NULL values match every comparison.
    IncludeNullBeforeAndAfter,
}

/// Filters a date property with `before`, `strictly_before`, `after` and
/// `strictly_after` parameters, e.g. `dd[after]=2021-01-01`.
#[derive(Debug)]
pub struct DateFilter {
    properties: Properties<Option<NullManagement>>,
}

impl DateFilter {
    /// A date filter over the given properties.
    pub fn new(
        properties: impl IntoIterator<Item = (impl Into<SmolStr>, Option<NullManagement>)>,
    ) -> Self {
        Self {
            properties: properties
                .into_iter()
                .map(|(p, n)| (p.into(), n))
                .collect(),
        }
    }

    /// Accepted parameters in their fixed application order. Comparisons are
    /// produced in this order regardless of specification order, so parameter
    /// numbering stays stable.
    const PARAMETERS: [(&'static str, CmpOp); 4] = [
        ("before", CmpOp::Lte),
        ("strictly_before", CmpOp::Lt),
        ("after", CmpOp::Gte),
        ("strictly_after", CmpOp::Gt),
    ];
}

impl PropertyFilter for DateFilter {
    fn name(&self) -> &'static str {
        "DateFilter"
    }

    fn description(&self, _resource: &str) -> Vec<FilterDescription> {
        self.properties
            .keys()
            .flat_map(|p| {
                ["before", "strictly_before", "after", "strictly_after"]
                    .into_iter()
                    .map(move |param| {
                        FilterDescription::optional(p.clone(), format!("{p}[{param}]"), "date")
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
        for (property, null_management) in &self.properties {
            let Some(FilterSpec::Map(params)) = map.get(property.as_str()) else {
                continue;
            };
            for (key, op) in Self::PARAMETERS {
                let Some(date) = params
                    .get(key)
                    .and_then(|v| v.as_str())
                    .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                else {
                    continue;
                };
                let field = property_field(qb, r#gen, property);
                let param = r#gen.parameter_name(property_leaf(property));
                qb.set_parameter(param.clone(), date);
                let cmp = Expr::cmp(field.clone(), op, param);
                let expr = match null_management {
                    None => cmp,
                    Some(NullManagement::ExcludeNull) => {
                        Expr::and_x([Expr::is_not_null(field), cmp])
                    }
                    Some(nm) => {
                        let after = matches!(op, CmpOp::Gte | CmpOp::Gt);
                        let includes_null = match nm {
                            NullManagement::IncludeNullAfter => after,
                            NullManagement::IncludeNullBefore => !after,
                            _ => true,
                        };
                        if includes_null {
                            Expr::or_x([cmp, Expr::is_null(field)])
                        } else {
                            // The null-including side of the configuration
                            // implies the other side must exclude NULL.
                            Expr::and_x([cmp, Expr::is_not_null(field)])
                        }
                    }
                };
                qb.and_where(expr);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FilterValue;
    use pretty_assertions::assert_eq;

    fn apply(filter: &DateFilter, json: &str) -> QueryBuilder {
        let mut qb = QueryBuilder::new("TestEntity", "o");
        let mut r#gen = QueryNameGenerator::new();
        let ctx = FilterContext::new(serde_json::from_str(json).unwrap());
        filter.apply(&mut qb, &mut r#gen, "TestEntity", Some("get"), &ctx).unwrap();
        qb
    }

    #[test]
    fn test_before_and_after() {
        let filter = DateFilter::new([("dd", None)]);
        let qb = apply(
            &filter,
            r#"{"dd": {"before": "2021-01-01", "after": "2021-03-03"}}"#,
        );
        assert_eq!(
            qb.where_part().unwrap().to_string(),
            "o.dd <= :dd_p1 AND o.dd >= :dd_p2"
        );
        assert_eq!(
            qb.parameter("dd_p1"),
            Some(&FilterValue::Date(NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()))
        );
    }

    #[test]
    fn test_include_null_after() {
        // `before` is always applied first, regardless of specification
        // order, and picks up the complementary NOT NULL guard.
        let filter = DateFilter::new([("dd", Some(NullManagement::IncludeNullAfter))]);
        let qb = apply(
            &filter,
            r#"{"dd": {"after": "2021-01-01", "before": "2021-03-03"}}"#,
        );
        assert_eq!(
            qb.where_part().unwrap().to_string(),
            "o.dd <= :dd_p1 AND o.dd IS NOT NULL AND (o.dd >= :dd_p2 OR o.dd IS NULL)"
        );
        assert_eq!(
            qb.parameter("dd_p1"),
            Some(&FilterValue::Date(NaiveDate::from_ymd_opt(2021, 3, 3).unwrap()))
        );
    }

    #[test]
    fn test_exclude_null_groups_each_comparison() {
        let filter = DateFilter::new([("dd", Some(NullManagement::ExcludeNull))]);
        let qb = apply(&filter, r#"{"dd": {"after": "2021-01-01"}}"#);
        assert_eq!(
            qb.where_part().unwrap().to_string(),
            "o.dd IS NOT NULL AND o.dd >= :dd_p1"
        );
    }

    #[test]
    fn test_ignores_unconfigured_and_malformed() {
        let filter = DateFilter::new([("dd", None)]);
        let qb = apply(&filter, r#"{"other": {"after": "2021-01-01"}, "dd": {"after": "nonsense"}}"#);
        assert_eq!(qb.where_part(), None);
    }
}
