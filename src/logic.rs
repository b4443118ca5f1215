//! The logic compositor.
//!
//! [`FilterLogic`] sits in a resource's filter chain like any other filter
//! and interprets the reserved specification keys `and`, `or` and `not`. It
//! resolves the resource's other filters through the registry, runs them
//! against the nested sub-specifications, recovers what each one produced
//! (marker-diff extraction, or directly for expression generators) and
//! recombines the pieces under the requested boolean operators.
//!
//! Within a group, keys that are neither logic operators nor all-digit
//! repetition markers are handed to the leaf filters as one sub-specification.
//! All-digit keys repeat the same filter with different arguments, so the
//! group `{or: {0: {dd: ...}, 1: {dd: ...}}}` produces one disjunction with
//! two date constraints.
//!
//! `not` distributes over its members: every expression composed inside it is
//! negated individually rather than negating the group as a whole.

use std::sync::Arc;

use regex_lite::Regex;
use smol_str::SmolStr;

use crate::error::{FilterError, FilterResult};
use crate::expr::Expr;
use crate::filter::{
    ExpressionGenerator, FilterContext, FilterDescription, FilterKind, PropertyFilter,
};
use crate::join::inner_joins_to_left;
use crate::marker::collect_appended;
use crate::name_gen::QueryNameGenerator;
use crate::query::QueryBuilder;
use crate::registry::FilterRegistry;
use crate::spec::{FilterSpec, LogicOp, SpecMap};

/// A leaf filter resolved for one composition run.
///
/// The expression-generator capability is probed once here instead of on
/// every group.
struct ResolvedFilter {
    id: SmolStr,
    filter: Arc<dyn PropertyFilter>,
    generates: bool,
}

/// Combines the other filters of a resource under `and`, `or` and `not`.
pub struct FilterLogic {
    registry: Arc<FilterRegistry>,
    /// Id this compositor is configured under, skipped during resolution.
    id: SmolStr,
    name_pattern: Option<Regex>,
    coerce_joins: bool,
}

impl FilterLogic {
    /// A compositor resolving filters from `registry`, configured there under
    /// `id`.
    pub fn new(registry: Arc<FilterRegistry>, id: impl Into<SmolStr>) -> Self {
        Self {
            registry,
            id: id.into(),
            name_pattern: None,
            coerce_joins: false,
        }
    }

    /// Only compose filters whose [`name`](PropertyFilter::name) matches
    /// `pattern`. Others keep working outside the logic keys but are ignored
    /// inside them.
    pub fn name_pattern(mut self, pattern: Regex) -> Self {
        self.name_pattern = Some(pattern);
        self
    }

    /// Rewrite INNER joins to LEFT joins after logic was applied.
    ///
    /// Under OR, a constraint on a joined association must not discard rows
    /// that satisfy another branch; an INNER join would. The rewrite only
    /// happens when composition produced at least one expression.
    pub fn coerce_inner_joins(mut self, coerce: bool) -> Self {
        self.coerce_joins = coerce;
        self
    }

    /// Resolve the leaf filters participating in composition for `resource`.
    fn resolve(&self, resource: &str, operation: Option<&str>) -> Vec<ResolvedFilter> {
        let mut resolved = Vec::new();
        for id in self.registry.filter_ids_for(resource, operation) {
            if *id == self.id {
                continue;
            }
            let Some(filter) = self.registry.filter(id) else {
                tracing::debug!(filter = %id, "configured filter not registered, skipping");
                continue;
            };
            if filter.kind() != FilterKind::Constraint {
                continue;
            }
            if let Some(pattern) = &self.name_pattern {
                if !pattern.is_match(filter.name()) {
                    tracing::trace!(filter = %id, name = filter.name(), "name pattern mismatch");
                    continue;
                }
            }
            resolved.push(ResolvedFilter {
                id: id.clone(),
                filter: Arc::clone(filter),
                generates: filter.expression_generator().is_some(),
            });
        }
        resolved
    }

    /// Run every resolved filter against `sub` and return what they produced.
    fn collect(
        &self,
        qb: &mut QueryBuilder,
        r#gen: &mut QueryNameGenerator,
        resource: &str,
        operation: Option<&str>,
        sub: &SpecMap,
        resolved: &[ResolvedFilter],
    ) -> FilterResult<Vec<Expr>> {
        let ctx = FilterContext::new(FilterSpec::Map(sub.clone()));
        let mut expressions = Vec::new();
        for entry in resolved {
            let produced = if entry.generates {
                match entry.filter.expression_generator() {
                    Some(generator) => {
                        generator.generate_expressions(qb, r#gen, resource, operation, &ctx)?
                    }
                    None => Vec::new(),
                }
            } else {
                collect_appended(qb, |qb| {
                    entry.filter.apply(qb, r#gen, resource, operation, &ctx)
                })?
            };
            if !produced.is_empty() {
                tracing::trace!(filter = %entry.id, count = produced.len(), "filter contributed");
            }
            expressions.extend(produced);
        }
        Ok(expressions)
    }

    /// Compose one specification group into a list of expressions.
    ///
    /// All-digit keys are collected eagerly as they are encountered; the
    /// remaining non-logic keys are gathered into one sub-specification and
    /// collected next; logic operators are composed last, in encounter order
    /// (for operators lifted out of an all-digit group: `and`, `or`, `not`).
    /// Scalar values under logic and all-digit keys are ignored.
    fn compose(
        &self,
        qb: &mut QueryBuilder,
        r#gen: &mut QueryNameGenerator,
        resource: &str,
        operation: Option<&str>,
        group: &SpecMap,
        resolved: &[ResolvedFilter],
    ) -> FilterResult<Vec<Expr>> {
        let mut expressions = Vec::new();
        let mut assoc = SpecMap::new();
        let mut logics: Vec<(LogicOp, SpecMap)> = Vec::new();

        for (key, value) in group {
            if let Some(op) = LogicOp::parse(key) {
                match value.as_map() {
                    Some(sub) => logics.push((op, sub.clone())),
                    None => tracing::debug!(key = %key, "scalar under logic operator, ignored"),
                }
            } else if FilterSpec::is_repetition_key(key) {
                let Some(sub) = value.as_map() else {
                    tracing::debug!(key = %key, "scalar under repetition key, ignored");
                    continue;
                };
                let plain: SpecMap = sub
                    .iter()
                    .filter(|(k, _)| LogicOp::parse(k).is_none())
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                if !plain.is_empty() {
                    expressions
                        .extend(self.collect(qb, r#gen, resource, operation, &plain, resolved)?);
                }
                for op in [LogicOp::And, LogicOp::Or, LogicOp::Not] {
                    if let Some(value) = sub.get(op.key()) {
                        match value.as_map() {
                            Some(nested) => logics.push((op, nested.clone())),
                            None => {
                                tracing::debug!(key = op.key(), "scalar under logic operator, ignored");
                            }
                        }
                    }
                }
            } else {
                assoc.insert(key.clone(), value.clone());
            }
        }

        if !assoc.is_empty() {
            expressions.extend(self.collect(qb, r#gen, resource, operation, &assoc, resolved)?);
        }

        for (op, sub) in logics {
            let inner = self.compose(qb, r#gen, resource, operation, &sub, resolved)?;
            match op {
                LogicOp::Not => expressions.extend(inner.into_iter().map(Expr::not)),
                _ if inner.is_empty() => {}
                LogicOp::And => expressions.push(Expr::And(inner)),
                LogicOp::Or => expressions.push(Expr::Or(inner)),
            }
        }

        Ok(expressions)
    }
}

impl PropertyFilter for FilterLogic {
    fn name(&self) -> &'static str {
        "FilterLogic"
    }

    fn description(&self, _resource: &str) -> Vec<FilterDescription> {
        Vec::new()
    }

    fn apply(
        &self,
        qb: &mut QueryBuilder,
        r#gen: &mut QueryNameGenerator,
        resource: &str,
        operation: Option<&str>,
        ctx: &FilterContext,
    ) -> FilterResult<()> {
        let Some(map) = ctx.filters_map() else {
            return Err(FilterError::MissingFilters);
        };
        let resolved = self.resolve(resource, operation);
        tracing::debug!(
            resource,
            operation,
            filters = resolved.len(),
            "composing logic"
        );

        let mut applied = false;
        for op in [LogicOp::And, LogicOp::Not, LogicOp::Or] {
            let Some(sub) = map.get(op.key()).and_then(FilterSpec::as_map) else {
                continue;
            };
            let expressions = self.compose(qb, r#gen, resource, operation, sub, &resolved)?;
            applied |= !expressions.is_empty();
            for expression in expressions {
                match op {
                    LogicOp::And => qb.and_where(expression),
                    LogicOp::Not => qb.and_where(Expr::not(expression)),
                    LogicOp::Or => qb.or_where(expression),
                }
            }
        }

        if applied && self.coerce_joins {
            inner_joins_to_left(qb);
        }
        Ok(())
    }

    fn expression_generator(&self) -> Option<&dyn ExpressionGenerator> {
        Some(self)
    }
}

impl ExpressionGenerator for FilterLogic {
    /// Compose the whole specification group into expressions, for use as a
    /// member of an enclosing composition.
    fn generate_expressions(
        &self,
        qb: &mut QueryBuilder,
        r#gen: &mut QueryNameGenerator,
        resource: &str,
        operation: Option<&str>,
        ctx: &FilterContext,
    ) -> FilterResult<Vec<Expr>> {
        let Some(map) = ctx.filters_map() else {
            return Err(FilterError::MissingFilters);
        };
        let resolved = self.resolve(resource, operation);
        self.compose(qb, r#gen, resource, operation, map, &resolved)
    }
}

impl std::fmt::Debug for FilterLogic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterLogic")
            .field("id", &self.id)
            .field(
                "name_pattern",
                &self.name_pattern.as_ref().map(Regex::as_str),
            )
            .field("coerce_joins", &self.coerce_joins)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{DateFilter, EmptyOrNullFilter, NumericFilter, OrderFilter};
    use pretty_assertions::assert_eq;

    fn registry() -> Arc<FilterRegistry> {
        let mut registry = FilterRegistry::new();
        registry.register("date", Arc::new(DateFilter::new([("dd", None)])));
        registry.register("numeric", Arc::new(NumericFilter::new(["numb"])));
        registry.register("order", Arc::new(OrderFilter::new(["dd"])));
        registry.register("empty", Arc::new(EmptyOrNullFilter::new(["text"])));
        registry.configure(
            "TestEntity",
            ["date", "numeric", "order", "empty", "logic", "missing"],
        );
        Arc::new(registry)
    }

    fn logic() -> FilterLogic {
        FilterLogic::new(registry(), "logic")
    }

    fn apply(logic: &FilterLogic, json: &str) -> QueryBuilder {
        let mut qb = QueryBuilder::new("TestEntity", "o");
        let mut r#gen = QueryNameGenerator::new();
        let ctx = FilterContext::new(serde_json::from_str(json).unwrap());
        logic
            .apply(&mut qb, &mut r#gen, "TestEntity", Some("get"), &ctx)
            .unwrap();
        qb
    }

    #[test]
    fn test_resolution_skips_self_missing_and_ordering() {
        let logic = logic();
        let resolved = logic.resolve("TestEntity", None);
        let ids: Vec<&str> = resolved.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["date", "numeric", "empty"]);
    }

    #[test]
    fn test_resolution_probes_generator_capability() {
        let logic = logic();
        let resolved = logic.resolve("TestEntity", None);
        let generates: Vec<bool> = resolved.iter().map(|r| r.generates).collect();
        assert_eq!(generates, vec![false, false, true]);
    }

    #[test]
    fn test_name_pattern_narrows_composition() {
        let logic = logic().name_pattern(Regex::new("^DateFilter$").unwrap());
        let resolved = logic.resolve("TestEntity", None);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].filter.name(), "DateFilter");
    }

    #[test]
    fn test_or_over_one_property() {
        let qb = apply(
            &logic(),
            r#"{"or": {"dd": {"before": "2021-01-01", "after": "2021-03-03"}}}"#,
        );
        assert_eq!(
            qb.where_part().unwrap().to_string(),
            "o.dd <= :dd_p1 OR o.dd >= :dd_p2"
        );
    }

    #[test]
    fn test_numbered_repetition_matches_plain_form() {
        let qb = apply(
            &logic(),
            r#"{"or": {"0": {"dd": {"before": "2021-01-01"}}, "1": {"dd": {"after": "2021-03-03"}}}}"#,
        );
        assert_eq!(
            qb.where_part().unwrap().to_string(),
            "o.dd <= :dd_p1 OR o.dd >= :dd_p2"
        );
    }

    #[test]
    fn test_not_distributes_over_members() {
        let qb = apply(
            &logic(),
            r#"{"not": {"dd": {"before": "2021-01-01", "after": "2021-03-03"}}}"#,
        );
        assert_eq!(
            qb.where_part().unwrap().to_string(),
            "NOT(o.dd <= :dd_p1) AND NOT(o.dd >= :dd_p2)"
        );
    }

    #[test]
    fn test_empty_group_is_dropped() {
        let qb = apply(&logic(), r#"{"and": {"or": {"unknown": "x"}}}"#);
        assert_eq!(qb.where_part(), None);
    }

    #[test]
    fn test_scalar_under_logic_key_is_ignored() {
        let qb = apply(&logic(), r#"{"or": ""}"#);
        assert_eq!(qb.where_part(), None);
    }

    #[test]
    fn test_missing_filters_is_an_error() {
        let logic = logic();
        let mut qb = QueryBuilder::new("TestEntity", "o");
        let mut r#gen = QueryNameGenerator::new();
        let err = logic
            .apply(&mut qb, &mut r#gen, "TestEntity", None, &FilterContext::empty())
            .unwrap_err();
        assert!(matches!(err, FilterError::MissingFilters));
    }

    #[test]
    fn test_generator_members_bypass_the_marker() {
        let qb = apply(&logic(), r#"{"or": {"emptyOrNull": {"text": "true"}}}"#);
        assert_eq!(
            qb.where_part().unwrap().to_string(),
            "o.text = :text_p1 OR o.text IS NULL"
        );
    }
}
