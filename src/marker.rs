//! Marker-diff extraction of leaf-filter output.
//!
//! Leaf filters expose no structured return value; they only AND-append onto
//! the shared WHERE clause. To recover exactly what a group of filters added,
//! a unique marker sentinel is installed as the WHERE root before the filters
//! run. Because appends always extend the tail of a left-leaning tree, the
//! marker ends up as the leftmost leaf of the combined tree, and everything
//! to its right is what the filters contributed.
//!
//! Filters replacing the WHERE clause outright violate this protocol; the
//! violation is detected and reported as a fatal error, never silently
//! corrupted into a wrong query.

use crate::error::{FilterError, FilterResult};
use crate::expr::Expr;
use crate::query::QueryBuilder;

/// Run `action` against the builder and return the expressions it appended to
/// the WHERE clause, in append order.
///
/// The WHERE clause is restored to its previous value afterwards; joins and
/// parameters added by the action persist.
pub fn collect_appended<F>(qb: &mut QueryBuilder, action: F) -> FilterResult<Vec<Expr>>
where
    F: FnOnce(&mut QueryBuilder) -> FilterResult<()>,
{
    let old = qb.take_where();
    let marker = Expr::marker();
    qb.set_where(Some(marker.clone()));

    let outcome = action(qb);
    let combined = qb.take_where();
    // Restore before error propagation so the builder is left consistent.
    qb.set_where(old);
    outcome?;

    let Some(combined) = combined else {
        // The action cleared the WHERE clause, taking the marker with it.
        return Err(FilterError::MarkerNotFound);
    };
    if combined == marker {
        tracing::trace!("no expressions appended");
        return Ok(Vec::new());
    }
    let found = split_after_marker(combined, &marker)?;
    tracing::trace!(count = found.len(), "expressions recovered after marker");
    Ok(found)
}

/// Walk `combined` down its leftmost spine until the marker is found, and
/// collect everything appended after it, preserving order.
fn split_after_marker(combined: Expr, marker: &Expr) -> FilterResult<Vec<Expr>> {
    let children = match combined {
        Expr::And(parts) | Expr::Or(parts) => parts,
        other => {
            return Err(FilterError::UnexpectedExpression {
                dql: other.to_string(),
            });
        }
    };
    let mut iter = children.into_iter();
    let Some(first) = iter.next() else {
        return Err(FilterError::MarkerNotFound);
    };
    if &first == marker {
        return Ok(iter.collect());
    }
    let mut found = split_after_marker(first, marker)?;
    found.extend(iter);
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::CmpOp;
    use pretty_assertions::assert_eq;

    fn builder() -> QueryBuilder {
        QueryBuilder::new("TestEntity", "o")
    }

    #[test]
    fn test_no_appends_yields_empty() {
        let mut qb = builder();
        let found = collect_appended(&mut qb, |_| Ok(())).unwrap();
        assert!(found.is_empty());
        assert_eq!(qb.where_part(), None);
    }

    #[test]
    fn test_collects_and_appended_expressions_in_order() {
        let mut qb = builder();
        let found = collect_appended(&mut qb, |qb| {
            qb.and_where(Expr::eq("o.a", "a_p1"));
            qb.and_where(Expr::eq("o.b", "b_p2"));
            Ok(())
        })
        .unwrap();
        assert_eq!(found, vec![Expr::eq("o.a", "a_p1"), Expr::eq("o.b", "b_p2")]);
    }

    #[test]
    fn test_collects_through_or_wrapping() {
        // or_where wraps the whole previous tree, nesting the marker one
        // level down on the left.
        let mut qb = builder();
        let found = collect_appended(&mut qb, |qb| {
            qb.and_where(Expr::eq("o.a", "a_p1"));
            qb.or_where(Expr::eq("o.b", "b_p2"));
            qb.and_where(Expr::eq("o.c", "c_p3"));
            Ok(())
        })
        .unwrap();
        assert_eq!(
            found,
            vec![
                Expr::eq("o.a", "a_p1"),
                Expr::eq("o.b", "b_p2"),
                Expr::eq("o.c", "c_p3"),
            ]
        );
    }

    #[test]
    fn test_restores_previous_where() {
        let mut qb = builder();
        qb.and_where(Expr::cmp("o.dd", CmpOp::Gte, "dd_p1"));
        let before = qb.where_part().cloned();
        let _ = collect_appended(&mut qb, |qb| {
            qb.and_where(Expr::eq("o.a", "a_p2"));
            Ok(())
        })
        .unwrap();
        assert_eq!(qb.where_part(), before.as_ref());
    }

    #[test]
    fn test_joins_and_parameters_persist() {
        let mut qb = builder();
        let _ = collect_appended(&mut qb, |qb| {
            qb.set_parameter("a_p1", 7i64);
            qb.add_join(crate::join::Join::inner("o.toMany").with_alias("toMany_a1"));
            qb.and_where(Expr::eq("toMany_a1.a", "a_p1"));
            Ok(())
        })
        .unwrap();
        assert!(qb.parameter("a_p1").is_some());
        assert_eq!(qb.joins().values().flatten().count(), 1);
    }

    #[test]
    fn test_overwriting_filter_is_detected() {
        let mut qb = builder();
        let err = collect_appended(&mut qb, |qb| {
            // Hostile filter: replaces the WHERE clause instead of appending.
            qb.set_where(Some(Expr::eq("o.a", "a_p1")));
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, FilterError::UnexpectedExpression { .. }));
    }

    #[test]
    fn test_clearing_filter_loses_the_marker() {
        let mut qb = builder();
        let err = collect_appended(&mut qb, |qb| {
            qb.set_where(None);
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, FilterError::MarkerNotFound));
    }

    #[test]
    fn test_empty_group_loses_the_marker() {
        let mut qb = builder();
        let err = collect_appended(&mut qb, |qb| {
            qb.set_where(Some(Expr::Or(Vec::new())));
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, FilterError::MarkerNotFound));
    }

    #[test]
    fn test_insertion_before_the_marker_is_detected() {
        let mut qb = builder();
        let err = collect_appended(&mut qb, |qb| {
            // Hostile filter: rebuilds the WHERE clause with its own
            // expression in front of the marker.
            let current = qb.take_where().unwrap();
            qb.set_where(Some(Expr::and_x([Expr::eq("o.a", "a_p1"), current])));
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, FilterError::UnexpectedExpression { .. }));
    }

    #[test]
    fn test_action_error_propagates_and_where_is_restored() {
        let mut qb = builder();
        qb.and_where(Expr::eq("o.a", "a_p1"));
        let before = qb.where_part().cloned();
        let err = collect_appended(&mut qb, |_| Err(FilterError::MissingFilters)).unwrap_err();
        assert!(matches!(err, FilterError::MissingFilters));
        assert_eq!(qb.where_part(), before.as_ref());
    }
}
