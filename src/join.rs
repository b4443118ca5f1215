//! Join clauses and join-type handling.
//!
//! Besides the join model itself this module carries the two join-type fixes
//! the compositor depends on:
//!
//! - [`add_join_once`], the reuse-or-create helper leaf filters go through for
//!   nested property paths. It picks LEFT for new joins as soon as the query
//!   already holds any LEFT join, which is what the fake-join bracketing
//!   filters exploit.
//! - [`inner_joins_to_left`], the coercion pass that rewrites INNER joins to
//!   LEFT after boolean logic was applied. OR-combined predicates over a
//!   relation only produce meaningful result sets if rows without a matching
//!   relation are not excluded by an inner join.

use smol_str::SmolStr;

use crate::name_gen::QueryNameGenerator;
use crate::query::QueryBuilder;

/// The join types leaf filters produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `INNER JOIN`.
    Inner,
    /// `LEFT JOIN`.
    Left,
}

impl JoinKind {
    /// The DQL spelling of the join type.
    pub fn as_dql(&self) -> &'static str {
        match self {
            Self::Inner => "INNER",
            Self::Left => "LEFT",
        }
    }
}

/// How an explicit join condition is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionType {
    /// `ON` condition.
    On,
    /// `WITH` condition.
    With,
}

/// One join clause of the query under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Join type.
    pub kind: JoinKind,
    /// Join target, e.g. `o.toMany`.
    pub join: SmolStr,
    /// Alias for the joined relation.
    pub alias: Option<SmolStr>,
    /// How `condition` is attached, when present.
    pub condition_type: Option<ConditionType>,
    /// Raw condition fragment.
    pub condition: Option<SmolStr>,
    /// `INDEX BY` clause.
    pub index_by: Option<SmolStr>,
}

impl Join {
    /// An inner join on `target` with no alias or condition.
    pub fn inner(target: impl Into<SmolStr>) -> Self {
        Self::new(JoinKind::Inner, target)
    }

    /// A left join on `target` with no alias or condition.
    pub fn left(target: impl Into<SmolStr>) -> Self {
        Self::new(JoinKind::Left, target)
    }

    fn new(kind: JoinKind, target: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            join: target.into(),
            alias: None,
            condition_type: None,
            condition: None,
            index_by: None,
        }
    }

    /// Set the alias.
    pub fn with_alias(mut self, alias: impl Into<SmolStr>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// Whether the query already holds any LEFT join.
pub fn has_left_join(qb: &QueryBuilder) -> bool {
    qb.joins()
        .values()
        .flatten()
        .any(|j| j.kind == JoinKind::Left)
}

/// Join on `association` from the root alias, reusing an existing join to the
/// same target when present.
///
/// New joins default to LEFT when the query already holds a LEFT join and to
/// INNER otherwise. Returns the alias of the join to address fields through.
pub fn add_join_once(
    qb: &mut QueryBuilder,
    r#gen: &mut QueryNameGenerator,
    association: &str,
) -> SmolStr {
    let target = SmolStr::new(format!("{}.{association}", qb.root_alias()));

    if let Some(alias) = qb
        .joins()
        .values()
        .flatten()
        .find(|j| j.join == target)
        .and_then(|j| j.alias.clone())
    {
        return alias;
    }

    let kind = if has_left_join(qb) {
        JoinKind::Left
    } else {
        JoinKind::Inner
    };
    let alias = r#gen.join_alias(association);
    let join = Join {
        kind,
        join: target,
        alias: Some(alias.clone()),
        condition_type: None,
        condition: None,
        index_by: None,
    };
    qb.add_join(join);
    alias
}

/// Rewrite every INNER join of the query to a LEFT join, preserving target,
/// alias, condition type, condition and index-by. Idempotent.
pub fn inner_joins_to_left(qb: &mut QueryBuilder) {
    for joins in qb.joins_mut().values_mut() {
        for join in joins.iter_mut() {
            if join.kind == JoinKind::Inner {
                tracing::debug!(target_path = %join.join, "coercing inner join to left");
                join.kind = JoinKind::Left;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn builder() -> QueryBuilder {
        QueryBuilder::new("TestEntity", "o")
    }

    #[test]
    fn test_add_join_once_defaults_to_inner() {
        let mut qb = builder();
        let mut r#gen = QueryNameGenerator::new();
        let alias = add_join_once(&mut qb, &mut r#gen, "toMany");
        assert_eq!(alias, "toMany_a1");
        let joins: Vec<_> = qb.joins().values().flatten().collect();
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].kind, JoinKind::Inner);
        assert_eq!(joins[0].join, "o.toMany");
    }

    #[test]
    fn test_add_join_once_reuses_existing_alias() {
        let mut qb = builder();
        let mut r#gen = QueryNameGenerator::new();
        let first = add_join_once(&mut qb, &mut r#gen, "toMany");
        let second = add_join_once(&mut qb, &mut r#gen, "toMany");
        assert_eq!(first, second);
        assert_eq!(qb.joins().values().flatten().count(), 1);
    }

    #[test]
    fn test_add_join_once_follows_existing_left_join() {
        let mut qb = builder();
        let mut r#gen = QueryNameGenerator::new();
        qb.add_join(Join::left("fake.target"));
        let _ = add_join_once(&mut qb, &mut r#gen, "toMany");
        let added = qb
            .joins()
            .values()
            .flatten()
            .find(|j| j.join == "o.toMany")
            .unwrap();
        assert_eq!(added.kind, JoinKind::Left);
    }

    #[test]
    fn test_inner_joins_to_left_is_idempotent() {
        let mut qb = builder();
        qb.add_join(Join::inner("o.toMany").with_alias("toMany_a1"));
        qb.add_join(Join::left("o.toOne").with_alias("toOne_a2"));

        inner_joins_to_left(&mut qb);
        let once = qb.joins().clone();
        inner_joins_to_left(&mut qb);
        assert_eq!(&once, qb.joins());
        assert!(
            qb.joins()
                .values()
                .flatten()
                .all(|j| j.kind == JoinKind::Left)
        );
    }
}
