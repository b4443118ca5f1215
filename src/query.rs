//! The mutable query-state abstraction shared by all filters.
//!
//! One [`QueryBuilder`] is exclusively owned by a single compose-and-apply
//! call stack for the duration of one resource query. Leaf filters are lent
//! the builder synchronously, one at a time, and append their predicates with
//! [`and_where`](QueryBuilder::and_where) / [`or_where`](QueryBuilder::or_where).
//!
//! The append operations keep the WHERE tree left-leaning: a new term always
//! becomes the rightmost child, wrapping the previous root when it is not
//! already a matching composite. Marker-diff extraction relies on exactly
//! this shape; see [`crate::marker`].

use indexmap::IndexMap;
use smallvec::SmallVec;
use smol_str::SmolStr;
use std::fmt::Write as _;

use crate::expr::Expr;
use crate::join::Join;
use crate::value::FilterValue;

/// Sort direction for an ORDER BY entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl Direction {
    fn as_dql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Query under construction: WHERE tree, joins, bound parameters, ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryBuilder {
    resource: SmolStr,
    root_alias: SmolStr,
    where_: Option<Expr>,
    joins: IndexMap<SmolStr, SmallVec<[Join; 2]>>,
    parameters: IndexMap<SmolStr, FilterValue>,
    order_by: Vec<(SmolStr, Direction)>,
}

impl QueryBuilder {
    /// A builder selecting `resource` under `root_alias` with no constraints.
    pub fn new(resource: impl Into<SmolStr>, root_alias: impl Into<SmolStr>) -> Self {
        Self {
            resource: resource.into(),
            root_alias: root_alias.into(),
            where_: None,
            joins: IndexMap::new(),
            parameters: IndexMap::new(),
            order_by: Vec::new(),
        }
    }

    /// The alias of the root entity.
    pub fn root_alias(&self) -> &SmolStr {
        &self.root_alias
    }

    /// Current WHERE root, if any.
    pub fn where_part(&self) -> Option<&Expr> {
        self.where_.as_ref()
    }

    /// Replace the WHERE root outright.
    ///
    /// This is the low-level overwrite primitive. Leaf filters must not use
    /// it; doing so breaks marker-diff extraction and is reported as a
    /// contract violation.
    pub fn set_where(&mut self, expr: Option<Expr>) {
        self.where_ = expr;
    }

    /// Take the WHERE root, leaving the clause empty.
    pub fn take_where(&mut self) -> Option<Expr> {
        self.where_.take()
    }

    /// AND-append `expr` to the WHERE clause.
    pub fn and_where(&mut self, expr: Expr) {
        self.where_ = Some(match self.where_.take() {
            None => expr,
            Some(Expr::And(mut parts)) => {
                parts.push(expr);
                Expr::And(parts)
            }
            Some(other) => Expr::And(vec![other, expr]),
        });
    }

    /// OR-append `expr` to the WHERE clause.
    pub fn or_where(&mut self, expr: Expr) {
        self.where_ = Some(match self.where_.take() {
            None => expr,
            Some(Expr::Or(mut parts)) => {
                parts.push(expr);
                Expr::Or(parts)
            }
            Some(other) => Expr::Or(vec![other, expr]),
        });
    }

    /// Add a join under the root alias.
    pub fn add_join(&mut self, join: Join) {
        self.joins
            .entry(self.root_alias.clone())
            .or_default()
            .push(join);
    }

    /// The join map, keyed by root alias.
    pub fn joins(&self) -> &IndexMap<SmolStr, SmallVec<[Join; 2]>> {
        &self.joins
    }

    /// Mutable access to the join map, for coercion and fake-join removal.
    pub fn joins_mut(&mut self) -> &mut IndexMap<SmolStr, SmallVec<[Join; 2]>> {
        &mut self.joins
    }

    /// Replace the join map.
    pub fn set_joins(&mut self, joins: IndexMap<SmolStr, SmallVec<[Join; 2]>>) {
        self.joins = joins;
    }

    /// Bind a parameter value.
    pub fn set_parameter(&mut self, name: impl Into<SmolStr>, value: impl Into<FilterValue>) {
        self.parameters.insert(name.into(), value.into());
    }

    /// Look up a bound parameter.
    pub fn parameter(&self, name: &str) -> Option<&FilterValue> {
        self.parameters.get(name)
    }

    /// All bound parameters, in binding order.
    pub fn parameters(&self) -> &IndexMap<SmolStr, FilterValue> {
        &self.parameters
    }

    /// Append an ORDER BY entry.
    pub fn add_order_by(&mut self, field: impl Into<SmolStr>, direction: Direction) {
        self.order_by.push((field.into(), direction));
    }

    /// Render the query as a DQL-style string for inspection and tests.
    pub fn to_dql(&self) -> String {
        let mut dql = format!("SELECT {a} FROM {r} {a}", a = self.root_alias, r = self.resource);
        for join in self.joins.values().flatten() {
            let _ = write!(dql, " {} JOIN {}", join.kind.as_dql(), join.join);
            if let Some(alias) = &join.alias {
                let _ = write!(dql, " {alias}");
            }
            if let (Some(ct), Some(cond)) = (&join.condition_type, &join.condition) {
                let kw = match ct {
                    crate::join::ConditionType::On => "ON",
                    crate::join::ConditionType::With => "WITH",
                };
                let _ = write!(dql, " {kw} {cond}");
            }
            if let Some(index_by) = &join.index_by {
                let _ = write!(dql, " INDEX BY {index_by}");
            }
        }
        if let Some(where_) = &self.where_ {
            let _ = write!(dql, " WHERE {where_}");
        }
        for (i, (field, dir)) in self.order_by.iter().enumerate() {
            let _ = if i == 0 {
                write!(dql, " ORDER BY {field} {}", dir.as_dql())
            } else {
                write!(dql, ", {field} {}", dir.as_dql())
            };
        }
        dql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::CmpOp;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_builder_renders_select_only() {
        let qb = QueryBuilder::new("TestEntity", "o");
        assert_eq!(qb.to_dql(), "SELECT o FROM TestEntity o");
    }

    #[test]
    fn test_and_where_appends_at_the_tail() {
        let mut qb = QueryBuilder::new("TestEntity", "o");
        qb.and_where(Expr::eq("o.a", "a_p1"));
        qb.and_where(Expr::eq("o.b", "b_p2"));
        qb.and_where(Expr::eq("o.c", "c_p3"));
        assert_eq!(
            qb.where_part(),
            Some(&Expr::and_x([
                Expr::eq("o.a", "a_p1"),
                Expr::eq("o.b", "b_p2"),
                Expr::eq("o.c", "c_p3"),
            ]))
        );
    }

    #[test]
    fn test_or_where_wraps_previous_conjunction() {
        // The previous root becomes the leftmost child of the new Or. This
        // left-leaning shape is what marker-diff extraction walks back.
        let mut qb = QueryBuilder::new("TestEntity", "o");
        qb.and_where(Expr::eq("o.a", "a_p1"));
        qb.and_where(Expr::eq("o.b", "b_p2"));
        qb.or_where(Expr::eq("o.c", "c_p3"));
        assert_eq!(
            qb.where_part(),
            Some(&Expr::or_x([
                Expr::and_x([Expr::eq("o.a", "a_p1"), Expr::eq("o.b", "b_p2")]),
                Expr::eq("o.c", "c_p3"),
            ]))
        );
    }

    #[test]
    fn test_parameters_survive_where_replacement() {
        let mut qb = QueryBuilder::new("TestEntity", "o");
        qb.set_parameter("dd_p1", "2021-01-01");
        qb.set_where(None);
        assert_eq!(
            qb.parameter("dd_p1"),
            Some(&FilterValue::String("2021-01-01".into()))
        );
    }

    #[test]
    fn test_render_where_and_order_by() {
        let mut qb = QueryBuilder::new("TestEntity", "o");
        qb.and_where(Expr::cmp("o.dd", CmpOp::Gte, "dd_p1"));
        qb.add_order_by("o.dd", Direction::Desc);
        assert_eq!(
            qb.to_dql(),
            "SELECT o FROM TestEntity o WHERE o.dd >= :dd_p1 ORDER BY o.dd DESC"
        );
    }
}
