//! The boolean expression tree composed from leaf-filter predicates.
//!
//! Expressions are immutable for composition purposes: leaf filters produce
//! [`Expr`] nodes, the compositor wraps them in `And`/`Or`/`Not` groups, and
//! the finished tree is merged into the query's WHERE clause.
//!
//! Rendering follows the conventions of DQL-style composites: a group with a
//! single child renders as that child alone, and a child whose own rendering
//! embeds an ` AND ` or ` OR ` connective is parenthesized. A group with zero
//! children must be dropped before rendering; it is never emitted as `()`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use smol_str::SmolStr;

static MARKER_SEQ: AtomicU64 = AtomicU64::new(1);

/// Comparison operators available to leaf filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `=`
    Eq,
    /// `<>`
    Neq,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
}

impl CmpOp {
    /// The DQL spelling of the operator.
    pub fn as_dql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }
}

/// One node of the expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Comparison of a field against a bound parameter, `field op :param`.
    Cmp {
        /// Aliased field, e.g. `o.dd`.
        field: SmolStr,
        /// Comparison operator.
        op: CmpOp,
        /// Name of the bound parameter, without the leading `:`.
        param: SmolStr,
    },
    /// `field IS NULL`.
    IsNull(SmolStr),
    /// `field IS NOT NULL`.
    IsNotNull(SmolStr),
    /// Conjunction of the children, in order.
    And(Vec<Expr>),
    /// Disjunction of the children, in order.
    Or(Vec<Expr>),
    /// Negation of a single child.
    Not(Box<Expr>),
    /// Marker sentinel used by marker-diff extraction.
    ///
    /// Carries a process-unique id so it can be located by identity after
    /// leaf filters have run. Never produced by any filter; renders as the
    /// otherwise-impossible zero-argument `NOT()`.
    Marker(u64),
}

impl Expr {
    /// Comparison predicate against a bound parameter.
    pub fn cmp(field: impl Into<SmolStr>, op: CmpOp, param: impl Into<SmolStr>) -> Self {
        Self::Cmp {
            field: field.into(),
            op,
            param: param.into(),
        }
    }

    /// Equality predicate against a bound parameter.
    pub fn eq(field: impl Into<SmolStr>, param: impl Into<SmolStr>) -> Self {
        Self::cmp(field, CmpOp::Eq, param)
    }

    /// `field IS NULL`.
    pub fn is_null(field: impl Into<SmolStr>) -> Self {
        Self::IsNull(field.into())
    }

    /// `field IS NOT NULL`.
    pub fn is_not_null(field: impl Into<SmolStr>) -> Self {
        Self::IsNotNull(field.into())
    }

    /// Conjunction of the given parts.
    pub fn and_x(parts: impl IntoIterator<Item = Expr>) -> Self {
        Self::And(parts.into_iter().collect())
    }

    /// Disjunction of the given parts.
    pub fn or_x(parts: impl IntoIterator<Item = Expr>) -> Self {
        Self::Or(parts.into_iter().collect())
    }

    /// Negation of the given part.
    pub fn not(part: Expr) -> Self {
        Self::Not(Box::new(part))
    }

    /// A fresh marker sentinel with a process-unique id.
    pub fn marker() -> Self {
        Self::Marker(MARKER_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    /// Whether this node is a marker sentinel.
    pub fn is_marker(&self) -> bool {
        matches!(self, Self::Marker(_))
    }

    fn write_composite(f: &mut fmt::Formatter<'_>, parts: &[Expr], sep: &str) -> fmt::Result {
        if let [only] = parts {
            return write!(f, "{only}");
        }
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                f.write_str(sep)?;
            }
            let rendered = part.to_string();
            // Parenthesize children that embed a connective, so nesting
            // survives the flat textual form.
            if rendered.contains(" AND ") || rendered.contains(" OR ") {
                write!(f, "({rendered})")?;
            } else {
                f.write_str(&rendered)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cmp { field, op, param } => write!(f, "{field} {} :{param}", op.as_dql()),
            Self::IsNull(field) => write!(f, "{field} IS NULL"),
            Self::IsNotNull(field) => write!(f, "{field} IS NOT NULL"),
            Self::And(parts) => Self::write_composite(f, parts, " AND "),
            Self::Or(parts) => Self::write_composite(f, parts, " OR "),
            Self::Not(part) => write!(f, "NOT({part})"),
            Self::Marker(_) => f.write_str("NOT()"),
        }
    }
}
