//! The nested, order-preserving filter specification.
//!
//! A specification is a recursively nested mapping as it arrives from the
//! request layer. Keys are either a property or group name handled by a leaf
//! filter, one of the reserved logic operators `and`, `or` and `not`, or an
//! all-digit string marking one of several repeated applications of the same
//! filter with different arguments.
//!
//! Insertion order is significant: expressions and bound parameters are
//! produced in discovery order, so the maps are [`IndexMap`]s.

use indexmap::IndexMap;
use serde::Deserialize;
use smol_str::SmolStr;

use crate::value::FilterValue;

/// Ordered map of specification entries.
pub type SpecMap = IndexMap<SmolStr, FilterSpec>;

/// One node of a filter specification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FilterSpec {
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Float scalar.
    Float(f64),
    /// String scalar, as delivered by a query string or JSON document.
    String(String),
    /// Nested specification.
    Map(SpecMap),
}

impl FilterSpec {
    /// The nested map, if this node is one.
    pub fn as_map(&self) -> Option<&SpecMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// The string scalar, if this node is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret this node as a boolean.
    ///
    /// Accepts native booleans and the usual query-string spellings.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(0) => Some(false),
            Self::Int(1) => Some(true),
            Self::String(s) => match s.as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Interpret this node as a numeric value, parsing string scalars.
    pub fn as_number(&self) -> Option<FilterValue> {
        match self {
            Self::Int(i) => Some(FilterValue::Int(*i)),
            Self::Float(f) => Some(FilterValue::Float(*f)),
            Self::String(s) => {
                if let Ok(i) = s.parse::<i64>() {
                    Some(FilterValue::Int(i))
                } else {
                    s.parse::<f64>().ok().map(FilterValue::Float)
                }
            }
            _ => None,
        }
    }

    /// The scalar as a bindable value, if this node is a scalar.
    pub fn scalar_value(&self) -> Option<FilterValue> {
        match self {
            Self::Bool(b) => Some(FilterValue::Bool(*b)),
            Self::Int(i) => Some(FilterValue::Int(*i)),
            Self::Float(f) => Some(FilterValue::Float(*f)),
            Self::String(s) => Some(FilterValue::String(s.clone())),
            Self::Map(_) => None,
        }
    }

    /// Whether a key denotes a numbered repetition group.
    ///
    /// Recognized by an all-digit string test, not a type test.
    pub fn is_repetition_key(key: &str) -> bool {
        !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
    }
}

/// The reserved logic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    /// All members must match.
    And,
    /// Any member may match.
    Or,
    /// Each member is negated individually.
    Not,
}

impl LogicOp {
    /// Parse a reserved key. Case-sensitive.
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "not" => Some(Self::Not),
            _ => None,
        }
    }

    /// The reserved key for this operator.
    pub fn key(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
        }
    }
}
