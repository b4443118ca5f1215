//! Error types for filter composition.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for filter composition operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// Errors that can occur while composing filter expressions.
///
/// All of these are fatal for the query being built: there is no retry and no
/// partial-success mode. `UnexpectedExpression` and `MarkerNotFound` signal a
/// violated leaf-filter contract, `MissingFilters` a caller error.
#[derive(Error, Debug, Diagnostic)]
pub enum FilterError {
    /// A leaf filter replaced the WHERE clause wholesale instead of appending
    /// to it, so the appended expressions can not be recovered.
    #[error("unexpected expression in WHERE clause: `{dql}`")]
    #[diagnostic(
        code(filter_logic::unexpected_expression),
        help("leaf filters must append to the WHERE clause with and_where/or_where, never replace it with set_where")
    )]
    UnexpectedExpression {
        /// Rendering of the expression that was found instead of a composite.
        dql: String,
    },

    /// The marker expression was lost from the WHERE clause, or an empty
    /// composite was encountered while searching for it.
    #[error("marker expression not found in WHERE clause")]
    #[diagnostic(code(filter_logic::marker_not_found))]
    MarkerNotFound,

    /// `apply` or `generate_expressions` was called with a context that
    /// carries no filter map.
    #[error("filter context carries no filter map")]
    #[diagnostic(code(filter_logic::missing_filters))]
    MissingFilters,
}
