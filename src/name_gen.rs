//! Unique parameter and join-alias names within one query build.

use smol_str::SmolStr;

/// Generates names that are stable and collision-free for the duration of one
/// query build. Parameters are numbered `{property}_p{n}`, join aliases
/// `{association}_a{n}`, with counters shared across all filters so repeated
/// applications of the same filter never collide.
#[derive(Debug, Default)]
pub struct QueryNameGenerator {
    param_count: u32,
    alias_count: u32,
}

impl QueryNameGenerator {
    /// A fresh generator with both counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a unique parameter name for `property`.
    ///
    /// Dots in nested property paths are replaced so the name stays a valid
    /// parameter identifier.
    pub fn parameter_name(&mut self, property: &str) -> SmolStr {
        self.param_count += 1;
        SmolStr::new(format!(
            "{}_p{}",
            property.replace('.', "_"),
            self.param_count
        ))
    }

    /// Generate a unique join alias for `association`.
    pub fn join_alias(&mut self, association: &str) -> SmolStr {
        self.alias_count += 1;
        SmolStr::new(format!("{association}_a{}", self.alias_count))
    }
}
