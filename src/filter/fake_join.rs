//! Fake-join bracketing filters.
//!
//! [`add_join_once`](crate::join::add_join_once) picks LEFT for new joins as
//! soon as the query already holds a LEFT join. [`AddFakeLeftJoin`], applied
//! as the first filter in a resource's chain, plants an inert LEFT join on a
//! unique, unresolvable target so every later join defaults to LEFT.
//! [`RemoveFakeLeftJoin`], applied strictly last, strips it again by matching
//! the unique target name, leaving real joins untouched.
//!
//! An alternative to [`inner_joins_to_left`](crate::join::inner_joins_to_left)
//! with different side effects: the join type is decided when the join is
//! created, so it also affects joins of filters that never pass through the
//! compositor.

use super::{FilterContext, FilterDescription, PropertyFilter};
use crate::error::FilterResult;
use crate::join::Join;
use crate::name_gen::QueryNameGenerator;
use crate::query::QueryBuilder;

/// Unique target of the fake join. No real association ever resolves to it.
pub const FAKE_JOIN: &str = "fake.kdoejfndnsklslwkweofdjhsd";

/// Plants the fake LEFT join. Must run first in the filter chain.
#[derive(Debug, Default)]
pub struct AddFakeLeftJoin;

impl PropertyFilter for AddFakeLeftJoin {
    fn name(&self) -> &'static str {
        "AddFakeLeftJoin"
    }

    fn description(&self, _resource: &str) -> Vec<FilterDescription> {
        Vec::new()
    }

    fn apply(
        &self,
        qb: &mut QueryBuilder,
        _gen: &mut QueryNameGenerator,
        _resource: &str,
        _operation: Option<&str>,
        _ctx: &FilterContext,
    ) -> FilterResult<()> {
        qb.add_join(Join::left(FAKE_JOIN));
        Ok(())
    }
}

/// Removes the fake LEFT join. Must run last in the filter chain, after the
/// logic compositor.
#[derive(Debug, Default)]
pub struct RemoveFakeLeftJoin;

impl RemoveFakeLeftJoin {
    /// Strip the fake join from the builder, by its unique target name.
    pub fn remove_from(qb: &mut QueryBuilder) {
        for joins in qb.joins_mut().values_mut() {
            joins.retain(|j| j.join != FAKE_JOIN);
        }
    }
}

impl PropertyFilter for RemoveFakeLeftJoin {
    fn name(&self) -> &'static str {
        "RemoveFakeLeftJoin"
    }

    fn description(&self, _resource: &str) -> Vec<FilterDescription> {
        Vec::new()
    }

    fn apply(
        &self,
        qb: &mut QueryBuilder,
        _gen: &mut QueryNameGenerator,
        _resource: &str,
        _operation: Option<&str>,
        _ctx: &FilterContext,
    ) -> FilterResult<()> {
        Self::remove_from(qb);
        Ok(())
    }
}
