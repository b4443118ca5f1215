//! Filter registration and per-resource wiring.
//!
//! Filters are registered once under a stable id and shared immutably. Each
//! resource is then configured with the ordered list of filter ids that apply
//! to it, optionally narrowed per operation. The logic compositor resolves
//! ids through the registry at composition time, so a resource's chain and
//! the compositor never hold filters directly.

use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::filter::PropertyFilter;

/// Per-resource filter configuration: a default chain, plus operation
/// overrides.
#[derive(Default)]
struct ResourceFilters {
    default: Vec<SmolStr>,
    operations: IndexMap<SmolStr, Vec<SmolStr>>,
}

/// Shared registry of filters and their resource assignments.
#[derive(Default)]
pub struct FilterRegistry {
    filters: IndexMap<SmolStr, Arc<dyn PropertyFilter>>,
    resources: IndexMap<SmolStr, ResourceFilters>,
}

impl FilterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `filter` under `id`, replacing any previous registration.
    pub fn register(&mut self, id: impl Into<SmolStr>, filter: Arc<dyn PropertyFilter>) {
        let id = id.into();
        tracing::debug!(filter = %id, name = filter.name(), "filter registered");
        self.filters.insert(id, filter);
    }

    /// Look up a registered filter by id.
    pub fn filter(&self, id: &str) -> Option<&Arc<dyn PropertyFilter>> {
        self.filters.get(id)
    }

    /// Assign the default filter chain of `resource`, in application order.
    pub fn configure(
        &mut self,
        resource: impl Into<SmolStr>,
        ids: impl IntoIterator<Item = impl Into<SmolStr>>,
    ) {
        self.resources.entry(resource.into()).or_default().default =
            ids.into_iter().map(Into::into).collect();
    }

    /// Assign the filter chain of one operation of `resource`, overriding the
    /// default chain for that operation only.
    pub fn configure_operation(
        &mut self,
        resource: impl Into<SmolStr>,
        operation: impl Into<SmolStr>,
        ids: impl IntoIterator<Item = impl Into<SmolStr>>,
    ) {
        self.resources
            .entry(resource.into())
            .or_default()
            .operations
            .insert(operation.into(), ids.into_iter().map(Into::into).collect());
    }

    /// The filter ids configured for `resource`, in application order.
    ///
    /// An operation override takes precedence over the resource default.
    /// Unknown resources and operations yield an empty slice.
    pub fn filter_ids_for(&self, resource: &str, operation: Option<&str>) -> &[SmolStr] {
        let Some(entry) = self.resources.get(resource) else {
            return &[];
        };
        operation
            .and_then(|op| entry.operations.get(op))
            .unwrap_or(&entry.default)
    }
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .finish()
    }
}
