//! Metadata and statistics provider traits.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Error;

use super::object::ObjectMetadata;

/// Source of object metadata.
///
/// Implementations may cache internally; the engine treats returned
/// snapshots as immutable.
pub trait MetadataProvider: Send + Sync {
    /// Get metadata for an object, or `Error::Metadata` if unknown.
    fn object(&self, name: &str) -> Result<Arc<ObjectMetadata>, Error>;
}

/// Source of planning statistics.
pub trait StatisticsProvider: Send + Sync {
    /// Estimated row count for an object (0 when unknown).
    fn row_count(&self, object: &str) -> u64;

    /// Equality selectivity of a field, if known.
    fn field_selectivity(&self, object: &str, field: &str) -> Option<f64>;
}

/// In-memory catalog serving both metadata and statistics from registered
/// [`ObjectMetadata`] definitions.
#[derive(Default)]
pub struct StaticCatalog {
    objects: HashMap<String, Arc<ObjectMetadata>>,
}

impl StaticCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object definition.
    pub fn with_object(mut self, object: ObjectMetadata) -> Self {
        self.register(object);
        self
    }

    /// Register an object definition, replacing any existing one.
    pub fn register(&mut self, object: ObjectMetadata) {
        self.objects
            .insert(object.object_name.clone(), Arc::new(object));
    }
}

impl MetadataProvider for StaticCatalog {
    fn object(&self, name: &str) -> Result<Arc<ObjectMetadata>, Error> {
        self.objects
            .get(name)
            .cloned()
            .ok_or_else(|| Error::metadata(format!("unknown object '{}'", name)))
    }
}

impl StatisticsProvider for StaticCatalog {
    fn row_count(&self, object: &str) -> u64 {
        self.objects
            .get(object)
            .map(|o| o.estimated_row_count)
            .unwrap_or(0)
    }

    fn field_selectivity(&self, object: &str, field: &str) -> Option<f64> {
        self.objects
            .get(object)
            .and_then(|o| o.field(field))
            .map(|f| f.selectivity)
    }
}
