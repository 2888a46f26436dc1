//! Object metadata consumed by the query pipeline.
//!
//! The catalog bridges logical object names to physical tables and columns.
//! The engine consumes it through the [`MetadataProvider`] and
//! [`StatisticsProvider`] traits; [`StaticCatalog`] is the in-memory
//! implementation of both.

mod object;
mod provider;

pub use object::{DataType, FieldMetadata, ObjectMetadata, Relationship, RelationshipKind};
pub use provider::{MetadataProvider, StaticCatalog, StatisticsProvider};
