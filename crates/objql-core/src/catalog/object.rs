//! Object, field, and relationship metadata definitions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use objql_ir::JoinType;

/// Scalar data types for object fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// Record identifier.
    Id,
    /// Text.
    Text,
    /// 64-bit integer.
    Integer,
    /// Double-precision float.
    Double,
    /// Boolean.
    Boolean,
    /// Calendar date.
    Date,
}

/// Metadata for a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    /// Logical field name as it appears in DSQL.
    pub field_name: String,
    /// Physical column name.
    pub column_name: String,
    /// Data type.
    pub data_type: DataType,
    /// Whether the column admits nulls.
    pub nullable: bool,
    /// Whether an index exists on the column.
    pub indexed: bool,
    /// Fraction of rows matched by an equality predicate, in `[0, 1]`.
    pub selectivity: f64,
}

impl FieldMetadata {
    /// Create field metadata with defaults: nullable, unindexed,
    /// selectivity 0.1.
    pub fn new(
        field_name: impl Into<String>,
        column_name: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            column_name: column_name.into(),
            data_type,
            nullable: true,
            indexed: false,
            selectivity: 0.1,
        }
    }

    /// Mark the column as indexed.
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Mark the column as non-nullable.
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Set the equality selectivity.
    pub fn with_selectivity(mut self, selectivity: f64) -> Self {
        self.selectivity = selectivity.clamp(0.0, 1.0);
        self
    }
}

/// Kind of a foreign-key relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipKind {
    /// Optional reference; traversals use LEFT joins.
    Lookup,
    /// Required parent; traversals use INNER joins.
    MasterDetail,
}

/// A named foreign-key edge from one object to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Relationship name used in dotted field paths.
    pub name: String,
    /// Target object name.
    pub target_object: String,
    /// Foreign-key field on the source object.
    pub foreign_key: String,
    /// Referenced key field on the target object.
    pub referenced_key: String,
    /// Relationship kind.
    pub kind: RelationshipKind,
}

impl Relationship {
    /// Create a lookup relationship.
    pub fn lookup(
        name: impl Into<String>,
        target_object: impl Into<String>,
        foreign_key: impl Into<String>,
        referenced_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target_object: target_object.into(),
            foreign_key: foreign_key.into(),
            referenced_key: referenced_key.into(),
            kind: RelationshipKind::Lookup,
        }
    }

    /// Create a master-detail relationship.
    pub fn master_detail(
        name: impl Into<String>,
        target_object: impl Into<String>,
        foreign_key: impl Into<String>,
        referenced_key: impl Into<String>,
    ) -> Self {
        Self {
            kind: RelationshipKind::MasterDetail,
            ..Self::lookup(name, target_object, foreign_key, referenced_key)
        }
    }

    /// The join type a traversal over this relationship uses.
    pub fn join_type(&self) -> JoinType {
        match self.kind {
            RelationshipKind::Lookup => JoinType::Left,
            RelationshipKind::MasterDetail => JoinType::Inner,
        }
    }
}

/// Metadata for a logical object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Logical object name.
    pub object_name: String,
    /// Physical table name.
    pub table_name: String,
    /// Field metadata keyed by field name.
    pub fields: HashMap<String, FieldMetadata>,
    /// Outgoing relationships.
    pub relationships: Vec<Relationship>,
    /// Whether row-level security applies to this object.
    pub has_rls: bool,
    /// Estimated row count for planning.
    pub estimated_row_count: u64,
}

impl ObjectMetadata {
    /// Create object metadata with no fields, no relationships, and RLS off.
    pub fn new(object_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            table_name: table_name.into(),
            fields: HashMap::new(),
            relationships: Vec::new(),
            has_rls: false,
            estimated_row_count: 0,
        }
    }

    /// Add a field.
    pub fn with_field(mut self, field: FieldMetadata) -> Self {
        self.fields.insert(field.field_name.clone(), field);
        self
    }

    /// Add a relationship.
    pub fn with_relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Enable row-level security.
    pub fn rls_enabled(mut self) -> Self {
        self.has_rls = true;
        self
    }

    /// Set the estimated row count.
    pub fn with_row_count(mut self, count: u64) -> Self {
        self.estimated_row_count = count;
        self
    }

    /// Look up a field by name, case-insensitively on miss (DSQL field
    /// references are case-insensitive).
    pub fn field(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields.get(name).or_else(|| {
            self.fields
                .values()
                .find(|f| f.field_name.eq_ignore_ascii_case(name))
        })
    }

    /// Look up a relationship by name.
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == name)
    }
}
