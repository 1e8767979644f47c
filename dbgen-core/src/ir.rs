//! Intermediate representation
//!
//! The IR is the fully resolved form of a schema: models own their fields,
//! and everything else (relations, joins, conditions, projections) refers to
//! models and fields through [`ModelId`] / [`FieldId`] index pairs. Nothing
//! here is mutated after the IR builder returns; rendering only reads it.

use crate::position::Position;
use serde::Serialize;
use std::fmt;

// ============================================================
// Identifiers
// ============================================================

/// Index of a model in [`Ir::models`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ModelId(pub usize);

/// Index of a field in [`Model::fields`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FieldId(pub usize);

/// A `(model, field)` reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Column {
    pub model: ModelId,
    pub field: FieldId,
}

impl Column {
    pub fn new(model: ModelId, field: FieldId) -> Self {
        Self { model, field }
    }
}

// ============================================================
// Root
// ============================================================

/// Root of the resolved schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ir {
    pub models: Vec<Model>,
    pub relations: Vec<Relation>,
    pub inserts: Vec<Insert>,
    pub selects: Vec<Select>,
    pub updates: Vec<Update>,
    pub deletes: Vec<Delete>,
    pub counts: Vec<Count>,

    /// Models written by an insert or update, first-use order, no repeats.
    /// Dialects without `RETURNING` need a get-last accessor for each.
    pub returning_targets: Vec<ModelId>,
}

impl Ir {
    pub fn model(&self, id: ModelId) -> &Model {
        &self.models[id.0]
    }

    pub fn model_by_name(&self, name: &str) -> Option<ModelId> {
        self.models.iter().position(|m| m.name == name).map(ModelId)
    }

    pub fn field(&self, column: Column) -> &Field {
        self.model(column.model).field(column.field)
    }

    /// Iterate models together with their ids
    pub fn models(&self) -> impl Iterator<Item = (ModelId, &Model)> {
        self.models.iter().enumerate().map(|(i, m)| (ModelId(i), m))
    }

    /// Relations whose referencing column lives on `model`
    pub fn outgoing(&self, model: ModelId) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(move |r| r.left.model == model)
    }

    /// Qualified SQL name, `table.column`
    pub fn qualified(&self, column: Column) -> String {
        format!(
            "{}.{}",
            self.model(column.model).table,
            self.field(column).column
        )
    }

    /// Human readable name, `model.field`
    pub fn display(&self, column: Column) -> String {
        format!(
            "{}.{}",
            self.model(column.model).name,
            self.field(column).name
        )
    }
}

// ============================================================
// Models
// ============================================================

/// A persisted model (one SQL table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Model {
    pub name: String,

    /// SQL table name
    pub table: String,

    pub fields: Vec<Field>,

    /// Primary key fields, never empty
    pub primary_key: Vec<FieldId>,

    /// Additional unique keys
    pub unique: Vec<Vec<FieldId>>,

    pub position: Position,
}

impl Model {
    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.0]
    }

    pub fn field_by_name(&self, name: &str) -> Option<FieldId> {
        self.fields.iter().position(|f| f.name == name).map(FieldId)
    }

    pub fn field_ids(&self) -> impl Iterator<Item = FieldId> + '_ {
        (0..self.fields.len()).map(FieldId)
    }

    /// Primary key followed by every unique key
    pub fn unique_keys(&self) -> impl Iterator<Item = &[FieldId]> {
        std::iter::once(self.primary_key.as_slice()).chain(self.unique.iter().map(Vec::as_slice))
    }

    /// Fields the caller supplies on insert
    pub fn insertable(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.field_ids()
            .filter(|&id| !self.field(id).autoincrement && !self.field(id).autoinsert)
    }

    /// Fields written on insert, including generated timestamps
    pub fn insert_columns(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.field_ids().filter(|&id| !self.field(id).autoincrement)
    }

    /// Fields the caller may change on update
    pub fn updatable(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.field_ids().filter(|&id| self.field(id).updatable)
    }

    /// Fields written on update, including generated timestamps
    pub fn update_columns(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.field_ids()
            .filter(|&id| self.field(id).updatable || self.field(id).autoupdate)
    }
}

/// A model field (one SQL column)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,

    /// SQL column name
    pub column: String,

    pub ty: FieldType,
    pub nullable: bool,
    pub autoincrement: bool,

    /// Set to the current time on insert
    pub autoinsert: bool,

    /// Set to the current time on update
    pub autoupdate: bool,

    /// May be changed by update queries
    pub updatable: bool,

    pub default: Option<Literal>,
    pub length: Option<u32>,
    pub position: Position,
}

/// Field types understood by every dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Bool,
    Int,
    Int64,
    Float64,
    Text,
    Blob,
    Timestamp,
}

impl FieldType {
    pub const ALL: [FieldType; 7] = [
        FieldType::Bool,
        FieldType::Int,
        FieldType::Int64,
        FieldType::Float64,
        FieldType::Text,
        FieldType::Blob,
        FieldType::Timestamp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::Int => "int",
            FieldType::Int64 => "int64",
            FieldType::Float64 => "float64",
            FieldType::Text => "text",
            FieldType::Blob => "blob",
            FieldType::Timestamp => "timestamp",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn is_integer(self) -> bool {
        matches!(self, FieldType::Int | FieldType::Int64)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A literal value in the schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    String(String),
}

impl Literal {
    /// SQL spelling of the literal
    pub fn to_sql(&self) -> String {
        match self {
            Literal::Null => "NULL".to_string(),
            Literal::Bool(true) => "TRUE".to_string(),
            Literal::Bool(false) => "FALSE".to_string(),
            Literal::Int(i) => i.to_string(),
            Literal::String(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

// ============================================================
// Relations
// ============================================================

/// Foreign key edge: `left` references `right`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation {
    pub left: Column,
    pub right: Column,
    pub on_delete: Option<OnDelete>,
    pub position: Position,
}

/// Referential action on delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    Cascade,
    SetNull,
    Restrict,
}

impl OnDelete {
    pub fn to_sql(self) -> &'static str {
        match self {
            OnDelete::Cascade => "CASCADE",
            OnDelete::SetNull => "SET NULL",
            OnDelete::Restrict => "RESTRICT",
        }
    }
}

// ============================================================
// Query building blocks
// ============================================================

/// `LEFT JOIN right.model ON right = left`
///
/// `left` is on a model already part of the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Join {
    pub left: Column,
    pub right: Column,
}

/// Comparison operators allowed in where clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }

    pub fn from_sql(op: &str) -> Option<Self> {
        Some(match op {
            "=" => Operator::Eq,
            "!=" => Operator::Ne,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            _ => return None,
        })
    }
}

/// Right hand side of a condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// Bound at call time
    Placeholder,
    Column(Column),
    Literal(Literal),
}

/// `left op right`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Condition {
    pub left: Column,
    pub op: Operator,
    pub right: Operand,
}

impl Condition {
    /// Whether this condition takes an argument at call time
    pub fn is_parameter(&self) -> bool {
        matches!(self.right, Operand::Placeholder)
    }
}

/// Whether a query yields at most one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    One,
    Many,
}

// ============================================================
// Queries
// ============================================================

/// One projected item of a select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Every field of a model
    Model(ModelId),
    Field(Column),
}

impl Projection {
    pub fn model(self) -> ModelId {
        match self {
            Projection::Model(id) => id,
            Projection::Field(column) => column.model,
        }
    }
}

/// Row shape synthesized for a select with two or more projections
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultStruct {
    pub name: String,
    pub fields: Vec<Projection>,
}

/// What a select returns per row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultShape {
    Model(ModelId),
    Field(Column),
    Struct(ResultStruct),
}

/// Keyset pagination on one column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Paged {
    pub column: Column,
    pub page_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Select {
    /// Base model (`FROM`)
    pub model: ModelId,
    pub projections: Vec<Projection>,
    pub joins: Vec<Join>,
    pub conditions: Vec<Condition>,
    pub cardinality: Cardinality,
    pub paged: Option<Paged>,
    pub result: ResultShape,
    pub position: Position,
}

impl Select {
    pub fn one(&self) -> bool {
        self.cardinality == Cardinality::One
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insert {
    pub model: ModelId,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Update {
    pub model: ModelId,
    pub conditions: Vec<Condition>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delete {
    pub model: ModelId,
    pub joins: Vec<Join>,
    pub conditions: Vec<Condition>,
    pub cardinality: Cardinality,
    pub position: Position,
}

impl Delete {
    pub fn one(&self) -> bool {
        self.cardinality == Cardinality::One
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Count {
    pub model: ModelId,
    pub joins: Vec<Join>,
    pub conditions: Vec<Condition>,
    pub position: Position,
}
