//! Plain values handed to templates
//!
//! Everything in here is fully resolved: names are valid identifiers, types
//! are spelled out, SQL is final. Templates never see the IR.

use serde::Serialize;

/// Parameters of the artifact header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderParams {
    pub module: String,
    pub dialects: Vec<HeaderDialect>,
    pub structs: Vec<ModelStruct>,
}

/// One configured dialect as seen by the header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderDialect {
    pub name: String,
    /// Receiver type the dialect's methods hang off, e.g. `PostgresDb`
    pub receiver: String,
    /// Prefix of the dialect's constants, e.g. `POSTGRES`
    pub constant: String,
    /// Driver crate registered for the dialect
    pub driver: String,
    pub schema: String,
}

/// Struct mirroring one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelStruct {
    pub name: String,
    pub table: String,
    pub members: Vec<Member>,
}

/// Struct synthesized for a multi-projection select
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructDesc {
    pub name: String,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub name: String,
    pub ty: String,
    /// Decoded as a whole model struct rather than a single value
    pub nested: bool,
}

/// Which function template to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FuncKind {
    Insert,
    SelectOne,
    SelectAll,
    SelectPaged,
    Count,
    Has,
    Update,
    DeleteOne,
    DeleteAll,
    GetLast,
}

impl FuncKind {
    pub fn name(self) -> &'static str {
        match self {
            FuncKind::Insert => "insert",
            FuncKind::SelectOne => "select",
            FuncKind::SelectAll => "select-all",
            FuncKind::SelectPaged => "select-paged",
            FuncKind::Count => "count",
            FuncKind::Has => "has",
            FuncKind::Update => "update",
            FuncKind::DeleteOne => "delete",
            FuncKind::DeleteAll => "delete-all",
            FuncKind::GetLast => "get-last",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Arg {
    pub name: String,
    pub ty: String,
}

/// Row decoding for functions that return rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowDesc {
    pub ty: String,
    pub nested: bool,
}

/// Read-back path for writes on dialects without `RETURNING`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fallback {
    /// Row identity lookup run before an update
    pub lookup: Option<Lookup>,
    /// Private accessor fetching the written row
    pub get_last: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lookup {
    pub sql: String,
    /// Argument names, in placeholder order
    pub binds: Vec<String>,
}

/// One data-access function
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FuncData {
    pub kind: FuncKind,
    pub name: String,
    pub exported: bool,
    pub args: Vec<Arg>,
    pub sql: String,
    /// Argument names, in placeholder order
    pub binds: Vec<String>,
    /// Success type, without the `Result` wrapper
    pub returns: String,
    pub row: Option<RowDesc>,
    pub fallback: Option<Fallback>,
}
