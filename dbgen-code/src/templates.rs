//! Template boundary and the built-in Rust templates

use crate::descriptor::{FuncData, FuncKind, HeaderParams, Member, RowDesc, StructDesc};
use crate::error::{RenderError, RenderResult};
use std::fmt::{self, Write};

/// Turns descriptors into target-language source text
///
/// A function is rendered in three steps, mirroring how it is declared:
/// its signature, its body, and the declaration joining both onto the
/// dialect's receiver. Only the signature is inspected by the renderer.
pub trait Templates {
    fn header(&self, params: &HeaderParams) -> RenderResult<String>;

    fn result_struct(&self, desc: &StructDesc) -> RenderResult<String>;

    fn signature(&self, func: &FuncData) -> RenderResult<String>;

    fn body(&self, func: &FuncData) -> RenderResult<String>;

    fn decl(&self, receiver: &str, signature: &str, body: &str) -> RenderResult<String>;

    /// Manifest of every exported signature, sorted
    fn footer(&self, signatures: &[&str]) -> RenderResult<String>;
}

/// Templates producing a self-contained Rust module
///
/// The module carries a small runtime (`Value`, `FromValue`, `Executor`)
/// so the generated methods only depend on a driver adapter implementing
/// the generated `Executor` trait for the connection type.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustTemplates;

const RUNTIME: &str = r#"
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;

/// A column value crossing the driver boundary
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
    Timestamp(SystemTime),
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::$variant(value.into())
            }
        })*
    };
}

value_from! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    f64 => Float,
    String => Text,
    Vec<u8> => Blob,
    SystemTime => Timestamp,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Conversion out of a driver value
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch(expected: &str, found: &Value) -> Error {
    format!("expected {}, found {:?}", expected, found).into()
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Int(i) => Ok(i != 0),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(mismatch("integer", &other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self> {
        Ok(i32::try_from(i64::from_value(value)?)?)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch("text", &other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(b) => Ok(b),
            other => Err(mismatch("blob", &other)),
        }
    }
}

impl FromValue for SystemTime {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Timestamp(t) => Ok(t),
            other => Err(mismatch("timestamp", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

fn take<T: FromValue>(values: &mut std::vec::IntoIter<Value>) -> Result<T> {
    T::from_value(values.next().ok_or("row has too few columns")?)
}

/// Connection seam, implemented over a concrete driver
pub trait Executor {
    /// Run a statement, returning the number of affected rows
    fn execute(&mut self, sql: &str, args: Vec<Value>) -> Result<u64>;

    fn query(&mut self, sql: &str, args: Vec<Value>) -> Result<Vec<Vec<Value>>>;

    /// Row identity of the last inserted row
    fn last_insert_id(&mut self) -> Result<i64>;
}
"#;

/// Rust string literal for arbitrary text, raw when it spans lines
fn string_literal(text: &str) -> String {
    if !text.contains('\n') {
        return format!("{:?}", text);
    }
    let mut hashes = String::from("#");
    while text.contains(&format!("\"{}", hashes)) {
        hashes.push('#');
    }
    format!("r{h}\"{t}\"{h}", h = hashes, t = text)
}

fn members(out: &mut String, name: &str, members: &[Member]) -> fmt::Result {
    writeln!(out, "#[derive(Debug, Clone, PartialEq)]")?;
    writeln!(out, "pub struct {} {{", name)?;
    for member in members {
        writeln!(out, "    pub {}: {},", member.name, member.ty)?;
    }
    writeln!(out, "}}\n")?;

    writeln!(out, "impl {} {{", name)?;
    writeln!(
        out,
        "    fn from_row(values: &mut std::vec::IntoIter<Value>) -> Result<Self> {{"
    )?;
    writeln!(out, "        Ok(Self {{")?;
    for member in members {
        if member.nested {
            writeln!(out, "            {}: {}::from_row(values)?,", member.name, member.ty)?;
        } else {
            writeln!(out, "            {}: take(values)?,", member.name)?;
        }
    }
    writeln!(out, "        }})\n    }}\n}}\n")
}

fn decode(row: &RowDesc) -> String {
    if row.nested {
        format!("{}::from_row(&mut row.into_iter())", row.ty)
    } else {
        format!("take::<{}>(&mut row.into_iter())", row.ty)
    }
}

fn binds(names: &[String], clone: bool) -> String {
    let suffix = if clone { ".clone()" } else { "" };
    let values: Vec<String> = names
        .iter()
        .map(|name| format!("Value::from({}{})", name, suffix))
        .collect();
    format!("vec![{}]", values.join(", "))
}

fn failed(template: &str, message: impl ToString) -> RenderError {
    RenderError::Template {
        template: template.to_string(),
        message: message.to_string(),
    }
}

/// Run one template against a fresh buffer
fn render(template: &str, f: impl FnOnce(&mut String) -> fmt::Result) -> RenderResult<String> {
    let mut out = String::new();
    f(&mut out).map_err(|e| failed(template, e))?;
    Ok(out)
}

fn header(out: &mut String, params: &HeaderParams) -> fmt::Result {
    writeln!(out, "//! `{}` data access, generated by dbgen. Do not edit.", params.module)?;
    writeln!(out, "//!")?;
    writeln!(out, "//! Driver crates:")?;
    for dialect in &params.dialects {
        writeln!(out, "//! - {}: `{}`", dialect.name, dialect.driver)?;
    }
    writeln!(out, "#![allow(dead_code, clippy::all)]\n")?;
    writeln!(out, "use std::time::SystemTime;")?;
    out.push_str(RUNTIME);
    out.push('\n');

    for dialect in &params.dialects {
        writeln!(out, "/// Driver crate backing the {} receiver", dialect.name)?;
        writeln!(out, "pub const {}_DRIVER: &str = {:?};\n", dialect.constant, dialect.driver)?;
        writeln!(
            out,
            "pub const {}_SCHEMA: &str = {};\n",
            dialect.constant,
            string_literal(&dialect.schema)
        )?;
        writeln!(out, "pub struct {}<E> {{\n    exec: E,\n}}\n", dialect.receiver)?;
        writeln!(out, "impl<E: Executor> {}<E> {{", dialect.receiver)?;
        writeln!(out, "    pub fn new(exec: E) -> Self {{\n        Self {{ exec }}\n    }}\n")?;
        writeln!(out, "    /// Create every table, in declaration order")?;
        writeln!(out, "    pub fn create_schema(&mut self) -> Result<()> {{")?;
        writeln!(
            out,
            "        for statement in {}_SCHEMA.split(\";\\n\").map(str::trim).filter(|s| !s.is_empty()) {{",
            dialect.constant
        )?;
        writeln!(out, "            self.exec.execute(statement, Vec::new())?;")?;
        writeln!(out, "        }}\n        Ok(())\n    }}\n}}\n")?;
    }

    for model in &params.structs {
        writeln!(out, "/// Row of `{}`", model.table)?;
        members(out, &model.name, &model.members)?;
    }
    Ok(())
}

fn body(out: &mut String, func: &FuncData) -> fmt::Result {
    let sql = string_literal(&func.sql);
    let args = binds(&func.binds, false);
    let decoded = func.row.as_ref().map(decode).unwrap_or_default();

    match (func.kind, &func.fallback) {
        (FuncKind::Insert, Some(fallback)) => {
            writeln!(out, "const SQL: &str = {};", sql)?;
            writeln!(out, "self.exec.execute(SQL, {})?;", args)?;
            writeln!(out, "let rowid = self.exec.last_insert_id()?;")?;
            writeln!(out, "self.{}(rowid)", fallback.get_last)?;
        }
        (FuncKind::Update, Some(fallback)) => {
            if let Some(lookup) = &fallback.lookup {
                writeln!(out, "const LOOKUP: &str = {};", string_literal(&lookup.sql))?;
                writeln!(
                    out,
                    "let Some(row) = self.exec.query(LOOKUP, {})?.into_iter().next() else {{\n    return Ok(None);\n}};",
                    binds(&lookup.binds, true)
                )?;
                writeln!(out, "let rowid = take::<i64>(&mut row.into_iter())?;")?;
            }
            writeln!(out, "const SQL: &str = {};", sql)?;
            writeln!(out, "self.exec.execute(SQL, {})?;", args)?;
            writeln!(out, "self.{}(rowid).map(Some)", fallback.get_last)?;
        }
        (FuncKind::Insert | FuncKind::GetLast | FuncKind::Count | FuncKind::Has, _) => {
            writeln!(out, "const SQL: &str = {};", sql)?;
            writeln!(
                out,
                "let row = self.exec.query(SQL, {})?.into_iter().next().ok_or(\"{} returned no row\")?;",
                args,
                func.kind.name()
            )?;
            writeln!(out, "{}", decoded)?;
        }
        (FuncKind::SelectOne | FuncKind::Update, _) => {
            writeln!(out, "const SQL: &str = {};", sql)?;
            writeln!(
                out,
                "self.exec.query(SQL, {})?.into_iter().next().map(|row| {}).transpose()",
                args, decoded
            )?;
        }
        (FuncKind::SelectAll | FuncKind::SelectPaged, _) => {
            writeln!(out, "const SQL: &str = {};", sql)?;
            writeln!(
                out,
                "self.exec.query(SQL, {})?.into_iter().map(|row| {}).collect()",
                args, decoded
            )?;
        }
        (FuncKind::DeleteOne, _) => {
            writeln!(out, "const SQL: &str = {};", sql)?;
            writeln!(out, "Ok(self.exec.execute(SQL, {})? > 0)", args)?;
        }
        (FuncKind::DeleteAll, _) => {
            writeln!(out, "const SQL: &str = {};", sql)?;
            writeln!(out, "self.exec.execute(SQL, {})", args)?;
        }
    }
    Ok(())
}

impl Templates for RustTemplates {
    fn header(&self, params: &HeaderParams) -> RenderResult<String> {
        render("header", |out| header(out, params))
    }

    fn result_struct(&self, desc: &StructDesc) -> RenderResult<String> {
        render("result struct", |out| members(out, &desc.name, &desc.members))
    }

    fn signature(&self, func: &FuncData) -> RenderResult<String> {
        render("signature", |sig| {
            if func.exported {
                sig.push_str("pub ");
            }
            write!(sig, "fn {}(&mut self", func.name)?;
            for arg in &func.args {
                write!(sig, ", {}: {}", arg.name, arg.ty)?;
            }
            write!(sig, ") -> Result<{}>", func.returns)
        })
    }

    fn body(&self, func: &FuncData) -> RenderResult<String> {
        let needs_row = matches!(
            func.kind,
            FuncKind::Insert
                | FuncKind::GetLast
                | FuncKind::Count
                | FuncKind::Has
                | FuncKind::SelectOne
                | FuncKind::SelectAll
                | FuncKind::SelectPaged
                | FuncKind::Update
        );
        match &func.fallback {
            // An update read back by row identity needs the lookup to bind it
            Some(fallback) if func.kind == FuncKind::Update && fallback.lookup.is_none() => {
                return Err(failed(
                    "body",
                    format!("{} reads back without a row lookup", func.name),
                ));
            }
            None if needs_row && func.row.is_none() => {
                return Err(failed("body", format!("{} has no row to decode", func.name)));
            }
            _ => {}
        }
        render("body", |out| body(out, func))
    }

    fn decl(&self, receiver: &str, signature: &str, body: &str) -> RenderResult<String> {
        render("decl", |out| {
            writeln!(out, "impl<E: Executor> {}<E> {{", receiver)?;
            writeln!(out, "    {} {{", signature)?;
            for line in body.lines() {
                if line.is_empty() {
                    out.push('\n');
                } else {
                    writeln!(out, "        {}", line)?;
                }
            }
            writeln!(out, "    }}\n}}\n")
        })
    }

    fn footer(&self, signatures: &[&str]) -> RenderResult<String> {
        render("footer", |out| {
            writeln!(out, "/// Data-access methods provided by every dialect receiver")?;
            writeln!(out, "pub trait Methods {{")?;
            for signature in signatures {
                let declaration = signature.strip_prefix("pub ").unwrap_or(signature);
                writeln!(out, "    {};", declaration)?;
            }
            writeln!(out, "}}")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Arg, Fallback, Lookup};

    fn func(kind: FuncKind) -> FuncData {
        FuncData {
            kind,
            name: "update_post_by_post_id".to_string(),
            exported: true,
            args: vec![
                Arg { name: "title".to_string(), ty: "String".to_string() },
                Arg { name: "post_id".to_string(), ty: "i64".to_string() },
            ],
            sql: "UPDATE post SET title = ? WHERE post.id = ?".to_string(),
            binds: vec!["title".to_string(), "post_id".to_string()],
            returns: "Option<Post>".to_string(),
            row: Some(RowDesc { ty: "Post".to_string(), nested: true }),
            fallback: None,
        }
    }

    #[test]
    fn test_signature() {
        let sig = RustTemplates.signature(&func(FuncKind::Update)).unwrap();
        assert_eq!(
            sig,
            "pub fn update_post_by_post_id(&mut self, title: String, post_id: i64) -> Result<Option<Post>>"
        );
    }

    #[test]
    fn test_update_fallback_body() {
        let mut data = func(FuncKind::Update);
        data.fallback = Some(Fallback {
            lookup: Some(Lookup {
                sql: "SELECT _rowid_ FROM post WHERE post.id = ?".to_string(),
                binds: vec!["post_id".to_string()],
            }),
            get_last: "get_last_post".to_string(),
        });
        let body = RustTemplates.body(&data).unwrap();
        assert!(body.contains("vec![Value::from(post_id.clone())]"));
        assert!(body.contains("self.get_last_post(rowid).map(Some)"));
        // The lookup runs before the update consumes the arguments
        assert!(body.find("LOOKUP").unwrap() < body.find("const SQL").unwrap());
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal("SELECT \"user\".id"), "\"SELECT \\\"user\\\".id\"");
        assert_eq!(string_literal("a\n\"#b"), "r##\"a\n\"#b\"##");
    }

    #[test]
    fn test_footer_strips_visibility() {
        let footer = RustTemplates
            .footer(&["pub fn a(&mut self) -> Result<()>"])
            .unwrap();
        assert!(footer.contains("    fn a(&mut self) -> Result<()>;"));
    }

    #[test]
    fn test_update_fallback_without_lookup_fails() {
        let mut data = func(FuncKind::Update);
        data.fallback = Some(Fallback {
            lookup: None,
            get_last: "get_last_post".to_string(),
        });
        let err = RustTemplates.body(&data).unwrap_err();
        assert!(matches!(err, RenderError::Template { ref template, .. } if template == "body"));
    }

    #[test]
    fn test_missing_row_fails() {
        let mut data = func(FuncKind::SelectOne);
        data.row = None;
        assert!(matches!(
            RustTemplates.body(&data),
            Err(RenderError::Template { .. })
        ));
    }
}
