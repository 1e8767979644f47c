//! IR -> generated source
//!
//! Walks the IR once per dialect, turning each query into a [`FuncData`]
//! descriptor (SQL from the dialect, arguments from the statement's
//! parameters) and handing it to the [`Templates`].

use crate::descriptor::{
    Arg, Fallback, FuncData, FuncKind, HeaderDialect, HeaderParams, Lookup, Member, ModelStruct,
    RowDesc, StructDesc,
};
use crate::error::RenderResult;
use crate::format::{Formatter, Rustfmt};
use crate::signatures::Signatures;
use crate::templates::{RustTemplates, Templates};
use dbgen_core::ir::{
    Column, Condition, Field, FieldType, Ir, Literal, ModelId, Operand, Operator, Projection,
    ResultShape, Select,
};
use dbgen_sql::{Dialect, DialectError, Param, Statement};
use heck::{ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Driver crate for each supported dialect
const DRIVERS: &[(&str, &str)] = &[("postgres", "postgres"), ("sqlite3", "rusqlite")];

/// Driver crate registered for a dialect
pub fn driver(dialect: &str) -> Result<&'static str, DialectError> {
    DRIVERS
        .iter()
        .find(|(name, _)| *name == dialect)
        .map(|(_, driver)| *driver)
        .ok_or_else(|| DialectError::Unsupported {
            name: dialect.to_string(),
            known: DRIVERS.iter().map(|(name, _)| name.to_string()).collect(),
        })
}

/// Output of one render call
#[derive(Debug, Clone)]
pub struct Rendered {
    pub source: String,
    /// Every exported signature, including those passed in
    pub signatures: Signatures,
    /// Whether the formatter succeeded
    pub formatted: bool,
}

/// Code renderer
pub struct Renderer {
    module: String,
    templates: Box<dyn Templates>,
    formatter: Box<dyn Formatter>,
}

impl Renderer {
    /// Renderer with the built-in Rust templates, formatted by `rustfmt`
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            templates: Box::new(RustTemplates),
            formatter: Box::new(Rustfmt::default()),
        }
    }

    pub fn with_templates(mut self, templates: impl Templates + 'static) -> Self {
        self.templates = Box::new(templates);
        self
    }

    pub fn with_formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn render(&self, ir: &Ir, dialects: &[Arc<dyn Dialect>]) -> RenderResult<Rendered> {
        self.render_with(ir, dialects, Signatures::new())
    }

    /// Render, accumulating into an existing signature set
    pub fn render_with(
        &self,
        ir: &Ir,
        dialects: &[Arc<dyn Dialect>],
        mut signatures: Signatures,
    ) -> RenderResult<Rendered> {
        let mut out = self.templates.header(&self.header(ir, dialects)?)?;

        let mut seen = HashSet::new();
        for select in &ir.selects {
            let ResultShape::Struct(result) = &select.result else {
                continue;
            };
            if seen.insert(result.name.as_str()) {
                let desc = StructDesc {
                    name: result.name.clone(),
                    members: projection_members(ir, &result.fields),
                };
                out.push_str(&self.templates.result_struct(&desc)?);
            }
        }

        for dialect in dialects {
            let before = signatures.len();
            let funcs = functions(ir, dialect.as_ref())?;
            let receiver = receiver(dialect.name());
            for func in &funcs {
                let signature = self.templates.signature(func)?;
                let body = self.templates.body(func)?;
                out.push_str(&self.templates.decl(&receiver, &signature, &body)?);
                signatures.record(&signature);
            }
            debug!(
                dialect = dialect.name(),
                functions = funcs.len(),
                new_signatures = signatures.len() - before,
                "rendered dialect"
            );
        }

        let manifest: Vec<&str> = signatures.iter().collect();
        out.push_str(&self.templates.footer(&manifest)?);

        let (source, formatted) = match self.formatter.format(&out) {
            Ok(source) => (source, true),
            Err(e) => {
                warn!(error = %e, "formatting failed, emitting unformatted source");
                (out, false)
            }
        };
        Ok(Rendered {
            source,
            signatures,
            formatted,
        })
    }

    fn header(&self, ir: &Ir, dialects: &[Arc<dyn Dialect>]) -> RenderResult<HeaderParams> {
        let mut params = HeaderParams {
            module: self.module.clone(),
            dialects: Vec::new(),
            structs: ir
                .models()
                .map(|(id, model)| ModelStruct {
                    name: struct_name(&model.name),
                    table: model.table.clone(),
                    members: model_members(ir, id),
                })
                .collect(),
        };
        for dialect in dialects {
            params.dialects.push(HeaderDialect {
                name: dialect.name().to_string(),
                receiver: receiver(dialect.name()),
                constant: dialect.name().to_shouty_snake_case(),
                driver: driver(dialect.name())?.to_string(),
                schema: dialect.render_schema(ir),
            });
        }
        Ok(params)
    }
}

// ============================================================
// Names and types
// ============================================================

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
    "pub", "ref", "return", "static", "struct", "trait", "true", "try", "type", "unsafe", "use",
    "where", "while", "yield",
];

/// Identifier safe to use in generated code
fn ident(name: &str) -> String {
    let name = name.to_snake_case();
    match name.as_str() {
        "self" | "super" | "crate" | "" => format!("{}_", name),
        _ if KEYWORDS.contains(&name.as_str()) => format!("r#{}", name),
        _ if name.starts_with(|c: char| c.is_ascii_digit()) => format!("_{}", name),
        _ => name,
    }
}

fn struct_name(model: &str) -> String {
    model.to_upper_camel_case()
}

fn receiver(dialect: &str) -> String {
    format!("{}Db", dialect.to_upper_camel_case())
}

fn rust_type(ty: FieldType) -> &'static str {
    match ty {
        FieldType::Bool => "bool",
        FieldType::Int => "i32",
        FieldType::Int64 => "i64",
        FieldType::Float64 => "f64",
        FieldType::Text => "String",
        FieldType::Blob => "Vec<u8>",
        FieldType::Timestamp => "SystemTime",
    }
}

fn field_type(field: &Field) -> String {
    if field.nullable {
        format!("Option<{}>", rust_type(field.ty))
    } else {
        rust_type(field.ty).to_string()
    }
}

/// Hands out unique names, suffixing repeats with a counter
#[derive(Default)]
struct Namer {
    used: HashSet<String>,
}

impl Namer {
    fn claim(&mut self, base: String) -> String {
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

fn model_members(ir: &Ir, model: ModelId) -> Vec<Member> {
    let mut namer = Namer::default();
    ir.model(model)
        .fields
        .iter()
        .map(|field| Member {
            name: namer.claim(ident(&field.name)),
            ty: field_type(field),
            nested: false,
        })
        .collect()
}

fn projection_members(ir: &Ir, projections: &[Projection]) -> Vec<Member> {
    let mut namer = Namer::default();
    projections
        .iter()
        .map(|p| match *p {
            Projection::Model(model) => Member {
                name: namer.claim(ident(&ir.model(model).name)),
                ty: struct_name(&ir.model(model).name),
                nested: true,
            },
            Projection::Field(column) => Member {
                name: namer.claim(ident(&column_name(ir, column))),
                ty: field_type(ir.field(column)),
                nested: false,
            },
        })
        .collect()
}

/// `model_field`
fn column_name(ir: &Ir, column: Column) -> String {
    format!("{}_{}", ir.model(column.model).name, ir.field(column).name).to_snake_case()
}

fn op_suffix(op: Operator) -> &'static str {
    match op {
        Operator::Eq => "",
        Operator::Ne => "_not",
        Operator::Lt => "_less",
        Operator::Le => "_less_or_equal",
        Operator::Gt => "_greater",
        Operator::Ge => "_greater_or_equal",
    }
}

fn condition_name(ir: &Ir, condition: &Condition) -> String {
    let left = column_name(ir, condition.left);
    let op = op_suffix(condition.op);
    match &condition.right {
        Operand::Placeholder => format!("{}{}", left, op),
        Operand::Literal(Literal::Null) if condition.op == Operator::Eq => {
            format!("{}_is_null", left)
        }
        Operand::Literal(Literal::Null) => format!("{}_is_not_null", left),
        Operand::Literal(Literal::Bool(b)) => format!("{}{}_{}", left, op, b),
        Operand::Literal(Literal::Int(i)) if *i < 0 => format!("{}{}_minus_{}", left, op, i.unsigned_abs()),
        Operand::Literal(Literal::Int(i)) => format!("{}{}_{}", left, op, i),
        Operand::Literal(Literal::String(s)) => {
            let word = s.to_snake_case();
            format!("{}{}_{}", left, op, if word.is_empty() { "empty" } else { &word })
        }
        Operand::Column(column) => format!("{}{}_{}", left, op, column_name(ir, *column)),
    }
}

/// `verb_subject[_by_conditions]`
fn func_name(ir: &Ir, verb: &str, subject: &str, conditions: &[Condition]) -> String {
    let mut name = format!("{}_{}", verb, subject);
    if !conditions.is_empty() {
        name.push_str("_by");
        for condition in conditions {
            name.push('_');
            name.push_str(&condition_name(ir, condition));
        }
    }
    ident(&name)
}

fn select_subject(ir: &Ir, select: &Select) -> String {
    let parts: Vec<String> = select
        .projections
        .iter()
        .map(|p| match *p {
            Projection::Model(model) => ir.model(model).name.to_snake_case(),
            Projection::Field(column) => column_name(ir, column),
        })
        .collect();
    parts.join("_")
}

fn row_desc(ir: &Ir, shape: &ResultShape) -> RowDesc {
    match shape {
        ResultShape::Model(model) => RowDesc {
            ty: struct_name(&ir.model(*model).name),
            nested: true,
        },
        ResultShape::Field(column) => RowDesc {
            ty: field_type(ir.field(*column)),
            nested: false,
        },
        ResultShape::Struct(result) => RowDesc {
            ty: result.name.clone(),
            nested: true,
        },
    }
}

fn model_row(ir: &Ir, model: ModelId) -> RowDesc {
    row_desc(ir, &ResultShape::Model(model))
}

// ============================================================
// Function descriptors
// ============================================================

/// Arguments for a statement's parameters, with names in placeholder order
struct Binder<'a> {
    ir: &'a Ir,
    namer: Namer,
    args: Vec<Arg>,
    binds: Vec<String>,
    /// Names bound to `Filter` parameters, in order
    filters: Vec<String>,
}

impl<'a> Binder<'a> {
    fn new(ir: &'a Ir) -> Self {
        Self {
            ir,
            namer: Namer::default(),
            args: Vec::new(),
            binds: Vec::new(),
            filters: Vec::new(),
        }
    }

    fn bind(mut self, statement: &Statement) -> Self {
        for param in &statement.params {
            let (base, ty) = match *param {
                Param::Value(column) => {
                    (ident(&self.ir.field(column).name), field_type(self.ir.field(column)))
                }
                Param::Filter(column) => (
                    ident(&column_name(self.ir, column)),
                    rust_type(self.ir.field(column).ty).to_string(),
                ),
                Param::Cursor(column) => {
                    ("after".to_string(), rust_type(self.ir.field(column).ty).to_string())
                }
                Param::RowId => ("rowid".to_string(), "i64".to_string()),
            };
            let name = self.namer.claim(base);
            if matches!(param, Param::Filter(_)) {
                self.filters.push(name.clone());
            }
            self.binds.push(name.clone());
            self.args.push(Arg { name, ty });
        }
        self
    }
}

struct FuncBuilder<'a> {
    ir: &'a Ir,
    dialect: &'a dyn Dialect,
    names: Namer,
    funcs: Vec<FuncData>,
    /// get-last accessor per model, for dialects without `RETURNING`
    get_last: HashMap<ModelId, String>,
}

impl FuncBuilder<'_> {
    fn push(
        &mut self,
        kind: FuncKind,
        name: String,
        statement: &Statement,
        returns: String,
        row: Option<RowDesc>,
        fallback: Option<Fallback>,
    ) {
        let binder = Binder::new(self.ir).bind(statement);
        self.funcs.push(FuncData {
            kind,
            name: self.names.claim(name),
            exported: kind != FuncKind::GetLast,
            args: binder.args,
            sql: statement.sql.clone(),
            binds: binder.binds,
            returns,
            row,
            fallback,
        });
    }

    fn fallback(&self, model: ModelId) -> Option<Fallback> {
        self.get_last.get(&model).map(|name| Fallback {
            lookup: None,
            get_last: name.clone(),
        })
    }
}

/// Every function rendered for one dialect, in output order
fn functions(ir: &Ir, dialect: &dyn Dialect) -> RenderResult<Vec<FuncData>> {
    let mut b = FuncBuilder {
        ir,
        dialect,
        names: Namer::default(),
        funcs: Vec::new(),
        get_last: HashMap::new(),
    };

    let returning = dialect.features().returning;
    if !returning {
        for &model in &ir.returning_targets {
            let name = b.names.claim(ident(&format!("get_last_{}", ir.model(model).name)));
            b.get_last.insert(model, name);
        }
    }

    for insert in &ir.inserts {
        let model = ir.model(insert.model);
        let statement = b.dialect.render_insert(ir, insert);
        b.push(
            FuncKind::Insert,
            ident(&format!("create_{}", model.name)),
            &statement,
            struct_name(&model.name),
            Some(model_row(ir, insert.model)),
            b.fallback(insert.model),
        );
    }

    for select in &ir.selects {
        let subject = select_subject(ir, select);
        let row = row_desc(ir, &select.result);
        let statement = b.dialect.render_select(ir, select);
        if select.one() {
            b.push(
                FuncKind::SelectOne,
                func_name(ir, "get", &subject, &select.conditions),
                &statement,
                format!("Option<{}>", row.ty),
                Some(row),
                None,
            );
        } else {
            b.push(
                FuncKind::SelectAll,
                func_name(ir, "all", &subject, &select.conditions),
                &statement,
                format!("Vec<{}>", row.ty),
                Some(row.clone()),
                None,
            );
            if let Some(page) = b.dialect.render_select_page(ir, select) {
                b.push(
                    FuncKind::SelectPaged,
                    func_name(ir, "paged", &subject, &select.conditions),
                    &page,
                    format!("Vec<{}>", row.ty),
                    Some(row),
                    None,
                );
            }
        }
    }

    for count in &ir.counts {
        let subject = ir.model(count.model).name.to_snake_case();
        let total = b.dialect.render_count(ir, count);
        b.push(
            FuncKind::Count,
            func_name(ir, "count", &subject, &count.conditions),
            &total,
            "i64".to_string(),
            Some(RowDesc { ty: "i64".to_string(), nested: false }),
            None,
        );
        let has = b.dialect.render_has(ir, count);
        b.push(
            FuncKind::Has,
            func_name(ir, "has", &subject, &count.conditions),
            &has,
            "bool".to_string(),
            Some(RowDesc { ty: "bool".to_string(), nested: false }),
            None,
        );
    }

    for update in &ir.updates {
        let model = ir.model(update.model);
        let statement = b.dialect.render_update(ir, update);
        let fallback = match b.fallback(update.model) {
            Some(mut fallback) => {
                let lookup = b.dialect.render_rowid_lookup(ir, update)?;
                let filters = Binder::new(ir).bind(&statement).filters;
                fallback.lookup = Some(Lookup {
                    sql: lookup.sql,
                    binds: filters,
                });
                Some(fallback)
            }
            None => None,
        };
        b.push(
            FuncKind::Update,
            func_name(ir, "update", &model.name.to_snake_case(), &update.conditions),
            &statement,
            format!("Option<{}>", struct_name(&model.name)),
            Some(model_row(ir, update.model)),
            fallback,
        );
    }

    for delete in &ir.deletes {
        let subject = ir.model(delete.model).name.to_snake_case();
        let statement = b.dialect.render_delete(ir, delete);
        let (kind, returns) = if delete.one() {
            (FuncKind::DeleteOne, "bool")
        } else {
            (FuncKind::DeleteAll, "u64")
        };
        b.push(
            kind,
            func_name(ir, "delete", &subject, &delete.conditions),
            &statement,
            returns.to_string(),
            None,
            None,
        );
    }

    // One accessor per written model, however many inserts and updates touch it
    if !returning {
        for &model in &ir.returning_targets {
            let statement = b.dialect.render_get_last(ir, model)?;
            let Some(name) = b.get_last.get(&model).cloned() else {
                continue;
            };
            let binder = Binder::new(ir).bind(&statement);
            b.funcs.push(FuncData {
                kind: FuncKind::GetLast,
                name,
                exported: false,
                args: binder.args,
                sql: statement.sql,
                binds: binder.binds,
                returns: struct_name(&ir.model(model).name),
                row: Some(model_row(ir, model)),
                fallback: None,
            });
        }
    }

    Ok(b.funcs)
}
