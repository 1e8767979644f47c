//! Abstract Syntax Tree for the schema DSL
//!
//! This module defines the typed constructs of the DSL and projects the
//! untyped [`tree`](super::tree) onto them. Each construct kind has a field
//! table mapping field names to handlers; a handler runs once per
//! occurrence, and single-valued fields reject a second definition.

use crate::parser::lexer::Spanned;
use crate::parser::parser::{ParseError, ParseResult};
use crate::parser::tree::{SyntaxNode, TokenNode, TupleNode, Value};
use dbgen_core::Position;
use dbgen_core::ir::{FieldType, Literal, OnDelete, Operator};
use std::collections::HashMap;

/// An identifier with its position
pub type Name = Spanned<String>;

/// Root AST node - every construct of one schema source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub models: Vec<Model>,
    pub relations: Vec<Relation>,
    pub inserts: Vec<Insert>,
    pub selects: Vec<Select>,
    pub updates: Vec<Update>,
    pub deletes: Vec<Delete>,
    pub counts: Vec<Count>,
}

// ============================================================
// Models
// ============================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: Name,

    /// SQL table name override
    pub table: Option<Name>,

    /// Primary key field names
    pub key: Option<Vec<Name>>,

    pub uniques: Vec<Vec<Name>>,
    pub fields: Vec<Field>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: Name,
    pub ty: Spanned<FieldType>,
    pub nullable: bool,
    pub autoincrement: bool,
    pub autoinsert: bool,
    pub autoupdate: bool,
    pub updatable: bool,
    pub default: Option<Spanned<Literal>>,
    pub length: Option<Spanned<u32>>,
    pub position: Position,
}

impl Field {
    pub fn new(name: Name, ty: Spanned<FieldType>) -> Self {
        let position = name.position;
        Self {
            name,
            ty,
            nullable: false,
            autoincrement: false,
            autoinsert: false,
            autoupdate: false,
            updatable: false,
            default: None,
            length: None,
            position,
        }
    }
}

/// `model.field` reference
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub model: Name,
    pub field: Name,
    pub position: Position,
}

impl ColumnRef {
    /// Source length of `model.field`
    pub fn len(&self) -> usize {
        self.model.value.len() + 1 + self.field.value.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Referencing column
    pub left: ColumnRef,
    /// Referenced column
    pub right: ColumnRef,
    pub on_delete: Option<Spanned<OnDelete>>,
    pub position: Position,
}

// ============================================================
// Queries
// ============================================================

/// A projected item of a select
#[derive(Debug, Clone, PartialEq)]
pub enum Selectable {
    Model(Name),
    Field(ColumnRef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub left: ColumnRef,
    pub right: ColumnRef,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Placeholder,
    Column(ColumnRef),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Where {
    pub left: ColumnRef,
    pub op: Operator,
    pub right: Operand,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paged {
    pub column: ColumnRef,
    pub page_size: Spanned<i64>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub projections: Vec<Selectable>,
    pub joins: Vec<Join>,
    pub wheres: Vec<Where>,
    pub paged: Option<Paged>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub model: Name,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub model: Name,
    pub wheres: Vec<Where>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub model: Name,
    pub joins: Vec<Join>,
    pub wheres: Vec<Where>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Count {
    pub model: Name,
    pub joins: Vec<Join>,
    pub wheres: Vec<Where>,
    pub position: Position,
}

// ============================================================
// Field tables
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repeat {
    Once,
    Many,
}

type Apply<T> = fn(&mut T, &TokenNode, &SyntaxNode) -> ParseResult<()>;

struct Rule<T> {
    name: &'static str,
    repeat: Repeat,
    apply: Apply<T>,
}

impl<T> Rule<T> {
    const fn once(name: &'static str, apply: Apply<T>) -> Self {
        Self {
            name,
            repeat: Repeat::Once,
            apply,
        }
    }

    const fn many(name: &'static str, apply: Apply<T>) -> Self {
        Self {
            name,
            repeat: Repeat::Many,
            apply,
        }
    }
}

/// Run `rules` over `children`, rejecting unknown and duplicate fields
fn project<'a, T>(
    kind: &str,
    target: &mut T,
    children: impl IntoIterator<Item = (&'a TokenNode, &'a SyntaxNode)>,
    rules: &[Rule<T>],
) -> ParseResult<()> {
    let mut seen: HashMap<&'static str, Position> = HashMap::new();

    for (name, node) in children {
        let key = name.text();
        let Some(rule) = rules.iter().find(|r| r.name == key) else {
            if rules.is_empty() {
                return Err(ParseError::Invalid {
                    position: name.position,
                    message: format!("{} takes no options, got {:?}", kind, name.to_string()),
                });
            }
            let expected: Vec<&str> = rules.iter().map(|r| r.name).collect();
            return Err(ParseError::expected(name.position, &expected, name));
        };

        if rule.repeat == Repeat::Once {
            if let Some(&previous) = seen.get(rule.name) {
                return Err(ParseError::PreviouslyDefined {
                    position: name.position,
                    field: rule.name.to_string(),
                    kind: kind.to_string(),
                    previous,
                });
            }
            seen.insert(rule.name, name.position);
        }

        (rule.apply)(target, name, node)?;
    }

    Ok(())
}

// ============================================================
// Projection entry point
// ============================================================

const STATEMENTS: &[&str] = &[
    "model", "relation", "insert", "select", "update", "delete", "count",
];

/// Project parsed statements onto the typed AST
pub fn build(statements: &[TupleNode]) -> ParseResult<Schema> {
    let mut schema = Schema::default();

    for statement in statements {
        match statement.kind() {
            "model" => schema.models.push(model(statement)?),
            "relation" => schema.relations.push(relation(statement)?),
            "insert" => schema.inserts.push(insert(statement)?),
            "select" => schema.selects.push(select(statement)?),
            "update" => schema.updates.push(update(statement)?),
            "delete" => schema.deletes.push(delete(statement)?),
            "count" => schema.counts.push(count(statement)?),
            _ => {
                return Err(ParseError::expected(
                    statement.position(),
                    STATEMENTS,
                    &statement.keyword,
                ));
            }
        }
    }

    Ok(schema)
}

fn children(tuple: &TupleNode) -> impl Iterator<Item = (&TokenNode, &SyntaxNode)> {
    tuple.children.iter().map(|(name, node)| (name, node))
}

// ============================================================
// model
// ============================================================

struct ModelState {
    model: Model,
    field_names: HashMap<String, Position>,
}

fn model(tuple: &TupleNode) -> ParseResult<Model> {
    let [name] = exact_args::<1>(tuple, &["name"])?;
    let mut state = ModelState {
        model: Model {
            name: ident(name)?,
            table: None,
            key: None,
            uniques: Vec::new(),
            fields: Vec::new(),
            position: tuple.position(),
        },
        field_names: HashMap::new(),
    };

    let rules = [
        Rule::once("table", |s: &mut ModelState, _, node| {
            let [table] = value_args::<1>(node, &["table name"])?;
            s.model.table = Some(ident(table)?);
            Ok(())
        }),
        Rule::once("key", |s: &mut ModelState, _, node| {
            s.model.key = Some(ident_list(node)?);
            Ok(())
        }),
        Rule::many("unique", |s: &mut ModelState, _, node| {
            s.model.uniques.push(ident_list(node)?);
            Ok(())
        }),
        Rule::many("field", |s: &mut ModelState, name, node| {
            let field = field(name, node)?;
            if let Some(&previous) = s.field_names.get(&field.name.value) {
                return Err(ParseError::PreviouslyDefined {
                    position: field.name.position,
                    field: field.name.value.clone(),
                    kind: "model".to_string(),
                    previous,
                });
            }
            s.field_names.insert(field.name.value.clone(), field.name.position);
            s.model.fields.push(field);
            Ok(())
        }),
    ];

    project("model", &mut state, children(tuple), &rules)?;
    Ok(state.model)
}

const FLAGS: &[&str] = &[
    "nullable",
    "autoincrement",
    "autoinsert",
    "autoupdate",
    "updatable",
];

fn field(keyword: &TokenNode, node: &SyntaxNode) -> ParseResult<Field> {
    let SyntaxNode::Tuple(tuple) = node else {
        return Err(ParseError::expected(keyword.position, &["field name"], "newline"));
    };
    let (name, ty, flags) = match tuple.args.as_slice() {
        [name, ty, flags @ ..] => (name, ty, flags),
        [only] => return Err(ParseError::expected(only.position, &["field type"], "nothing")),
        [] => return Err(ParseError::expected(keyword.position, &["field name"], "nothing")),
    };

    let mut field = Field::new(ident(name)?, field_type(ty)?);

    // Words after the type are flags, same as flags inside a group
    let trailing: Vec<(TokenNode, SyntaxNode)> = flags
        .iter()
        .map(|flag| match &flag.value {
            Value::Ident(_) => Ok((flag.clone(), SyntaxNode::Token(flag.clone()))),
            _ => Err(ParseError::expected(flag.position, FLAGS, flag)),
        })
        .collect::<ParseResult<_>>()?;

    let rules = [
        Rule::once("nullable", |f: &mut Field, name, node| {
            f.nullable = flag(name, node)?;
            Ok(())
        }),
        Rule::once("autoincrement", |f: &mut Field, name, node| {
            f.autoincrement = flag(name, node)?;
            Ok(())
        }),
        Rule::once("autoinsert", |f: &mut Field, name, node| {
            f.autoinsert = flag(name, node)?;
            Ok(())
        }),
        Rule::once("autoupdate", |f: &mut Field, name, node| {
            f.autoupdate = flag(name, node)?;
            Ok(())
        }),
        Rule::once("updatable", |f: &mut Field, name, node| {
            f.updatable = flag(name, node)?;
            Ok(())
        }),
        Rule::once("length", |f: &mut Field, _, node| {
            let [length] = value_args::<1>(node, &["length"])?;
            let value = integer(length)?;
            let value = u32::try_from(value.value)
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| ParseError::Invalid {
                    position: length.position,
                    message: format!("length must be a positive integer, got {}", value.value),
                })?;
            f.length = Some(Spanned::new(value, length.position, length.len));
            Ok(())
        }),
        Rule::once("default", |f: &mut Field, _, node| {
            let [value] = value_args::<1>(node, &["default value"])?;
            f.default = Some(literal(value)?);
            Ok(())
        }),
    ];

    let all = trailing
        .iter()
        .map(|(name, node)| (name, node))
        .chain(children(tuple));
    project("field", &mut field, all, &rules)?;
    Ok(field)
}

fn field_type(token: &TokenNode) -> ParseResult<Spanned<FieldType>> {
    let names: Vec<&str> = FieldType::ALL.iter().map(|t| t.name()).collect();
    match &token.value {
        Value::Ident(name) => FieldType::from_name(name)
            .map(|ty| Spanned::new(ty, token.position, token.len))
            .ok_or_else(|| ParseError::expected(token.position, &names, token)),
        _ => Err(ParseError::expected(token.position, &names, token)),
    }
}

// ============================================================
// relation
// ============================================================

fn relation(tuple: &TupleNode) -> ParseResult<Relation> {
    let [left, right] = exact_args::<2>(tuple, &["model.field"])?;
    let mut relation = Relation {
        left: column_ref(left)?,
        right: column_ref(right)?,
        on_delete: None,
        position: tuple.position(),
    };

    let rules = [Rule::once("on_delete", |r: &mut Relation, _, node| {
        let [action] = value_args::<1>(node, &["cascade", "set_null", "restrict"])?;
        let parsed = match action.text() {
            "cascade" => OnDelete::Cascade,
            "set_null" => OnDelete::SetNull,
            "restrict" => OnDelete::Restrict,
            _ => {
                return Err(ParseError::expected(
                    action.position,
                    &["cascade", "set_null", "restrict"],
                    action,
                ));
            }
        };
        r.on_delete = Some(Spanned::new(parsed, action.position, action.len));
        Ok(())
    })];

    project("relation", &mut relation, children(tuple), &rules)?;
    Ok(relation)
}

// ============================================================
// queries
// ============================================================

fn insert(tuple: &TupleNode) -> ParseResult<Insert> {
    let [model] = exact_args::<1>(tuple, &["model"])?;
    let mut insert = Insert {
        model: ident(model)?,
        position: tuple.position(),
    };
    project::<Insert>("insert", &mut insert, children(tuple), &[])?;
    Ok(insert)
}

fn select(tuple: &TupleNode) -> ParseResult<Select> {
    if tuple.args.is_empty() {
        return Err(ParseError::expected(
            tuple.position(),
            &["model", "model.field"],
            "nothing",
        ));
    }

    let projections = tuple
        .args
        .iter()
        .map(|arg| match &arg.value {
            Value::Ident(_) => Ok(Selectable::Model(ident(arg)?)),
            Value::Path(_) => Ok(Selectable::Field(column_ref(arg)?)),
            _ => Err(ParseError::expected(arg.position, &["model", "model.field"], arg)),
        })
        .collect::<ParseResult<Vec<_>>>()?;

    let mut select = Select {
        projections,
        joins: Vec::new(),
        wheres: Vec::new(),
        paged: None,
        position: tuple.position(),
    };

    let rules = [
        Rule::many("where", |s: &mut Select, name, node| {
            s.wheres.push(where_clause(name, node)?);
            Ok(())
        }),
        Rule::many("join", |s: &mut Select, name, node| {
            s.joins.push(join(name, node)?);
            Ok(())
        }),
        Rule::once("paged", |s: &mut Select, name, node| {
            let [column, size] = value_args::<2>(node, &["model.field", "page size"])?;
            s.paged = Some(Paged {
                column: column_ref(column)?,
                page_size: integer(size)?,
                position: name.position,
            });
            Ok(())
        }),
    ];

    project("select", &mut select, children(tuple), &rules)?;
    Ok(select)
}

fn update(tuple: &TupleNode) -> ParseResult<Update> {
    let [model] = exact_args::<1>(tuple, &["model"])?;
    let mut update = Update {
        model: ident(model)?,
        wheres: Vec::new(),
        position: tuple.position(),
    };

    let rules = [Rule::many("where", |u: &mut Update, name, node| {
        u.wheres.push(where_clause(name, node)?);
        Ok(())
    })];

    project("update", &mut update, children(tuple), &rules)?;
    Ok(update)
}

fn delete(tuple: &TupleNode) -> ParseResult<Delete> {
    let [model] = exact_args::<1>(tuple, &["model"])?;
    let mut delete = Delete {
        model: ident(model)?,
        joins: Vec::new(),
        wheres: Vec::new(),
        position: tuple.position(),
    };

    let rules = [
        Rule::many("where", |d: &mut Delete, name, node| {
            d.wheres.push(where_clause(name, node)?);
            Ok(())
        }),
        Rule::many("join", |d: &mut Delete, name, node| {
            d.joins.push(join(name, node)?);
            Ok(())
        }),
    ];

    project("delete", &mut delete, children(tuple), &rules)?;
    Ok(delete)
}

fn count(tuple: &TupleNode) -> ParseResult<Count> {
    let [model] = exact_args::<1>(tuple, &["model"])?;
    let mut count = Count {
        model: ident(model)?,
        joins: Vec::new(),
        wheres: Vec::new(),
        position: tuple.position(),
    };

    let rules = [
        Rule::many("where", |c: &mut Count, name, node| {
            c.wheres.push(where_clause(name, node)?);
            Ok(())
        }),
        Rule::many("join", |c: &mut Count, name, node| {
            c.joins.push(join(name, node)?);
            Ok(())
        }),
    ];

    project("count", &mut count, children(tuple), &rules)?;
    Ok(count)
}

fn where_clause(keyword: &TokenNode, node: &SyntaxNode) -> ParseResult<Where> {
    let [left, op, right] = value_args::<3>(node, &["model.field", "operator", "operand"])?;

    let op = match &op.value {
        Value::Operator(text) => Operator::from_sql(text),
        _ => None,
    }
    .ok_or_else(|| ParseError::expected(op.position, &["=", "!=", "<", "<=", ">", ">="], op))?;

    let right = match &right.value {
        Value::Placeholder => Operand::Placeholder,
        Value::Path(_) => Operand::Column(column_ref(right)?),
        _ => Operand::Literal(literal(right)?.value),
    };

    Ok(Where {
        left: column_ref(left)?,
        op,
        right,
        position: keyword.position,
    })
}

fn join(keyword: &TokenNode, node: &SyntaxNode) -> ParseResult<Join> {
    let [left, op, right] = value_args::<3>(node, &["model.field", "=", "model.field"])?;
    if op.value != Value::Operator("=") {
        return Err(ParseError::expected(op.position, &["="], op));
    }
    Ok(Join {
        left: column_ref(left)?,
        right: column_ref(right)?,
        position: keyword.position,
    })
}

// ============================================================
// Value helpers
// ============================================================

/// Statement arguments, exactly `N` of them
fn exact_args<'a, const N: usize>(
    tuple: &'a TupleNode,
    expected: &[&str],
) -> ParseResult<&'a [TokenNode; N]> {
    tuple.args.as_slice().try_into().map_err(|_| {
        let at = tuple.args.get(N).unwrap_or(&tuple.keyword);
        let found = if tuple.args.len() > N {
            at.to_string()
        } else {
            "nothing".to_string()
        };
        ParseError::expected(at.position, expected, found)
    })
}

/// Arguments of a child entry, exactly `N` of them and no nested group
fn value_args<'a, const N: usize>(
    node: &'a SyntaxNode,
    expected: &[&str],
) -> ParseResult<&'a [TokenNode; N]> {
    match node {
        SyntaxNode::Tuple(tuple) => {
            if let Some((name, _)) = tuple.children.first() {
                return Err(ParseError::Invalid {
                    position: name.position,
                    message: format!("{} does not take options", tuple.kind()),
                });
            }
            exact_args::<N>(tuple, expected)
        }
        SyntaxNode::Token(token) => Err(ParseError::expected(token.position, expected, "nothing")),
    }
}

fn flag(name: &TokenNode, node: &SyntaxNode) -> ParseResult<bool> {
    match node {
        SyntaxNode::Token(_) => Ok(true),
        SyntaxNode::Tuple(_) => Err(ParseError::Invalid {
            position: name.position,
            message: format!("{} is a flag and takes no value", name),
        }),
    }
}

fn ident(token: &TokenNode) -> ParseResult<Name> {
    match &token.value {
        Value::Ident(s) => Ok(Spanned::new(s.clone(), token.position, token.len)),
        _ => Err(ParseError::expected(token.position, &["identifier"], token)),
    }
}

fn ident_list(node: &SyntaxNode) -> ParseResult<Vec<Name>> {
    match node {
        SyntaxNode::Tuple(tuple) if tuple.children.is_empty() && !tuple.args.is_empty() => {
            tuple.args.iter().map(ident).collect()
        }
        other => Err(ParseError::expected(other.position(), &["field name"], "nothing")),
    }
}

fn column_ref(token: &TokenNode) -> ParseResult<ColumnRef> {
    if let Value::Path(path) = &token.value {
        if let Some((model, field)) = path.split_once('.') {
            if !field.contains('.') {
                let field_offset = model.len() + 1;
                let field_position = Position::new(
                    token.position.line,
                    token.position.column + field_offset,
                    token.position.offset + field_offset,
                );
                return Ok(ColumnRef {
                    model: Spanned::new(model.to_string(), token.position, model.len()),
                    field: Spanned::new(field.to_string(), field_position, field.len()),
                    position: token.position,
                });
            }
        }
    }
    Err(ParseError::expected(token.position, &["model.field"], token))
}

fn integer(token: &TokenNode) -> ParseResult<Spanned<i64>> {
    match token.value {
        Value::Integer(i) => Ok(Spanned::new(i, token.position, token.len)),
        _ => Err(ParseError::expected(token.position, &["integer"], token)),
    }
}

fn literal(token: &TokenNode) -> ParseResult<Spanned<Literal>> {
    let value = match &token.value {
        Value::Integer(i) => Literal::Int(*i),
        Value::String(s) => Literal::String(s.clone()),
        Value::Ident(s) if s == "true" => Literal::Bool(true),
        Value::Ident(s) if s == "false" => Literal::Bool(false),
        Value::Ident(s) if s == "null" => Literal::Null,
        _ => {
            return Err(ParseError::expected(
                token.position,
                &["integer", "string", "true", "false", "null"],
                token,
            ));
        }
    };
    Ok(Spanned::new(value, token.position, token.len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parser::parse;

    fn schema(source: &str) -> ParseResult<Schema> {
        build(&parse(source)?)
    }

    #[test]
    fn test_model() {
        let schema = schema(
            r#"
            model user (
                table users
                key id
                unique email
                field id int64 ( autoincrement )
                field email text ( length 255 )
                field name text ( nullable, updatable, default "anon" )
            )
            "#,
        )
        .unwrap();

        let model = &schema.models[0];
        assert_eq!(model.name.value, "user");
        assert_eq!(model.table.as_ref().unwrap().value, "users");
        assert_eq!(model.key.as_ref().unwrap()[0].value, "id");
        assert_eq!(model.uniques.len(), 1);
        assert_eq!(model.fields.len(), 3);
        assert!(model.fields[0].autoincrement);
        assert_eq!(model.fields[1].length.as_ref().unwrap().value, 255);
        let name = &model.fields[2];
        assert!(name.nullable && name.updatable);
        assert_eq!(
            name.default.as_ref().unwrap().value,
            Literal::String("anon".into())
        );
    }

    #[test]
    fn test_trailing_flags() {
        let schema = schema("model User (field id int64 autoincrement) (field name text)").unwrap();
        let model = &schema.models[0];
        assert_eq!(model.fields.len(), 2);
        assert!(model.fields[0].autoincrement);
        assert_eq!(model.fields[1].ty.value, FieldType::Text);
    }

    #[test]
    fn test_duplicate_field() {
        let err = schema("model User ( field id int64 ) ( field id text )").unwrap_err();
        assert_eq!(
            err,
            ParseError::PreviouslyDefined {
                position: Position::new(1, 39, 38),
                field: "id".to_string(),
                kind: "model".to_string(),
                previous: Position::new(1, 20, 19),
            }
        );
        assert_eq!(
            err.to_string(),
            "1:39: id already defined on model. previous definition at 1:20"
        );
    }

    #[test]
    fn test_duplicate_reports_first_definition() {
        let err = schema(
            "model user (\n  field id int64\n  field id text\n  field id blob\n  field id bool\n)",
        )
        .unwrap_err();
        match err {
            ParseError::PreviouslyDefined { position, previous, .. } => {
                assert_eq!(previous.line, 2);
                assert_eq!(position.line, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_attribute() {
        let err = schema("model user ( field id int64 nullable ( nullable ) )").unwrap_err();
        match err {
            ParseError::PreviouslyDefined { field, kind, previous, .. } => {
                assert_eq!(field, "nullable");
                assert_eq!(kind, "field");
                assert_eq!(previous.column, 29);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_single_field() {
        let err = schema("model user ( table a, table b, field id int64 )").unwrap_err();
        assert!(matches!(err, ParseError::PreviouslyDefined { ref field, .. } if field == "table"));
    }

    #[test]
    fn test_unknown_field() {
        let err = schema("model user ( colum id int64 )").unwrap_err();
        assert_eq!(
            err.to_string(),
            "1:14: expected one of [\"table\", \"key\", \"unique\", \"field\"], got \"colum\""
        );
    }

    #[test]
    fn test_unknown_statement() {
        let err = schema("create user").unwrap_err();
        assert!(err.to_string().contains("expected one of [\"model\""));
    }

    #[test]
    fn test_unknown_type() {
        let err = schema("model user ( field id serial )").unwrap_err();
        assert!(matches!(err, ParseError::Expected { ref found, .. } if found == "serial"));
    }

    #[test]
    fn test_queries() {
        let schema = schema(
            r#"
            relation post.user_id user.id ( on_delete cascade )
            insert user
            select user.name user.email ( where user.id = ? )
            select post ( join post.user_id = user.id, where user.email = ?, paged post.id 25 )
            update user ( where user.id = ? )
            delete post ( where post.title != "draft" )
            count post ( where post.user_id = user.id )
            "#,
        )
        .unwrap();

        assert_eq!(schema.relations[0].on_delete.as_ref().unwrap().value, OnDelete::Cascade);
        assert_eq!(schema.relations[0].right.field.value, "id");
        assert_eq!(schema.inserts[0].model.value, "user");

        let sel = &schema.selects[0];
        assert_eq!(sel.projections.len(), 2);
        assert_eq!(sel.wheres[0].op, Operator::Eq);
        assert_eq!(sel.wheres[0].right, Operand::Placeholder);

        let paged = &schema.selects[1];
        assert_eq!(paged.joins.len(), 1);
        assert_eq!(paged.paged.as_ref().unwrap().page_size.value, 25);

        assert_eq!(schema.updates.len(), 1);
        assert_eq!(
            schema.deletes[0].wheres[0].right,
            Operand::Literal(Literal::String("draft".into()))
        );
        assert!(matches!(schema.counts[0].wheres[0].right, Operand::Column(_)));
    }

    #[test]
    fn test_column_ref_positions() {
        let schema = schema("insert x\nrelation post.user_id user.id").unwrap();
        let left = &schema.relations[0].left;
        assert_eq!(left.model.position, Position::new(2, 10, 18));
        assert_eq!(left.field.position, Position::new(2, 15, 23));
        assert_eq!(left.len(), "post.user_id".len());
    }

    #[test]
    fn test_insert_takes_no_options() {
        let err = schema("insert user ( where user.id = ? )").unwrap_err();
        assert!(matches!(err, ParseError::Invalid { .. }));
    }

    #[test]
    fn test_bad_operator() {
        let err = schema("select user ( where user.id ? ? )").unwrap_err();
        assert!(matches!(err, ParseError::Expected { ref found, .. } if found == "?"));
    }

    #[test]
    fn test_bad_length() {
        let err = schema("model user ( field name text ( length 0 ) )").unwrap_err();
        assert!(err.to_string().contains("positive integer"));
    }
}
