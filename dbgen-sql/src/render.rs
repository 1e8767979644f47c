//! Shared statement rendering
//!
//! Every function here is a pure projection of the IR through a dialect's
//! description; the [`Dialect`] trait's default methods delegate here.

use crate::dialect::Dialect;
use crate::statement::{Param, Statement};
use dbgen_core::ir::{
    Column, Condition, Count, Delete, FieldId, Insert, Ir, Join, Literal, ModelId, Operand,
    Operator, Projection, Select, Update,
};

/// Words that must be quoted when used as table or column names
const RESERVED: &[&str] = &[
    "all", "and", "as", "asc", "by", "case", "check", "column", "constraint", "create",
    "default", "delete", "desc", "distinct", "else", "end", "exists", "from", "group", "having",
    "in", "index", "insert", "into", "is", "join", "key", "limit", "not", "null", "offset", "on",
    "or", "order", "primary", "references", "select", "set", "table", "then", "to", "union",
    "unique", "update", "user", "using", "values", "when", "where", "with",
];

pub(crate) fn quote_if_reserved(ident: &str) -> String {
    let plain = ident
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && ident
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if plain && !RESERVED.contains(&ident) {
        ident.to_string()
    } else {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}

/// Statement under construction; numbers placeholders as they are bound
struct Builder<'a, D: Dialect + ?Sized> {
    dialect: &'a D,
    ir: &'a Ir,
    params: Vec<Param>,
}

impl<'a, D: Dialect + ?Sized> Builder<'a, D> {
    fn new(dialect: &'a D, ir: &'a Ir) -> Self {
        Self {
            dialect,
            ir,
            params: Vec::new(),
        }
    }

    fn bind(&mut self, param: Param) -> String {
        self.params.push(param);
        self.dialect.placeholder_style().placeholder(self.params.len())
    }

    fn table(&self, model: ModelId) -> String {
        self.dialect.quote(&self.ir.model(model).table)
    }

    /// `column`
    fn bare(&self, column: Column) -> String {
        self.dialect.quote(&self.ir.field(column).column)
    }

    /// `table.column`
    fn qualified(&self, column: Column) -> String {
        format!("{}.{}", self.table(column.model), self.bare(column))
    }

    fn fields(&self, model: ModelId) -> impl Iterator<Item = Column> + '_ {
        self.ir
            .model(model)
            .field_ids()
            .map(move |field| Column::new(model, field))
    }

    fn all_columns(&self, model: ModelId) -> String {
        join(self.fields(model).map(|c| self.qualified(c)))
    }

    fn key(&self, model: ModelId) -> String {
        let key = &self.ir.model(model).primary_key;
        let columns = join(key.iter().map(|&f| self.qualified(Column::new(model, f))));
        if key.len() == 1 {
            columns
        } else {
            format!("( {} )", columns)
        }
    }

    fn joins(&self, joins: &[Join]) -> String {
        joins
            .iter()
            .map(|join| {
                format!(
                    " LEFT JOIN {} ON {} = {}",
                    self.table(join.right.model),
                    self.qualified(join.right),
                    self.qualified(join.left)
                )
            })
            .collect()
    }

    fn condition(&mut self, condition: &Condition) -> String {
        let left = self.qualified(condition.left);
        let op = condition.op.as_sql();
        match &condition.right {
            Operand::Placeholder => {
                let placeholder = self.bind(Param::Filter(condition.left));
                format!("{} {} {}", left, op, placeholder)
            }
            Operand::Column(column) => format!("{} {} {}", left, op, self.qualified(*column)),
            Operand::Literal(Literal::Null) if condition.op == Operator::Eq => {
                format!("{} IS NULL", left)
            }
            Operand::Literal(Literal::Null) => format!("{} IS NOT NULL", left),
            Operand::Literal(literal) => format!("{} {} {}", left, op, literal.to_sql()),
        }
    }

    /// ` WHERE a AND b ...`, or nothing
    ///
    /// A keyset cursor is bound after every condition.
    fn filter(&mut self, conditions: &[Condition], cursor: Option<Column>) -> String {
        let mut parts: Vec<String> = conditions.iter().map(|c| self.condition(c)).collect();
        if let Some(column) = cursor {
            let placeholder = self.bind(Param::Cursor(column));
            parts.push(format!("{} > {}", self.qualified(column), placeholder));
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", parts.join(" AND "))
        }
    }

    fn returning(&self, model: ModelId) -> String {
        if self.dialect.features().returning {
            format!(" RETURNING {}", join(self.fields(model).map(|c| self.bare(c))))
        } else {
            String::new()
        }
    }

    fn finish(self, sql: String) -> Statement {
        Statement {
            sql,
            params: self.params,
        }
    }
}

fn join(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(", ")
}

// ============================================================
// Statements
// ============================================================

pub(crate) fn schema<D: Dialect + ?Sized>(dialect: &D, ir: &Ir) -> String {
    let names = |model: ModelId, fields: &[FieldId]| {
        join(
            fields
                .iter()
                .map(|&f| dialect.quote(&ir.field(Column::new(model, f)).column)),
        )
    };

    let mut out = String::new();
    for (id, model) in ir.models() {
        let mut lines = Vec::new();
        for field in &model.fields {
            let mut line = format!("{} {}", dialect.quote(&field.column), dialect.column_type(field));
            if !field.nullable {
                line.push_str(" NOT NULL");
            }
            if let Some(default) = &field.default {
                line.push_str(" DEFAULT ");
                line.push_str(&default.to_sql());
            }
            lines.push(line);
        }
        lines.push(format!("PRIMARY KEY ( {} )", names(id, &model.primary_key)));
        for key in &model.unique {
            lines.push(format!("UNIQUE ( {} )", names(id, key)));
        }
        for relation in ir.outgoing(id) {
            let mut line = format!(
                "FOREIGN KEY ( {} ) REFERENCES {} ( {} )",
                names(id, std::slice::from_ref(&relation.left.field)),
                dialect.quote(&ir.model(relation.right.model).table),
                names(relation.right.model, std::slice::from_ref(&relation.right.field)),
            );
            if let Some(action) = relation.on_delete {
                line.push_str(" ON DELETE ");
                line.push_str(action.to_sql());
            }
            lines.push(line);
        }

        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!(
            "CREATE TABLE {} (\n    {}\n);\n",
            dialect.quote(&model.table),
            lines.join(",\n    ")
        ));
    }
    out
}

pub(crate) fn select<D: Dialect + ?Sized>(
    dialect: &D,
    ir: &Ir,
    select: &Select,
    paged: bool,
) -> Statement {
    let mut b = Builder::new(dialect, ir);
    let columns = join(select.projections.iter().map(|p| match *p {
        Projection::Model(model) => b.all_columns(model),
        Projection::Field(column) => b.qualified(column),
    }));

    let page = select.paged.filter(|_| paged);

    let mut sql = format!(
        "SELECT {} FROM {}{}",
        columns,
        b.table(select.model),
        b.joins(&select.joins)
    );
    sql.push_str(&b.filter(&select.conditions, page.map(|p| p.column)));
    if let Some(p) = page {
        sql.push_str(&format!(
            " ORDER BY {} {}",
            b.qualified(p.column),
            dialect.pagination_style().clause(p.page_size)
        ));
    }
    b.finish(sql)
}

pub(crate) fn insert<D: Dialect + ?Sized>(dialect: &D, ir: &Ir, insert: &Insert) -> Statement {
    let mut b = Builder::new(dialect, ir);
    let model = ir.model(insert.model);

    let mut columns = Vec::new();
    let mut values = Vec::new();
    for field in model.insert_columns() {
        let column = Column::new(insert.model, field);
        columns.push(b.bare(column));
        if model.field(field).autoinsert {
            values.push("CURRENT_TIMESTAMP".to_string());
        } else {
            values.push(b.bind(Param::Value(column)));
        }
    }

    let table = b.table(insert.model);
    let sql = if columns.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES{}", table, b.returning(insert.model))
    } else {
        format!(
            "INSERT INTO {} ( {} ) VALUES ( {} ){}",
            table,
            columns.join(", "),
            values.join(", "),
            b.returning(insert.model)
        )
    };
    b.finish(sql)
}

pub(crate) fn update<D: Dialect + ?Sized>(dialect: &D, ir: &Ir, update: &Update) -> Statement {
    let mut b = Builder::new(dialect, ir);
    let model = ir.model(update.model);

    let mut assignments = Vec::new();
    for field in model.update_columns() {
        let column = Column::new(update.model, field);
        let value = if model.field(field).updatable {
            b.bind(Param::Value(column))
        } else {
            "CURRENT_TIMESTAMP".to_string()
        };
        assignments.push(format!("{} = {}", b.bare(column), value));
    }

    let mut sql = format!(
        "UPDATE {} SET {}",
        b.table(update.model),
        assignments.join(", ")
    );
    sql.push_str(&b.filter(&update.conditions, None));
    sql.push_str(&b.returning(update.model));
    b.finish(sql)
}

pub(crate) fn delete<D: Dialect + ?Sized>(dialect: &D, ir: &Ir, delete: &Delete) -> Statement {
    let mut b = Builder::new(dialect, ir);
    let table = b.table(delete.model);

    let sql = if delete.joins.is_empty() {
        format!("DELETE FROM {}{}", table, b.filter(&delete.conditions, None))
    } else {
        // DELETE cannot join directly; select the doomed keys instead
        let key = b.key(delete.model);
        let joins = b.joins(&delete.joins);
        let filter = b.filter(&delete.conditions, None);
        format!(
            "DELETE FROM {} WHERE {} IN ( SELECT {} FROM {}{}{} )",
            table, key, key, table, joins, filter
        )
    };
    b.finish(sql)
}

pub(crate) fn count<D: Dialect + ?Sized>(dialect: &D, ir: &Ir, count: &Count, has: bool) -> Statement {
    let mut b = Builder::new(dialect, ir);
    let body = format!(
        "FROM {}{}{}",
        b.table(count.model),
        b.joins(&count.joins),
        b.filter(&count.conditions, None)
    );
    let sql = if has {
        format!("SELECT EXISTS( SELECT 1 {} )", body)
    } else {
        format!("SELECT COUNT(*) {}", body)
    };
    b.finish(sql)
}

pub(crate) fn get_last<D: Dialect + ?Sized>(
    dialect: &D,
    ir: &Ir,
    model: ModelId,
    rowid: &str,
) -> Statement {
    let mut b = Builder::new(dialect, ir);
    let placeholder = b.bind(Param::RowId);
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        b.all_columns(model),
        b.table(model),
        rowid,
        placeholder
    );
    b.finish(sql)
}

pub(crate) fn rowid_lookup<D: Dialect + ?Sized>(
    dialect: &D,
    ir: &Ir,
    update: &Update,
    rowid: &str,
) -> Statement {
    let mut b = Builder::new(dialect, ir);
    let mut sql = format!("SELECT {} FROM {}", rowid, b.table(update.model));
    sql.push_str(&b.filter(&update.conditions, None));
    b.finish(sql)
}
