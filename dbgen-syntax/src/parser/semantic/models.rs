//! Model registration and relation resolution

use super::{SemanticAnalyzer, SemanticError};
use crate::parser::ast;
use dbgen_core::ir::{Field, FieldId, FieldType, Literal, Model, OnDelete, Relation};
use heck::ToSnakeCase;
use std::collections::HashMap;

impl SemanticAnalyzer {
    pub(super) fn register_model(&mut self, model: &ast::Model) {
        let name = &model.name;
        // Models whose names differ only in case or separators would
        // generate the same struct
        let key = name.value.to_snake_case();
        if let Some(&previous) = self.model_names.get(&key) {
            self.error(SemanticError::DuplicateModel {
                name: name.value.clone(),
                position: name.position,
                previous,
            });
            return;
        }
        self.model_names.insert(key, name.position);

        let (table, table_position) = match &model.table {
            Some(t) => (t.value.clone(), t.position),
            None => (name.value.to_snake_case(), name.position),
        };
        if let Some(&previous) = self.table_names.get(&table) {
            self.error(SemanticError::DuplicateTable {
                model: name.value.clone(),
                table: table.clone(),
                position: table_position,
                previous,
            });
        } else {
            self.table_names.insert(table.clone(), table_position);
        }

        let mut fields: Vec<Field> = Vec::with_capacity(model.fields.len());
        let mut columns: HashMap<String, dbgen_core::Position> = HashMap::new();
        for field in &model.fields {
            let column = field.name.value.to_snake_case();
            if let Some(&previous) = columns.get(&column) {
                self.error(SemanticError::DuplicateColumn {
                    model: name.value.clone(),
                    field: field.name.value.clone(),
                    column,
                    position: field.name.position,
                    previous,
                });
                continue;
            }
            columns.insert(column.clone(), field.name.position);
            self.check_attributes(field);
            fields.push(Field {
                name: field.name.value.clone(),
                column,
                ty: field.ty.value,
                nullable: field.nullable,
                autoincrement: field.autoincrement,
                autoinsert: field.autoinsert,
                autoupdate: field.autoupdate,
                updatable: field.updatable,
                default: field.default.as_ref().map(|d| d.value.clone()),
                length: field.length.as_ref().map(|l| l.value),
                position: field.position,
            });
        }

        let lookup = |key: &ast::Name| fields.iter().position(|f| f.name == key.value).map(FieldId);

        let primary_key = match &model.key {
            Some(key) => self.resolve_key(&name.value, key, &lookup),
            None => {
                let auto: Vec<FieldId> = fields
                    .iter()
                    .enumerate()
                    .filter(|(_, f)| f.autoincrement)
                    .map(|(i, _)| FieldId(i))
                    .collect();
                if auto.len() == 1 {
                    auto
                } else {
                    self.error(SemanticError::MissingPrimaryKey {
                        model: name.value.clone(),
                        position: name.position,
                    });
                    Vec::new()
                }
            }
        };

        for &id in &primary_key {
            if fields[id.0].nullable {
                self.error(SemanticError::MalformedKey {
                    model: name.value.clone(),
                    message: format!("key field {} is nullable", fields[id.0].name),
                    position: fields[id.0].position,
                });
            }
        }

        let mut unique: Vec<Vec<FieldId>> = Vec::new();
        for key in &model.uniques {
            let resolved = self.resolve_key(&name.value, key, &lookup);
            if resolved.is_empty() {
                continue;
            }
            if resolved == primary_key || unique.contains(&resolved) {
                self.error(SemanticError::MalformedKey {
                    model: name.value.clone(),
                    message: "unique key repeats an existing key".to_string(),
                    position: key[0].position,
                });
                continue;
            }
            unique.push(resolved);
        }

        self.ir.models.push(Model {
            name: name.value.clone(),
            table,
            fields,
            primary_key,
            unique,
            position: model.position,
        });
    }

    /// Resolve key field names; any problem yields an empty key
    fn resolve_key(
        &mut self,
        model: &str,
        key: &[ast::Name],
        lookup: &impl Fn(&ast::Name) -> Option<FieldId>,
    ) -> Vec<FieldId> {
        let mut resolved = Vec::with_capacity(key.len());
        let mut valid = true;
        for name in key {
            match lookup(name) {
                Some(id) if resolved.contains(&id) => {
                    self.error(SemanticError::MalformedKey {
                        model: model.to_string(),
                        message: format!("{} appears twice", name.value),
                        position: name.position,
                    });
                    valid = false;
                }
                Some(id) => resolved.push(id),
                None => {
                    self.error(SemanticError::UnknownField {
                        model: model.to_string(),
                        field: name.value.clone(),
                        position: name.position,
                    });
                    valid = false;
                }
            }
        }
        if valid { resolved } else { Vec::new() }
    }

    fn check_attributes(&mut self, field: &ast::Field) {
        let ty = field.ty.value;
        let mut invalid = |message: String| {
            self.errors.push(SemanticError::InvalidAttribute {
                message,
                position: field.position,
            })
        };

        if field.autoincrement && !ty.is_integer() {
            invalid(format!("autoincrement field {} must be int or int64, not {}", field.name.value, ty));
        }
        if field.autoincrement && field.nullable {
            invalid(format!("autoincrement field {} cannot be nullable", field.name.value));
        }
        if (field.autoinsert || field.autoupdate) && ty != FieldType::Timestamp {
            invalid(format!(
                "autoinsert/autoupdate field {} must be a timestamp, not {}",
                field.name.value, ty
            ));
        }
        if field.length.is_some() && ty != FieldType::Text {
            invalid(format!("length is only allowed on text fields, {} is {}", field.name.value, ty));
        }
        if let Some(default) = &field.default {
            if !literal_fits(&default.value, ty, field.nullable) {
                invalid(format!(
                    "default {} does not fit field {} of type {}",
                    default.value.to_sql(),
                    field.name.value,
                    ty
                ));
            }
        }
    }

    pub(super) fn resolve_relation(&mut self, relation: &ast::Relation) {
        let left = self.resolve_column(&relation.left);
        let right = self.resolve_column(&relation.right);
        let (Some(left), Some(right)) = (left, right) else {
            return;
        };

        let mut problems = Vec::new();
        if left.model == right.model {
            problems.push("both ends are on the same model".to_string());
        }

        let (l, r) = (self.ir.field(left), self.ir.field(right));
        if l.ty != r.ty {
            problems.push(format!("type {} does not match {}", l.ty, r.ty));
        }
        let target = self.ir.model(right.model);
        if !target.unique_keys().any(|key| key == [right.field]) {
            problems.push(format!("{} is not a single-field unique key", self.ir.display(right)));
        }
        let on_delete = relation.on_delete.as_ref().map(|o| o.value);
        if on_delete == Some(OnDelete::SetNull) && !l.nullable {
            problems.push(format!("set_null requires {} to be nullable", self.ir.display(left)));
        }
        if self.ir.relations.iter().any(|r| r.left == left && r.right == right) {
            problems.push("declared twice".to_string());
        }

        if !problems.is_empty() {
            let (left_name, right_name) = (self.ir.display(left), self.ir.display(right));
            for message in problems {
                self.error(SemanticError::InvalidRelation {
                    left: left_name.clone(),
                    right: right_name.clone(),
                    message,
                    position: relation.position,
                });
            }
            return;
        }

        self.ir.relations.push(Relation {
            left,
            right,
            on_delete,
            position: relation.position,
        });
    }
}

/// Whether a literal is a valid value for a column of type `ty`
pub(super) fn literal_fits(literal: &Literal, ty: FieldType, nullable: bool) -> bool {
    match literal {
        Literal::Null => nullable,
        Literal::Bool(_) => ty == FieldType::Bool,
        Literal::Int(_) => ty.is_integer() || ty == FieldType::Float64,
        Literal::String(_) => matches!(ty, FieldType::Text | FieldType::Timestamp | FieldType::Blob),
    }
}
