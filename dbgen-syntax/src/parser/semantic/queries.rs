//! Query resolution: joins, conditions, cardinality and result shapes

use super::models::literal_fits;
use super::{SemanticAnalyzer, SemanticError};
use crate::parser::ast;
use dbgen_core::Position;
use dbgen_core::ir::{
    Cardinality, Condition, Count, Delete, Insert, Join, Literal, ModelId, Operand,
    Operator, Paged, Projection, ResultShape, ResultStruct, Select, Update,
};
use heck::ToUpperCamelCase;
use std::collections::VecDeque;

/// Models and joins of one query under construction
#[derive(Debug)]
struct Scope {
    base: ModelId,
    joins: Vec<Join>,
    members: Vec<ModelId>,
}

impl Scope {
    fn new(base: ModelId) -> Self {
        Self {
            base,
            joins: Vec::new(),
            members: vec![base],
        }
    }

    fn contains(&self, model: ModelId) -> bool {
        self.members.contains(&model)
    }

    fn push(&mut self, join: Join) {
        self.members.push(join.right.model);
        self.joins.push(join);
    }
}

enum PathError {
    Unreachable,
    Ambiguous,
}

impl SemanticAnalyzer {
    pub(super) fn resolve_insert(&mut self, insert: &ast::Insert) {
        let Some(model) = self.resolve_model(&insert.model.value, insert.model.position) else {
            return;
        };
        self.ir.inserts.push(Insert {
            model,
            position: insert.position,
        });
    }

    pub(super) fn resolve_select(&mut self, select: &ast::Select) {
        if let Some(resolved) = self.select(select) {
            self.ir.selects.push(resolved);
        }
    }

    pub(super) fn resolve_update(&mut self, update: &ast::Update) {
        if let Some(resolved) = self.update(update) {
            self.ir.updates.push(resolved);
        }
    }

    pub(super) fn resolve_delete(&mut self, delete: &ast::Delete) {
        let Some((scope, conditions)) =
            self.filtered(&delete.model, &delete.joins, &delete.wheres)
        else {
            return;
        };
        let cardinality = self.cardinality(&scope, &conditions);
        self.ir.deletes.push(Delete {
            model: scope.base,
            joins: scope.joins,
            conditions,
            cardinality,
            position: delete.position,
        });
    }

    pub(super) fn resolve_count(&mut self, count: &ast::Count) {
        let Some((scope, conditions)) = self.filtered(&count.model, &count.joins, &count.wheres)
        else {
            return;
        };
        self.ir.counts.push(Count {
            model: scope.base,
            joins: scope.joins,
            conditions,
            position: count.position,
        });
    }

    // ========================================
    // Select and update
    // ========================================

    fn select(&mut self, select: &ast::Select) -> Option<Select> {
        let mut projections = Vec::with_capacity(select.projections.len());
        let mut ok = true;
        for item in &select.projections {
            let projection = match item {
                ast::Selectable::Model(name) => self
                    .resolve_model(&name.value, name.position)
                    .map(Projection::Model),
                ast::Selectable::Field(column) => {
                    self.resolve_column(column).map(Projection::Field)
                }
            };
            match projection {
                Some(p) if projections.contains(&p) => {
                    self.error(SemanticError::InvalidQuery {
                        message: "the same item is projected twice".to_string(),
                        position: select.position,
                    });
                    ok = false;
                }
                Some(p) => projections.push(p),
                None => ok = false,
            }
        }
        let base = projections.first()?.model();

        let mut scope = Scope::new(base);
        ok &= self.explicit_joins(&mut scope, &select.joins);
        for projection in &projections {
            ok &= self.reach(&mut scope, projection.model(), select.position);
        }
        let conditions = self.conditions(&mut scope, &select.wheres);

        let paged = match &select.paged {
            Some(paged) => {
                let resolved = self.paged(&scope, paged);
                ok &= resolved.is_some();
                resolved
            }
            None => None,
        };

        if !ok {
            return None;
        }
        let conditions = conditions?;

        let cardinality = self.cardinality(&scope, &conditions);
        if let Some(p) = &select.paged {
            if cardinality == Cardinality::One {
                self.error(SemanticError::InvalidQuery {
                    message: "a select returning one row cannot be paged".to_string(),
                    position: p.position,
                });
                return None;
            }
        }

        let result = match projections.as_slice() {
            [Projection::Model(model)] => ResultShape::Model(*model),
            [Projection::Field(column)] => ResultShape::Field(*column),
            _ => ResultShape::Struct(ResultStruct {
                name: self.struct_name(&projections),
                fields: projections.clone(),
            }),
        };

        Some(Select {
            model: base,
            projections,
            joins: scope.joins,
            conditions,
            cardinality,
            paged,
            result,
            position: select.position,
        })
    }

    fn paged(&mut self, scope: &Scope, paged: &ast::Paged) -> Option<Paged> {
        let column = self.resolve_column(&paged.column)?;
        if column.model != scope.base {
            self.error(SemanticError::InvalidQuery {
                message: format!(
                    "paged column {} must be on {}",
                    self.ir.display(column),
                    self.ir.model(scope.base).name
                ),
                position: paged.column.position,
            });
            return None;
        }
        let Some(page_size) = u32::try_from(paged.page_size.value).ok().filter(|&n| n > 0) else {
            self.error(SemanticError::InvalidQuery {
                message: format!("page size must be positive, got {}", paged.page_size.value),
                position: paged.page_size.position,
            });
            return None;
        };
        Some(Paged { column, page_size })
    }

    fn update(&mut self, update: &ast::Update) -> Option<Update> {
        let model = self.resolve_model(&update.model.value, update.model.position)?;
        let name = self.ir.model(model).name.clone();

        let mut ok = true;
        if self.ir.model(model).updatable().next().is_none() {
            self.error(SemanticError::InvalidQuery {
                message: format!("model {} has no updatable fields", name),
                position: update.position,
            });
            ok = false;
        }

        // Only the updated model may be constrained; nothing is joined
        let mut scope = Scope::new(model);
        let mut foreign = false;
        for clause in &update.wheres {
            let other = [Some(&clause.left), operand_column(&clause.right)]
                .into_iter()
                .flatten()
                .find(|c| c.model.value != name);
            if let Some(column) = other {
                self.error(SemanticError::InvalidQuery {
                    message: format!("update conditions may only reference {}", name),
                    position: column.position,
                });
                foreign = true;
            }
        }
        if foreign {
            return None;
        }
        let conditions = self.conditions(&mut scope, &update.wheres)?;

        if self.cardinality(&scope, &conditions) != Cardinality::One {
            self.error(SemanticError::InvalidQuery {
                message: format!("update of {} must constrain a unique key", name),
                position: update.position,
            });
            return None;
        }

        ok.then_some(Update {
            model,
            conditions,
            position: update.position,
        })
    }

    /// Base model, joins and conditions shared by delete and count
    fn filtered(
        &mut self,
        model: &ast::Name,
        joins: &[ast::Join],
        wheres: &[ast::Where],
    ) -> Option<(Scope, Vec<Condition>)> {
        let base = self.resolve_model(&model.value, model.position)?;
        let mut scope = Scope::new(base);
        let joined = self.explicit_joins(&mut scope, joins);
        let conditions = self.conditions(&mut scope, wheres);
        if !joined {
            return None;
        }
        Some((scope, conditions?))
    }

    // ========================================
    // Joins
    // ========================================

    /// Add user-written joins; each must follow a declared relation
    fn explicit_joins(&mut self, scope: &mut Scope, joins: &[ast::Join]) -> bool {
        let mut ok = true;
        for join in joins {
            let left = self.resolve_column(&join.left);
            let right = self.resolve_column(&join.right);
            let (Some(left), Some(right)) = (left, right) else {
                ok = false;
                continue;
            };

            let related = self.ir.relations.iter().any(|r| {
                (r.left == left && r.right == right) || (r.left == right && r.right == left)
            });
            if !related {
                self.error(SemanticError::InvalidJoin {
                    left: self.ir.display(left),
                    right: self.ir.display(right),
                    position: join.position,
                });
                ok = false;
                continue;
            }

            match (scope.contains(left.model), scope.contains(right.model)) {
                (true, false) => scope.push(Join { left, right }),
                (false, true) => scope.push(Join {
                    left: right,
                    right: left,
                }),
                (true, true) => {
                    self.error(SemanticError::InvalidQuery {
                        message: format!(
                            "join {} = {} repeats a model already in the query",
                            self.ir.display(left),
                            self.ir.display(right)
                        ),
                        position: join.position,
                    });
                    ok = false;
                }
                (false, false) => {
                    self.error(SemanticError::InvalidQuery {
                        message: format!(
                            "join {} = {} does not touch a model already in the query",
                            self.ir.display(left),
                            self.ir.display(right)
                        ),
                        position: join.position,
                    });
                    ok = false;
                }
            }
        }
        ok
    }

    /// Bring `model` into the query, inferring joins when it is not there yet
    fn reach(&mut self, scope: &mut Scope, model: ModelId, position: Position) -> bool {
        if scope.contains(model) {
            return true;
        }
        match self.infer_path(scope, model) {
            Ok(path) => {
                for join in path {
                    scope.push(join);
                }
                true
            }
            Err(err) => {
                let base = self.ir.model(scope.base).name.clone();
                let target = self.ir.model(model).name.clone();
                self.error(match err {
                    PathError::Ambiguous => SemanticError::AmbiguousJoin {
                        base,
                        model: target,
                        position,
                    },
                    PathError::Unreachable => SemanticError::UnreachableModel {
                        base,
                        model: target,
                        position,
                    },
                });
                false
            }
        }
    }

    /// Breadth-first search over relations from every model in the query
    ///
    /// The shortest path must be unique; two relations between the same
    /// pair of models count as two paths.
    fn infer_path(&self, scope: &Scope, target: ModelId) -> Result<Vec<Join>, PathError> {
        const UNSEEN: usize = usize::MAX;
        let n = self.ir.models.len();
        let mut dist = vec![UNSEEN; n];
        let mut paths = vec![0u8; n];
        let mut parent: Vec<Option<Join>> = vec![None; n];
        let mut queue = VecDeque::new();

        for &member in &scope.members {
            dist[member.0] = 0;
            paths[member.0] = 1;
            queue.push_back(member);
        }

        while let Some(at) = queue.pop_front() {
            for relation in &self.ir.relations {
                let step = if relation.left.model == at {
                    Join {
                        left: relation.left,
                        right: relation.right,
                    }
                } else if relation.right.model == at {
                    Join {
                        left: relation.right,
                        right: relation.left,
                    }
                } else {
                    continue;
                };

                let next = step.right.model.0;
                if dist[next] == UNSEEN {
                    dist[next] = dist[at.0] + 1;
                    paths[next] = paths[at.0];
                    parent[next] = Some(step);
                    queue.push_back(step.right.model);
                } else if dist[next] == dist[at.0] + 1 {
                    paths[next] = paths[next].saturating_add(paths[at.0]).min(2);
                }
            }
        }

        match paths[target.0] {
            0 => return Err(PathError::Unreachable),
            1 => {}
            _ => return Err(PathError::Ambiguous),
        }

        let mut path = Vec::new();
        let mut at = target;
        while let Some(step) = parent[at.0] {
            path.push(step);
            at = step.left.model;
        }
        path.reverse();
        Ok(path)
    }

    // ========================================
    // Conditions and cardinality
    // ========================================

    /// Resolve where clauses, joining in any model they mention
    fn conditions(&mut self, scope: &mut Scope, wheres: &[ast::Where]) -> Option<Vec<Condition>> {
        let mut conditions = Vec::with_capacity(wheres.len());
        let mut ok = true;

        for clause in wheres {
            let left = self.resolve_column(&clause.left);
            let right = match &clause.right {
                ast::Operand::Placeholder => Some(Operand::Placeholder),
                ast::Operand::Literal(literal) => Some(Operand::Literal(literal.clone())),
                ast::Operand::Column(column) => self.resolve_column(column).map(Operand::Column),
            };
            let (Some(left), Some(right)) = (left, right) else {
                ok = false;
                continue;
            };

            ok &= self.reach(scope, left.model, clause.left.position);
            if let Operand::Column(column) = &right {
                ok &= self.reach(scope, column.model, clause.position);
            }

            let condition = Condition {
                left,
                op: clause.op,
                right,
            };
            if let Some(message) = self.check_condition(&condition) {
                self.error(SemanticError::InvalidQuery {
                    message,
                    position: clause.position,
                });
                ok = false;
                continue;
            }
            conditions.push(condition);
        }

        ok.then_some(conditions)
    }

    fn check_condition(&self, condition: &Condition) -> Option<String> {
        let field = self.ir.field(condition.left);
        match &condition.right {
            Operand::Placeholder => None,
            Operand::Literal(Literal::Null)
                if !matches!(condition.op, Operator::Eq | Operator::Ne) =>
            {
                Some("null can only be compared with = or !=".to_string())
            }
            Operand::Literal(Literal::Null) if !field.nullable => Some(format!(
                "{} is not nullable",
                self.ir.display(condition.left)
            )),
            Operand::Literal(Literal::Null) => None,
            Operand::Literal(literal) => (!literal_fits(literal, field.ty, field.nullable)).then(|| {
                format!(
                    "{} does not fit {} of type {}",
                    literal.to_sql(),
                    self.ir.display(condition.left),
                    field.ty
                )
            }),
            Operand::Column(column) => {
                let other = self.ir.field(*column);
                (other.ty != field.ty).then(|| {
                    format!(
                        "cannot compare {} ({}) with {} ({})",
                        self.ir.display(condition.left),
                        field.ty,
                        self.ir.display(*column),
                        other.ty
                    )
                })
            }
        }
    }

    /// `One` when equality conditions on the base model fix every field of
    /// a unique key and every join follows a relation to a unique column
    fn cardinality(&self, scope: &Scope, conditions: &[Condition]) -> Cardinality {
        let fixed: Vec<_> = conditions
            .iter()
            .filter(|c| c.left.model == scope.base && c.op == Operator::Eq)
            .filter(|c| match &c.right {
                Operand::Placeholder => true,
                Operand::Literal(literal) => *literal != Literal::Null,
                Operand::Column(_) => false,
            })
            .map(|c| c.left.field)
            .collect();

        let model = self.ir.model(scope.base);
        let covered = model
            .unique_keys()
            .any(|key| !key.is_empty() && key.iter().all(|f| fixed.contains(f)));
        let to_one = scope.joins.iter().all(|join| {
            self.ir
                .model(join.right.model)
                .unique_keys()
                .any(|key| key == [join.right.field])
        });

        if covered && to_one {
            Cardinality::One
        } else {
            Cardinality::Many
        }
    }

    fn struct_name(&self, projections: &[Projection]) -> String {
        let mut name: String = projections
            .iter()
            .map(|p| match *p {
                Projection::Model(model) => self.ir.model(model).name.to_upper_camel_case(),
                Projection::Field(column) => {
                    format!("{}_{}", self.ir.model(column.model).name, self.ir.field(column).name)
                        .to_upper_camel_case()
                }
            })
            .collect();
        name.push_str("Row");
        name
    }
}

fn operand_column(operand: &ast::Operand) -> Option<&ast::ColumnRef> {
    match operand {
        ast::Operand::Column(column) => Some(column),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{BLOG, analyze_source};
    use super::*;
    use dbgen_core::ir::Ir;

    fn resolve(queries: &str) -> Ir {
        analyze_source(&format!("{BLOG}\n{queries}")).unwrap()
    }

    fn errors(queries: &str) -> Vec<SemanticError> {
        analyze_source(&format!("{BLOG}\n{queries}")).unwrap_err().0
    }

    #[test]
    fn test_cardinality_by_primary_key() {
        let ir = resolve("select user ( where user.id = ? )\nselect user ( where user.name = ? )");
        assert_eq!(ir.selects[0].cardinality, Cardinality::One);
        assert_eq!(ir.selects[1].cardinality, Cardinality::Many);
        assert_eq!(ir.selects[0].result, ResultShape::Model(ModelId(0)));
    }

    #[test]
    fn test_cardinality_by_unique_key() {
        let ir = resolve(
            "select user.name ( where user.email = \"a@b.c\" )\nselect user.name ( where user.email != ? )",
        );
        assert!(ir.selects[0].one());
        assert!(!ir.selects[1].one());
        assert!(matches!(ir.selects[0].result, ResultShape::Field(_)));
    }

    #[test]
    fn test_cardinality_composite_key() {
        let source = r#"
            model member (
                key team person
                field team int64
                field person int64
                field role text
            )
        "#;
        let one = analyze_source(&format!(
            "{source}\ndelete member ( where member.team = ?, where member.person = ? )"
        ))
        .unwrap();
        assert!(one.deletes[0].one());

        // Dropping one covering condition reclassifies
        let many = analyze_source(&format!("{source}\ndelete member ( where member.team = ? )"))
            .unwrap();
        assert!(!many.deletes[0].one());
    }

    #[test]
    fn test_join_inference() {
        let ir = resolve("select comment user.name ( where user.id = ? )");
        let select = &ir.selects[0];
        assert_eq!(select.model, ir.model_by_name("comment").unwrap());
        let path: Vec<_> = select
            .joins
            .iter()
            .map(|j| (ir.display(j.left), ir.display(j.right)))
            .collect();
        assert_eq!(
            path,
            vec![
                ("comment.post_id".to_string(), "post.id".to_string()),
                ("post.user_id".to_string(), "user.id".to_string()),
            ]
        );
        // Every join is to-one but the base key is not constrained
        assert_eq!(select.cardinality, Cardinality::Many);
    }

    #[test]
    fn test_to_many_join_is_many() {
        let ir = resolve("select user post.title ( where user.id = ? )");
        assert_eq!(ir.selects[0].joins.len(), 1);
        assert_eq!(ir.selects[0].cardinality, Cardinality::Many);
    }

    #[test]
    fn test_result_struct() {
        let ir = resolve("select user.name user.email ( where user.id = ? )\nselect post user");
        let ResultShape::Struct(result) = &ir.selects[0].result else {
            panic!("expected struct");
        };
        assert_eq!(result.name, "UserNameUserEmailRow");
        assert_eq!(result.fields.len(), 2);
        let ResultShape::Struct(result) = &ir.selects[1].result else {
            panic!("expected struct");
        };
        assert_eq!(result.name, "PostUserRow");
    }

    #[test]
    fn test_explicit_join() {
        let ir = resolve("count post ( join user.id = post.user_id, where user.email = ? )");
        let join = ir.counts[0].joins[0];
        assert_eq!(ir.display(join.left), "post.user_id");
        assert_eq!(ir.display(join.right), "user.id");

        let errs = errors("count post ( join post.title = user.name )");
        assert!(matches!(errs[0], SemanticError::InvalidJoin { .. }));
    }

    #[test]
    fn test_ambiguous_join() {
        let errs = errors(
            r#"
            model follow (
                field id int64 autoincrement
                field follower int64
                field followee int64
            )
            relation follow.follower user.id
            relation follow.followee user.id
            select follow user.name
            "#,
        );
        assert!(matches!(
            errs[0],
            SemanticError::AmbiguousJoin { ref base, ref model, .. } if base == "follow" && model == "user"
        ));
    }

    #[test]
    fn test_explicit_join_resolves_ambiguity() {
        let ir = analyze_source(&format!(
            r#"{BLOG}
            model follow (
                field id int64 autoincrement
                field follower int64
                field followee int64
            )
            relation follow.follower user.id
            relation follow.followee user.id
            select follow user.name ( join follow.followee = user.id )
            "#
        ))
        .unwrap();
        assert_eq!(ir.selects[0].joins.len(), 1);
    }

    #[test]
    fn test_unreachable_model() {
        let errs = errors("model tag ( field id int64 autoincrement )\nselect tag user.name");
        assert!(matches!(errs[0], SemanticError::UnreachableModel { .. }));
    }

    #[test]
    fn test_where_rules() {
        let errs = errors(
            "select user ( where user.name = 3 )\nselect post ( where post.title < null )\nselect post ( where post.id = user.name )",
        );
        assert_eq!(errs.len(), 3);
        assert!(errs.iter().all(|e| matches!(e, SemanticError::InvalidQuery { .. })));
    }

    #[test]
    fn test_update_rules() {
        let ir = resolve("update user ( where user.id = ? )");
        assert_eq!(ir.updates.len(), 1);

        let errs = errors("update user ( where user.name = ? )");
        assert!(errs[0].to_string().contains("must constrain a unique key"));

        let errs = errors("update post ( where user.id = ? )");
        assert!(errs[0].to_string().contains("may only reference post"));

        let errs = errors("update comment ( where comment.id = ? )");
        assert!(errs[0].to_string().contains("no updatable fields"));
    }

    #[test]
    fn test_paged() {
        let ir = resolve("select post ( where post.user_id = ?, paged post.id 20 )");
        let paged = ir.selects[0].paged.unwrap();
        assert_eq!(paged.page_size, 20);
        assert_eq!(ir.display(paged.column), "post.id");

        let errs = errors("select post ( paged user.id 20 )");
        assert!(errs[0].to_string().contains("must be on post"));
        let errs = errors("select post ( paged post.id 0 )");
        assert!(errs[0].to_string().contains("page size"));
        let errs = errors("select post ( where post.id = ?, paged post.id 10 )");
        assert!(errs[0].to_string().contains("cannot be paged"));
    }

    #[test]
    fn test_delete_with_join() {
        let ir = resolve("delete comment ( where post.user_id = ? )");
        let delete = &ir.deletes[0];
        assert_eq!(delete.joins.len(), 1);
        assert!(!delete.one());
        assert_eq!(ir.display(delete.conditions[0].left), "post.user_id");
    }

    #[test]
    fn test_where_column_operand_reaches_model() {
        let ir = resolve("count comment ( where comment.body = post.title )");
        assert_eq!(ir.counts[0].joins.len(), 1);
    }
}
