//! dbgen code renderer
//!
//! Renders the IR into one data-access source artifact: a header with the
//! model structs and per-dialect schema, result structs, one method per
//! query and dialect, and a footer manifest of the exported methods.
//!
//! # Example
//!
//! ```rust
//! use dbgen_code::{Renderer, Verbatim};
//! use dbgen_sql::DialectRegistry;
//!
//! let ir = dbgen_syntax::compile(r#"
//!     model user ( field id int64 autoincrement, field name text )
//!     insert user
//! "#).unwrap();
//! let dialects = DialectRegistry::builtin().resolve_all(&["sqlite3"]).unwrap();
//!
//! let rendered = Renderer::new("db").with_formatter(Verbatim).render(&ir, &dialects).unwrap();
//! assert!(rendered.source.contains("fn create_user"));
//! ```

mod descriptor;
mod error;
mod format;
mod renderer;
mod signatures;
mod templates;

pub use descriptor::{
    Arg, Fallback, FuncData, FuncKind, HeaderDialect, HeaderParams, Lookup, Member, ModelStruct,
    RowDesc, StructDesc,
};
pub use error::{RenderError, RenderResult};
pub use format::{Formatter, Rustfmt, Verbatim};
pub use renderer::{Rendered, Renderer, driver};
pub use signatures::Signatures;
pub use templates::{RustTemplates, Templates};

#[cfg(test)]
mod tests {
    use super::*;
    use dbgen_core::ir::Ir;
    use dbgen_sql::{Dialect, DialectError, DialectRegistry};
    use std::sync::Arc;

    const USER: &str = r#"
        model user (
            field id int64 autoincrement
            field name text
        )
        insert user
        select user ( where user.id = ? )
    "#;

    fn compile(source: &str) -> Ir {
        dbgen_syntax::compile(source).unwrap()
    }

    fn dialects(names: &[&str]) -> Vec<Arc<dyn Dialect>> {
        DialectRegistry::builtin().resolve_all(names).unwrap()
    }

    fn render(ir: &Ir, names: &[&str]) -> Rendered {
        Renderer::new("db")
            .with_formatter(Verbatim)
            .render(ir, &dialects(names))
            .unwrap()
    }

    #[test]
    fn test_user_scenario_without_returning() {
        let rendered = render(&compile(USER), &["sqlite3"]);
        let source = &rendered.source;
        assert!(source.contains("pub fn create_user(&mut self, name: String) -> Result<User>"));
        assert!(source.contains("pub fn get_user_by_user_id(&mut self, user_id: i64) -> Result<Option<User>>"));
        assert_eq!(source.matches("fn get_last_user(").count(), 1);
        assert!(source.contains("self.get_last_user(rowid)"));
    }

    #[test]
    fn test_user_scenario_with_returning() {
        let rendered = render(&compile(USER), &["postgres"]);
        let source = &rendered.source;
        assert!(source.contains("fn create_user("));
        assert!(source.contains("fn get_user_by_user_id("));
        assert!(!source.contains("get_last"));
        assert!(source.contains("RETURNING id, name"));
    }

    #[test]
    fn test_get_last_deduplicated_per_model() {
        let ir = compile(
            r#"
            model post (
                unique title
                field id int64 autoincrement
                field title text ( updatable )
            )
            insert post
            insert post
            update post ( where post.id = ? )
            update post ( where post.title = ? )
            "#,
        );
        let rendered = render(&ir, &["sqlite3", "postgres"]);
        assert_eq!(rendered.source.matches("fn get_last_post(").count(), 1);
        // Private accessors stay out of the manifest
        assert!(rendered.signatures.iter().all(|s| !s.contains("get_last")));
    }

    #[test]
    fn test_manifest_deduplicated_across_dialects() {
        let ir = compile(USER);
        let rendered = render(&ir, &["postgres", "sqlite3"]);

        // Each dialect renders its own methods...
        assert_eq!(rendered.source.matches("pub fn create_user(").count(), 2);
        // ...but the manifest lists each signature once, sorted
        let manifest: Vec<&str> = rendered.signatures.iter().collect();
        assert_eq!(
            manifest,
            vec![
                "pub fn create_user(&mut self, name: String) -> Result<User>",
                "pub fn get_user_by_user_id(&mut self, user_id: i64) -> Result<Option<User>>",
            ]
        );
        let footer = &rendered.source[rendered.source.find("pub trait Methods").unwrap()..];
        assert_eq!(footer.matches("fn create_user(").count(), 1);
    }

    #[test]
    fn test_signatures_threaded_through_calls() {
        let ir = compile(USER);
        let renderer = Renderer::new("db").with_formatter(Verbatim);
        let first = renderer.render(&ir, &dialects(&["postgres"])).unwrap();
        let second = renderer
            .render_with(&ir, &dialects(&["sqlite3"]), first.signatures.clone())
            .unwrap();
        assert_eq!(second.signatures, first.signatures);
    }

    #[test]
    fn test_header() {
        let rendered = render(&compile(USER), &["postgres", "sqlite3"]);
        let source = &rendered.source;
        assert!(source.contains("pub const POSTGRES_DRIVER: &str = \"postgres\";"));
        assert!(source.contains("pub const SQLITE3_DRIVER: &str = \"rusqlite\";"));
        assert!(source.contains("pub const SQLITE3_SCHEMA: &str = r#\"CREATE TABLE \"user\""));
        assert!(source.contains("pub struct PostgresDb<E>"));
        assert!(source.contains("pub struct User {\n    pub id: i64,\n    pub name: String,\n}"));
    }

    #[test]
    fn test_result_structs_rendered_once() {
        let ir = compile(
            r#"
            model user (
                field id int64 autoincrement
                field name text
                field email text
            )
            select user.name user.email ( where user.id = ? )
            select user.name user.email
            "#,
        );
        let rendered = render(&ir, &["postgres", "sqlite3"]);
        assert_eq!(rendered.source.matches("pub struct UserNameUserEmailRow {").count(), 1);
        assert!(rendered.source.contains("pub user_name: String,"));
        assert!(rendered.source.contains(
            "pub fn all_user_name_user_email(&mut self) -> Result<Vec<UserNameUserEmailRow>>"
        ));
    }

    #[test]
    fn test_query_kinds() {
        let ir = compile(
            r#"
            model user (
                field id int64 autoincrement
                field name text ( nullable, updatable )
            )
            model post (
                field id int64 autoincrement
                field user_id int64
            )
            relation post.user_id user.id
            select post ( where user.name = ?, paged post.id 20 )
            count post ( where post.user_id = ? )
            update user ( where user.id = ? )
            delete post ( where post.id = ? )
            delete post ( where post.user_id = ? )
            "#,
        );
        let source = render(&ir, &["sqlite3"]).source;
        assert!(source.contains("pub fn all_post_by_user_name(&mut self, user_name: String) -> Result<Vec<Post>>"));
        assert!(source.contains(
            "pub fn paged_post_by_user_name(&mut self, user_name: String, after: i64) -> Result<Vec<Post>>"
        ));
        assert!(source.contains("pub fn count_post_by_post_user_id(&mut self, post_user_id: i64) -> Result<i64>"));
        assert!(source.contains("pub fn has_post_by_post_user_id(&mut self, post_user_id: i64) -> Result<bool>"));
        assert!(source.contains(
            "pub fn update_user_by_user_id(&mut self, name: Option<String>, user_id: i64) -> Result<Option<User>>"
        ));
        assert!(source.contains("const LOOKUP: &str = \"SELECT _rowid_ FROM \\\"user\\\" WHERE \\\"user\\\".id = ?\";"));
        assert!(source.contains("pub fn delete_post_by_post_id(&mut self, post_id: i64) -> Result<bool>"));
        assert!(source.contains("pub fn delete_post_by_post_user_id(&mut self, post_user_id: i64) -> Result<u64>"));
    }

    #[test]
    fn test_unknown_driver_is_an_error() {
        struct Oracle;
        impl Dialect for Oracle {
            fn name(&self) -> &str {
                "oracle"
            }
            fn features(&self) -> dbgen_sql::Features {
                dbgen_sql::Features { returning: true, last_insert_id: false }
            }
            fn placeholder_style(&self) -> dbgen_sql::PlaceholderStyle {
                dbgen_sql::PlaceholderStyle::Dollar
            }
            fn pagination_style(&self) -> dbgen_sql::PaginationStyle {
                dbgen_sql::PaginationStyle::FetchFirst
            }
            fn column_type(&self, _: &dbgen_core::ir::Field) -> String {
                "clob".to_string()
            }
        }

        let dialects: Vec<Arc<dyn Dialect>> = vec![Arc::new(Oracle)];
        let err = Renderer::new("db")
            .with_formatter(Verbatim)
            .render(&compile(USER), &dialects)
            .unwrap_err();
        assert!(matches!(err, RenderError::Dialect(DialectError::Unsupported { .. })));
    }

    #[test]
    fn test_formatter_failure_falls_back() {
        struct Broken;
        impl Formatter for Broken {
            fn format(&self, _: &str) -> RenderResult<String> {
                Err(RenderError::Format("boom".to_string()))
            }
        }

        let ir = compile(USER);
        let rendered = Renderer::new("db")
            .with_formatter(Broken)
            .render(&ir, &dialects(&["postgres"]))
            .unwrap();
        assert!(!rendered.formatted);
        assert!(rendered.source.contains("pub trait Methods"));
    }

    #[test]
    fn test_descriptors_serialize() {
        let desc = StructDesc {
            name: "UserRow".to_string(),
            members: vec![Member { name: "id".to_string(), ty: "i64".to_string(), nested: false }],
        };
        let json = serde_json::to_value(&desc).unwrap();
        assert_eq!(json["members"][0]["ty"], "i64");
        assert_eq!(serde_json::to_value(FuncKind::SelectPaged).unwrap(), "select-paged");
    }
}
