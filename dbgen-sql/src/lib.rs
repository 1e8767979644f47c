//! dbgen SQL dialects
//!
//! A [`Dialect`] describes one SQL backend (feature flags, placeholder and
//! pagination syntax, column types) and renders IR nodes into statements.
//! Dialects are looked up by name through the [`DialectRegistry`].

mod dialect;
mod error;
mod postgres;
mod registry;
mod render;
mod sqlite;
mod statement;

pub use dialect::{Dialect, DialectInfo, Features, PaginationStyle, PlaceholderStyle};
pub use error::DialectError;
pub use postgres::Postgres;
pub use registry::DialectRegistry;
pub use sqlite::Sqlite3;
pub use statement::{Param, Statement};

#[cfg(test)]
mod tests {
    use super::*;
    use dbgen_core::ir::{Column, FieldId, Ir, ModelId};

    const SCHEMA: &str = r#"
        model user (
            unique email
            field id int64 autoincrement
            field email text ( length 255 )
            field name text ( updatable, nullable )
            field active bool ( default true )
        )
        model post (
            field id int64 autoincrement
            field user_id int64
            field title text ( updatable )
            field created_at timestamp autoinsert
            field updated_at timestamp autoinsert autoupdate
        )
        relation post.user_id user.id ( on_delete cascade )

        insert user
        insert post
        select user ( where user.id = ? )
        select post.title user.name ( where user.email = ?, where user.name != null )
        select post ( where post.user_id = ?, paged post.id 50 )
        update post ( where post.id = ? )
        delete post ( where post.id = ? )
        delete post ( where user.email = ? )
        count post ( where user.id = ? )
    "#;

    fn ir() -> Ir {
        dbgen_syntax::compile(SCHEMA).unwrap()
    }

    #[test]
    fn test_postgres_schema() {
        let sql = Postgres.render_schema(&ir());
        assert_eq!(
            sql,
            "CREATE TABLE \"user\" (\n    \
             id bigserial NOT NULL,\n    \
             email varchar(255) NOT NULL,\n    \
             name text,\n    \
             active boolean NOT NULL DEFAULT TRUE,\n    \
             PRIMARY KEY ( id ),\n    \
             UNIQUE ( email )\n);\n\
             \n\
             CREATE TABLE post (\n    \
             id bigserial NOT NULL,\n    \
             user_id bigint NOT NULL,\n    \
             title text NOT NULL,\n    \
             created_at timestamp with time zone NOT NULL,\n    \
             updated_at timestamp with time zone NOT NULL,\n    \
             PRIMARY KEY ( id ),\n    \
             FOREIGN KEY ( user_id ) REFERENCES \"user\" ( id ) ON DELETE CASCADE\n);\n"
        );
    }

    #[test]
    fn test_sqlite_schema_types() {
        let sql = Sqlite3.render_schema(&ir());
        assert!(sql.contains("id INTEGER NOT NULL"));
        assert!(sql.contains("created_at TIMESTAMP NOT NULL"));
    }

    #[test]
    fn test_select_placeholders() {
        let ir = ir();
        let select = &ir.selects[1];
        let pg = Postgres.render_select(&ir, select);
        assert_eq!(
            pg.sql,
            "SELECT post.title, \"user\".name FROM post \
             LEFT JOIN \"user\" ON \"user\".id = post.user_id \
             WHERE \"user\".email = $1 AND \"user\".name IS NOT NULL"
        );
        assert_eq!(pg.params.len(), 1);

        let lite = Sqlite3.render_select(&ir, select);
        assert!(lite.sql.contains("\"user\".email = ? AND"));
    }

    #[test]
    fn test_select_one_model() {
        let ir = ir();
        let stmt = Sqlite3.render_select(&ir, &ir.selects[0]);
        assert_eq!(
            stmt.sql,
            "SELECT \"user\".id, \"user\".email, \"user\".name, \"user\".active FROM \"user\" WHERE \"user\".id = ?"
        );
        assert_eq!(
            stmt.params,
            vec![Param::Filter(Column::new(ModelId(0), FieldId(0)))]
        );
    }

    #[test]
    fn test_paged_select() {
        let ir = ir();
        let select = &ir.selects[2];
        assert!(Postgres.render_select_page(&ir, &ir.selects[0]).is_none());

        let pg = Postgres.render_select_page(&ir, select).unwrap();
        assert!(pg.sql.ends_with(
            "WHERE post.user_id = $1 AND post.id > $2 ORDER BY post.id FETCH FIRST 50 ROWS ONLY"
        ));
        assert!(matches!(pg.params[1], Param::Cursor(_)));

        let lite = Sqlite3.render_select_page(&ir, select).unwrap();
        assert!(lite.sql.ends_with("AND post.id > ? ORDER BY post.id LIMIT 50"));

        // The unpaged form stays available
        let all = Postgres.render_select(&ir, select);
        assert!(!all.sql.contains("ORDER BY"));
    }

    #[test]
    fn test_insert_returning() {
        let ir = ir();
        let pg = Postgres.render_insert(&ir, &ir.inserts[1]);
        assert_eq!(
            pg.sql,
            "INSERT INTO post ( user_id, title, created_at, updated_at ) \
             VALUES ( $1, $2, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP ) \
             RETURNING id, user_id, title, created_at, updated_at"
        );
        assert_eq!(pg.params.len(), 2);

        let lite = Sqlite3.render_insert(&ir, &ir.inserts[1]);
        assert!(!lite.sql.contains("RETURNING"));
        assert!(lite.sql.contains("VALUES ( ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP )"));
    }

    #[test]
    fn test_insert_default_values() {
        let ir = dbgen_syntax::compile(
            "model tag ( field id int64 autoincrement )\ninsert tag\n",
        )
        .unwrap();
        let pg = Postgres.render_insert(&ir, &ir.inserts[0]);
        assert_eq!(pg.sql, "INSERT INTO tag DEFAULT VALUES RETURNING id");
        assert!(pg.params.is_empty());

        let lite = Sqlite3.render_insert(&ir, &ir.inserts[0]);
        assert_eq!(lite.sql, "INSERT INTO tag DEFAULT VALUES");
    }

    #[test]
    fn test_update() {
        let ir = ir();
        let update = &ir.updates[0];
        let pg = Postgres.render_update(&ir, update);
        assert_eq!(
            pg.sql,
            "UPDATE post SET title = $1, updated_at = CURRENT_TIMESTAMP WHERE post.id = $2 \
             RETURNING id, user_id, title, created_at, updated_at"
        );
        assert!(matches!(pg.params[0], Param::Value(_)));
        assert!(matches!(pg.params[1], Param::Filter(_)));

        let lookup = Sqlite3.render_rowid_lookup(&ir, update).unwrap();
        assert_eq!(lookup.sql, "SELECT _rowid_ FROM post WHERE post.id = ?");
    }

    #[test]
    fn test_delete() {
        let ir = ir();
        let plain = Postgres.render_delete(&ir, &ir.deletes[0]);
        assert_eq!(plain.sql, "DELETE FROM post WHERE post.id = $1");
        assert!(ir.deletes[0].one());

        let joined = Postgres.render_delete(&ir, &ir.deletes[1]);
        assert_eq!(
            joined.sql,
            "DELETE FROM post WHERE post.id IN ( SELECT post.id FROM post \
             LEFT JOIN \"user\" ON \"user\".id = post.user_id WHERE \"user\".email = $1 )"
        );
    }

    #[test]
    fn test_count_and_has() {
        let ir = ir();
        let count = &ir.counts[0];
        let tail = "FROM post LEFT JOIN \"user\" ON \"user\".id = post.user_id WHERE \"user\".id = ?";
        assert_eq!(
            Sqlite3.render_count(&ir, count).sql,
            format!("SELECT COUNT(*) {}", tail)
        );
        assert_eq!(
            Sqlite3.render_has(&ir, count).sql,
            format!("SELECT EXISTS( SELECT 1 {} )", tail)
        );
    }

    #[test]
    fn test_get_last() {
        let ir = ir();
        let user = ir.model_by_name("user").unwrap();
        let stmt = Sqlite3.render_get_last(&ir, user).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT \"user\".id, \"user\".email, \"user\".name, \"user\".active FROM \"user\" WHERE _rowid_ = ?"
        );
        assert_eq!(stmt.params, vec![Param::RowId]);

        let err = Postgres.render_get_last(&ir, user).unwrap_err();
        assert!(matches!(err, DialectError::NoFallback { .. }));
    }

    #[test]
    fn test_rendering_is_pure() {
        let ir = ir();
        let before = ir.clone();
        for dialect in DialectRegistry::builtin().resolve_all(&["postgres", "sqlite3"]).unwrap() {
            dialect.render_schema(&ir);
            for select in &ir.selects {
                dialect.render_select(&ir, select);
            }
        }
        assert_eq!(ir, before);
    }
}
