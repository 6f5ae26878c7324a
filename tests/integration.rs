//! End-to-end SQL scenarios through the full pipeline:
//! lexer -> parser -> planner -> executor -> storage.

use modb::catalog::Catalog;
use modb::error::Error;
use modb::executor::{Executor, Planner, ResultSet};
use modb::sql::Parser;
use modb::storage::Value;

fn setup() -> (tempfile::TempDir, Executor) {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Catalog::new(dir.path().join("data")).unwrap();
    (dir, Executor::new(catalog))
}

/// Run one or more statements, returning the last result
fn exec(executor: &mut Executor, sql: &str) -> Result<ResultSet, Error> {
    let mut parser = Parser::new(sql);
    let statements = parser.parse_program();
    assert!(
        parser.errors().is_empty(),
        "parse errors for {:?}: {:?}",
        sql,
        parser.errors()
    );

    let planner = Planner::new();
    let mut last = ResultSet::empty();
    for stmt in statements {
        last = executor.execute(planner.plan(stmt))?;
    }
    Ok(last)
}

#[test]
fn test_unique_violation_on_primary_key() {
    let (_dir, mut executor) = setup();

    exec(
        &mut executor,
        "CREATE DATABASE d; USE d; \
         CREATE TABLE t (id INT PRIMARY KEY, name TEXT(16)); \
         INSERT INTO t VALUES (1, 'a');",
    )
    .unwrap();

    let err = exec(&mut executor, "INSERT INTO t VALUES (1, 'b');").unwrap_err();
    assert!(
        matches!(&err, Error::UniqueViolation { column, .. } if column == "id"),
        "got: {}",
        err
    );

    let result = exec(&mut executor, "SELECT * FROM t;").unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].values[0], Value::Int32(1));
    assert_eq!(result.rows[0].values[1], Value::Text("a".to_string()));
}

#[test]
fn test_named_column_insert_fills_nulls() {
    let (_dir, mut executor) = setup();

    exec(
        &mut executor,
        "CREATE DATABASE d; USE d; \
         CREATE TABLE u (id INT, tag TEXT(8)); \
         INSERT INTO u (tag) VALUES ('x');",
    )
    .unwrap();

    let result = exec(&mut executor, "SELECT * FROM u;").unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].values[0], Value::Null);
    assert_eq!(result.rows[0].values[1], Value::Text("x".to_string()));
}

#[test]
fn test_200_rows_spill_across_pages() {
    let (dir, mut executor) = setup();

    exec(
        &mut executor,
        "CREATE DATABASE d; USE d; CREATE TABLE t (id INT, name TEXT(16));",
    )
    .unwrap();

    for i in 0..200 {
        exec(
            &mut executor,
            &format!("INSERT INTO t VALUES ({}, 'row-padding-{}');", i, i % 10),
        )
        .unwrap();
    }

    let result = exec(&mut executor, "SELECT * FROM t;").unwrap();
    assert_eq!(result.rows.len(), 200);
    for (i, row) in result.rows.iter().enumerate() {
        assert_eq!(row.values[0], Value::Int32(i as i32), "row {} out of order", i);
    }

    // The heap spilled onto at least a second page
    let heap = dir.path().join("data").join("d").join("t.db");
    let size = std::fs::metadata(heap).unwrap().len();
    assert!(size >= 2 * 4096, "heap file is only {} bytes", size);
    assert!(result.rows.last().unwrap().page_id >= 1);
}

#[test]
fn test_update_then_delete_leaves_no_match() {
    let (_dir, mut executor) = setup();

    exec(
        &mut executor,
        "CREATE DATABASE d; USE d; \
         CREATE TABLE t (id INT, name TEXT(8)); \
         INSERT INTO t VALUES (3, 'q');",
    )
    .unwrap();

    let result = exec(&mut executor, "UPDATE t SET name = 'zz' WHERE id = 3;").unwrap();
    assert_eq!(result.message.as_deref(), Some("Updated 1 rows"));

    let result = exec(&mut executor, "DELETE FROM t WHERE id = 3;").unwrap();
    assert_eq!(result.message.as_deref(), Some("Deleted 1 rows"));

    let result = exec(&mut executor, "SELECT * FROM t WHERE id = 3;").unwrap();
    assert!(result.rows.is_empty());
}

#[test]
fn test_nested_loop_join_with_where() {
    let (_dir, mut executor) = setup();

    exec(
        &mut executor,
        "CREATE DATABASE d; USE d; \
         CREATE TABLE orders (user_id INT, amt INT); \
         CREATE TABLE users (id INT PRIMARY KEY, name TEXT(8)); \
         INSERT INTO orders VALUES (1, 10); \
         INSERT INTO orders VALUES (2, 20); \
         INSERT INTO orders VALUES (1, 30); \
         INSERT INTO users VALUES (1, 'a'); \
         INSERT INTO users VALUES (2, 'b');",
    )
    .unwrap();

    let result = exec(
        &mut executor,
        "SELECT orders.amt, users.name FROM orders JOIN users \
         ON orders.user_id = users.id WHERE user_id = 1;",
    )
    .unwrap();

    assert_eq!(result.columns, vec!["orders.amt", "users.name"]);
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[0].values[0], Value::Int32(10));
    assert_eq!(result.rows[0].values[1], Value::Text("a".to_string()));
    assert_eq!(result.rows[1].values[0], Value::Int32(30));
    assert_eq!(result.rows[1].values[1], Value::Text("a".to_string()));
}

#[test]
fn test_join_without_projection_qualifies_columns() {
    let (_dir, mut executor) = setup();

    exec(
        &mut executor,
        "CREATE DATABASE d; USE d; \
         CREATE TABLE a (id INT); \
         CREATE TABLE b (a_id INT); \
         INSERT INTO a VALUES (1); \
         INSERT INTO b VALUES (1);",
    )
    .unwrap();

    let result = exec(&mut executor, "SELECT * FROM a JOIN b ON a.id = b.a_id;").unwrap();
    assert_eq!(result.columns, vec!["a.id", "b.a_id"]);
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].values, vec![Value::Int32(1), Value::Int32(1)]);
}

#[test]
fn test_foreign_key_blocks_parent_delete() {
    let (_dir, mut executor) = setup();

    exec(
        &mut executor,
        "CREATE DATABASE d; USE d; \
         CREATE TABLE users (id INT PRIMARY KEY); \
         CREATE TABLE posts (author INT REFERENCES users(id)); \
         INSERT INTO users VALUES (1); \
         INSERT INTO posts VALUES (1);",
    )
    .unwrap();

    let err = exec(&mut executor, "DELETE FROM users WHERE id = 1;").unwrap_err();
    assert!(
        matches!(&err, Error::ForeignKeyViolation { table, column }
            if table == "posts" && column == "author"),
        "got: {}",
        err
    );

    // The parent row survives
    let result = exec(&mut executor, "SELECT * FROM users;").unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].values[0], Value::Int32(1));

    // Deleting the child first unblocks the parent
    exec(&mut executor, "DELETE FROM posts;").unwrap();
    let result = exec(&mut executor, "DELETE FROM users WHERE id = 1;").unwrap();
    assert_eq!(result.message.as_deref(), Some("Deleted 1 rows"));
}

#[test]
fn test_dml_before_use_fails_with_no_active_database() {
    let (_dir, mut executor) = setup();

    let err = exec(&mut executor, "CREATE TABLE t (id INT);").unwrap_err();
    assert!(matches!(err, Error::NoActiveDatabase), "got: {}", err);

    let err = exec(&mut executor, "SELECT * FROM t;").unwrap_err();
    assert!(matches!(err, Error::NoActiveDatabase), "got: {}", err);

    let err = exec(&mut executor, "INSERT INTO t VALUES (1);").unwrap_err();
    assert!(matches!(err, Error::NoActiveDatabase), "got: {}", err);
}

#[test]
fn test_where_operators() {
    let (_dir, mut executor) = setup();

    exec(
        &mut executor,
        "CREATE DATABASE d; USE d; CREATE TABLE t (id INT, name TEXT(8));",
    )
    .unwrap();
    for (id, name) in [(1, "a"), (2, "b"), (3, "c"), (4, "d")] {
        exec(
            &mut executor,
            &format!("INSERT INTO t VALUES ({}, '{}');", id, name),
        )
        .unwrap();
    }

    let count = |executor: &mut Executor, sql: &str| {
        exec(executor, sql).unwrap().rows.len()
    };

    assert_eq!(count(&mut executor, "SELECT * FROM t WHERE id = 2;"), 1);
    assert_eq!(count(&mut executor, "SELECT * FROM t WHERE id != 2;"), 3);
    assert_eq!(count(&mut executor, "SELECT * FROM t WHERE id < 3;"), 2);
    assert_eq!(count(&mut executor, "SELECT * FROM t WHERE id <= 3;"), 3);
    assert_eq!(count(&mut executor, "SELECT * FROM t WHERE id > 3;"), 1);
    assert_eq!(count(&mut executor, "SELECT * FROM t WHERE id >= 3;"), 2);
    assert_eq!(count(&mut executor, "SELECT * FROM t WHERE name = 'c';"), 1);
    assert_eq!(count(&mut executor, "SELECT * FROM t WHERE name > 'b';"), 2);
}

#[test]
fn test_null_comparison_semantics() {
    let (_dir, mut executor) = setup();

    exec(
        &mut executor,
        "CREATE DATABASE d; USE d; \
         CREATE TABLE t (id INT, tag TEXT(8)); \
         INSERT INTO t (id) VALUES (1); \
         INSERT INTO t VALUES (2, 'x');",
    )
    .unwrap();

    let result = exec(&mut executor, "SELECT * FROM t WHERE tag = NULL;").unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].values[0], Value::Int32(1));

    // `!= NULL` matches nothing: false for NULL cells, false for non-NULL
    let result = exec(&mut executor, "SELECT * FROM t WHERE tag != NULL;").unwrap();
    assert!(result.rows.is_empty());
}

#[test]
fn test_projection_and_unknown_column() {
    let (_dir, mut executor) = setup();

    exec(
        &mut executor,
        "CREATE DATABASE d; USE d; \
         CREATE TABLE t (id INT, name TEXT(8), age INT); \
         INSERT INTO t VALUES (1, 'a', 30);",
    )
    .unwrap();

    let result = exec(&mut executor, "SELECT age, id FROM t;").unwrap();
    assert_eq!(result.columns, vec!["age", "id"]);
    assert_eq!(
        result.rows[0].values,
        vec![Value::Int32(30), Value::Int32(1)]
    );

    let err = exec(&mut executor, "SELECT nope FROM t;").unwrap_err();
    assert!(matches!(err, Error::ColumnNotFound(col) if col == "nope"));
}

#[test]
fn test_delete_without_where_deletes_everything() {
    let (_dir, mut executor) = setup();

    exec(
        &mut executor,
        "CREATE DATABASE d; USE d; CREATE TABLE t (id INT); \
         INSERT INTO t VALUES (1); INSERT INTO t VALUES (2); INSERT INTO t VALUES (3);",
    )
    .unwrap();

    let result = exec(&mut executor, "DELETE FROM t;").unwrap();
    assert_eq!(result.message.as_deref(), Some("Deleted 3 rows"));

    let result = exec(&mut executor, "SELECT * FROM t;").unwrap();
    assert!(result.rows.is_empty());
}

#[test]
fn test_tables_survive_reuse_of_database() {
    let (_dir, mut executor) = setup();

    exec(
        &mut executor,
        "CREATE DATABASE d; USE d; \
         CREATE TABLE t (id INT PRIMARY KEY, name TEXT(16)); \
         INSERT INTO t VALUES (1, 'persisted');",
    )
    .unwrap();

    // USE reloads the registry from the schema and heap files on disk
    exec(&mut executor, "USE d;").unwrap();
    let result = exec(&mut executor, "SELECT * FROM t;").unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].values[1], Value::Text("persisted".to_string()));
}

#[test]
fn test_not_null_violation() {
    let (_dir, mut executor) = setup();

    exec(
        &mut executor,
        "CREATE DATABASE d; USE d; CREATE TABLE t (id INT NOT NULL, tag TEXT(8));",
    )
    .unwrap();

    let err = exec(&mut executor, "INSERT INTO t (tag) VALUES ('x');").unwrap_err();
    assert!(matches!(err, Error::NullNotAllowed(col) if col == "id"));
}

#[test]
fn test_type_error_in_where_literal() {
    let (_dir, mut executor) = setup();

    exec(
        &mut executor,
        "CREATE DATABASE d; USE d; CREATE TABLE t (id INT); INSERT INTO t VALUES (1);",
    )
    .unwrap();

    let err = exec(&mut executor, "SELECT * FROM t WHERE id = abc;").unwrap_err();
    assert!(matches!(err, Error::InvalidLiteral { .. }), "got: {}", err);
}

#[test]
fn test_text_truncation_end_to_end() {
    let (_dir, mut executor) = setup();

    exec(
        &mut executor,
        "CREATE DATABASE d; USE d; CREATE TABLE t (tag TEXT(4)); \
         INSERT INTO t VALUES ('abcdefgh');",
    )
    .unwrap();

    let result = exec(&mut executor, "SELECT * FROM t;").unwrap();
    assert_eq!(result.rows[0].values[0], Value::Text("abcd".to_string()));
}

#[test]
fn test_database_errors() {
    let (_dir, mut executor) = setup();

    exec(&mut executor, "CREATE DATABASE d;").unwrap();
    let err = exec(&mut executor, "CREATE DATABASE d;").unwrap_err();
    assert!(matches!(err, Error::DatabaseAlreadyExists(_)));

    let err = exec(&mut executor, "USE missing;").unwrap_err();
    assert!(matches!(err, Error::DatabaseNotFound(_)));

    exec(&mut executor, "USE d;").unwrap();
    let err = exec(&mut executor, "SELECT * FROM ghost;").unwrap_err();
    assert!(matches!(err, Error::TableNotFound(t) if t == "ghost"));
}
