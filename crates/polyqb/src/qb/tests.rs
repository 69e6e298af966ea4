//! Rendering tests for the statement builders.

use std::sync::OnceLock;

use crate::dialect::Dialect;
use crate::error::OrmError;
use crate::expr::{Expr, IntoExpr, col, col_param};
use crate::model::{ColumnMeta, Model, SoftDeleteMode, TableMeta};
use crate::qb::{
    DeleteQb, InsertQb, JoinKind, LockWait, MergeAction, MergeQb, MergeWhen, Nulls, Order,
    Pagination, SelectQb, SqlQb, UpdateQb,
};
use crate::value::Value;

struct Post {
    title: String,
    view_count: i64,
}

impl Model for Post {
    fn table_meta() -> &'static TableMeta {
        static META: OnceLock<TableMeta> = OnceLock::new();
        META.get_or_init(|| {
            TableMeta::new("posts")
                .with_alias("p")
                .with_soft_delete("deleted_at")
                .with_column(ColumnMeta::new("id", "id").primary_key().readonly())
                .with_column(ColumnMeta::new("title", "title"))
                .with_column(ColumnMeta::new("view_count", "view_count"))
                .with_column(ColumnMeta::new("deleted_at", "deleted_at"))
        })
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("title", self.title.clone().into()),
            ("view_count", self.view_count.into()),
        ]
    }
}

struct Author;

impl Model for Author {
    fn table_meta() -> &'static TableMeta {
        static META: OnceLock<TableMeta> = OnceLock::new();
        META.get_or_init(|| {
            TableMeta::new("authors")
                .with_alias("a")
                .with_column(ColumnMeta::new("id", "id").primary_key())
                .with_column(ColumnMeta::new("name", "name"))
        })
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        Vec::new()
    }
}

fn sql(qb: &impl SqlQb) -> String {
    qb.to_sql().unwrap().0
}

fn unsupported_op(err: OrmError) -> &'static str {
    match err {
        OrmError::UnsupportedDialect { op, .. } => op,
        other => panic!("expected UnsupportedDialect, got {other:?}"),
    }
}

// ==================== SELECT ====================

#[test]
fn test_select_top_n_per_dialect() {
    let expected = [
        (
            Dialect::Postgres,
            "SELECT * FROM posts WHERE view_count > $1 ORDER BY view_count DESC LIMIT $2",
            vec![Value::Int(50), Value::Int(3)],
        ),
        (
            Dialect::MySql,
            "SELECT * FROM posts WHERE view_count > ? ORDER BY view_count DESC LIMIT ?",
            vec![Value::Int(50), Value::Int(3)],
        ),
        (
            Dialect::Sqlite,
            "SELECT * FROM posts WHERE view_count > ? ORDER BY view_count DESC LIMIT ?",
            vec![Value::Int(50), Value::Int(3)],
        ),
        (
            Dialect::Oracle,
            "SELECT * FROM posts WHERE view_count > :1 ORDER BY view_count DESC FETCH NEXT :2 ROWS ONLY",
            vec![Value::Int(50), Value::Int(3)],
        ),
        (
            Dialect::SqlServer,
            "SELECT * FROM posts WHERE view_count > @p1 ORDER BY view_count DESC OFFSET @p2 ROWS FETCH NEXT @p3 ROWS ONLY",
            vec![Value::Int(50), Value::Int(0), Value::Int(3)],
        ),
    ];
    for (dialect, want_sql, want_params) in expected {
        let (got_sql, got_params) = SelectQb::new(dialect)
            .table("posts")
            .gt("view_count", 50)
            .order_by_desc("view_count")
            .limit(3)
            .to_sql()
            .unwrap();
        assert_eq!(got_sql, want_sql, "{dialect}");
        assert_eq!(got_params, want_params, "{dialect}");
    }
}

#[test]
fn test_to_sql_is_repeatable() {
    let qb = SelectQb::new(Dialect::Postgres).table("t").eq("a", 1);
    assert_eq!(qb.to_sql().unwrap(), qb.to_sql().unwrap());
}

#[test]
fn test_model_select_qualifies_and_hides_deleted() {
    let qb = SelectQb::new(Dialect::Postgres).model::<Post>().eq("title", "x");
    assert_eq!(
        sql(&qb),
        "SELECT * FROM posts p WHERE p.title = $1 AND p.deleted_at IS NULL"
    );

    let qb = SelectQb::new(Dialect::Postgres).model::<Post>().with_deleted();
    assert_eq!(sql(&qb), "SELECT * FROM posts p");

    let qb = SelectQb::new(Dialect::MySql).model::<Post>().only_deleted();
    assert_eq!(sql(&qb), "SELECT * FROM posts p WHERE p.deleted_at IS NOT NULL");
}

#[test]
fn test_exclude_columns() {
    let qb = SelectQb::new(Dialect::Sqlite)
        .model::<Post>()
        .exclude(["title"])
        .with_deleted();
    assert_eq!(
        sql(&qb),
        "SELECT p.id, p.view_count, p.deleted_at FROM posts p"
    );

    let err = SelectQb::new(Dialect::Sqlite)
        .model::<Post>()
        .exclude(["nope"])
        .to_sql()
        .unwrap_err();
    assert!(matches!(err, OrmError::UnknownColumn { .. }));

    let err = SelectQb::new(Dialect::Sqlite)
        .table("posts")
        .exclude(["title"])
        .to_sql()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn test_joins() {
    let qb = SelectQb::new(Dialect::Postgres)
        .table("posts p")
        .columns(["p.title", "u.name"])
        .inner_join("users u", |on| {
            on.eq("u.id", col("p.author_id"));
        })
        .left_join("tags t", |on| {
            on.eq("t.post_id", col("p.id"));
        });
    assert_eq!(
        sql(&qb),
        "SELECT p.title, u.name FROM posts p INNER JOIN users u ON u.id = p.author_id LEFT JOIN tags t ON t.post_id = p.id"
    );

    let qb = SelectQb::new(Dialect::Oracle)
        .model::<Post>()
        .with_deleted()
        .join_model::<Author>(JoinKind::Inner, |on| {
            on.eq("a.id", col("p.author_id"));
        })
        .cross_join("regions");
    assert_eq!(
        sql(&qb),
        "SELECT * FROM posts p INNER JOIN authors a ON a.id = p.author_id CROSS JOIN regions"
    );
}

#[test]
fn test_full_join_unsupported_on_mysql() {
    let qb = SelectQb::new(Dialect::MySql).table("a").full_join("b", |on| {
        on.eq("a.id", col("b.id"));
    });
    assert_eq!(unsupported_op(qb.to_sql().unwrap_err()), "full_join");

    let qb = SelectQb::new(Dialect::Postgres).table("a").full_join("b", |on| {
        on.eq("a.id", col("b.id"));
    });
    assert_eq!(sql(&qb), "SELECT * FROM a FULL OUTER JOIN b ON a.id = b.id");
}

#[test]
fn test_join_without_on_is_rejected() {
    let err = SelectQb::new(Dialect::Postgres)
        .table("a")
        .inner_join("b", |_| {})
        .to_sql()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn test_nulls_ordering() {
    let build = |d| {
        SelectQb::new(d)
            .table("t")
            .order_by_expr(col("a"), Order::Desc, Some(Nulls::Last))
    };
    assert_eq!(
        sql(&build(Dialect::Postgres)),
        "SELECT * FROM t ORDER BY a DESC NULLS LAST"
    );
    assert_eq!(
        sql(&build(Dialect::Oracle)),
        "SELECT * FROM t ORDER BY a DESC NULLS LAST"
    );
    assert_eq!(
        sql(&build(Dialect::MySql)),
        "SELECT * FROM t ORDER BY CASE WHEN a IS NULL THEN 1 ELSE 0 END, a DESC"
    );
    assert_eq!(
        sql(&build(Dialect::SqlServer)),
        "SELECT * FROM t ORDER BY CASE WHEN a IS NULL THEN 1 ELSE 0 END, a DESC"
    );

    let qb = SelectQb::new(Dialect::MySql)
        .table("t")
        .order_by_expr(col("a"), Order::Asc, Some(Nulls::First));
    assert_eq!(
        sql(&qb),
        "SELECT * FROM t ORDER BY CASE WHEN a IS NULL THEN 0 ELSE 1 END, a"
    );
}

#[test]
fn test_offset_without_limit() {
    let build = |d| SelectQb::new(d).table("t").offset(10);
    assert_eq!(sql(&build(Dialect::Postgres)), "SELECT * FROM t OFFSET $1");
    assert_eq!(
        sql(&build(Dialect::MySql)),
        "SELECT * FROM t LIMIT 18446744073709551615 OFFSET ?"
    );
    assert_eq!(sql(&build(Dialect::Sqlite)), "SELECT * FROM t LIMIT -1 OFFSET ?");
    assert_eq!(sql(&build(Dialect::Oracle)), "SELECT * FROM t OFFSET :1 ROWS");
    assert_eq!(
        sql(&build(Dialect::SqlServer)),
        "SELECT * FROM t ORDER BY (SELECT NULL) OFFSET @p1 ROWS"
    );
}

#[test]
fn test_paginate() {
    let (sql, params) = SelectQb::new(Dialect::Postgres)
        .table("t")
        .paginate(Pagination::new(3, 10))
        .to_sql()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM t LIMIT $1 OFFSET $2");
    assert_eq!(params, vec![Value::Int(10), Value::Int(20)]);
    assert_eq!(Pagination::new(0, 10).offset(), 0);
    assert_eq!(Pagination::default().limit(), 20);
}

#[test]
fn test_row_locks() {
    let qb = SelectQb::new(Dialect::Postgres)
        .table("jobs")
        .for_update(LockWait::SkipLocked);
    assert_eq!(sql(&qb), "SELECT * FROM jobs FOR UPDATE SKIP LOCKED");

    let qb = SelectQb::new(Dialect::MySql)
        .table("jobs")
        .for_share(LockWait::NoWait);
    assert_eq!(sql(&qb), "SELECT * FROM jobs FOR SHARE NOWAIT");

    let qb = SelectQb::new(Dialect::SqlServer)
        .table("jobs j")
        .eq("j.state", "queued")
        .for_update(LockWait::SkipLocked);
    assert_eq!(
        sql(&qb),
        "SELECT * FROM jobs j WITH (UPDLOCK, ROWLOCK, READPAST) WHERE j.state = @p1"
    );

    let err = SelectQb::new(Dialect::Sqlite)
        .table("jobs")
        .for_update(LockWait::Wait)
        .to_sql()
        .unwrap_err();
    assert_eq!(unsupported_op(err), "row_lock");

    let err = SelectQb::new(Dialect::Oracle)
        .table("jobs")
        .for_share(LockWait::Wait)
        .to_sql()
        .unwrap_err();
    assert_eq!(unsupported_op(err), "for_share");
}

#[test]
fn test_set_operations() {
    let a = |d| SelectQb::new(d).table("a").column("id");
    let b = |d| SelectQb::new(d).table("b").column("id");

    let qb = a(Dialect::Oracle).except(b(Dialect::Oracle));
    assert_eq!(sql(&qb), "SELECT id FROM a MINUS SELECT id FROM b");

    let qb = a(Dialect::Postgres).union(b(Dialect::Postgres)).order_by("id");
    assert_eq!(sql(&qb), "SELECT id FROM a UNION SELECT id FROM b ORDER BY id");

    let err = a(Dialect::Sqlite)
        .intersect_all(b(Dialect::Sqlite))
        .to_sql()
        .unwrap_err();
    assert_eq!(unsupported_op(err), "intersect_all");

    let err = a(Dialect::Postgres)
        .union_all(b(Dialect::Postgres).limit(1))
        .to_sql()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn test_recursive_cte() {
    let build = |d| {
        SelectQb::new(d)
            .with_recursive(
                "nums",
                &["n"],
                SelectQb::new(d).table("seeds").column("n"),
                SelectQb::new(d)
                    .table("nums")
                    .column_expr(Expr::template("? + 1", [col("n").into_expr()]), "n")
                    .lt("n", 10),
            )
            .table("nums")
            .column("n")
    };
    assert_eq!(
        sql(&build(Dialect::Postgres)),
        "WITH RECURSIVE nums (n) AS (SELECT n FROM seeds UNION ALL SELECT n + 1 AS n FROM nums WHERE n < $1) SELECT n FROM nums"
    );
    assert_eq!(
        sql(&build(Dialect::Oracle)),
        "WITH nums (n) AS (SELECT n FROM seeds UNION ALL SELECT n + 1 AS n FROM nums WHERE n < :1) SELECT n FROM nums"
    );
}

#[test]
fn test_plain_cte_and_subquery_params_are_ordered() {
    let (sql, params) = SelectQb::new(Dialect::SqlServer)
        .with(
            "recent",
            SelectQb::new(Dialect::SqlServer).table("posts").gt("id", 100),
        )
        .table("recent")
        .where_(|w| {
            w.in_subquery(
                "author_id",
                SelectQb::new(Dialect::SqlServer)
                    .table("authors")
                    .column("id")
                    .eq("active", true),
            )
            .lt("id", 500);
        })
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        "WITH recent AS (SELECT * FROM posts WHERE id > @p1) SELECT * FROM recent WHERE author_id IN (SELECT id FROM authors WHERE active = @p2) AND id < @p3"
    );
    assert_eq!(
        params,
        vec![Value::Int(100), Value::Bool(true), Value::Int(500)]
    );
}

#[test]
fn test_count_query() {
    let qb = SelectQb::new(Dialect::Postgres)
        .model::<Post>()
        .gt("view_count", 5)
        .order_by("title")
        .limit(10);
    assert_eq!(
        sql(&qb.count_query()),
        "SELECT COUNT(*) FROM posts p WHERE p.view_count > $1 AND p.deleted_at IS NULL"
    );

    let qb = SelectQb::new(Dialect::MySql).table("t").column("a").distinct();
    assert_eq!(
        sql(&qb.count_query()),
        "SELECT COUNT(*) FROM (SELECT DISTINCT a FROM t) t"
    );
}

#[test]
fn test_where_pk() {
    let qb = SelectQb::new(Dialect::Postgres).model::<Post>().where_pk(5i64);
    assert_eq!(
        sql(&qb),
        "SELECT * FROM posts p WHERE p.id = $1 AND p.deleted_at IS NULL"
    );

    let qb = SelectQb::new(Dialect::Postgres)
        .model::<Post>()
        .with_deleted()
        .where_pk_in([1i64, 2, 3]);
    assert_eq!(sql(&qb), "SELECT * FROM posts p WHERE p.id IN ($1, $2, $3)");

    let qb = SelectQb::new(Dialect::Postgres)
        .model::<Post>()
        .with_deleted()
        .where_pk_in(Vec::<i64>::new());
    assert_eq!(sql(&qb), "SELECT * FROM posts p WHERE 1 = 0");

    let err = SelectQb::new(Dialect::Postgres)
        .table("posts")
        .where_pk(1i64)
        .to_sql()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn test_dynamic_identifiers() {
    let qb = SelectQb::new(Dialect::MySql)
        .table("t")
        .column(col_param("sort"))
        .order_by(col_param("sort"))
        .bind_ident("sort", "created_at");
    assert_eq!(sql(&qb), "SELECT created_at FROM t ORDER BY created_at");

    let err = SelectQb::new(Dialect::MySql)
        .table("t")
        .column(col_param("sort"))
        .to_sql()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn test_invalid_table_reference() {
    let err = SelectQb::new(Dialect::Postgres)
        .table("posts; drop")
        .to_sql()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));

    let err = SelectQb::new(Dialect::Postgres).to_sql().unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

// ==================== INSERT ====================

#[test]
fn test_insert_returning() {
    let build = |d| {
        InsertQb::new(d)
            .table("users")
            .set("name", "alice")
            .set("age", 30)
            .returning(["id"])
    };
    assert_eq!(
        sql(&build(Dialect::Postgres)),
        "INSERT INTO users (name, age) VALUES ($1, $2) RETURNING id"
    );
    assert_eq!(
        sql(&build(Dialect::SqlServer)),
        "INSERT INTO users (name, age) OUTPUT INSERTED.id VALUES (@p1, @p2)"
    );
    assert_eq!(
        unsupported_op(build(Dialect::MySql).to_sql().unwrap_err()),
        "returning"
    );
}

#[test]
fn test_insert_multi_row() {
    let build = |d| {
        InsertQb::new(d)
            .table("t")
            .values([("a", 1), ("b", 2)])
            .values([("b", 4), ("a", 3)])
    };
    let (rendered, params) = build(Dialect::Postgres).to_sql().unwrap();
    assert_eq!(rendered, "INSERT INTO t (a, b) VALUES ($1, $2), ($3, $4)");
    assert_eq!(
        params,
        vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]
    );
    assert_eq!(
        sql(&build(Dialect::Oracle)),
        "INSERT INTO t (a, b) SELECT :1, :2 FROM DUAL UNION ALL SELECT :3, :4 FROM DUAL"
    );

    let err = InsertQb::new(Dialect::Postgres)
        .table("t")
        .values([("a", 1), ("b", 2)])
        .values([("a", 3), ("c", 4)])
        .to_sql()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn test_insert_upsert() {
    let build = |d| {
        InsertQb::new(d)
            .table("users")
            .set("email", "a@x.io")
            .set("name", "A")
            .on_conflict(["email"])
            .do_update()
            .set_excluded("name")
            .finish()
    };
    assert_eq!(
        sql(&build(Dialect::Postgres)),
        "INSERT INTO users (email, name) VALUES ($1, $2) ON CONFLICT (email) DO UPDATE SET name = EXCLUDED.name"
    );
    assert_eq!(
        sql(&build(Dialect::MySql)),
        "INSERT INTO users (email, name) VALUES (?, ?) ON DUPLICATE KEY UPDATE name = VALUES(name)"
    );
    assert_eq!(
        unsupported_op(build(Dialect::Oracle).to_sql().unwrap_err()),
        "on_conflict"
    );
}

#[test]
fn test_insert_do_nothing() {
    let build = |d| {
        InsertQb::new(d)
            .table("users")
            .set("email", "a@x.io")
            .on_conflict(["email"])
            .do_nothing()
    };
    assert_eq!(
        sql(&build(Dialect::MySql)),
        "INSERT IGNORE INTO users (email) VALUES (?)"
    );
    assert_eq!(
        sql(&build(Dialect::Sqlite)),
        "INSERT INTO users (email) VALUES (?) ON CONFLICT (email) DO NOTHING"
    );
}

#[test]
fn test_insert_default_values() {
    assert_eq!(
        sql(&InsertQb::new(Dialect::Postgres).table("t")),
        "INSERT INTO t DEFAULT VALUES"
    );
    assert_eq!(
        sql(&InsertQb::new(Dialect::MySql).table("t")),
        "INSERT INTO t () VALUES ()"
    );
    let err = InsertQb::new(Dialect::Oracle).table("t").to_sql().unwrap_err();
    assert_eq!(unsupported_op(err), "default_values");
}

#[test]
fn test_insert_from_select_and_model() {
    let qb = InsertQb::new(Dialect::Postgres).table("archive").from_select(
        &["id"],
        SelectQb::new(Dialect::Postgres)
            .table("posts")
            .column("id")
            .lt("id", 10),
    );
    assert_eq!(
        sql(&qb),
        "INSERT INTO archive (id) SELECT id FROM posts WHERE id < $1"
    );

    let post = Post {
        title: "hello".into(),
        view_count: 0,
    };
    let (sql, params) = InsertQb::new(Dialect::Sqlite)
        .model_value(&post)
        .to_sql()
        .unwrap();
    assert_eq!(sql, "INSERT INTO posts (title, view_count) VALUES (?, ?)");
    assert_eq!(params, vec![Value::Text("hello".into()), Value::Int(0)]);
}

// ==================== UPDATE ====================

#[test]
fn test_update_model() {
    let qb = UpdateQb::new(Dialect::Postgres)
        .model::<Post>()
        .set("title", "x")
        .where_pk(1i64);
    assert_eq!(
        sql(&qb),
        "UPDATE posts SET title = $1 WHERE id = $2 AND deleted_at IS NULL"
    );

    let qb = UpdateQb::new(Dialect::SqlServer)
        .model::<Post>()
        .set("title", "x")
        .eq("id", 1)
        .returning(["title"]);
    assert_eq!(
        sql(&qb),
        "UPDATE posts SET title = @p1 OUTPUT INSERTED.title WHERE id = @p2 AND deleted_at IS NULL"
    );
}

#[test]
fn test_update_requires_set() {
    let err = UpdateQb::new(Dialect::Postgres)
        .table("t")
        .eq("id", 1)
        .to_sql()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn test_update_set_expr_and_model() {
    let qb = UpdateQb::new(Dialect::MySql)
        .table("posts")
        .set_expr("view_count", Expr::template("? + 1", [col("view_count").into_expr()]))
        .eq("id", 9);
    assert_eq!(
        sql(&qb),
        "UPDATE posts SET view_count = view_count + 1 WHERE id = ?"
    );

    let post = Post {
        title: "t".into(),
        view_count: 3,
    };
    let qb = UpdateQb::new(Dialect::Oracle)
        .set_model(&post)
        .with_deleted()
        .where_pk(4i64);
    assert_eq!(
        sql(&qb),
        "UPDATE posts SET title = :1, view_count = :2 WHERE id = :3"
    );
}

// ==================== DELETE ====================

#[test]
fn test_delete_safe_default() {
    let qb = DeleteQb::new(Dialect::Postgres).table("logs");
    assert_eq!(sql(&qb), "DELETE FROM logs WHERE 1=0");
    let qb = DeleteQb::new(Dialect::Postgres)
        .table("logs")
        .allow_delete_all();
    assert_eq!(sql(&qb), "DELETE FROM logs");
}

#[test]
fn test_delete_soft() {
    let qb = DeleteQb::new(Dialect::Postgres).model::<Post>().where_pk(3i64);
    assert_eq!(
        sql(&qb),
        "UPDATE posts SET deleted_at = CURRENT_TIMESTAMP WHERE id = $1 AND deleted_at IS NULL"
    );
    let qb = DeleteQb::new(Dialect::Oracle).model::<Post>().where_pk(3i64);
    assert_eq!(
        sql(&qb),
        "UPDATE posts SET deleted_at = SYSTIMESTAMP WHERE id = :1 AND deleted_at IS NULL"
    );
    let qb = DeleteQb::new(Dialect::Postgres)
        .model::<Post>()
        .force_delete()
        .where_pk(3i64);
    assert_eq!(
        sql(&qb),
        "DELETE FROM posts WHERE id = $1 AND deleted_at IS NULL"
    );
}

#[test]
fn test_delete_soft_delete_modes() {
    let qb = DeleteQb::new(Dialect::Postgres)
        .model::<Post>()
        .with_deleted()
        .where_pk(3i64);
    assert_eq!(
        sql(&qb),
        "UPDATE posts SET deleted_at = COALESCE(deleted_at, CURRENT_TIMESTAMP) WHERE id = $1"
    );

    let qb = DeleteQb::new(Dialect::MySql)
        .model::<Post>()
        .force_delete()
        .only_deleted()
        .allow_delete_all();
    assert_eq!(sql(&qb), "DELETE FROM posts WHERE deleted_at IS NOT NULL");

    let qb = DeleteQb::new(Dialect::Sqlite)
        .model::<Post>()
        .force_delete()
        .soft_delete_mode(SoftDeleteMode::Include)
        .eq("title", "x");
    assert_eq!(sql(&qb), "DELETE FROM posts WHERE title = ?");

    let err = DeleteQb::new(Dialect::Postgres)
        .model::<Post>()
        .only_deleted()
        .where_pk(3i64)
        .to_sql()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn test_delete_returning() {
    let qb = DeleteQb::new(Dialect::SqlServer)
        .table("logs")
        .eq("id", 1)
        .returning(["id"]);
    assert_eq!(sql(&qb), "DELETE FROM logs OUTPUT DELETED.id WHERE id = @p1");
    let qb = DeleteQb::new(Dialect::Sqlite)
        .table("logs")
        .eq("id", 1)
        .returning(["id"]);
    assert_eq!(sql(&qb), "DELETE FROM logs WHERE id = ? RETURNING id");
}

// ==================== MERGE ====================

fn upsert_merge(d: Dialect) -> MergeQb {
    MergeQb::new(d)
        .into_as("inventory", "t")
        .using_table("incoming", "s")
        .on(|c| {
            c.eq("t.sku", col("s.sku"));
        })
        .when_matched(MergeAction::update([("qty", col("s.qty"))]))
        .when_not_matched(MergeAction::insert([
            ("sku", col("s.sku")),
            ("qty", col("s.qty")),
        ]))
}

#[test]
fn test_merge_per_dialect() {
    assert_eq!(
        sql(&upsert_merge(Dialect::Postgres)),
        "MERGE INTO inventory t USING incoming s ON t.sku = s.sku WHEN MATCHED THEN UPDATE SET qty = s.qty WHEN NOT MATCHED THEN INSERT (sku, qty) VALUES (s.sku, s.qty)"
    );
    assert_eq!(
        sql(&upsert_merge(Dialect::SqlServer)),
        "MERGE INTO inventory t USING incoming s ON t.sku = s.sku WHEN MATCHED THEN UPDATE SET qty = s.qty WHEN NOT MATCHED BY TARGET THEN INSERT (sku, qty) VALUES (s.sku, s.qty);"
    );
    assert_eq!(
        sql(&upsert_merge(Dialect::Oracle)),
        "MERGE INTO inventory t USING incoming s ON (t.sku = s.sku) WHEN MATCHED THEN UPDATE SET qty = s.qty WHEN NOT MATCHED THEN INSERT (sku, qty) VALUES (s.sku, s.qty)"
    );
    for d in [Dialect::MySql, Dialect::Sqlite] {
        assert_eq!(unsupported_op(upsert_merge(d).to_sql().unwrap_err()), "merge");
    }
}

#[test]
fn test_merge_guards() {
    let qb = MergeQb::new(Dialect::Postgres)
        .into_as("inventory", "t")
        .using_table("incoming", "s")
        .on(|c| {
            c.eq("t.sku", col("s.sku"));
        })
        .when_matched(MergeWhen::new(MergeAction::Delete).and_(|c| {
            c.eq("s.qty", 0);
        }))
        .when_not_matched_by_source(MergeAction::DoNothing);
    assert_eq!(
        sql(&qb),
        "MERGE INTO inventory t USING incoming s ON t.sku = s.sku WHEN MATCHED AND s.qty = $1 THEN DELETE WHEN NOT MATCHED BY SOURCE THEN DO NOTHING"
    );

    let qb = upsert_merge(Dialect::Oracle).when_matched(
        MergeWhen::new(MergeAction::Delete).and_(|c| {
            c.eq("s.qty", 0);
        }),
    );
    assert_eq!(
        sql(&qb),
        "MERGE INTO inventory t USING incoming s ON (t.sku = s.sku) WHEN MATCHED THEN UPDATE SET qty = s.qty DELETE WHERE s.qty = :1 WHEN NOT MATCHED THEN INSERT (sku, qty) VALUES (s.sku, s.qty)"
    );
}

#[test]
fn test_merge_invalid_shapes() {
    let err = upsert_merge(Dialect::Postgres)
        .when_not_matched(MergeAction::Delete)
        .to_sql()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));

    let err = MergeQb::new(Dialect::Oracle)
        .into("inventory")
        .using_table("incoming", "s")
        .on(|c| {
            c.eq("inventory.sku", col("s.sku"));
        })
        .when_matched(MergeAction::Delete)
        .to_sql()
        .unwrap_err();
    assert_eq!(unsupported_op(err), "merge_clause_shape");

    let err = MergeQb::new(Dialect::SqlServer)
        .into("inventory")
        .using_table("incoming", "s")
        .when_matched(MergeAction::Delete)
        .to_sql()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}
