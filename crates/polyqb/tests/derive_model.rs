//! `#[derive(Model, FromRow)]` metadata and mapping.

#![allow(dead_code)]

mod common;

use chrono::NaiveDateTime;
use common::MockClient;
use polyqb::prelude::*;
use polyqb::{FromRow, Model};

#[derive(Debug, Clone, PartialEq, FromRow, Model)]
#[orm(table = "blog_posts", alias = "p", soft_delete = "deleted_at")]
struct Post {
    #[orm(id, readonly)]
    id: i64,
    title: String,
    #[orm(column = "views")]
    view_count: i64,
    deleted_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, FromRow, Model)]
struct OrderLine {
    #[orm(id)]
    order_id: i64,
    #[orm(id)]
    line_no: i32,
    sku: String,
}

#[test]
fn table_meta_from_attributes() {
    let meta = Post::table_meta();
    assert_eq!(meta.name(), "blog_posts");
    assert_eq!(meta.alias(), "p");
    assert_eq!(meta.soft_delete(), Some("deleted_at"));
    assert_eq!(meta.primary_key(), vec!["id"]);
    assert!(meta.column("views").unwrap().field() == "view_count");
    assert!(meta.column("id").unwrap().is_readonly());
    assert!(!meta.has_column("view_count"));
}

#[test]
fn table_name_defaults_to_snake_case() {
    let meta = OrderLine::table_meta();
    assert_eq!(meta.name(), "order_line");
    assert_eq!(meta.alias(), "order_line");
    assert_eq!(meta.primary_key(), vec!["order_id", "line_no"]);
}

#[test]
fn values_skip_readonly_columns() {
    let post = Post {
        id: 9,
        title: "hi".into(),
        view_count: 3,
        deleted_at: None,
    };
    assert_eq!(
        post.values(),
        vec![
            ("title", Value::from("hi")),
            ("views", Value::Int(3)),
            ("deleted_at", Value::Null),
        ]
    );
}

#[test]
fn primary_key_accessors() {
    let mut line = OrderLine {
        order_id: 1,
        line_no: 2,
        sku: "X".into(),
    };
    assert_eq!(
        line.pk_values().unwrap(),
        vec![("order_id", Value::Int(1)), ("line_no", Value::Int(2))]
    );

    let fields = OrderLine::primary_key_fields();
    fields[1].set(&mut line, Value::Int(7)).unwrap();
    assert_eq!(line.line_no, 7);
    assert!(fields[1].set(&mut line, Value::from("seven")).is_err());
}

#[test]
fn composite_where_pk() {
    let (sql, params) = SelectQb::new(Dialect::Postgres)
        .model::<OrderLine>()
        .where_pk(polyqb::PkInput::map([("line_no", 2), ("order_id", 1)]))
        .to_sql()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM order_line WHERE order_line.order_id = $1 AND order_line.line_no = $2"
    );
    assert_eq!(params, vec![Value::Int(1), Value::Int(2)]);

    let err = SelectQb::new(Dialect::Postgres)
        .model::<OrderLine>()
        .where_pk(1i64)
        .to_sql()
        .unwrap_err();
    assert!(matches!(err, OrmError::MissingKey { .. }));
}

#[tokio::test]
async fn fetch_models() {
    let client = MockClient::new(Dialect::MySql).with_rows(
        &["ID", "TITLE", "VIEWS", "DELETED_AT"],
        vec![vec![
            Value::Int(1),
            Value::from("first"),
            Value::Int(120),
            Value::Null,
        ]],
    );
    let posts: Vec<Post> = SelectQb::new(Dialect::MySql)
        .model::<Post>()
        .gt("views", 100)
        .fetch_all(&client)
        .await
        .unwrap();
    assert_eq!(
        posts,
        vec![Post {
            id: 1,
            title: "first".into(),
            view_count: 120,
            deleted_at: None,
        }]
    );
    assert_eq!(
        client.last_sql(),
        "SELECT * FROM blog_posts p WHERE p.views > ? AND p.deleted_at IS NULL"
    );
}

#[tokio::test]
async fn insert_and_soft_delete_models() {
    let client = MockClient::new(Dialect::Sqlite).with_affected(1);
    let post = Post {
        id: 0,
        title: "draft".into(),
        view_count: 0,
        deleted_at: None,
    };
    InsertQb::new(Dialect::Sqlite)
        .model_value(&post)
        .execute(&client)
        .await
        .unwrap();
    assert_eq!(
        client.last_sql(),
        "INSERT INTO blog_posts (title, views, deleted_at) VALUES (?, ?, ?)"
    );

    DeleteQb::new(Dialect::Sqlite)
        .model::<Post>()
        .where_pk(5i64)
        .execute(&client)
        .await
        .unwrap();
    assert_eq!(
        client.last_sql(),
        "UPDATE blog_posts SET deleted_at = CURRENT_TIMESTAMP WHERE id = ? AND deleted_at IS NULL"
    );
}
