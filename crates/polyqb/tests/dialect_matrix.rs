//! Which operations each backend refuses, and with which operation name.

use polyqb::prelude::*;
use polyqb::{LockWait, OrmResult};

type Render = fn(Dialect) -> OrmResult<(String, Vec<Value>)>;

/// Assert `render` fails exactly on the listed dialects with the listed operation names.
fn check(name: &str, render: Render, failing: &[(Dialect, &str)]) {
    for dialect in Dialect::ALL {
        let expected = failing.iter().find(|(d, _)| *d == dialect).map(|(_, op)| *op);
        match (render(dialect), expected) {
            (Ok(_), None) => {}
            (Err(OrmError::UnsupportedDialect { op, dialect: d }), Some(want)) => {
                assert_eq!(op, want, "{name} on {dialect}");
                assert_eq!(d, dialect, "{name} on {dialect}");
            }
            (Ok((sql, _)), Some(want)) => {
                panic!("{name} on {dialect}: expected {want} to fail, rendered {sql}")
            }
            (Err(err), _) => panic!("{name} on {dialect}: unexpected error {err}"),
        }
    }
}

#[test]
fn expression_support() {
    check(
        "json_keys",
        |d| ExprBuilder::new(d).json_keys(col("doc")).to_sql(d),
        &[(Dialect::Oracle, "json_keys")],
    );
    check(
        "reverse",
        |d| ExprBuilder::new(d).reverse(col("name")).to_sql(d),
        &[(Dialect::Sqlite, "reverse")],
    );
    check("now", |d| ExprBuilder::new(d).now().to_sql(d), &[]);
    check(
        "modulo",
        |d| ExprBuilder::new(d).modulo(col("a"), 3).to_sql(d),
        &[],
    );
}

#[test]
fn select_support() {
    check(
        "full_join",
        |d| {
            SelectQb::new(d)
                .table("a")
                .full_join("b", |on| {
                    on.eq("a.id", col("b.id"));
                })
                .to_sql()
        },
        &[(Dialect::MySql, "full_join")],
    );
    check(
        "intersect_all",
        |d| {
            SelectQb::new(d)
                .table("a")
                .intersect_all(SelectQb::new(d).table("b"))
                .to_sql()
        },
        &[
            (Dialect::Sqlite, "intersect_all"),
            (Dialect::Oracle, "intersect_all"),
            (Dialect::SqlServer, "intersect_all"),
        ],
    );
    check(
        "for_update",
        |d| {
            SelectQb::new(d)
                .table("jobs")
                .for_update(LockWait::NoWait)
                .to_sql()
        },
        &[(Dialect::Sqlite, "row_lock")],
    );
    check(
        "for_share",
        |d| {
            SelectQb::new(d)
                .table("jobs")
                .for_share(LockWait::Wait)
                .to_sql()
        },
        &[
            (Dialect::Sqlite, "row_lock"),
            (Dialect::Oracle, "for_share"),
        ],
    );
}

#[test]
fn insert_support() {
    check(
        "returning",
        |d| {
            InsertQb::new(d)
                .table("users")
                .set("name", "a")
                .returning(["id"])
                .to_sql()
        },
        &[
            (Dialect::MySql, "returning"),
            (Dialect::Oracle, "returning"),
        ],
    );
    check(
        "on_conflict",
        |d| {
            InsertQb::new(d)
                .table("users")
                .set("email", "a@x.io")
                .on_conflict(["email"])
                .do_update()
                .set_excluded("email")
                .finish()
                .to_sql()
        },
        &[
            (Dialect::Oracle, "on_conflict"),
            (Dialect::SqlServer, "on_conflict"),
        ],
    );
    check(
        "default_values",
        |d| InsertQb::new(d).table("counters").to_sql(),
        &[(Dialect::Oracle, "default_values")],
    );
}

#[test]
fn merge_support() {
    check(
        "merge",
        |d| {
            MergeQb::new(d)
                .into_as("stock", "t")
                .using_table("delivery", "s")
                .on(|c| {
                    c.eq("t.sku", col("s.sku"));
                })
                .when_matched(MergeAction::update([("qty", col("s.qty"))]))
                .to_sql()
        },
        &[(Dialect::MySql, "merge"), (Dialect::Sqlite, "merge")],
    );
    check(
        "merge_do_nothing",
        |d| {
            MergeQb::new(d)
                .into_as("stock", "t")
                .using_table("delivery", "s")
                .on(|c| {
                    c.eq("t.sku", col("s.sku"));
                })
                .when_matched(MergeAction::DoNothing)
                .to_sql()
        },
        &[
            (Dialect::MySql, "merge"),
            (Dialect::Sqlite, "merge"),
            (Dialect::Oracle, "merge_clause_shape"),
            (Dialect::SqlServer, "merge_do_nothing"),
        ],
    );
}
