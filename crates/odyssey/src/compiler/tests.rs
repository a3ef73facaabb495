//! Tests for the query compiler.

use super::*;
use crate::entity::FieldDef;
use crate::error::OrmError;
use crate::expr::{BinaryOp, Capture, Expr, field, lit, param, path, record};
use crate::join::{JoinClause, JoinSpec};

const USER: EntityDef = EntityDef::new(
    "User",
    &[FieldDef::key("Id"), FieldDef::new("Name"), FieldDef::new("Active")],
);

const AUDIT: EntityDef = EntityDef::new("Audit", &[FieldDef::new("Message"), FieldDef::new("At")]);

fn compiler() -> QueryCompiler {
    QueryCompiler::default()
}

fn where_sql(predicate: &Expr) -> String {
    compiler()
        .compile_select(&USER, None, Some(predicate), None)
        .unwrap()
        .sql()
        .to_string()
}

#[test]
fn select_all_columns() {
    let stmt = compiler().compile_select(&USER, None, None, None).unwrap();
    assert_eq!(stmt.sql(), "SELECT * FROM User");
    assert_eq!(stmt.kind(), StatementKind::Select);
    assert!(stmt.bindings().is_empty());
}

#[test]
fn select_with_and_predicate() {
    let predicate = field("Name").eq("Ann").and(field("Active").eq(true));
    assert_eq!(
        where_sql(&predicate),
        "SELECT * FROM User WHERE ((Name = 'Ann') AND (Active = 1))"
    );
}

#[test]
fn nested_connectives_keep_source_order() {
    // (A = 1 OR B = 2) AND (C = 3 OR (D = 4 AND E = 5))
    let predicate = field("A")
        .eq(1)
        .or(field("B").eq(2))
        .and(field("C").eq(3).or(field("D").eq(4).and(field("E").eq(5))));
    assert_eq!(
        where_sql(&predicate),
        "SELECT * FROM User WHERE (((A = 1) OR (B = 2)) AND ((C = 3) OR ((D = 4) AND (E = 5))))"
    );
}

#[test]
fn one_group_per_connective() {
    let predicate = field("A")
        .eq(1)
        .and(field("B").eq(2))
        .or(field("C").eq(3));
    let sql = where_sql(&predicate);
    let where_clause = sql.split(" WHERE ").nth(1).unwrap();
    // two connectives + three comparisons
    assert_eq!(where_clause.matches('(').count(), 5);
    assert_eq!(where_clause.matches(')').count(), 5);
    assert_eq!(where_clause, "(((A = 1) AND (B = 2)) OR (C = 3))");
}

#[test]
fn operator_table_is_exact() {
    let cases = [
        (BinaryOp::Equal, "="),
        (BinaryOp::NotEqual, "<>"),
        (BinaryOp::GreaterThan, ">"),
        (BinaryOp::GreaterThanOrEqual, ">="),
        (BinaryOp::LessThan, "<"),
        (BinaryOp::LessThanOrEqual, "<="),
    ];
    for (op, symbol) in cases {
        let predicate = Expr::binary(op, field("Age"), 30);
        assert_eq!(
            where_sql(&predicate),
            format!("SELECT * FROM User WHERE (Age {symbol} 30)")
        );
    }
}

#[test]
fn arithmetic_operator_is_rejected() {
    let predicate = Expr::binary(BinaryOp::Add, field("Age"), 1);
    let err = compiler()
        .compile_select(&USER, None, Some(&predicate), None)
        .unwrap_err();
    assert!(matches!(err, OrmError::UnsupportedOperator(ref op) if op == "Add"));
}

#[test]
fn string_literal_doubles_quotes() {
    let predicate = field("Name").eq("O'Brien");
    assert_eq!(
        where_sql(&predicate),
        "SELECT * FROM User WHERE (Name = 'O''Brien')"
    );
}

#[test]
fn booleans_follow_dialect() {
    let predicate = field("Active").eq(false);
    assert_eq!(where_sql(&predicate), "SELECT * FROM User WHERE (Active = 0)");

    let pg = QueryCompiler::new(Dialect::Postgres)
        .compile_select(&USER, None, Some(&field("Active").eq(true)), None)
        .unwrap();
    assert_eq!(pg.sql(), "SELECT * FROM User WHERE (Active = TRUE)");
}

#[test]
fn numeric_literals_use_default_text() {
    assert_eq!(
        where_sql(&field("Score").ge(2.5)),
        "SELECT * FROM User WHERE (Score >= 2.5)"
    );
    assert_eq!(
        where_sql(&field("Id").lt(-7_i64)),
        "SELECT * FROM User WHERE (Id < -7)"
    );
}

#[test]
fn null_comparison_uses_is_null() {
    assert_eq!(
        where_sql(&field("Name").eq(None::<String>)),
        "SELECT * FROM User WHERE (Name IS NULL)"
    );
    assert_eq!(
        where_sql(&field("Name").ne(lit(Value::Null))),
        "SELECT * FROM User WHERE (Name IS NOT NULL)"
    );
}

#[test]
fn nested_member_renders_dotted_path() {
    let predicate = path("Address.City").eq("Lima");
    assert_eq!(
        where_sql(&predicate),
        "SELECT * FROM User WHERE (Address.City = 'Lima')"
    );
}

#[test]
fn convert_wrapper_is_transparent() {
    let predicate = field("Age").convert().gt(lit(21).convert());
    assert_eq!(where_sql(&predicate), "SELECT * FROM User WHERE (Age > 21)");
}

#[test]
fn captured_values_are_embedded() {
    let env = Capture::new()
        .bind("name", "D'Arcy")
        .bind("active", true)
        .nest("filter", Capture::new().bind("min", 3))
        .into_shared();

    let predicate = field("Name")
        .eq(Capture::var(&env, "name"))
        .and(field("Active").eq(Capture::var(&env, "active")))
        .and(field("Logins").ge(Capture::var(&env, "filter").member("min")));

    assert_eq!(
        where_sql(&predicate),
        "SELECT * FROM User WHERE (((Name = 'D''Arcy') AND (Active = 1)) AND (Logins >= 3))"
    );
}

#[test]
fn unknown_captured_variable_is_rejected() {
    let env = Capture::new().into_shared();
    let predicate = field("Name").eq(Capture::var(&env, "missing"));
    let err = compiler()
        .compile_select(&USER, None, Some(&predicate), None)
        .unwrap_err();
    assert!(matches!(err, OrmError::UnsupportedMemberExpression(_)));
}

#[test]
fn parameters_become_deferred_bindings() {
    let predicate = field("Name")
        .eq(param("Name"))
        .or(field("Nick").eq(field("Name")))
        .and(field("Active").eq(param("Active")));
    let stmt = compiler()
        .compile_select(&USER, None, Some(&predicate), None)
        .unwrap();

    assert_eq!(
        stmt.sql(),
        "SELECT * FROM User WHERE (((Name = @Name) OR (Nick = @Name)) AND (Active = @Active))"
    );
    let names: Vec<_> = stmt.field_names().collect();
    assert_eq!(names, ["Name", "Active"]);
    assert!(
        stmt.bindings()
            .iter()
            .all(|b| b.source == BindingSource::Deferred)
    );
}

#[test]
fn member_not_rooted_in_row_is_rejected() {
    let env = Capture::new().bind("x", 1).into_shared();
    let predicate = Capture::var(&env, "x").eq(1);
    let err = compiler()
        .compile_select(&USER, None, Some(&predicate), None)
        .unwrap_err();
    assert!(matches!(err, OrmError::UnsupportedMemberExpression(ref e) if e == "<captured>.x"));
}

#[test]
fn non_member_left_side_is_rejected() {
    let predicate = lit(1).eq(field("Id"));
    let err = compiler()
        .compile_select(&USER, None, Some(&predicate), None)
        .unwrap_err();
    assert!(matches!(err, OrmError::UnsupportedExpression { ref kind } if kind == "Constant"));
}

#[test]
fn unsupported_nodes_name_their_kind() {
    let cases = [
        (Expr::not(field("Active").eq(true)), "Not"),
        (field("Active"), "MemberAccess"),
        (lit(true), "Constant"),
        (record([field("A")]), "New"),
    ];
    for (predicate, kind) in cases {
        let err = compiler()
            .compile_select(&USER, None, Some(&predicate), None)
            .unwrap_err();
        assert_eq!(err.to_string(), format!("Expression type {kind} is not supported"));
    }
}

#[test]
fn projection_single_field() {
    let stmt = compiler()
        .compile_select(&USER, Some(&field("Name")), None, None)
        .unwrap();
    assert_eq!(stmt.sql(), "SELECT Name FROM User");
}

#[test]
fn projection_record_of_fields() {
    let projection = record([field("Id"), field("Name").convert(), path("Order.Total")]);
    let stmt = compiler()
        .compile_select(&USER, Some(&projection), None, None)
        .unwrap();
    assert_eq!(stmt.sql(), "SELECT Id, Name, Order.Total FROM User");
}

#[test]
fn projection_rejects_other_shapes() {
    for projection in [
        lit(1),
        record([field("Id"), lit(2)]),
        Expr::Record(Vec::new()),
        field("Id").eq(1),
    ] {
        let err = compiler()
            .compile_select(&USER, Some(&projection), None, None)
            .unwrap_err();
        assert!(
            matches!(err, OrmError::UnsupportedProjectionShape(_)),
            "{projection}: {err}"
        );
    }
}

#[test]
fn joins_sit_between_table_and_where() {
    let joins = JoinSpec::new()
        .join(
            JoinClause::inner()
                .primary_table("User")
                .secondary_table("Order")
                .primary_key("Id")
                .foreign_key("UserId"),
        )
        .left("Order", "Invoice", "Id", "OrderId");
    let predicate = path("Order.Total").gt(100);
    let stmt = compiler()
        .compile_select(&USER, None, Some(&predicate), Some(&joins))
        .unwrap();
    assert_eq!(
        stmt.sql(),
        "SELECT * FROM User INNER JOIN Order ON User.Id = Order.UserId \
         LEFT JOIN Invoice ON Order.Id = Invoice.OrderId WHERE (Order.Total > 100)"
    );
}

#[test]
fn compiling_twice_is_identical() {
    let predicate = field("Name").eq("Ann").or(field("Id").gt(3));
    let first = compiler()
        .compile_select(&USER, Some(&field("Name")), Some(&predicate), None)
        .unwrap();
    let second = compiler()
        .compile_select(&USER, Some(&field("Name")), Some(&predicate), None)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first.sql().as_bytes(), second.sql().as_bytes());
}

#[test]
fn insert_excludes_key_and_pairs_columns() {
    let stmt = compiler().compile_insert(&USER).unwrap();
    assert_eq!(
        stmt.sql(),
        "INSERT INTO User (Name, Active) VALUES (@Name, @Active)"
    );
    assert_eq!(stmt.kind(), StatementKind::Insert);

    let columns_part = stmt.sql().split(" VALUES ").next().unwrap();
    let values_part = stmt.sql().split(" VALUES ").nth(1).unwrap();
    let columns: Vec<_> = columns_part
        .trim_start_matches("INSERT INTO User (")
        .trim_end_matches(')')
        .split(", ")
        .collect();
    let values: Vec<_> = values_part
        .trim_matches(|c| c == '(' || c == ')')
        .split(", ")
        .collect();
    let fields: Vec<_> = stmt.field_names().collect();
    for (i, name) in fields.iter().enumerate() {
        assert_eq!(columns[i], *name);
        assert_eq!(values[i], format!("@{name}"));
    }
}

#[test]
fn insert_without_key_keeps_every_field() {
    let stmt = compiler().compile_insert(&AUDIT).unwrap();
    assert_eq!(stmt.sql(), "INSERT INTO Audit (Message, At) VALUES (@Message, @At)");
}

#[test]
fn update_binds_key_last() {
    let stmt = compiler().compile_update(&USER).unwrap();
    assert_eq!(
        stmt.sql(),
        "UPDATE User SET Name = @Name, Active = @Active WHERE Id = @Id"
    );
    let fields: Vec<_> = stmt.field_names().collect();
    assert_eq!(fields, ["Name", "Active", "Id"]);
    assert_eq!(stmt.key_column(), Some("Id"));
}

#[test]
fn delete_binds_key_value() {
    let stmt = compiler().compile_delete(&USER, 42).unwrap();
    assert_eq!(stmt.sql(), "DELETE FROM User WHERE Id = @Id");
    assert_eq!(stmt.key_column(), Some("Id"));
    assert_eq!(
        stmt.bindings(),
        [Binding::literal("Id", Value::Int(42))].as_slice()
    );
    assert!(!stmt.sql().contains("42"));
}

#[test]
fn missing_key_fails_before_sql() {
    let err = compiler().compile_update(&AUDIT).unwrap_err();
    assert!(matches!(err, OrmError::MissingKeyField { ref entity } if entity == "Audit"));

    let err = compiler().compile_delete(&AUDIT, 1).unwrap_err();
    assert!(matches!(err, OrmError::MissingKeyField { .. }));
}

#[test]
fn key_only_entity_cannot_be_written() {
    const TAG: EntityDef = EntityDef::new("Tag", &[FieldDef::key("Id")]);
    assert!(matches!(compiler().compile_insert(&TAG), Err(OrmError::Validation(_))));
    assert!(matches!(compiler().compile_update(&TAG), Err(OrmError::Validation(_))));
}

#[test]
fn literal_rendering_of_temporal_and_uuid_values() {
    let id = uuid::Uuid::nil();
    let day = chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let predicate = field("Ref").eq(id).and(field("Day").eq(day));
    assert_eq!(
        where_sql(&predicate),
        "SELECT * FROM User WHERE ((Ref = '00000000-0000-0000-0000-000000000000') AND (Day = '2024-05-01'))"
    );
}

#[test]
fn f32_literals_render_their_short_form() {
    assert_eq!(
        where_sql(&field("Score").ge(0.1_f32)),
        "SELECT * FROM User WHERE (Score >= 0.1)"
    );
    assert_eq!(
        where_sql(&field("Score").lt(2.5_f32)),
        "SELECT * FROM User WHERE (Score < 2.5)"
    );
}

#[test]
fn raw_statements_keep_sql_and_bindings() {
    let stmt = CompiledStatement::raw(
        StatementKind::Update,
        "UPDATE User SET Active = 0 WHERE Name = @Name",
        [Binding::deferred("Name")],
    );
    assert!(stmt.is_raw());
    assert_eq!(stmt.sql(), "UPDATE User SET Active = 0 WHERE Name = @Name");
    assert_eq!(stmt.deferred_fields(), ["Name"]);
    assert_eq!(stmt.key_column(), None);

    let compiled = compiler().compile_update(&USER).unwrap();
    assert!(!compiled.is_raw());
    assert_eq!(compiled.key_column(), Some("Id"));
}

#[test]
fn statement_kind_from_leading_keyword() {
    assert_eq!(StatementKind::of_sql("  select 1"), StatementKind::Select);
    assert_eq!(StatementKind::of_sql("INSERT INTO T VALUES (1)"), StatementKind::Insert);
    assert_eq!(StatementKind::of_sql("Update T SET A = 1"), StatementKind::Update);
    assert_eq!(StatementKind::of_sql("DELETE FROM T"), StatementKind::Delete);
    assert_eq!(StatementKind::of_sql("CREATE TABLE T (A INT)"), StatementKind::Other);
    assert_eq!(StatementKind::of_sql(""), StatementKind::Other);
}
