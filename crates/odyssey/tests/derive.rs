#![allow(dead_code)]

use odyssey::{Entity, FieldDef, OrmError, Record, Value, map_row};

#[derive(Debug, Default, PartialEq, Entity)]
#[orm(table = "Customer")]
struct Customer {
    #[orm(id, column = "CustomerId")]
    id: i32,
    #[orm(column = "Email")]
    email: Option<String>,
    score: f64,
    #[orm(skip)]
    label: String,
}

#[derive(Debug, PartialEq, Entity)]
#[orm(factory = "Ticket::blank")]
struct Ticket {
    #[orm(key)]
    id: i64,
    status: String,
}

impl Ticket {
    fn blank() -> Self {
        Self {
            id: -1,
            status: "open".into(),
        }
    }
}

#[test]
fn descriptor_follows_declaration_order() {
    assert_eq!(Customer::DEF.table, "Customer");
    assert_eq!(
        Customer::DEF.fields,
        [
            FieldDef::key("CustomerId"),
            FieldDef::new("Email"),
            FieldDef::new("score"),
        ]
    );
    assert_eq!(Customer::DEF.key_field().unwrap().name, "CustomerId");
}

#[test]
fn table_defaults_to_struct_name() {
    assert_eq!(Ticket::DEF.table, "Ticket");
    assert_eq!(Ticket::DEF.key_field().unwrap().name, "id");
}

#[test]
fn getters_read_by_column() {
    let customer = Customer {
        id: 4,
        email: None,
        score: 1.5,
        label: "vip".into(),
    };
    assert_eq!(customer.get("CustomerId"), Some(Value::Int(4)));
    assert_eq!(customer.get("Email"), Some(Value::Null));
    assert_eq!(customer.get("score"), Some(Value::Float(1.5)));
    assert_eq!(customer.get("label"), None);
}

#[test]
fn setters_convert_values() {
    let mut customer = Customer::instantiate();
    customer.set("Email", Value::from("a@b.c")).unwrap();
    customer.set("score", Value::Int(3)).unwrap();
    customer.set("Unknown", Value::Int(3)).unwrap();
    assert_eq!(customer.email.as_deref(), Some("a@b.c"));
    assert_eq!(customer.score, 3.0);

    let err = customer
        .set("CustomerId", Value::Text("x".into()))
        .unwrap_err();
    assert!(matches!(err, OrmError::Conversion { ref column, .. } if column == "CustomerId"));
}

#[test]
fn factory_supplies_unmapped_defaults() {
    let row = Record::new().with("id", 10);
    let ticket: Ticket = map_row(&row).unwrap();
    assert_eq!(
        ticket,
        Ticket {
            id: 10,
            status: "open".into()
        }
    );
}
