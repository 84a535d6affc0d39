//! Built-in demo catalogue loaded at startup

use crate::error::SchemaError;
use crate::store::DataStore;
use crate::table::{ColumnDef, Table, TableBuilder};
use crate::types::{ColumnType, Value};

/// Store holding the demo tables
pub fn demo_store() -> Result<DataStore, SchemaError> {
    Ok(DataStore::new([employees()?, inventory()?]))
}

fn employees() -> Result<Table, SchemaError> {
    let people: [(&str, Option<&str>, &str, &str, i64, bool); 6] = [
        ("1", None, "Ivanov I.I.", "CEO", 500_000, true),
        ("2", Some("1"), "Petrov P.P.", "CTO", 400_000, true),
        ("3", Some("2"), "Sidorov S.S.", "Senior Engineer", 300_000, true),
        ("4", Some("2"), "Kuznetsov K.K.", "Junior Engineer", 80_000, false),
        ("5", None, "Accounting", "Department", 0, true),
        ("6", Some("5"), "Smirnova A.A.", "Chief Accountant", 250_000, true),
    ];

    let mut builder = TableBuilder::new("employees", "HR")
        .primary_key("id")
        .parent_key("pid")
        .column(ColumnDef::new("id", "ID", ColumnType::String, 120).tree().pinned().primary())
        .column(ColumnDef::new("pid", "Parent", ColumnType::String, 80))
        .column(ColumnDef::new("name", "Name", ColumnType::String, 260).tree().editable())
        .column(ColumnDef::new("position", "Position", ColumnType::String, 200).editable())
        .column(ColumnDef::new("salary", "Salary", ColumnType::Currency, 120).editable())
        .column(ColumnDef::new("active", "Active", ColumnType::Bool, 80).editable());

    for (id, pid, name, position, salary, active) in people {
        builder = builder.row([
            ("id", Value::from(id)),
            ("pid", pid.map_or(Value::Absent, Value::from)),
            ("name", Value::from(name)),
            ("position", Value::from(position)),
            ("salary", Value::Integer(salary)),
            ("active", Value::Boolean(active)),
        ]);
    }

    builder.build()
}

fn inventory() -> Result<Table, SchemaError> {
    let items: [(&str, Option<&str>, &str, i64, f64, &str); 5] = [
        ("ELEC-001", None, "Electronics", 0, 0.0, "A"),
        ("CPU-INT-9", Some("ELEC-001"), "Intel Core i9", 45, 500.0, "A1"),
        ("GPU-NV-40", Some("ELEC-001"), "Nvidia RTX 4090", 12, 1800.0, "A2"),
        ("FURN-001", None, "Furniture", 0, 0.0, "B"),
        ("CH-OFF-B", Some("FURN-001"), "Office Chair", 150, 120.0, "B5"),
    ];

    let mut builder = TableBuilder::new("inventory", "Warehouse")
        .primary_key("sku")
        .parent_key("parent_sku")
        .column(ColumnDef::new("sku", "SKU", ColumnType::String, 160).tree().pinned().primary())
        .column(ColumnDef::new("parent_sku", "Parent SKU", ColumnType::String, 120))
        .column(ColumnDef::new("item_name", "Item", ColumnType::String, 300).editable())
        .column(ColumnDef::new("qty", "Quantity", ColumnType::Number, 100).editable())
        .column(ColumnDef::new("price", "Unit price", ColumnType::Currency, 120).editable())
        .column(ColumnDef::new("zone", "Zone", ColumnType::String, 80).editable());

    for (sku, parent, item, qty, price, zone) in items {
        builder = builder.row([
            ("sku", Value::from(sku)),
            ("parent_sku", parent.map_or(Value::Absent, Value::from)),
            ("item_name", Value::from(item)),
            ("qty", Value::Integer(qty)),
            ("price", Value::Real(price)),
            ("zone", Value::from(zone)),
        ]);
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_store_builds() {
        let store = demo_store().unwrap();
        let names: Vec<_> = store
            .list_tables()
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect();
        assert_eq!(
            names,
            vec![
                ("employees".to_string(), "HR".to_string()),
                ("inventory".to_string(), "Warehouse".to_string()),
            ]
        );
    }

    #[test]
    fn test_seeded_currency_is_real() {
        let store = demo_store().unwrap();
        let employees = store.table("employees").unwrap();
        assert_eq!(
            employees.row("1").unwrap().cell("salary"),
            &Value::Real(500_000.0)
        );
        assert_eq!(employees.row("4").unwrap().parent_id(), Some("2"));

        let inventory = store.table("inventory").unwrap();
        assert_eq!(
            inventory.row("CPU-INT-9").unwrap().cell("qty"),
            &Value::Integer(45)
        );
        assert_eq!(
            inventory.row("CPU-INT-9").unwrap().parent_id(),
            Some("ELEC-001")
        );
    }
}
