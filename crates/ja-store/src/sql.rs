//! SQL generation for extract tables.

use ja_sas7bdat::{FieldType, Schema};

/// Declared SQLite type for a field.
#[must_use]
pub const fn sql_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Number => "REAL",
        FieldType::Text => "TEXT",
        FieldType::Date => "DATE",
        FieldType::DateTime => "TIMESTAMP",
    }
}

/// Field type for a declared SQLite column type.
#[must_use]
pub fn field_type_for_sql(declared: &str) -> FieldType {
    match declared.trim().to_ascii_uppercase().as_str() {
        "DATE" => FieldType::Date,
        "TIMESTAMP" | "DATETIME" => FieldType::DateTime,
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" | "INTEGER" => FieldType::Number,
        _ => FieldType::Text,
    }
}

/// Quote an identifier for SQLite.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE TABLE` statement for a schema.
#[must_use]
pub fn create_table_sql(table: &str, schema: &Schema) -> String {
    let columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|field| {
            format!(
                "{} {}",
                quote_identifier(&field.name),
                sql_type(field.field_type)
            )
        })
        .collect();
    format!(
        "CREATE TABLE {} ({})",
        quote_identifier(table),
        columns.join(", ")
    )
}

/// Parameterised `INSERT` statement for a schema.
#[must_use]
pub fn insert_sql(table: &str, schema: &Schema) -> String {
    let names: Vec<String> = schema.names().map(quote_identifier).collect();
    let placeholders: Vec<String> = (1..=schema.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        names.join(", "),
        placeholders.join(", ")
    )
}
