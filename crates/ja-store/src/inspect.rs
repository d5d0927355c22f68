//! Read-only helpers for inspecting a converted database, plus table name
//! standardisation.

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use ja_sas7bdat::{Field, Schema};

use crate::error::{Result, StoreError};
use crate::sql::{field_type_for_sql, quote_identifier};

/// Tables every complete registry database carries.
pub const REQUIRED_TABLES: &[&str] = &[
    "demographics",
    "diagnoses",
    "interventions",
    "pharma",
    "physical_exams",
];

/// Size of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDimensions {
    pub name: String,
    pub rows: u64,
    pub columns: usize,
}

/// User tables, sorted by name.
pub fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

/// Whether a table exists; names compare case-insensitively, as in SQLite.
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Number of rows in a table.
pub fn table_row_count(conn: &Connection, table: &str) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(u64::try_from(count).unwrap_or_default())
}

/// Column names and declared types, in table order.
pub fn column_types(conn: &Connection, table: &str) -> Result<Vec<(String, String)>> {
    let sql = format!("PRAGMA table_info({})", quote_identifier(table));
    let mut stmt = conn.prepare(&sql)?;
    let columns = stmt
        .query_map([], |row| Ok((row.get(1)?, row.get(2)?)))?
        .collect::<rusqlite::Result<Vec<(String, String)>>>()?;
    Ok(columns)
}

/// Column names, in table order.
pub fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>> {
    Ok(column_types(conn, table)?
        .into_iter()
        .map(|(name, _)| name)
        .collect())
}

/// Schema of an existing table, or `None` when the table does not exist.
pub fn table_schema(conn: &Connection, table: &str) -> Result<Option<Schema>> {
    if !table_exists(conn, table)? {
        return Ok(None);
    }
    let fields = column_types(conn, table)?
        .into_iter()
        .map(|(name, declared)| Field::new(name, field_type_for_sql(&declared)))
        .collect();
    Ok(Some(Schema::new(fields)))
}

/// Rows and columns of every table, sorted by table name.
pub fn table_dimensions(conn: &Connection) -> Result<Vec<TableDimensions>> {
    list_tables(conn)?
        .into_iter()
        .map(|name| {
            let rows = table_row_count(conn, &name)?;
            let columns = column_types(conn, &name)?.len();
            Ok(TableDimensions {
                name,
                rows,
                columns,
            })
        })
        .collect()
}

/// Required tables absent from the database, in the order given.
pub fn missing_tables<S: AsRef<str>>(conn: &Connection, required: &[S]) -> Result<Vec<String>> {
    let mut missing = Vec::new();
    for table in required {
        let table = table.as_ref();
        if !table_exists(conn, table)? {
            missing.push(table.to_string());
        }
    }
    Ok(missing)
}

/// Lowercase, trimmed, spaces replaced by `_`, hyphens dropped.
#[must_use]
pub fn standardized_table_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_").replace('-', "")
}

/// Rename every table whose name is not standard.
///
/// Each rename goes through an intermediate name so that case-only changes
/// work in SQLite. Returns the `(old, new)` pairs. Nothing is renamed when
/// any target would collide with another table.
pub fn standardize_table_names(conn: &mut Connection) -> Result<Vec<(String, String)>> {
    let tables = list_tables(conn)?;
    let renames: Vec<(String, String)> = tables
        .iter()
        .filter_map(|table| {
            let standard = standardized_table_name(table);
            (*table != standard).then(|| (table.clone(), standard))
        })
        .collect();

    for (from, to) in &renames {
        let collides = tables
            .iter()
            .any(|other| other != from && other.eq_ignore_ascii_case(to));
        let duplicate = renames
            .iter()
            .any(|(other, target)| other != from && target.eq_ignore_ascii_case(to));
        if collides || duplicate {
            return Err(StoreError::TableExists {
                from: from.clone(),
                to: to.clone(),
            });
        }
    }

    let tx = conn.transaction()?;
    for (from, to) in &renames {
        let intermediate = format!("{to}_new");
        tx.execute_batch(&format!(
            "ALTER TABLE {} RENAME TO {};\nALTER TABLE {} RENAME TO {};",
            quote_identifier(from),
            quote_identifier(&intermediate),
            quote_identifier(&intermediate),
            quote_identifier(to),
        ))?;
        info!(from = %from, to = %to, "renamed table");
    }
    tx.commit()?;
    Ok(renames)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE demographics (ID REAL, SEX TEXT);
             INSERT INTO demographics VALUES (1, 'F'), (2, 'M');
             CREATE TABLE \"Physical Exams\" (ID REAL, WEIGHT REAL, SEEN DATE);
             CREATE TABLE \"Pharma-Data\" (ID REAL);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_list_and_dimensions() {
        let conn = sample();
        assert_eq!(
            list_tables(&conn).unwrap(),
            vec!["Pharma-Data", "Physical Exams", "demographics"]
        );
        let dims = table_dimensions(&conn).unwrap();
        assert_eq!(
            dims[2],
            TableDimensions {
                name: "demographics".to_string(),
                rows: 2,
                columns: 2
            }
        );
    }

    #[test]
    fn test_columns() {
        let conn = sample();
        assert_eq!(column_names(&conn, "demographics").unwrap(), vec!["ID", "SEX"]);
        assert_eq!(
            column_types(&conn, "Physical Exams").unwrap()[2],
            ("SEEN".to_string(), "DATE".to_string())
        );
        let schema = table_schema(&conn, "DEMOGRAPHICS").unwrap().unwrap();
        assert_eq!(schema.to_string(), "[ID: number, SEX: text]");
        assert!(table_schema(&conn, "nope").unwrap().is_none());
    }

    #[test]
    fn test_missing_tables() {
        let conn = sample();
        let missing = missing_tables(&conn, REQUIRED_TABLES).unwrap();
        assert_eq!(
            missing,
            vec!["diagnoses", "interventions", "pharma", "physical_exams"]
        );
    }

    #[test]
    fn test_standardized_table_name() {
        assert_eq!(standardized_table_name(" Physical Exams "), "physical_exams");
        assert_eq!(standardized_table_name("Pharma-Data"), "pharmadata");
        assert_eq!(standardized_table_name("demographics"), "demographics");
    }

    #[test]
    fn test_standardize_table_names() {
        let mut conn = sample();
        let renames = standardize_table_names(&mut conn).unwrap();
        assert_eq!(
            renames,
            vec![
                ("Pharma-Data".to_string(), "pharmadata".to_string()),
                ("Physical Exams".to_string(), "physical_exams".to_string()),
            ]
        );
        assert_eq!(
            list_tables(&conn).unwrap(),
            vec!["demographics", "pharmadata", "physical_exams"]
        );
        assert!(standardize_table_names(&mut conn).unwrap().is_empty());
    }

    #[test]
    fn test_standardize_case_only_rename() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE Pharma (ID REAL)").unwrap();
        standardize_table_names(&mut conn).unwrap();
        assert_eq!(list_tables(&conn).unwrap(), vec!["pharma"]);
    }

    #[test]
    fn test_standardize_collision() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE \"a b\" (ID REAL); CREATE TABLE a_b (ID REAL);")
            .unwrap();
        let err = standardize_table_names(&mut conn).unwrap_err();
        assert!(matches!(err, StoreError::TableExists { .. }));
        assert_eq!(list_tables(&conn).unwrap(), vec!["a b", "a_b"]);
    }
}
