//! `rusqlite` integration.
//!
//! Values bind directly as SQL parameters. Missing values become NULL,
//! numbers REAL, and text, dates and datetimes TEXT.

use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, ValueRef};

use crate::types::Value;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Missing => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Self::Number(number) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*number)),
            Self::Text(text) => ToSqlOutput::Borrowed(ValueRef::Text(text.as_bytes())),
            Self::Date(_) | Self::DateTime(_) => match self.to_text() {
                Some(text) => ToSqlOutput::Owned(rusqlite::types::Value::Text(text)),
                None => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            },
        })
    }
}
