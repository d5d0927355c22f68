//! Column definitions.

use super::FieldType;
use crate::dates::{TemporalKind, classify_format};

/// Storage kind of a SAS column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// 8-byte floating point (possibly truncated to 3..7 bytes).
    Numeric,
    /// Fixed-width character data.
    Character,
}

/// A column as described by the file metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub label: Option<String>,
    /// Format name without width, e.g. `DATE` or `DATETIME`.
    pub format: Option<String>,
    pub kind: ColumnKind,
    /// Offset of the value inside a row.
    pub offset: usize,
    /// Width of the value in bytes.
    pub length: usize,
}

impl Column {
    /// Create a numeric column (8 bytes).
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            format: None,
            kind: ColumnKind::Numeric,
            offset: 0,
            length: 8,
        }
    }

    /// Create a character column of the given byte width.
    pub fn character(name: impl Into<String>, length: usize) -> Self {
        Self {
            name: name.into(),
            label: None,
            format: None,
            kind: ColumnKind::Character,
            offset: 0,
            length,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.kind == ColumnKind::Numeric
    }

    /// Logical type of the column.
    ///
    /// Numeric columns carrying a date or datetime format become temporal
    /// unless `convert_dates` is off.
    #[must_use]
    pub fn field_type(&self, convert_dates: bool) -> FieldType {
        match self.kind {
            ColumnKind::Character => FieldType::Text,
            ColumnKind::Numeric if !convert_dates => FieldType::Number,
            ColumnKind::Numeric => match self.format.as_deref().map(classify_format) {
                Some(TemporalKind::Date) => FieldType::Date,
                Some(TemporalKind::DateTime) => FieldType::DateTime,
                _ => FieldType::Number,
            },
        }
    }
}
