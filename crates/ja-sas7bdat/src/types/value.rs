//! Cell values.

use chrono::{NaiveDate, NaiveDateTime};

/// A single decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SAS missing numeric, or a blank character value.
    Missing,
    Number(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Create a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Render the value the way it is stored as SQLite text.
    ///
    /// Returns `None` for missing values.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Missing => None,
            Self::Number(value) => Some(value.to_string()),
            Self::Text(value) => Some(value.clone()),
            Self::Date(date) => Some(date.format("%Y-%m-%d").to_string()),
            Self::DateTime(datetime) => Some(datetime.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_rendering() {
        let date = NaiveDate::from_ymd_opt(2021, 3, 4).unwrap();
        assert_eq!(Value::Date(date).to_text().unwrap(), "2021-03-04");

        let datetime = date.and_hms_opt(5, 6, 7).unwrap();
        assert_eq!(
            Value::DateTime(datetime).to_text().unwrap(),
            "2021-03-04 05:06:07"
        );

        let precise = date.and_hms_milli_opt(5, 6, 7, 250).unwrap();
        assert_eq!(
            Value::DateTime(precise).to_text().unwrap(),
            "2021-03-04 05:06:07.250"
        );

        assert_eq!(Value::Missing.to_text(), None);
    }

    #[test]
    fn test_option_conversion() {
        assert!(Value::from(None::<f64>).is_missing());
        assert_eq!(Value::from(Some(2.5)).as_f64(), Some(2.5));
        assert_eq!(Value::from("A").as_str(), Some("A"));
    }
}
