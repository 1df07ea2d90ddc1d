//! Row shapes and the conversions between them
//!
//! A row exists in three interchangeable presentations: an ordered value
//! list, a field-name → value mapping ([`RowMap`]), and an object-like
//! [`Record`]. Given the field-name list the three are losslessly
//! convertible; the helpers in this module implement those conversions.

use indexmap::IndexMap;

use crate::error::{DataSourceError, Result};
use crate::types::Value;

/// A row as an ordered mapping from field name to value.
///
/// Iteration order is insertion order, which is also the on-disk column
/// order when the mapping was produced by a reader.
pub type RowMap = IndexMap<String, Value>;

/// One row in the shape its reader was configured to yield.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// Object presentation ([`ReadMode::Object`](crate::types::ReadMode))
    Object(Record),
    /// Mapping presentation ([`ReadMode::Mapping`](crate::types::ReadMode))
    Mapping(RowMap),
    /// Ordered value-list presentation ([`ReadMode::List`](crate::types::ReadMode))
    List(Vec<Value>),
}

/// Normalize a field name into a valid identifier for use as a [`Record`]
/// attribute name.
///
/// Every character outside `[A-Za-z0-9_]` becomes `_`, a leading digit gets
/// a `_` prefix, and an empty name becomes `_`. The mapping and list row
/// shapes always keep the original field-name text; only synthesized record
/// attributes use the normalized form.
///
/// ```
/// use tabsource::record::normalize_identifier;
///
/// assert_eq!(normalize_identifier("G&S"), "G_S");
/// assert_eq!(normalize_identifier("unit price"), "unit_price");
/// ```
pub fn normalize_identifier(name: &str) -> String {
    if name.is_empty() {
        return "_".to_string();
    }
    let mut out = String::with_capacity(name.len() + 1);
    for (i, c) in name.chars().enumerate() {
        if i == 0 && c.is_ascii_digit() {
            out.push('_');
        }
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    out
}

/// Capability to expose a value as a row: the write-side object shape.
///
/// Any type handed to [`DataWriter::write_record`](crate::datafile::DataWriter::write_record)
/// or the object-based save helpers implements this instead of being
/// reflected over at runtime.
pub trait ToRow {
    /// Field names in declaration order
    fn field_names(&self) -> Vec<String>;

    /// The row as a field-name → value mapping, in field-name order
    fn to_row(&self) -> RowMap;
}

/// The read-side object shape: an ordered bag of named values synthesized
/// from a row mapping.
///
/// Each field keeps its original name and additionally answers to its
/// normalized attribute name, so a column called `G&S` is reachable both as
/// `record.get("G&S")` and `record.get("G_S")`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Build a record from a row mapping, keeping field order
    pub fn from_mapping(row: RowMap) -> Self {
        Record {
            fields: row.into_iter().collect(),
        }
    }

    /// Look a value up by its original field name or its normalized
    /// attribute name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name || normalize_identifier(field) == name)
            .map(|(_, value)| value)
    }

    /// Original field names, in order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(field, _)| field.as_str()).collect()
    }

    /// Normalized attribute names, in order
    pub fn attr_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|(field, _)| normalize_identifier(field))
            .collect()
    }

    /// Values in field order
    pub fn values(&self) -> Vec<&Value> {
        self.fields.iter().map(|(_, value)| value).collect()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over `(field name, value)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(field, value)| (field.as_str(), value))
    }

    /// Convert back to a row mapping with the original field names
    pub fn to_mapping(&self) -> RowMap {
        self.fields.iter().cloned().collect()
    }
}

impl ToRow for Record {
    fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|(field, _)| field.clone()).collect()
    }

    fn to_row(&self) -> RowMap {
        self.to_mapping()
    }
}

/// Field names of a mapping, in iteration order
pub fn fields_of_mapping(row: &RowMap) -> Vec<String> {
    row.keys().cloned().collect()
}

/// Zip an ordered value list with a field-name list into a row mapping.
///
/// The two lists must have the same length.
pub fn list_to_mapping(values: &[Value], field_names: &[String]) -> Result<RowMap> {
    if values.len() != field_names.len() {
        return Err(DataSourceError::FieldCountMismatch {
            expected: field_names.len(),
            got: values.len(),
        });
    }
    Ok(field_names
        .iter()
        .cloned()
        .zip(values.iter().cloned())
        .collect())
}

/// Project a row mapping onto a field-name list, in field order.
///
/// Fields absent from the mapping come back as [`Value::Empty`]; mapping
/// keys outside the field list are dropped.
pub fn mapping_to_list(row: &RowMap, field_names: &[String]) -> Vec<Value> {
    field_names
        .iter()
        .map(|field| row.get(field).cloned().unwrap_or(Value::Empty))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> RowMap {
        let mut row = RowMap::new();
        row.insert("id".to_string(), Value::Int(1));
        row.insert("G&S".to_string(), Value::Text("opera".to_string()));
        row
    }

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("name"), "name");
        assert_eq!(normalize_identifier("G&S"), "G_S");
        assert_eq!(normalize_identifier("unit price"), "unit_price");
        assert_eq!(normalize_identifier("1st"), "_1st");
        assert_eq!(normalize_identifier(""), "_");
    }

    #[test]
    fn test_record_lookup_by_both_names() {
        let record = Record::from_mapping(sample_row());
        assert_eq!(record.get("G&S"), Some(&Value::Text("opera".to_string())));
        assert_eq!(record.get("G_S"), Some(&Value::Text("opera".to_string())));
        assert_eq!(record.get("id"), Some(&Value::Int(1)));
        assert!(record.get("missing").is_none());
        assert_eq!(record.attr_names(), vec!["id", "G_S"]);
        assert_eq!(record.field_names(), vec!["id", "G&S"]);
    }

    #[test]
    fn test_record_round_trip() {
        let row = sample_row();
        let record = Record::from_mapping(row.clone());
        assert_eq!(record.to_mapping(), row);
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_list_to_mapping_zip() {
        let fields = vec!["a".to_string(), "b".to_string()];
        let row = list_to_mapping(&[Value::Int(1), Value::Int(2)], &fields).unwrap();
        assert_eq!(row.get("a"), Some(&Value::Int(1)));
        assert_eq!(row.get("b"), Some(&Value::Int(2)));

        let err = list_to_mapping(&[Value::Int(1)], &fields).unwrap_err();
        assert!(matches!(
            err,
            crate::error::DataSourceError::FieldCountMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn test_mapping_to_list_projection() {
        let fields = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let mut row = RowMap::new();
        row.insert("b".to_string(), Value::Int(2));
        row.insert("a".to_string(), Value::Int(1));
        row.insert("extra".to_string(), Value::Int(9));

        // field order wins over mapping order; missing fields are Empty,
        // extra keys are dropped
        let list = mapping_to_list(&row, &fields);
        assert_eq!(list, vec![Value::Int(1), Value::Int(2), Value::Empty]);
    }
}
