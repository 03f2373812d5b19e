use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// One row of a table, as an ordered set of field → value pairs
///
/// Values read from a file are always [Value::String]. The format is open
/// ended: a record may carry fields beyond its table's columns, and callers
/// may store any JSON value in the fields they add.
///
/// ```
/// use gtfs_tables::Record;
///
/// let mut stop = Record::from_iter([("stop_id", "stop_0"), ("stop_name", "Stop 0")]);
/// stop.set("platform_count", 2);
/// assert_eq!(Some("Stop 0"), stop.get("stop_name"));
/// assert_eq!(Some("2".to_owned()), stop.text("platform_count"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Record(IndexMap::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Record(IndexMap::with_capacity(capacity))
    }

    /// The value of a field, if it is a string
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// The raw value of a field
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn value_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.0.get_mut(field)
    }

    /// The textual form of a field, as it would be exported
    ///
    /// `None` when the field is missing or null
    pub fn text(&self, field: &str) -> Option<String> {
        match self.0.get(field)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(crate::codec::format_value(other).into_owned()),
        }
    }

    /// Sets a field, returning the previous value. New fields are appended
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.to_owned(), value.into())
    }

    /// Removes a field, keeping the order of the other ones
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.shift_remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Field names, in insertion order
    pub fn fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Identity of the record's content, independent from the field order
    pub(crate) fn fingerprint(&self) -> String {
        let sorted: BTreeMap<&str, &Value> = self.0.iter().map(|(k, v)| (k.as_str(), v)).collect();
        // serializing string keys and json values cannot fail
        serde_json::to_string(&sorted).unwrap_or_default()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Record(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K, V> Extend<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        self.0
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self
            .0
            .iter()
            .map(|(k, v)| format!("{}={}", k, crate::codec::format_value(v)))
            .collect();
        write!(f, "{}", fields.join(" | "))
    }
}
