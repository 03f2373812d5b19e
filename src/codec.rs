//! Conversion between one CSV row and a [Record]
//!
//! The quoting rules are the ones of the `csv` crate: on output a field is
//! quoted when it contains the delimiter, a quote or a line break, and inner
//! quotes are doubled.
use crate::{Error, Record};
use serde_json::Value;
use std::borrow::Cow;

/// Reader configuration shared by every table
///
/// Rows may have any number of fields, the importer compares them to the header itself
pub(crate) fn reader_builder(trim_fields: bool) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.flexible(true).has_headers(true).trim(if trim_fields {
        csv::Trim::All
    } else {
        csv::Trim::None
    });
    builder
}

pub(crate) fn writer_builder() -> csv::WriterBuilder {
    let mut builder = csv::WriterBuilder::new();
    builder
        .flexible(false)
        .quote_style(csv::QuoteStyle::Necessary);
    builder
}

/// Textual form of a value
///
/// Null is empty, strings are kept as is, numbers and booleans are printed
/// and arrays/objects are encoded as JSON.
pub fn format_value(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(""),
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Bool(b) => Cow::Owned(b.to_string()),
        Value::Number(n) => Cow::Owned(n.to_string()),
        composite => Cow::Owned(composite.to_string()),
    }
}

/// Builds a record from the fields of a row, named after the header
///
/// Both slices are expected to have the same length, extra fields on either side are ignored
pub fn row_to_record<'a, I>(fields: I, header: &[String]) -> Record
where
    I: IntoIterator<Item = &'a str>,
{
    let mut record = Record::with_capacity(header.len());
    for (key, value) in header.iter().zip(fields) {
        record.set(key, value);
    }
    record
}

/// The fields of a record in the given column order, missing ones are empty
pub fn record_to_row<'a>(record: &'a Record, columns: &[String]) -> Vec<Cow<'a, str>> {
    columns
        .iter()
        .map(|column| {
            record
                .value(column)
                .map(format_value)
                .unwrap_or(Cow::Borrowed(""))
        })
        .collect()
}

/// One CSV line (with its `\n` terminator) for a record
pub fn record_to_line(record: &Record, columns: &[String]) -> Result<String, Error> {
    let mut writer = writer_builder().from_writer(Vec::new());
    writer
        .write_record(record_to_row(record, columns).iter().map(|f| f.as_bytes()))
        .map_err(|e| Error::csv("<row>", e))?;
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::named_io("<row>", e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| Error::named_io("<row>", e))
}
