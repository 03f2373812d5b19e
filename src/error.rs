//! Module for the error management
use thiserror::Error;

/// Specific line from a CSV file that could not be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    /// Headers of the CSV file
    pub headers: Vec<String>,
    /// Values of the line that could not be parsed
    pub values: Vec<String>,
}

/// An error that can occur when loading, editing or exporting GTFS tables.
#[derive(Error, Debug)]
pub enum Error {
    /// The given path is expected to be an existing directory
    #[error("'{0}' is not a valid directory")]
    NotADirectory(String),
    /// The export target can not be used
    #[error("invalid output path '{path}': {reason}")]
    InvalidOutputPath {
        /// The rejected path
        path: String,
        /// Why it was rejected
        reason: String,
    },
    /// A schema failed its consistency checks
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// The table is neither declared in the schema nor present in the store
    #[error("cannot find table with name '{0}'")]
    UnknownTable(String),
    /// The header of a file lacks the columns used to index its records
    #[error("header of '{file_name}' does not contain the index columns {columns:?}")]
    MissingIndexColumns {
        /// File whose header is incomplete
        file_name: String,
        /// Index columns that are required
        columns: Vec<String>,
    },
    /// A row does not have as many fields as the header
    #[error("row {line} of '{file_name}' does not match the header")]
    MalformedRow {
        /// File containing the row
        file_name: String,
        /// Line number of the row (1-based, the header is line 1)
        line: u64,
        /// Header and values of the row
        line_in_error: LineError,
    },
    /// The operation needs a table of another deepness
    #[error("'{operation}' needs a table of deepness {expected}, but '{table}' is of deepness {actual}")]
    WrongDeepness {
        /// Attempted operation
        operation: &'static str,
        /// Table name
        table: String,
        /// Deepness the operation works on
        expected: u8,
        /// Deepness of the table
        actual: u8,
    },
    /// A container does not have the shape the schema dictates for its table
    #[error("table '{table}' must be indexed as {expected}, got {found}")]
    ShapeMismatch {
        /// Table name
        table: String,
        /// Shape required by the schema
        expected: String,
        /// Shape that was supplied
        found: String,
    },
    /// Singleton tables are replaced wholesale, never added to
    #[error("records cannot be added to or removed from singleton table '{0}', set it instead")]
    NotAddable(String),
    /// Counting is ambiguous for nested and singleton tables
    #[error("the number of items of table '{0}' is ambiguous")]
    AmbiguousCount(String),
    /// A child record does not carry the key of its parent
    #[error("record should contain the foreign index key '{field}'")]
    MissingForeignKey {
        /// Index key of the parent table
        field: String,
    },
    /// A record does not carry the field its table is indexed by
    #[error("record of table '{table}' does not contain the index key '{field}'")]
    MissingIndexKey {
        /// Table name
        table: String,
        /// Index key field
        field: String,
    },
    /// Generic Input/Output error while reading a file
    #[error("impossible to read file")]
    IO(#[from] std::io::Error),
    /// Impossible to read or write a file
    #[error("impossible to access '{file_name}'")]
    NamedFileIO {
        /// The file name that could not be accessed
        file_name: String,
        /// The inital error that caused the unability to access the file
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Impossible to read or write a CSV file
    #[error("impossible to process csv file '{file_name}'")]
    CSVError {
        /// File name that could not be processed as CSV
        file_name: String,
        /// The initial error by the csv library
        #[source]
        source: csv::Error,
        /// The line that could not be processed, if known
        line_in_error: Option<LineError>,
    },
    /// A schema could not be read from JSON
    #[error("impossible to read schema")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn named_io(file_name: &str, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::NamedFileIO {
            file_name: file_name.to_owned(),
            source: Box::new(source),
        }
    }

    /// Names the table in errors raised by a container, which does not know it
    pub(crate) fn in_table(self, table_name: &str) -> Self {
        match self {
            Error::MissingIndexKey { field, .. } => Error::MissingIndexKey {
                table: table_name.to_owned(),
                field,
            },
            other => other,
        }
    }

    pub(crate) fn csv(file_name: &str, source: csv::Error) -> Self {
        Error::CSVError {
            file_name: file_name.to_owned(),
            source,
            line_in_error: None,
        }
    }
}
