use crate::{Error, Gtfs, Record, Schema};
use regex::Regex;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;

/// Function applied to every record right after its table is imported
pub type PostImportHook = Arc<dyn Fn(&str, &mut Record) + Send + Sync>;
/// Function applied to a copy of every record right before it is exported
pub type PreExportHook = Arc<dyn Fn(&str, &mut Record) + Send + Sync>;

/// A textual replacement applied to the raw content of a file before it is parsed
///
/// It is meant to repair known rows that break the CSV grammar
#[derive(Debug, Clone)]
pub struct Fixup {
    pub regex: Regex,
    pub replacement: String,
}

/// Allows to parameterize how the tables are read and written
///
/// ```
/// use regex::Regex;
///
/// let gtfs = gtfs_tables::GtfsReader::default()
///     .strict(true) // A row with a wrong number of fields fails the whole table
///     .fixup("stops", Regex::new(",Some, other stop,").unwrap(), ",\"Some, other stop\",")
///     .read_from_path("fixtures/malformed")?;
/// assert_eq!(Some("Some, other stop".to_owned()), gtfs.get_stop("stop_1")?.and_then(|s| s.text("stop_desc")));
/// # Ok::<(), gtfs_tables::Error>(())
/// ```
#[derive(Derivative, Clone)]
#[derivative(Default, Debug)]
pub struct GtfsReader {
    /// Fail the import of a table on the first malformed row, instead of skipping it
    #[derivative(Default(value = "false"))]
    pub strict: bool,
    /// Trim the header and every field
    ///
    /// If your data is high quality and performance matters, you can switch it off
    #[derivative(Default(value = "true"))]
    pub trim_fields: bool,
    pub(crate) fixups: FxHashMap<String, Vec<Fixup>>,
    #[derivative(Debug = "ignore")]
    pub(crate) post_import: Option<PostImportHook>,
    #[derivative(Debug = "ignore")]
    pub(crate) pre_export: Option<PreExportHook>,
    pub(crate) schema: Schema,
}

impl GtfsReader {
    /// Should a malformed row abort the import of its table (default: false, it is skipped with a warning)
    ///
    /// Returns Self and can be chained
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Should the values be trimmed (default: true), header names always are
    pub fn trim_fields(mut self, trim_fields: bool) -> Self {
        self.trim_fields = trim_fields;
        self
    }

    /// Adds a replacement for the raw content of `table_name`
    ///
    /// Replacements of a table are applied in the order they were added. Each
    /// actual substitution is logged at the info level.
    pub fn fixup(mut self, table_name: &str, regex: Regex, replacement: &str) -> Self {
        self.fixups
            .entry(table_name.to_owned())
            .or_default()
            .push(Fixup {
                regex,
                replacement: replacement.to_owned(),
            });
        self
    }

    /// Decorates every imported record, for instance with derived fields
    ///
    /// The hook runs once the table is indexed: changing an index field does not re-index the record
    pub fn post_import<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &mut Record) + Send + Sync + 'static,
    {
        self.post_import = Some(Arc::new(hook));
        self
    }

    /// Transforms a copy of every record before it is written, the stored record is left untouched
    pub fn pre_export<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &mut Record) + Send + Sync + 'static,
    {
        self.pre_export = Some(Arc::new(hook));
        self
    }

    /// Replaces the default GTFS schema
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub(crate) fn fixups_of(&self, table_name: &str) -> &[Fixup] {
        self.fixups
            .get(table_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Binds a [Gtfs] to a directory of `<table>.txt` files, nothing is read yet
    pub fn read_from_path<P>(self, path: P) -> Result<Gtfs, Error>
    where
        P: AsRef<Path>,
    {
        let p = path.as_ref();
        if !p.is_dir() {
            return Err(Error::NotADirectory(format!("{}", p.display())));
        }
        Ok(Gtfs::with_reader(Some(p.to_path_buf()), self))
    }

    /// A [Gtfs] with no backing directory, every table starts empty
    pub fn in_memory(self) -> Gtfs {
        Gtfs::with_reader(None, self)
    }
}
