use crate::container::Items;
use crate::progress::for_each_with_log;
use crate::{export, import};
use crate::{Container, Error, GtfsReader, Indexing, Record, Schema};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A loaded table, shared with the store
pub type Table = Arc<RwLock<Container>>;

/// Tables of a GTFS feed, loaded in memory on first access
///
/// The store is bound to a directory of `<table>.txt` files (or to nothing,
/// see [GtfsReader::in_memory]). A table is read the first time any operation
/// touches it and stays in memory until the store is dropped: later accesses
/// never read the file again, even after a [Gtfs::reset].
///
/// Every operation is generic over the table name and dispatches on the
/// table's [Indexing]. Looking up something that does not exist gives `None`,
/// while calling an operation on a table of the wrong shape is an [Error].
///
/// ```
/// let gtfs = gtfs_tables::Gtfs::from_path("fixtures/basic")?;
/// assert_eq!(2, gtfs.count("stops")?);
/// let trip = gtfs.get("trips", "trip_0")?.unwrap();
/// let route = gtfs.get_parent(&trip, "routes")?.unwrap();
/// assert_eq!(Some("route_0"), route.get("route_id"));
/// # Ok::<(), gtfs_tables::Error>(())
/// ```
#[derive(Debug)]
pub struct Gtfs {
    path: Option<PathBuf>,
    pub(crate) reader: GtfsReader,
    tables: Mutex<IndexMap<String, Table>>,
}

impl Gtfs {
    /// Binds a store to a directory with the default options
    pub fn from_path<P>(path: P) -> Result<Gtfs, Error>
    where
        P: AsRef<Path>,
    {
        GtfsReader::default().read_from_path(path)
    }

    /// A store without backing directory, with the default options
    pub fn in_memory() -> Gtfs {
        GtfsReader::default().in_memory()
    }

    pub(crate) fn with_reader(path: Option<PathBuf>, reader: GtfsReader) -> Self {
        Gtfs {
            path,
            reader,
            tables: Mutex::new(IndexMap::new()),
        }
    }

    /// The source directory, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn schema(&self) -> &Schema {
        &self.reader.schema
    }

    /// The container of a table, imported on first access
    ///
    /// The same [Table] is returned on every call, so changes made through
    /// it or through the store are visible to both.
    pub fn table(&self, name: &str) -> Result<Table, Error> {
        let mut tables = self.tables.lock();
        if let Some(table) = tables.get(name) {
            return Ok(Arc::clone(table));
        }
        let schema = self
            .reader
            .schema
            .table(name)
            .ok_or_else(|| Error::UnknownTable(name.to_owned()))?;
        let container = import::import_table(self.path(), schema, &self.reader)?;
        let table = Arc::new(RwLock::new(container));
        tables.insert(name.to_owned(), Arc::clone(&table));
        Ok(table)
    }

    /// The table if it was already loaded, never imports
    pub(crate) fn loaded_table(&self, name: &str) -> Option<Table> {
        self.tables.lock().get(name).cloned()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.tables.lock().contains_key(name)
    }

    /// Tables of the schema in declaration order, then the ones only known at runtime
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schema().table_names().map(String::from).collect();
        names.extend(
            self.tables
                .lock()
                .keys()
                .filter(|name| !self.schema().contains(name))
                .cloned(),
        );
        names
    }

    fn indexing_of(&self, name: &str) -> Result<Indexing, Error> {
        if let Some(indexing) = self.schema().indexing_of(name) {
            return Ok(indexing.clone());
        }
        self.loaded_table(name)
            .map(|table| table.read().indexing())
            .ok_or_else(|| Error::UnknownTable(name.to_owned()))
    }

    fn read<T, F>(&self, name: &str, f: F) -> Result<T, Error>
    where
        F: FnOnce(&Container) -> Result<T, Error>,
    {
        let table = self.table(name)?;
        let container = table.read();
        f(&container)
    }

    fn write<T, F>(&self, name: &str, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Container) -> Result<T, Error>,
    {
        let table = self.table(name)?;
        let mut container = table.write();
        f(&mut container)
    }

    /// Adds records to a table, a record replaces the one with the same key
    ///
    /// Every record is checked before the table is touched: if one lacks an
    /// index key, nothing is added.
    pub fn add<I>(&self, name: &str, records: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = Record>,
    {
        let records: Vec<Record> = records.into_iter().collect();
        self.write(name, |container| {
            if let Container::Singleton(_) = container {
                return Err(Error::NotAddable(name.to_owned()));
            }
            for record in &records {
                container
                    .check_keys(record)
                    .map_err(|e| e.in_table(name))?;
            }
            for record in records {
                container.insert(record)?;
            }
            Ok(())
        })
    }

    pub fn add_one(&self, name: &str, record: Record) -> Result<(), Error> {
        self.add(name, std::iter::once(record))
    }

    /// Removes the records stored under the keys of `records`
    ///
    /// Returns how many were actually removed. A group of a nested table is
    /// dropped with its last record.
    pub fn remove(&self, name: &str, records: &[Record]) -> Result<usize, Error> {
        self.write(name, |container| {
            if let Container::Singleton(_) = container {
                return Err(Error::NotAddable(name.to_owned()));
            }
            for record in records {
                container
                    .check_keys(record)
                    .map_err(|e| e.in_table(name))?;
            }
            let mut removed = 0;
            for record in records {
                if container.remove(record)?.is_some() {
                    removed += 1;
                }
            }
            Ok(removed)
        })
    }

    /// Calls `f` on every record of a table, nested tables are flattened
    ///
    /// The table is locked for reading during the iteration, `f` must not modify it.
    pub fn for_each<F>(&self, name: &str, f: F) -> Result<(), Error>
    where
        F: FnMut(&Record),
    {
        self.read(name, |container| {
            for_each_with_log(name, container.len(), container.iter(), f);
            Ok(())
        })
    }

    /// Edits every record of a table in place
    ///
    /// Index keys are not recomputed: changing an index field leaves the
    /// record under its former key.
    pub fn for_each_mut<F>(&self, name: &str, f: F) -> Result<(), Error>
    where
        F: FnMut(&mut Record),
    {
        self.write(name, |container| {
            let total = container.len();
            for_each_with_log(name, total, container.iter_mut(), f);
            container.refresh_identities();
            Ok(())
        })
    }

    /// A copy of every record of a table, in iteration order
    pub fn records(&self, name: &str) -> Result<Vec<Record>, Error> {
        self.read(name, |container| Ok(container.iter().cloned().collect()))
    }

    fn check_deepness(
        operation: &'static str,
        name: &str,
        container: &Container,
        expected: u8,
    ) -> Result<(), Error> {
        let actual = container.deepness();
        if actual != expected {
            return Err(Error::WrongDeepness {
                operation,
                table: name.to_owned(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// The record of a single-key table with the given key
    pub fn get(&self, name: &str, key: &str) -> Result<Option<Record>, Error> {
        self.read(name, |container| {
            Self::check_deepness("get", name, container, 1)?;
            Ok(container.get(key).cloned())
        })
    }

    /// The record of a composite-key table with the given keys
    pub fn get_by_keys(&self, name: &str, first: &str, second: &str) -> Result<Option<Record>, Error> {
        self.read(name, |container| {
            Self::check_deepness("get_by_keys", name, container, 2)?;
            Ok(container.get_nested(first, second).cloned())
        })
    }

    /// The record of a singleton table
    pub fn get_singleton(&self, name: &str) -> Result<Option<Record>, Error> {
        self.read(name, |container| match container {
            Container::Singleton(record) => Ok(record.clone()),
            other => Err(Error::ShapeMismatch {
                table: name.to_owned(),
                expected: Indexing::Singleton.to_string(),
                found: other.indexing().to_string(),
            }),
        })
    }

    /// Records of a composite-key table sharing the first key, keyed by the second one
    pub fn children(&self, name: &str, first: &str) -> Result<Option<Items>, Error> {
        self.read(name, |container| {
            Self::check_deepness("children", name, container, 2)?;
            Ok(container.children(first).cloned())
        })
    }

    /// The record of `parent_table` that `child` references
    ///
    /// `child` must carry the index key of the parent table. A reference to
    /// a missing parent gives `None`.
    pub fn get_parent(&self, child: &Record, parent_table: &str) -> Result<Option<Record>, Error> {
        let field = match self.indexing_of(parent_table)? {
            Indexing::SingleKey { field, .. } => field,
            other => {
                return Err(Error::WrongDeepness {
                    operation: "get_parent",
                    table: parent_table.to_owned(),
                    expected: 1,
                    actual: other.deepness(),
                })
            }
        };
        let key = child
            .text(&field)
            .ok_or(Error::MissingForeignKey { field })?;
        self.get(parent_table, &key)
    }

    /// The parent of the parent of `child`, `None` as soon as one hop is missing
    pub fn get_grandparent(
        &self,
        child: &Record,
        parent_table: &str,
        grandparent_table: &str,
    ) -> Result<Option<Record>, Error> {
        match self.get_parent(child, parent_table)? {
            Some(parent) => self.get_parent(&parent, grandparent_table),
            None => Ok(None),
        }
    }

    /// The records of the composite-key `child_table` grouped under `parent`
    pub fn get_children_of_parent(
        &self,
        parent: &Record,
        child_table: &str,
    ) -> Result<Option<Items>, Error> {
        let field = match self.indexing_of(child_table)? {
            Indexing::CompositeKey { first, .. } => first,
            other => {
                return Err(Error::WrongDeepness {
                    operation: "get_children_of_parent",
                    table: child_table.to_owned(),
                    expected: 2,
                    actual: other.deepness(),
                })
            }
        };
        let key = parent
            .text(&field)
            .ok_or(Error::MissingForeignKey { field })?;
        self.children(child_table, &key)
    }

    /// Calls `f` on every child of `parent` in `child_table`
    pub fn for_each_child<F>(&self, parent: &Record, child_table: &str, mut f: F) -> Result<(), Error>
    where
        F: FnMut(&Record),
    {
        if let Some(children) = self.get_children_of_parent(parent, child_table)? {
            children.values().for_each(|child| f(child));
        }
        Ok(())
    }

    /// Replaces the content of a table
    ///
    /// The container must be indexed the way the schema declares the table.
    /// A table unknown to the schema can be introduced this way; it then keeps
    /// the indexing of its first container.
    pub fn set(&self, name: &str, mut container: Container) -> Result<(), Error> {
        let declared = self.schema().indexing_of(name);
        let table = {
            let mut tables = self.tables.lock();
            match tables.get(name) {
                Some(table) => Arc::clone(table),
                None => {
                    if let Some(declared) = declared {
                        check_shape(name, declared, &mut container)?;
                    }
                    tables.insert(name.to_owned(), Arc::new(RwLock::new(container)));
                    return Ok(());
                }
            }
        };
        // the map is released before waiting on the table
        let mut current = table.write();
        let expected = declared.cloned().unwrap_or_else(|| current.indexing());
        check_shape(name, &expected, &mut container)?;
        *current = container;
        Ok(())
    }

    /// Empties a table, the file is not read again
    pub fn reset(&self, name: &str) -> Result<(), Error> {
        let indexing = self.indexing_of(name)?;
        self.set(name, Container::empty(&indexing))
    }

    /// Number of records of a single-key or unkeyed table
    pub fn count(&self, name: &str) -> Result<usize, Error> {
        self.read(name, |container| match container {
            Container::Flat { items, .. } | Container::Unkeyed(items) => Ok(items.len()),
            _ => Err(Error::AmbiguousCount(name.to_owned())),
        })
    }

    /// Declared columns, followed by the extra fields of a sample record
    pub fn actual_columns(&self, name: &str) -> Result<Vec<String>, Error> {
        self.read(name, |container| {
            Ok(export::header_of(
                self.schema().columns_of(name).unwrap_or_default(),
                container.sample(),
            ))
        })
    }

    /// Writes every table to `path` as `<table>.txt` files
    ///
    /// **The directory is deleted and created again.** Loaded tables are
    /// serialized, the others are copied from the source directory as is.
    pub fn export<P>(&self, path: P) -> Result<(), Error>
    where
        P: AsRef<Path>,
    {
        export::export_all(self, path.as_ref())
    }
}

/// Checks that `container` is shaped as `expected`, and takes its key optionality
fn check_shape(name: &str, expected: &Indexing, container: &mut Container) -> Result<(), Error> {
    let found = container.indexing();
    if !expected.same_shape(&found) {
        return Err(Error::ShapeMismatch {
            table: name.to_owned(),
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    if let Indexing::SingleKey { optional, .. } = expected {
        container.set_optional_key(*optional);
    }
    Ok(())
}
