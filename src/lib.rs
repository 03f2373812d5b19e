/*! In-memory tables of a [General Transit Feed Specification](https://gtfs.org/) (GTFS) feed.

A GTFS feed is a directory of CSV files (`stops.txt`, `routes.txt`, ...). This crate loads
each file lazily into an indexed in-memory table, lets you read, edit and navigate the
records, and writes the whole feed back.

To get started, see [Gtfs] and [GtfsReader].

## Design decisions

### Records are open ended

A [Record] is an ordered map of field names to values. Fields read from a file are strings,
and any extra field added at runtime is kept and exported as an extra column.
Nothing is checked against the GTFS reference beyond the presence of the index keys.

### Indexing

The [Schema] tells, for every table, its columns and how its records are indexed
([Indexing]): by one key (`stops` by `stop_id`), by two keys (`stop_times` by `trip_id`
then `stop_sequence`), as a single record (`feed_info`) or as a set (`fare_rules`).
The default schema follows the GTFS reference, and can be replaced as a whole.

### Relationships

A child record references its parent through a field named after the parent's index key:
a trip has a `route_id`. [Gtfs::get_parent], [Gtfs::get_grandparent] and
[Gtfs::get_children_of_parent] follow those references. A dangling reference is not an error,
it gives `None`.

### Lazy loading

A file is read the first time its table is used, and never again. Tables never used are
copied as is on export.

*/

#[macro_use]
extern crate derivative;

mod accessors;
pub mod codec;
mod container;
pub mod error;
mod export;
mod gtfs;
mod gtfs_reader;
mod import;
mod progress;
mod record;
mod schema;

#[cfg(test)]
mod tests;

pub use container::{Container, Items};
pub use error::{Error, LineError};
pub use gtfs::{Gtfs, Table};
pub use gtfs_reader::{Fixup, GtfsReader, PostImportHook, PreExportHook};
pub use record::Record;
pub use schema::{Indexing, Schema, SchemaBuilder, TableSchema, DEFAULT_SCHEMA_VERSION};
