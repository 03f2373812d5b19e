use crate::Error;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version of the GTFS reference the default schema follows
pub const DEFAULT_SCHEMA_VERSION: &str = "2017.12.11";

/// How the records of a table are indexed in memory
///
/// The variant dictates the shape of the [crate::Container] built for the table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Indexing {
    /// One field uniquely identifies a record
    SingleKey {
        /// Index field
        field: String,
        /// The column may be absent from the file, records then share the empty key
        /// (a feed with a single agency may omit `agency_id`)
        #[serde(default)]
        optional: bool,
    },
    /// Records are grouped by a first field, then identified by a second one
    CompositeKey {
        /// Field grouping the records, usually the key of a parent table
        first: String,
        /// Field identifying a record within its group
        second: String,
    },
    /// The table holds exactly one record
    Singleton,
    /// Records have no key, identical records collapse
    UnorderedSet,
}

impl Indexing {
    /// A mandatory single key
    pub fn single(field: &str) -> Self {
        Indexing::SingleKey {
            field: field.to_owned(),
            optional: false,
        }
    }

    /// A single key whose column may be missing from the file
    pub fn optional_single(field: &str) -> Self {
        Indexing::SingleKey {
            field: field.to_owned(),
            optional: true,
        }
    }

    /// A two-level key
    pub fn composite(first: &str, second: &str) -> Self {
        Indexing::CompositeKey {
            first: first.to_owned(),
            second: second.to_owned(),
        }
    }

    /// 0 for singletons and sets, 1 for single keys, 2 for composite keys
    pub fn deepness(&self) -> u8 {
        match self {
            Indexing::Singleton | Indexing::UnorderedSet => 0,
            Indexing::SingleKey { .. } => 1,
            Indexing::CompositeKey { .. } => 2,
        }
    }

    /// All the fields used as index keys, in key order
    pub fn key_fields(&self) -> Vec<&str> {
        match self {
            Indexing::SingleKey { field, .. } => vec![field.as_str()],
            Indexing::CompositeKey { first, second } => vec![first.as_str(), second.as_str()],
            Indexing::Singleton | Indexing::UnorderedSet => Vec::new(),
        }
    }

    /// Same variant and same key fields, whether a single key is optional or not
    pub fn same_shape(&self, other: &Indexing) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
            && self.key_fields() == other.key_fields()
    }

    /// Key fields a file header must contain
    pub fn required_fields(&self) -> Vec<&str> {
        match self {
            Indexing::SingleKey { optional: true, .. } => Vec::new(),
            other => other.key_fields(),
        }
    }
}

impl fmt::Display for Indexing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Indexing::SingleKey { field, .. } => write!(f, "a map by '{}'", field),
            Indexing::CompositeKey { first, second } => {
                write!(f, "a nested map by '{}' then '{}'", first, second)
            }
            Indexing::Singleton => write!(f, "a single record"),
            Indexing::UnorderedSet => write!(f, "a set of records"),
        }
    }
}

/// Declaration of one table: its canonical columns and its indexing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name, the file is `<name>.txt`
    pub name: String,
    /// Standard columns, in serialization order
    pub columns: Vec<String>,
    /// In-memory indexing of the records
    pub indexing: Indexing,
}

impl TableSchema {
    pub fn new(name: &str, columns: &[&str], indexing: Indexing) -> Self {
        TableSchema {
            name: name.to_owned(),
            columns: columns.iter().map(|c| (*c).to_owned()).collect(),
            indexing,
        }
    }

    pub fn deepness(&self) -> u8 {
        self.indexing.deepness()
    }

    /// Name of the backing file
    pub fn file_name(&self) -> String {
        file_name_of(&self.name)
    }
}

pub(crate) fn file_name_of(table_name: &str) -> String {
    format!("{}.txt", table_name)
}

#[derive(Serialize, Deserialize)]
struct SchemaDocument {
    version: String,
    tables: Vec<TableSchema>,
}

/// The set of tables a [crate::Gtfs] knows about
///
/// A schema is immutable once built. The default one describes the GTFS
/// reference; a replacement can be built with [Schema::builder], derived from
/// the default with [Schema::to_builder], or read with [Schema::from_json].
/// Every construction path goes through the same consistency checks.
///
/// ```
/// use gtfs_tables::{Indexing, Schema};
///
/// let schema = Schema::gtfs()
///     .to_builder()
///     .table("modes", &["mode_id", "mode_name"], Indexing::single("mode_id"))
///     .build()?;
/// assert_eq!(Some(1), schema.deepness_of("modes"));
/// # Ok::<(), gtfs_tables::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SchemaDocument", into = "SchemaDocument")]
pub struct Schema {
    version: String,
    tables: IndexMap<String, TableSchema>,
}

impl TryFrom<SchemaDocument> for Schema {
    type Error = Error;

    fn try_from(document: SchemaDocument) -> Result<Self, Error> {
        validate(document.version, document.tables)
    }
}

impl From<Schema> for SchemaDocument {
    fn from(schema: Schema) -> Self {
        SchemaDocument {
            version: schema.version,
            tables: schema.tables.into_values().collect(),
        }
    }
}

impl Schema {
    /// A copy of the default GTFS schema
    pub fn gtfs() -> Self {
        DEFAULT_SCHEMA.clone()
    }

    pub fn builder(version: &str) -> SchemaBuilder {
        SchemaBuilder {
            version: version.to_owned(),
            tables: Vec::new(),
        }
    }

    /// A builder pre-filled with the tables of this schema
    pub fn to_builder(&self) -> SchemaBuilder {
        SchemaBuilder {
            version: self.version.clone(),
            tables: self.tables.values().cloned().collect(),
        }
    }

    /// Reads and validates a schema from its JSON form
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let document: SchemaDocument = serde_json::from_str(json)?;
        Schema::try_from(document)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn indexing_of(&self, name: &str) -> Option<&Indexing> {
        self.table(name).map(|t| &t.indexing)
    }

    pub fn columns_of(&self, name: &str) -> Option<&[String]> {
        self.table(name).map(|t| t.columns.as_slice())
    }

    pub fn deepness_of(&self, name: &str) -> Option<u8> {
        self.table(name).map(TableSchema::deepness)
    }

    /// Table names in declaration order
    pub fn table_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.tables.keys().map(String::as_str)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> + '_ {
        self.tables.values()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Schema::gtfs()
    }
}

/// Collects table declarations, see [Schema]
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    version: String,
    tables: Vec<TableSchema>,
}

impl SchemaBuilder {
    /// Declares a table; declaring an existing name replaces it in place
    pub fn table(self, name: &str, columns: &[&str], indexing: Indexing) -> Self {
        self.with_table(TableSchema::new(name, columns, indexing))
    }

    pub fn with_table(mut self, table: TableSchema) -> Self {
        match self.tables.iter_mut().find(|t| t.name == table.name) {
            Some(existing) => *existing = table,
            None => self.tables.push(table),
        }
        self
    }

    pub fn without_table(mut self, name: &str) -> Self {
        self.tables.retain(|t| t.name != name);
        self
    }

    pub fn build(self) -> Result<Schema, Error> {
        validate(self.version, self.tables)
    }
}

fn validate(version: String, tables: Vec<TableSchema>) -> Result<Schema, Error> {
    let mut by_name = IndexMap::with_capacity(tables.len());

    for table in tables {
        if table.name.trim().is_empty() {
            return Err(Error::InvalidSchema("a table has an empty name".to_owned()));
        }
        if table.columns.is_empty() {
            return Err(Error::InvalidSchema(format!(
                "no columns declared for table '{}'",
                table.name
            )));
        }

        let columns: FxHashSet<&str> = table.columns.iter().map(String::as_str).collect();
        if columns.len() != table.columns.len() {
            return Err(Error::InvalidSchema(format!(
                "duplicated column in table '{}'",
                table.name
            )));
        }
        for field in table.indexing.key_fields() {
            if !columns.contains(field) {
                return Err(Error::InvalidSchema(format!(
                    "index key '{}' of table '{}' is not one of its columns",
                    field, table.name
                )));
            }
        }
        if let Indexing::CompositeKey { first, second } = &table.indexing {
            if first == second {
                return Err(Error::InvalidSchema(format!(
                    "both index keys of table '{}' are '{}'",
                    table.name, first
                )));
            }
        }

        if by_name.contains_key(&table.name) {
            return Err(Error::InvalidSchema(format!(
                "table '{}' is declared twice",
                table.name
            )));
        }
        by_name.insert(table.name.clone(), table);
    }

    Ok(Schema {
        version,
        tables: by_name,
    })
}

fn default_schema() -> Schema {
    Schema::builder(DEFAULT_SCHEMA_VERSION)
        .table(
            "agency",
            &[
                "agency_id",
                "agency_name",
                "agency_url",
                "agency_timezone",
                "agency_lang",
                "agency_phone",
                "agency_fare_url",
                "agency_email",
            ],
            Indexing::optional_single("agency_id"),
        )
        .table(
            "calendar",
            &[
                "service_id",
                "monday",
                "tuesday",
                "wednesday",
                "thursday",
                "friday",
                "saturday",
                "sunday",
                "start_date",
                "end_date",
            ],
            Indexing::single("service_id"),
        )
        .table(
            "calendar_dates",
            &["service_id", "date", "exception_type"],
            Indexing::composite("service_id", "date"),
        )
        .table(
            "fare_attributes",
            &[
                "fare_id",
                "price",
                "currency_type",
                "payment_method",
                "transfers",
                "agency_id",
                "transfer_duration",
            ],
            Indexing::single("fare_id"),
        )
        .table(
            "fare_rules",
            &[
                "fare_id",
                "route_id",
                "origin_id",
                "destination_id",
                "contains_id",
            ],
            Indexing::UnorderedSet,
        )
        .table(
            "frequencies",
            &[
                "trip_id",
                "start_time",
                "end_time",
                "headway_secs",
                "exact_times",
            ],
            Indexing::composite("trip_id", "start_time"),
        )
        .table(
            "routes",
            &[
                "route_id",
                "agency_id",
                "route_short_name",
                "route_long_name",
                "route_desc",
                "route_type",
                "route_url",
                "route_color",
                "route_text_color",
                "route_sort_order",
            ],
            Indexing::single("route_id"),
        )
        .table(
            "stop_times",
            &[
                "trip_id",
                "arrival_time",
                "departure_time",
                "stop_id",
                "stop_sequence",
                "stop_headsign",
                "pickup_type",
                "drop_off_type",
                "shape_dist_traveled",
                "timepoint",
            ],
            Indexing::composite("trip_id", "stop_sequence"),
        )
        .table(
            "stops",
            &[
                "stop_id",
                "stop_code",
                "stop_name",
                "stop_desc",
                "stop_lat",
                "stop_lon",
                "zone_id",
                "stop_url",
                "location_type",
                "parent_station",
                "stop_timezone",
                "wheelchair_boarding",
            ],
            Indexing::single("stop_id"),
        )
        .table(
            "trips",
            &[
                "route_id",
                "service_id",
                "trip_id",
                "trip_headsign",
                "trip_short_name",
                "direction_id",
                "block_id",
                "shape_id",
                "wheelchair_accessible",
                "bikes_allowed",
            ],
            Indexing::single("trip_id"),
        )
        .table(
            "shapes",
            &[
                "shape_id",
                "shape_pt_lat",
                "shape_pt_lon",
                "shape_pt_sequence",
                "shape_dist_traveled",
            ],
            Indexing::composite("shape_id", "shape_pt_sequence"),
        )
        .table(
            "transfers",
            &[
                "from_stop_id",
                "to_stop_id",
                "transfer_type",
                "min_transfer_time",
            ],
            Indexing::composite("from_stop_id", "to_stop_id"),
        )
        .table(
            "pathways",
            &[
                "pathway_id",
                "from_stop_id",
                "to_stop_id",
                "pathway_mode",
                "is_bidirectional",
                "length",
                "traversal_time",
                "stair_count",
                "max_slope",
                "min_width",
                "signposted_as",
                "reversed_signposted_as",
            ],
            Indexing::single("pathway_id"),
        )
        .table(
            "feed_info",
            &[
                "feed_publisher_name",
                "feed_publisher_url",
                "feed_lang",
                "feed_start_date",
                "feed_end_date",
                "feed_version",
            ],
            Indexing::Singleton,
        )
        .build()
        .unwrap_or_else(|e| panic!("the default GTFS schema is inconsistent: {}", e))
}

lazy_static! {
    static ref DEFAULT_SCHEMA: Schema = default_schema();
}
