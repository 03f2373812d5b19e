use crate::{Error, Indexing, Record};
use indexmap::IndexMap;

/// Records of one table, keyed by their index value
pub type Items = IndexMap<String, Record>;

/// The in-memory form of one table, shaped after its [Indexing]
///
/// Every generic operation of [crate::Gtfs] dispatches once on this enum.
/// Iteration follows insertion order of the outer map, then of the inner one.
#[derive(Debug, Clone, PartialEq)]
pub enum Container {
    /// Records by a single key
    Flat {
        /// Index field
        key: String,
        /// Records lacking the index field are keyed by the empty string
        optional_key: bool,
        items: Items,
    },
    /// Records by a first key, then by a second one. An inner map is never empty
    Nested {
        first: String,
        second: String,
        items: IndexMap<String, Items>,
    },
    /// The one record of the table, if any
    Singleton(Option<Record>),
    /// Records without key, by content so that identical records collapse
    Unkeyed(Items),
}

impl Container {
    /// An empty container of the shape dictated by `indexing`
    pub fn empty(indexing: &Indexing) -> Self {
        match indexing {
            Indexing::SingleKey { field, optional } => Container::Flat {
                key: field.clone(),
                optional_key: *optional,
                items: IndexMap::new(),
            },
            Indexing::CompositeKey { first, second } => Container::Nested {
                first: first.clone(),
                second: second.clone(),
                items: IndexMap::new(),
            },
            Indexing::Singleton => Container::Singleton(None),
            Indexing::UnorderedSet => Container::Unkeyed(IndexMap::new()),
        }
    }

    /// Builds a container holding `records`, see [Container::insert]
    pub fn from_records<I>(indexing: &Indexing, records: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut container = Container::empty(indexing);
        for record in records {
            container.insert(record)?;
        }
        Ok(container)
    }

    pub fn indexing(&self) -> Indexing {
        match self {
            Container::Flat {
                key, optional_key, ..
            } => Indexing::SingleKey {
                field: key.clone(),
                optional: *optional_key,
            },
            Container::Nested { first, second, .. } => Indexing::composite(first, second),
            Container::Singleton(_) => Indexing::Singleton,
            Container::Unkeyed(_) => Indexing::UnorderedSet,
        }
    }

    pub fn deepness(&self) -> u8 {
        match self {
            Container::Singleton(_) | Container::Unkeyed(_) => 0,
            Container::Flat { .. } => 1,
            Container::Nested { .. } => 2,
        }
    }

    /// Checks that `record` carries the index fields, without touching the container
    pub fn check_keys(&self, record: &Record) -> Result<(), Error> {
        self.keys_of(record).map(|_| ())
    }

    fn keys_of(&self, record: &Record) -> Result<(String, Option<String>), Error> {
        let required = |field: &str| {
            record.text(field).ok_or_else(|| Error::MissingIndexKey {
                table: String::new(),
                field: field.to_owned(),
            })
        };
        match self {
            Container::Flat {
                key,
                optional_key: true,
                ..
            } => Ok((record.text(key).unwrap_or_default(), None)),
            Container::Flat { key, .. } => Ok((required(key)?, None)),
            Container::Nested { first, second, .. } => {
                Ok((required(first)?, Some(required(second)?)))
            }
            Container::Singleton(_) => Ok((String::new(), None)),
            Container::Unkeyed(_) => Ok((record.fingerprint(), None)),
        }
    }

    /// Inserts a record under its index value(s), returning the record it replaces
    ///
    /// Last write wins on duplicated keys. A singleton is replaced.
    pub fn insert(&mut self, record: Record) -> Result<Option<Record>, Error> {
        let (outer, inner) = self.keys_of(&record)?;
        Ok(match self {
            Container::Flat { items, .. } | Container::Unkeyed(items) => {
                items.insert(outer, record)
            }
            Container::Nested { items, .. } => items
                .entry(outer)
                .or_default()
                .insert(inner.unwrap_or_default(), record),
            Container::Singleton(current) => current.replace(record),
        })
    }

    /// Removes the record stored under the index value(s) of `record`
    ///
    /// Removing the last record of a group removes the group.
    pub fn remove(&mut self, record: &Record) -> Result<Option<Record>, Error> {
        let (outer, inner) = self.keys_of(record)?;
        Ok(match self {
            Container::Flat { items, .. } | Container::Unkeyed(items) => {
                items.shift_remove(&outer)
            }
            Container::Nested { items, .. } => {
                let inner = inner.unwrap_or_default();
                let removed = items.get_mut(&outer).and_then(|g| g.shift_remove(&inner));
                if items.get(&outer).is_some_and(IndexMap::is_empty) {
                    items.shift_remove(&outer);
                }
                removed
            }
            Container::Singleton(current) => current.take(),
        })
    }

    /// Record stored under a single key
    pub fn get(&self, key: &str) -> Option<&Record> {
        match self {
            Container::Flat { items, .. } => items.get(key),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Record> {
        match self {
            Container::Flat { items, .. } => items.get_mut(key),
            _ => None,
        }
    }

    /// Record stored under a composite key
    pub fn get_nested(&self, first: &str, second: &str) -> Option<&Record> {
        self.children(first).and_then(|group| group.get(second))
    }

    /// Records sharing the first key of a composite index
    pub fn children(&self, first: &str) -> Option<&Items> {
        match self {
            Container::Nested { items, .. } => items.get(first),
            _ => None,
        }
    }

    /// Every record, flattened
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Record> + '_> {
        match self {
            Container::Flat { items, .. } | Container::Unkeyed(items) => Box::new(items.values()),
            Container::Nested { items, .. } => Box::new(items.values().flat_map(|g| g.values())),
            Container::Singleton(record) => Box::new(record.iter()),
        }
    }

    /// Every record, flattened, for in-place edition. Index keys are not recomputed
    pub fn iter_mut(&mut self) -> Box<dyn Iterator<Item = &mut Record> + '_> {
        match self {
            Container::Flat { items, .. } | Container::Unkeyed(items) => {
                Box::new(items.values_mut())
            }
            Container::Nested { items, .. } => {
                Box::new(items.values_mut().flat_map(|g| g.values_mut()))
            }
            Container::Singleton(record) => Box::new(record.iter_mut()),
        }
    }

    pub(crate) fn set_optional_key(&mut self, optional: bool) {
        if let Container::Flat { optional_key, .. } = self {
            *optional_key = optional;
        }
    }

    /// Recomputes the identity of unkeyed records after an in-place edition
    pub(crate) fn refresh_identities(&mut self) {
        if let Container::Unkeyed(items) = self {
            let records = std::mem::take(items);
            *items = records
                .into_values()
                .map(|record| (record.fingerprint(), record))
                .collect();
        }
    }

    /// First record in iteration order
    pub fn sample(&self) -> Option<&Record> {
        self.iter().next()
    }

    /// Number of records, all levels included
    pub fn len(&self) -> usize {
        match self {
            Container::Flat { items, .. } | Container::Unkeyed(items) => items.len(),
            Container::Nested { items, .. } => items.values().map(IndexMap::len).sum(),
            Container::Singleton(record) => usize::from(record.is_some()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
