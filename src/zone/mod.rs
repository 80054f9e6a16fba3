mod plan;
mod record;

pub use plan::{Change, Plan};
pub use record::{Record, RecordData, RecordType};

use std::collections::BTreeMap;

use tracing::warn;

use crate::error::ZoneError;

/// A DNS zone and its records, keyed by `(name, type)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    name: String,
    records: BTreeMap<(String, RecordType), Record>,
}

impl Zone {
    pub fn new(name: impl Into<String>) -> Result<Self, ZoneError> {
        let name = name.into();
        if !name.ends_with('.') || name.len() < 2 {
            return Err(ZoneError::InvalidZoneName(name));
        }

        Ok(Self {
            name,
            records: BTreeMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn get(&self, name: &str, record_type: RecordType) -> Option<&Record> {
        self.records.get(&(name.to_string(), record_type))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert a record. An existing record with the same identity is only
    /// overwritten when `replace` is set.
    pub fn add_record(
        &mut self,
        record: Record,
        replace: bool,
        lenient: bool,
    ) -> Result<(), ZoneError> {
        let key = record.key();

        if !replace && self.records.contains_key(&key) {
            return Err(ZoneError::DuplicateRecord {
                name: key.0,
                record_type: key.1,
            });
        }

        let conflicts = self.records.keys().any(|(name, record_type)| {
            name == &key.0
                && *record_type != key.1
                && (key.1 == RecordType::Cname || *record_type == RecordType::Cname)
        });
        if conflicts {
            if !lenient {
                return Err(ZoneError::CnameCoexistence { name: key.0 });
            }
            warn!("CNAME {:?} coexists with other records in {}", key.0, self.name);
        }

        self.records.insert(key, record);
        Ok(())
    }

    /// Fully qualified name for a record name in this zone.
    pub fn fqdn(&self, name: &str) -> String {
        if name.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", name, self.name)
        }
    }

    /// Name relative to this zone, or `None` if `fqdn` lies outside it.
    /// Matching is anchored at the end of the name, so `nottest.com.` is not
    /// part of `test.com.`.
    pub fn relative_name<'a>(&self, fqdn: &'a str) -> Option<&'a str> {
        if fqdn == self.name {
            return Some("");
        }

        fqdn.strip_suffix(self.name.as_str())
            .and_then(|prefix| prefix.strip_suffix('.'))
            .filter(|prefix| !prefix.is_empty())
    }
}
