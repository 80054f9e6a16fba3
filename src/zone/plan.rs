use std::fmt;

use super::{Record, Zone};

/// A single difference between the current and desired state of a zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Create(Record),
    Update { existing: Record, new: Record },
    Delete(Record),
}

impl Change {
    /// The record the change is about: the new one, or the one being removed.
    pub fn record(&self) -> &Record {
        match self {
            Change::Create(new) | Change::Update { new, .. } => new,
            Change::Delete(existing) => existing,
        }
    }

    fn order(&self) -> u8 {
        match self {
            Change::Delete(_) => 0,
            Change::Create(_) => 1,
            Change::Update { .. } => 2,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Create(new) => write!(
                f,
                "Create {} {:?} ttl={} [{}]",
                new.record_type(),
                new.name(),
                new.ttl(),
                new.data().values().join(", ")
            ),
            Change::Update { existing, new } => write!(
                f,
                "Update {} {:?} ttl={} [{}] -> ttl={} [{}]",
                new.record_type(),
                new.name(),
                existing.ttl(),
                existing.data().values().join(", "),
                new.ttl(),
                new.data().values().join(", ")
            ),
            Change::Delete(existing) => write!(
                f,
                "Delete {} {:?} [{}]",
                existing.record_type(),
                existing.name(),
                existing.data().values().join(", ")
            ),
        }
    }
}

/// Ordered changes that bring a zone from its current to its desired state.
#[derive(Debug, Clone)]
pub struct Plan {
    desired: Zone,
    changes: Vec<Change>,
}

impl Plan {
    pub fn new(desired: Zone, changes: Vec<Change>) -> Self {
        Self { desired, changes }
    }

    /// Diff `existing` against `desired`. Deletes come first, then creates,
    /// then updates, each group ordered by record identity.
    pub fn compute(existing: &Zone, desired: &Zone) -> Self {
        let mut changes = Vec::new();

        for record in existing.records() {
            if desired.get(record.name(), record.record_type()).is_none() {
                changes.push(Change::Delete(record.clone()));
            }
        }

        for record in desired.records() {
            match existing.get(record.name(), record.record_type()) {
                None => changes.push(Change::Create(record.clone())),
                Some(current) if current != record => changes.push(Change::Update {
                    existing: current.clone(),
                    new: record.clone(),
                }),
                Some(_) => {}
            }
        }

        changes.sort_by_key(|change| (change.order(), change.record().key()));

        Self::new(desired.clone(), changes)
    }

    pub fn desired(&self) -> &Zone {
        &self.desired
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
