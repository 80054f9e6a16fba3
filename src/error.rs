use thiserror::Error;

use crate::zone::RecordType;

/// Errors raised while building zones and records.
#[derive(Debug, Error)]
pub enum ZoneError {
    #[error("invalid zone name {0:?}: must be fully qualified (end with '.')")]
    InvalidZoneName(String),

    #[error("invalid record {name:?}: {}", .reasons.join("; "))]
    InvalidRecord { name: String, reasons: Vec<String> },

    #[error("duplicate {record_type} record {name:?}")]
    DuplicateRecord { name: String, record_type: RecordType },

    #[error("CNAME {name:?} cannot coexist with other records")]
    CnameCoexistence { name: String },
}

/// Errors raised while applying a plan against the appliance.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The appliance rejected a mutation for this record.
    #[error("failed to apply change for record {name:?}: {message}")]
    ChangeFailed { name: String, message: String },

    /// Transport or decoding fault talking to the appliance.
    #[error(transparent)]
    Client(#[from] anyhow::Error),
}
