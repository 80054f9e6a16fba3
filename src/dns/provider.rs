use anyhow::Result;
use async_trait::async_trait;

use crate::error::{ProviderError, ZoneError};
use crate::zone::{Plan, RecordType, Zone};

/// Static feature flags of a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub record_types: &'static [RecordType],
    pub geo: bool,
    pub dynamic: bool,
    pub root_ns: bool,
}

#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Get the provider instance id
    fn id(&self) -> &str;

    /// Get the provider's feature flags
    fn capabilities(&self) -> Capabilities;

    fn supports(&self, record_type: RecordType) -> bool {
        self.capabilities().record_types.contains(&record_type)
    }

    /// Fill `zone` with the records the provider currently serves for it.
    /// Returns whether any records were found.
    async fn populate(&self, zone: &mut Zone, target: bool, lenient: bool) -> Result<bool>;

    /// Adjust desired state before it is diffed against `populate` output
    fn process_desired_zone(&self, desired: Zone) -> Result<Zone, ZoneError> {
        Ok(desired)
    }

    /// Apply a computed plan, stopping at the first failure
    async fn apply(&self, plan: &Plan) -> Result<(), ProviderError>;
}
