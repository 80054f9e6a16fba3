use std::net::IpAddr;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Local DNS section of the Pi-hole configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsConfig {
    /// `"<ip> <name>"` entries.
    #[serde(default)]
    pub hosts: Vec<String>,
    /// `"<name>,<target>[,<ttl>]"` entries.
    #[serde(default, rename = "cnameRecords")]
    pub cname_records: Vec<String>,
}

/// Outcome of a single mutating API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiOutcome {
    Success,
    Failure(String),
}

impl ApiOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiOutcome::Success)
    }
}

#[async_trait]
pub trait ApplianceClient: Send + Sync {
    /// Fetch the full local DNS configuration
    async fn get_config(&self) -> Result<DnsConfig>;

    /// Add a static host entry
    async fn add_host(&self, name: &str, ip: IpAddr) -> Result<ApiOutcome>;

    /// Remove a static host entry
    async fn remove_host(&self, name: &str, ip: IpAddr) -> Result<ApiOutcome>;

    /// Add a CNAME entry
    async fn add_cname(&self, name: &str, target: &str, ttl: u32) -> Result<ApiOutcome>;

    /// Remove a CNAME entry
    async fn remove_cname(&self, name: &str, target: &str, ttl: u32) -> Result<ApiOutcome>;
}
