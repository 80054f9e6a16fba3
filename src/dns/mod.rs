mod pihole;
mod provider;

pub use pihole::{PiholeProvider, DEFAULT_TTL};
pub use provider::{Capabilities, DnsProvider};

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::PiholeConfig;
use crate::pihole::PiholeClient;

/// Connect to the configured Pi-hole and wrap it in a provider.
pub async fn create_provider(
    config: &PiholeConfig,
    password: &str,
) -> Result<Arc<PiholeProvider<PiholeClient>>> {
    let client = PiholeClient::connect(
        &config.url,
        password,
        Duration::from_secs(config.timeout_seconds),
    )
    .await?;

    Ok(Arc::new(PiholeProvider::new(
        config.id.clone(),
        client,
        config.default_ttl,
    )))
}
