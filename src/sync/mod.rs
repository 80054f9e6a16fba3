use anyhow::{Context, Result};
use tracing::info;

use crate::config::Settings;
use crate::dns::DnsProvider;
use crate::zone::{Plan, Zone};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub zones: usize,
    pub zones_changed: usize,
    pub changes: usize,
}

/// Compute the plan for one zone: desired state from config, current state
/// from the provider.
pub async fn plan_zone(
    provider: &dyn DnsProvider,
    desired: Zone,
    lenient: bool,
) -> Result<Plan> {
    let desired = provider
        .process_desired_zone(desired)
        .context("Failed to process desired zone")?;

    let mut current = Zone::new(desired.name())?;
    provider
        .populate(&mut current, true, lenient)
        .await
        .with_context(|| {
            format!("Failed to read zone {} from {}", desired.name(), provider.id())
        })?;

    Ok(Plan::compute(&current, &desired))
}

/// Reconcile every configured zone. The first failure aborts the run.
pub async fn run(
    settings: &Settings,
    provider: &dyn DnsProvider,
    dry_run: bool,
) -> Result<SyncSummary> {
    let lenient = settings.general.lenient;
    let mut summary = SyncSummary::default();

    info!(
        "Syncing {} zones to {}{}",
        settings.zones.len(),
        provider.id(),
        if dry_run { " (dry run)" } else { "" }
    );

    for zone_config in &settings.zones {
        summary.zones += 1;

        let desired = zone_config.to_zone(settings.pihole.default_ttl, lenient)?;
        let plan = plan_zone(provider, desired, lenient).await?;

        if plan.is_empty() {
            info!("Zone {} is in sync", zone_config.name);
            continue;
        }

        for change in plan.changes() {
            info!("{}: {}", zone_config.name, change);
        }

        summary.zones_changed += 1;
        if dry_run {
            info!(
                "Zone {}: {} changes not applied (dry run)",
                zone_config.name,
                plan.changes().len()
            );
            continue;
        }

        provider
            .apply(&plan)
            .await
            .with_context(|| format!("Failed to apply changes to zone {}", zone_config.name))?;
        summary.changes += plan.changes().len();
    }

    Ok(summary)
}
