use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use super::provider::{Capabilities, DnsProvider};
use crate::error::{ProviderError, ZoneError};
use crate::pihole::{ApiOutcome, ApplianceClient};
use crate::zone::{Change, Plan, Record, RecordData, RecordType, Zone};

/// TTL used for everything Pi-hole cannot store a TTL for.
pub const DEFAULT_TTL: u32 = 86400;

const SUPPORTED_TYPES: &[RecordType] = &RecordType::ALL;

/// Provider that maps zones onto Pi-hole's local DNS lists.
///
/// Pi-hole has no zones: the `hosts` list holds `"<ip> <fqdn>"` entries and
/// the `cnameRecords` list holds `"<fqdn>,<target>,<ttl>"` entries. A zone is
/// the subset of entries whose name falls under the zone name.
pub struct PiholeProvider<C> {
    id: String,
    client: C,
    default_ttl: u32,
}

/// One line in one of the appliance's lists.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Host {
        name: String,
        ip: IpAddr,
    },
    Cname {
        name: String,
        target: String,
        ttl: u32,
    },
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Add,
    Remove,
}

#[derive(Debug)]
struct AliasTarget {
    target: String,
    ttl: u32,
}

/// Everything collected for one relative name while reading the lists.
#[derive(Debug, Default)]
struct NameGroup {
    v4: Vec<Ipv4Addr>,
    v6: Vec<Ipv6Addr>,
    aliases: Vec<AliasTarget>,
}

impl<C: ApplianceClient> PiholeProvider<C> {
    pub fn new(id: impl Into<String>, client: C, default_ttl: u32) -> Self {
        let id = id.into();
        debug!("PiholeProvider[{}]: default_ttl={}", id, default_ttl);
        Self {
            id,
            client,
            default_ttl,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn parse_alias_ttl(&self, raw: Option<&str>, entry: &str) -> Result<u32> {
        let ttl = match raw.map(str::trim) {
            None | Some("") => 0,
            Some(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("Invalid TTL in CNAME entry: {:?}", entry))?,
        };
        Ok(if ttl == 0 { self.default_ttl } else { ttl })
    }

    fn collect(
        &self,
        zone: &Zone,
        hosts: &[String],
        cnames: &[String],
    ) -> Result<BTreeMap<String, NameGroup>> {
        let mut groups: BTreeMap<String, NameGroup> = BTreeMap::new();

        for entry in hosts {
            // "<ip> <name> [<name> ...]"
            let mut fields = entry.split_whitespace();
            let (Some(ip), Some(first)) = (fields.next(), fields.next()) else {
                return Err(anyhow!("Malformed host entry: {:?}", entry));
            };

            let names: Vec<&str> = std::iter::once(first)
                .chain(fields)
                .filter_map(|name| zone.relative_name(name))
                .collect();
            if names.is_empty() {
                continue;
            }

            let ip: IpAddr = ip
                .parse()
                .with_context(|| format!("Invalid IP address in host entry: {:?}", entry))?;

            for name in names {
                let group = groups.entry(name.to_string()).or_default();
                match ip {
                    IpAddr::V4(ip) => group.v4.push(ip),
                    IpAddr::V6(ip) => group.v6.push(ip),
                }
            }
        }

        for entry in cnames {
            let mut fields = entry.trim().splitn(3, ',');
            let (Some(name), Some(target)) = (fields.next(), fields.next()) else {
                return Err(anyhow!("Malformed CNAME entry: {:?}", entry));
            };

            let Some(name) = zone.relative_name(name.trim()) else {
                continue;
            };

            let ttl = self.parse_alias_ttl(fields.next(), entry)?;
            groups
                .entry(name.to_string())
                .or_default()
                .aliases
                .push(AliasTarget {
                    target: target.trim().to_string(),
                    ttl,
                });
        }

        Ok(groups)
    }

    fn records_for(
        &self,
        name: &str,
        group: NameGroup,
        lenient: bool,
    ) -> Result<Vec<Record>, ZoneError> {
        let mut records = Vec::new();

        if !group.v4.is_empty() {
            records.push(Record::new(name, self.default_ttl, RecordData::A(group.v4), lenient)?);
        }
        if !group.v6.is_empty() {
            records.push(Record::new(name, self.default_ttl, RecordData::Aaaa(group.v6), lenient)?);
        }
        // Pi-hole can hold several targets for one alias; only the first is meaningful.
        if let Some(alias) = group.aliases.into_iter().next() {
            records.push(Record::new(name, alias.ttl, RecordData::Cname(alias.target), lenient)?);
        }

        Ok(records)
    }

    /// Appliance entries backing `record` in `zone`.
    fn entries(zone: &Zone, record: &Record) -> Vec<Entry> {
        let name = zone.fqdn(record.name());
        match record.data() {
            RecordData::A(ips) => ips
                .iter()
                .map(|ip| Entry::Host {
                    name: name.clone(),
                    ip: IpAddr::V4(*ip),
                })
                .collect(),
            RecordData::Aaaa(ips) => ips
                .iter()
                .map(|ip| Entry::Host {
                    name: name.clone(),
                    ip: IpAddr::V6(*ip),
                })
                .collect(),
            RecordData::Cname(target) => vec![Entry::Cname {
                name,
                target: target.clone(),
                ttl: record.ttl(),
            }],
        }
    }

    async fn send(&self, action: Action, entry: &Entry) -> Result<ApiOutcome> {
        match (action, entry) {
            (Action::Add, Entry::Host { name, ip }) => self.client.add_host(name, *ip).await,
            (Action::Remove, Entry::Host { name, ip }) => self.client.remove_host(name, *ip).await,
            (Action::Add, Entry::Cname { name, target, ttl }) => {
                self.client.add_cname(name, target, *ttl).await
            }
            (Action::Remove, Entry::Cname { name, target, ttl }) => {
                self.client.remove_cname(name, target, *ttl).await
            }
        }
    }

    async fn apply_record(
        &self,
        zone: &Zone,
        action: Action,
        record: &Record,
    ) -> Result<(), ProviderError> {
        for entry in Self::entries(zone, record) {
            debug!("apply: {:?} {:?}", action, entry);
            if let ApiOutcome::Failure(message) = self.send(action, &entry).await? {
                return Err(ProviderError::ChangeFailed {
                    name: record.name().to_string(),
                    message,
                });
            }
        }
        Ok(())
    }

    async fn apply_change(&self, zone: &Zone, change: &Change) -> Result<(), ProviderError> {
        match change {
            Change::Create(new) => self.apply_record(zone, Action::Add, new).await,
            Change::Delete(existing) => self.apply_record(zone, Action::Remove, existing).await,
            // No update primitive: a failed create leaves the record removed.
            Change::Update { existing, new } => {
                self.apply_record(zone, Action::Remove, existing).await?;
                self.apply_record(zone, Action::Add, new).await
            }
        }
    }
}

#[async_trait]
impl<C: ApplianceClient> DnsProvider for PiholeProvider<C> {
    fn id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            record_types: SUPPORTED_TYPES,
            geo: false,
            dynamic: false,
            root_ns: false,
        }
    }

    async fn populate(&self, zone: &mut Zone, target: bool, lenient: bool) -> Result<bool> {
        debug!(
            "populate: name={}, target={}, lenient={}",
            zone.name(),
            target,
            lenient
        );

        let config = self.client.get_config().await?;
        let groups = self.collect(zone, &config.hosts, &config.cname_records)?;

        let before = zone.len();
        let exists = !groups.is_empty();
        for (name, group) in groups {
            for record in self.records_for(&name, group, lenient)? {
                zone.add_record(record, false, lenient)?;
            }
        }

        info!(
            "populate: found {} records, exists={}",
            zone.len() - before,
            exists
        );
        Ok(exists)
    }

    fn process_desired_zone(&self, mut desired: Zone) -> Result<Zone, ZoneError> {
        let records: Vec<Record> = desired
            .records()
            .filter(|record| record.record_type() != RecordType::Cname)
            .cloned()
            .collect();

        for mut record in records {
            record.set_ttl(self.default_ttl);
            desired.add_record(record, true, true)?;
        }

        Ok(desired)
    }

    async fn apply(&self, plan: &Plan) -> Result<(), ProviderError> {
        let zone = plan.desired();
        debug!(
            "apply: zone={}, len(changes)={}",
            zone.name(),
            plan.changes().len()
        );

        for change in plan.changes() {
            self.apply_change(zone, change).await?;
        }

        info!("apply: sent {} changes to Pi-hole", plan.changes().len());
        Ok(())
    }
}
