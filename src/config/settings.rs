use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::dns::DEFAULT_TTL;
use crate::zone::{Record, RecordData, RecordType, Zone};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub general: GeneralConfig,
    pub pihole: PiholeConfig,
    #[serde(default)]
    pub zones: Vec<ZoneConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub lenient: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiholeConfig {
    #[serde(default = "default_id")]
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_ttl")]
    pub default_ttl: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub name: String,
    #[serde(default)]
    pub records: Vec<RecordConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordConfig {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_id() -> String {
    "pihole".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            lenient: false,
        }
    }
}

impl Settings {
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        Ok(settings)
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn config_dir() -> PathBuf {
        #[cfg(unix)]
        {
            PathBuf::from("/etc/piholedns")
        }
        #[cfg(windows)]
        {
            PathBuf::from(r"C:\ProgramData\piholedns")
        }
    }
}

impl ZoneConfig {
    /// Build the desired zone. Records without a TTL get `default_ttl`.
    pub fn to_zone(&self, default_ttl: u32, lenient: bool) -> Result<Zone> {
        let mut zone = Zone::new(self.name.clone())?;

        for record in &self.records {
            let values: Vec<&str> = record
                .value
                .iter()
                .chain(record.values.iter())
                .map(String::as_str)
                .collect();

            let data = RecordData::parse(record.record_type, values.as_slice()).with_context(|| {
                format!(
                    "Invalid {} record {:?} in zone {}",
                    record.record_type, record.name, self.name
                )
            })?;

            let record = Record::new(
                record.name.clone(),
                record.ttl.unwrap_or(default_ttl),
                data,
                lenient,
            )
            .with_context(|| format!("Invalid record in zone {}", self.name))?;

            zone.add_record(record, false, lenient)
                .with_context(|| format!("Invalid record in zone {}", self.name))?;
        }

        Ok(zone)
    }
}

impl From<&Record> for RecordConfig {
    fn from(record: &Record) -> Self {
        let mut values = record.data().values();
        let value = match record.data() {
            RecordData::Cname(_) => values.pop(),
            _ => None,
        };

        Self {
            name: record.name().to_string(),
            record_type: record.record_type(),
            ttl: Some(record.ttl()),
            value,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[general]
log_level = "debug"

[pihole]
url = "http://pi.hole"
password = "hunter2"

[[zones]]
name = "home.lan."

[[zones.records]]
name = "nas"
type = "A"
values = ["192.168.1.10", "192.168.1.11"]

[[zones.records]]
name = "files"
type = "CNAME"
value = "nas.home.lan."
ttl = 300

[[zones.records]]
type = "AAAA"
value = "fd00::1"
"#;

    #[test]
    fn test_parse_config() {
        let settings: Settings = toml::from_str(CONFIG).unwrap();
        assert_eq!(settings.general.log_level, "debug");
        assert!(!settings.general.lenient);
        assert_eq!(settings.pihole.id, "pihole");
        assert_eq!(settings.pihole.url, "http://pi.hole");
        assert_eq!(settings.pihole.password.as_deref(), Some("hunter2"));
        assert_eq!(settings.pihole.timeout_seconds, 30);
        assert_eq!(settings.pihole.default_ttl, 86400);
        assert_eq!(settings.zones.len(), 1);
        assert_eq!(settings.zones[0].records.len(), 3);
        assert_eq!(settings.zones[0].records[1].record_type, RecordType::Cname);
    }

    #[test]
    fn test_zone_from_config() {
        let settings: Settings = toml::from_str(CONFIG).unwrap();
        let zone = settings.zones[0].to_zone(settings.pihole.default_ttl, false).unwrap();

        assert_eq!(zone.name(), "home.lan.");
        assert_eq!(zone.len(), 3);
        let nas = zone.get("nas", RecordType::A).unwrap();
        assert_eq!(nas.ttl(), 86400);
        assert_eq!(nas.data().values(), vec!["192.168.1.10", "192.168.1.11"]);
        assert_eq!(zone.get("files", RecordType::Cname).unwrap().ttl(), 300);
        assert!(zone.get("", RecordType::Aaaa).is_some());
    }

    #[test]
    fn test_zone_from_config_rejects_bad_address() {
        let zone = ZoneConfig {
            name: "home.lan.".to_string(),
            records: vec![RecordConfig {
                name: "nas".to_string(),
                record_type: RecordType::A,
                ttl: None,
                value: Some("fd00::1".to_string()),
                values: vec![],
            }],
        };
        assert!(zone.to_zone(86400, false).is_err());
    }

    #[test]
    fn test_password_is_never_serialized() {
        let settings: Settings = toml::from_str(CONFIG).unwrap();
        let rendered = toml::to_string_pretty(&settings).unwrap();
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_record_config_from_record() {
        let record = Record::new(
            "files",
            300,
            RecordData::Cname("nas.home.lan.".to_string()),
            false,
        )
        .unwrap();
        let config = RecordConfig::from(&record);
        assert_eq!(config.value.as_deref(), Some("nas.home.lan."));
        assert!(config.values.is_empty());
        assert_eq!(config.ttl, Some(300));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, CONFIG).unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.zones[0].name, "home.lan.");

        assert!(Settings::load_from(&dir.path().join("missing.toml")).is_err());
    }
}
