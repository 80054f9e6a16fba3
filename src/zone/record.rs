use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ZoneError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordType {
    #[serde(rename = "A")]
    A,
    #[serde(rename = "AAAA")]
    Aaaa,
    #[serde(rename = "CNAME")]
    Cname,
}

impl RecordType {
    pub const ALL: [RecordType; 3] = [RecordType::A, RecordType::Aaaa, RecordType::Cname];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            "CNAME" => Ok(RecordType::Cname),
            _ => Err(anyhow!("Unsupported record type: {}", s)),
        }
    }
}

/// Typed record payload. Address lists are kept sorted and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(Vec<Ipv4Addr>),
    Aaaa(Vec<Ipv6Addr>),
    Cname(String),
}

impl RecordData {
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordData::A(_) => RecordType::A,
            RecordData::Aaaa(_) => RecordType::Aaaa,
            RecordData::Cname(_) => RecordType::Cname,
        }
    }

    /// Parse textual values into data of the given type.
    pub fn parse<S: AsRef<str>>(record_type: RecordType, values: &[S]) -> Result<Self> {
        match record_type {
            RecordType::A => values
                .iter()
                .map(|v| {
                    v.as_ref()
                        .parse::<Ipv4Addr>()
                        .with_context(|| format!("Invalid IPv4 address: {}", v.as_ref()))
                })
                .collect::<Result<Vec<_>>>()
                .map(RecordData::A),
            RecordType::Aaaa => values
                .iter()
                .map(|v| {
                    v.as_ref()
                        .parse::<Ipv6Addr>()
                        .with_context(|| format!("Invalid IPv6 address: {}", v.as_ref()))
                })
                .collect::<Result<Vec<_>>>()
                .map(RecordData::Aaaa),
            RecordType::Cname => match values {
                [value] => Ok(RecordData::Cname(value.as_ref().to_string())),
                [] => Ok(RecordData::Cname(String::new())),
                _ => Err(anyhow!("CNAME records take a single value, got {}", values.len())),
            },
        }
    }

    /// Values rendered as strings, in stored order.
    pub fn values(&self) -> Vec<String> {
        match self {
            RecordData::A(ips) => ips.iter().map(|ip| ip.to_string()).collect(),
            RecordData::Aaaa(ips) => ips.iter().map(|ip| ip.to_string()).collect(),
            RecordData::Cname(target) => vec![target.clone()],
        }
    }

    fn normalize(&mut self) {
        match self {
            RecordData::A(ips) => {
                ips.sort();
                ips.dedup();
            }
            RecordData::Aaaa(ips) => {
                ips.sort();
                ips.dedup();
            }
            RecordData::Cname(_) => {}
        }
    }

    fn problems(&self, name: &str) -> Vec<String> {
        let mut reasons = Vec::new();
        match self {
            RecordData::A(ips) if ips.is_empty() => reasons.push("missing value(s)".to_string()),
            RecordData::Aaaa(ips) if ips.is_empty() => {
                reasons.push("missing value(s)".to_string())
            }
            RecordData::Cname(target) => {
                if target.is_empty() {
                    reasons.push("missing value".to_string());
                } else if !target.ends_with('.') {
                    reasons.push(format!("CNAME value {:?} missing trailing \".\"", target));
                }
                if name.is_empty() {
                    reasons.push("root CNAME not allowed".to_string());
                }
            }
            _ => {}
        }
        reasons
    }
}

/// A DNS record relative to its zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    name: String,
    ttl: u32,
    data: RecordData,
}

impl Record {
    /// Build a validated record. With `lenient`, validation problems are
    /// logged and the record is accepted anyway.
    pub fn new(
        name: impl Into<String>,
        ttl: u32,
        mut data: RecordData,
        lenient: bool,
    ) -> Result<Self, ZoneError> {
        let name = name.into();
        data.normalize();

        let mut reasons = Vec::new();
        if name.ends_with('.') {
            reasons.push(format!("name {:?} must be relative to the zone", name));
        }
        if name.chars().any(char::is_whitespace) {
            reasons.push(format!("name {:?} contains whitespace", name));
        }
        reasons.extend(data.problems(&name));

        if !reasons.is_empty() {
            if !lenient {
                return Err(ZoneError::InvalidRecord { name, reasons });
            }
            warn!("Accepting invalid record {:?}: {}", name, reasons.join("; "));
        }

        Ok(Self { name, ttl, data })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn set_ttl(&mut self, ttl: u32) {
        self.ttl = ttl;
    }

    pub fn data(&self) -> &RecordData {
        &self.data
    }

    pub fn record_type(&self) -> RecordType {
        self.data.record_type()
    }

    /// Identity within a zone.
    pub fn key(&self) -> (String, RecordType) {
        (self.name.clone(), self.record_type())
    }
}
