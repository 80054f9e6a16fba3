mod api;
mod client;

pub use api::{ApiOutcome, ApplianceClient, DnsConfig};
pub use client::PiholeClient;
