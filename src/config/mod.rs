mod settings;

pub use settings::{GeneralConfig, PiholeConfig, RecordConfig, Settings, ZoneConfig};
