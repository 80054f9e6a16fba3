pub mod config;
pub mod dns;
pub mod error;
pub mod pihole;
pub mod secrets;
pub mod sync;
pub mod zone;
