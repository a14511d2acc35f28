pub mod agents;
pub mod config;
pub mod engine;
pub mod issuer;
pub mod leases;
pub mod types;

pub use config::Config;
pub use types::*;
