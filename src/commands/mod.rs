//! Command handlers — thin wiring between CLI arguments and the gateway
//! services.

pub mod connect;
pub mod provision;
pub mod version;
