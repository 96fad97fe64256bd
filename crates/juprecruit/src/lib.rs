pub mod config;
pub mod error;
pub mod integrations;
pub mod recruitment;
pub mod telemetry;
