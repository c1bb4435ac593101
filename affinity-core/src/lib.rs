//! Affinity Core Library
//!
//! This library provides core functionality for the affinity balancer including:
//! - Configuration management
//! - The endpoint capability shared by every balancing strategy
//! - The service discovery boundary (snapshots and instancers)
//! - Shared error types

pub mod config;
pub mod discovery;
pub mod endpoint;
pub mod error;

// Re-export commonly used types
pub use config::model::{Config, GlobalSettings, LoadBalanceStrategy, ServiceConfig};
pub use discovery::{
    DiscoveryError, DiscoveryEvent, FixedInstancer, Instancer, RegistrationId, SnapshotPublisher,
};
pub use endpoint::{AddressEndpoint, Endpoint, EndpointRef};
pub use error::BalanceError;
