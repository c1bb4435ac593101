//! Affinity Load Balance Library
//!
//! This library provides the balancing strategies for the affinity balancer including:
//! - Bounded-load consistent hashing over a sorted hash ring
//! - Round-robin balancing
//! - Membership tracking driven by service discovery snapshots

pub mod loadbalance;

// Re-export commonly used types
pub use loadbalance::{
    build_balancer, build_static_balancer, Balancer, Consistent, ConsistentBalancer,
    ConsistentConfig, HashRing, LoadStats, LoadTracker, Membership, MembershipWatcher,
    RoundRobin, RoundRobinBalancer,
};
