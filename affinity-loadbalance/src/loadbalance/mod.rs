pub mod consistent;
pub mod hash;
pub mod load;
pub mod ring;
pub mod round_robin;
pub mod service;
pub mod traits;
pub mod watcher;

#[cfg(test)]
mod consistent_tests;

pub use consistent::{Consistent, ConsistentConfig, EndpointLoad, LoadStats};
pub use hash::{default_hash, HashFn};
pub use load::LoadTracker;
pub use ring::{HashRing, RingWalk};
pub use round_robin::RoundRobin;
pub use service::{build_balancer, build_static_balancer, ConsistentBalancer, RoundRobinBalancer};
pub use traits::{Balancer, Membership};
pub use watcher::{MembershipCache, MembershipChange, MembershipWatcher};
