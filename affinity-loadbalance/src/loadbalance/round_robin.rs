use super::traits::Membership;
use affinity_core::{BalanceError, EndpointRef};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// 轮询后端池，忽略亲和键
pub struct RoundRobin {
    name: String,
    endpoints: RwLock<Vec<EndpointRef>>,
    round_robin_counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoints: RwLock::new(Vec::new()),
            round_robin_counter: AtomicUsize::new(0),
        }
    }

    pub fn get(&self) -> Result<EndpointRef, BalanceError> {
        let endpoints = self.endpoints.read();
        if endpoints.is_empty() {
            return Err(BalanceError::NoEndpoints);
        }
        let index = self.round_robin_counter.fetch_add(1, Ordering::Relaxed) % endpoints.len();
        Ok(endpoints[index].clone())
    }

    pub fn len(&self) -> usize {
        self.endpoints.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.read().is_empty()
    }
}

impl Membership for RoundRobin {
    fn add_endpoints(&self, additions: &[EndpointRef]) {
        let mut endpoints = self.endpoints.write();
        for endpoint in additions {
            if endpoints.iter().any(|e| e.key() == endpoint.key()) {
                continue;
            }
            endpoints.push(endpoint.clone());
            debug!("[{}] added endpoint {}", self.name, endpoint);
        }
    }

    fn remove_endpoints(&self, removals: &[EndpointRef]) {
        let mut endpoints = self.endpoints.write();
        endpoints.retain(|e| !removals.iter().any(|r| r.key() == e.key()));
        debug!("[{}] {} endpoints after removal", self.name, endpoints.len());
    }
}
