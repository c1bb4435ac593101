use super::hash::{default_hash_fn, HashFn};
use super::load::LoadTracker;
use super::ring::HashRing;
use super::traits::Membership;
use affinity_core::{BalanceError, EndpointRef};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// 一致性哈希配置
#[derive(Clone)]
pub struct ConsistentConfig {
    /// 服务名称，用于日志
    pub name: String,
    /// 负载因子，单个后端最多承担平均负载的多少倍
    pub load_factor: f64,
    hash_fn: HashFn,
}

impl ConsistentConfig {
    pub fn new(name: impl Into<String>, load_factor: f64) -> Self {
        Self {
            name: name.into(),
            load_factor,
            hash_fn: default_hash_fn(),
        }
    }

    /// 替换哈希函数（测试中用于得到确定的环布局）
    pub fn with_hash_fn<F>(mut self, hash_fn: F) -> Self
    where
        F: Fn(&[u8]) -> u32 + Send + Sync + 'static,
    {
        self.hash_fn = Arc::new(hash_fn);
        self
    }

    pub fn validate(&self) -> Result<(), BalanceError> {
        if !self.load_factor.is_finite() || self.load_factor < 1.0 {
            return Err(BalanceError::InvalidLoadFactor(self.load_factor));
        }
        Ok(())
    }
}

struct State {
    ring: HashRing,
    loads: LoadTracker,
}

impl State {
    /// 从 `start` 开始找第一个负载低于上限的后端
    ///
    /// 整圈都已满载时退回起点候选，第二个返回值标记这种情况
    fn choose(&self, start: usize, capacity: u64) -> Option<(EndpointRef, bool)> {
        let spare = self
            .ring
            .walk(start)
            .map(|(_, endpoint)| endpoint)
            .find(|endpoint| self.loads.load(endpoint.key()).unwrap_or(0) < capacity);

        match spare {
            Some(endpoint) => Some((endpoint.clone(), false)),
            None => self.ring.get(start).map(|endpoint| (endpoint.clone(), true)),
        }
    }
}

/// 有界负载一致性哈希
///
/// 亲和键先映射到环上的后继位置，再顺时针寻找第一个负载未超过
/// `ceil(load_factor * (total + 1) / endpoints)` 的后端。
/// 环、负载表和总负载由同一把锁保护，Get/Put/Add/Remove互斥执行。
pub struct Consistent {
    name: String,
    load_factor: f64,
    state: Mutex<State>,
}

impl Consistent {
    pub fn new(config: ConsistentConfig) -> Result<Self, BalanceError> {
        config.validate()?;

        Ok(Self {
            name: config.name,
            load_factor: config.load_factor,
            state: Mutex::new(State {
                ring: HashRing::new(config.hash_fn),
                loads: LoadTracker::new(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }

    /// 为亲和键选择后端，并将其负载加1
    pub fn get(&self, key: &str) -> Result<EndpointRef, BalanceError> {
        let mut state = self.state.lock();

        let hash = state.ring.hash(key.as_bytes());
        let start = state.ring.successor(hash).ok_or(BalanceError::NoEndpoints)?;
        let capacity = state.loads.capacity(self.load_factor, state.ring.len());

        let (endpoint, exhausted) = state
            .choose(start, capacity)
            .ok_or(BalanceError::NoEndpoints)?;

        if exhausted {
            warn!(
                "[{}] no endpoint below capacity {} for key '{}', falling back to {}",
                self.name, capacity, key, endpoint
            );
        }

        state.loads.increment(endpoint.key());
        trace!(
            "[{}] key '{}' -> {} (capacity {}, total load {})",
            self.name,
            key,
            endpoint,
            capacity,
            state.loads.total()
        );
        Ok(endpoint)
    }

    /// 归还后端，负载减1
    ///
    /// 后端已被移除（调用方持有期间发生了成员变更）时什么也不做
    pub fn put(&self, endpoint: &EndpointRef) {
        let mut state = self.state.lock();
        if !state.loads.decrement(endpoint.key()) {
            trace!(
                "[{}] ignoring put for {}: not tracked or no load",
                self.name,
                endpoint
            );
        }
    }

    pub fn num_endpoints(&self) -> usize {
        self.state.lock().ring.len()
    }

    pub fn total_load(&self) -> u64 {
        self.state.lock().loads.total()
    }

    pub fn load_of(&self, key: &str) -> Option<u64> {
        self.state.lock().loads.load(key)
    }

    /// 按环顺序列出后端身份
    pub fn endpoint_keys(&self) -> Vec<String> {
        self.state
            .lock()
            .ring
            .iter()
            .map(|(_, endpoint)| endpoint.key().to_string())
            .collect()
    }

    /// 当前负载快照
    pub fn stats(&self) -> LoadStats {
        let state = self.state.lock();
        LoadStats {
            name: self.name.clone(),
            load_factor: self.load_factor,
            total_load: state.loads.total(),
            num_endpoints: state.ring.len(),
            capacity: state.loads.capacity(self.load_factor, state.ring.len()),
            endpoints: state
                .ring
                .iter()
                .map(|(hash, endpoint)| EndpointLoad {
                    key: endpoint.key().to_string(),
                    address: endpoint.host_and_port().to_string(),
                    hash,
                    load: state.loads.load(endpoint.key()).unwrap_or(0),
                })
                .collect(),
        }
    }

    /// 校验内部不变量，返回第一个被破坏的条件
    #[cfg(test)]
    pub(crate) fn verify_invariants(&self) -> Result<(), String> {
        let state = self.state.lock();

        let positions: Vec<(u32, &str)> = state
            .ring
            .iter()
            .map(|(hash, endpoint)| (hash, endpoint.key()))
            .collect();
        if positions.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(format!("ring not strictly sorted: {:?}", positions));
        }

        if state.ring.len() != state.loads.len() {
            return Err(format!(
                "ring has {} entries but load map has {}",
                state.ring.len(),
                state.loads.len()
            ));
        }

        for (_, key) in &positions {
            if state.loads.load(key).is_none() {
                return Err(format!("ring endpoint {} has no load entry", key));
            }
        }

        let sum: u64 = state.loads.iter().map(|(_, load)| load).sum();
        if sum != state.loads.total() {
            return Err(format!(
                "total load {} differs from sum {}",
                state.loads.total(),
                sum
            ));
        }

        Ok(())
    }
}

impl Membership for Consistent {
    fn add_endpoints(&self, endpoints: &[EndpointRef]) {
        let mut state = self.state.lock();
        for endpoint in endpoints {
            if !state.loads.track(endpoint.key()) {
                trace!("[{}] {} already present", self.name, endpoint);
                continue;
            }
            state.ring.insert(endpoint.clone());
            debug!("[{}] added endpoint {}", self.name, endpoint);
        }
    }

    fn remove_endpoints(&self, endpoints: &[EndpointRef]) {
        let mut state = self.state.lock();
        for endpoint in endpoints {
            let Some(load) = state.loads.untrack(endpoint.key()) else {
                continue;
            };
            state.ring.remove(endpoint.key());
            debug!(
                "[{}] removed endpoint {} (discarded load {})",
                self.name, endpoint, load
            );
        }
    }
}

/// 负载快照
#[derive(Debug, Clone, Serialize)]
pub struct LoadStats {
    pub name: String,
    pub load_factor: f64,
    pub total_load: u64,
    pub num_endpoints: usize,
    /// 下一次选择时的单后端负载上限
    pub capacity: u64,
    /// 按环顺序排列
    pub endpoints: Vec<EndpointLoad>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointLoad {
    pub key: String,
    pub address: String,
    pub hash: u32,
    pub load: u64,
}

impl LoadStats {
    /// 最大负载与平均负载之比
    pub fn peak_to_average(&self) -> f64 {
        if self.num_endpoints == 0 || self.total_load == 0 {
            return 0.0;
        }
        let average = self.total_load as f64 / self.num_endpoints as f64;
        let peak = self.endpoints.iter().map(|e| e.load).max().unwrap_or(0);
        peak as f64 / average
    }
}
