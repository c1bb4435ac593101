use super::consistent::{Consistent, ConsistentConfig, LoadStats};
use super::round_robin::RoundRobin;
use super::traits::Balancer;
use super::watcher::MembershipWatcher;
use affinity_core::{
    BalanceError, EndpointRef, FixedInstancer, GlobalSettings, Instancer, LoadBalanceStrategy,
    ServiceConfig,
};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// 有界负载一致性哈希负载均衡器
///
/// 关闭后 `get` 返回 `BalanceError::Closed`，`put` 不做任何事
pub struct ConsistentBalancer {
    consistent: Arc<Consistent>,
    watcher: MembershipWatcher,
}

impl ConsistentBalancer {
    /// 需要在tokio运行时内调用
    pub fn new(
        config: ConsistentConfig,
        instancer: Arc<dyn Instancer>,
        queue_capacity: usize,
    ) -> Result<Self, BalanceError> {
        let consistent = Arc::new(Consistent::new(config)?);
        let watcher = MembershipWatcher::spawn(
            consistent.name(),
            instancer,
            consistent.clone(),
            queue_capacity,
        );

        Ok(Self {
            consistent,
            watcher,
        })
    }

    pub fn consistent(&self) -> &Arc<Consistent> {
        &self.consistent
    }

    pub fn watcher(&self) -> &MembershipWatcher {
        &self.watcher
    }
}

#[async_trait]
impl Balancer for ConsistentBalancer {
    fn get(&self, key: &str) -> Result<EndpointRef, BalanceError> {
        if self.watcher.is_closed() {
            return Err(BalanceError::Closed);
        }
        self.consistent.get(key)
    }

    fn put(&self, endpoint: &EndpointRef) {
        if !self.watcher.is_closed() {
            self.consistent.put(endpoint);
        }
    }

    async fn close(&self) {
        self.watcher.close().await;
    }

    async fn synced(&self) {
        self.watcher.wait_for_updates(1).await;
    }

    fn load_stats(&self) -> Option<LoadStats> {
        Some(self.consistent.stats())
    }
}

/// 轮询负载均衡器
pub struct RoundRobinBalancer {
    pool: Arc<RoundRobin>,
    watcher: MembershipWatcher,
}

impl RoundRobinBalancer {
    /// 需要在tokio运行时内调用
    pub fn new(name: &str, instancer: Arc<dyn Instancer>, queue_capacity: usize) -> Self {
        let pool = Arc::new(RoundRobin::new(name));
        let watcher = MembershipWatcher::spawn(name, instancer, pool.clone(), queue_capacity);
        Self { pool, watcher }
    }

    pub fn pool(&self) -> &Arc<RoundRobin> {
        &self.pool
    }
}

#[async_trait]
impl Balancer for RoundRobinBalancer {
    fn get(&self, _key: &str) -> Result<EndpointRef, BalanceError> {
        if self.watcher.is_closed() {
            return Err(BalanceError::Closed);
        }
        self.pool.get()
    }

    fn put(&self, _endpoint: &EndpointRef) {}

    async fn close(&self) {
        self.watcher.close().await;
    }

    async fn synced(&self) {
        self.watcher.wait_for_updates(1).await;
    }
}

/// 根据服务配置创建负载均衡器
pub fn build_balancer(
    service: &ServiceConfig,
    settings: &GlobalSettings,
    instancer: Arc<dyn Instancer>,
) -> Result<Arc<dyn Balancer>> {
    let queue_capacity = settings.event_queue_capacity;

    let balancer: Arc<dyn Balancer> = match service.strategy {
        LoadBalanceStrategy::Consistent => {
            let load_factor = service.effective_load_factor(settings);
            let config = ConsistentConfig::new(service.name.clone(), load_factor);
            info!(
                "Creating consistent balancer for '{}' (load factor {})",
                service.name, load_factor
            );
            Arc::new(ConsistentBalancer::new(config, instancer, queue_capacity)?)
        }
        LoadBalanceStrategy::RoundRobin => {
            info!("Creating round-robin balancer for '{}'", service.name);
            Arc::new(RoundRobinBalancer::new(&service.name, instancer, queue_capacity))
        }
    };

    Ok(balancer)
}

/// 以配置中的静态实例列表作为成员创建负载均衡器
pub fn build_static_balancer(
    service: &ServiceConfig,
    settings: &GlobalSettings,
) -> Result<Arc<dyn Balancer>> {
    if service.instances.is_empty() {
        anyhow::bail!("Service '{}' has no static instances", service.name);
    }
    let instancer = Arc::new(FixedInstancer::new(service.instances.clone()));
    build_balancer(service, settings, instancer)
}
