use super::traits::Membership;
use affinity_core::{AddressEndpoint, DiscoveryEvent, EndpointRef, Instancer, RegistrationId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// 一次快照带来的成员变化
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipChange {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl MembershipChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// 实例地址到后端句柄的缓存
///
/// 只属于一个监听任务，不与其他组件共享
#[derive(Default)]
pub struct MembershipCache {
    endpoints: HashMap<String, EndpointRef>,
}

impl MembershipCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 将快照与缓存比较，先删除消失的实例，再添加新实例
    ///
    /// 快照携带错误时保持现状并返回 None
    pub fn apply(
        &mut self,
        name: &str,
        event: &DiscoveryEvent,
        target: &dyn Membership,
    ) -> Option<MembershipChange> {
        if let Some(err) = &event.err {
            error!("[{}] error from service discovery: {}", name, err);
            return None;
        }

        let current: HashSet<&str> = event.instances.iter().map(String::as_str).collect();

        let mut change = MembershipChange::default();
        let mut removals = Vec::new();
        self.endpoints.retain(|address, endpoint| {
            if current.contains(address.as_str()) {
                return true;
            }
            debug!("[{}] removing instance {}", name, address);
            change.removed.push(address.clone());
            removals.push(endpoint.clone());
            false
        });
        target.remove_endpoints(&removals);

        let mut additions = Vec::new();
        for instance in &event.instances {
            if self.endpoints.contains_key(instance) {
                continue;
            }
            debug!("[{}] adding instance {}", name, instance);
            let endpoint = AddressEndpoint::shared(instance.as_str());
            self.endpoints.insert(instance.clone(), endpoint.clone());
            change.added.push(instance.clone());
            additions.push(endpoint);
        }
        target.add_endpoints(&additions);

        Some(change)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.endpoints.contains_key(address)
    }
}

/// 服务发现监听器
///
/// 单个后台任务按顺序消费有界队列中的快照，并把差异应用到负载均衡策略上。
/// 关闭时先从发现源注销，再关闭本地队列，最后等待任务退出。
pub struct MembershipWatcher {
    name: String,
    instancer: Arc<dyn Instancer>,
    registration: Mutex<Option<(RegistrationId, mpsc::Sender<DiscoveryEvent>)>>,
    task: Mutex<Option<JoinHandle<()>>>,
    updates: watch::Receiver<u64>,
}

impl MembershipWatcher {
    /// 启动监听任务并向发现源注册，需要在tokio运行时内调用
    pub fn spawn(
        name: impl Into<String>,
        instancer: Arc<dyn Instancer>,
        target: Arc<dyn Membership>,
        capacity: usize,
    ) -> Self {
        let name = name.into();
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (updates_tx, updates) = watch::channel(0u64);

        let task = tokio::spawn(Self::receive(name.clone(), receiver, target, updates_tx));
        let id = instancer.register(sender.clone());
        info!("[{}] membership watcher started ({})", name, id);

        Self {
            name,
            instancer,
            registration: Mutex::new(Some((id, sender))),
            task: Mutex::new(Some(task)),
            updates,
        }
    }

    async fn receive(
        name: String,
        mut receiver: mpsc::Receiver<DiscoveryEvent>,
        target: Arc<dyn Membership>,
        updates: watch::Sender<u64>,
    ) {
        let mut cache = MembershipCache::new();

        while let Some(event) = receiver.recv().await {
            if let Some(change) = cache.apply(&name, &event, target.as_ref()) {
                if !change.is_empty() {
                    info!(
                        "[{}] membership updated: +{} -{} ({} endpoints)",
                        name,
                        change.added.len(),
                        change.removed.len(),
                        cache.len()
                    );
                }
            }
            updates.send_modify(|processed| *processed += 1);
        }

        info!("[{}] membership watcher stopped", name);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 已处理的快照数量
    pub fn updates(&self) -> watch::Receiver<u64> {
        self.updates.clone()
    }

    /// 等待至少 `count` 个快照处理完毕；任务已退出时立即返回
    pub async fn wait_for_updates(&self, count: u64) {
        let mut updates = self.updates.clone();
        if updates.wait_for(|processed| *processed >= count).await.is_err() {
            debug!("[{}] watcher exited before {} updates", self.name, count);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.registration.lock().is_none()
    }

    /// 注销、关闭队列并等待任务退出，重复调用无副作用
    pub async fn close(&self) {
        let registration = self.registration.lock().take();
        if let Some((id, sender)) = registration {
            self.instancer.deregister(id);
            drop(sender);
            debug!("[{}] deregistered {}, event queue closed", self.name, id);
        }

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("[{}] membership watcher task failed: {}", self.name, e);
            }
        }
    }
}

impl Drop for MembershipWatcher {
    fn drop(&mut self) {
        if let Some((id, _sender)) = self.registration.get_mut().take() {
            self.instancer.deregister(id);
        }
    }
}
