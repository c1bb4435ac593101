use super::DiscoveryEvent;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// 订阅句柄，用于注销
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(u64);

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "registration#{}", self.0)
    }
}

/// 服务发现源接口
///
/// 注册时如果已有最新快照，会立即投递一次，之后每个新快照都会投递给所有订阅者。
/// 注销后发现源不再持有该发送端。
pub trait Instancer: Send + Sync {
    /// 注册一个事件发送端
    fn register(&self, sender: mpsc::Sender<DiscoveryEvent>) -> RegistrationId;

    /// 注销事件发送端，重复注销无副作用
    fn deregister(&self, id: RegistrationId);
}

/// 注册时投递当前状态
fn replay(id: RegistrationId, sender: &mpsc::Sender<DiscoveryEvent>, event: DiscoveryEvent) {
    if let Err(e) = sender.try_send(event) {
        warn!("Failed to replay current snapshot to {}: {}", id, e);
    }
}

/// 固定实例列表
///
/// 适用于静态配置：注册时投递一次快照，此后不再变化
pub struct FixedInstancer {
    instances: Vec<String>,
    next_id: AtomicU64,
}

impl FixedInstancer {
    pub fn new<I, S>(instances: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            instances: instances.into_iter().map(Into::into).collect(),
            next_id: AtomicU64::new(0),
        }
    }
}

impl Instancer for FixedInstancer {
    fn register(&self, sender: mpsc::Sender<DiscoveryEvent>) -> RegistrationId {
        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        replay(id, &sender, DiscoveryEvent::instances(self.instances.clone()));
        id
    }

    fn deregister(&self, id: RegistrationId) {
        trace!("Fixed instancer ignoring deregistration of {}", id);
    }
}

#[derive(Default)]
struct PublisherState {
    next_id: u64,
    subscribers: HashMap<RegistrationId, mpsc::Sender<DiscoveryEvent>>,
    latest: Option<DiscoveryEvent>,
}

/// 内存中的快照广播器
///
/// 外部轮询器（或测试）调用 `publish` 推送快照，所有订阅者都会收到
#[derive(Default)]
pub struct SnapshotPublisher {
    state: Mutex<PublisherState>,
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 推送一个快照
    ///
    /// 订阅者队列满时等待空位；已关闭的队列直接跳过
    pub async fn publish(&self, event: DiscoveryEvent) {
        let subscribers: Vec<(RegistrationId, mpsc::Sender<DiscoveryEvent>)> = {
            let mut state = self.state.lock();
            state.latest = Some(event.clone());
            state
                .subscribers
                .iter()
                .map(|(id, sender)| (*id, sender.clone()))
                .collect()
        };

        debug!(
            "Publishing snapshot with {} instances to {} subscribers",
            event.instances.len(),
            subscribers.len()
        );

        for (id, sender) in subscribers {
            if sender.send(event.clone()).await.is_err() {
                debug!("Subscriber {} queue closed, skipping", id);
            }
        }
    }

    /// 当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    /// 最近一次推送的快照
    pub fn latest(&self) -> Option<DiscoveryEvent> {
        self.state.lock().latest.clone()
    }
}

impl Instancer for SnapshotPublisher {
    fn register(&self, sender: mpsc::Sender<DiscoveryEvent>) -> RegistrationId {
        let mut state = self.state.lock();
        let id = RegistrationId(state.next_id);
        state.next_id += 1;

        if let Some(latest) = state.latest.clone() {
            replay(id, &sender, latest);
        }

        state.subscribers.insert(id, sender);
        debug!("Registered subscriber {}", id);
        id
    }

    fn deregister(&self, id: RegistrationId) {
        if self.state.lock().subscribers.remove(&id).is_some() {
            debug!("Deregistered subscriber {}", id);
        }
    }
}
