use affinity_core::{BalanceError, EndpointRef};
use async_trait::async_trait;

use super::consistent::LoadStats;

/// 成员变更接口
///
/// 由服务发现监听器调用，负载均衡策略据此增删后端
pub trait Membership: Send + Sync {
    /// 添加后端，已存在的后端保持原状
    fn add_endpoints(&self, endpoints: &[EndpointRef]);

    /// 删除后端，不存在的后端被忽略
    fn remove_endpoints(&self, endpoints: &[EndpointRef]);
}

/// 负载均衡器接口
///
/// 请求路径上只依赖这个trait，一致性哈希和轮询两种策略可以互换
#[async_trait]
pub trait Balancer: Send + Sync {
    /// 为亲和键选择后端
    fn get(&self, key: &str) -> Result<EndpointRef, BalanceError>;

    /// 请求处理完毕后归还后端
    fn put(&self, endpoint: &EndpointRef);

    /// 停止接收成员变更并释放后台任务，可重复调用
    async fn close(&self);

    /// 等待首个服务发现快照处理完毕
    async fn synced(&self);

    /// 负载统计（仅一致性哈希策略提供）
    fn load_stats(&self) -> Option<LoadStats> {
        None
    }
}
