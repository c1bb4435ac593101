use thiserror::Error;

/// 负载均衡错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BalanceError {
    /// 环上没有任何可用的后端
    #[error("no endpoints")]
    NoEndpoints,

    /// 负载均衡器已关闭
    #[error("balancer is closed")]
    Closed,

    /// 负载因子必须是不小于1.0的有限数
    #[error("invalid load factor {0}: must be a finite number >= 1.0")]
    InvalidLoadFactor(f64),
}

impl BalanceError {
    /// 调用方是否可以稍后重试
    ///
    /// 成员变更追上之后，`NoEndpoints` 可能自行恢复
    pub fn is_retryable(&self) -> bool {
        matches!(self, BalanceError::NoEndpoints)
    }
}
