//! 服务发现边界
//!
//! 本模块只定义服务发现的快照格式以及订阅接口，实际的DNS SRV轮询由外部完成，
//! 这里提供的两个实现（固定列表、内存广播）用于静态配置和测试。

pub mod instancer;

pub use instancer::{FixedInstancer, Instancer, RegistrationId, SnapshotPublisher};

use thiserror::Error;

/// 服务发现错误，随快照一起送达
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("discovery failed: {message}")]
pub struct DiscoveryError {
    pub message: String,
}

impl DiscoveryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 服务发现快照
///
/// 要么携带当前全部实例地址，要么携带一个错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryEvent {
    pub instances: Vec<String>,
    pub err: Option<DiscoveryError>,
}

impl DiscoveryEvent {
    /// 成功的快照
    pub fn instances<I, S>(instances: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            instances: instances.into_iter().map(Into::into).collect(),
            err: None,
        }
    }

    /// 失败的快照
    pub fn error(err: DiscoveryError) -> Self {
        Self {
            instances: Vec::new(),
            err: Some(err),
        }
    }

    pub fn is_error(&self) -> bool {
        self.err.is_some()
    }
}
