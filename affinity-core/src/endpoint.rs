use std::fmt;
use std::sync::Arc;

/// 后端实例的能力接口
///
/// `key()` 是稳定的身份标识，既是哈希环的输入，也是负载表的键；
/// `host_and_port()` 是路由完成后调用方实际连接的地址。
pub trait Endpoint: fmt::Debug + fmt::Display + Send + Sync {
    /// 稳定的身份标识
    fn key(&self) -> &str;

    /// 可连接的地址
    fn host_and_port(&self) -> &str;
}

/// 共享的后端句柄
pub type EndpointRef = Arc<dyn Endpoint>;

/// 以服务发现返回的实例地址为身份的后端
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressEndpoint {
    address: String,
}

impl AddressEndpoint {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// 直接构造共享句柄
    pub fn shared(address: impl Into<String>) -> EndpointRef {
        Arc::new(Self::new(address))
    }
}

impl Endpoint for AddressEndpoint {
    fn key(&self) -> &str {
        &self.address
    }

    fn host_and_port(&self) -> &str {
        &self.address
    }
}

impl fmt::Display for AddressEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}
