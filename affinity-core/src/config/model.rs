use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub services: HashMap<String, ServiceConfig>,
    #[serde(default)]
    pub settings: GlobalSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GlobalSettings {
    /// 未单独配置时使用的负载因子
    #[serde(default = "default_load_factor")]
    pub default_load_factor: f64,
    /// 服务发现事件队列容量
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
    /// 外部DNS轮询间隔，仅供轮询方读取
    #[serde(default = "default_discovery_poll_interval")]
    pub discovery_poll_interval_seconds: u64,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            default_load_factor: default_load_factor(),
            event_queue_capacity: default_event_queue_capacity(),
            discovery_poll_interval_seconds: default_discovery_poll_interval(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(default)]
    pub strategy: LoadBalanceStrategy,
    /// 负载因子，缺省时取全局设置
    #[serde(default)]
    pub load_factor: Option<f64>,
    /// DNS SRV名称，例如 _http._tcp.collection.default.svc.cluster.local
    #[serde(default)]
    pub srv_name: Option<String>,
    /// 静态实例列表，作为初始成员
    #[serde(default)]
    pub instances: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ServiceConfig {
    /// 计算实际生效的负载因子
    pub fn effective_load_factor(&self, settings: &GlobalSettings) -> f64 {
        self.load_factor.unwrap_or(settings.default_load_factor)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalanceStrategy {
    /// 有界负载一致性哈希 - 相同亲和键尽量落到同一后端
    #[default]
    Consistent,
    /// 轮询 - 忽略亲和键
    RoundRobin,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_load_factor() -> f64 {
    1.25
}

fn default_event_queue_capacity() -> usize {
    16
}

fn default_discovery_poll_interval() -> u64 {
    5
}

impl Config {
    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        self.validate_settings()?;

        for (service_id, service) in &self.services {
            self.validate_service_config(service_id, service)?;
        }

        Ok(())
    }

    /// 获取服务配置
    pub fn get_service(&self, service_id: &str) -> Option<&ServiceConfig> {
        self.services.get(service_id)
    }

    /// 获取所有启用的服务ID
    pub fn get_enabled_services(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .services
            .iter()
            .filter(|(_, service)| service.enabled)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn validate_settings(&self) -> Result<()> {
        validate_load_factor("settings.default_load_factor", self.settings.default_load_factor)?;

        if self.settings.event_queue_capacity == 0 {
            anyhow::bail!("Settings have invalid event_queue_capacity: cannot be 0");
        }

        if self.settings.discovery_poll_interval_seconds == 0 {
            anyhow::bail!("Settings have invalid discovery_poll_interval_seconds: cannot be 0");
        }

        Ok(())
    }

    /// 验证单个Service配置的有效性
    fn validate_service_config(&self, service_id: &str, service: &ServiceConfig) -> Result<()> {
        if service.name.is_empty() {
            anyhow::bail!("Service '{}' has empty name", service_id);
        }

        if let Some(load_factor) = service.load_factor {
            validate_load_factor(&format!("Service '{}'", service_id), load_factor)?;
        }

        if let Some(srv_name) = &service.srv_name {
            if srv_name.trim().is_empty() {
                anyhow::bail!("Service '{}' has empty srv_name", service_id);
            }
        }

        let mut seen = HashSet::new();
        for instance in &service.instances {
            if instance.is_empty() {
                anyhow::bail!("Service '{}' has empty instance address", service_id);
            }

            if instance.chars().any(char::is_whitespace) {
                anyhow::bail!(
                    "Service '{}' has invalid instance address '{}' (cannot contain whitespace)",
                    service_id,
                    instance
                );
            }

            if !seen.insert(instance.as_str()) {
                anyhow::bail!(
                    "Service '{}' lists instance '{}' more than once",
                    service_id,
                    instance
                );
            }
        }

        Ok(())
    }
}

fn validate_load_factor(owner: &str, load_factor: f64) -> Result<()> {
    if !load_factor.is_finite() || load_factor < 1.0 {
        anyhow::bail!(
            "{} has invalid load_factor {}: must be a finite number >= 1.0",
            owner,
            load_factor
        );
    }
    Ok(())
}
