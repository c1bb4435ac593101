use std::collections::HashMap;

/// 每个后端的在途请求计数及总和
///
/// `total` 始终等于所有计数之和，计数不会低于0
#[derive(Debug, Default)]
pub struct LoadTracker {
    loads: HashMap<String, u64>,
    total: u64,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始跟踪一个后端，初始负载为0；已存在时不重置
    pub fn track(&mut self, key: &str) -> bool {
        if self.loads.contains_key(key) {
            return false;
        }
        self.loads.insert(key.to_string(), 0);
        true
    }

    /// 停止跟踪一个后端，返回被丢弃的负载
    pub fn untrack(&mut self, key: &str) -> Option<u64> {
        let load = self.loads.remove(key)?;
        self.total -= load;
        Some(load)
    }

    pub fn load(&self, key: &str) -> Option<u64> {
        self.loads.get(key).copied()
    }

    pub fn increment(&mut self, key: &str) -> bool {
        match self.loads.get_mut(key) {
            Some(load) => {
                *load += 1;
                self.total += 1;
                true
            }
            None => false,
        }
    }

    /// 负载减1；未跟踪或负载已为0时不做任何事
    pub fn decrement(&mut self, key: &str) -> bool {
        match self.loads.get_mut(key) {
            Some(load) if *load > 0 => {
                *load -= 1;
                self.total -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.loads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.loads.iter().map(|(key, load)| (key.as_str(), *load))
    }

    /// 单个后端允许的负载上限：ceil(load_factor * (total + 1) / endpoints)
    pub fn capacity(&self, load_factor: f64, endpoints: usize) -> u64 {
        if endpoints == 0 {
            return 0;
        }
        (load_factor * (self.total + 1) as f64 / endpoints as f64).ceil() as u64
    }
}
