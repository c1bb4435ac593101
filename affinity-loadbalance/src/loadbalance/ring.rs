//! 一致性哈希环

use super::hash::HashFn;
use affinity_core::EndpointRef;
use std::fmt;
use tracing::debug;

#[derive(Clone)]
struct RingEntry {
    hash: u32,
    endpoint: EndpointRef,
}

impl RingEntry {
    fn position(&self) -> (u32, &str) {
        (self.hash, self.endpoint.key())
    }
}

/// 按哈希值升序排列、首尾相接的后端索引
///
/// 每个后端在环上只占一个位置。两个不同后端哈希到同一位置时都会保留，
/// 按身份标识的字典序排列，因此相同的成员集合总能得到相同的环。
pub struct HashRing {
    entries: Vec<RingEntry>,
    hash_fn: HashFn,
}

impl HashRing {
    pub fn new(hash_fn: HashFn) -> Self {
        Self {
            entries: Vec::new(),
            hash_fn,
        }
    }

    /// 计算环坐标
    pub fn hash(&self, data: &[u8]) -> u32 {
        (self.hash_fn)(data)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 插入后端，已存在时返回 false
    pub fn insert(&mut self, endpoint: EndpointRef) -> bool {
        let hash = self.hash(endpoint.key().as_bytes());
        let (index, found) = self.locate(hash, endpoint.key());
        if found {
            return false;
        }

        debug!("Inserting {} into ring at {:#010x}", endpoint, hash);
        self.entries.insert(index, RingEntry { hash, endpoint });
        true
    }

    /// 删除指定身份的后端
    pub fn remove(&mut self, key: &str) -> Option<EndpointRef> {
        let hash = self.hash(key.as_bytes());
        let (index, found) = self.locate(hash, key);
        if !found {
            return None;
        }

        let entry = self.entries.remove(index);
        debug!("Removed {} from ring at {:#010x}", entry.endpoint, entry.hash);
        Some(entry.endpoint)
    }

    pub fn contains(&self, key: &str) -> bool {
        let hash = self.hash(key.as_bytes());
        self.locate(hash, key).1
    }

    /// 第一个哈希值不小于 `hash` 的位置，越过末尾则回到第一个
    pub fn successor(&self, hash: u32) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }

        let index = self.entries.partition_point(|entry| entry.hash < hash);
        Some(if index == self.entries.len() { 0 } else { index })
    }

    /// 从 `start` 开始顺时针遍历，每个位置最多访问一次
    pub fn walk(&self, start: usize) -> RingWalk<'_> {
        RingWalk {
            entries: &self.entries,
            start,
            step: 0,
        }
    }

    pub fn get(&self, index: usize) -> Option<&EndpointRef> {
        self.entries.get(index).map(|entry| &entry.endpoint)
    }

    /// 按环顺序列出 (坐标, 后端)
    pub fn iter(&self) -> impl Iterator<Item = (u32, &EndpointRef)> + '_ {
        self.entries.iter().map(|entry| (entry.hash, &entry.endpoint))
    }

    fn locate(&self, hash: u32, key: &str) -> (usize, bool) {
        let index = self
            .entries
            .partition_point(|entry| entry.position() < (hash, key));
        let found = self
            .entries
            .get(index)
            .is_some_and(|entry| entry.position() == (hash, key));
        (index, found)
    }
}

impl fmt::Debug for HashRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| (entry.hash, entry.endpoint.key())))
            .finish()
    }
}

/// 环上的有限遍历
pub struct RingWalk<'a> {
    entries: &'a [RingEntry],
    start: usize,
    step: usize,
}

impl<'a> Iterator for RingWalk<'a> {
    type Item = (usize, &'a EndpointRef);

    fn next(&mut self) -> Option<Self::Item> {
        let entries = self.entries;
        if self.step >= entries.len() {
            return None;
        }

        let index = (self.start + self.step) % entries.len();
        self.step += 1;
        Some((index, &entries[index].endpoint))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.entries.len().saturating_sub(self.step);
        (remaining, Some(remaining))
    }
}
