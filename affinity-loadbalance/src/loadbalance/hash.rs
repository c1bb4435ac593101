use std::sync::Arc;

/// 哈希函数：字节串映射到32位环坐标
pub type HashFn = Arc<dyn Fn(&[u8]) -> u32 + Send + Sync>;

/// 默认哈希：blake3摘要的前4个字节（小端）
pub fn default_hash(data: &[u8]) -> u32 {
    let digest = blake3::hash(data);
    let bytes = digest.as_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

pub fn default_hash_fn() -> HashFn {
    Arc::new(default_hash)
}
