use anyhow::Result;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::config::CacheConfig;

pub mod performance_monitor;
pub use performance_monitor::{CachePerformanceMonitor, CachePerformanceReport};

/// 缓存管理器
///
/// 进程内的键值缓存，位于所有外部调用之前。条目在写入满 TTL 后即视为过期，
/// 读取时发现过期会直接删除。并发读写安全，同一键的并发写入以最后一次为准。
pub struct CacheManager {
    config: CacheConfig,
    entries: RwLock<HashMap<String, CacheEntry>>,
    performance_monitor: CachePerformanceMonitor,
}

/// 缓存条目
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Value,
    pub inserted_at: Instant,
}

impl CacheManager {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            performance_monitor: CachePerformanceMonitor::new(),
        }
    }

    /// 生成调用签名的MD5哈希
    pub fn hash_signature(&self, signature: &str) -> String {
        let mut hasher = Md5::new();
        hasher.update(signature.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn cache_key(&self, category: &str, signature: &str) -> String {
        format!("{}:{}", category, self.hash_signature(signature))
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.ttl_minutes * 60)
    }

    /// 检查缓存是否过期
    fn is_expired(&self, entry: &CacheEntry) -> bool {
        entry.inserted_at.elapsed() >= self.ttl()
    }

    /// 获取缓存
    pub async fn get<T>(&self, category: &str, signature: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        if !self.config.enabled {
            return Ok(None);
        }

        let key = self.cache_key(category, signature);

        let entry = {
            let entries = self.entries.read().await;
            entries.get(&key).cloned()
        };

        let Some(entry) = entry else {
            self.performance_monitor.record_cache_miss(category);
            return Ok(None);
        };

        if self.is_expired(&entry) {
            // 删除过期缓存，期间被重新写入的新条目保留
            let mut entries = self.entries.write().await;
            if let Some(current) = entries.get(&key)
                && self.is_expired(current)
            {
                entries.remove(&key);
            }
            self.performance_monitor.record_cache_expired(category);
            return Ok(None);
        }

        match serde_json::from_value::<T>(entry.data) {
            Ok(data) => {
                self.performance_monitor.record_cache_hit(category);
                Ok(Some(data))
            }
            Err(e) => {
                self.performance_monitor
                    .record_cache_error(category, &format!("反序列化失败: {}", e));
                Ok(None)
            }
        }
    }

    /// 设置缓存
    pub async fn set<T>(&self, category: &str, signature: &str, data: &T) -> Result<()>
    where
        T: Serialize,
    {
        if !self.config.enabled {
            return Ok(());
        }

        let key = self.cache_key(category, signature);

        match serde_json::to_value(data) {
            Ok(value) => {
                let entry = CacheEntry {
                    data: value,
                    inserted_at: Instant::now(),
                };
                self.entries.write().await.insert(key, entry);
                self.performance_monitor.record_cache_write(category);
                Ok(())
            }
            Err(e) => {
                self.performance_monitor
                    .record_cache_error(category, &format!("序列化失败: {}", e));
                Err(e.into())
            }
        }
    }

    /// 当前保存的条目数量（含尚未清理的过期条目）
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// 生成性能报告
    pub fn generate_performance_report(&self) -> CachePerformanceReport {
        self.performance_monitor.generate_report()
    }
}
