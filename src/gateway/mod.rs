//! 外部服务网关
//!
//! 搜索与工商适配器在启动时按配置选定（真实或模拟），之后统一经过缓存与重试。

use anyhow::Result;
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::CacheManager;
use crate::config::{Config, WorkflowConfig};
use crate::error::SourcingError;
use crate::types::supplier::{SearchHit, normalize_company_name};

pub mod registry;
pub mod search;

use registry::{CompanyRegistryApi, MockRegistry, RegistryLookup, TianyanchaClient};
use search::{BochaSearchClient, MockSearchApi, SupplierSearchApi};

const SEARCH_CACHE_CATEGORY: &str = "search";
const REGISTRY_CACHE_CATEGORY: &str = "registry";

/// 指数退避重试策略
///
/// 每次尝试单独计时，超时的尝试与普通失败一样参与重试。
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            attempt_timeout,
        }
    }

    /// 按工作流配置构建
    pub fn from_config(workflow: &WorkflowConfig) -> Self {
        Self::new(
            workflow.max_retries,
            Duration::from_millis(workflow.retry_delay_ms),
            Duration::from_secs(workflow.timeout_seconds),
        )
    }

    /// 第 `attempt` 次失败后的等待时间（从1开始），带随机抖动
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let jitter_cap = self.jitter_cap_ms();
        let jitter = if jitter_cap > 0 {
            rand::rng().random_range(0..=jitter_cap)
        } else {
            0
        };
        self.backoff(attempt) + Duration::from_millis(jitter)
    }

    /// 所有尝试全部超时、每次等待都取抖动上限时的总耗时
    pub fn total_budget(&self) -> Duration {
        let waits = (1..self.max_attempts)
            .map(|attempt| self.backoff(attempt) + Duration::from_millis(self.jitter_cap_ms()))
            .fold(Duration::ZERO, |total, wait| total.saturating_add(wait));
        self.attempt_timeout
            .saturating_mul(self.max_attempts)
            .saturating_add(waits)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }

    fn jitter_cap_ms(&self) -> u64 {
        (self.base_delay.as_millis() as u64) / 2
    }

    /// 执行操作，失败或超时时按指数退避重试，直到成功或次数用尽
    ///
    /// 最后一次尝试超时返回 `SourcingError::Timeout`。
    pub async fn run<T, F, Fut>(&self, label: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match tokio::time::timeout(self.attempt_timeout, operation()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => err,
                Err(_) => {
                    anyhow::Error::new(SourcingError::Timeout(self.attempt_timeout.as_secs()))
                }
            };
            if attempt >= self.max_attempts {
                warn!("❌ {} 失败，已重试 {} 次: {}", label, attempt, err);
                return Err(err);
            }
            let delay = self.delay_for(attempt);
            warn!(
                "⚠️ {} 出错，{}ms 后重试 (第 {} / {}次尝试): {}",
                label,
                delay.as_millis(),
                attempt,
                self.max_attempts,
                err
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// 带缓存与重试的搜索网关
#[derive(Clone)]
pub struct SearchGateway {
    api: Arc<dyn SupplierSearchApi>,
    cache: Arc<CacheManager>,
    retry: RetryPolicy,
    results_per_query: u32,
}

impl SearchGateway {
    pub fn new(
        api: Arc<dyn SupplierSearchApi>,
        cache: Arc<CacheManager>,
        retry: RetryPolicy,
        results_per_query: u32,
    ) -> Self {
        Self {
            api,
            cache,
            retry,
            results_per_query,
        }
    }

    pub fn api_name(&self) -> &'static str {
        self.api.name()
    }

    /// 搜索企业，失败结果不进缓存
    pub async fn search(&self, keywords: &str) -> Result<Vec<SearchHit>> {
        let signature = format!("{}|{}|{}", self.api.name(), keywords, self.results_per_query);
        if let Some(hits) = self
            .cache
            .get::<Vec<SearchHit>>(SEARCH_CACHE_CATEGORY, &signature)
            .await?
        {
            return Ok(hits);
        }

        let label = format!("搜索 \"{}\"", keywords);
        let hits = self
            .retry
            .run(&label, || self.api.search(keywords, self.results_per_query))
            .await?;

        self.cache
            .set(SEARCH_CACHE_CATEGORY, &signature, &hits)
            .await?;
        Ok(hits)
    }
}

/// 带缓存与重试的工商网关
///
/// 查无结果是接口的正常返回，不会触发重试，同样会被缓存；不完整的画像不缓存。
#[derive(Clone)]
pub struct RegistryGateway {
    api: Arc<dyn CompanyRegistryApi>,
    cache: Arc<CacheManager>,
    retry: RetryPolicy,
}

impl RegistryGateway {
    pub fn new(
        api: Arc<dyn CompanyRegistryApi>,
        cache: Arc<CacheManager>,
        retry: RetryPolicy,
    ) -> Self {
        Self { api, cache, retry }
    }

    pub fn api_name(&self) -> &'static str {
        self.api.name()
    }

    pub async fn lookup(&self, company_name: &str) -> Result<RegistryLookup> {
        let signature = format!("{}|{}", self.api.name(), normalize_company_name(company_name));
        if let Some(lookup) = self
            .cache
            .get::<RegistryLookup>(REGISTRY_CACHE_CATEGORY, &signature)
            .await?
        {
            return Ok(lookup);
        }

        let label = format!("工商查询 \"{}\"", company_name);
        let lookup = self
            .retry
            .run(&label, || self.api.lookup(company_name))
            .await?;

        // 附属接口失败的画像不缓存，下次运行重新查询
        if let RegistryLookup::Found(profile) = &lookup
            && profile.is_partial()
        {
            debug!("🏢 {} 的工商画像不完整，跳过缓存", company_name);
            return Ok(lookup);
        }

        self.cache
            .set(REGISTRY_CACHE_CATEGORY, &signature, &lookup)
            .await?;
        Ok(lookup)
    }
}

/// 按配置选择搜索适配器
pub fn build_search_api(config: &Config) -> Result<Arc<dyn SupplierSearchApi>> {
    if config.search.use_mock {
        info!("🧪 使用模拟搜索数据");
        return Ok(Arc::new(MockSearchApi::new()));
    }
    let timeout = Duration::from_secs(config.workflow.timeout_seconds);
    Ok(Arc::new(BochaSearchClient::new(&config.search, timeout)?))
}

/// 按配置选择工商适配器
pub fn build_registry_api(config: &Config) -> Result<Arc<dyn CompanyRegistryApi>> {
    if config.registry.use_mock {
        info!("🧪 使用模拟工商数据");
        return Ok(Arc::new(MockRegistry::new()));
    }
    let timeout = Duration::from_secs(config.workflow.timeout_seconds);
    Ok(Arc::new(TianyanchaClient::new(&config.registry, timeout)?))
}

#[cfg(test)]
mod tests;
