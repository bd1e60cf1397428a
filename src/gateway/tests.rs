use super::registry::{CompanyProfile, CompanyRegistryApi, MockRegistry, RegistryLookup};
use super::search::SupplierSearchApi;
use super::{RegistryGateway, RetryPolicy, SearchGateway};
use crate::cache::CacheManager;
use crate::config::{CacheConfig, WorkflowConfig};
use crate::executor::TaskExecutor;
use crate::types::supplier::SearchHit;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// 前 `failures` 次调用失败的搜索服务
struct FlakySearch {
    calls: AtomicU32,
    failures: u32,
}

#[async_trait]
impl SupplierSearchApi for FlakySearch {
    async fn search(&self, query: &str, _count: u32) -> Result<Vec<SearchHit>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err(anyhow!("服务暂时不可用"));
        }
        Ok(vec![SearchHit {
            name: format!("{}有限公司", query),
            snippet: String::new(),
            url: String::new(),
            contact: None,
        }])
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

/// 记录调用次数的工商服务
struct CountingRegistry {
    calls: AtomicU32,
    inner: MockRegistry,
}

#[async_trait]
impl CompanyRegistryApi for CountingRegistry {
    async fn lookup(&self, company_name: &str) -> Result<RegistryLookup> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup(company_name).await
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// 前 `slow_calls` 次调用挂起40秒后失败，之后立即返回
struct SlowRegistry {
    calls: AtomicU32,
    slow_calls: u32,
}

#[async_trait]
impl CompanyRegistryApi for SlowRegistry {
    async fn lookup(&self, company_name: &str) -> Result<RegistryLookup> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.slow_calls {
            tokio::time::sleep(Duration::from_secs(40)).await;
            return Err(anyhow!("operation timed out"));
        }
        Ok(RegistryLookup::Found(Box::new(MockRegistry::profile_for(
            company_name,
        ))))
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

/// 风险接口缺失的工商服务
struct PartialRegistry {
    calls: AtomicU32,
}

#[async_trait]
impl CompanyRegistryApi for PartialRegistry {
    async fn lookup(&self, company_name: &str) -> Result<RegistryLookup> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let profile = CompanyProfile {
            risks: None,
            ..MockRegistry::profile_for(company_name)
        };
        Ok(RegistryLookup::Found(Box::new(profile)))
    }

    fn name(&self) -> &'static str {
        "partial"
    }
}

fn cache() -> Arc<CacheManager> {
    Arc::new(CacheManager::new(CacheConfig {
        enabled: true,
        ttl_minutes: 60,
    }))
}

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(
        max_attempts,
        Duration::from_millis(500),
        Duration::from_secs(30),
    )
}

#[test]
fn test_backoff_grows_exponentially() {
    let policy = policy(3);
    let first = policy.delay_for(1);
    let third = policy.delay_for(3);

    assert!(first >= Duration::from_millis(500) && first <= Duration::from_millis(750));
    assert!(third >= Duration::from_millis(2000) && third <= Duration::from_millis(2250));
}

#[tokio::test(start_paused = true)]
async fn test_search_retries_until_success() {
    let api = Arc::new(FlakySearch {
        calls: AtomicU32::new(0),
        failures: 2,
    });
    let gateway = SearchGateway::new(api.clone(), cache(), policy(3), 10);

    let hits = gateway.search("武汉云仓").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(api.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_search_gives_up_after_max_attempts() {
    let api = Arc::new(FlakySearch {
        calls: AtomicU32::new(0),
        failures: u32::MAX,
    });
    let gateway = SearchGateway::new(api.clone(), cache(), policy(3), 10);

    assert!(gateway.search("武汉云仓").await.is_err());
    assert_eq!(api.calls.load(Ordering::SeqCst), 3);

    // 失败结果没有进入缓存
    assert!(gateway.search("武汉云仓").await.is_err());
    assert_eq!(api.calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_search_served_from_cache() {
    let api = Arc::new(FlakySearch {
        calls: AtomicU32::new(0),
        failures: 0,
    });
    let gateway = SearchGateway::new(api.clone(), cache(), policy(3), 10);

    let first = gateway.search("武汉云仓").await.unwrap();
    let second = gateway.search("武汉云仓").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(api.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_not_found_is_not_retried_and_is_cached() {
    let api = Arc::new(CountingRegistry {
        calls: AtomicU32::new(0),
        inner: MockRegistry::new()
            .with_latency(Duration::ZERO)
            .with_missing(["武汉无名物流有限公司"]),
    });
    let gateway = RegistryGateway::new(api.clone(), cache(), policy(3));

    let first = gateway.lookup("武汉无名物流有限公司").await.unwrap();
    assert_eq!(first, RegistryLookup::NotFound);
    assert_eq!(api.calls.load(Ordering::SeqCst), 1);

    let second = gateway.lookup("武汉无名物流有限公司").await.unwrap();
    assert_eq!(second, RegistryLookup::NotFound);
    assert_eq!(api.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_registry_cache_keyed_by_normalized_name() {
    let api = Arc::new(CountingRegistry {
        calls: AtomicU32::new(0),
        inner: MockRegistry::new().with_latency(Duration::ZERO),
    });
    let gateway = RegistryGateway::new(api.clone(), cache(), policy(3));

    let first = gateway.lookup("武汉速达云仓物流有限公司").await.unwrap();
    let second = gateway.lookup(" 武汉速达 云仓物流有限公司").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(api.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_policy_follows_workflow_settings() {
    let workflow = WorkflowConfig {
        max_retries: 5,
        timeout_seconds: 12,
        retry_delay_ms: 200,
        ..WorkflowConfig::default()
    };
    let policy = RetryPolicy::from_config(&workflow);

    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.attempt_timeout, Duration::from_secs(12));
    assert_eq!(policy.base_delay, Duration::from_millis(200));
}

#[test]
fn test_total_budget_covers_every_attempt() {
    // 3 × 30s + (500 + 250)ms + (1000 + 250)ms
    assert_eq!(policy(3).total_budget(), Duration::from_millis(92_000));
    assert_eq!(policy(1).total_budget(), Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_attempt_is_retried_within_unit() {
    let api = Arc::new(SlowRegistry {
        calls: AtomicU32::new(0),
        slow_calls: 1,
    });
    let retry = policy(3);
    let gateway = RegistryGateway::new(api.clone(), cache(), retry);
    let executor = TaskExecutor::new(2, retry.total_budget());

    let units = vec![async move { gateway.lookup("武汉速达云仓物流有限公司").await }];
    let results = executor.submit(units).await;

    assert!(matches!(results[0], Ok(RegistryLookup::Found(_))));
    assert_eq!(api.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_every_attempt_timing_out_is_reported_as_timeout() {
    let api = Arc::new(SlowRegistry {
        calls: AtomicU32::new(0),
        slow_calls: u32::MAX,
    });
    let gateway = RegistryGateway::new(api.clone(), cache(), policy(3));

    let err = gateway.lookup("武汉速达云仓物流有限公司").await.unwrap_err();

    assert!(crate::error::is_timeout(&err));
    assert_eq!(api.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_partial_profile_is_not_cached() {
    let api = Arc::new(PartialRegistry {
        calls: AtomicU32::new(0),
    });
    let gateway = RegistryGateway::new(api.clone(), cache(), policy(3));

    for _ in 0..2 {
        match gateway.lookup("武汉速达云仓物流有限公司").await.unwrap() {
            RegistryLookup::Found(profile) => assert!(profile.is_partial()),
            RegistryLookup::NotFound => panic!("expected a profile"),
        }
    }
    assert_eq!(api.calls.load(Ordering::SeqCst), 2);
}
