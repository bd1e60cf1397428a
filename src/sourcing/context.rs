use std::sync::Arc;

use anyhow::Result;

use crate::cache::CacheManager;
use crate::config::Config;
use crate::executor::TaskExecutor;
use crate::gateway::registry::CompanyRegistryApi;
use crate::gateway::search::SupplierSearchApi;
use crate::gateway::{
    RegistryGateway, RetryPolicy, SearchGateway, build_registry_api, build_search_api,
};
use crate::llm::{BoundedCompletion, LLMClient, TextCompletionService};

#[derive(Clone)]
pub struct SourcingContext {
    /// 配置
    pub config: Config,
    /// 文本补全服务，用于需求解析与采购建议
    pub llm: Arc<dyn TextCompletionService>,
    /// 带缓存的搜索网关
    pub search: SearchGateway,
    /// 带缓存的工商网关
    pub registry: RegistryGateway,
    /// 搜索与校验阶段共用的执行器
    pub executor: TaskExecutor,
    /// 缓存管理器
    pub cache_manager: Arc<CacheManager>,
}

impl SourcingContext {
    /// 按配置创建上下文，真实或模拟服务在这里一次性选定
    pub fn new(config: Config) -> Result<Self> {
        let retry = RetryPolicy::from_config(&config.workflow);
        let llm: Arc<dyn TextCompletionService> =
            Arc::new(LLMClient::new(config.llm.clone(), retry)?);
        let search_api = build_search_api(&config)?;
        let registry_api = build_registry_api(&config)?;
        Ok(Self::with_services(config, llm, search_api, registry_api))
    }

    /// 使用指定的服务实现创建上下文
    pub fn with_services(
        config: Config,
        llm: Arc<dyn TextCompletionService>,
        search_api: Arc<dyn SupplierSearchApi>,
        registry_api: Arc<dyn CompanyRegistryApi>,
    ) -> Self {
        let cache_manager = Arc::new(CacheManager::new(config.cache.clone()));
        let retry = RetryPolicy::from_config(&config.workflow);
        // 单元时限覆盖全部重试与退避
        let unit_budget = retry.total_budget();
        let llm: Arc<dyn TextCompletionService> =
            Arc::new(BoundedCompletion::new(llm, unit_budget));
        let search = SearchGateway::new(
            search_api,
            cache_manager.clone(),
            retry,
            config.search.results_per_query,
        );
        let registry = RegistryGateway::new(registry_api, cache_manager.clone(), retry);
        let executor = TaskExecutor::new(config.workflow.workers, unit_budget);

        Self {
            llm,
            search,
            registry,
            executor,
            cache_manager,
            config,
        }
    }
}
