//! LLM客户端 - 基于rig的文本补全实现

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::LLMConfig;
use crate::error::SourcingError;
use crate::gateway::RetryPolicy;

mod providers;

use providers::ProviderClient;

use super::TextCompletionService;

/// LLM客户端
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    client: ProviderClient,
    retry: RetryPolicy,
}

impl LLMClient {
    /// 创建新的LLM客户端，重试次数与单次超时与其他外部调用一致
    pub fn new(config: LLMConfig, retry: RetryPolicy) -> Result<Self> {
        let client = ProviderClient::new(&config)?;
        Ok(Self {
            client,
            config,
            retry,
        })
    }
}

#[async_trait]
impl TextCompletionService for LLMClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let agent = self.client.create_agent(system_prompt, &self.config);

        self.retry
            .run("调用模型服务", || async { agent.prompt(user_prompt).await })
            .await
    }

    /// 检查模型连接和功能是否正常
    async fn check_connection(&self) -> Result<()> {
        info!("🔄 正在检查模型连接 ({} / {})...", self.config.provider, self.config.model);
        let agent = self
            .client
            .create_agent("System: You are a helpful assistant.", &self.config);
        let limit = self.retry.attempt_timeout;
        let outcome = match tokio::time::timeout(limit, agent.prompt("Hello")).await {
            Ok(outcome) => outcome,
            Err(_) => Err(SourcingError::Timeout(limit.as_secs()).into()),
        };
        match outcome {
            Ok(_) => {
                info!("✅ 模型连接正常");
                Ok(())
            }
            Err(e) => {
                warn!("❌ 模型连接失败: {}", e);
                Err(e)
            }
        }
    }
}
