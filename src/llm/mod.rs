//! 大模型服务接入

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SourcingError;

pub mod client;

pub use client::LLMClient;

/// 文本补全服务
///
/// 需求解析与采购建议两个阶段都只依赖这个接口，测试中用脚本化的实现替换真实模型。
#[async_trait]
pub trait TextCompletionService: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// 启动时的连通性检查
    async fn check_connection(&self) -> Result<()> {
        self.complete("You are a helpful assistant.", "Hello")
            .await
            .map(|_| ())
    }
}

/// 为每次补全调用设置总时限的包装
///
/// 时限覆盖内部的全部重试，超时返回 `SourcingError::Timeout`。
pub struct BoundedCompletion {
    inner: Arc<dyn TextCompletionService>,
    limit: Duration,
}

impl BoundedCompletion {
    pub fn new(inner: Arc<dyn TextCompletionService>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>> + Send) -> Result<T> {
        match tokio::time::timeout(self.limit, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(SourcingError::Timeout(self.limit.as_secs()).into()),
        }
    }
}

#[async_trait]
impl TextCompletionService for BoundedCompletion {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.bounded(self.inner.complete(system_prompt, user_prompt))
            .await
    }

    async fn check_connection(&self) -> Result<()> {
        self.bounded(self.inner.check_connection()).await
    }
}

/// 调用模型并把回复解析为结构化数据
pub async fn complete_json<T>(
    service: &dyn TextCompletionService,
    system_prompt: &str,
    user_prompt: &str,
) -> Result<T>
where
    T: DeserializeOwned,
{
    let reply = service.complete(system_prompt, user_prompt).await?;
    parse_json_reply(&reply)
}

/// 从模型回复中截取JSON对象
///
/// 模型经常在JSON外包裹 ```json 代码块或解释文字，这里取第一个 `{` 到最后一个 `}`。
pub fn extract_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&reply[start..=end])
}

pub fn parse_json_reply<T>(reply: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let body = extract_json_object(reply).ok_or_else(|| anyhow!("模型回复中没有JSON对象"))?;
    serde_json::from_str(body).context("模型回复的JSON结构无法解析")
}
