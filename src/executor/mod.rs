//! 有界并发执行器
//!
//! 搜索阶段与校验阶段共用同一个执行器。每个工作单元都在独立的 tokio 任务中运行，
//! 通过信号量限制同时在途的单元数量；结果按提交顺序返回，而不是完成顺序。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::config::{MAX_WORKERS, MIN_WORKERS};

/// 单个工作单元的失败原因
#[derive(Debug, Error)]
pub enum TaskError {
    /// 单元自身返回的错误
    #[error("{0}")]
    Failed(anyhow::Error),

    /// 单元超时
    #[error("工作单元超时 ({}秒)", .0.as_secs())]
    Timeout(Duration),

    /// 单元发生panic或被意外取消
    #[error("工作单元异常终止: {0}")]
    Aborted(String),
}

impl TaskError {
    /// 单元超时，或单元内部的最后一次调用超时
    pub fn is_timeout(&self) -> bool {
        match self {
            TaskError::Timeout(_) => true,
            TaskError::Failed(e) => crate::error::is_timeout(e),
            TaskError::Aborted(_) => false,
        }
    }

    /// 包含完整错误链的描述
    pub fn describe(&self) -> String {
        match self {
            TaskError::Failed(e) => format!("{:#}", e),
            other => other.to_string(),
        }
    }
}

/// 任务执行器
#[derive(Clone)]
pub struct TaskExecutor {
    semaphore: Arc<Semaphore>,
    workers: usize,
    unit_timeout: Duration,
}

impl TaskExecutor {
    /// 创建执行器，工作数被限制在 [2, 8]
    pub fn new(workers: usize, unit_timeout: Duration) -> Self {
        let workers = workers.clamp(MIN_WORKERS, MAX_WORKERS);
        Self {
            semaphore: Arc::new(Semaphore::new(workers)),
            workers,
            unit_timeout,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn unit_timeout(&self) -> Duration {
        self.unit_timeout
    }

    /// 提交一批工作单元并等待全部完成
    ///
    /// 每个单元恰好执行一次；单元失败、超时或 panic 都只影响它自己的结果位置。
    pub async fn submit<T, F>(&self, units: Vec<F>) -> Vec<Result<T, TaskError>>
    where
        T: Send + 'static,
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let total = units.len();
        debug!("📦 提交 {} 个工作单元，并发上限 {}", total, self.workers);

        let mut handles = Vec::with_capacity(total);
        for unit in units {
            let semaphore = self.semaphore.clone();
            let unit_timeout = self.unit_timeout;

            handles.push(tokio::spawn(async move {
                // 信号量在执行器存活期间不会关闭
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| TaskError::Aborted(e.to_string()))?;

                match tokio::time::timeout(unit_timeout, unit).await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => Err(TaskError::Failed(e)),
                    Err(_) => Err(TaskError::Timeout(unit_timeout)),
                }
            }));
        }

        let mut results = Vec::with_capacity(total);
        for (index, handle) in handles.into_iter().enumerate() {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(TaskError::Aborted(e.to_string())),
            };
            if let Err(e) = &result {
                warn!("⚠️ 工作单元 #{} 失败: {}", index + 1, e);
            }
            results.push(result);
        }

        results
    }
}
