//! 单元测试共用的替身实现

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::llm::TextCompletionService;

/// 按顺序返回预设回复的补全服务
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicUsize,
}

impl ScriptedCompletion {
    pub fn new(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextCompletionService for ScriptedCompletion {
    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .replies
            .lock()
            .map_err(|_| anyhow!("脚本锁已损坏"))?
            .pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(reason)) => Err(anyhow!(reason)),
            None => Err(anyhow!("脚本回复已用完")),
        }
    }
}
