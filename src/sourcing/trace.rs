//! 执行轨迹与阶段计时

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::cache::CachePerformanceReport;
use crate::types::qualification::LookupStatus;
use crate::types::supplier::SearchDimension;

/// 单个查询的执行结果
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QueryOutcome {
    Succeeded { hits: usize },
    Failed { reason: String },
    TimedOut,
}

impl QueryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, QueryOutcome::Succeeded { .. })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QueryTrace {
    pub dimension: SearchDimension,
    pub keywords: String,
    #[serde(flatten)]
    pub outcome: QueryOutcome,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LookupTrace {
    pub company_name: String,
    pub status: LookupStatus,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StageTiming {
    pub stage: String,
    pub seconds: f64,
}

/// 一次运行的执行轨迹
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExecutionTrace {
    pub run_id: Uuid,
    pub started_at: DateTime<Local>,
    pub search_backend: String,
    pub registry_backend: String,
    pub queries: Vec<QueryTrace>,
    /// 去重后的候选数量（截断前）
    pub candidates_found: usize,
    pub candidates_retained: usize,
    pub lookups: Vec<LookupTrace>,
    pub stage_timings: Vec<StageTiming>,
    pub total_seconds: f64,
    pub cache: Option<CachePerformanceReport>,
    /// 各阶段吸收的非致命问题
    pub notes: Vec<String>,
}

impl ExecutionTrace {
    pub fn new(search_backend: &str, registry_backend: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Local::now(),
            search_backend: search_backend.to_string(),
            registry_backend: registry_backend.to_string(),
            queries: Vec::new(),
            candidates_found: 0,
            candidates_retained: 0,
            lookups: Vec::new(),
            stage_timings: Vec::new(),
            total_seconds: 0.0,
            cache: None,
            notes: Vec::new(),
        }
    }

    pub fn succeeded_queries(&self) -> usize {
        self.queries.iter().filter(|q| q.outcome.is_success()).count()
    }

    pub fn verified_lookups(&self) -> usize {
        self.lookups.iter().filter(|l| l.status.is_verified()).count()
    }

    pub fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }

    /// 写入计时结果
    pub fn absorb_timing(&mut self, timing: &TimingScope) {
        self.stage_timings = TimingKeys::get_all_phase_keys()
            .into_iter()
            .filter_map(|key| {
                timing.get_phase_durations().get(key).map(|d| StageTiming {
                    stage: key.to_string(),
                    seconds: d.as_secs_f64(),
                })
            })
            .collect();
        self.total_seconds = timing.get_total_duration().as_secs_f64();
    }
}

/// 时间跟踪作用域
pub struct TimingScope {
    start_time: Instant,
    phase_start_times: HashMap<String, Instant>,
    phase_durations: HashMap<String, Duration>,
}

impl Default for TimingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingScope {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            phase_start_times: HashMap::new(),
            phase_durations: HashMap::new(),
        }
    }

    /// 开始一个新的阶段计时
    pub fn start_phase(&mut self, phase_name: &str) {
        self.phase_start_times
            .insert(phase_name.to_string(), Instant::now());
    }

    /// 结束一个阶段的计时
    pub fn end_phase(&mut self, phase_name: &str) -> Option<Duration> {
        let start_time = self.phase_start_times.remove(phase_name)?;
        let duration = start_time.elapsed();
        self.phase_durations
            .insert(phase_name.to_string(), duration);
        Some(duration)
    }

    /// 获取总执行时间
    pub fn get_total_duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn get_phase_durations(&self) -> &HashMap<String, Duration> {
        &self.phase_durations
    }
}

/// 阶段计时键
pub struct TimingKeys;

impl TimingKeys {
    pub const PARSE: &'static str = "parse";
    pub const SEARCH: &'static str = "search";
    pub const VALIDATE: &'static str = "validate";
    pub const SYNTHESIZE: &'static str = "synthesize";

    /// 获取所有阶段的键列表
    pub fn get_all_phase_keys() -> Vec<&'static str> {
        vec![Self::PARSE, Self::SEARCH, Self::VALIDATE, Self::SYNTHESIZE]
    }
}
