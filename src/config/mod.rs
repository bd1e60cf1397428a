use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use crate::error::SourcingError;

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "moonshot")]
    Moonshot,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Moonshot => write!(f, "moonshot"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "moonshot" => Ok(LLMProvider::Moonshot),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// LLM模型配置
    pub llm: LLMConfig,

    /// 博查搜索API配置
    pub search: SearchConfig,

    /// 天眼查工商API配置
    pub registry: RegistryConfig,

    /// 工作流配置
    pub workflow: WorkflowConfig,

    /// 缓存配置
    pub cache: CacheConfig,

    /// 日志级别 (error, warn, info, debug, trace)
    pub log_level: String,

    /// 报告输出路径（Markdown），不设置时只输出到控制台
    pub output_path: Option<PathBuf>,

    /// 以JSON格式输出报告
    pub json_output: bool,

    /// 启动时检查模型连接
    pub check_llm: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址，可包含 `{region}` 占位符
    pub api_base_url: String,

    /// 模型部署区域
    pub region: String,

    /// 模型标识
    pub model: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,
}

/// 搜索API配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub api_key: String,
    pub base_url: String,
    /// 使用本地模拟搜索数据
    pub use_mock: bool,
    /// 每个查询请求的结果数量（最多50）
    pub results_per_query: u32,
    /// 搜索时间范围 (noLimit, day, week, month, year)
    pub freshness: String,
}

/// 工商API配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RegistryConfig {
    pub api_token: String,
    pub base_url: String,
    /// 使用模拟工商数据
    pub use_mock: bool,
}

/// 工作流配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct WorkflowConfig {
    /// 最多分析的供应商数量
    pub max_suppliers: usize,

    /// 并发工作单元数量（2-8）
    pub workers: usize,

    /// 单次外部调用超时时间（秒）
    pub timeout_seconds: u64,

    /// 外部调用最大尝试次数
    pub max_retries: u32,

    /// 重试基础间隔（毫秒），按指数退避
    pub retry_delay_ms: u64,
}

/// 缓存配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// 是否启用缓存
    pub enabled: bool,

    /// 缓存过期时间（分钟）
    pub ttl_minutes: u64,
}

pub const MIN_WORKERS: usize = 2;
pub const MAX_WORKERS: usize = 8;

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 读取 `.env` 与环境变量，覆盖当前配置
    pub fn apply_env(&mut self) -> Result<(), SourcingError> {
        let _ = dotenvy::dotenv();
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// 按名称查找变量并覆盖配置，便于在测试中注入变量表
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), SourcingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BOCHA_API_KEY") {
            self.search.api_key = v;
        }
        if let Some(v) = lookup("BOCHA_BASE_URL") {
            self.search.base_url = v;
        }
        if let Some(v) = lookup("BOCHA_USE_MOCK") {
            self.search.use_mock = parse_flag("BOCHA_USE_MOCK", &v)?;
        }
        if let Some(v) = lookup("TIANYANCHA_API_TOKEN") {
            self.registry.api_token = v;
        }
        if let Some(v) = lookup("TIANYANCHA_BASE_URL") {
            self.registry.base_url = v;
        }
        if let Some(v) = lookup("TIANYANCHA_USE_MOCK") {
            self.registry.use_mock = parse_flag("TIANYANCHA_USE_MOCK", &v)?;
        }
        if let Some(v) = lookup("LLM_PROVIDER") {
            self.llm.provider = v
                .parse()
                .map_err(|e: String| SourcingError::Configuration(e))?;
        }
        if let Some(v) = lookup("LLM_API_KEY") {
            self.llm.api_key = v;
        }
        if let Some(v) = lookup("LLM_API_BASE_URL") {
            self.llm.api_base_url = v;
        }
        if let Some(v) = lookup("LLM_REGION") {
            self.llm.region = v;
        }
        if let Some(v) = lookup("LLM_MODEL_ID") {
            self.llm.model = v;
        }
        if let Some(v) = lookup("MAX_SUPPLIERS_TO_ANALYZE") {
            self.workflow.max_suppliers = parse_number("MAX_SUPPLIERS_TO_ANALYZE", &v)?;
        }
        if let Some(v) = lookup("SOURCING_WORKERS") {
            self.workflow.workers = parse_number("SOURCING_WORKERS", &v)?;
        }
        if let Some(v) = lookup("API_TIMEOUT_SECONDS") {
            self.workflow.timeout_seconds = parse_number("API_TIMEOUT_SECONDS", &v)?;
        }
        if let Some(v) = lookup("MAX_RETRIES") {
            self.workflow.max_retries = parse_number("MAX_RETRIES", &v)?;
        }
        if let Some(v) = lookup("CACHE_TTL_MINUTES") {
            self.cache.ttl_minutes = parse_number("CACHE_TTL_MINUTES", &v)?;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log_level = v.to_lowercase();
        }
        Ok(())
    }

    /// 运行前校验配置，任何外部调用发生之前失败
    pub fn validate(&self) -> Result<(), SourcingError> {
        let workflow = &self.workflow;
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&workflow.workers) {
            return Err(SourcingError::Configuration(format!(
                "并发数 {} 超出允许范围 [{}, {}]",
                workflow.workers, MIN_WORKERS, MAX_WORKERS
            )));
        }
        if workflow.max_suppliers == 0 {
            return Err(SourcingError::Configuration(
                "最多分析的供应商数量必须大于0".to_string(),
            ));
        }
        if workflow.timeout_seconds == 0 {
            return Err(SourcingError::Configuration(
                "超时时间必须大于0".to_string(),
            ));
        }
        if workflow.max_retries == 0 {
            return Err(SourcingError::Configuration(
                "最大尝试次数必须大于0".to_string(),
            ));
        }
        if !self.search.use_mock && self.search.api_key.trim().is_empty() {
            return Err(SourcingError::Configuration(
                "未配置 BOCHA_API_KEY，且未启用模拟搜索".to_string(),
            ));
        }
        if !self.registry.use_mock && self.registry.api_token.trim().is_empty() {
            return Err(SourcingError::Configuration(
                "使用真实天眼查API需要提供 TIANYANCHA_API_TOKEN".to_string(),
            ));
        }
        if self.llm.provider != LLMProvider::Ollama && self.llm.api_key.trim().is_empty() {
            return Err(SourcingError::Configuration(format!(
                "模型服务 {} 需要提供 LLM_API_KEY",
                self.llm.provider
            )));
        }
        if self.llm.model.trim().is_empty() {
            return Err(SourcingError::Configuration("未配置模型标识".to_string()));
        }
        if !matches!(
            self.log_level.as_str(),
            "error" | "warn" | "info" | "debug" | "trace"
        ) {
            return Err(SourcingError::Configuration(format!(
                "未知的日志级别: {}",
                self.log_level
            )));
        }
        Ok(())
    }
}

impl LLMConfig {
    /// 替换区域占位符后的API基地址
    pub fn resolved_base_url(&self) -> String {
        self.api_base_url.replace("{region}", &self.region)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, SourcingError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(SourcingError::Configuration(format!(
            "环境变量 {} 的值 '{}' 无法转换为布尔值",
            name, other
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, SourcingError> {
    value.trim().parse::<T>().map_err(|_| {
        SourcingError::Configuration(format!(
            "环境变量 {} 的值 '{}' 无法转换为数字",
            name, value
        ))
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LLMConfig::default(),
            search: SearchConfig::default(),
            registry: RegistryConfig::default(),
            workflow: WorkflowConfig::default(),
            cache: CacheConfig::default(),
            log_level: String::from("info"),
            output_path: None,
            json_output: false,
            check_llm: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: String::new(),
            api_base_url: String::from("https://api.openai.com/v1"),
            region: String::from("us-east-1"),
            model: String::from("gpt-4o-mini"),
            max_tokens: 8192,
            temperature: 0.1,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: String::from("https://api.bochaai.com/v1"),
            use_mock: false,
            results_per_query: 15,
            freshness: String::from("month"),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            base_url: String::from("https://open.tianyancha.com/services/open"),
            use_mock: true,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_suppliers: 5,
            workers: 4,
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_ms: 500,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_minutes: 60,
        }
    }
}
