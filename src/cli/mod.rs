use crate::config::{Config, LLMProvider};
use crate::error::SourcingError;
use clap::Parser;
use std::path::PathBuf;

/// 默认配置文件名，位于当前目录
const DEFAULT_CONFIG_FILE: &str = "sourcing.toml";

/// Sourcing-RS - 由Rust与AI驱动的供应商寻源助手
#[derive(Parser, Debug)]
#[command(name = "sourcing-rs")]
#[command(
    about = "AI-assisted supplier sourcing: parses a procurement requirement, searches and validates candidate suppliers, and produces a 15-metric comparison report with procurement advice."
)]
#[command(version)]
pub struct Args {
    /// 采购需求描述，例如 "寻找武汉地区的云仓储物流服务商，注册资本500万以上"
    pub requirement: String,

    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 最多分析的供应商数量
    #[arg(long)]
    pub max_suppliers: Option<usize>,

    /// 并发数（2-8）
    #[arg(long)]
    pub workers: Option<usize>,

    /// 单次外部调用超时（秒）
    #[arg(long)]
    pub timeout: Option<u64>,

    /// 外部调用最大尝试次数
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// 缓存过期时间（分钟）
    #[arg(long)]
    pub cache_ttl: Option<u64>,

    /// 是否禁用缓存
    #[arg(long)]
    pub no_cache: bool,

    /// 搜索与工商查询都使用模拟数据
    #[arg(long)]
    pub mock: bool,

    /// 使用模拟搜索
    #[arg(long)]
    pub mock_search: bool,

    /// 使用模拟工商数据
    #[arg(long)]
    pub mock_registry: bool,

    /// LLM Provider (openai, moonshot, deepseek, anthropic, ollama)
    #[arg(long)]
    pub llm_provider: Option<String>,

    /// 模型标识
    #[arg(long)]
    pub llm_model: Option<String>,

    /// LLM API KEY
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// LLM API基地址
    #[arg(long)]
    pub llm_api_base_url: Option<String>,

    /// 模型部署区域
    #[arg(long)]
    pub llm_region: Option<String>,

    /// 报告保存路径，扩展名为 .json 时保存JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 以JSON格式输出到控制台
    #[arg(long)]
    pub json: bool,

    /// 启动时检查模型连接
    #[arg(long)]
    pub check_llm: bool,

    /// 是否启用详细日志
    #[arg(short, long)]
    pub verbose: bool,

    /// 日志级别 (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Args {
    /// 将CLI参数转换为配置
    ///
    /// 优先级从低到高：配置文件、`.env` 与环境变量、命令行参数。
    pub fn into_config(self) -> Result<Config, SourcingError> {
        let mut config = match &self.config {
            // 显式指定的配置文件必须可读
            Some(config_path) => Config::from_file(config_path).map_err(|e| {
                SourcingError::Configuration(format!(
                    "无法读取配置文件 {}: {:#}",
                    config_path.display(),
                    e
                ))
            })?,
            None => {
                let default_config_path = std::env::current_dir()
                    .unwrap_or_else(|_| PathBuf::from("."))
                    .join(DEFAULT_CONFIG_FILE);
                if default_config_path.exists() {
                    Config::from_file(&default_config_path).map_err(|e| {
                        SourcingError::Configuration(format!(
                            "无法读取默认配置文件 {}: {:#}",
                            default_config_path.display(),
                            e
                        ))
                    })?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env()?;
        self.apply_to(&mut config)?;
        Ok(config)
    }

    /// 用命令行参数覆盖配置
    pub fn apply_to(self, config: &mut Config) -> Result<(), SourcingError> {
        // 覆盖LLM配置
        if let Some(provider_str) = self.llm_provider {
            config.llm.provider = provider_str
                .parse::<LLMProvider>()
                .map_err(SourcingError::Configuration)?;
        }
        if let Some(model) = self.llm_model {
            config.llm.model = model;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(region) = self.llm_region {
            config.llm.region = region;
        }

        // 工作流配置
        if let Some(max_suppliers) = self.max_suppliers {
            config.workflow.max_suppliers = max_suppliers;
        }
        if let Some(workers) = self.workers {
            config.workflow.workers = workers;
        }
        if let Some(timeout) = self.timeout {
            config.workflow.timeout_seconds = timeout;
        }
        if let Some(max_retries) = self.max_retries {
            config.workflow.max_retries = max_retries;
        }

        // 缓存配置
        if let Some(ttl) = self.cache_ttl {
            config.cache.ttl_minutes = ttl;
        }
        if self.no_cache {
            config.cache.enabled = false;
        }

        // 模拟数据源
        if self.mock || self.mock_search {
            config.search.use_mock = true;
        }
        if self.mock || self.mock_registry {
            config.registry.use_mock = true;
        }

        // 输出与日志
        if let Some(output) = self.output {
            config.output_path = Some(output);
        }
        if self.json {
            config.json_output = true;
        }
        if self.check_llm {
            config.check_llm = true;
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level.to_lowercase();
        }
        if self.verbose {
            config.log_level = String::from("debug");
        }
        Ok(())
    }
}
