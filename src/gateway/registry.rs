//! 工商信息服务适配

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use md5::{Digest, Md5};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RegistryConfig;
use crate::gateway::search::COMPANY_SUFFIXES;
use crate::types::supplier::normalize_company_name;

/// 查无结果的错误码
pub const NOT_FOUND_CODE: i64 = 300204;

/// 工商查询结果，查无此企业是正常结果而不是错误
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum RegistryLookup {
    Found(Box<CompanyProfile>),
    NotFound,
}

/// 成立日期，接口可能返回日期字符串或毫秒时间戳
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum EstablishTime {
    Millis(i64),
    Text(String),
}

/// 企业基本信息
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BaseInfo {
    pub name: String,
    pub reg_status: Option<String>,
    pub establish_time: Option<EstablishTime>,
    /// 例如 "500万人民币"
    pub reg_capital: Option<String>,
    /// 例如 "100-499人"
    pub staff_num_range: Option<String>,
    /// 参保人数
    pub social_staff_num: Option<u32>,
    pub business_scope: Option<String>,
    pub reg_location: Option<String>,
    pub industry: Option<String>,
}

/// 风险条目
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskItem {
    pub risk_type: String,
    pub risk_level: String,
    pub risk_content: Option<String>,
}

/// 年报中的经营数据
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnualReport {
    pub report_year: String,
    /// 例如 "3200万元"
    pub total_revenue: Option<String>,
}

/// 知识产权数量
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct IprCounts {
    pub trademarks: u32,
    pub patents: u32,
    pub software_copyrights: u32,
}

/// 汇总后的企业画像
///
/// 附属接口失败时对应字段为 None，基本信息失败则整体失败。
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct CompanyProfile {
    pub base: BaseInfo,
    pub risks: Option<Vec<RiskItem>>,
    pub intellectual_property: Option<IprCounts>,
    pub annual_reports: Vec<AnnualReport>,
    pub certificates: Option<Vec<String>>,
}

impl CompanyProfile {
    /// 风险或知识产权接口失败，画像不完整
    pub fn is_partial(&self) -> bool {
        self.risks.is_none() || self.intellectual_property.is_none()
    }
}

/// 工商信息接口
#[async_trait]
pub trait CompanyRegistryApi: Send + Sync {
    async fn lookup(&self, company_name: &str) -> Result<RegistryLookup>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    reason: String,
    result: Option<T>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RiskListResult {
    risk_list: Vec<RiskItem>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct IprResult {
    trademark: Vec<serde_json::Value>,
    patent: Vec<serde_json::Value>,
    software_copyright: Vec<serde_json::Value>,
}

/// 天眼查开放平台客户端
pub struct TianyanchaClient {
    http: reqwest::Client,
    api_token: String,
    base_url: String,
}

impl TianyanchaClient {
    pub fn new(config: &RegistryConfig, timeout: Duration) -> Result<Self> {
        if config.api_token.trim().is_empty() {
            return Err(anyhow!("使用真实工商API需要提供api_token"));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("创建工商HTTP客户端失败")?;
        Ok(Self {
            http,
            api_token: config.api_token.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn call<T>(&self, endpoint: &str, company_name: &str) -> Result<Envelope<T>>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .http
            .post(&url)
            .header("Authorization", &self.api_token)
            .json(&json!({ "keyword": company_name }))
            .send()
            .await
            .with_context(|| format!("工商API请求失败: {}", endpoint))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("工商API调用失败: {} ({})", status, endpoint));
        }
        response
            .json::<Envelope<T>>()
            .await
            .with_context(|| format!("工商API响应格式错误: {}", endpoint))
    }

    /// 附属接口失败只影响对应字段
    async fn optional<T>(&self, endpoint: &str, company_name: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        match self.call::<T>(endpoint, company_name).await {
            Ok(envelope) if envelope.error_code == 0 => envelope.result,
            Ok(envelope) => {
                warn!(
                    "⚠️ 工商接口 {} 返回错误 {}: {}",
                    endpoint, envelope.error_code, envelope.reason
                );
                None
            }
            Err(e) => {
                warn!("⚠️ 工商接口 {} 调用失败: {}", endpoint, e);
                None
            }
        }
    }
}

#[async_trait]
impl CompanyRegistryApi for TianyanchaClient {
    async fn lookup(&self, company_name: &str) -> Result<RegistryLookup> {
        debug!("🏢 天眼查查询: {}", company_name);
        let envelope = self
            .call::<BaseInfo>("ic/baseinfo/normal", company_name)
            .await?;

        match envelope.error_code {
            0 => {}
            NOT_FOUND_CODE => return Ok(RegistryLookup::NotFound),
            code => return Err(anyhow!("工商API返回错误 {}: {}", code, envelope.reason)),
        }
        let base = envelope
            .result
            .ok_or_else(|| anyhow!("工商API未返回企业基本信息"))?;

        let (risks, ipr) = tokio::join!(
            self.optional::<RiskListResult>("ic/risklist", company_name),
            self.optional::<IprResult>("ic/ipr", company_name),
        );

        // 年报财务数据与资质证书需要更高的接口权限
        Ok(RegistryLookup::Found(Box::new(CompanyProfile {
            base,
            risks: risks.map(|r| r.risk_list),
            intellectual_property: ipr.map(|ipr| IprCounts {
                trademarks: ipr.trademark.len() as u32,
                patents: ipr.patent.len() as u32,
                software_copyrights: ipr.software_copyright.len() as u32,
            }),
            annual_reports: Vec::new(),
            certificates: None,
        })))
    }

    fn name(&self) -> &'static str {
        "tianyancha"
    }
}

const MOCK_CAPITALS: [u32; 7] = [100, 200, 500, 800, 1000, 2000, 5000];
const MOCK_STAFF_RANGES: [&str; 6] = [
    "1-9人",
    "10-49人",
    "50-99人",
    "100-499人",
    "500-999人",
    "1000-4999人",
];
const MOCK_RISK_TYPES: [&str; 10] = [
    "经营异常",
    "行政处罚",
    "股权出质",
    "动产抵押",
    "欠税公告",
    "司法拍卖",
    "失信信息",
    "限制高消费",
    "终本案件",
    "被执行人",
];
const MOCK_RISK_LEVELS: [&str; 3] = ["低", "中", "高"];
const MOCK_SCOPES: [&str; 5] = [
    "仓储服务（不含危险化学品）;货物配送;供应链管理服务;物流信息咨询服务",
    "仓储服务;货物运输;快递服务;供应链管理;冷链物流服务",
    "物流园区管理;仓储服务;货物配送;物流信息平台运营;智能仓储系统开发",
    "现代物流服务;仓储管理;运输代理;消防设施工程;物流装备租赁",
    "云仓储服务;智能物流技术开发;仓储管理软件开发;电商仓储服务;代发货服务",
];

/// 模拟工商服务
///
/// 企业画像由名称的MD5确定，同一名称总是得到同一份数据。
/// 名称不带企业后缀或在缺失名单中时返回查无结果。
pub struct MockRegistry {
    missing: HashSet<String>,
    latency: Duration,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self {
            missing: HashSet::new(),
            latency: Duration::from_millis(100),
        }
    }

    /// 指定查无结果的企业名单
    pub fn with_missing<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.missing = names
            .into_iter()
            .map(|name| normalize_company_name(name.as_ref()))
            .collect();
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 根据名称生成确定性的企业画像
    pub fn profile_for(company_name: &str) -> CompanyProfile {
        let d = Md5::digest(normalize_company_name(company_name).as_bytes());
        let pick = |i: usize| d[i] as usize;

        let risk_count = pick(5) % 4;
        let risks = (0..risk_count)
            .map(|i| RiskItem {
                risk_type: MOCK_RISK_TYPES[(pick(6) + i * 3) % MOCK_RISK_TYPES.len()].to_string(),
                risk_level: MOCK_RISK_LEVELS[(pick(7) + i) % MOCK_RISK_LEVELS.len()].to_string(),
                risk_content: Some("模拟风险内容".to_string()),
            })
            .collect();

        let base_revenue = 1000 + (pick(11) * 256 + pick(12)) % 9000;
        let annual_reports = ["2023", "2022", "2021"]
            .iter()
            .enumerate()
            .map(|(i, year)| AnnualReport {
                report_year: year.to_string(),
                total_revenue: Some(format!("{}万元", base_revenue - i * 120)),
            })
            .collect();

        let mut certificates = Vec::new();
        if pick(13) % 2 == 0 {
            certificates.push("消防安全检查合格证".to_string());
        }
        if pick(14) % 3 == 0 {
            certificates.push("道路运输经营许可证".to_string());
        }

        CompanyProfile {
            base: BaseInfo {
                name: company_name.trim().to_string(),
                reg_status: Some("存续".to_string()),
                establish_time: Some(EstablishTime::Text(format!(
                    "{}-{:02}-{:02}",
                    2012 + pick(1) % 13,
                    1 + pick(2) % 12,
                    1 + pick(3) % 28
                ))),
                reg_capital: Some(format!(
                    "{}万人民币",
                    MOCK_CAPITALS[pick(0) % MOCK_CAPITALS.len()]
                )),
                staff_num_range: Some(
                    MOCK_STAFF_RANGES[pick(4) % MOCK_STAFF_RANGES.len()].to_string(),
                ),
                social_staff_num: Some(10 + pick(15) as u32),
                business_scope: Some(MOCK_SCOPES[pick(10) % MOCK_SCOPES.len()].to_string()),
                reg_location: None,
                industry: Some("交通运输、仓储和邮政业".to_string()),
            },
            risks: Some(risks),
            intellectual_property: Some(IprCounts {
                trademarks: (pick(8) % 6) as u32,
                patents: (pick(9) % 9) as u32,
                software_copyrights: (pick(10) % 4) as u32,
            }),
            annual_reports,
            certificates: Some(certificates),
        }
    }
}

impl Default for MockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompanyRegistryApi for MockRegistry {
    async fn lookup(&self, company_name: &str) -> Result<RegistryLookup> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let normalized = normalize_company_name(company_name);
        let has_suffix = COMPANY_SUFFIXES.iter().any(|s| normalized.ends_with(s));
        if !has_suffix || self.missing.contains(&normalized) {
            return Ok(RegistryLookup::NotFound);
        }
        Ok(RegistryLookup::Found(Box::new(Self::profile_for(
            company_name,
        ))))
    }

    fn name(&self) -> &'static str {
        "mock-registry"
    }
}
