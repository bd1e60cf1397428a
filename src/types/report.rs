use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::sourcing::trace::ExecutionTrace;
use crate::types::requirement::RequirementRecord;

/// 数据缺失时的统一标记
pub const UNKNOWN_MARKER: &str = "未知";

/// 对比表的15项指标，顺序即报告中的列顺序
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    RegisteredCapital,
    YearsEstablished,
    CompanySize,
    SalesContact,
    PriceLevel,
    FinancialRisk,
    LitigationRisk,
    AnnualRevenue,
    FireSafetyQualification,
    SelfOperatedStaff,
    WarehouseArea,
    EcommerceClients,
    AutomationLevel,
    Reputation,
    BusinessModel,
}

impl MetricName {
    pub const ALL: [MetricName; 15] = [
        MetricName::RegisteredCapital,
        MetricName::YearsEstablished,
        MetricName::CompanySize,
        MetricName::SalesContact,
        MetricName::PriceLevel,
        MetricName::FinancialRisk,
        MetricName::LitigationRisk,
        MetricName::AnnualRevenue,
        MetricName::FireSafetyQualification,
        MetricName::SelfOperatedStaff,
        MetricName::WarehouseArea,
        MetricName::EcommerceClients,
        MetricName::AutomationLevel,
        MetricName::Reputation,
        MetricName::BusinessModel,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MetricName::RegisteredCapital => "注册资本",
            MetricName::YearsEstablished => "成立年限",
            MetricName::CompanySize => "公司规模",
            MetricName::SalesContact => "销售联系人&联系方式",
            MetricName::PriceLevel => "价格水平",
            MetricName::FinancialRisk => "财务风险",
            MetricName::LitigationRisk => "诉讼风险",
            MetricName::AnnualRevenue => "年销售额",
            MetricName::FireSafetyQualification => "消防资质",
            MetricName::SelfOperatedStaff => "自有运营人数",
            MetricName::WarehouseArea => "自营云仓总面积",
            MetricName::EcommerceClients => "电商客户合作数量",
            MetricName::AutomationLevel => "仓内自动化程度",
            MetricName::Reputation => "企业口碑",
            MetricName::BusinessModel => "商业模式",
        }
    }
}

impl Display for MetricName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 指标数据来源
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Search,
    Registry,
    Derived,
    Unknown,
}

impl Display for DataSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Search => write!(f, "搜索"),
            DataSource::Registry => write!(f, "工商"),
            DataSource::Derived => write!(f, "推导"),
            DataSource::Unknown => write!(f, "-"),
        }
    }
}

/// 单项指标取值
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MetricValue {
    pub metric: MetricName,
    pub value: String,
    pub source: DataSource,
}

impl MetricValue {
    pub fn known(metric: MetricName, value: impl Into<String>, source: DataSource) -> Self {
        Self {
            metric,
            value: value.into(),
            source,
        }
    }

    pub fn unknown(metric: MetricName) -> Self {
        Self {
            metric,
            value: UNKNOWN_MARKER.to_string(),
            source: DataSource::Unknown,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.source == DataSource::Unknown
    }
}

/// 对比表中的一行
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ComparisonRow {
    /// 排名，从1开始
    pub rank: usize,
    pub company_name: String,
    /// 综合适配度得分
    pub score: f64,
    /// 固定15项，顺序与 [`MetricName::ALL`] 一致
    pub metrics: Vec<MetricValue>,
}

impl ComparisonRow {
    /// 按固定顺序逐项求值，保证每行恰好15项
    pub fn build<F>(company_name: impl Into<String>, mut resolve: F) -> Self
    where
        F: FnMut(MetricName) -> Option<(String, DataSource)>,
    {
        let metrics = MetricName::ALL
            .iter()
            .map(|&metric| match resolve(metric) {
                Some((value, source)) if !value.trim().is_empty() => {
                    MetricValue::known(metric, value, source)
                }
                _ => MetricValue::unknown(metric),
            })
            .collect();

        Self {
            rank: 0,
            company_name: company_name.into(),
            score: 0.0,
            metrics,
        }
    }

    pub fn get(&self, metric: MetricName) -> Option<&MetricValue> {
        self.metrics.iter().find(|m| m.metric == metric)
    }

    pub fn unknown_count(&self) -> usize {
        self.metrics.iter().filter(|m| m.is_unknown()).count()
    }
}

/// 建议的生成方式
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdviceOrigin {
    Llm,
    RuleBased,
}

/// 采购建议与风险提示
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProcurementAdvice {
    pub summary: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub risk_flags: Vec<String>,
    #[serde(skip_deserializing, default = "default_origin")]
    pub origin: AdviceOrigin,
}

fn default_origin() -> AdviceOrigin {
    AdviceOrigin::Llm
}

/// 最终报告
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Report {
    pub requirement: RequirementRecord,
    pub trace: ExecutionTrace,
    pub rows: Vec<ComparisonRow>,
    pub advice: ProcurementAdvice,
}
