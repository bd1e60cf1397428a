use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// 风险等级
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// 解析工商数据中的风险等级描述
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.contains('高') || text.eq_ignore_ascii_case("high") {
            Some(RiskLevel::High)
        } else if text.contains('中') || text.eq_ignore_ascii_case("medium") {
            Some(RiskLevel::Medium)
        } else if text.contains('低') || text.eq_ignore_ascii_case("low") {
            Some(RiskLevel::Low)
        } else {
            None
        }
    }
}

impl Display for RiskLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "低"),
            RiskLevel::Medium => write!(f, "中"),
            RiskLevel::High => write!(f, "高"),
        }
    }
}

/// 员工规模区间
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HeadcountBracket {
    /// 1-49人
    Micro,
    /// 50-99人
    Small,
    /// 100-499人
    Medium,
    /// 500-999人
    Large,
    /// 1000人以上
    Enterprise,
}

impl HeadcountBracket {
    pub fn from_headcount(headcount: u32) -> Self {
        match headcount {
            0..=49 => HeadcountBracket::Micro,
            50..=99 => HeadcountBracket::Small,
            100..=499 => HeadcountBracket::Medium,
            500..=999 => HeadcountBracket::Large,
            _ => HeadcountBracket::Enterprise,
        }
    }
}

impl Display for HeadcountBracket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            HeadcountBracket::Micro => "1-49人",
            HeadcountBracket::Small => "50-99人",
            HeadcountBracket::Medium => "100-499人",
            HeadcountBracket::Large => "500-999人",
            HeadcountBracket::Enterprise => "1000人以上",
        };
        write!(f, "{}", label)
    }
}

/// 年销售额区间
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RevenueBracket {
    /// 1000万以下
    UnderTenMillion,
    /// 1000万-5000万
    TenToFiftyMillion,
    /// 5000万-1亿
    FiftyToHundredMillion,
    /// 1亿-10亿
    HundredMillionToBillion,
    /// 10亿以上
    OverBillion,
}

impl RevenueBracket {
    /// 按万元金额划分区间
    pub fn from_wan(amount_wan: f64) -> Self {
        if amount_wan < 1_000.0 {
            RevenueBracket::UnderTenMillion
        } else if amount_wan < 5_000.0 {
            RevenueBracket::TenToFiftyMillion
        } else if amount_wan < 10_000.0 {
            RevenueBracket::FiftyToHundredMillion
        } else if amount_wan < 100_000.0 {
            RevenueBracket::HundredMillionToBillion
        } else {
            RevenueBracket::OverBillion
        }
    }
}

impl Display for RevenueBracket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RevenueBracket::UnderTenMillion => "1000万以下",
            RevenueBracket::TenToFiftyMillion => "1000万-5000万",
            RevenueBracket::FiftyToHundredMillion => "5000万-1亿",
            RevenueBracket::HundredMillionToBillion => "1亿-10亿",
            RevenueBracket::OverBillion => "10亿以上",
        };
        write!(f, "{}", label)
    }
}

/// 工商核验状态
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum LookupStatus {
    Verified,
    /// 工商库中查无此企业
    NotFound,
    /// 重试耗尽后仍失败
    Failed(String),
    TimedOut,
}

impl LookupStatus {
    pub fn is_verified(&self) -> bool {
        matches!(self, LookupStatus::Verified)
    }
}

impl Display for LookupStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupStatus::Verified => write!(f, "已核验"),
            LookupStatus::NotFound => write!(f, "查无结果"),
            LookupStatus::Failed(reason) => write!(f, "核验失败: {}", reason),
            LookupStatus::TimedOut => write!(f, "核验超时"),
        }
    }
}

/// 知识产权数量
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntellectualProperty {
    pub trademarks: u32,
    pub patents: u32,
    pub software_copyrights: u32,
}

impl IntellectualProperty {
    pub fn total(&self) -> u32 {
        self.trademarks + self.patents + self.software_copyrights
    }
}

/// 归一化后的企业资质记录
///
/// 每个字段都可能未知；核验失败时整条记录除名称与状态外全部为空。
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QualificationRecord {
    pub company_name: String,
    pub status: LookupStatus,
    /// 注册资本（万元人民币）
    pub registered_capital_wan: Option<f64>,
    /// 成立年限（年，保留一位小数）
    pub years_established: Option<f64>,
    pub headcount: Option<HeadcountBracket>,
    /// 参保人数
    pub insured_staff: Option<u32>,
    pub financial_risk: Option<RiskLevel>,
    pub litigation_risk: Option<RiskLevel>,
    pub annual_revenue: Option<RevenueBracket>,
    pub certificates: Option<Vec<String>>,
    pub intellectual_property: Option<IntellectualProperty>,
    pub business_scope: Option<String>,
}

impl QualificationRecord {
    /// 所有字段未知的记录
    pub fn unknown(company_name: impl Into<String>, status: LookupStatus) -> Self {
        Self {
            company_name: company_name.into(),
            status,
            registered_capital_wan: None,
            years_established: None,
            headcount: None,
            insured_staff: None,
            financial_risk: None,
            litigation_risk: None,
            annual_revenue: None,
            certificates: None,
            intellectual_property: None,
            business_scope: None,
        }
    }

    /// 是否持有名称包含指定关键词的证书
    pub fn holds_certificate(&self, keyword: &str) -> bool {
        self.certificates
            .as_ref()
            .is_some_and(|certs| certs.iter().any(|c| c.contains(keyword)))
    }
}
