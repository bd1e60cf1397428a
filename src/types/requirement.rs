use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 结构化采购需求
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, PartialEq, Default)]
pub struct RequirementRecord {
    /// 目标地区，只保留地名本身，例如 "武汉"
    pub geography: String,
    /// 核心业务，例如 "云仓储物流服务商"
    pub core_business: String,
    /// 特殊技术要求，例如 "冷链"、"自动化分拣"
    #[serde(default)]
    pub special_requirements: Vec<String>,
    /// 资质要求，例如 "消防资质"
    #[serde(default)]
    pub qualifications: Vec<String>,
    /// 供应商需要具备的能力，例如 "电商仓配一体"
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// 服务的行业细分，例如 "生鲜电商"
    #[serde(default)]
    pub industry_segments: Vec<String>,
    /// 其他约束，例如 "可开增值税专票"
    #[serde(default)]
    pub constraints: Vec<String>,
    /// 最低注册资本（万元）
    #[serde(default)]
    pub min_registered_capital: Option<f64>,
    /// 最低成立年限（年）
    #[serde(default)]
    pub min_years_established: Option<f64>,
}

impl RequirementRecord {
    /// 一行摘要，用于日志与报告标题
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{}{}", self.geography, self.core_business)];
        if !self.special_requirements.is_empty() {
            parts.push(format!("特殊要求: {}", self.special_requirements.join("、")));
        }
        if !self.qualifications.is_empty() {
            parts.push(format!("资质: {}", self.qualifications.join("、")));
        }
        parts.join("；")
    }
}
