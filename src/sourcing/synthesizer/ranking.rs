//! 综合适配度评分
//!
//! | 因素 | 满分 | 规则 |
//! |---|---|---|
//! | 财务风险 | 20 | 低20 / 中10 / 高0 / 未知5 |
//! | 诉讼风险 | 20 | 低20 / 中10 / 高0 / 未知5 |
//! | 成立年限 | 20 | 按年线性，20年封顶，未知0 |
//! | 注册资本 | 20 | log10(1+万元)/4，1亿封顶，未知0 |
//! | 资质匹配 | 20 | 需求要求的资质按命中比例计分，需求未提资质时不计 |
//! | 门槛达标 | 各10 | 达到需求中的最低注册资本、最低成立年限 |

use crate::types::qualification::{QualificationRecord, RiskLevel};
use crate::types::requirement::RequirementRecord;

const RISK_WEIGHT: f64 = 20.0;
const UNKNOWN_RISK_SCORE: f64 = 5.0;
const YEARS_WEIGHT: f64 = 20.0;
const YEARS_CAP: f64 = 20.0;
const CAPITAL_WEIGHT: f64 = 20.0;
const CERTIFICATE_WEIGHT: f64 = 20.0;
const THRESHOLD_BONUS: f64 = 10.0;

/// 资质描述中的泛称，匹配证书前去掉
const QUALIFICATION_NOISE: [&str; 5] = ["资质", "证书", "认证", "许可证", "资格"];

pub fn risk_score(level: Option<RiskLevel>) -> f64 {
    match level {
        Some(RiskLevel::Low) => RISK_WEIGHT,
        Some(RiskLevel::Medium) => RISK_WEIGHT / 2.0,
        Some(RiskLevel::High) => 0.0,
        None => UNKNOWN_RISK_SCORE,
    }
}

pub fn years_score(years: Option<f64>) -> f64 {
    years.map_or(0.0, |y| y.clamp(0.0, YEARS_CAP) / YEARS_CAP * YEARS_WEIGHT)
}

pub fn capital_score(capital_wan: Option<f64>) -> f64 {
    capital_wan.map_or(0.0, |c| {
        ((1.0 + c.max(0.0)).log10() / 4.0).min(1.0) * CAPITAL_WEIGHT
    })
}

/// 资质关键词，例如 "消防资质" → "消防"
pub fn qualification_keyword(qualification: &str) -> String {
    let mut keyword = qualification.trim().to_string();
    for noise in QUALIFICATION_NOISE {
        keyword = keyword.replace(noise, "");
    }
    if keyword.is_empty() {
        qualification.trim().to_string()
    } else {
        keyword
    }
}

/// 持有的需求资质数量
pub fn matched_qualifications(
    requirement: &RequirementRecord,
    record: &QualificationRecord,
) -> usize {
    requirement
        .qualifications
        .iter()
        .filter(|q| record.holds_certificate(&qualification_keyword(q)))
        .count()
}

pub fn certificate_score(requirement: &RequirementRecord, record: &QualificationRecord) -> f64 {
    let required = requirement.qualifications.len();
    if required == 0 {
        return 0.0;
    }
    matched_qualifications(requirement, record) as f64 / required as f64 * CERTIFICATE_WEIGHT
}

pub fn threshold_score(requirement: &RequirementRecord, record: &QualificationRecord) -> f64 {
    let meets = |minimum: Option<f64>, actual: Option<f64>| match (minimum, actual) {
        (Some(min), Some(actual)) if actual >= min => THRESHOLD_BONUS,
        _ => 0.0,
    };
    meets(
        requirement.min_registered_capital,
        record.registered_capital_wan,
    ) + meets(requirement.min_years_established, record.years_established)
}

/// 综合得分，保留一位小数
pub fn composite_score(requirement: &RequirementRecord, record: &QualificationRecord) -> f64 {
    let score = risk_score(record.financial_risk)
        + risk_score(record.litigation_risk)
        + years_score(record.years_established)
        + capital_score(record.registered_capital_wan)
        + certificate_score(requirement, record)
        + threshold_score(requirement, record);
    (score * 10.0).round() / 10.0
}

/// 按得分降序排列的下标，同分保持原有顺序
pub fn rank_order(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order
}
