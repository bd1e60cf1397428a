//! 资质校验阶段：候选供应商 → 归一化的工商资质记录

use chrono::{DateTime, Local, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{info, warn};

use crate::error::SourcingError;
use crate::gateway::registry::{CompanyProfile, EstablishTime, RegistryLookup, RiskItem};
use crate::sourcing::context::SourcingContext;
use crate::sourcing::trace::{ExecutionTrace, LookupTrace};
use crate::types::qualification::{
    HeadcountBracket, IntellectualProperty, LookupStatus, QualificationRecord, RevenueBracket,
    RiskLevel,
};
use crate::types::supplier::CandidateSupplier;

static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:,\d{3})*(?:\.\d+)?)\s*(亿|万)?").unwrap());
static FIRST_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// 与财务状况相关的风险类型
const FINANCIAL_RISK_TYPES: [&str; 6] = [
    "欠税公告",
    "股权出质",
    "动产抵押",
    "经营异常",
    "司法拍卖",
    "清算信息",
];

/// 与诉讼、执行相关的风险类型
const LITIGATION_RISK_TYPES: [&str; 8] = [
    "失信信息",
    "限制高消费",
    "终本案件",
    "被执行人",
    "开庭公告",
    "裁判文书",
    "立案信息",
    "行政处罚",
];

/// 执行校验阶段
///
/// 每家候选企业一次工商查询；单家失败只会让该企业的字段全部未知，不会终止运行。
pub async fn execute(
    context: &SourcingContext,
    candidates: &[CandidateSupplier],
    trace: &mut ExecutionTrace,
) -> Vec<QualificationRecord> {
    let units: Vec<_> = candidates
        .iter()
        .map(|candidate| {
            let gateway = context.registry.clone();
            let name = candidate.name.clone();
            async move { gateway.lookup(&name).await }
        })
        .collect();
    let outcomes = context.executor.submit(units).await;

    let today = Local::now().date_naive();
    let records: Vec<QualificationRecord> = candidates
        .iter()
        .zip(outcomes)
        .map(|(candidate, outcome)| {
            let record = match outcome {
                Ok(RegistryLookup::Found(profile)) => {
                    normalize_profile(&candidate.name, &profile, today)
                }
                Ok(RegistryLookup::NotFound) => {
                    QualificationRecord::unknown(&candidate.name, LookupStatus::NotFound)
                }
                Err(e) if e.is_timeout() => {
                    trace.note(format!("工商查询 \"{}\": {}", candidate.name, e.describe()));
                    QualificationRecord::unknown(&candidate.name, LookupStatus::TimedOut)
                }
                Err(e) => {
                    let error = SourcingError::ValidationLookup {
                        company: candidate.name.clone(),
                        reason: e.describe(),
                    };
                    warn!("⚠️ {}", error);
                    QualificationRecord::unknown(&candidate.name, LookupStatus::Failed(e.describe()))
                }
            };
            trace.lookups.push(LookupTrace {
                company_name: candidate.name.clone(),
                status: record.status.clone(),
            });
            record
        })
        .collect();

    info!(
        "✅ 资质校验完成: {} / {} 家核验成功",
        trace.verified_lookups(),
        records.len()
    );
    records
}

/// 把工商画像归一化为资质记录
pub fn normalize_profile(
    company_name: &str,
    profile: &CompanyProfile,
    today: NaiveDate,
) -> QualificationRecord {
    let base = &profile.base;
    let risks = profile.risks.as_deref();

    QualificationRecord {
        company_name: company_name.to_string(),
        status: LookupStatus::Verified,
        registered_capital_wan: base.reg_capital.as_deref().and_then(parse_capital_wan),
        years_established: base
            .establish_time
            .as_ref()
            .and_then(parse_establish_date)
            .and_then(|founded| years_between(founded, today)),
        headcount: base
            .staff_num_range
            .as_deref()
            .and_then(parse_headcount)
            .map(HeadcountBracket::from_headcount),
        insured_staff: base.social_staff_num,
        financial_risk: risks.map(|items| max_risk(items, &FINANCIAL_RISK_TYPES)),
        litigation_risk: risks.map(|items| max_risk(items, &LITIGATION_RISK_TYPES)),
        annual_revenue: latest_revenue_wan(profile).map(RevenueBracket::from_wan),
        certificates: profile.certificates.clone(),
        intellectual_property: profile.intellectual_property.map(|ip| IntellectualProperty {
            trademarks: ip.trademarks,
            patents: ip.patents,
            software_copyrights: ip.software_copyrights,
        }),
        business_scope: base
            .business_scope
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    }
}

/// 金额文本换算为万元人民币
///
/// 支持 "500万人民币"、"1.2亿元"、"3000000元"、"100万美元" 等形式，外币按近似汇率折算。
pub fn parse_capital_wan(text: &str) -> Option<f64> {
    let caps = AMOUNT_RE.captures(text)?;
    let amount: f64 = caps[1].replace(',', "").parse().ok()?;
    let in_wan = match caps.get(2).map(|m| m.as_str()) {
        Some("亿") => amount * 10_000.0,
        Some(_) => amount,
        None => amount / 10_000.0,
    };

    let rate = if text.contains("美元") {
        7.1
    } else if text.contains("港元") || text.contains("港币") {
        0.91
    } else if text.contains("欧元") {
        7.7
    } else {
        1.0
    };
    Some((in_wan * rate * 100.0).round() / 100.0)
}

/// 解析成立日期，支持 "YYYY-MM-DD" 与毫秒时间戳
pub fn parse_establish_date(value: &EstablishTime) -> Option<NaiveDate> {
    match value {
        EstablishTime::Millis(ms) => {
            DateTime::from_timestamp_millis(*ms).map(|dt| dt.with_timezone(&Local).date_naive())
        }
        EstablishTime::Text(text) => {
            let text = text.trim();
            let date_part = text.get(..10).unwrap_or(text);
            NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
                .ok()
                .or_else(|| text.parse::<i64>().ok().and_then(|ms| {
                    parse_establish_date(&EstablishTime::Millis(ms))
                }))
        }
    }
}

/// 成立至今的年数，保留一位小数
pub fn years_between(founded: NaiveDate, today: NaiveDate) -> Option<f64> {
    let days = (today - founded).num_days();
    if days < 0 {
        return None;
    }
    Some((days as f64 / 365.25 * 10.0).round() / 10.0)
}

/// 取人员规模描述中的下限，例如 "100-499人" → 100
pub fn parse_headcount(text: &str) -> Option<u32> {
    let first: u32 = FIRST_NUMBER_RE.find(text)?.as_str().parse().ok()?;
    // "小于50人" 这类描述落在最低档
    if text.contains("小于") || text.contains("少于") {
        return Some(1);
    }
    Some(first.max(1))
}

/// 指定类型风险中的最高等级，没有相关风险时为低
fn max_risk(items: &[RiskItem], types: &[&str]) -> RiskLevel {
    items
        .iter()
        .filter(|item| types.iter().any(|t| item.risk_type.contains(t)))
        .map(|item| RiskLevel::parse(&item.risk_level).unwrap_or(RiskLevel::Medium))
        .max()
        .unwrap_or(RiskLevel::Low)
}

/// 最近一年年报中的营业收入（万元）
fn latest_revenue_wan(profile: &CompanyProfile) -> Option<f64> {
    profile
        .annual_reports
        .iter()
        .filter_map(|report| {
            let revenue = parse_capital_wan(report.total_revenue.as_deref()?)?;
            Some((report.report_year.as_str(), revenue))
        })
        .max_by(|a, b| a.0.cmp(b.0))
        .map(|(_, revenue)| revenue)
}

#[cfg(test)]
mod tests;
