//! 报告合成阶段：候选供应商 + 资质记录 → 15项指标对比表、排名与采购建议

use tracing::{info, warn};

use crate::llm::{TextCompletionService, complete_json};
use crate::outlet::markdown::comparison_table;
use crate::sourcing::trace::ExecutionTrace;
use crate::types::qualification::{LookupStatus, QualificationRecord, RiskLevel};
use crate::types::report::{
    AdviceOrigin, ComparisonRow, DataSource, MetricName, ProcurementAdvice,
};
use crate::types::requirement::RequirementRecord;
use crate::types::supplier::CandidateSupplier;

pub mod extract;
pub mod ranking;

/// 单家供应商超过该数量的未知指标时建议补充调研
const SPARSE_ROW_THRESHOLD: usize = 8;

/// 合成对比表并生成建议，这一阶段总会成功
pub async fn execute(
    llm: &dyn TextCompletionService,
    requirement: &RequirementRecord,
    candidates: &[CandidateSupplier],
    records: &[QualificationRecord],
    trace: &mut ExecutionTrace,
) -> (Vec<ComparisonRow>, ProcurementAdvice) {
    let rows = build_rows(requirement, candidates, records);

    if rows.is_empty() {
        info!("📭 未找到候选供应商，跳过建议生成");
        return (rows, no_supplier_advice(requirement));
    }

    let advice = match generate_advice(llm, requirement, &rows).await {
        Ok(advice) => advice,
        Err(e) => {
            warn!("⚠️ 模型生成采购建议失败，改用规则建议: {:#}", e);
            trace.note(format!("采购建议由规则生成: {:#}", e));
            rule_based_advice(requirement, &rows, records)
        }
    };

    (rows, advice)
}

/// 逐家合成15项指标并按综合得分排序
pub fn build_rows(
    requirement: &RequirementRecord,
    candidates: &[CandidateSupplier],
    records: &[QualificationRecord],
) -> Vec<ComparisonRow> {
    let mut rows: Vec<ComparisonRow> = candidates
        .iter()
        .zip(records)
        .map(|(candidate, record)| {
            let mut row = ComparisonRow::build(&candidate.name, |metric| {
                resolve_metric(metric, candidate, record)
            });
            row.score = ranking::composite_score(requirement, record);
            row
        })
        .collect();

    let scores: Vec<f64> = rows.iter().map(|r| r.score).collect();
    let order = ranking::rank_order(&scores);
    let mut slots: Vec<Option<ComparisonRow>> = rows.drain(..).map(Some).collect();
    let mut ranked: Vec<ComparisonRow> = order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect();
    for (position, row) in ranked.iter_mut().enumerate() {
        row.rank = position + 1;
    }
    ranked
}

/// 单项指标取值，返回 None 表示未知
pub fn resolve_metric(
    metric: MetricName,
    candidate: &CandidateSupplier,
    record: &QualificationRecord,
) -> Option<(String, DataSource)> {
    let snippets = &candidate.snippets;
    match metric {
        MetricName::RegisteredCapital => record
            .registered_capital_wan
            .map(|c| (format_wan(c), DataSource::Registry)),
        MetricName::YearsEstablished => record
            .years_established
            .map(|y| (format!("{:.1}年", y), DataSource::Derived)),
        MetricName::CompanySize => record
            .headcount
            .map(|h| (h.to_string(), DataSource::Registry)),
        MetricName::SalesContact => candidate
            .contact
            .clone()
            .map(|c| (c, DataSource::Search)),
        // 价格需要询价获取
        MetricName::PriceLevel => None,
        MetricName::FinancialRisk => record
            .financial_risk
            .map(|r| (r.to_string(), DataSource::Registry)),
        MetricName::LitigationRisk => record
            .litigation_risk
            .map(|r| (r.to_string(), DataSource::Registry)),
        MetricName::AnnualRevenue => record
            .annual_revenue
            .map(|r| (r.to_string(), DataSource::Registry)),
        MetricName::FireSafetyQualification => fire_safety(candidate, record),
        MetricName::SelfOperatedStaff => extract::operating_staff(snippets)
            .map(|s| (s, DataSource::Search))
            .or_else(|| {
                record
                    .insured_staff
                    .map(|n| (format!("参保{}人", n), DataSource::Registry))
            }),
        MetricName::WarehouseArea => {
            extract::warehouse_area(snippets).map(|s| (s, DataSource::Search))
        }
        MetricName::EcommerceClients => {
            extract::ecommerce_clients(snippets).map(|s| (s, DataSource::Search))
        }
        MetricName::AutomationLevel => {
            extract::automation_level(snippets).map(|s| (s, DataSource::Search))
        }
        MetricName::Reputation => reputation(record).map(|s| (s, DataSource::Derived)),
        MetricName::BusinessModel => {
            extract::business_model(snippets).map(|s| (s, DataSource::Search))
        }
    }
}

fn fire_safety(
    candidate: &CandidateSupplier,
    record: &QualificationRecord,
) -> Option<(String, DataSource)> {
    if let Some(certificates) = &record.certificates {
        if let Some(cert) = certificates.iter().find(|c| c.contains("消防")) {
            return Some((format!("具备（{}）", cert), DataSource::Registry));
        }
    }
    if extract::mentions_fire_safety(&candidate.snippets) {
        return Some(("搜索信息显示具备".to_string(), DataSource::Search));
    }
    if record
        .business_scope
        .as_deref()
        .is_some_and(|scope| scope.contains("消防"))
    {
        return Some(("经营范围含消防相关业务".to_string(), DataSource::Derived));
    }
    if record.certificates.is_some() {
        return Some(("未取得".to_string(), DataSource::Registry));
    }
    None
}

/// 根据风险记录与知识产权推断口碑
fn reputation(record: &QualificationRecord) -> Option<String> {
    let (financial, litigation) = (record.financial_risk?, record.litigation_risk?);
    let worst = financial.max(litigation);
    let mut verdict = match worst {
        RiskLevel::Low => "良好".to_string(),
        RiskLevel::Medium => "一般".to_string(),
        RiskLevel::High => "较差".to_string(),
    };
    if let Some(ip) = record.intellectual_property.filter(|ip| ip.total() > 0) {
        verdict.push_str(&format!("（知识产权{}项）", ip.total()));
    }
    Some(verdict)
}

fn format_wan(amount: f64) -> String {
    if amount >= 10_000.0 {
        format!("{}亿元", trim_number(amount / 10_000.0))
    } else {
        format!("{}万元", trim_number(amount))
    }
}

fn trim_number(value: f64) -> String {
    let text = format!("{:.2}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

async fn generate_advice(
    llm: &dyn TextCompletionService,
    requirement: &RequirementRecord,
    rows: &[ComparisonRow],
) -> anyhow::Result<ProcurementAdvice> {
    let requirement_json = serde_json::to_string_pretty(requirement)?;
    let completeness = rows
        .iter()
        .map(|r| format!("- {}: {} 项未知", r.company_name, r.unknown_count()))
        .collect::<Vec<_>>()
        .join("\n");
    let prompt_user = format!(
        include_str!("../prompts/advice_user.tpl"),
        requirement_json,
        comparison_table(rows),
        completeness
    );

    let mut advice: ProcurementAdvice =
        complete_json(llm, include_str!("../prompts/advice_sys.tpl"), &prompt_user).await?;
    if advice.summary.trim().is_empty() {
        anyhow::bail!("模型返回的建议为空");
    }
    advice.origin = AdviceOrigin::Llm;
    Ok(advice)
}

/// 没有候选供应商时的固定建议
pub fn no_supplier_advice(requirement: &RequirementRecord) -> ProcurementAdvice {
    ProcurementAdvice {
        summary: format!(
            "未找到符合条件的供应商（{}）。",
            requirement.summary()
        ),
        recommendations: vec![
            "放宽地区范围，例如扩展到周边城市或所在省份".to_string(),
            "使用更通用的业务描述重新检索".to_string(),
            "通过行业协会或展会渠道补充供应商名单".to_string(),
        ],
        risk_flags: Vec::new(),
        origin: AdviceOrigin::RuleBased,
    }
}

/// 模型不可用时的规则建议
pub fn rule_based_advice(
    requirement: &RequirementRecord,
    rows: &[ComparisonRow],
    records: &[QualificationRecord],
) -> ProcurementAdvice {
    let summary = match rows.first() {
        Some(top) => format!(
            "综合得分最高的是{}（{:.1}分），建议优先接洽；共对比{}家供应商。",
            top.company_name,
            top.score,
            rows.len()
        ),
        None => "未找到符合条件的供应商。".to_string(),
    };

    let mut recommendations = vec!["价格水平需通过正式询价获取，建议向前三名发送询价单".to_string()];
    for qualification in &requirement.qualifications {
        recommendations.push(format!("要求供应商提供{}的证明材料", qualification));
    }
    for row in rows
        .iter()
        .filter(|r| r.unknown_count() >= SPARSE_ROW_THRESHOLD)
    {
        recommendations.push(format!(
            "{}有{}项指标未知，建议实地考察或电话核实",
            row.company_name,
            row.unknown_count()
        ));
    }

    let mut risk_flags = Vec::new();
    for record in records {
        let name = &record.company_name;
        match &record.status {
            LookupStatus::NotFound => {
                risk_flags.push(format!("{}：工商库查无此企业，需核实主体真实性", name))
            }
            LookupStatus::Failed(_) | LookupStatus::TimedOut => {
                risk_flags.push(format!("{}：工商信息未能核验", name))
            }
            LookupStatus::Verified => {}
        }
        if record.litigation_risk == Some(RiskLevel::High) {
            risk_flags.push(format!("{}：存在高等级诉讼或执行风险", name));
        }
        if record.financial_risk == Some(RiskLevel::High) {
            risk_flags.push(format!("{}：存在高等级财务风险", name));
        }
        if let (Some(min), Some(actual)) =
            (requirement.min_registered_capital, record.registered_capital_wan)
        {
            if actual < min {
                risk_flags.push(format!(
                    "{}：注册资本{}低于要求的{}",
                    name,
                    format_wan(actual),
                    format_wan(min)
                ));
            }
        }
    }

    ProcurementAdvice {
        summary,
        recommendations,
        risk_flags,
        origin: AdviceOrigin::RuleBased,
    }
}

#[cfg(test)]
mod tests;
