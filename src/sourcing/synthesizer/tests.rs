use super::*;
use crate::testing::ScriptedCompletion;
use crate::types::qualification::{HeadcountBracket, IntellectualProperty, RevenueBracket};
use crate::types::supplier::{SearchDimension, SearchHit, SearchQuery};

fn requirement() -> RequirementRecord {
    RequirementRecord {
        geography: "武汉".into(),
        core_business: "电商云仓服务商".into(),
        qualifications: vec!["消防资质".into()],
        min_registered_capital: Some(500.0),
        ..Default::default()
    }
}

fn candidate(name: &str, snippet: &str, contact: Option<&str>) -> CandidateSupplier {
    let query = SearchQuery {
        dimension: SearchDimension::GeoBusiness,
        keywords: "武汉 电商云仓服务商".into(),
    };
    let hit = SearchHit {
        name: name.into(),
        snippet: snippet.into(),
        url: format!("https://example.com/{}", name),
        contact: contact.map(str::to_string),
    };
    CandidateSupplier::from_hit(&query, &hit)
}

fn verified(name: &str) -> QualificationRecord {
    QualificationRecord {
        registered_capital_wan: Some(1_200.0),
        years_established: Some(8.4),
        headcount: Some(HeadcountBracket::Medium),
        insured_staff: Some(130),
        financial_risk: Some(RiskLevel::Low),
        litigation_risk: Some(RiskLevel::Medium),
        annual_revenue: Some(RevenueBracket::TenToFiftyMillion),
        certificates: Some(vec!["消防验收合格证".into()]),
        intellectual_property: Some(IntellectualProperty {
            trademarks: 1,
            patents: 2,
            software_copyrights: 0,
        }),
        business_scope: Some("仓储服务".into()),
        ..QualificationRecord::unknown(name, LookupStatus::Verified)
    }
}

fn value(row: &ComparisonRow, metric: MetricName) -> &str {
    &row.get(metric).unwrap().value
}

#[test]
fn test_verified_supplier_fills_registry_metrics() {
    let c = candidate(
        "武汉速达云仓物流有限公司",
        "自有运营团队260人，云仓总面积3万平方米，服务电商客户120余家，配备AGV与WMS，B2C一件代发",
        Some("张经理 13812345678"),
    );
    let rows = build_rows(&requirement(), &[c], &[verified("武汉速达云仓物流有限公司")]);
    let row = &rows[0];

    assert_eq!(row.rank, 1);
    assert_eq!(row.metrics.len(), 15);
    assert_eq!(value(row, MetricName::RegisteredCapital), "1200万元");
    assert_eq!(value(row, MetricName::YearsEstablished), "8.4年");
    assert_eq!(value(row, MetricName::CompanySize), "100-499人");
    assert_eq!(value(row, MetricName::SalesContact), "张经理 13812345678");
    assert_eq!(value(row, MetricName::FinancialRisk), "低");
    assert_eq!(value(row, MetricName::LitigationRisk), "中");
    assert_eq!(value(row, MetricName::AnnualRevenue), "1000万-5000万");
    assert_eq!(
        value(row, MetricName::FireSafetyQualification),
        "具备（消防验收合格证）"
    );
    assert_eq!(value(row, MetricName::SelfOperatedStaff), "260人");
    assert_eq!(value(row, MetricName::WarehouseArea), "30000平方米");
    assert_eq!(value(row, MetricName::EcommerceClients), "120余家");
    assert_eq!(value(row, MetricName::Reputation), "一般（知识产权3项）");
    // 价格始终需要询价
    assert!(row.get(MetricName::PriceLevel).unwrap().is_unknown());
    assert_eq!(row.unknown_count(), 1);
}

#[test]
fn test_not_found_supplier_keeps_search_metrics_only() {
    let c = candidate("武汉某某仓储有限公司", "仓库面积8000平方米", None);
    let record = QualificationRecord::unknown("武汉某某仓储有限公司", LookupStatus::NotFound);
    let rows = build_rows(&requirement(), &[c], &[record]);
    let row = &rows[0];

    assert_eq!(value(row, MetricName::WarehouseArea), "8000平方米");
    assert_eq!(value(row, MetricName::RegisteredCapital), UNKNOWN);
    assert_eq!(value(row, MetricName::Reputation), UNKNOWN);
    assert_eq!(row.unknown_count(), 14);
}

const UNKNOWN: &str = crate::types::report::UNKNOWN_MARKER;

#[test]
fn test_fire_safety_fallbacks() {
    let mut record = verified("A");
    record.certificates = Some(vec![]);
    record.business_scope = Some("仓储服务;消防器材销售".into());
    let c = candidate("A", "普通仓储", None);
    assert_eq!(
        resolve_metric(MetricName::FireSafetyQualification, &c, &record),
        Some(("经营范围含消防相关业务".to_string(), DataSource::Derived))
    );

    record.business_scope = None;
    assert_eq!(
        resolve_metric(MetricName::FireSafetyQualification, &c, &record),
        Some(("未取得".to_string(), DataSource::Registry))
    );

    record.certificates = None;
    assert_eq!(
        resolve_metric(MetricName::FireSafetyQualification, &c, &record),
        None
    );

    let mentioned = candidate("A", "仓库已通过消防验收", None);
    assert_eq!(
        resolve_metric(MetricName::FireSafetyQualification, &mentioned, &record)
            .map(|(_, source)| source),
        Some(DataSource::Search)
    );
}

#[test]
fn test_staff_falls_back_to_insured_count() {
    let c = candidate("A", "无人数信息", None);
    assert_eq!(
        resolve_metric(MetricName::SelfOperatedStaff, &c, &verified("A")),
        Some(("参保130人".to_string(), DataSource::Registry))
    );
}

#[test]
fn test_capital_formatting() {
    assert_eq!(format_wan(800.0), "800万元");
    assert_eq!(format_wan(1_234.5), "1234.5万元");
    assert_eq!(format_wan(12_000.0), "1.2亿元");
}

#[test]
fn test_rows_sorted_by_score_with_contiguous_ranks() {
    let candidates = vec![
        candidate("弱公司", "", None),
        candidate("强公司", "", None),
        candidate("中公司", "", None),
    ];
    let mut middle = verified("中公司");
    middle.litigation_risk = Some(RiskLevel::High);
    let records = vec![
        QualificationRecord::unknown("弱公司", LookupStatus::NotFound),
        verified("强公司"),
        middle,
    ];

    let rows = build_rows(&requirement(), &candidates, &records);
    let names: Vec<&str> = rows.iter().map(|r| r.company_name.as_str()).collect();
    assert_eq!(names, vec!["强公司", "中公司", "弱公司"]);
    let ranks: Vec<usize> = rows.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
    assert!(rows.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn test_empty_candidates_skip_llm() {
    let llm = ScriptedCompletion::new(vec![]);
    let mut trace = ExecutionTrace::new("mock", "mock");

    let (rows, advice) = execute(&llm, &requirement(), &[], &[], &mut trace).await;

    assert!(rows.is_empty());
    assert_eq!(llm.calls(), 0);
    assert_eq!(advice.origin, AdviceOrigin::RuleBased);
    assert!(advice.summary.contains("未找到"));
    assert!(!advice.recommendations.is_empty());
}

#[tokio::test]
async fn test_llm_advice_is_used() {
    let llm = ScriptedCompletion::new(vec![Ok(r#"```json
{"summary": "优先接洽A", "recommendations": ["询价"], "risk_flags": []}
```"#
        .to_string())]);
    let mut trace = ExecutionTrace::new("mock", "mock");

    let (rows, advice) = execute(
        &llm,
        &requirement(),
        &[candidate("A", "", None)],
        &[verified("A")],
        &mut trace,
    )
    .await;

    assert_eq!(rows.len(), 1);
    assert_eq!(advice.origin, AdviceOrigin::Llm);
    assert_eq!(advice.summary, "优先接洽A");
    assert!(trace.notes.is_empty());
}

#[tokio::test]
async fn test_llm_failure_falls_back_to_rules() {
    let llm = ScriptedCompletion::new(vec![Err("服务不可用".to_string())]);
    let mut trace = ExecutionTrace::new("mock", "mock");
    let candidates = vec![candidate("A", "", None), candidate("B", "", None)];
    let records = vec![
        verified("A"),
        QualificationRecord::unknown("B", LookupStatus::NotFound),
    ];

    let (rows, advice) = execute(&llm, &requirement(), &candidates, &records, &mut trace).await;

    assert_eq!(advice.origin, AdviceOrigin::RuleBased);
    assert!(advice.summary.contains(&rows[0].company_name));
    assert!(advice.recommendations.iter().any(|r| r.contains("询价")));
    assert!(advice.recommendations.iter().any(|r| r.contains("消防资质")));
    assert!(advice.risk_flags.iter().any(|f| f.starts_with("B：")));
    assert_eq!(trace.notes.len(), 1);
}

#[tokio::test]
async fn test_blank_llm_summary_falls_back_to_rules() {
    let llm = ScriptedCompletion::new(vec![Ok(r#"{"summary": "  "}"#.to_string())]);
    let mut trace = ExecutionTrace::new("mock", "mock");

    let (_, advice) = execute(
        &llm,
        &requirement(),
        &[candidate("A", "", None)],
        &[verified("A")],
        &mut trace,
    )
    .await;

    assert_eq!(advice.origin, AdviceOrigin::RuleBased);
}

#[test]
fn test_rule_advice_flags_capital_shortfall_and_high_risk() {
    let mut record = verified("A");
    record.registered_capital_wan = Some(100.0);
    record.litigation_risk = Some(RiskLevel::High);
    let rows = build_rows(&requirement(), &[candidate("A", "", None)], &[record.clone()]);

    let advice = rule_based_advice(&requirement(), &rows, &[record]);

    assert!(advice.risk_flags.iter().any(|f| f.contains("诉讼")));
    assert!(
        advice
            .risk_flags
            .iter()
            .any(|f| f.contains("注册资本100万元低于要求的500万元"))
    );
}
