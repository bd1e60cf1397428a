use super::*;
use crate::gateway::registry::{AnnualReport, BaseInfo, IprCounts};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn risk(risk_type: &str, level: &str) -> RiskItem {
    RiskItem {
        risk_type: risk_type.to_string(),
        risk_level: level.to_string(),
        risk_content: None,
    }
}

fn profile() -> CompanyProfile {
    CompanyProfile {
        base: BaseInfo {
            name: "武汉速达云仓物流有限公司".to_string(),
            establish_time: Some(EstablishTime::Text("2015-03-12".to_string())),
            reg_capital: Some("800万人民币".to_string()),
            staff_num_range: Some("100-499人".to_string()),
            social_staff_num: Some(126),
            business_scope: Some("仓储服务;消防设施工程".to_string()),
            ..Default::default()
        },
        risks: Some(vec![risk("被执行人", "高"), risk("动产抵押", "中")]),
        intellectual_property: Some(IprCounts {
            trademarks: 2,
            patents: 3,
            software_copyrights: 1,
        }),
        annual_reports: vec![
            AnnualReport {
                report_year: "2022".to_string(),
                total_revenue: Some("2800万元".to_string()),
            },
            AnnualReport {
                report_year: "2023".to_string(),
                total_revenue: Some("6200万元".to_string()),
            },
        ],
        certificates: Some(vec!["消防安全检查合格证".to_string()]),
    }
}

#[test]
fn test_parse_capital_units_and_currencies() {
    assert_eq!(parse_capital_wan("500万人民币"), Some(500.0));
    assert_eq!(parse_capital_wan("1.2亿元"), Some(12_000.0));
    assert_eq!(parse_capital_wan("3,000,000元"), Some(300.0));
    assert_eq!(parse_capital_wan("100万美元"), Some(710.0));
    assert_eq!(parse_capital_wan("1000万港元"), Some(910.0));
    assert_eq!(parse_capital_wan("-"), None);
}

#[test]
fn test_parse_establish_date_formats() {
    assert_eq!(
        parse_establish_date(&EstablishTime::Text("2015-03-12".into())),
        Some(date(2015, 3, 12))
    );
    assert_eq!(
        parse_establish_date(&EstablishTime::Text("2015-03-12 00:00:00".into())),
        Some(date(2015, 3, 12))
    );
    // 2015-01-01 00:00 UTC+8 附近，本地时区不同也只会相差一天
    let from_millis = parse_establish_date(&EstablishTime::Millis(1420041600000)).unwrap();
    assert!(from_millis >= date(2014, 12, 31) && from_millis <= date(2015, 1, 1));
    assert_eq!(parse_establish_date(&EstablishTime::Text("未公开".into())), None);
}

#[test]
fn test_years_between() {
    assert_eq!(years_between(date(2015, 3, 12), date(2025, 3, 12)), Some(10.0));
    assert_eq!(years_between(date(2024, 9, 1), date(2025, 3, 1)), Some(0.5));
    assert_eq!(years_between(date(2026, 1, 1), date(2025, 1, 1)), None);
}

#[test]
fn test_parse_headcount_lower_bound() {
    assert_eq!(parse_headcount("100-499人"), Some(100));
    assert_eq!(parse_headcount("1000-4999人"), Some(1000));
    assert_eq!(parse_headcount("小于50人"), Some(1));
    assert_eq!(parse_headcount("0-9人"), Some(1));
    assert_eq!(parse_headcount("未披露"), None);
}

#[test]
fn test_normalize_full_profile() {
    let record = normalize_profile("武汉速达云仓物流有限公司", &profile(), date(2025, 3, 12));

    assert_eq!(record.status, LookupStatus::Verified);
    assert_eq!(record.registered_capital_wan, Some(800.0));
    assert_eq!(record.years_established, Some(10.0));
    assert_eq!(record.headcount, Some(HeadcountBracket::Medium));
    assert_eq!(record.insured_staff, Some(126));
    assert_eq!(record.litigation_risk, Some(RiskLevel::High));
    assert_eq!(record.financial_risk, Some(RiskLevel::Medium));
    // 取最近一年的年报
    assert_eq!(
        record.annual_revenue,
        Some(RevenueBracket::FiftyToHundredMillion)
    );
    assert!(record.holds_certificate("消防"));
    assert_eq!(record.intellectual_property.unwrap().total(), 6);
}

#[test]
fn test_missing_risk_data_stays_unknown() {
    let mut profile = profile();
    profile.risks = None;
    profile.annual_reports.clear();
    let record = normalize_profile("某公司", &profile, date(2025, 1, 1));

    assert!(record.financial_risk.is_none());
    assert!(record.litigation_risk.is_none());
    assert!(record.annual_revenue.is_none());
}

#[test]
fn test_no_relevant_risks_means_low() {
    let mut profile = profile();
    profile.risks = Some(vec![]);
    let record = normalize_profile("某公司", &profile, date(2025, 1, 1));

    assert_eq!(record.financial_risk, Some(RiskLevel::Low));
    assert_eq!(record.litigation_risk, Some(RiskLevel::Low));
}
