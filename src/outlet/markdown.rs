//! 报告的Markdown渲染

use std::fmt::Write;

use crate::sourcing::trace::{ExecutionTrace, QueryOutcome};
use crate::types::report::{AdviceOrigin, ComparisonRow, MetricName, ProcurementAdvice, Report};
use crate::types::requirement::RequirementRecord;

/// 表格单元格内不能出现竖线和换行
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

/// 供应商对比表：排名、名称、得分，加固定顺序的15项指标
pub fn comparison_table(rows: &[ComparisonRow]) -> String {
    let mut out = String::new();
    let header: Vec<&str> = MetricName::ALL.iter().map(|m| m.label()).collect();
    let _ = writeln!(out, "| 排名 | 供应商 | 得分 | {} |", header.join(" | "));
    let _ = writeln!(out, "|{}", "---|".repeat(header.len() + 3));

    for row in rows {
        let values: Vec<String> = row.metrics.iter().map(|m| cell(&m.value)).collect();
        let _ = writeln!(
            out,
            "| {} | {} | {:.1} | {} |",
            row.rank,
            cell(&row.company_name),
            row.score,
            values.join(" | ")
        );
    }
    out
}

fn requirement_section(out: &mut String, requirement: &RequirementRecord) {
    let _ = writeln!(out, "## 一、采购需求\n");
    let _ = writeln!(out, "- 地区：{}", requirement.geography);
    let _ = writeln!(out, "- 核心业务：{}", requirement.core_business);
    let lists = [
        ("特殊要求", &requirement.special_requirements),
        ("资质要求", &requirement.qualifications),
        ("能力要求", &requirement.capabilities),
        ("细分行业", &requirement.industry_segments),
        ("其他约束", &requirement.constraints),
    ];
    for (label, items) in lists {
        if !items.is_empty() {
            let _ = writeln!(out, "- {}：{}", label, items.join("、"));
        }
    }
    if let Some(capital) = requirement.min_registered_capital {
        let _ = writeln!(out, "- 最低注册资本：{}万元", capital);
    }
    if let Some(years) = requirement.min_years_established {
        let _ = writeln!(out, "- 最低成立年限：{}年", years);
    }
    out.push('\n');
}

fn trace_section(out: &mut String, trace: &ExecutionTrace) {
    let _ = writeln!(out, "## 二、执行过程\n");
    let _ = writeln!(
        out,
        "- 运行编号：{}（{}）",
        trace.run_id,
        trace.started_at.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(
        out,
        "- 数据源：搜索 {}，工商 {}",
        trace.search_backend, trace.registry_backend
    );
    let _ = writeln!(
        out,
        "- 搜索查询：{} 条，成功 {} 条",
        trace.queries.len(),
        trace.succeeded_queries()
    );
    for query in &trace.queries {
        let outcome = match &query.outcome {
            QueryOutcome::Succeeded { hits } => format!("{} 条结果", hits),
            QueryOutcome::Failed { reason } => format!("失败：{}", reason),
            QueryOutcome::TimedOut => "超时".to_string(),
        };
        let _ = writeln!(out, "  - [{}] {}：{}", query.dimension, query.keywords, outcome);
    }
    let _ = writeln!(
        out,
        "- 候选供应商：发现 {} 家，保留 {} 家",
        trace.candidates_found, trace.candidates_retained
    );
    let _ = writeln!(
        out,
        "- 工商核验：{} / {} 家成功",
        trace.verified_lookups(),
        trace.lookups.len()
    );
    for lookup in trace.lookups.iter().filter(|l| !l.status.is_verified()) {
        let _ = writeln!(out, "  - {}：{}", lookup.company_name, lookup.status);
    }
    if !trace.stage_timings.is_empty() {
        let timings: Vec<String> = trace
            .stage_timings
            .iter()
            .map(|t| format!("{} {:.2}s", t.stage, t.seconds))
            .collect();
        let _ = writeln!(
            out,
            "- 阶段耗时：{}，合计 {:.2}s",
            timings.join("，"),
            trace.total_seconds
        );
    }
    if let Some(cache) = &trace.cache {
        let _ = writeln!(
            out,
            "- 缓存：命中 {}，未命中 {}，写入 {}，命中率 {:.1}%",
            cache.cache_hits,
            cache.cache_misses,
            cache.cache_writes,
            cache.hit_rate * 100.0
        );
    }
    for note in &trace.notes {
        let _ = writeln!(out, "- ⚠️ {}", note);
    }
    out.push('\n');
}

fn advice_section(out: &mut String, advice: &ProcurementAdvice) {
    let origin = match advice.origin {
        AdviceOrigin::Llm => "模型生成",
        AdviceOrigin::RuleBased => "规则生成",
    };
    let _ = writeln!(out, "## 四、采购建议（{}）\n", origin);
    let _ = writeln!(out, "{}\n", advice.summary);
    for recommendation in &advice.recommendations {
        let _ = writeln!(out, "- {}", recommendation);
    }
    if !advice.risk_flags.is_empty() {
        let _ = writeln!(out, "\n### 风险提示\n");
        for flag in &advice.risk_flags {
            let _ = writeln!(out, "- ⚠️ {}", flag);
        }
    }
}

/// 完整报告
pub fn render_report(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "# {}{} 供应商寻源报告\n",
        report.requirement.geography, report.requirement.core_business
    );
    requirement_section(&mut out, &report.requirement);
    trace_section(&mut out, &report.trace);

    let _ = writeln!(out, "## 三、供应商对比\n");
    if report.rows.is_empty() {
        let _ = writeln!(out, "未找到符合条件的供应商。\n");
    } else {
        out.push_str(&comparison_table(&report.rows));
        out.push('\n');
    }

    advice_section(&mut out, &report.advice);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::report::DataSource;

    fn row() -> ComparisonRow {
        let mut row = ComparisonRow::build("武汉A|B仓储有限公司", |metric| match metric {
            MetricName::RegisteredCapital => Some(("800万元".to_string(), DataSource::Registry)),
            MetricName::SalesContact => Some(("张经理\n13812345678".to_string(), DataSource::Search)),
            _ => None,
        });
        row.rank = 1;
        row.score = 62.5;
        row
    }

    #[test]
    fn test_table_has_all_metric_columns() {
        let table = comparison_table(&[row()]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("| 排名 | 供应商 | 得分 | 注册资本 | 成立年限 |"));
        assert!(lines[0].ends_with("| 企业口碑 | 商业模式 |"));
        // 18列
        assert_eq!(lines[1].matches("---|").count(), 18);
        assert_eq!(lines[2].matches(" | ").count(), 17);
        assert!(lines[2].contains("武汉A\\|B仓储有限公司"));
        assert!(lines[2].contains("张经理 13812345678"));
        assert!(lines[2].contains("| 62.5 |"));
    }

    #[test]
    fn test_report_sections_in_order() {
        let report = Report {
            requirement: RequirementRecord {
                geography: "武汉".into(),
                core_business: "云仓储物流服务商".into(),
                min_registered_capital: Some(500.0),
                ..Default::default()
            },
            trace: ExecutionTrace::new("mock", "mock"),
            rows: vec![row()],
            advice: ProcurementAdvice {
                summary: "优先接洽A".into(),
                recommendations: vec!["询价".into()],
                risk_flags: vec!["B：未核验".into()],
                origin: AdviceOrigin::RuleBased,
            },
        };

        let text = render_report(&report);
        let positions: Vec<usize> = ["一、采购需求", "二、执行过程", "三、供应商对比", "四、采购建议"]
            .iter()
            .map(|heading| text.find(heading).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(text.starts_with("# 武汉云仓储物流服务商 供应商寻源报告"));
        assert!(text.contains("最低注册资本：500万元"));
        assert!(text.contains("规则生成"));
        assert!(text.contains("- ⚠️ B：未核验"));
    }
}
