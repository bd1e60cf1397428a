//! 需求解析阶段：自然语言 → 结构化采购需求

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::error::SourcingError;
use crate::llm::{TextCompletionService, complete_json};
use crate::types::requirement::RequirementRecord;

/// 地名末尾可以去掉的修饰
const GEOGRAPHY_SUFFIXES: [&str; 7] = ["地区", "区域", "周边", "一带", "附近", "市", "省"];

static MIN_CAPITAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"注册资本[^0-9]{0,6}(\d+(?:\.\d+)?)\s*(亿|万)").unwrap()
});
static MIN_YEARS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"成立[^0-9]{0,6}(\d+(?:\.\d+)?)\s*年以上").unwrap()
});

/// 解析采购需求
///
/// 输入为空、模型输出无法解析、缺少地区或核心业务时返回 `FatalParse`。
pub async fn parse_requirement(
    llm: &dyn TextCompletionService,
    requirement_text: &str,
) -> Result<RequirementRecord, SourcingError> {
    let text = requirement_text.trim();
    if text.is_empty() {
        return Err(SourcingError::FatalParse("采购需求为空".to_string()));
    }

    let schema = schemars::schema_for!(RequirementRecord);
    let schema_text = serde_json::to_string_pretty(&schema)
        .map_err(|e| SourcingError::FatalParse(format!("生成需求结构描述失败: {}", e)))?;
    let prompt_sys = include_str!("prompts/parse_requirement_sys.tpl");
    let prompt_user = format!(
        include_str!("prompts/parse_requirement_user.tpl"),
        text, schema_text
    );

    debug!("🤖 调用模型解析需求: {}", text);
    let record: RequirementRecord = complete_json(llm, prompt_sys, &prompt_user)
        .await
        .map_err(|e| SourcingError::FatalParse(format!("{:#}", e)))?;

    let record = normalize_requirement(record, text)?;
    info!("📋 需求解析完成: {}", record.summary());
    Ok(record)
}

/// 清洗模型输出，并从原文补充模型遗漏的数值门槛
pub fn normalize_requirement(
    mut record: RequirementRecord,
    original_text: &str,
) -> Result<RequirementRecord, SourcingError> {
    record.geography = normalize_geography(&record.geography);
    record.core_business = record.core_business.trim().to_string();

    if record.geography.is_empty() {
        return Err(SourcingError::FatalParse("未能识别目标地区".to_string()));
    }
    if record.core_business.is_empty() {
        return Err(SourcingError::FatalParse("未能识别核心业务".to_string()));
    }

    for list in [
        &mut record.special_requirements,
        &mut record.qualifications,
        &mut record.capabilities,
        &mut record.industry_segments,
        &mut record.constraints,
    ] {
        clean_list(list);
    }

    if record.min_registered_capital.is_none() {
        record.min_registered_capital = extract_min_capital(original_text);
    }
    if record.min_years_established.is_none() {
        record.min_years_established = MIN_YEARS_RE
            .captures(original_text)
            .and_then(|c| c[1].parse().ok());
    }
    record.min_registered_capital = record.min_registered_capital.filter(|v| *v > 0.0);
    record.min_years_established = record.min_years_established.filter(|v| *v > 0.0);

    Ok(record)
}

/// 去掉地名末尾的 "地区"、"市" 等修饰
pub fn normalize_geography(raw: &str) -> String {
    let mut geography = raw.trim().to_string();
    loop {
        let stripped = GEOGRAPHY_SUFFIXES.iter().find_map(|suffix| {
            geography
                .strip_suffix(suffix)
                .filter(|rest| rest.chars().count() >= 2)
                .map(str::to_string)
        });
        match stripped {
            Some(rest) => geography = rest,
            None => return geography,
        }
    }
}

/// 原文中的最低注册资本（万元）
pub fn extract_min_capital(text: &str) -> Option<f64> {
    let caps = MIN_CAPITAL_RE.captures(text)?;
    let amount: f64 = caps[1].parse().ok()?;
    match &caps[2] {
        "亿" => Some(amount * 10_000.0),
        _ => Some(amount),
    }
}

fn clean_list(list: &mut Vec<String>) {
    let mut seen = Vec::with_capacity(list.len());
    for item in list.drain(..) {
        let item = item.trim().to_string();
        if !item.is_empty() && !seen.contains(&item) {
            seen.push(item);
        }
    }
    *list = seen;
}
