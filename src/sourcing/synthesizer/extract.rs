//! 从搜索摘要中提取经营指标

use regex::Regex;
use std::sync::LazyLock;

static STAFF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:自有|运营|员工|团队|人员)[^0-9，。,;；]{0,6}(\d+)\s*(余|多)?\s*(?:人|名)")
        .unwrap()
});
static AREA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*(万)?\s*(?:平方米|平米|㎡)").unwrap()
});
static CLIENTS_AFTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:电商客户|品牌|客户)\s*(\d+)\s*(余|多)?\s*(家|个)(以上)?").unwrap()
});
static CLIENTS_BEFORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*(余|多)?\s*(家|个)(以上)?\s*(?:电商|品牌|客户)").unwrap()
});

const HIGH_AUTOMATION: [&str; 7] = [
    "自动化立体库",
    "AGV",
    "机器人",
    "智能分拣",
    "自动分拣",
    "穿梭车",
    "自动化仓",
];
const BASIC_AUTOMATION: [&str; 5] = ["WMS", "RFID", "PDA", "条码", "信息化"];
const BUSINESS_MODELS: [&str; 8] = [
    "B2B2C",
    "B2B",
    "B2C",
    "一件代发",
    "仓配一体",
    "直播电商",
    "代运营",
    "三方物流",
];

/// 自有运营人数，例如 "自有运营团队260人" → "260人"
pub fn operating_staff(snippets: &[String]) -> Option<String> {
    snippets.iter().find_map(|s| {
        let caps = STAFF_RE.captures(s)?;
        Some(format!(
            "{}{}人",
            &caps[1],
            caps.get(2).map_or("", |m| m.as_str())
        ))
    })
}

/// 自营仓储面积，统一为平方米
pub fn warehouse_area(snippets: &[String]) -> Option<String> {
    snippets.iter().find_map(|s| {
        let caps = AREA_RE.captures(s)?;
        let amount: f64 = caps[1].parse().ok()?;
        let square_meters = if caps.get(2).is_some() {
            amount * 10_000.0
        } else {
            amount
        };
        Some(format!("{}平方米", square_meters.round() as u64))
    })
}

/// 合作电商客户数量
pub fn ecommerce_clients(snippets: &[String]) -> Option<String> {
    snippets.iter().find_map(|s| {
        let caps = CLIENTS_AFTER_RE
            .captures(s)
            .or_else(|| CLIENTS_BEFORE_RE.captures(s))?;
        Some(format!(
            "{}{}{}{}",
            &caps[1],
            caps.get(2).map_or("", |m| m.as_str()),
            &caps[3],
            caps.get(4).map_or("", |m| m.as_str())
        ))
    })
}

/// 仓内自动化程度，根据摘要中出现的设备与系统判断
pub fn automation_level(snippets: &[String]) -> Option<String> {
    let text = snippets.join(" ");
    let upper = text.to_uppercase();
    let high: Vec<&str> = HIGH_AUTOMATION
        .iter()
        .copied()
        .filter(|k| upper.contains(&k.to_uppercase()))
        .collect();
    let basic: Vec<&str> = BASIC_AUTOMATION
        .iter()
        .copied()
        .filter(|k| upper.contains(&k.to_uppercase()))
        .collect();

    if !high.is_empty() {
        let mut seen = high;
        seen.extend(basic);
        Some(format!("较高（{}）", seen.join("、")))
    } else if !basic.is_empty() {
        Some(format!("一般（{}）", basic.join("、")))
    } else {
        None
    }
}

/// 商业模式关键词
pub fn business_model(snippets: &[String]) -> Option<String> {
    let text = snippets.join(" ").to_uppercase();
    let mut found: Vec<&str> = Vec::new();
    for model in BUSINESS_MODELS {
        // B2B2C 已包含 B2B 与 B2C
        let covered = found.iter().any(|f| f.contains(model));
        if !covered && text.contains(&model.to_uppercase()) {
            found.push(model);
        }
    }
    if found.is_empty() {
        None
    } else {
        Some(found.join("、"))
    }
}

/// 摘要中是否提到消防资质
pub fn mentions_fire_safety(snippets: &[String]) -> bool {
    snippets.iter().any(|s| {
        s.contains("消防")
            && ["验收", "合格", "资质", "许可", "备案"]
                .iter()
                .any(|k| s.contains(k))
    })
}
