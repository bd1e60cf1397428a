use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// 搜索维度
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchDimension {
    /// 地区 × 核心业务
    GeoBusiness,
    /// 地区 × 特殊要求
    GeoSpecial,
    /// 地区 × 资质
    GeoQualification,
    /// 核心业务 × 能力
    BusinessCapability,
    /// 地区 × 行业细分
    GeoSegment,
    /// 地区 × 核心业务 × 约束
    GeoBusinessConstraint,
    /// 兜底模板
    Fallback,
}

impl Display for SearchDimension {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SearchDimension::GeoBusiness => "地区×业务",
            SearchDimension::GeoSpecial => "地区×特殊要求",
            SearchDimension::GeoQualification => "地区×资质",
            SearchDimension::BusinessCapability => "业务×能力",
            SearchDimension::GeoSegment => "地区×行业细分",
            SearchDimension::GeoBusinessConstraint => "地区×业务×约束",
            SearchDimension::Fallback => "兜底",
        };
        write!(f, "{}", label)
    }
}

/// 一条搜索查询
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SearchQuery {
    pub dimension: SearchDimension,
    pub keywords: String,
}

/// 搜索服务返回的一条企业命中
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SearchHit {
    /// 企业名称（原始展示形式）
    pub name: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub url: String,
    /// 从摘要中识别出的联系方式
    #[serde(default)]
    pub contact: Option<String>,
}

/// 候选供应商
///
/// 同一企业在多个查询中被命中时合并为一条，来源信息取并集。
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CandidateSupplier {
    /// 去重键
    pub normalized_name: String,
    /// 首次出现时的展示名称
    pub name: String,
    pub dimensions: Vec<SearchDimension>,
    /// 命中该企业的查询关键词
    pub queries: Vec<String>,
    pub snippets: Vec<String>,
    pub source_urls: Vec<String>,
    pub contact: Option<String>,
}

impl CandidateSupplier {
    pub fn from_hit(query: &SearchQuery, hit: &SearchHit) -> Self {
        let mut candidate = Self {
            normalized_name: normalize_company_name(&hit.name),
            name: hit.name.trim().to_string(),
            dimensions: Vec::new(),
            queries: Vec::new(),
            snippets: Vec::new(),
            source_urls: Vec::new(),
            contact: None,
        };
        candidate.absorb(query, hit);
        candidate
    }

    /// 合并另一次命中的来源信息
    pub fn absorb(&mut self, query: &SearchQuery, hit: &SearchHit) {
        if !self.dimensions.contains(&query.dimension) {
            self.dimensions.push(query.dimension);
        }
        if !self.queries.contains(&query.keywords) {
            self.queries.push(query.keywords.clone());
        }
        let snippet = hit.snippet.trim();
        if !snippet.is_empty() && !self.snippets.iter().any(|s| s == snippet) {
            self.snippets.push(snippet.to_string());
        }
        if !hit.url.is_empty() && !self.source_urls.contains(&hit.url) {
            self.source_urls.push(hit.url.clone());
        }
        if self.contact.is_none() {
            self.contact = hit.contact.clone();
        }
    }
}

/// 企业名称归一化
///
/// 去掉 `【…】` 标注与空白，全角字母数字折叠为半角，括号统一为全角，英文字母转小写。
pub fn normalize_company_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut in_tag = false;
    for c in name.chars().map(fold_full_width) {
        match c {
            '【' => in_tag = true,
            '】' => in_tag = false,
            _ if in_tag => {}
            '(' => result.push('（'),
            ')' => result.push('）'),
            c if c.is_whitespace() || c == '\u{3000}' => {}
            c => result.extend(c.to_lowercase()),
        }
    }
    result
}

/// U+FF01..=U+FF5E 映射到对应的ASCII字符
fn fold_full_width(c: char) -> char {
    match c {
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
        c => c,
    }
}
