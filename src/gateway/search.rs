//! 企业搜索服务适配

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use md5::{Digest, Md5};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::types::supplier::SearchHit;

/// 被视为企业的名称后缀
pub const COMPANY_SUFFIXES: [&str; 4] = ["股份有限公司", "有限责任公司", "有限公司", "集团"];

static COMPANY_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\s【】\[\]|_\-—，,。:：;；!！?？]+(?:股份有限公司|有限责任公司|有限公司|集团)")
        .unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"【[^】]*】").unwrap());
static MOBILE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"1[3-9]\d{9}").unwrap());
static LANDLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"0\d{2,3}-\d{7,8}|400-?\d{3}-?\d{4}").unwrap());
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());
static CONTACT_PERSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:联系人|销售经理|客户经理)[:：\s]*([\p{Han}]{1,3}(?:先生|女士|经理)?)").unwrap()
});

/// 企业搜索接口
#[async_trait]
pub trait SupplierSearchApi: Send + Sync {
    /// 按关键词搜索，只返回企业命中
    async fn search(&self, query: &str, count: u32) -> Result<Vec<SearchHit>>;

    fn name(&self) -> &'static str;
}

/// 博查AI搜索客户端
pub struct BochaSearchClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    freshness: String,
}

impl BochaSearchClient {
    pub fn new(config: &SearchConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("创建搜索HTTP客户端失败")?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            freshness: config.freshness.clone(),
        })
    }
}

#[async_trait]
impl SupplierSearchApi for BochaSearchClient {
    async fn search(&self, query: &str, count: u32) -> Result<Vec<SearchHit>> {
        let endpoint = format!("{}/ai-search", self.base_url);
        let payload = json!({
            "query": query,
            "freshness": self.freshness,
            "count": count.min(50),
            "answer": false,
            "stream": false,
        });

        debug!("🔍 博查搜索: {}", query);
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("博查搜索请求失败: {}", query))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail: String = body.chars().take(200).collect();
            return Err(anyhow!("博查搜索API调用失败: {} - {}", status, detail));
        }

        let body: Value = response.json().await.context("博查搜索响应格式错误")?;
        Ok(extract_company_hits(&body))
    }

    fn name(&self) -> &'static str {
        "bocha"
    }
}

#[derive(Debug, Deserialize)]
struct WebPageItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    snippet: String,
}

/// 从博查响应中提取企业命中
///
/// 只处理 `type == "source"` 且 `content_type == "webpage"` 的消息，
/// 其 `content` 是一段JSON字符串，内含 `value[]` 网页列表。
pub fn extract_company_hits(response: &Value) -> Vec<SearchHit> {
    let Some(messages) = response.get("messages").and_then(Value::as_array) else {
        warn!("⚠️ 搜索响应中没有messages字段");
        return Vec::new();
    };

    let mut hits = Vec::new();
    for message in messages {
        if message.get("type").and_then(Value::as_str) != Some("source")
            || message.get("content_type").and_then(Value::as_str) != Some("webpage")
        {
            continue;
        }
        let Some(content) = message.get("content").and_then(Value::as_str) else {
            continue;
        };
        let pages: Vec<WebPageItem> = match serde_json::from_str::<Value>(content)
            .ok()
            .and_then(|v| v.get("value").cloned())
            .map(serde_json::from_value)
        {
            Some(Ok(pages)) => pages,
            _ => {
                warn!("⚠️ 解析搜索结果项失败");
                continue;
            }
        };

        for page in pages {
            if let Some(name) = extract_company_name(&page.name) {
                hits.push(SearchHit {
                    contact: extract_contact(&page.snippet),
                    name,
                    snippet: page.snippet,
                    url: page.url,
                });
            }
        }
    }
    hits
}

/// 从网页标题中识别企业名称，没有企业后缀时返回 None
pub fn extract_company_name(title: &str) -> Option<String> {
    let cleaned = TAG_RE.replace_all(title, " ");
    COMPANY_NAME_RE
        .find(&cleaned)
        .map(|m| m.as_str().to_string())
}

/// 从摘要中识别联系方式
pub fn extract_contact(snippet: &str) -> Option<String> {
    let phone = MOBILE_RE
        .find(snippet)
        .or_else(|| LANDLINE_RE.find(snippet))
        .map(|m| m.as_str().to_string());
    let email = EMAIL_RE.find(snippet).map(|m| m.as_str().to_string());
    let person = CONTACT_PERSON_RE
        .captures(snippet)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    // 只有联系人姓名不算联系方式
    if phone.is_none() && email.is_none() {
        return None;
    }
    let parts: Vec<String> = [person, phone, email].into_iter().flatten().collect();
    Some(parts.join(" "))
}

/// 模拟搜索服务
///
/// 按查询中的城市生成一组固定的企业池，每个查询按哈希从池中取若干家，
/// 不同查询之间会有重叠，便于演练去重。
pub struct MockSearchApi {
    hits_per_query: usize,
}

const MOCK_CITIES: [&str; 12] = [
    "武汉", "上海", "北京", "广州", "深圳", "杭州", "成都", "重庆", "南京", "西安", "长沙", "郑州",
];

const MOCK_PROFILES: [(&str, &str); 8] = [
    (
        "速达云仓物流有限公司",
        "自营云仓总面积3.5万平方米，服务电商客户120余家，配备AGV机器人与WMS系统，B2B与B2C一体化仓配。联系人：王经理 13871234567",
    ),
    (
        "顺畅供应链管理有限公司",
        "专注电商仓储外包，自有运营团队260人，仓库面积2万平米，一件代发服务。电话 027-87654321",
    ),
    (
        "九州通达仓储服务有限公司",
        "冷链与常温仓储，已取得消防验收合格证，合作品牌80家，支持B2C订单履约。",
    ),
    (
        "长江智慧物流集团",
        "区域物流集团，自动化立体库与智能分拣线，仓储面积12万平方米，服务客户300多家。sales@cjwl.com",
    ),
    (
        "楚天仓配科技有限公司",
        "中小电商云仓服务商，自有员工85人，主打一件代发与直播电商仓配。",
    ),
    (
        "汇通云仓股份有限公司",
        "全国多仓网络，单仓面积5万平米，服务电商客户500家以上，B2B2C模式。",
    ),
    (
        "鑫源物流有限责任公司",
        "传统三方物流，提供仓储、运输与配送服务，联系电话 13907121234",
    ),
    (
        "百川电商服务有限公司",
        "电商代运营与仓储一体化，仓库面积8000平方米，合作电商客户60个。",
    ),
];

impl MockSearchApi {
    pub fn new() -> Self {
        Self { hits_per_query: 4 }
    }

    pub fn with_hits_per_query(hits_per_query: usize) -> Self {
        Self {
            hits_per_query: hits_per_query.min(MOCK_PROFILES.len()),
        }
    }

    fn city_of(query: &str) -> &'static str {
        MOCK_CITIES
            .iter()
            .find(|city| query.contains(*city))
            .copied()
            .unwrap_or("华中")
    }

    fn seed(query: &str) -> usize {
        let digest = Md5::digest(query.as_bytes());
        digest[0] as usize
    }
}

impl Default for MockSearchApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SupplierSearchApi for MockSearchApi {
    async fn search(&self, query: &str, count: u32) -> Result<Vec<SearchHit>> {
        let city = Self::city_of(query);
        let start = Self::seed(query) % MOCK_PROFILES.len();
        let take = self.hits_per_query.min(count as usize);

        let hits = (0..take)
            .map(|offset| {
                let (suffix, snippet) = MOCK_PROFILES[(start + offset) % MOCK_PROFILES.len()];
                let name = format!("{}{}", city, suffix);
                SearchHit {
                    url: format!("https://mock.search.local/{}", name),
                    contact: extract_contact(snippet),
                    snippet: snippet.to_string(),
                    name,
                }
            })
            .collect();
        Ok(hits)
    }

    fn name(&self) -> &'static str {
        "mock-search"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bocha_response(pages: Value) -> Value {
        json!({
            "code": 200,
            "messages": [
                {"type": "answer", "content_type": "text", "content": "略"},
                {
                    "type": "source",
                    "content_type": "webpage",
                    "content": json!({"value": pages}).to_string()
                }
            ]
        })
    }

    #[test]
    fn test_extract_company_hits_filters_non_companies() {
        let response = bocha_response(json!([
            {"name": "【推荐】武汉速达云仓物流有限公司-官网", "url": "https://a.com", "snippet": "联系电话 13871234567"},
            {"name": "武汉云仓排行榜", "url": "https://b.com", "snippet": "榜单"},
            {"name": "长江智慧物流集团 | 仓储服务", "url": "https://c.com", "snippet": ""}
        ]));

        let hits = extract_company_hits(&response);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].name, "武汉速达云仓物流有限公司");
        assert_eq!(hits[0].contact.as_deref(), Some("13871234567"));
        assert_eq!(hits[1].name, "长江智慧物流集团");
        assert!(hits[1].contact.is_none());
    }

    #[test]
    fn test_extract_company_hits_tolerates_bad_shapes() {
        assert!(extract_company_hits(&json!({})).is_empty());
        let broken = json!({"messages": [
            {"type": "source", "content_type": "webpage", "content": "not json"}
        ]});
        assert!(extract_company_hits(&broken).is_empty());
    }

    #[test]
    fn test_company_name_keeps_full_suffix() {
        assert_eq!(
            extract_company_name("湖北长江物流集团有限公司简介").as_deref(),
            Some("湖北长江物流集团有限公司")
        );
        assert_eq!(
            extract_company_name("汇通云仓股份有限公司").as_deref(),
            Some("汇通云仓股份有限公司")
        );
        assert!(extract_company_name("仓储外包怎么选").is_none());
    }

    #[test]
    fn test_extract_contact() {
        assert_eq!(
            extract_contact("联系人：王经理 13871234567").as_deref(),
            Some("王经理 13871234567")
        );
        assert_eq!(
            extract_contact("电话 027-87654321，邮箱 sales@cjwl.com").as_deref(),
            Some("027-87654321 sales@cjwl.com")
        );
        assert!(extract_contact("仓储面积2万平米").is_none());
    }

    #[tokio::test]
    async fn test_mock_search_is_deterministic_and_city_aware() {
        let api = MockSearchApi::new();
        let first = api.search("武汉云仓储物流服务商", 15).await.unwrap();
        let second = api.search("武汉云仓储物流服务商", 15).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
        assert!(first.iter().all(|h| h.name.starts_with("武汉")));
        assert!(
            first
                .iter()
                .all(|h| COMPANY_SUFFIXES.iter().any(|s| h.name.ends_with(s)))
        );
    }
}
