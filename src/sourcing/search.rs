//! 供应商搜索阶段

use std::collections::HashMap;
use tracing::{info, warn};

use crate::error::SourcingError;
use crate::sourcing::context::SourcingContext;
use crate::sourcing::trace::{ExecutionTrace, QueryOutcome, QueryTrace};
use crate::types::requirement::RequirementRecord;
use crate::types::supplier::{CandidateSupplier, SearchDimension, SearchHit, SearchQuery};

pub const MIN_QUERIES: usize = 5;
pub const MAX_QUERIES: usize = 8;

/// 每个维度最多贡献的查询数
const PER_DIMENSION_LIMIT: usize = 2;

/// 业务描述末尾的泛称，拼接兜底模板前去掉
const BUSINESS_SUFFIXES: [&str; 4] = ["服务商", "供应商", "公司", "企业"];

/// 按关键词维度矩阵生成查询
///
/// 各维度轮流取词以覆盖尽量多的维度，关键词去重后最多8条；
/// 不足5条时用兜底模板补齐。
pub fn build_queries(requirement: &RequirementRecord) -> Vec<SearchQuery> {
    let geo = requirement.geography.trim();
    let business = requirement.core_business.trim();
    let take = |items: &[String]| -> Vec<String> {
        items.iter().take(PER_DIMENSION_LIMIT).cloned().collect()
    };

    let matrix: Vec<(SearchDimension, Vec<String>)> = vec![
        (SearchDimension::GeoBusiness, vec![format!("{}{}", geo, business)]),
        (
            SearchDimension::GeoSpecial,
            take(&requirement.special_requirements)
                .iter()
                .map(|s| format!("{} {} {}", geo, s, business))
                .collect(),
        ),
        (
            SearchDimension::GeoQualification,
            take(&requirement.qualifications)
                .iter()
                .map(|q| format!("{}{} {}", geo, business, q))
                .collect(),
        ),
        (
            SearchDimension::BusinessCapability,
            take(&requirement.capabilities)
                .iter()
                .map(|c| format!("{} {}", business, c))
                .collect(),
        ),
        (
            SearchDimension::GeoSegment,
            take(&requirement.industry_segments)
                .iter()
                .map(|s| format!("{} {} {}", geo, s, business))
                .collect(),
        ),
        (
            SearchDimension::GeoBusinessConstraint,
            take(&requirement.constraints)
                .iter()
                .map(|c| format!("{}{} {}", geo, business, c))
                .collect(),
        ),
    ];

    let mut queries: Vec<SearchQuery> = Vec::new();
    for round in 0..PER_DIMENSION_LIMIT {
        for (dimension, keywords) in &matrix {
            if let Some(keywords) = keywords.get(round) {
                push_query(&mut queries, *dimension, keywords);
            }
        }
    }

    let base = strip_business_suffix(business);
    let fallbacks = [
        format!("{}{}公司", geo, base),
        format!("{}{}服务商 推荐", geo, base),
        format!("{}{} 有限公司", geo, business),
        format!("{} 优质{}", geo, business),
        format!("{}{} 企业名录", geo, business),
    ];
    for keywords in &fallbacks {
        if queries.len() >= MIN_QUERIES {
            break;
        }
        push_query(&mut queries, SearchDimension::Fallback, keywords);
    }

    queries
}

/// 按归一化名称合并命中，保持首次出现的顺序
pub fn merge_candidates(results: &[(SearchQuery, Vec<SearchHit>)]) -> Vec<CandidateSupplier> {
    let mut candidates: Vec<CandidateSupplier> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (query, hits) in results {
        for hit in hits {
            let candidate = CandidateSupplier::from_hit(query, hit);
            if candidate.normalized_name.is_empty() {
                continue;
            }
            match index.get(&candidate.normalized_name) {
                Some(&position) => candidates[position].absorb(query, hit),
                None => {
                    index.insert(candidate.normalized_name.clone(), candidates.len());
                    candidates.push(candidate);
                }
            }
        }
    }
    candidates
}

/// 执行搜索阶段
///
/// 单个查询失败只记录到轨迹；全部失败时整个阶段失败。
pub async fn execute(
    context: &SourcingContext,
    requirement: &RequirementRecord,
    trace: &mut ExecutionTrace,
) -> Result<Vec<CandidateSupplier>, SourcingError> {
    let queries = build_queries(requirement);
    info!("🔍 生成 {} 个搜索查询", queries.len());

    let units: Vec<_> = queries
        .iter()
        .map(|query| {
            let gateway = context.search.clone();
            let keywords = query.keywords.clone();
            async move { gateway.search(&keywords).await }
        })
        .collect();
    let outcomes = context.executor.submit(units).await;

    let mut succeeded: Vec<(SearchQuery, Vec<SearchHit>)> = Vec::new();
    for (query, outcome) in queries.into_iter().zip(outcomes) {
        let outcome = match outcome {
            Ok(hits) => {
                let traced = QueryOutcome::Succeeded { hits: hits.len() };
                succeeded.push((query.clone(), hits));
                traced
            }
            Err(e) if e.is_timeout() => {
                trace.note(format!("搜索 \"{}\": {}", query.keywords, e.describe()));
                QueryOutcome::TimedOut
            }
            Err(e) => {
                let error = SourcingError::SearchQuery {
                    query: query.keywords.clone(),
                    reason: e.describe(),
                };
                QueryOutcome::Failed {
                    reason: error.to_string(),
                }
            }
        };
        trace.queries.push(QueryTrace {
            dimension: query.dimension,
            keywords: query.keywords,
            outcome,
        });
    }

    if succeeded.is_empty() {
        return Err(SourcingError::SearchStage(trace.queries.len()));
    }
    let failed = trace.queries.len() - succeeded.len();
    if failed > 0 {
        warn!("⚠️ {} 个搜索查询失败，继续使用其余结果", failed);
    }

    let mut candidates = merge_candidates(&succeeded);
    trace.candidates_found = candidates.len();
    candidates.truncate(context.config.workflow.max_suppliers);
    trace.candidates_retained = candidates.len();

    info!(
        "✅ 搜索完成: {} 家候选供应商，保留前 {} 家",
        trace.candidates_found, trace.candidates_retained
    );
    Ok(candidates)
}

/// 关键词去重并限制总数
fn push_query(queries: &mut Vec<SearchQuery>, dimension: SearchDimension, keywords: &str) {
    let keywords = collapse_whitespace(keywords);
    if keywords.is_empty()
        || queries.len() >= MAX_QUERIES
        || queries.iter().any(|q| q.keywords == keywords)
    {
        return;
    }
    queries.push(SearchQuery {
        dimension,
        keywords,
    });
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_business_suffix(business: &str) -> &str {
    BUSINESS_SUFFIXES
        .iter()
        .find_map(|suffix| {
            business
                .strip_suffix(suffix)
                .filter(|rest| !rest.is_empty())
        })
        .unwrap_or(business)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn wuhan() -> RequirementRecord {
        RequirementRecord {
            geography: "武汉".to_string(),
            core_business: "云仓储物流服务商".to_string(),
            ..Default::default()
        }
    }

    fn hit(name: &str, snippet: &str, contact: Option<&str>) -> SearchHit {
        SearchHit {
            name: name.to_string(),
            snippet: snippet.to_string(),
            url: format!("https://example.com/{}", snippet),
            contact: contact.map(str::to_string),
        }
    }

    #[test]
    fn test_minimal_requirement_is_padded_with_fallbacks() {
        let queries = build_queries(&wuhan());
        let keywords: Vec<&str> = queries.iter().map(|q| q.keywords.as_str()).collect();

        assert_eq!(queries.len(), MIN_QUERIES);
        assert_eq!(keywords[0], "武汉云仓储物流服务商");
        assert!(keywords.contains(&"武汉云仓储物流公司"));
        assert!(keywords.contains(&"武汉云仓储物流服务商 推荐"));
        assert!(
            queries[1..]
                .iter()
                .all(|q| q.dimension == SearchDimension::Fallback)
        );
    }

    #[test]
    fn test_rich_requirement_is_capped_and_covers_dimensions() {
        let requirement = RequirementRecord {
            special_requirements: vec!["冷链".into(), "自动化分拣".into(), "恒温".into()],
            qualifications: vec!["消防资质".into(), "ISO9001".into()],
            capabilities: vec!["电商仓配一体".into()],
            industry_segments: vec!["生鲜电商".into()],
            constraints: vec!["可开专票".into()],
            ..wuhan()
        };
        let queries = build_queries(&requirement);

        assert_eq!(queries.len(), MAX_QUERIES);
        let keywords: Vec<&str> = queries.iter().map(|q| q.keywords.as_str()).collect();
        let distinct: HashSet<&str> = keywords.iter().copied().collect();
        assert_eq!(distinct.len(), MAX_QUERIES);
        // 第一轮覆盖所有非空维度
        let first_round: Vec<SearchDimension> = queries[..6].iter().map(|q| q.dimension).collect();
        assert_eq!(
            first_round,
            vec![
                SearchDimension::GeoBusiness,
                SearchDimension::GeoSpecial,
                SearchDimension::GeoQualification,
                SearchDimension::BusinessCapability,
                SearchDimension::GeoSegment,
                SearchDimension::GeoBusinessConstraint,
            ]
        );
        assert!(!keywords.contains(&"武汉 恒温 云仓储物流服务商"));
    }

    #[test]
    fn test_duplicate_keywords_are_collapsed() {
        let requirement = RequirementRecord {
            special_requirements: vec!["冷链".into(), " 冷链 ".into()],
            ..wuhan()
        };
        let queries = build_queries(&requirement);
        let cold_chain = queries
            .iter()
            .filter(|q| q.keywords == "武汉 冷链 云仓储物流服务商")
            .count();
        assert_eq!(cold_chain, 1);
        assert!(queries.len() >= MIN_QUERIES);
    }

    #[test]
    fn test_merge_unions_provenance_across_queries() {
        let q1 = SearchQuery {
            dimension: SearchDimension::GeoBusiness,
            keywords: "武汉云仓".into(),
        };
        let q2 = SearchQuery {
            dimension: SearchDimension::Fallback,
            keywords: "武汉云仓公司".into(),
        };
        let results = vec![
            (
                q1.clone(),
                vec![
                    hit("武汉速达云仓物流有限公司", "a", None),
                    hit("武汉顺畅供应链管理有限公司", "b", None),
                ],
            ),
            (
                q2.clone(),
                vec![
                    hit(" 武汉速达 云仓物流有限公司", "c", Some("13871234567")),
                    hit("武汉楚天仓配科技有限公司", "d", None),
                ],
            ),
        ];

        let candidates = merge_candidates(&results);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].name, "武汉速达云仓物流有限公司");
        assert_eq!(candidates[0].queries, vec!["武汉云仓", "武汉云仓公司"]);
        assert_eq!(
            candidates[0].dimensions,
            vec![SearchDimension::GeoBusiness, SearchDimension::Fallback]
        );
        assert_eq!(candidates[0].snippets, vec!["a", "c"]);
        assert_eq!(candidates[0].contact.as_deref(), Some("13871234567"));
        assert_eq!(candidates[1].name, "武汉顺畅供应链管理有限公司");
        assert_eq!(candidates[2].name, "武汉楚天仓配科技有限公司");
    }
}
