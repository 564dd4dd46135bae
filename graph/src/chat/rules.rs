use std::path::Path;

use serde::{Deserialize, Serialize};

/// Keyword sets and scoring weights driving the local responder.
///
/// The built-in table can be replaced wholesale by a JSON file; missing
/// fields in that file keep their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuleTable {
    pub keywords: KeywordSets,
    pub weights: ScoreWeights,
    pub topics: Vec<TopicBucket>,
    /// Cap on the list shown when fuzzy search hits several entities.
    pub search_list_limit: usize,
    /// Cap on the list shown by the last-resort fuzzy search.
    pub fallback_list_limit: usize,
    pub detail_relation_limit: usize,
    pub detail_recommendation_limit: usize,
    pub recommendation_limit: usize,
    pub path_group_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeywordSets {
    pub domain: Vec<String>,
    pub count: Vec<String>,
    pub recommend: Vec<String>,
    /// Recommendation keywords checked after summary; a superset of `recommend`.
    pub recommend_fallback: Vec<String>,
    pub relation: Vec<String>,
    pub relation_count: Vec<String>,
    pub relation_type: Vec<String>,
    pub relation_path: Vec<String>,
    pub summary: Vec<String>,
    pub help: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoreWeights {
    pub exact_name: u32,
    pub exact_id: u32,
    pub name_contains: u32,
    pub id_contains: u32,
    pub description_contains: u32,
    pub word_in_name: u32,
    pub word_in_description: u32,
    pub word_in_type: u32,
    pub word_in_domain: u32,
    pub latin_script: u32,
    pub topic: u32,
}

/// A topic whose key in the query boosts nodes mentioning any of its keywords.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicBucket {
    pub key: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RuleTableError {
    #[error("failed to read rule table {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse rule table {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

impl RuleTable {
    pub fn load(path: &Path) -> Result<Self, RuleTableError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| RuleTableError::Io {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| RuleTableError::Parse {
            path: display,
            source,
        })
    }

    /// Loads `path` when given, logging and falling back to the built-in table
    /// when it cannot be read.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::load(path).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Using built-in chat rules");
                Self::default()
            }),
            None => Self::default(),
        }
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for KeywordSets {
    fn default() -> Self {
        Self {
            domain: words(&["领域", "domain", "分类"]),
            count: words(&["数量", "多少个", "count", "total", "统计"]),
            recommend: words(&["推荐", "建议", "相关", "类似"]),
            recommend_fallback: words(&["推荐", "建议", "相关", "类似", "热门"]),
            relation: words(&["关系", "连接", "link", "relation", "关联"]),
            relation_count: words(&["数量", "多少个", "count", "total"]),
            relation_type: words(&["类型", "关系类型", "type"]),
            relation_path: words(&["路径", "连接", "路径分析", "path"]),
            summary: words(&["统计", "总结", "summary", "statistics", "概况", "分析"]),
            help: words(&["帮助", "help", "怎么用", "如何使用", "能做什么"]),
        }
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            exact_name: 100,
            exact_id: 90,
            name_contains: 80,
            id_contains: 70,
            description_contains: 60,
            word_in_name: 40,
            word_in_description: 30,
            word_in_type: 25,
            word_in_domain: 20,
            latin_script: 15,
            topic: 35,
        }
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        let topic = |key: &str, keywords: &[&str]| TopicBucket {
            key: key.to_string(),
            keywords: words(keywords),
        };
        Self {
            keywords: KeywordSets::default(),
            weights: ScoreWeights::default(),
            topics: vec![
                topic("ai", &["人工智能", "机器学习", "深度学习", "神经网络", "算法"]),
                topic("medical", &["医学", "医疗", "疾病", "治疗", "药物", "医院"]),
                topic("finance", &["金融", "投资", "股票", "基金", "理财", "银行"]),
                topic("education", &["教育", "学习", "培训", "学校", "课程"]),
                topic("tech", &["技术", "软件", "编程", "开发", "系统"]),
            ],
            search_list_limit: 8,
            fallback_list_limit: 5,
            detail_relation_limit: 6,
            detail_recommendation_limit: 3,
            recommendation_limit: 5,
            path_group_limit: 4,
        }
    }
}

/// Whether `message` contains any of `keywords`.
pub(crate) fn mentions(message: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| message.contains(k.as_str()))
}
