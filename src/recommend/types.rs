use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_SUBJECT: &str = "未分类";
pub const DEFAULT_KNOWLEDGE_TYPE: &str = "基础";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn ordinal(&self) -> i32 {
        match self {
            Self::Easy => 0,
            Self::Medium => 1,
            Self::Hard => 2,
        }
    }

    /// 按整体正确率划分难度段：高于 `hard_above` 为 hard，低于 `easy_below` 为 easy
    pub fn from_accuracy(accuracy: f64, hard_above: f64, easy_below: f64) -> Self {
        if accuracy > hard_above {
            Self::Hard
        } else if accuracy < easy_below {
            Self::Easy
        } else {
            Self::Medium
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// Learning-path difficulty scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl PathLevel {
    pub fn ordinal(&self) -> i32 {
        match self {
            Self::Beginner => 0,
            Self::Intermediate => 1,
            Self::Advanced => 2,
        }
    }

    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self::Beginner,
            Difficulty::Medium => Self::Intermediate,
            Difficulty::Hard => Self::Advanced,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl FromStr for PathLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" | "easy" => Ok(Self::Beginner),
            "intermediate" | "medium" => Ok(Self::Intermediate),
            "advanced" | "hard" => Ok(Self::Advanced),
            other => Err(format!("unknown path difficulty: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemCategory {
    pub subject: String,
    pub knowledge_type: String,
}

impl ItemCategory {
    pub fn new(subject: impl Into<String>, knowledge_type: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            knowledge_type: knowledge_type.into(),
        }
    }

    pub fn key(&self) -> String {
        let subject = if self.subject.is_empty() {
            DEFAULT_SUBJECT
        } else {
            self.subject.as_str()
        };
        let knowledge_type = if self.knowledge_type.is_empty() {
            DEFAULT_KNOWLEDGE_TYPE
        } else {
            self.knowledge_type.as_str()
        };
        format!("{subject}-{knowledge_type}")
    }
}

/// `"<subject>-<knowledgeType>"`，缺失分类时归入 `未分类-基础`
pub fn category_key(category: Option<&ItemCategory>) -> String {
    match category {
        Some(c) => c.key(),
        None => format!("{DEFAULT_SUBJECT}-{DEFAULT_KNOWLEDGE_TYPE}"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyType {
    Weakness,
    Progressive,
    Review,
    Exploration,
    Similar,
}

impl StrategyType {
    pub const PRIMARY: [StrategyType; 4] = [
        StrategyType::Weakness,
        StrategyType::Progressive,
        StrategyType::Review,
        StrategyType::Exploration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weakness => "weakness",
            Self::Progressive => "progressive",
            Self::Review => "review",
            Self::Exploration => "exploration",
            Self::Similar => "similar",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Weakness => "薄弱环节强化",
            Self::Progressive => "渐进式学习",
            Self::Review => "复习巩固",
            Self::Exploration => "探索新领域",
            Self::Similar => "综合推荐",
        }
    }
}

/// Anything a recommendation can point at.
pub trait CatalogEntry {
    fn entry_id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResult<T> {
    pub item: T,
    pub reason: String,
    pub score: f64,
    pub strategy_type: StrategyType,
}

impl<T: CatalogEntry> RecommendationResult<T> {
    pub fn id(&self) -> &str {
        self.item.entry_id()
    }
}

/// 学习画像，每次请求重新计算，不落库
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningProfile {
    pub total_questions: u64,
    pub accuracy: f64,
    pub weak_categories: Vec<String>,
    pub strong_categories: Vec<String>,
    pub mastered_topics: Vec<String>,
    pub preferred_difficulty: Difficulty,
    pub recent_topics: Vec<String>,
    pub incorrect_question_ids: Vec<String>,
}

impl Default for LearningProfile {
    fn default() -> Self {
        Self {
            total_questions: 0,
            accuracy: 0.0,
            weak_categories: Vec::new(),
            strong_categories: Vec::new(),
            mastered_topics: Vec::new(),
            preferred_difficulty: Difficulty::Medium,
            recent_topics: Vec::new(),
            incorrect_question_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamDistribution {
    pub weakness: usize,
    pub progressive: usize,
    pub review: usize,
    pub exploration: usize,
}

impl ExamDistribution {
    pub fn total(&self) -> usize {
        self.weakness + self.progressive + self.review + self.exploration
    }

    pub fn for_strategy(&self, strategy: StrategyType) -> usize {
        match strategy {
            StrategyType::Weakness => self.weakness,
            StrategyType::Progressive => self.progressive,
            StrategyType::Review => self.review,
            StrategyType::Exploration => self.exploration,
            StrategyType::Similar => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_key_uses_defaults_for_missing_parts() {
        assert_eq!(category_key(None), "未分类-基础");
        assert_eq!(ItemCategory::new("", "").key(), "未分类-基础");
        assert_eq!(ItemCategory::new("swimming", "rules").key(), "swimming-rules");
    }

    #[test]
    fn difficulty_bands() {
        assert_eq!(Difficulty::from_accuracy(0.81, 0.8, 0.5), Difficulty::Hard);
        assert_eq!(Difficulty::from_accuracy(0.8, 0.8, 0.5), Difficulty::Medium);
        assert_eq!(Difficulty::from_accuracy(0.5, 0.8, 0.5), Difficulty::Medium);
        assert_eq!(Difficulty::from_accuracy(0.49, 0.8, 0.5), Difficulty::Easy);
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("HARD".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn default_profile_is_zero_valued() {
        let p = LearningProfile::default();
        assert_eq!(p.total_questions, 0);
        assert_eq!(p.accuracy, 0.0);
        assert_eq!(p.preferred_difficulty, Difficulty::Medium);
        assert!(p.weak_categories.is_empty());
        assert!(p.recent_topics.is_empty());
    }

    #[test]
    fn serializes_enums_lowercase() {
        let v = serde_json::to_value(StrategyType::Exploration).unwrap();
        assert_eq!(v, serde_json::json!("exploration"));
        let v = serde_json::to_value(PathLevel::Intermediate).unwrap();
        assert_eq!(v, serde_json::json!("intermediate"));
    }
}
