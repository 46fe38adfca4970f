use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::recommend::config::KnowledgePointConfig;
use crate::recommend::source::{KnowledgeSource, PointFilter, ProgressScope, SourceError};
use crate::recommend::types::{Difficulty, LearningProfile};
use crate::store::operations::knowledge::KnowledgePoint;
use crate::store::operations::progress::{KnowledgeProgress, ProgressTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointOptions {
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub include_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgePointRecommendation {
    pub point: KnowledgePoint,
    pub reason: String,
    pub priority: Priority,
    /// Minutes.
    pub estimated_time: u32,
    pub difficulty: Difficulty,
    pub progress: f64,
}

/// 依次判定，命中第一条即返回
pub fn evaluate_priority(
    point: &KnowledgePoint,
    profile: &LearningProfile,
    progress: f64,
) -> (Priority, &'static str) {
    if profile.weak_categories.contains(&point.category_key()) {
        return (Priority::High, "targets a weak area");
    }
    if progress > 0.0 && progress < 100.0 {
        return (Priority::High, "resume incomplete learning");
    }
    if point.difficulty == profile.preferred_difficulty {
        return (Priority::Medium, "difficulty matches current level");
    }
    let title = point.title.to_lowercase();
    let tags: Vec<String> = point.tags.iter().map(|t| t.to_lowercase()).collect();
    let related = profile.recent_topics.iter().any(|topic| {
        let topic = topic.to_lowercase();
        title.contains(&topic) || tags.iter().any(|t| t.contains(&topic))
    });
    if related {
        return (Priority::Medium, "related to recent interest");
    }
    (Priority::Low, "extension content")
}

pub struct KnowledgePointRecommender {
    knowledge: Arc<dyn KnowledgeSource>,
    config: KnowledgePointConfig,
}

impl KnowledgePointRecommender {
    pub fn new(knowledge: Arc<dyn KnowledgeSource>, config: KnowledgePointConfig) -> Self {
        Self { knowledge, config }
    }

    pub async fn recommend(
        &self,
        learner_id: &str,
        profile: &LearningProfile,
        knowledge_base_id: &str,
        options: &PointOptions,
    ) -> Result<Vec<KnowledgePointRecommendation>, SourceError> {
        let count = options.count.unwrap_or(self.config.default_count);
        if count == 0 {
            return Ok(Vec::new());
        }

        let scope = ProgressScope::KnowledgeBase(knowledge_base_id.to_string());
        let published = PointFilter::published();
        let (points, progress) = futures::try_join!(
            self.knowledge.find_knowledge_points(knowledge_base_id, &published),
            self.knowledge.get_progress(learner_id, &scope),
        )?;

        let by_point: HashMap<&str, &KnowledgeProgress> = progress
            .iter()
            .filter_map(|r| match &r.target {
                ProgressTarget::Point(id) => Some((id.as_str(), r)),
                ProgressTarget::Path(_) => None,
            })
            .collect();

        let mut out: Vec<KnowledgePointRecommendation> = points
            .into_iter()
            .filter_map(|point| {
                let record = by_point.get(point.id.as_str()).copied();
                if !options.include_completed && record.is_some_and(|r| r.is_completed()) {
                    return None;
                }
                let progress = record.map_or(0.0, |r| r.progress);
                let (priority, reason) = evaluate_priority(&point, profile, progress);
                if priority == Priority::Low {
                    return None;
                }
                Some(KnowledgePointRecommendation {
                    estimated_time: point
                        .estimated_time_mins
                        .unwrap_or(self.config.default_estimated_time_mins),
                    difficulty: point.difficulty,
                    reason: reason.to_string(),
                    priority,
                    progress,
                    point,
                })
            })
            .collect();

        out.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.estimated_time.cmp(&b.estimated_time))
        });
        out.truncate(count);

        tracing::debug!(
            learner_id,
            knowledge_base_id,
            recommended = out.len(),
            "Knowledge points ranked"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommend::types::ItemCategory;
    use crate::store::operations::ContentStatus;

    fn point(title: &str, subject: &str, difficulty: Difficulty) -> KnowledgePoint {
        KnowledgePoint {
            id: title.to_string(),
            knowledge_base_id: "kb1".to_string(),
            title: title.to_string(),
            category: Some(ItemCategory::new(subject, "rules")),
            tags: vec!["Pool".to_string()],
            difficulty,
            estimated_time_mins: None,
            status: ContentStatus::Published,
        }
    }

    fn profile() -> LearningProfile {
        LearningProfile {
            total_questions: 20,
            accuracy: 0.9,
            weak_categories: vec!["swimming-rules".to_string()],
            preferred_difficulty: Difficulty::Hard,
            recent_topics: vec!["pool".to_string()],
            ..LearningProfile::default()
        }
    }

    #[test]
    fn first_matching_rule_wins() {
        let p = profile();
        assert_eq!(
            evaluate_priority(&point("a", "swimming", Difficulty::Hard), &p, 50.0),
            (Priority::High, "targets a weak area")
        );
        assert_eq!(
            evaluate_priority(&point("b", "running", Difficulty::Hard), &p, 50.0),
            (Priority::High, "resume incomplete learning")
        );
        assert_eq!(
            evaluate_priority(&point("c", "running", Difficulty::Hard), &p, 0.0),
            (Priority::Medium, "difficulty matches current level")
        );
        assert_eq!(
            evaluate_priority(&point("d", "running", Difficulty::Easy), &p, 100.0),
            (Priority::Medium, "related to recent interest")
        );

        let mut unrelated = point("e", "running", Difficulty::Easy);
        unrelated.tags.clear();
        assert_eq!(
            evaluate_priority(&unrelated, &p, 0.0),
            (Priority::Low, "extension content")
        );
    }

    #[test]
    fn priority_orders_high_first() {
        let mut v = vec![Priority::Medium, Priority::High, Priority::Low];
        v.sort_by(|a, b| b.cmp(a));
        assert_eq!(v, vec![Priority::High, Priority::Medium, Priority::Low]);
    }
}
