use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::recommend::config::PathScoringConfig;
use crate::recommend::source::{KnowledgeSource, PathCandidate, PathFilter, ProgressScope, SourceError};
use crate::recommend::types::{LearningProfile, PathLevel};
use crate::store::operations::knowledge::{KnowledgeBase, LearningPath};
use crate::store::operations::progress::ProgressTarget;

const DIFFICULTY_REASON_ABOVE: f64 = 0.7;
const WEAKNESS_REASON_ABOVE: f64 = 0.6;
const INTEREST_REASON_ABOVE: f64 = 0.7;
const PREREQUISITE_REASON_ABOVE: f64 = 0.8;
const SHORT_PATH_MINS: u32 = 120;
const HIGH_COMPLETION_RATE: f64 = 80.0;
const HIGH_RATING: f64 = 4.5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathOptions {
    #[serde(default)]
    pub knowledge_base_id: Option<String>,
    #[serde(default)]
    pub difficulty: Option<PathLevel>,
    #[serde(default)]
    pub max_paths: Option<usize>,
    #[serde(default)]
    pub include_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRecommendation {
    pub path: LearningPath,
    pub knowledge_base: Option<KnowledgeBase>,
    pub reason: String,
    pub score: f64,
    pub match_reasons: Vec<String>,
    /// 已完成知识点占比，0-100
    pub estimated_progress: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRecommendations {
    pub recommended_paths: Vec<PathRecommendation>,
    pub user_analysis: LearningProfile,
}

/// Per-term breakdown of one path score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathScore {
    pub score: f64,
    pub difficulty_match: f64,
    pub weakness_coverage: f64,
    pub interest_match: f64,
    pub prerequisite_satisfaction: f64,
    pub popularity_bonus: f64,
}

pub fn difficulty_match(path: PathLevel, profile: &LearningProfile, cfg: &PathScoringConfig) -> f64 {
    let learner = PathLevel::from_difficulty(profile.preferred_difficulty);
    let steps = (learner.ordinal() - path.ordinal()).abs() as f64;
    (1.0 - steps * cfg.difficulty_step_penalty).max(0.0)
}

pub fn weakness_coverage(candidate: &PathCandidate, profile: &LearningProfile, cfg: &PathScoringConfig) -> f64 {
    if profile.weak_categories.is_empty() {
        return cfg.neutral_fraction;
    }
    let covered: HashSet<String> = candidate
        .points
        .iter()
        .filter(|p| p.category.is_some())
        .map(|p| p.category_key())
        .collect();
    let hits = profile
        .weak_categories
        .iter()
        .filter(|c| covered.contains(*c))
        .count();
    (hits as f64 / profile.weak_categories.len() as f64).min(1.0)
}

/// Case-insensitive substring match of recent topics against path tags, the
/// knowledge-base category and constituent point titles.
pub fn interest_match(candidate: &PathCandidate, profile: &LearningProfile, cfg: &PathScoringConfig) -> f64 {
    if profile.recent_topics.is_empty() {
        return cfg.neutral_fraction;
    }
    let mut haystack: Vec<String> = candidate.path.tags.iter().map(|t| t.to_lowercase()).collect();
    if let Some(kb) = &candidate.knowledge_base {
        haystack.push(kb.category.to_lowercase());
    }
    haystack.extend(candidate.points.iter().map(|p| p.title.to_lowercase()));

    let hits = profile
        .recent_topics
        .iter()
        .map(|t| t.to_lowercase())
        .filter(|topic| haystack.iter().any(|h| h.contains(topic.as_str())))
        .count();
    (hits as f64 / profile.recent_topics.len() as f64).min(1.0)
}

pub fn prerequisite_satisfaction(path: &LearningPath, completed_points: &HashSet<String>) -> f64 {
    if path.prerequisites.is_empty() {
        return 1.0;
    }
    let done = path
        .prerequisites
        .iter()
        .filter(|p| completed_points.contains(*p))
        .count();
    done as f64 / path.prerequisites.len() as f64
}

pub fn score_path(
    candidate: &PathCandidate,
    profile: &LearningProfile,
    completed_points: &HashSet<String>,
    cfg: &PathScoringConfig,
) -> PathScore {
    let difficulty_match = difficulty_match(candidate.path.difficulty, profile, cfg);
    let weakness_coverage = weakness_coverage(candidate, profile, cfg);
    let interest_match = interest_match(candidate, profile, cfg);
    let prerequisite_satisfaction = prerequisite_satisfaction(&candidate.path, completed_points);
    let popularity_bonus =
        (candidate.path.stats.learners as f64 / cfg.popularity_divisor).min(cfg.popularity_cap);

    let raw = cfg.base_score
        + difficulty_match * cfg.difficulty_weight
        + weakness_coverage * cfg.weakness_weight
        + interest_match * cfg.interest_weight
        + prerequisite_satisfaction * cfg.prerequisite_weight
        + popularity_bonus;

    PathScore {
        score: raw.clamp(0.0, 1.0),
        difficulty_match,
        weakness_coverage,
        interest_match,
        prerequisite_satisfaction,
        popularity_bonus,
    }
}

pub fn score_reason(score: &PathScore) -> String {
    let mut reasons = Vec::new();
    if score.difficulty_match > DIFFICULTY_REASON_ABOVE {
        reasons.push("appropriate difficulty");
    }
    if score.weakness_coverage > WEAKNESS_REASON_ABOVE {
        reasons.push("targets weak areas");
    }
    if score.interest_match > INTEREST_REASON_ABOVE {
        reasons.push("matches learning interests");
    }
    if score.prerequisite_satisfaction > PREREQUISITE_REASON_ABOVE {
        reasons.push("prerequisites satisfied");
    }
    if reasons.is_empty() {
        "recommended by comprehensive analysis".to_string()
    } else {
        reasons.join(", ")
    }
}

pub fn match_reasons(
    path: &LearningPath,
    profile: &LearningProfile,
    score: &PathScore,
    max_reasons: usize,
) -> Vec<String> {
    let mut reasons = Vec::new();
    if path.difficulty == PathLevel::from_difficulty(profile.preferred_difficulty) {
        reasons.push(format!("suited to your current {} level", path.difficulty.as_str()));
    }
    if score.weakness_coverage > WEAKNESS_REASON_ABOVE {
        reasons.push("strengthens your weak knowledge areas".to_string());
    }
    if score.interest_match > INTEREST_REASON_ABOVE {
        reasons.push("related to what you studied recently".to_string());
    }
    if path.estimated_duration_mins.is_some_and(|m| m <= SHORT_PATH_MINS) {
        reasons.push("moderate length, easy to finish".to_string());
    }
    if path.stats.completion_rate > HIGH_COMPLETION_RATE {
        reasons.push("high completion rate".to_string());
    }
    if path.stats.avg_rating > HIGH_RATING {
        reasons.push("highly rated by learners".to_string());
    }
    reasons.truncate(max_reasons);
    reasons
}

pub fn estimated_progress(path: &LearningPath, completed_points: &HashSet<String>) -> u32 {
    if path.knowledge_point_ids.is_empty() {
        return 0;
    }
    let done = path
        .knowledge_point_ids
        .iter()
        .filter(|p| completed_points.contains(*p))
        .count();
    (done as f64 / path.knowledge_point_ids.len() as f64 * 100.0).round() as u32
}

pub struct PathRecommender {
    knowledge: Arc<dyn KnowledgeSource>,
    config: PathScoringConfig,
}

impl PathRecommender {
    pub fn new(knowledge: Arc<dyn KnowledgeSource>, config: PathScoringConfig) -> Self {
        Self { knowledge, config }
    }

    /// Callers validate `options.knowledge_base_id` first; an unknown base
    /// simply matches no paths here.
    pub async fn recommend(
        &self,
        learner_id: &str,
        profile: &LearningProfile,
        options: &PathOptions,
    ) -> Result<Vec<PathRecommendation>, SourceError> {
        let max_paths = options.max_paths.unwrap_or(self.config.default_max_paths);
        if max_paths == 0 {
            return Ok(Vec::new());
        }

        let filter = PathFilter {
            knowledge_base_id: options.knowledge_base_id.clone(),
            level: options.difficulty,
            ..PathFilter::discoverable()
        };
        let scope = ProgressScope::Everything;
        let (candidates, progress) = futures::try_join!(
            self.knowledge.find_learning_paths(&filter),
            self.knowledge.get_progress(learner_id, &scope),
        )?;

        let mut completed_paths = HashSet::new();
        let mut completed_points = HashSet::new();
        for record in progress.iter().filter(|r| r.is_completed()) {
            match &record.target {
                ProgressTarget::Path(id) => completed_paths.insert(id.clone()),
                ProgressTarget::Point(id) => completed_points.insert(id.clone()),
            };
        }

        let total = candidates.len();
        let mut scored: Vec<PathRecommendation> = candidates
            .into_iter()
            .filter(|c| options.include_completed || !completed_paths.contains(&c.path.id))
            .filter_map(|candidate| {
                let score = score_path(&candidate, profile, &completed_points, &self.config);
                if score.score <= self.config.min_score {
                    return None;
                }
                Some(PathRecommendation {
                    reason: score_reason(&score),
                    match_reasons: match_reasons(
                        &candidate.path,
                        profile,
                        &score,
                        self.config.max_match_reasons,
                    ),
                    estimated_progress: estimated_progress(&candidate.path, &completed_points),
                    score: score.score,
                    path: candidate.path,
                    knowledge_base: candidate.knowledge_base,
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(max_paths);

        tracing::debug!(
            learner_id,
            candidates = total,
            recommended = scored.len(),
            "Learning paths scored"
        );
        Ok(scored)
    }
}
