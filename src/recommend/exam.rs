use serde::{Deserialize, Serialize};

use crate::recommend::aggregator::fill_quotas;
use crate::recommend::config::ExamConfig;
use crate::recommend::metrics::MetricsRegistry;
use crate::recommend::source::SourceError;
use crate::recommend::strategies::{run_timed, StrategySet};
use crate::recommend::types::{Difficulty, ExamDistribution, LearningProfile, StrategyType};
use crate::store::operations::questions::Question;

pub const DEFAULT_TIME_LIMIT_MINS: u32 = 60;
pub const DEFAULT_QUESTION_COUNT: usize = 20;

fn default_question_count() -> usize {
    DEFAULT_QUESTION_COUNT
}

/// Exam request. Only `question_count` drives composition; the other fields
/// are carried through to the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRequest {
    #[serde(default = "default_question_count")]
    pub question_count: usize,
    #[serde(default)]
    pub difficulty: Option<Vec<Difficulty>>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub time_limit: Option<u32>,
    #[serde(default)]
    pub focus_weakness: Option<bool>,
}

impl ExamRequest {
    pub fn new(question_count: usize) -> Self {
        Self {
            question_count,
            difficulty: None,
            categories: None,
            time_limit: None,
            focus_weakness: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedExam {
    pub items: Vec<Question>,
    pub distribution: ExamDistribution,
    pub reasoning: String,
}

pub fn exam_distribution(accuracy: f64, question_count: usize, config: &ExamConfig) -> ExamDistribution {
    config.mix_for(accuracy).split(question_count)
}

pub fn performance_label(accuracy: f64, config: &ExamConfig) -> &'static str {
    if accuracy > config.excellent_above {
        "excellent"
    } else if accuracy > config.good_above {
        "good"
    } else {
        "needs improvement"
    }
}

pub fn exam_reasoning(accuracy: f64, distribution: &ExamDistribution, config: &ExamConfig) -> String {
    let parts: Vec<String> = [
        (distribution.weakness, "weakness reinforcement"),
        (distribution.progressive, "progressive"),
        (distribution.review, "review"),
        (distribution.exploration, "exploration"),
    ]
    .into_iter()
    .filter(|(n, _)| *n > 0)
    .map(|(n, label)| format!("{n} {label}"))
    .collect();

    let mix = if parts.is_empty() {
        "no items".to_string()
    } else {
        parts.join(", ")
    };
    format!(
        "Your current performance is {}; this exam combines {mix} items to target your next improvements.",
        performance_label(accuracy, config)
    )
}

pub struct ExamComposer<'a> {
    strategies: &'a StrategySet,
    config: &'a ExamConfig,
    metrics: &'a MetricsRegistry,
}

impl<'a> ExamComposer<'a> {
    pub fn new(strategies: &'a StrategySet, config: &'a ExamConfig, metrics: &'a MetricsRegistry) -> Self {
        Self {
            strategies,
            config,
            metrics,
        }
    }

    /// Buckets are fetched concurrently but filled in strategy order. Every
    /// non-empty bucket asks for up to `question_count` candidates so that
    /// overlap between buckets can be made up from the spare ones.
    /// Any catalog failure is returned as is.
    pub async fn compose(
        &self,
        learner_id: &str,
        profile: &LearningProfile,
        question_count: usize,
    ) -> Result<ComposedExam, SourceError> {
        let distribution = exam_distribution(profile.accuracy, question_count, self.config);

        let bucket = |strategy: StrategyType| async move {
            match self.strategies.get(strategy) {
                Some(recommender) if distribution.for_strategy(strategy) > 0 => {
                    run_timed(recommender, self.metrics, learner_id, profile, question_count).await
                }
                _ => Ok(Vec::new()),
            }
        };

        let (weakness, progressive, review, exploration) = futures::join!(
            bucket(StrategyType::Weakness),
            bucket(StrategyType::Progressive),
            bucket(StrategyType::Review),
            bucket(StrategyType::Exploration),
        );

        let buckets = vec![
            (weakness?, distribution.weakness),
            (progressive?, distribution.progressive),
            (review?, distribution.review),
            (exploration?, distribution.exploration),
        ];
        let mut items: Vec<Question> = fill_quotas(buckets, question_count)
            .into_iter()
            .flatten()
            .map(|r| r.item)
            .collect();
        items.truncate(question_count);

        tracing::info!(
            learner_id,
            requested = question_count,
            composed = items.len(),
            weakness = distribution.weakness,
            progressive = distribution.progressive,
            review = distribution.review,
            exploration = distribution.exploration,
            "Exam composed"
        );

        Ok(ComposedExam {
            items,
            reasoning: exam_reasoning(profile.accuracy, &distribution, self.config),
            distribution,
        })
    }
}
