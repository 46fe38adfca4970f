use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::recommend::config::RecommenderConfig;
use crate::recommend::metrics::MetricsRegistry;
use crate::recommend::source::{CatalogSource, ItemFilter, ItemQuery, SourceError};
use crate::recommend::types::{Difficulty, LearningProfile, RecommendationResult, StrategyType};
use crate::store::operations::questions::Question;

pub type QuestionRecommendation = RecommendationResult<Question>;

pub const WEAKNESS_REASON: &str = "targeted weakness reinforcement";
pub const PROGRESSIVE_REASON: &str = "progressive difficulty aligned to current level";
pub const REVIEW_REASON: &str = "reinforcement of recently studied topics";
pub const EXPLORATION_REASON: &str = "exploration of new topic areas";
pub const FALLBACK_REASON: &str = "overall-performance-based fallback";

/// One selection heuristic over the item catalog.
///
/// Implementors only describe *what* to ask the catalog for via [`plan`];
/// the provided [`recommend`] runs the query and tags the results.
///
/// [`plan`]: CategoryRecommender::plan
/// [`recommend`]: CategoryRecommender::recommend
#[async_trait]
pub trait CategoryRecommender: Send + Sync {
    fn strategy(&self) -> StrategyType;
    fn base_score(&self) -> f64;
    fn reason(&self) -> &'static str;
    fn catalog(&self) -> &dyn CatalogSource;

    /// `None` when the profile gives this strategy nothing to work with.
    fn plan(&self, profile: &LearningProfile, count: usize) -> Option<ItemQuery>;

    /// At most `count` results; an empty list is not an error.
    async fn recommend(
        &self,
        learner_id: &str,
        profile: &LearningProfile,
        count: usize,
    ) -> Result<Vec<QuestionRecommendation>, SourceError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let Some(query) = self.plan(profile, count) else {
            tracing::debug!(learner_id, strategy = self.strategy().as_str(), "Nothing to plan");
            return Ok(Vec::new());
        };

        let items = self.catalog().find_items(&query).await?;
        tracing::debug!(
            learner_id,
            strategy = self.strategy().as_str(),
            candidates = items.len(),
            "Strategy candidates fetched"
        );

        Ok(items
            .into_iter()
            .take(count)
            .map(|item| RecommendationResult {
                item,
                reason: self.reason().to_string(),
                score: self.base_score(),
                strategy_type: self.strategy(),
            })
            .collect())
    }
}

/// Runs one strategy and records its latency and output size.
pub async fn run_timed(
    recommender: &dyn CategoryRecommender,
    metrics: &MetricsRegistry,
    learner_id: &str,
    profile: &LearningProfile,
    count: usize,
) -> Result<Vec<QuestionRecommendation>, SourceError> {
    let start = std::time::Instant::now();
    let result = recommender.recommend(learner_id, profile, count).await;
    let latency_us = start.elapsed().as_micros() as u64;
    match &result {
        Ok(items) => metrics.record_call(recommender.strategy(), latency_us, items.len(), false),
        Err(e) => {
            tracing::warn!(
                learner_id,
                strategy = recommender.strategy().as_str(),
                error = %e,
                "Strategy failed"
            );
            metrics.record_call(recommender.strategy(), latency_us, 0, true);
        }
    }
    result
}

fn exclude_incorrect(profile: &LearningProfile) -> ItemFilter {
    ItemFilter::ExcludeIds(profile.incorrect_question_ids.iter().cloned().collect::<HashSet<_>>())
}

pub struct WeaknessRecommender {
    catalog: Arc<dyn CatalogSource>,
    base_score: f64,
}

impl WeaknessRecommender {
    pub fn new(catalog: Arc<dyn CatalogSource>, base_score: f64) -> Self {
        Self { catalog, base_score }
    }
}

#[async_trait]
impl CategoryRecommender for WeaknessRecommender {
    fn strategy(&self) -> StrategyType {
        StrategyType::Weakness
    }

    fn base_score(&self) -> f64 {
        self.base_score
    }

    fn reason(&self) -> &'static str {
        WEAKNESS_REASON
    }

    fn catalog(&self) -> &dyn CatalogSource {
        self.catalog.as_ref()
    }

    fn plan(&self, profile: &LearningProfile, count: usize) -> Option<ItemQuery> {
        if profile.weak_categories.is_empty() {
            return None;
        }
        // 薄弱环节从简单题开始
        Some(
            ItemQuery::new(count)
                .with(ItemFilter::InCategories(profile.weak_categories.clone()))
                .with(ItemFilter::DifficultyIn(vec![Difficulty::Easy, Difficulty::Medium]))
                .with(exclude_incorrect(profile)),
        )
    }
}

pub struct ProgressiveRecommender {
    catalog: Arc<dyn CatalogSource>,
    base_score: f64,
    harder_above: f64,
    easier_below: f64,
}

impl ProgressiveRecommender {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        base_score: f64,
        harder_above: f64,
        easier_below: f64,
    ) -> Self {
        Self {
            catalog,
            base_score,
            harder_above,
            easier_below,
        }
    }

    pub fn difficulty_window(&self, accuracy: f64) -> Vec<Difficulty> {
        if accuracy > self.harder_above {
            vec![Difficulty::Medium, Difficulty::Hard]
        } else if accuracy < self.easier_below {
            vec![Difficulty::Easy, Difficulty::Medium]
        } else {
            vec![Difficulty::Medium]
        }
    }
}

#[async_trait]
impl CategoryRecommender for ProgressiveRecommender {
    fn strategy(&self) -> StrategyType {
        StrategyType::Progressive
    }

    fn base_score(&self) -> f64 {
        self.base_score
    }

    fn reason(&self) -> &'static str {
        PROGRESSIVE_REASON
    }

    fn catalog(&self) -> &dyn CatalogSource {
        self.catalog.as_ref()
    }

    fn plan(&self, profile: &LearningProfile, count: usize) -> Option<ItemQuery> {
        Some(
            ItemQuery::new(count)
                .with(ItemFilter::DifficultyIn(self.difficulty_window(profile.accuracy)))
                .with(exclude_incorrect(profile)),
        )
    }
}

pub struct ReviewRecommender {
    catalog: Arc<dyn CatalogSource>,
    base_score: f64,
}

impl ReviewRecommender {
    pub fn new(catalog: Arc<dyn CatalogSource>, base_score: f64) -> Self {
        Self { catalog, base_score }
    }
}

#[async_trait]
impl CategoryRecommender for ReviewRecommender {
    fn strategy(&self) -> StrategyType {
        StrategyType::Review
    }

    fn base_score(&self) -> f64 {
        self.base_score
    }

    fn reason(&self) -> &'static str {
        REVIEW_REASON
    }

    fn catalog(&self) -> &dyn CatalogSource {
        self.catalog.as_ref()
    }

    fn plan(&self, profile: &LearningProfile, count: usize) -> Option<ItemQuery> {
        if profile.recent_topics.is_empty() {
            return None;
        }
        Some(
            ItemQuery::new(count)
                .with(ItemFilter::TagsIntersect(profile.recent_topics.clone()))
                .with(ItemFilter::DifficultyIn(vec![profile.preferred_difficulty]))
                .with(exclude_incorrect(profile)),
        )
    }
}

pub struct ExplorationRecommender {
    catalog: Arc<dyn CatalogSource>,
    base_score: f64,
}

impl ExplorationRecommender {
    pub fn new(catalog: Arc<dyn CatalogSource>, base_score: f64) -> Self {
        Self { catalog, base_score }
    }
}

#[async_trait]
impl CategoryRecommender for ExplorationRecommender {
    fn strategy(&self) -> StrategyType {
        StrategyType::Exploration
    }

    fn base_score(&self) -> f64 {
        self.base_score
    }

    fn reason(&self) -> &'static str {
        EXPLORATION_REASON
    }

    fn catalog(&self) -> &dyn CatalogSource {
        self.catalog.as_ref()
    }

    fn plan(&self, profile: &LearningProfile, count: usize) -> Option<ItemQuery> {
        let mut query = ItemQuery::new(count).with(ItemFilter::DifficultyIn(vec![Difficulty::Easy]));
        if !profile.mastered_topics.is_empty() {
            query = query.with(ItemFilter::OutsideCategories(profile.mastered_topics.clone()));
        }
        Some(query.with(exclude_incorrect(profile)))
    }
}

/// The four primary strategies, built from one config snapshot.
pub struct StrategySet {
    pub weakness: WeaknessRecommender,
    pub progressive: ProgressiveRecommender,
    pub review: ReviewRecommender,
    pub exploration: ExplorationRecommender,
}

impl StrategySet {
    pub fn new(catalog: Arc<dyn CatalogSource>, config: &RecommenderConfig) -> Self {
        Self {
            weakness: WeaknessRecommender::new(catalog.clone(), config.scores.weakness),
            progressive: ProgressiveRecommender::new(
                catalog.clone(),
                config.scores.progressive,
                config.progressive.harder_above,
                config.progressive.easier_below,
            ),
            review: ReviewRecommender::new(catalog.clone(), config.scores.review),
            exploration: ExplorationRecommender::new(catalog, config.scores.exploration),
        }
    }

    pub fn get(&self, strategy: StrategyType) -> Option<&dyn CategoryRecommender> {
        match strategy {
            StrategyType::Weakness => Some(&self.weakness),
            StrategyType::Progressive => Some(&self.progressive),
            StrategyType::Review => Some(&self.review),
            StrategyType::Exploration => Some(&self.exploration),
            StrategyType::Similar => None,
        }
    }
}

/// 降级推荐：只按单一难度取题
pub struct FallbackRecommender {
    catalog: Arc<dyn CatalogSource>,
    score: f64,
}

impl FallbackRecommender {
    pub fn new(catalog: Arc<dyn CatalogSource>, score: f64) -> Self {
        Self { catalog, score }
    }

    pub async fn recommend(
        &self,
        difficulties: Vec<Difficulty>,
        count: usize,
    ) -> Result<Vec<QuestionRecommendation>, SourceError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let query = ItemQuery::new(count).with(ItemFilter::DifficultyIn(difficulties));
        let items = self.catalog.find_items(&query).await?;
        Ok(items
            .into_iter()
            .take(count)
            .map(|item| RecommendationResult {
                item,
                reason: FALLBACK_REASON.to_string(),
                score: self.score,
                strategy_type: StrategyType::Similar,
            })
            .collect())
    }
}
