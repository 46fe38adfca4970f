use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::recommend::aggregator;
use crate::recommend::config::RecommenderConfig;
use crate::recommend::exam::{ComposedExam, ExamComposer, ExamRequest, DEFAULT_TIME_LIMIT_MINS};
use crate::recommend::knowledge_points::{KnowledgePointRecommendation, KnowledgePointRecommender, PointOptions};
use crate::recommend::metrics::MetricsRegistry;
use crate::recommend::paths::{PathOptions, PathRecommendations, PathRecommender};
use crate::recommend::profile::{DegradeReason, ProfileAnalyzer, ProfileOutcome};
use crate::recommend::source::{CatalogSource, HistorySource, KnowledgeSource};
use crate::recommend::strategies::{run_timed, FallbackRecommender, QuestionRecommendation, StrategySet};
use crate::recommend::types::{Difficulty, LearningProfile, StrategyType};
use crate::recommend::RecommendError;
use crate::store::Store;
use crate::validation::is_valid_id;

const STATS_PROBE_COUNT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartRequest {
    pub count: usize,
    /// Only consulted by the fallback tier.
    #[serde(default)]
    pub difficulty: Option<Vec<Difficulty>>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub exclude_answered: bool,
    #[serde(default = "default_true")]
    pub focus_weakness: bool,
    #[serde(default = "default_true")]
    pub review_mode: bool,
}

fn default_true() -> bool {
    true
}

impl SmartRequest {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            difficulty: None,
            categories: None,
            exclude_answered: true,
            focus_weakness: true,
            review_mode: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationTier {
    Primary,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackCause {
    NoHistory,
    StoreUnavailable,
    StrategyFailure,
}

impl From<DegradeReason> for FallbackCause {
    fn from(reason: DegradeReason) -> Self {
        match reason {
            DegradeReason::NoHistory => Self::NoHistory,
            DegradeReason::StoreUnavailable => Self::StoreUnavailable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartRecommendations {
    pub tier: RecommendationTier,
    pub fallback_cause: Option<FallbackCause>,
    pub recommendations: Vec<QuestionRecommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningAnalysis {
    pub profile: LearningProfile,
    pub degraded: Option<DegradeReason>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamConfigEcho {
    pub question_count: usize,
    pub difficulty: Option<Vec<Difficulty>>,
    pub categories: Option<Vec<String>>,
    pub time_limit: u32,
    pub focus_weakness: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamComposition {
    #[serde(flatten)]
    pub exam: ComposedExam,
    pub config: ExamConfigEcho,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyCounts {
    pub weakness: usize,
    pub progressive: usize,
    pub review: usize,
    pub exploration: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationStats {
    pub stats: StrategyCounts,
    pub labels: Vec<(StrategyType, &'static str)>,
}

pub fn analysis_suggestions(profile: &LearningProfile) -> Vec<String> {
    let mut suggestions = Vec::new();
    if !profile.weak_categories.is_empty() {
        suggestions.push(format!("focus on weak areas: {}", profile.weak_categories.join(", ")));
    }
    if profile.accuracy < 0.6 {
        suggestions.push("strengthen fundamentals to raise accuracy".to_string());
    }
    if profile.accuracy > 0.8 {
        suggestions.push("fundamentals are solid; try harder material".to_string());
    }
    if profile.total_questions < 50 {
        suggestions.push("practise more to consolidate knowledge".to_string());
    }
    suggestions
}

pub struct RecommendationEngine {
    config: Arc<RwLock<RecommenderConfig>>,
    catalog: Arc<dyn CatalogSource>,
    history: Arc<dyn HistorySource>,
    knowledge: Arc<dyn KnowledgeSource>,
    metrics: Arc<MetricsRegistry>,
}

impl RecommendationEngine {
    pub fn new(config: RecommenderConfig, store: Arc<Store>) -> Self {
        Self::with_sources(config, store.clone(), store.clone(), store)
    }

    pub fn with_sources(
        config: RecommenderConfig,
        catalog: Arc<dyn CatalogSource>,
        history: Arc<dyn HistorySource>,
        knowledge: Arc<dyn KnowledgeSource>,
    ) -> Self {
        let metrics = Arc::new(MetricsRegistry::new(config.metrics_enabled));
        Self {
            config: Arc::new(RwLock::new(config)),
            catalog,
            history,
            knowledge,
            metrics,
        }
    }

    pub async fn reload_config(&self, new_config: RecommenderConfig) -> Result<(), RecommendError> {
        new_config.validate().map_err(RecommendError::InvalidConfig)?;
        self.metrics.set_enabled(new_config.metrics_enabled);
        let mut cfg = self.config.write().await;
        *cfg = new_config;
        tracing::info!("Recommender config reloaded");
        Ok(())
    }

    pub async fn get_config(&self) -> RecommenderConfig {
        self.config.read().await.clone()
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    async fn analyze_with(&self, learner_id: &str, config: &RecommenderConfig) -> ProfileOutcome {
        let outcome = ProfileAnalyzer::new(self.history.clone())
            .analyze(learner_id, &config.profile)
            .await;
        if outcome.is_degraded() {
            self.metrics.record_degraded_profile();
        }
        outcome
    }

    /// Profile accessor for diagnostics; a degraded outcome is still returned as data.
    pub async fn analyze_profile(&self, learner_id: &str) -> ProfileOutcome {
        let config = self.get_config().await;
        self.analyze_with(learner_id, &config).await
    }

    pub async fn learning_analysis(&self, learner_id: &str) -> LearningAnalysis {
        let outcome = self.analyze_profile(learner_id).await;
        let degraded = outcome.degrade_reason();
        let profile = outcome.into_profile();
        LearningAnalysis {
            suggestions: analysis_suggestions(&profile),
            profile,
            degraded,
        }
    }

    /// Multi-strategy recommendations with one level of degradation. Never fails.
    pub async fn smart_recommendations(
        &self,
        learner_id: &str,
        request: &SmartRequest,
    ) -> SmartRecommendations {
        let config = self.get_config().await;
        let count = request.count.min(config.max_count);

        let profile = match self.analyze_with(learner_id, &config).await {
            ProfileOutcome::Analyzed(profile) => profile,
            ProfileOutcome::Degraded { reason, .. } => {
                tracing::warn!(learner_id, ?reason, "Profile degraded, using fallback recommendations");
                return self
                    .fallback(learner_id, request, count, &config, reason.into())
                    .await;
            }
        };

        let strategies = StrategySet::new(self.catalog.clone(), &config);
        let mix = config.smart_mix.split(count);
        let enabled = |strategy: StrategyType| match strategy {
            StrategyType::Weakness => request.focus_weakness,
            StrategyType::Review => request.review_mode,
            _ => true,
        };

        let strategies = &strategies;
        let profile = &profile;
        let run = |strategy: StrategyType| async move {
            match strategies.get(strategy) {
                Some(recommender) if enabled(strategy) && mix.for_strategy(strategy) > 0 => {
                    run_timed(recommender, &self.metrics, learner_id, profile, count).await
                }
                _ => Ok(Vec::new()),
            }
        };

        // 并发执行，按策略顺序分配配额；每个策略多取到 count 条以填补重叠
        let (weakness, progressive, review, exploration) = futures::join!(
            run(StrategyType::Weakness),
            run(StrategyType::Progressive),
            run(StrategyType::Review),
            run(StrategyType::Exploration),
        );

        let lists = match (weakness, progressive, review, exploration) {
            (Ok(w), Ok(p), Ok(r), Ok(e)) => aggregator::fill_quotas(
                vec![
                    (w, mix.weakness),
                    (p, mix.progressive),
                    (r, mix.review),
                    (e, mix.exploration),
                ],
                count,
            ),
            _ => {
                tracing::warn!(learner_id, "Strategy failed, using fallback recommendations");
                return self
                    .fallback(learner_id, request, count, &config, FallbackCause::StrategyFailure)
                    .await;
            }
        };

        let mut recommendations = aggregator::merge(lists);
        recommendations.truncate(count);

        SmartRecommendations {
            tier: RecommendationTier::Primary,
            fallback_cause: None,
            recommendations,
        }
    }

    async fn fallback_difficulties(
        &self,
        learner_id: &str,
        request: &SmartRequest,
        config: &RecommenderConfig,
    ) -> Result<Vec<Difficulty>, crate::recommend::source::SourceError> {
        if let Some(requested) = request.difficulty.as_ref().filter(|d| !d.is_empty()) {
            return Ok(requested.clone());
        }
        let band = match self.history.learner_stats(learner_id).await? {
            Some(stats) if stats.total_answered > 0 => Difficulty::from_accuracy(
                stats.accuracy,
                config.profile.hard_above,
                config.profile.easy_below,
            ),
            _ => Difficulty::Medium,
        };
        Ok(vec![band])
    }

    async fn fallback(
        &self,
        learner_id: &str,
        request: &SmartRequest,
        count: usize,
        config: &RecommenderConfig,
        cause: FallbackCause,
    ) -> SmartRecommendations {
        self.metrics.record_fallback();
        let start = std::time::Instant::now();

        let result = match self.fallback_difficulties(learner_id, request, config).await {
            Ok(difficulties) => {
                FallbackRecommender::new(self.catalog.clone(), config.scores.fallback)
                    .recommend(difficulties, count)
                    .await
            }
            Err(e) => Err(e),
        };
        let latency_us = start.elapsed().as_micros() as u64;

        let recommendations = match result {
            Ok(items) => {
                self.metrics
                    .record_call(StrategyType::Similar, latency_us, items.len(), false);
                items
            }
            Err(e) => {
                tracing::error!(learner_id, error = %e, "Fallback recommendations unavailable");
                self.metrics.record_call(StrategyType::Similar, latency_us, 0, true);
                Vec::new()
            }
        };

        SmartRecommendations {
            tier: RecommendationTier::Fallback,
            fallback_cause: Some(cause),
            recommendations,
        }
    }

    /// Exam composition does not degrade: catalog failures are returned.
    pub async fn compose_exam(
        &self,
        learner_id: &str,
        request: &ExamRequest,
    ) -> Result<ExamComposition, RecommendError> {
        let config = self.get_config().await;
        if request.question_count == 0 || request.question_count > config.max_count {
            return Err(RecommendError::InvalidRequest(format!(
                "questionCount must be between 1 and {}",
                config.max_count
            )));
        }

        let profile = self.analyze_with(learner_id, &config).await.into_profile();
        let strategies = StrategySet::new(self.catalog.clone(), &config);
        let exam = ExamComposer::new(&strategies, &config.exam, &self.metrics)
            .compose(learner_id, &profile, request.question_count)
            .await?;

        Ok(ExamComposition {
            exam,
            config: ExamConfigEcho {
                question_count: request.question_count,
                difficulty: request.difficulty.clone(),
                categories: request.categories.clone(),
                time_limit: request.time_limit.unwrap_or(DEFAULT_TIME_LIMIT_MINS),
                focus_weakness: request.focus_weakness,
            },
        })
    }

    async fn knowledge_base_exists(&self, base_id: &str) -> Result<bool, RecommendError> {
        if !is_valid_id(base_id) {
            return Ok(false);
        }
        Ok(self.knowledge.knowledge_base(base_id).await?.is_some())
    }

    pub async fn recommend_paths(
        &self,
        learner_id: &str,
        options: &PathOptions,
    ) -> Result<PathRecommendations, RecommendError> {
        let config = self.get_config().await;
        let profile = self.analyze_with(learner_id, &config).await.into_profile();

        if let Some(base_id) = options.knowledge_base_id.as_deref() {
            if !self.knowledge_base_exists(base_id).await? {
                tracing::warn!(learner_id, knowledge_base_id = base_id, "Invalid knowledge base reference");
                return Ok(PathRecommendations {
                    recommended_paths: Vec::new(),
                    user_analysis: profile,
                });
            }
        }

        let recommended_paths = PathRecommender::new(self.knowledge.clone(), config.paths.clone())
            .recommend(learner_id, &profile, options)
            .await?;
        Ok(PathRecommendations {
            recommended_paths,
            user_analysis: profile,
        })
    }

    pub async fn recommend_knowledge_points(
        &self,
        learner_id: &str,
        knowledge_base_id: &str,
        options: &PointOptions,
    ) -> Result<Vec<KnowledgePointRecommendation>, RecommendError> {
        let config = self.get_config().await;
        if !self.knowledge_base_exists(knowledge_base_id).await? {
            tracing::warn!(learner_id, knowledge_base_id, "Invalid knowledge base reference");
            return Ok(Vec::new());
        }

        let profile = self.analyze_with(learner_id, &config).await.into_profile();
        let points = KnowledgePointRecommender::new(self.knowledge.clone(), config.knowledge_points.clone())
            .recommend(learner_id, &profile, knowledge_base_id, options)
            .await?;
        Ok(points)
    }

    /// Four probe runs with different strategy toggles, counted per strategy tag.
    pub async fn recommendation_stats(&self, learner_id: &str) -> RecommendationStats {
        let probe = |focus_weakness: bool, review_mode: bool| SmartRequest {
            focus_weakness,
            review_mode,
            ..SmartRequest::new(STATS_PROBE_COUNT)
        };
        let (weakness_only, neither, review_only, neither_again) = (
            probe(true, false),
            probe(false, false),
            probe(false, true),
            probe(false, false),
        );

        let (w, p, r, e) = futures::join!(
            self.smart_recommendations(learner_id, &weakness_only),
            self.smart_recommendations(learner_id, &neither),
            self.smart_recommendations(learner_id, &review_only),
            self.smart_recommendations(learner_id, &neither_again),
        );

        let tagged = |set: &SmartRecommendations, strategy: StrategyType| {
            set.recommendations
                .iter()
                .filter(|r| r.strategy_type == strategy)
                .count()
        };

        RecommendationStats {
            stats: StrategyCounts {
                weakness: tagged(&w, StrategyType::Weakness),
                progressive: tagged(&p, StrategyType::Progressive),
                review: tagged(&r, StrategyType::Review),
                exploration: tagged(&e, StrategyType::Exploration),
                total: w.recommendations.len()
                    + p.recommendations.len()
                    + r.recommendations.len()
                    + e.recommendations.len(),
            },
            labels: StrategyType::PRIMARY
                .iter()
                .map(|s| (*s, s.label()))
                .collect(),
        }
    }
}
