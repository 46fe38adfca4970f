use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::recommend::config::ProfileConfig;
use crate::recommend::source::{HistorySource, SessionHistory};
use crate::recommend::types::{category_key, Difficulty, LearningProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradeReason {
    NoHistory,
    StoreUnavailable,
}

/// Result of profile analysis. A degraded outcome still carries a usable
/// zero-valued profile so callers can decide which tier to take.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileOutcome {
    Analyzed(LearningProfile),
    Degraded {
        profile: LearningProfile,
        reason: DegradeReason,
    },
}

impl ProfileOutcome {
    pub fn profile(&self) -> &LearningProfile {
        match self {
            Self::Analyzed(profile) | Self::Degraded { profile, .. } => profile,
        }
    }

    pub fn into_profile(self) -> LearningProfile {
        match self {
            Self::Analyzed(profile) | Self::Degraded { profile, .. } => profile,
        }
    }

    pub fn degrade_reason(&self) -> Option<DegradeReason> {
        match self {
            Self::Analyzed(_) => None,
            Self::Degraded { reason, .. } => Some(*reason),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degrade_reason().is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryStat {
    pub total: u64,
    pub correct: u64,
}

impl CategoryStat {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// 按首次出现顺序记录的分类统计
#[derive(Debug, Default)]
struct CategoryTally {
    order: Vec<(String, CategoryStat)>,
    index: HashMap<String, usize>,
}

impl CategoryTally {
    fn record(&mut self, key: String, is_correct: bool) {
        let slot = match self.index.get(&key) {
            Some(&i) => i,
            None => {
                self.order.push((key.clone(), CategoryStat::default()));
                self.index.insert(key, self.order.len() - 1);
                self.order.len() - 1
            }
        };
        let stat = &mut self.order[slot].1;
        stat.total += 1;
        if is_correct {
            stat.correct += 1;
        }
    }
}

pub struct ProfileAnalyzer {
    history: Arc<dyn HistorySource>,
}

impl ProfileAnalyzer {
    pub fn new(history: Arc<dyn HistorySource>) -> Self {
        Self { history }
    }

    /// Never fails: an empty or unreadable history yields a degraded zero profile.
    pub async fn analyze(&self, learner_id: &str, config: &ProfileConfig) -> ProfileOutcome {
        let sessions = match self
            .history
            .recent_sessions(learner_id, config.history_window)
            .await
        {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::warn!(learner_id, error = %e, "History unavailable, using zero profile");
                return ProfileOutcome::Degraded {
                    profile: LearningProfile::default(),
                    reason: DegradeReason::StoreUnavailable,
                };
            }
        };

        let profile = build_profile(&sessions, config);
        if profile.total_questions == 0 {
            tracing::debug!(learner_id, "No answered items in history");
            return ProfileOutcome::Degraded {
                profile,
                reason: DegradeReason::NoHistory,
            };
        }

        tracing::debug!(
            learner_id,
            total = profile.total_questions,
            accuracy = profile.accuracy,
            weak = profile.weak_categories.len(),
            strong = profile.strong_categories.len(),
            "Profile analyzed"
        );
        ProfileOutcome::Analyzed(profile)
    }
}

/// Sessions are expected most-recent-first; only the first
/// `config.history_window` are read.
pub fn build_profile(sessions: &[SessionHistory], config: &ProfileConfig) -> LearningProfile {
    let mut tally = CategoryTally::default();
    let mut total = 0u64;
    let mut correct = 0u64;
    let mut topics: Vec<String> = Vec::new();
    let mut seen_topics: HashSet<String> = HashSet::new();
    let mut incorrect: Vec<String> = Vec::new();
    let mut seen_incorrect: HashSet<String> = HashSet::new();

    for answer in sessions
        .iter()
        .take(config.history_window)
        .flat_map(|s| s.answers.iter())
    {
        total += 1;
        tally.record(category_key(answer.category.as_ref()), answer.is_correct);

        if answer.is_correct {
            correct += 1;
        } else if seen_incorrect.insert(answer.item_id.clone()) {
            incorrect.push(answer.item_id.clone());
        }

        for tag in &answer.tags {
            if seen_topics.insert(tag.clone()) {
                topics.push(tag.clone());
            }
        }
    }

    let mut weak = Vec::new();
    let mut strong = Vec::new();
    for (key, stat) in tally.order {
        let acc = stat.accuracy();
        if acc < config.weak_below {
            weak.push(key);
        } else if acc > config.strong_above {
            strong.push(key);
        }
    }

    let accuracy = if total > 0 {
        correct as f64 / total as f64
    } else {
        0.0
    };

    let mastered: Vec<String> = strong.iter().take(config.mastered_cap).cloned().collect();
    weak.truncate(config.weak_cap);
    strong.truncate(config.strong_cap);
    topics.truncate(config.recent_topics_cap);

    LearningProfile {
        total_questions: total,
        accuracy,
        weak_categories: weak,
        strong_categories: strong,
        mastered_topics: mastered,
        preferred_difficulty: if total > 0 {
            Difficulty::from_accuracy(accuracy, config.hard_above, config.easy_below)
        } else {
            Difficulty::Medium
        },
        recent_topics: topics,
        incorrect_question_ids: incorrect,
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::recommend::source::{AnsweredItem, SourceError};
    use crate::recommend::types::ItemCategory;
    use crate::store::operations::learners::LearnerStats;

    fn answer(id: &str, subject: &str, ok: bool, tags: &[&str]) -> AnsweredItem {
        AnsweredItem {
            item_id: id.to_string(),
            is_correct: ok,
            category: Some(ItemCategory::new(subject, "rules")),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn session(answers: Vec<AnsweredItem>) -> SessionHistory {
        SessionHistory {
            session_id: "s".to_string(),
            completed_at: None,
            answers,
        }
    }

    #[test]
    fn classifies_categories_by_accuracy() {
        let sessions = vec![session(vec![
            answer("q1", "swimming", false, &["breath"]),
            answer("q2", "swimming", false, &["breath", "kick"]),
            answer("q3", "running", true, &["sprint"]),
            answer("q4", "running", true, &[]),
            answer("q5", "cycling", true, &[]),
            answer("q6", "cycling", false, &[]),
            answer("q7", "cycling", true, &[]),
        ])];
        let p = build_profile(&sessions, &ProfileConfig::default());

        assert_eq!(p.total_questions, 7);
        assert!((p.accuracy - 4.0 / 7.0).abs() < 1e-12);
        assert_eq!(p.weak_categories, vec!["swimming-rules"]);
        assert_eq!(p.strong_categories, vec!["running-rules"]);
        assert_eq!(p.mastered_topics, vec!["running-rules"]);
        assert_eq!(p.preferred_difficulty, Difficulty::Medium);
        assert_eq!(p.recent_topics, vec!["breath", "kick", "sprint"]);
        assert_eq!(p.incorrect_question_ids, vec!["q1", "q2", "q6"]);
    }

    #[test]
    fn missing_metadata_uses_default_category() {
        let mut a = answer("gone", "x", true, &[]);
        a.category = None;
        let p = build_profile(&[session(vec![a])], &ProfileConfig::default());
        assert_eq!(p.strong_categories, vec!["未分类-基础"]);
        assert_eq!(p.accuracy, 1.0);
        assert_eq!(p.preferred_difficulty, Difficulty::Hard);
    }

    #[test]
    fn caps_lists_in_tally_order() {
        let answers: Vec<AnsweredItem> = (0..12)
            .map(|i| answer(&format!("q{i}"), &format!("s{i}"), true, &[format!("t{i}").as_str()]))
            .collect();
        let p = build_profile(&[session(answers)], &ProfileConfig::default());
        assert_eq!(p.strong_categories.len(), 5);
        assert_eq!(p.mastered_topics.len(), 8);
        assert_eq!(p.strong_categories[0], "s0-rules");
        assert_eq!(p.recent_topics.len(), 10);
        assert_eq!(p.recent_topics[9], "t9");
    }

    #[test]
    fn repeated_incorrect_items_are_deduplicated() {
        let sessions = vec![
            session(vec![answer("q1", "a", false, &[])]),
            session(vec![answer("q1", "a", false, &[])]),
        ];
        let p = build_profile(&sessions, &ProfileConfig::default());
        assert_eq!(p.incorrect_question_ids, vec!["q1"]);
        assert_eq!(p.preferred_difficulty, Difficulty::Easy);
    }

    struct FailingHistory;

    #[async_trait]
    impl HistorySource for FailingHistory {
        async fn recent_sessions(
            &self,
            _learner_id: &str,
            _limit: usize,
        ) -> Result<Vec<SessionHistory>, SourceError> {
            Err(SourceError::Unavailable("down".to_string()))
        }

        async fn learner_stats(
            &self,
            _learner_id: &str,
        ) -> Result<Option<LearnerStats>, SourceError> {
            Ok(None)
        }
    }

    struct EmptyHistory;

    #[async_trait]
    impl HistorySource for EmptyHistory {
        async fn recent_sessions(
            &self,
            _learner_id: &str,
            _limit: usize,
        ) -> Result<Vec<SessionHistory>, SourceError> {
            Ok(vec![session(Vec::new())])
        }

        async fn learner_stats(
            &self,
            _learner_id: &str,
        ) -> Result<Option<LearnerStats>, SourceError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn unreachable_store_degrades_to_zero_profile() {
        let analyzer = ProfileAnalyzer::new(Arc::new(FailingHistory));
        let outcome = analyzer.analyze("l1", &ProfileConfig::default()).await;
        assert_eq!(outcome.degrade_reason(), Some(DegradeReason::StoreUnavailable));
        assert_eq!(outcome.profile(), &LearningProfile::default());
    }

    #[tokio::test]
    async fn empty_history_is_reported_as_no_history() {
        let analyzer = ProfileAnalyzer::new(Arc::new(EmptyHistory));
        let outcome = analyzer.analyze("l1", &ProfileConfig::default()).await;
        assert_eq!(outcome.degrade_reason(), Some(DegradeReason::NoHistory));
        assert_eq!(outcome.into_profile(), LearningProfile::default());
    }
}
