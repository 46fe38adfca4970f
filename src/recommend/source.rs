//! Read-only collaborator contracts the engine depends on, plus their
//! sled-backed implementations on [`Store`].

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::recommend::types::{Difficulty, ItemCategory, PathLevel};
use crate::store::operations::knowledge::{KnowledgeBase, KnowledgePoint, LearningPath, Visibility};
use crate::store::operations::learners::LearnerStats;
use crate::store::operations::progress::KnowledgeProgress;
use crate::store::operations::questions::Question;
use crate::store::operations::ContentStatus;
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// One catalog restriction. A query matches an item only when every filter does.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemFilter {
    /// Category key must be one of these.
    InCategories(Vec<String>),
    /// Category key must be none of these.
    OutsideCategories(Vec<String>),
    DifficultyIn(Vec<Difficulty>),
    /// At least one tag in common.
    TagsIntersect(Vec<String>),
    ExcludeIds(HashSet<String>),
}

impl ItemFilter {
    pub fn matches(&self, question: &Question) -> bool {
        match self {
            Self::InCategories(keys) => keys.contains(&question.category_key()),
            Self::OutsideCategories(keys) => !keys.contains(&question.category_key()),
            Self::DifficultyIn(levels) => levels.contains(&question.difficulty),
            Self::TagsIntersect(tags) => question.tags.iter().any(|t| tags.contains(t)),
            Self::ExcludeIds(ids) => !ids.contains(&question.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemQuery {
    pub filters: Vec<ItemFilter>,
    pub limit: usize,
}

impl ItemQuery {
    pub fn new(limit: usize) -> Self {
        Self {
            filters: Vec::new(),
            limit,
        }
    }

    pub fn with(mut self, filter: ItemFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn matches(&self, question: &Question) -> bool {
        self.filters.iter().all(|f| f.matches(question))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnsweredItem {
    pub item_id: String,
    pub is_correct: bool,
    /// `None` when the item is gone from the catalog or carries no category.
    pub category: Option<ItemCategory>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionHistory {
    pub session_id: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub answers: Vec<AnsweredItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathFilter {
    pub knowledge_base_id: Option<String>,
    pub level: Option<PathLevel>,
    pub status: ContentStatus,
    pub visibilities: Vec<Visibility>,
}

impl PathFilter {
    /// 已发布且公开或机构可见
    pub fn discoverable() -> Self {
        Self {
            knowledge_base_id: None,
            level: None,
            status: ContentStatus::Published,
            visibilities: vec![Visibility::Public, Visibility::Institution],
        }
    }

    pub fn matches(&self, path: &LearningPath) -> bool {
        path.status == self.status
            && self.visibilities.contains(&path.visibility)
            && self
                .knowledge_base_id
                .as_ref()
                .map_or(true, |kb| &path.knowledge_base_id == kb)
            && self.level.map_or(true, |level| path.difficulty == level)
    }
}

/// A path together with the content it is scored against.
#[derive(Debug, Clone, PartialEq)]
pub struct PathCandidate {
    pub path: LearningPath,
    pub knowledge_base: Option<KnowledgeBase>,
    pub points: Vec<KnowledgePoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointFilter {
    pub status: Option<ContentStatus>,
}

impl PointFilter {
    pub fn published() -> Self {
        Self {
            status: Some(ContentStatus::Published),
        }
    }

    pub fn matches(&self, point: &KnowledgePoint) -> bool {
        self.status.map_or(true, |s| point.status == s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressScope {
    KnowledgeBase(String),
    Everything,
}

impl ProgressScope {
    pub fn matches(&self, record: &KnowledgeProgress) -> bool {
        match self {
            Self::KnowledgeBase(kb) => &record.knowledge_base_id == kb,
            Self::Everything => true,
        }
    }
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Up to `query.limit` published items matching every filter.
    async fn find_items(&self, query: &ItemQuery) -> Result<Vec<Question>, SourceError>;
}

#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Most recent completed sessions first.
    async fn recent_sessions(
        &self,
        learner_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionHistory>, SourceError>;

    async fn learner_stats(&self, learner_id: &str) -> Result<Option<LearnerStats>, SourceError>;
}

#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    async fn knowledge_base(&self, base_id: &str) -> Result<Option<KnowledgeBase>, SourceError>;

    async fn find_learning_paths(
        &self,
        filter: &PathFilter,
    ) -> Result<Vec<PathCandidate>, SourceError>;

    async fn find_knowledge_points(
        &self,
        base_id: &str,
        filter: &PointFilter,
    ) -> Result<Vec<KnowledgePoint>, SourceError>;

    async fn get_progress(
        &self,
        learner_id: &str,
        scope: &ProgressScope,
    ) -> Result<Vec<KnowledgeProgress>, SourceError>;
}

#[async_trait]
impl CatalogSource for Store {
    async fn find_items(&self, query: &ItemQuery) -> Result<Vec<Question>, SourceError> {
        Ok(self.find_published_questions(query.limit, |q| query.matches(q))?)
    }
}

#[async_trait]
impl HistorySource for Store {
    async fn recent_sessions(
        &self,
        learner_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionHistory>, SourceError> {
        let sessions = self.get_recent_completed_sessions(learner_id, limit)?;

        let ids: Vec<String> = sessions
            .iter()
            .flat_map(|s| s.answers.iter().map(|a| a.question_id.clone()))
            .collect();
        let questions = self.get_questions_by_ids(&ids)?;

        let history = sessions
            .into_iter()
            .map(|session| SessionHistory {
                session_id: session.id,
                completed_at: session.completed_at,
                answers: session
                    .answers
                    .into_iter()
                    .map(|answer| {
                        let question = questions.get(&answer.question_id);
                        AnsweredItem {
                            category: question.and_then(|q| q.category.clone()),
                            tags: question.map(|q| q.tags.clone()).unwrap_or_default(),
                            item_id: answer.question_id,
                            is_correct: answer.is_correct,
                        }
                    })
                    .collect(),
            })
            .collect();
        Ok(history)
    }

    async fn learner_stats(&self, learner_id: &str) -> Result<Option<LearnerStats>, SourceError> {
        Ok(self.get_learner_stats(learner_id)?)
    }
}

#[async_trait]
impl KnowledgeSource for Store {
    async fn knowledge_base(&self, base_id: &str) -> Result<Option<KnowledgeBase>, SourceError> {
        Ok(self.get_knowledge_base(base_id)?)
    }

    async fn find_learning_paths(
        &self,
        filter: &PathFilter,
    ) -> Result<Vec<PathCandidate>, SourceError> {
        let mut candidates = Vec::new();
        for path in self.list_learning_paths()? {
            if !filter.matches(&path) {
                continue;
            }
            let knowledge_base = self.get_knowledge_base(&path.knowledge_base_id)?;
            let points = self.get_knowledge_points_by_ids(&path.knowledge_point_ids)?;
            candidates.push(PathCandidate {
                path,
                knowledge_base,
                points,
            });
        }
        Ok(candidates)
    }

    async fn find_knowledge_points(
        &self,
        base_id: &str,
        filter: &PointFilter,
    ) -> Result<Vec<KnowledgePoint>, SourceError> {
        Ok(self
            .list_knowledge_points_in_base(base_id)?
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect())
    }

    async fn get_progress(
        &self,
        learner_id: &str,
        scope: &ProgressScope,
    ) -> Result<Vec<KnowledgeProgress>, SourceError> {
        Ok(self
            .list_progress_by_learner(learner_id)?
            .into_iter()
            .filter(|r| scope.matches(r))
            .collect())
    }
}
