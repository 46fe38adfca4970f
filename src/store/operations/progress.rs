use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ProgressTarget {
    Point(String),
    Path(String),
}

impl ProgressTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Point(_) => "point",
            Self::Path(_) => "path",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Point(id) | Self::Path(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeProgress {
    pub learner_id: String,
    pub knowledge_base_id: String,
    pub target: ProgressTarget,
    /// 0-100
    pub progress: f64,
    pub status: ProgressStatus,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl KnowledgeProgress {
    pub fn is_completed(&self) -> bool {
        self.status == ProgressStatus::Completed
    }
}

impl Store {
    pub fn upsert_progress(&self, progress: &KnowledgeProgress) -> Result<(), StoreError> {
        if !(0.0..=100.0).contains(&progress.progress) {
            return Err(StoreError::Validation(format!(
                "progress {} out of range",
                progress.progress
            )));
        }
        let key = keys::progress_key(
            &progress.learner_id,
            progress.target.kind(),
            progress.target.id(),
        );
        self.knowledge_progress
            .insert(key.as_bytes(), Self::serialize(progress)?)?;
        Ok(())
    }

    pub fn get_progress_for(
        &self,
        learner_id: &str,
        target: &ProgressTarget,
    ) -> Result<Option<KnowledgeProgress>, StoreError> {
        let key = keys::progress_key(learner_id, target.kind(), target.id());
        match self.knowledge_progress.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn list_progress_by_learner(
        &self,
        learner_id: &str,
    ) -> Result<Vec<KnowledgeProgress>, StoreError> {
        let prefix = keys::progress_prefix(learner_id);
        let mut records = Vec::new();
        for item in self.knowledge_progress.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            records.push(Self::deserialize::<KnowledgeProgress>(&value)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn record(learner: &str, target: ProgressTarget, status: ProgressStatus) -> KnowledgeProgress {
        KnowledgeProgress {
            learner_id: learner.to_string(),
            knowledge_base_id: "kb1".to_string(),
            target,
            progress: 40.0,
            status,
            updated_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn progress_is_scoped_per_learner() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("p-db").to_str().unwrap()).unwrap();

        store
            .upsert_progress(&record(
                "l1",
                ProgressTarget::Point("p1".to_string()),
                ProgressStatus::InProgress,
            ))
            .unwrap();
        store
            .upsert_progress(&record(
                "l1",
                ProgressTarget::Path("path1".to_string()),
                ProgressStatus::Completed,
            ))
            .unwrap();
        store
            .upsert_progress(&record(
                "l10",
                ProgressTarget::Point("p1".to_string()),
                ProgressStatus::Completed,
            ))
            .unwrap();

        assert_eq!(store.list_progress_by_learner("l1").unwrap().len(), 2);
        let got = store
            .get_progress_for("l1", &ProgressTarget::Path("path1".to_string()))
            .unwrap()
            .unwrap();
        assert!(got.is_completed());
    }

    #[test]
    fn target_serializes_with_kind_tag() {
        let v = serde_json::to_value(ProgressTarget::Point("p1".to_string())).unwrap();
        assert_eq!(v, serde_json::json!({"kind": "point", "id": "p1"}));
    }
}
