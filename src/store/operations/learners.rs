use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

/// Base learning statistics maintained by the exam-completion flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerStats {
    pub learner_id: String,
    pub total_answered: u64,
    pub correct_answered: u64,
    pub accuracy: f64,
    #[serde(default)]
    pub points: u64,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn get_learner_stats(&self, learner_id: &str) -> Result<Option<LearnerStats>, StoreError> {
        let key = keys::learner_stats_key(learner_id);
        match self.learner_stats.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn upsert_learner_stats(&self, stats: &LearnerStats) -> Result<(), StoreError> {
        if !(0.0..=1.0).contains(&stats.accuracy) {
            return Err(StoreError::Validation(format!(
                "accuracy {} out of range",
                stats.accuracy
            )));
        }
        let key = keys::learner_stats_key(&stats.learner_id);
        self.learner_stats
            .insert(key.as_bytes(), Self::serialize(stats)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn stats_roundtrip_and_validation() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("ls-db").to_str().unwrap()).unwrap();
        assert!(store.get_learner_stats("l1").unwrap().is_none());

        let mut stats = LearnerStats {
            learner_id: "l1".to_string(),
            total_answered: 10,
            correct_answered: 9,
            accuracy: 0.9,
            points: 120,
            updated_at: Utc::now(),
        };
        store.upsert_learner_stats(&stats).unwrap();
        assert_eq!(store.get_learner_stats("l1").unwrap().unwrap().points, 120);

        stats.accuracy = 1.5;
        assert!(store.upsert_learner_stats(&stats).is_err());
    }
}
