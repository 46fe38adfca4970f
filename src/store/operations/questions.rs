use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::recommend::types::{CatalogEntry, Difficulty, ItemCategory};
use crate::store::keys;
use crate::store::operations::ContentStatus;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: Option<ItemCategory>,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: ContentStatus,
    pub created_at: DateTime<Utc>,
}

impl Question {
    pub fn category_key(&self) -> String {
        crate::recommend::types::category_key(self.category.as_ref())
    }
}

impl CatalogEntry for Question {
    fn entry_id(&self) -> &str {
        &self.id
    }
}

impl Store {
    pub fn upsert_question(&self, question: &Question) -> Result<(), StoreError> {
        if question.id.is_empty() {
            return Err(StoreError::Validation("question id is empty".to_string()));
        }
        let key = keys::question_key(&question.id);
        self.questions
            .insert(key.as_bytes(), Self::serialize(question)?)?;
        Ok(())
    }

    pub fn get_question(&self, question_id: &str) -> Result<Option<Question>, StoreError> {
        let key = keys::question_key(question_id);
        match self.questions.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// 批量获取题目（仅返回存在的题目）
    pub fn get_questions_by_ids(
        &self,
        question_ids: &[String],
    ) -> Result<HashMap<String, Question>, StoreError> {
        let mut questions = HashMap::with_capacity(question_ids.len());
        for question_id in question_ids {
            if questions.contains_key(question_id) {
                continue;
            }
            if let Some(question) = self.get_question(question_id)? {
                questions.insert(question_id.clone(), question);
            }
        }
        Ok(questions)
    }

    /// Scans published questions in key order, keeping the first `limit` that
    /// satisfy `predicate`.
    pub fn find_published_questions<F>(
        &self,
        limit: usize,
        predicate: F,
    ) -> Result<Vec<Question>, StoreError>
    where
        F: Fn(&Question) -> bool,
    {
        let mut found = Vec::new();
        if limit == 0 {
            return Ok(found);
        }
        for item in self.questions.iter() {
            let (_, value) = item?;
            let question: Question = Self::deserialize(&value)?;
            if question.status != ContentStatus::Published || !predicate(&question) {
                continue;
            }
            found.push(question);
            if found.len() >= limit {
                break;
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn sample(id: &str, difficulty: Difficulty, status: ContentStatus) -> Question {
        Question {
            id: id.to_string(),
            title: format!("question {id}"),
            category: Some(ItemCategory::new("swimming", "rules")),
            difficulty,
            tags: vec!["freestyle".to_string()],
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn find_skips_unpublished_and_respects_limit() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("q-db").to_str().unwrap()).unwrap();

        store
            .upsert_question(&sample("q1", Difficulty::Easy, ContentStatus::Draft))
            .unwrap();
        for id in ["q2", "q3", "q4"] {
            store
                .upsert_question(&sample(id, Difficulty::Easy, ContentStatus::Published))
                .unwrap();
        }

        let found = store.find_published_questions(2, |_| true).unwrap();
        let ids: Vec<&str> = found.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q2", "q3"]);

        let none = store.find_published_questions(0, |_| true).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn batch_get_ignores_missing() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("q-db2").to_str().unwrap()).unwrap();
        store
            .upsert_question(&sample("q1", Difficulty::Hard, ContentStatus::Published))
            .unwrap();

        let got = store
            .get_questions_by_ids(&["q1".to_string(), "missing".to_string()])
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got["q1"].difficulty, Difficulty::Hard);
    }

    #[test]
    fn empty_id_is_rejected() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("q-db3").to_str().unwrap()).unwrap();
        let err = store
            .upsert_question(&sample("", Difficulty::Easy, ContentStatus::Published))
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }
}
