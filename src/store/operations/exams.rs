use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSession {
    pub id: String,
    pub learner_id: String,
    pub status: ExamStatus,
    pub answers: Vec<ExamAnswer>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamStatus {
    NotStarted,
    InProgress,
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamAnswer {
    pub question_id: String,
    pub is_correct: bool,
}

impl ExamSession {
    /// 已完成的会话按完成时间排序，其余按开始时间
    fn sort_timestamp_ms(&self) -> i64 {
        self.completed_at
            .unwrap_or(self.started_at)
            .timestamp_millis()
    }
}

impl Store {
    /// Exam sessions are written once by the outer system when they end.
    pub fn record_exam_session(&self, session: &ExamSession) -> Result<(), StoreError> {
        if session.status == ExamStatus::Completed && session.completed_at.is_none() {
            return Err(StoreError::Validation(format!(
                "completed exam session {} has no completion time",
                session.id
            )));
        }
        let key = keys::exam_session_key(
            &session.learner_id,
            session.sort_timestamp_ms(),
            &session.id,
        );
        self.exam_sessions
            .insert(key.as_bytes(), Self::serialize(session)?)?;
        Ok(())
    }

    /// 最近 `limit` 场已完成考试，最新的在前
    pub fn get_recent_completed_sessions(
        &self,
        learner_id: &str,
        limit: usize,
    ) -> Result<Vec<ExamSession>, StoreError> {
        let prefix = keys::exam_session_prefix(learner_id);
        let mut sessions = Vec::new();
        if limit == 0 {
            return Ok(sessions);
        }
        for item in self.exam_sessions.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            let session: ExamSession = Self::deserialize(&value)?;
            if session.status != ExamStatus::Completed {
                continue;
            }
            sessions.push(session);
            if sessions.len() >= limit {
                break;
            }
        }
        Ok(sessions)
    }
}
