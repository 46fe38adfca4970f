use chrono::{Duration, Utc};

use learning_recommender::recommend::types::{Difficulty, ItemCategory, PathLevel};
use learning_recommender::store::operations::exams::{ExamAnswer, ExamSession, ExamStatus};
use learning_recommender::store::operations::knowledge::{
    KnowledgeBase, KnowledgePoint, LearningPath, PathStats, Visibility,
};
use learning_recommender::store::operations::learners::LearnerStats;
use learning_recommender::store::operations::progress::{
    KnowledgeProgress, ProgressStatus, ProgressTarget,
};
use learning_recommender::store::operations::questions::Question;
use learning_recommender::store::operations::ContentStatus;
use learning_recommender::store::Store;

pub fn question(id: &str, subject: &str, difficulty: Difficulty, tags: &[&str]) -> Question {
    Question {
        id: id.to_string(),
        title: format!("question {id}"),
        category: Some(ItemCategory::new(subject, "rules")),
        difficulty,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        status: ContentStatus::Published,
        created_at: Utc::now(),
    }
}

pub fn seed_questions(store: &Store, questions: &[Question]) {
    for q in questions {
        store.upsert_question(q).expect("seed question");
    }
}

/// `answers`: (question id, correct). `age_mins` 越小越新
pub fn seed_session(store: &Store, learner_id: &str, session_id: &str, age_mins: i64, answers: &[(&str, bool)]) {
    let completed_at = Utc::now() - Duration::minutes(age_mins);
    let session = ExamSession {
        id: session_id.to_string(),
        learner_id: learner_id.to_string(),
        status: ExamStatus::Completed,
        answers: answers
            .iter()
            .map(|(id, ok)| ExamAnswer {
                question_id: id.to_string(),
                is_correct: *ok,
            })
            .collect(),
        started_at: completed_at - Duration::minutes(10),
        completed_at: Some(completed_at),
    };
    store.record_exam_session(&session).expect("seed session");
}

pub fn seed_stats(store: &Store, learner_id: &str, total: u64, correct: u64) {
    let stats = LearnerStats {
        learner_id: learner_id.to_string(),
        total_answered: total,
        correct_answered: correct,
        accuracy: if total == 0 { 0.0 } else { correct as f64 / total as f64 },
        points: 0,
        updated_at: Utc::now(),
    };
    store.upsert_learner_stats(&stats).expect("seed stats");
}

/// history 中的题目与候选题分开命名，避免被错题排除
pub fn seed_history(store: &Store, learner_id: &str, subject: &str, total: usize, correct: usize) {
    let ids: Vec<String> = (0..total).map(|i| format!("h-{subject}-{i:03}")).collect();
    let questions: Vec<Question> = ids
        .iter()
        .map(|id| question(id, subject, Difficulty::Medium, &["pool"]))
        .map(|mut q| {
            q.status = ContentStatus::Archived;
            q
        })
        .collect();
    seed_questions(store, &questions);

    let answers: Vec<(&str, bool)> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i < correct))
        .collect();
    seed_session(store, learner_id, &format!("s-{learner_id}-{subject}"), 5, &answers);
}

pub fn seed_knowledge_base(store: &Store, id: &str, category: &str) -> KnowledgeBase {
    let base = KnowledgeBase {
        id: id.to_string(),
        title: format!("base {id}"),
        category: category.to_string(),
        status: ContentStatus::Published,
    };
    store.upsert_knowledge_base(&base).expect("seed knowledge base");
    base
}

pub fn point(id: &str, base_id: &str, subject: &str, difficulty: Difficulty, mins: Option<u32>) -> KnowledgePoint {
    KnowledgePoint {
        id: id.to_string(),
        knowledge_base_id: base_id.to_string(),
        title: format!("point {id}"),
        category: Some(ItemCategory::new(subject, "rules")),
        tags: Vec::new(),
        difficulty,
        estimated_time_mins: mins,
        status: ContentStatus::Published,
    }
}

pub fn seed_point(store: &Store, point: &KnowledgePoint) {
    store.upsert_knowledge_point(point).expect("seed point");
}

pub fn path(id: &str, base_id: &str, level: PathLevel, point_ids: &[&str]) -> LearningPath {
    LearningPath {
        id: id.to_string(),
        knowledge_base_id: base_id.to_string(),
        title: format!("path {id}"),
        tags: vec!["swimming".to_string()],
        difficulty: level,
        knowledge_point_ids: point_ids.iter().map(|p| p.to_string()).collect(),
        prerequisites: Vec::new(),
        estimated_duration_mins: Some(90),
        status: ContentStatus::Published,
        visibility: Visibility::Public,
        stats: PathStats::default(),
    }
}

pub fn seed_path(store: &Store, path: &LearningPath) {
    store.upsert_learning_path(path).expect("seed path");
}

pub fn seed_progress(
    store: &Store,
    learner_id: &str,
    base_id: &str,
    target: ProgressTarget,
    progress: f64,
) {
    let status = if progress >= 100.0 {
        ProgressStatus::Completed
    } else if progress > 0.0 {
        ProgressStatus::InProgress
    } else {
        ProgressStatus::NotStarted
    };
    let record = KnowledgeProgress {
        learner_id: learner_id.to_string(),
        knowledge_base_id: base_id.to_string(),
        target,
        progress,
        status,
        updated_at: Utc::now(),
        completed_at: (status == ProgressStatus::Completed).then(Utc::now),
    };
    store.upsert_progress(&record).expect("seed progress");
}
