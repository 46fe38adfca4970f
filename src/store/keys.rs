pub fn question_key(question_id: &str) -> String {
    question_id.to_string()
}

/// 考试会话按完成时间倒序排列，便于取最近 N 场
pub fn exam_session_key(learner_id: &str, timestamp_ms: i64, session_id: &str) -> String {
    let ts = timestamp_ms.max(0) as u64;
    let reverse_ts = u64::MAX - ts;
    format!("{}:{:020}:{}", learner_id, reverse_ts, session_id)
}

pub fn exam_session_prefix(learner_id: &str) -> String {
    format!("{}:", learner_id)
}

pub fn learner_stats_key(learner_id: &str) -> String {
    learner_id.to_string()
}

pub fn knowledge_base_key(knowledge_base_id: &str) -> String {
    knowledge_base_id.to_string()
}

pub fn knowledge_point_key(point_id: &str) -> String {
    point_id.to_string()
}

pub fn knowledge_point_base_index_key(knowledge_base_id: &str, point_id: &str) -> String {
    format!("{}:{}", knowledge_base_id, point_id)
}

pub fn knowledge_point_base_prefix(knowledge_base_id: &str) -> String {
    format!("{}:", knowledge_base_id)
}

pub fn learning_path_key(path_id: &str) -> String {
    path_id.to_string()
}

pub fn progress_key(learner_id: &str, target_kind: &str, target_id: &str) -> String {
    format!("{}:{}:{}", learner_id, target_kind, target_id)
}

pub fn progress_prefix(learner_id: &str) -> String {
    format!("{}:", learner_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exam_session_key_orders_by_time_desc() {
        let k_new = exam_session_key("l1", 2000, "s2");
        let k_old = exam_session_key("l1", 1000, "s1");
        assert!(k_new < k_old);
    }

    #[test]
    fn base_prefix_does_not_match_longer_ids() {
        let key = knowledge_point_base_index_key("kb10", "p1");
        assert!(!key.starts_with(&knowledge_point_base_prefix("kb1")));
    }
}
