pub const QUESTIONS: &str = "questions";
pub const EXAM_SESSIONS: &str = "exam_sessions";
pub const LEARNER_STATS: &str = "learner_stats";
pub const KNOWLEDGE_BASES: &str = "knowledge_bases";
pub const KNOWLEDGE_POINTS: &str = "knowledge_points";
pub const LEARNING_PATHS: &str = "learning_paths";
pub const KNOWLEDGE_PROGRESS: &str = "knowledge_progress";
pub const CONFIG_VERSIONS: &str = "config_versions";

// Secondary index trees
pub const KNOWLEDGE_POINTS_BY_BASE: &str = "knowledge_points_by_base";
