pub mod exams;
pub mod knowledge;
pub mod learners;
pub mod progress;
pub mod questions;

use serde::{Deserialize, Serialize};

/// 内容发布状态，推荐只读取 `Published`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    #[default]
    Draft,
    Published,
    Archived,
}
