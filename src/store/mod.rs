pub mod keys;
pub mod migrate;
pub mod operations;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use thiserror::Error;

#[derive(Debug)]
pub struct Store {
    db: Db,
    pub questions: sled::Tree,
    pub exam_sessions: sled::Tree,
    pub learner_stats: sled::Tree,
    pub knowledge_bases: sled::Tree,
    pub knowledge_points: sled::Tree,
    pub learning_paths: sled::Tree,
    pub knowledge_progress: sled::Tree,
    pub config_versions: sled::Tree,
    // Secondary index trees
    pub knowledge_points_by_base: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("migration error at version {version}: {message}")]
    Migration { version: u32, message: String },
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let questions = db.open_tree(trees::QUESTIONS)?;
        let exam_sessions = db.open_tree(trees::EXAM_SESSIONS)?;
        let learner_stats = db.open_tree(trees::LEARNER_STATS)?;
        let knowledge_bases = db.open_tree(trees::KNOWLEDGE_BASES)?;
        let knowledge_points = db.open_tree(trees::KNOWLEDGE_POINTS)?;
        let learning_paths = db.open_tree(trees::LEARNING_PATHS)?;
        let knowledge_progress = db.open_tree(trees::KNOWLEDGE_PROGRESS)?;
        let config_versions = db.open_tree(trees::CONFIG_VERSIONS)?;
        let knowledge_points_by_base = db.open_tree(trees::KNOWLEDGE_POINTS_BY_BASE)?;

        Ok(Self {
            db,
            questions,
            exam_sessions,
            learner_stats,
            knowledge_bases,
            knowledge_points,
            learning_paths,
            knowledge_progress,
            config_versions,
            knowledge_points_by_base,
        })
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        migrate::run(self)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub fn raw_db(&self) -> &Db {
        &self.db
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
