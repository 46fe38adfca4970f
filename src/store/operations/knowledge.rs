use serde::{Deserialize, Serialize};

use crate::recommend::types::{CatalogEntry, Difficulty, ItemCategory, PathLevel};
use crate::store::keys;
use crate::store::operations::ContentStatus;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBase {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    pub status: ContentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgePoint {
    pub id: String,
    pub knowledge_base_id: String,
    pub title: String,
    #[serde(default)]
    pub category: Option<ItemCategory>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub estimated_time_mins: Option<u32>,
    pub status: ContentStatus,
}

impl KnowledgePoint {
    pub fn category_key(&self) -> String {
        crate::recommend::types::category_key(self.category.as_ref())
    }
}

impl CatalogEntry for KnowledgePoint {
    fn entry_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Institution,
    Course,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PathStats {
    pub learners: u64,
    /// 0-100
    pub completion_rate: f64,
    pub avg_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    pub id: String,
    pub knowledge_base_id: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub difficulty: PathLevel,
    #[serde(default)]
    pub knowledge_point_ids: Vec<String>,
    /// Knowledge-point ids the learner should finish first.
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub estimated_duration_mins: Option<u32>,
    pub status: ContentStatus,
    pub visibility: Visibility,
    #[serde(default)]
    pub stats: PathStats,
}

impl CatalogEntry for LearningPath {
    fn entry_id(&self) -> &str {
        &self.id
    }
}

impl Store {
    pub fn upsert_knowledge_base(&self, base: &KnowledgeBase) -> Result<(), StoreError> {
        let key = keys::knowledge_base_key(&base.id);
        self.knowledge_bases
            .insert(key.as_bytes(), Self::serialize(base)?)?;
        Ok(())
    }

    pub fn get_knowledge_base(&self, base_id: &str) -> Result<Option<KnowledgeBase>, StoreError> {
        let key = keys::knowledge_base_key(base_id);
        match self.knowledge_bases.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn upsert_knowledge_point(&self, point: &KnowledgePoint) -> Result<(), StoreError> {
        if self.get_knowledge_base(&point.knowledge_base_id)?.is_none() {
            return Err(StoreError::NotFound {
                entity: "knowledge_base".to_string(),
                key: point.knowledge_base_id.clone(),
            });
        }

        // Drop the stale index entry when a point moves between bases
        if let Some(previous) = self.get_knowledge_point(&point.id)? {
            if previous.knowledge_base_id != point.knowledge_base_id {
                let stale = keys::knowledge_point_base_index_key(
                    &previous.knowledge_base_id,
                    &previous.id,
                );
                self.knowledge_points_by_base.remove(stale.as_bytes())?;
            }
        }

        let key = keys::knowledge_point_key(&point.id);
        self.knowledge_points
            .insert(key.as_bytes(), Self::serialize(point)?)?;
        let idx_key = keys::knowledge_point_base_index_key(&point.knowledge_base_id, &point.id);
        self.knowledge_points_by_base
            .insert(idx_key.as_bytes(), point.id.as_bytes())?;
        Ok(())
    }

    pub fn get_knowledge_point(&self, point_id: &str) -> Result<Option<KnowledgePoint>, StoreError> {
        let key = keys::knowledge_point_key(point_id);
        match self.knowledge_points.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// 按 id 顺序返回，缺失的 id 跳过
    pub fn get_knowledge_points_by_ids(
        &self,
        point_ids: &[String],
    ) -> Result<Vec<KnowledgePoint>, StoreError> {
        let mut points = Vec::with_capacity(point_ids.len());
        for point_id in point_ids {
            if let Some(point) = self.get_knowledge_point(point_id)? {
                points.push(point);
            }
        }
        Ok(points)
    }

    pub fn list_knowledge_points_in_base(
        &self,
        base_id: &str,
    ) -> Result<Vec<KnowledgePoint>, StoreError> {
        let prefix = keys::knowledge_point_base_prefix(base_id);
        let mut points = Vec::new();
        for item in self.knowledge_points_by_base.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            let point_id = String::from_utf8(value.to_vec()).unwrap_or_default();
            if let Some(point) = self.get_knowledge_point(&point_id)? {
                points.push(point);
            }
        }
        Ok(points)
    }

    pub fn upsert_learning_path(&self, path: &LearningPath) -> Result<(), StoreError> {
        if self.get_knowledge_base(&path.knowledge_base_id)?.is_none() {
            return Err(StoreError::NotFound {
                entity: "knowledge_base".to_string(),
                key: path.knowledge_base_id.clone(),
            });
        }
        let key = keys::learning_path_key(&path.id);
        self.learning_paths
            .insert(key.as_bytes(), Self::serialize(path)?)?;
        Ok(())
    }

    pub fn get_learning_path(&self, path_id: &str) -> Result<Option<LearningPath>, StoreError> {
        let key = keys::learning_path_key(path_id);
        match self.learning_paths.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn list_learning_paths(&self) -> Result<Vec<LearningPath>, StoreError> {
        let mut paths = Vec::new();
        for item in self.learning_paths.iter() {
            let (_, value) = item?;
            paths.push(Self::deserialize::<LearningPath>(&value)?);
        }
        Ok(paths)
    }
}
