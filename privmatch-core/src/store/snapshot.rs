//! Point-in-time snapshot of every entity in a store.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::similarity::SimilarityMetric;

/// On-disk snapshot, written as pretty JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub dimension: usize,
    pub metric: SimilarityMetric,
    pub entities: Vec<Entity>,
}

impl Snapshot {
    /// Loads a snapshot, or None if the file does not exist yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .map_err(|e| Error::StoreError(format!("read snapshot failed: {}", e)))?;
        let snapshot = serde_json::from_str(&content)
            .map_err(|e| Error::StoreError(format!("parse snapshot failed: {}", e)))?;
        Ok(Some(snapshot))
    }

    /// Writes the snapshot through a temporary file so a crash never leaves a
    /// half-written snapshot behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::StoreError(format!("serialize snapshot failed: {}", e)))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .map_err(|e| Error::StoreError(format!("write snapshot failed: {}", e)))?;
        fs::rename(&tmp, path)
            .map_err(|e| Error::StoreError(format!("replace snapshot failed: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_save_and_load() {
        let dir = std::env::temp_dir().join(format!("privmatch_test_snap_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("entities.json");

        assert!(Snapshot::load(&path).unwrap().is_none());

        let entity = Entity::new("person", "A", "u1").with_embedding(vec![1.0, 0.0]);
        Snapshot {
            dimension: 2,
            metric: SimilarityMetric::Cosine,
            entities: vec![entity.clone()],
        }
        .save(&path)
        .unwrap();

        let loaded = Snapshot::load(&path).unwrap().unwrap();
        assert_eq!(loaded.dimension, 2);
        assert_eq!(loaded.entities, vec![entity]);

        let _ = fs::remove_dir_all(&dir);
    }
}
