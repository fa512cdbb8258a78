//! Flat-file crop knowledgebase.
//!
//! The store is a single JSON array read in full and rewritten in full on
//! every mutation. Mutations from this process are serialized behind a
//! mutex; concurrent external writers get last-writer-wins, which the
//! deployment accepts for a hand-curated file of this size.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::Mutex;

use shared_types::CropRule;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("crops file io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("crops file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

pub struct CropStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CropStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Read every rule. A missing file is seeded as an empty collection.
    pub async fn load(&self) -> Result<Vec<CropRule>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.save(&[]).await?;
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, crops: &[CropRule]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(crops)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    /// Plain append. Duplicate names are not rejected here; only the
    /// AI-add path replaces by name.
    pub async fn add(&self, rule: CropRule) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut crops = self.load().await?;
        crops.push(rule);
        self.save(&crops).await
    }

    /// Replace-on-insert keyed by case-insensitive name.
    pub async fn upsert(&self, rule: CropRule) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut crops = self.load().await?;
        crops.retain(|c| !c.name.eq_ignore_ascii_case(&rule.name));
        crops.push(rule);
        self.save(&crops).await
    }

    /// Flip the favorite flag on the named rule. Returns the updated rule,
    /// or `None` when no rule matches.
    pub async fn toggle_favorite(&self, name: &str) -> Result<Option<CropRule>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut crops = self.load().await?;
        let target = name.trim();
        let Some(rule) = crops
            .iter_mut()
            .find(|c| c.name.trim().eq_ignore_ascii_case(target))
        else {
            return Ok(None);
        };
        rule.favorite = !rule.favorite;
        let updated = rule.clone();
        self.save(&crops).await?;
        Ok(Some(updated))
    }

    /// Remove every rule with the given case-insensitive name. Returns
    /// whether anything was removed.
    pub async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut crops = self.load().await?;
        let before = crops.len();
        crops.retain(|c| !c.name.eq_ignore_ascii_case(name));
        let removed = crops.len() != before;
        if removed {
            self.save(&crops).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, favorite: bool) -> CropRule {
        serde_json::from_value(serde_json::json!({ "name": name, "favorite": favorite })).unwrap()
    }

    fn temp_store() -> (tempfile::TempDir, CropStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CropStore::new(dir.path().join("crops.json"));
        (dir, store)
    }

    #[tokio::test]
    async fn load_seeds_missing_file() {
        let (_dir, store) = temp_store();
        assert!(store.load().await.unwrap().is_empty());
        // The seeded file must parse on the next read too.
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_replaces_by_case_insensitive_name() {
        let (_dir, store) = temp_store();
        store.add(rule("Rice", false)).await.unwrap();
        store.upsert(rule("RICE", true)).await.unwrap();

        let crops = store.load().await.unwrap();
        assert_eq!(crops.len(), 1);
        assert_eq!(crops[0].name, "RICE");
        assert!(crops[0].favorite);
    }

    #[tokio::test]
    async fn toggle_favorite_matches_trimmed_name() {
        let (_dir, store) = temp_store();
        store.add(rule("Wheat", false)).await.unwrap();

        let updated = store.toggle_favorite("  wheat ").await.unwrap().unwrap();
        assert!(updated.favorite);
        assert!(store.toggle_favorite("barley").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_matched() {
        let (_dir, store) = temp_store();
        store.add(rule("Maize", false)).await.unwrap();
        assert!(store.delete("maize").await.unwrap());
        assert!(!store.delete("maize").await.unwrap());
        assert!(store.load().await.unwrap().is_empty());
    }
}
