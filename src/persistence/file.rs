//! JSON-file persistence.
//!
//! One file per key under a state directory. Writes go to a temp file first and are then
//! renamed over the target, so a crash mid-write leaves the previous contents intact.

use super::LocalPersistence;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
struct TokenFile {
    token: String,
}

pub struct FilePersistence {
    dir: PathBuf,
}

impl FilePersistence {
    /// Creates the state directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating state directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(Some(content))
    }

    fn write(&self, key: &str, content: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, content)
            .with_context(|| format!("writing {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &path)
            .with_context(|| format!("renaming into {}", path.display()))?;
        Ok(())
    }
}

impl LocalPersistence for FilePersistence {
    fn load_string_set(&self, key: &str) -> anyhow::Result<HashSet<String>> {
        match self.read(key)? {
            Some(content) => {
                let values: Vec<String> = serde_json::from_str(&content)
                    .with_context(|| format!("decoding string set '{}'", key))?;
                Ok(values.into_iter().collect())
            }
            None => Ok(HashSet::new()),
        }
    }

    fn save_string_set(&self, key: &str, values: &HashSet<String>) -> anyhow::Result<()> {
        // Sorted so the file is stable across saves
        let sorted: BTreeSet<&String> = values.iter().collect();
        self.write(key, &serde_json::to_string_pretty(&sorted)?)
    }

    fn load_token(&self, key: &str) -> anyhow::Result<Option<String>> {
        match self.read(key)? {
            Some(content) => {
                let file: TokenFile = serde_json::from_str(&content)
                    .with_context(|| format!("decoding token '{}'", key))?;
                Ok(Some(file.token))
            }
            None => Ok(None),
        }
    }

    fn save_token(&self, key: &str, token: &str) -> anyhow::Result<()> {
        let file = TokenFile {
            token: token.to_string(),
        };
        self.write(key, &serde_json::to_string(&file)?)
    }
}
