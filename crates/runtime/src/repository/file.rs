//! File-backed checkpoint repository.

use std::fs;
use std::path::{Path, PathBuf};

use super::{BattleCheckpoint, CheckpointId, CheckpointRepository, RepositoryError, Result};

/// Stores each checkpoint as `checkpoint_{round}_{turn}.bin` under one
/// directory. Writes go to a temp file first and are renamed into place, so a
/// crash never leaves a half-written checkpoint behind.
pub struct FileCheckpointRepository {
    base_dir: PathBuf,
}

impl FileCheckpointRepository {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn checkpoint_path(&self, id: CheckpointId) -> PathBuf {
        self.base_dir
            .join(format!("checkpoint_{}_{}.bin", id.round, id.turn))
    }

    fn parse_name(filename: &str) -> Option<CheckpointId> {
        let stem = filename
            .strip_prefix("checkpoint_")?
            .strip_suffix(".bin")?;
        let (round, turn) = stem.split_once('_')?;
        Some(CheckpointId {
            round: round.parse().ok()?,
            turn: turn.parse().ok()?,
        })
    }

    /// Writes a human-readable copy of `checkpoint` next to the binary ones.
    pub fn export_json(&self, checkpoint: &BattleCheckpoint, name: &str) -> Result<PathBuf> {
        let path = self.base_dir.join(format!("{}.json", name));
        let temp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(checkpoint)
            .map_err(|e| RepositoryError::Json(e.to_string()))?;
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &path)?;
        tracing::info!(target: "runtime::repository", path = %path.display(), "exported battle");
        Ok(path)
    }
}

impl CheckpointRepository for FileCheckpointRepository {
    fn save(&self, checkpoint: &BattleCheckpoint) -> Result<CheckpointId> {
        let id = checkpoint.id();
        let path = self.checkpoint_path(id);
        let temp_path = path.with_extension("bin.tmp");

        fs::write(&temp_path, checkpoint.encode()?)?;
        fs::rename(&temp_path, &path)?;

        tracing::debug!(target: "runtime::repository", checkpoint = %id, "saved checkpoint");
        Ok(id)
    }

    fn load(&self, id: CheckpointId) -> Result<Option<BattleCheckpoint>> {
        let path = self.checkpoint_path(id);
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path)?;
        let name = path.display().to_string();
        let checkpoint = BattleCheckpoint::decode(&name, &bytes)?;
        if checkpoint.id() != id {
            return Err(RepositoryError::CorruptedData {
                name,
                reason: format!("holds checkpoint {}", checkpoint.id()),
            });
        }
        Ok(Some(checkpoint))
    }

    fn delete(&self, id: CheckpointId) -> Result<()> {
        let path = self.checkpoint_path(id);
        if path.exists() {
            fs::remove_file(&path)?;
            tracing::debug!(target: "runtime::repository", checkpoint = %id, "deleted checkpoint");
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<CheckpointId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if let Some(filename) = path.file_name().and_then(|s| s.to_str())
                && let Some(id) = Self::parse_name(filename)
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_round_trip() {
        let id = CheckpointId { round: 12, turn: 3 };
        assert_eq!(
            FileCheckpointRepository::parse_name("checkpoint_12_3.bin"),
            Some(id)
        );
        assert_eq!(FileCheckpointRepository::parse_name("checkpoint_12_3.bin.tmp"), None);
        assert_eq!(FileCheckpointRepository::parse_name("battle.json"), None);
    }
}
