//! JSON checkpoints of every stage plus a manifest of their fingerprints.

use super::Stage;
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Fingerprint of a stage: SHA-256 over the previous stage's fingerprint,
/// the stage name and the JSON form of the stage inputs. A change anywhere
/// upstream therefore changes every later fingerprint.
pub fn fingerprint<T: Serialize>(previous: &str, stage: Stage, inputs: &T) -> Result<String> {
    let payload = serde_json::to_vec(inputs)
        .with_context(|| format!("Failed to serialize inputs of stage {}", stage))?;
    let mut hasher = Sha256::new();
    hasher.update(previous.as_bytes());
    hasher.update(b"\n");
    hasher.update(stage.name().as_bytes());
    hasher.update(b"\n");
    hasher.update(&payload);
    Ok(format!("sha256:{:x}", hasher.finalize()))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Stage name to fingerprint.
    pub stages: BTreeMap<String, String>,
    /// Stage name to the fingerprint of the stage it was computed from.
    #[serde(default)]
    pub parents: BTreeMap<String, String>,
}

impl Manifest {
    /// Checks that `stage` and every stage before it were recorded by the
    /// same run: each stage's parent is its predecessor's fingerprint.
    pub fn verify_chain(&self, stage: Stage) -> Result<()> {
        let mut previous = String::new();
        for current in Stage::ALL.iter().take(stage.number()) {
            let Some(recorded) = self.stages.get(current.name()) else {
                bail!("No checkpoint of stage {} is recorded", current);
            };
            let parent = self
                .parents
                .get(current.name())
                .map(String::as_str)
                .unwrap_or_default();
            if parent != previous {
                bail!(
                    "Checkpoint of stage {} was not computed from the recorded checkpoints before it",
                    current
                );
            }
            previous = recorded.clone();
        }
        Ok(())
    }
}

pub struct CheckpointStore {
    dir: PathBuf,
    manifest: Manifest,
}

impl CheckpointStore {
    /// Opens `dir`, creating it if needed and reading its manifest if any.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;
        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = if manifest_path.exists() {
            let content = std::fs::read_to_string(&manifest_path)
                .with_context(|| format!("Failed to read {:?}", manifest_path))?;
            match serde_json::from_str(&content) {
                Ok(manifest) => manifest,
                Err(err) => {
                    warn!("Ignoring unreadable manifest {:?}: {}", manifest_path, err);
                    Manifest::default()
                }
            }
        } else {
            Manifest::default()
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn path_of(&self, stage: Stage) -> PathBuf {
        self.dir.join(stage.file_name())
    }

    /// The stored artifact of `stage` if its recorded fingerprint is
    /// `expected`, `None` when missing or stale.
    pub fn load<T: DeserializeOwned>(&self, stage: Stage, expected: &str) -> Result<Option<T>> {
        if self.manifest.stages.get(stage.name()).map(String::as_str) != Some(expected) {
            debug!("No matching checkpoint for stage {}", stage);
            return Ok(None);
        }
        let path = self.path_of(stage);
        if !path.exists() {
            return Ok(None);
        }
        let content =
            std::fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
        let artifact = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse checkpoint {:?}", path))?;
        Ok(Some(artifact))
    }

    /// Writes the artifact and records its fingerprint in the manifest.
    /// Checkpoints of every later stage are removed, since they were
    /// computed from the replaced artifact.
    pub fn save<T: Serialize>(
        &mut self,
        stage: Stage,
        parent: &str,
        fingerprint: &str,
        artifact: &T,
    ) -> Result<()> {
        self.remove_after(stage)?;
        let path = self.path_of(stage);
        let content = serde_json::to_string_pretty(artifact)
            .with_context(|| format!("Failed to serialize checkpoint of stage {}", stage))?;
        std::fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;
        self.manifest
            .stages
            .insert(stage.name().to_string(), fingerprint.to_string());
        self.manifest
            .parents
            .insert(stage.name().to_string(), parent.to_string());
        self.write_manifest()
    }

    fn remove_after(&mut self, stage: Stage) -> Result<()> {
        for later in Stage::ALL.iter().skip(stage.number()) {
            let path = self.path_of(*later);
            if path.exists() {
                debug!("Removing stale checkpoint {:?}", path);
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {:?}", path))?;
            }
            self.manifest.stages.remove(later.name());
            self.manifest.parents.remove(later.name());
        }
        Ok(())
    }

    /// Reads a stage artifact of an existing output directory after
    /// checking the manifest chain up to that stage.
    pub fn read<T: DeserializeOwned>(dir: &Path, stage: Stage) -> Result<T> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&manifest_path)
            .with_context(|| format!("Failed to read {:?}", manifest_path))?;
        let manifest: Manifest = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse manifest {:?}", manifest_path))?;
        manifest
            .verify_chain(stage)
            .with_context(|| format!("Inconsistent checkpoints in {:?}", dir))?;

        let path = dir.join(stage.file_name());
        let content =
            std::fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse checkpoint {:?}", path))
    }

    fn write_manifest(&self) -> Result<()> {
        let path = self.dir.join(MANIFEST_FILE);
        let content = serde_json::to_string_pretty(&self.manifest)
            .context("Failed to serialize manifest")?;
        std::fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fingerprint_is_chained() {
        let first = fingerprint("", Stage::Normalize, &vec![1, 2, 3]).unwrap();
        let same = fingerprint("", Stage::Normalize, &vec![1, 2, 3]).unwrap();
        let other_input = fingerprint("", Stage::Normalize, &vec![1, 2]).unwrap();
        let other_stage = fingerprint("", Stage::Prune, &vec![1, 2, 3]).unwrap();
        let other_parent = fingerprint("sha256:x", Stage::Normalize, &vec![1, 2, 3]).unwrap();
        assert!(first.starts_with("sha256:"));
        assert_eq!(first, same);
        assert_ne!(first, other_input);
        assert_ne!(first, other_stage);
        assert_ne!(first, other_parent);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut store = CheckpointStore::open(dir.path()).unwrap();
        store.save(Stage::Prune, "sha256:p", "sha256:abc", &vec!["a", "b"]).unwrap();
        assert!(dir.path().join("03_prune.json").exists());
        assert!(dir.path().join(MANIFEST_FILE).exists());

        let reopened = CheckpointStore::open(dir.path()).unwrap();
        let loaded: Option<Vec<String>> = reopened.load(Stage::Prune, "sha256:abc").unwrap();
        assert_eq!(loaded, Some(vec!["a".to_string(), "b".to_string()]));
        let stale: Option<Vec<String>> = reopened.load(Stage::Prune, "sha256:def").unwrap();
        assert!(stale.is_none());
        let missing: Option<Vec<String>> = reopened.load(Stage::Fit, "sha256:abc").unwrap();
        assert!(missing.is_none());
    }

    fn make_chain(store: &mut CheckpointStore) {
        let mut previous = String::new();
        for stage in Stage::ALL {
            let current = format!("sha256:{}", stage.name());
            store.save(stage, &previous, &current, &stage.number()).unwrap();
            previous = current;
        }
    }

    #[test]
    fn test_save_removes_later_stages() {
        let dir = TempDir::new().unwrap();
        let mut store = CheckpointStore::open(dir.path()).unwrap();
        make_chain(&mut store);

        store
            .save(Stage::Prune, "sha256:vocabulary", "sha256:other", &0usize)
            .unwrap();
        for stage in [Stage::Fit, Stage::Label, Stage::Cluster] {
            assert!(!dir.path().join(stage.file_name()).exists());
            assert!(!store.manifest().stages.contains_key(stage.name()));
        }
        assert!(dir.path().join(Stage::Vocabulary.file_name()).exists());
        assert_eq!(store.manifest().stages["prune"], "sha256:other");
    }

    #[test]
    fn test_read_checks_chain() {
        let dir = TempDir::new().unwrap();
        let mut store = CheckpointStore::open(dir.path()).unwrap();
        make_chain(&mut store);
        let value: usize = CheckpointStore::read(dir.path(), Stage::Label).unwrap();
        assert_eq!(value, 5);

        // A label checkpoint whose parent is not the recorded fit.
        store
            .save(Stage::Label, "sha256:elsewhere", "sha256:label", &5usize)
            .unwrap();
        let error = CheckpointStore::read::<usize>(dir.path(), Stage::Label).unwrap_err();
        assert!(format!("{:#}", error).contains("stage label was not computed"));
        let fit: usize = CheckpointStore::read(dir.path(), Stage::Fit).unwrap();
        assert_eq!(fit, 4);
        assert!(CheckpointStore::read::<usize>(dir.path(), Stage::Cluster).is_err());
    }

    #[test]
    fn test_read_without_manifest_fails() {
        let dir = TempDir::new().unwrap();
        assert!(CheckpointStore::read::<usize>(dir.path(), Stage::Normalize).is_err());
    }
}
