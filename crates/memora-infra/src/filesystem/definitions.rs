//! Agent definitions read from a local directory tree.
//!
//! Layout: `{root}/{agent_id}/agent.json` plus the files the manifest
//! references, all relative to the agent directory.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use memora_core::definition::storage::{DefinitionStorage, FingerprintSource};
use walkdir::WalkDir;

/// `DefinitionStorage` over `{root}/{agent_id}/`.
#[derive(Debug, Clone)]
pub struct LocalDefinitionStorage {
    root: PathBuf,
}

impl LocalDefinitionStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Agent ids with a manifest under the root, sorted.
    pub async fn list_agents(&self) -> Result<Vec<String>, std::io::Error> {
        let mut agents = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(agents),
            Err(e) => return Err(e),
        };
        while let Some(entry) = entries.next_entry().await? {
            let manifest = entry.path().join(memora_core::definition::storage::MANIFEST_FILE);
            if tokio::fs::try_exists(&manifest).await.unwrap_or(false) {
                agents.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        agents.sort();
        Ok(agents)
    }
}

/// Reject absolute paths and `..` so manifests cannot reach outside their directory.
fn is_contained(relative_path: &str) -> bool {
    Path::new(relative_path)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

impl FingerprintSource for LocalDefinitionStorage {
    fn last_modified(&self, agent_id: &str) -> Option<SystemTime> {
        let dir = self.definition_path(agent_id);
        if !dir.is_dir() {
            return None;
        }
        WalkDir::new(&dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter_map(|entry| entry.metadata().ok()?.modified().ok())
            .max()
    }
}

impl DefinitionStorage for LocalDefinitionStorage {
    fn definition_path(&self, agent_id: &str) -> PathBuf {
        self.root.join(agent_id)
    }

    async fn read(
        &self,
        agent_id: &str,
        relative_path: &str,
    ) -> Result<Option<Vec<u8>>, std::io::Error> {
        if !is_contained(relative_path) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("path escapes the definition directory: {relative_path}"),
            ));
        }
        let path = self.definition_path(agent_id).join(relative_path);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn write(root: &Path, agent: &str, file: &str, content: &str) {
        let path = root.join(agent).join(file);
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(path, content).await.unwrap();
    }

    #[tokio::test]
    async fn test_read_existing_and_missing() {
        let dir = tempdir().unwrap();
        write(dir.path(), "demo", "agent.json", "{}").await;
        let storage = LocalDefinitionStorage::new(dir.path());

        let bytes = storage.read("demo", "agent.json").await.unwrap();
        assert_eq!(bytes.as_deref(), Some(b"{}".as_slice()));
        assert!(storage.read("demo", "nope.txt").await.unwrap().is_none());
        assert!(storage.read("ghost", "agent.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_rejects_escaping_paths() {
        let dir = tempdir().unwrap();
        let storage = LocalDefinitionStorage::new(dir.path());
        let err = storage.read("demo", "../other/agent.json").await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
        assert!(storage.read("demo", "/etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn test_last_modified_covers_nested_files() {
        let dir = tempdir().unwrap();
        write(dir.path(), "demo", "agent.json", "{}").await;
        let storage = LocalDefinitionStorage::new(dir.path());

        let first = storage.last_modified("demo").unwrap();
        assert!(storage.last_modified("ghost").is_none());

        let later = SystemTime::now() + std::time::Duration::from_secs(60);
        write(dir.path(), "demo", "prompts/system.mustache", "hi").await;
        let file = std::fs::File::options()
            .write(true)
            .open(dir.path().join("demo/prompts/system.mustache"))
            .unwrap();
        file.set_modified(later).unwrap();

        let second = storage.last_modified("demo").unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_list_agents() {
        let dir = tempdir().unwrap();
        write(dir.path(), "zeta", "agent.json", "{}").await;
        write(dir.path(), "alpha", "agent.json", "{}").await;
        write(dir.path(), "notes", "readme.md", "").await;
        let storage = LocalDefinitionStorage::new(dir.path());

        assert_eq!(storage.list_agents().await.unwrap(), vec!["alpha", "zeta"]);
        let missing = LocalDefinitionStorage::new(dir.path().join("absent"));
        assert!(missing.list_agents().await.unwrap().is_empty());
    }
}
