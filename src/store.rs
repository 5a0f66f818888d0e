use crate::state::Snapshot;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("не удалось сериализовать состояние: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("не удалось записать файл состояния {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("не удалось заменить файл состояния {path}: {source}")]
    Rename {
        path: String,
        source: std::io::Error,
    },
}

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Отсутствующий, пустой или испорченный файл означает "предыдущего
    // состояния нет"; это приводит к одному лишнему отчёту, не к ошибке.
    pub fn load(&self) -> Option<Snapshot> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "state file unreadable, treating as absent");
                return None;
            }
        };
        if text.trim().is_empty() {
            return None;
        }
        match serde_json::from_str(&text) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "state file corrupt, treating as absent");
                None
            }
        }
    }

    // Запись через временный файл и rename: при падении процесса load()
    // вернёт либо старое, либо новое состояние, но не обрезанное.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec(snapshot)?;
        let tmp_path = self.tmp_path();

        let mut file = fs::File::create(&tmp_path).map_err(|source| StoreError::Write {
            path: tmp_path.display().to_string(),
            source,
        })?;
        file.write_all(&encoded).map_err(|source| StoreError::Write {
            path: tmp_path.display().to_string(),
            source,
        })?;
        file.sync_all().map_err(|source| StoreError::Write {
            path: tmp_path.display().to_string(),
            source,
        })?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(|source| StoreError::Rename {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Snapshot;
    use std::collections::BTreeMap;

    fn snapshot(cpu_percent: f64) -> Snapshot {
        let mut memory = BTreeMap::new();
        memory.insert("total".to_string(), 1024.0);
        memory.insert("percent".to_string(), 42.0);
        let mut disk = BTreeMap::new();
        disk.insert("total".to_string(), 2048.0);
        disk.insert("percent".to_string(), 17.5);
        Snapshot {
            machine_id: "store-host".to_string(),
            os_name: "Linux".to_string(),
            os_version: "6.1".to_string(),
            cpu_percent,
            memory,
            disk,
            captured_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> StateStore {
        StateStore::new(dir.path().join("state.json"))
    }

    #[test]
    fn load_missing_file_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        assert!(store.load().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        let snap = snapshot(33.3);
        store.save(&snap).expect("сохранение должно проходить");
        assert_eq!(store.load(), Some(snap));
    }

    #[test]
    fn second_save_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        store.save(&snapshot(10.0)).expect("первое сохранение");
        store.save(&snapshot(20.0)).expect("второе сохранение");
        assert_eq!(store.load(), Some(snapshot(20.0)));
    }

    #[test]
    fn corrupt_file_loads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        fs::write(store.path(), "{\"machine_id\": \"trunc").expect("write");
        assert!(store.load().is_none());
    }

    #[test]
    fn empty_file_loads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        fs::write(store.path(), "").expect("write");
        assert!(store.load().is_none());
    }

    #[test]
    fn leftover_tmp_garbage_does_not_shadow_state() {
        // Падение между записью tmp и rename оставляет мусорный tmp-файл;
        // он не должен влиять ни на load, ни на следующее save.
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        let old = snapshot(10.0);
        store.save(&old).expect("сохранение");
        fs::write(dir.path().join("state.json.tmp"), "half-writ").expect("write");

        assert_eq!(store.load(), Some(old));

        let new = snapshot(20.0);
        store.save(&new).expect("повторное сохранение");
        assert_eq!(store.load(), Some(new));
    }
}
