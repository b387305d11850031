use std::io::Write;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::error::StorageError;

/// Upper bound on numbered variants tried before giving up on a name.
const MAX_CONFLICT_SUFFIX: u32 = 1000;

/// Writes pipeline outputs below one output directory.
///
/// Files are created with `create_new` so two writers can never clobber each
/// other; when the resolved name is taken, `_2`, `_3`, ... is appended to the
/// stem and the path actually written is returned.
#[derive(Debug, Clone)]
pub struct FileStorage {
    output_directory: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Serializes `value` as pretty JSON to `path` (or a numbered variant).
    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        path: &Path,
        value: &T,
    ) -> Result<PathBuf, StorageError> {
        let content = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serialize {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.write_bytes(path, &content)
    }

    pub fn write_bytes(&self, path: &Path, content: &[u8]) -> Result<PathBuf, StorageError> {
        self.ensure_contained(path)?;

        let directory = path
            .parent()
            .ok_or_else(|| StorageError::OutsideOutputDirectory(path.to_path_buf()))?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::OutsideOutputDirectory(path.to_path_buf()))?;

        self.ensure_directory(directory)?;
        self.store_with_atomic_creation(directory, filename, content)
    }

    pub fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }

    fn ensure_contained(&self, path: &Path) -> Result<(), StorageError> {
        let escapes = path
            .components()
            .any(|c| matches!(c, Component::ParentDir));
        if escapes || !path.starts_with(&self.output_directory) {
            return Err(StorageError::OutsideOutputDirectory(path.to_path_buf()));
        }
        Ok(())
    }

    fn store_with_atomic_creation(
        &self,
        dir_path: &Path,
        filename: &str,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        let (base, ext) = match filename.rfind('.') {
            Some(dot_pos) if dot_pos > 0 => (&filename[..dot_pos], Some(&filename[dot_pos..])),
            _ => (filename, None),
        };

        for counter in 1..=MAX_CONFLICT_SUFFIX {
            let try_filename = if counter == 1 {
                filename.to_string()
            } else {
                match ext {
                    Some(ext) => format!("{}_{}{}", base, counter, ext),
                    None => format!("{}_{}", base, counter),
                }
            };

            let try_path = dir_path.join(&try_filename);

            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&try_path)
            {
                Ok(mut file) => {
                    file.write_all(content)
                        .map_err(|e| StorageError::WriteFile {
                            path: try_path.clone(),
                            source: e,
                        })?;
                    return Ok(try_path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::WriteFile {
                        path: try_path,
                        source: e,
                    });
                }
            }
        }

        Err(StorageError::FileExists(dir_path.join(filename)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_write_json_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let target = temp_dir.path().join("jane_20240101_000000/jane_data.json");
        let path = storage.write_json(&target, &json!({"name": "Jane"})).unwrap();

        assert_eq!(path, target);
        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written["name"], "Jane");
    }

    #[test]
    fn test_conflict_appends_numbered_suffix() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());
        let target = temp_dir.path().join("out/report.json");

        let first = storage.write_bytes(&target, b"1").unwrap();
        let second = storage.write_bytes(&target, b"2").unwrap();
        let third = storage.write_bytes(&target, b"3").unwrap();

        assert!(first.ends_with("report.json"));
        assert!(second.ends_with("report_2.json"));
        assert!(third.ends_with("report_3.json"));
        assert_eq!(std::fs::read(&first).unwrap(), b"1");
    }

    #[test]
    fn test_conflict_without_extension() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());
        let target = temp_dir.path().join("noext");

        storage.write_bytes(&target, b"a").unwrap();
        let second = storage.write_bytes(&target, b"b").unwrap();

        assert!(second.ends_with("noext_2"));
    }

    #[test]
    fn test_rejects_paths_outside_output_directory() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join("output"));

        let outside = temp_dir.path().join("elsewhere/file.json");
        assert!(matches!(
            storage.write_bytes(&outside, b"x"),
            Err(StorageError::OutsideOutputDirectory(_))
        ));

        let traversal = temp_dir.path().join("output/../escape.json");
        assert!(matches!(
            storage.write_bytes(&traversal, b"x"),
            Err(StorageError::OutsideOutputDirectory(_))
        ));
    }

    #[test]
    fn test_write_fails_when_directory_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();

        let result = storage.write_bytes(&blocker.join("nested.json"), b"x");
        assert!(result.is_err());
    }

    #[test]
    fn test_output_directory_accessor() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        assert_eq!(storage.output_directory(), temp_dir.path());
    }
}
