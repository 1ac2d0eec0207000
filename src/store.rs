//! Local dataset persistence.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::hf::{DatasetFile, DatasetHandle, HubError};

/// Loads and saves datasets from and to local directories.
pub trait LocalDatasetStore {
    fn load(&self, path: &Path) -> Result<DatasetHandle, HubError>;

    fn save(&self, handle: DatasetHandle, path: &Path) -> Result<(), HubError>;
}

/// Stores a dataset as a plain directory tree of its files.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiskStore;

impl LocalDatasetStore for DiskStore {
    fn load(&self, path: &Path) -> Result<DatasetHandle, HubError> {
        if !path.is_dir() {
            return Err(HubError::NotADataset {
                path: path.to_path_buf(),
            });
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|source| HubError::Io {
                path: source
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| path.to_path_buf()),
                source: source.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(path)
                .map_err(|_| HubError::UnsafePath {
                    path: entry.path().display().to_string(),
                })?;
            files.push(DatasetFile {
                relative_path: to_slash_path(relative),
                source: entry.path().to_path_buf(),
            });
        }

        if files.is_empty() {
            return Err(HubError::NotADataset {
                path: path.to_path_buf(),
            });
        }

        debug!(path = %path.display(), files = files.len(), "loaded dataset");
        Ok(DatasetHandle::new(files))
    }

    fn save(&self, handle: DatasetHandle, path: &Path) -> Result<(), HubError> {
        fs::create_dir_all(path).map_err(|source| HubError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        for file in handle.into_files() {
            let destination = path.join(checked_relative_path(&file.relative_path)?);
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).map_err(|source| HubError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            fs::copy(&file.source, &destination).map_err(|source| HubError::Io {
                path: destination.clone(),
                source,
            })?;
        }

        debug!(path = %path.display(), "saved dataset");
        Ok(())
    }
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Reject paths that would escape the destination directory.
fn checked_relative_path(relative: &str) -> Result<PathBuf, HubError> {
    let candidate = Path::new(relative);
    let safe = !relative.is_empty()
        && candidate
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    if safe {
        Ok(candidate.to_path_buf())
    } else {
        Err(HubError::UnsafePath {
            path: relative.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_lists_files_relative_to_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("train")).expect("mkdir");
        fs::write(dir.path().join("dataset_dict.json"), b"{}").expect("write");
        fs::write(dir.path().join("train/data-00000-of-00001.arrow"), b"x").expect("write");

        let handle = DiskStore.load(dir.path()).expect("load");
        let relative: Vec<&str> = handle
            .files()
            .iter()
            .map(|file| file.relative_path.as_str())
            .collect();
        assert_eq!(
            relative,
            vec!["dataset_dict.json", "train/data-00000-of-00001.arrow"]
        );
    }

    #[test]
    fn load_rejects_missing_and_empty_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            DiskStore.load(dir.path()),
            Err(HubError::NotADataset { .. })
        ));
        assert!(matches!(
            DiskStore.load(&dir.path().join("nope")),
            Err(HubError::NotADataset { .. })
        ));
    }

    #[test]
    fn save_recreates_tree_under_destination() {
        let src = tempfile::tempdir().expect("tempdir");
        let source = src.path().join("blob");
        fs::write(&source, b"payload").expect("write");

        let out = tempfile::tempdir().expect("tempdir");
        let destination = out.path().join("nested/name");
        let handle = DatasetHandle::new(vec![DatasetFile {
            relative_path: "train/0000.parquet".to_string(),
            source,
        }]);

        DiskStore.save(handle, &destination).expect("save");
        assert_eq!(
            fs::read(destination.join("train/0000.parquet")).expect("read"),
            b"payload"
        );
    }

    #[test]
    fn save_refuses_escaping_paths() {
        let out = tempfile::tempdir().expect("tempdir");
        for bad in ["../evil", "/etc/passwd", ""] {
            let handle = DatasetHandle::new(vec![DatasetFile {
                relative_path: bad.to_string(),
                source: PathBuf::from("unused"),
            }]);
            assert!(
                matches!(
                    DiskStore.save(handle, out.path()),
                    Err(HubError::UnsafePath { .. })
                ),
                "{bad}"
            );
        }
    }
}
