#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use hfdatasets::hf::{
    DatasetFile, DatasetHandle, HubError, RemoteDatasetClient, RepoId, RepoMeta, RepoTarget,
    Visibility,
};

/// Call log entry recorded by [`FakeHub`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HubCall {
    ListConfigs(String),
    FetchConfig(String, String),
    FetchAll(String),
    Push {
        target: String,
        visibility: Visibility,
        files: Vec<String>,
    },
    Delete(String),
    ListRepos(String),
}

/// In-memory Hub. Fetched files are materialised under `scratch`.
pub struct FakeHub {
    scratch: PathBuf,
    pub configs: Vec<String>,
    pub repos: Vec<RepoMeta>,
    pub failing_config: Option<String>,
    pub fail_listing: bool,
    pub fail_delete: bool,
    pub namespace: String,
    pub calls: RefCell<Vec<HubCall>>,
}

impl FakeHub {
    pub fn new(scratch: &Path) -> Self {
        Self {
            scratch: scratch.to_path_buf(),
            configs: Vec::new(),
            repos: Vec::new(),
            failing_config: None,
            fail_listing: false,
            fail_delete: false,
            namespace: "me".to_string(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<HubCall> {
        self.calls.borrow().clone()
    }

    pub fn delete_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, HubCall::Delete(_)))
            .count()
    }

    fn handle_with(&self, name: &str, content: &str) -> DatasetHandle {
        let source = self.scratch.join(format!("{}.bin", name.replace('/', "_")));
        fs::write(&source, content).expect("write scratch file");
        DatasetHandle::new(vec![DatasetFile {
            relative_path: "train/0000.parquet".to_string(),
            source,
        }])
    }
}

impl RemoteDatasetClient for FakeHub {
    fn list_configs(&self, repo_id: &RepoId) -> Result<Vec<String>, HubError> {
        self.calls
            .borrow_mut()
            .push(HubCall::ListConfigs(repo_id.to_string()));
        Ok(self.configs.clone())
    }

    fn fetch_config(&self, repo_id: &RepoId, config: &str) -> Result<DatasetHandle, HubError> {
        self.calls
            .borrow_mut()
            .push(HubCall::FetchConfig(repo_id.to_string(), config.to_string()));
        if self.failing_config.as_deref() == Some(config) {
            return Err(HubError::Api(format!("config {config} unavailable")));
        }
        Ok(self.handle_with(config, config))
    }

    fn fetch_all(&self, repo_id: &RepoId) -> Result<DatasetHandle, HubError> {
        self.calls
            .borrow_mut()
            .push(HubCall::FetchAll(repo_id.to_string()));
        Ok(self.handle_with("whole", "whole"))
    }

    fn push(
        &self,
        handle: DatasetHandle,
        target: &RepoTarget,
        visibility: Visibility,
    ) -> Result<RepoId, HubError> {
        self.calls.borrow_mut().push(HubCall::Push {
            target: target.to_string(),
            visibility,
            files: handle
                .files()
                .iter()
                .map(|file| file.relative_path.clone())
                .collect(),
        });
        Ok(match target {
            RepoTarget::Qualified(repo_id) => repo_id.clone(),
            RepoTarget::Bare(name) => {
                RepoId::parse(&format!("{}/{}", self.namespace, name)).expect("repo id")
            }
        })
    }

    fn delete_repo(&self, repo_id: &RepoId) -> Result<(), HubError> {
        self.calls
            .borrow_mut()
            .push(HubCall::Delete(repo_id.to_string()));
        if self.fail_delete {
            return Err(HubError::Status {
                url: "https://hub/api/repos/delete".to_string(),
                status: 404,
            });
        }
        Ok(())
    }

    fn list_repos(&self, author: &str) -> Result<Vec<RepoMeta>, HubError> {
        self.calls
            .borrow_mut()
            .push(HubCall::ListRepos(author.to_string()));
        if self.fail_listing {
            return Err(HubError::Api("service unavailable".to_string()));
        }
        Ok(self.repos.clone())
    }
}

/// Store that records saves instead of copying, and loads canned datasets.
#[derive(Default)]
pub struct RecordingStore {
    pub saved: RefCell<Vec<(PathBuf, usize)>>,
    pub loadable: HashMap<PathBuf, Vec<String>>,
    pub fail_save_at: Option<PathBuf>,
}

impl hfdatasets::store::LocalDatasetStore for RecordingStore {
    fn load(&self, path: &Path) -> Result<DatasetHandle, HubError> {
        let files = self
            .loadable
            .get(path)
            .ok_or_else(|| HubError::NotADataset {
                path: path.to_path_buf(),
            })?;
        Ok(DatasetHandle::new(
            files
                .iter()
                .map(|relative| DatasetFile {
                    relative_path: relative.clone(),
                    source: path.join(relative),
                })
                .collect(),
        ))
    }

    fn save(&self, handle: DatasetHandle, path: &Path) -> Result<(), HubError> {
        if self.fail_save_at.as_deref() == Some(path) {
            return Err(HubError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.saved
            .borrow_mut()
            .push((path.to_path_buf(), handle.len()));
        Ok(())
    }
}

pub fn repo_meta(id: &str, tags: &[&str]) -> RepoMeta {
    RepoMeta {
        id: id.to_string(),
        last_modified: None,
        downloads: 0,
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
    }
}
