//! Dataset transfer workflows: download, upload and confirmed removal.

pub mod confirm;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::HfDatasetsError;
use crate::hf::{RemoteDatasetClient, RepoId, RepoTarget, Visibility};
use crate::store::LocalDatasetStore;

pub use confirm::{Confirm, LinePrompt};

/// One completed download.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferResult {
    pub output_path: PathBuf,
    pub config: Option<String>,
}

/// What [`TransferWorkflow::remove`] ended up doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    Deleted,
    Cancelled,
}

/// Orchestrates transfers between the Hub and local directories.
pub struct TransferWorkflow<'a, C, S> {
    client: &'a C,
    store: &'a S,
}

impl<'a, C: RemoteDatasetClient, S: LocalDatasetStore> TransferWorkflow<'a, C, S> {
    pub fn new(client: &'a C, store: &'a S) -> Self {
        Self { client, store }
    }

    /// Download every configuration of `repo_id` into
    /// `output_dir/<name>/<config>`, one at a time, stopping at the first
    /// failure.
    pub fn download_all(
        &self,
        repo_id: &RepoId,
        output_dir: &Path,
    ) -> Result<Vec<TransferResult>, HfDatasetsError> {
        info!(%repo_id, "downloading dataset");

        let configs = self.client.list_configs(repo_id).map_err(|source| {
            HfDatasetsError::ConfigEnumeration {
                repo_id: repo_id.to_string(),
                source,
            }
        })?;
        info!(count = configs.len(), "found configurations");

        fs::create_dir_all(output_dir)?;

        let mut results = Vec::with_capacity(configs.len());
        for config in configs {
            info!(%config, "downloading configuration");
            let output_path = output_dir.join(repo_id.short_name()).join(&config);
            self.client
                .fetch_config(repo_id, &config)
                .and_then(|handle| self.store.save(handle, &output_path))
                .map_err(|source| HfDatasetsError::Transfer {
                    repo_id: repo_id.to_string(),
                    config: Some(config.clone()),
                    source,
                })?;

            info!(%config, path = %output_path.display(), "configuration downloaded");
            results.push(TransferResult {
                output_path,
                config: Some(config),
            });
        }

        Ok(results)
    }

    /// Download the repository as a whole into `output_dir/<name>`.
    pub fn download_whole(
        &self,
        repo_id: &RepoId,
        output_dir: &Path,
    ) -> Result<TransferResult, HfDatasetsError> {
        info!(%repo_id, "downloading dataset");

        let transfer_error = |source| HfDatasetsError::Transfer {
            repo_id: repo_id.to_string(),
            config: None,
            source,
        };

        let handle = self.client.fetch_all(repo_id).map_err(transfer_error)?;
        fs::create_dir_all(output_dir)?;

        let output_path = output_dir.join(repo_id.short_name());
        self.store
            .save(handle, &output_path)
            .map_err(transfer_error)?;

        info!(path = %output_path.display(), "dataset successfully downloaded");
        Ok(TransferResult {
            output_path,
            config: None,
        })
    }

    /// Load the dataset at `dataset_path` and push it to `target`.
    pub fn upload(
        &self,
        dataset_path: &Path,
        target: &RepoTarget,
        visibility: Visibility,
    ) -> Result<RepoId, HfDatasetsError> {
        info!(path = %dataset_path.display(), "loading dataset");

        let upload_error = |source| HfDatasetsError::Upload {
            repo_id: target.to_string(),
            source,
        };

        let handle = self.store.load(dataset_path).map_err(upload_error)?;
        let repo_id = self
            .client
            .push(handle, target, visibility)
            .map_err(upload_error)?;

        info!(%repo_id, %visibility, "dataset successfully uploaded");
        Ok(repo_id)
    }

    /// Delete `repo_id`, asking `confirm` first unless `force` is set.
    pub fn remove(
        &self,
        repo_id: &RepoId,
        force: bool,
        confirm: &mut dyn Confirm,
    ) -> Result<RemoveOutcome, HfDatasetsError> {
        info!(%repo_id, "removing dataset");

        if !force {
            let prompt = format!(
                "Are you sure you want to delete dataset {repo_id}? This cannot be undone. [y/N]: "
            );
            if !confirm.confirm(&prompt)? {
                info!("deletion cancelled");
                return Ok(RemoveOutcome::Cancelled);
            }
        }

        self.client
            .delete_repo(repo_id)
            .map_err(|source| HfDatasetsError::Deletion {
                repo_id: repo_id.to_string(),
                source,
            })?;

        info!(%repo_id, "dataset successfully removed");
        Ok(RemoveOutcome::Deleted)
    }
}
