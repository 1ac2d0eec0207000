use tracing::info;

use super::acquire::acquire;
use super::api::HubHttp;
use super::viewer::list_config_names;
use super::{
    DatasetHandle, HubError, HubSettings, RemoteDatasetClient, RepoId, RepoMeta, RepoTarget,
    Visibility,
};

/// Production [`RemoteDatasetClient`] backed by hf-hub and the Hub REST API.
///
/// Creating a client never touches the network.
pub struct HubClient {
    settings: HubSettings,
    http: HubHttp,
}

impl HubClient {
    /// Build a client. Without an explicit token, the one saved by the
    /// Hugging Face CLI login is used when present.
    pub fn new(mut settings: HubSettings) -> Self {
        if settings.token.is_none() {
            settings.token = hf_hub::Cache::default().token();
        }
        let http = HubHttp::new(&settings);
        Self { settings, http }
    }
}

impl RemoteDatasetClient for HubClient {
    fn list_configs(&self, repo_id: &RepoId) -> Result<Vec<String>, HubError> {
        list_config_names(&self.http, repo_id)
    }

    fn fetch_config(&self, repo_id: &RepoId, config: &str) -> Result<DatasetHandle, HubError> {
        acquire(&self.settings, repo_id, Some(config))
    }

    fn fetch_all(&self, repo_id: &RepoId) -> Result<DatasetHandle, HubError> {
        acquire(&self.settings, repo_id, None)
    }

    fn push(
        &self,
        handle: DatasetHandle,
        target: &RepoTarget,
        visibility: Visibility,
    ) -> Result<RepoId, HubError> {
        let repo_id = match target {
            RepoTarget::Qualified(repo_id) => repo_id.clone(),
            RepoTarget::Bare(name) => {
                let user = self.http.whoami()?;
                RepoId::from_parts(&user, name)
            }
        };

        self.http.create_repo(&repo_id, visibility)?;
        self.http
            .commit(&repo_id, &handle, "Upload dataset with hfdatasets")?;
        info!(%repo_id, files = handle.len(), "committed dataset files");
        Ok(repo_id)
    }

    fn delete_repo(&self, repo_id: &RepoId) -> Result<(), HubError> {
        self.http.delete_repo(repo_id)
    }

    fn list_repos(&self, author: &str) -> Result<Vec<RepoMeta>, HubError> {
        self.http.list_datasets(author)
    }
}
