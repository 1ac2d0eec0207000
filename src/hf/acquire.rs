use hf_hub::api::sync::{Api, ApiBuilder};
use hf_hub::{Repo, RepoType};
use tracing::{debug, info};

use super::{DatasetFile, DatasetHandle, HubError, HubSettings, RepoId};

/// Revision holding the Hub's per-configuration parquet export.
pub const PARQUET_REVISION: &str = "refs/convert/parquet";

/// Download the files of `repo_id` into the hf-hub cache.
///
/// With a `config`, the parquet export revision is used and only files under
/// `<config>/` are fetched, with that prefix stripped from the handle paths.
pub fn acquire(
    settings: &HubSettings,
    repo_id: &RepoId,
    config: Option<&str>,
) -> Result<DatasetHandle, HubError> {
    let api = build_api(settings)?;

    let repo = match config {
        Some(_) => api.repo(Repo::with_revision(
            repo_id.to_string(),
            RepoType::Dataset,
            PARQUET_REVISION.to_string(),
        )),
        None => api.dataset(repo_id.to_string()),
    };

    let repo_info = repo
        .info()
        .map_err(|source| HubError::Api(format!("failed reading repo info: {source}")))?;

    let sibling_paths: Vec<String> = repo_info
        .siblings
        .into_iter()
        .map(|sibling| sibling.rfilename)
        .collect();

    let selected = select_files(&sibling_paths, config);
    if selected.is_empty() {
        return Err(HubError::Api(match config {
            Some(config) => format!("configuration '{config}' has no files"),
            None => "repository has no data files".to_string(),
        }));
    }

    let mut files = Vec::with_capacity(selected.len());
    for (remote_path, relative_path) in selected {
        let local = repo.get(&remote_path).map_err(|source| {
            HubError::Api(format!("failed downloading '{remote_path}': {source}"))
        })?;
        debug!(file = %remote_path, local = %local.display(), "fetched");
        files.push(DatasetFile {
            relative_path,
            source: local,
        });
    }

    info!(%repo_id, config = ?config, files = files.len(), "fetched dataset files");
    Ok(DatasetHandle::new(files))
}

fn build_api(settings: &HubSettings) -> Result<Api, HubError> {
    let mut builder = ApiBuilder::new()
        .with_progress(false)
        .with_endpoint(settings.endpoint.trim_end_matches('/').to_string());

    if settings.token.is_some() {
        builder = builder.with_token(settings.token.clone());
    }

    builder
        .build()
        .map_err(|source| HubError::Api(format!("failed to initialise Hub client: {source}")))
}

/// Pick the remote files to fetch, paired with their path inside the dataset.
fn select_files(paths: &[String], config: Option<&str>) -> Vec<(String, String)> {
    let prefix = config.map(|config| format!("{config}/"));

    paths
        .iter()
        .filter(|path| !is_repo_metadata(path))
        .filter_map(|path| match prefix.as_deref() {
            Some(prefix) => path
                .strip_prefix(prefix)
                .filter(|rest| !rest.is_empty())
                .map(|rest| (path.clone(), rest.to_string())),
            None => Some((path.clone(), path.clone())),
        })
        .collect()
}

fn is_repo_metadata(path: &str) -> bool {
    path == ".gitattributes" || path.ends_with("/.gitattributes")
}
