use std::path::{Component, Path};

use crate::error::HfDatasetsError;

use super::{RepoId, RepoTarget};

/// Parse a user-supplied dataset reference (repo ID or dataset URL).
pub fn parse_repo_id(input: &str) -> Result<RepoId, HfDatasetsError> {
    if input.starts_with("http://") || input.starts_with("https://") {
        parse_repo_id_from_url(input)
    } else {
        validate_repo_id(input)
    }
}

/// Resolve the upload destination. Without an explicit repo the final
/// component of the normalized dataset path is used as a bare name.
pub fn parse_upload_target(
    repo: Option<&str>,
    dataset_path: &Path,
) -> Result<RepoTarget, HfDatasetsError> {
    match repo {
        Some(repo) if repo.contains('/') => parse_repo_id(repo).map(RepoTarget::Qualified),
        Some(repo) => validate_bare_name(repo).map(RepoTarget::Bare),
        None => {
            let derived =
                derive_repo_name(dataset_path).ok_or_else(|| HfDatasetsError::InvalidRepoId {
                    input: dataset_path.display().to_string(),
                    message: "cannot derive a repository name from this path; pass -r"
                        .to_string(),
                })?;
            validate_bare_name(&derived).map(RepoTarget::Bare)
        }
    }
}

/// Last normal component of `path` after lexical normalization, so
/// `/data/myset/`, `/data/myset/.` and `data/other/../myset` all give `myset`.
pub fn derive_repo_name(path: &Path) -> Option<String> {
    let mut stack: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => stack.push(part),
            Component::ParentDir => {
                stack.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    stack
        .last()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

fn parse_repo_id_from_url(input: &str) -> Result<RepoId, HfDatasetsError> {
    let url = url::Url::parse(input).map_err(|source| HfDatasetsError::InvalidRepoId {
        input: input.to_string(),
        message: format!("invalid URL: {source}"),
    })?;

    if url.host_str().is_none() {
        return Err(HfDatasetsError::InvalidRepoId {
            input: input.to_string(),
            message: "URL is missing a host".to_string(),
        });
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|iter| iter.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    if segments.len() < 3 || segments[0] != "datasets" {
        return Err(HfDatasetsError::InvalidRepoId {
            input: input.to_string(),
            message:
                "expected dataset URL like https://huggingface.co/datasets/<namespace>/<dataset>"
                    .to_string(),
        });
    }

    validate_repo_id(&format!("{}/{}", segments[1], segments[2]))
}

fn validate_repo_id(repo_id: &str) -> Result<RepoId, HfDatasetsError> {
    let trimmed = repo_id.trim();
    let mut parts = trimmed.split('/');
    let namespace = parts.next().unwrap_or_default();
    let dataset = parts.next().unwrap_or_default();
    let extra = parts.next();

    if namespace.is_empty() || dataset.is_empty() || extra.is_some() {
        return Err(HfDatasetsError::InvalidRepoId {
            input: repo_id.to_string(),
            message: "expected repo id in '<namespace>/<dataset>' form".to_string(),
        });
    }

    Ok(RepoId::from_parts(namespace, dataset))
}

fn validate_bare_name(name: &str) -> Result<String, HfDatasetsError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return Err(HfDatasetsError::InvalidRepoId {
            input: name.to_string(),
            message: "repository names must be non-empty and contain no whitespace".to_string(),
        });
    }
    Ok(trimmed.to_string())
}
