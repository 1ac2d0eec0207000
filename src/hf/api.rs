//! Thin blocking wrapper over the Hub REST endpoints that hf-hub does not
//! cover (account lookup, repo management, commits, listings).

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::lfs::{is_binary_path, LfsPointer};
use super::{DatasetFile, DatasetHandle, HubError, HubSettings, RepoId, RepoMeta, Visibility};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Files per preupload request.
const PREUPLOAD_LIMIT: usize = 256;

/// Leading bytes sent to the Hub so it can classify a file.
const SAMPLE_BYTES: u64 = 512;

/// Regular files above this size go through LFS when the Hub gives no answer.
const REGULAR_SIZE_LIMIT: u64 = 10 * 1024 * 1024;

/// HTTP agent bound to one Hub endpoint and credential.
pub struct HubHttp {
    agent: ureq::Agent,
    endpoint: String,
    viewer_endpoint: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct WhoAmI {
    name: String,
}

/// How the Hub wants a file delivered in a commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadMode {
    Regular,
    Lfs,
    /// Excluded by the repository's ignore rules.
    Ignored,
}

#[derive(Deserialize)]
struct PreuploadResponse {
    files: Vec<PreuploadEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreuploadEntry {
    path: String,
    upload_mode: String,
    #[serde(default)]
    should_ignore: bool,
}

impl PreuploadEntry {
    fn mode(&self) -> UploadMode {
        if self.should_ignore {
            UploadMode::Ignored
        } else if self.upload_mode == "lfs" {
            UploadMode::Lfs
        } else {
            UploadMode::Regular
        }
    }
}

/// One entry of an NDJSON commit.
#[derive(Debug, PartialEq, Eq)]
pub enum CommitOperation<'a> {
    /// Content sent inline, base64 encoded.
    Regular(&'a DatasetFile),
    /// Content uploaded through LFS beforehand; the commit carries the pointer.
    Lfs {
        file: &'a DatasetFile,
        pointer: LfsPointer,
    },
}

impl HubHttp {
    pub fn new(settings: &HubSettings) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        let agent: ureq::Agent = config.into();

        Self {
            agent,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            viewer_endpoint: settings.viewer_endpoint.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
        }
    }

    pub fn viewer_endpoint(&self) -> &str {
        &self.viewer_endpoint
    }

    pub(super) fn agent(&self) -> &ureq::Agent {
        &self.agent
    }

    pub(super) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub(super) fn bearer(&self) -> Option<String> {
        self.token.as_ref().map(|token| format!("Bearer {token}"))
    }

    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, HubError> {
        self.get_page(url).map(|(value, _)| value)
    }

    /// GET a JSON document and return it with the `rel="next"` link, if any.
    fn get_page<T: DeserializeOwned>(&self, url: &str) -> Result<(T, Option<String>), HubError> {
        debug!(%url, "GET");
        let mut request = self.agent.get(url);
        if let Some(bearer) = self.bearer() {
            request = request.header("Authorization", &bearer);
        }

        let mut response = request
            .call()
            .map_err(|source| map_request_error(url, source))?;

        let next = response
            .headers()
            .get("link")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_next_link);

        let value = response
            .body_mut()
            .read_json::<T>()
            .map_err(|source| HubError::Decode {
                url: url.to_string(),
                message: source.to_string(),
            })?;

        Ok((value, next))
    }

    /// Name of the account the token belongs to.
    pub fn whoami(&self) -> Result<String, HubError> {
        if self.token.is_none() {
            return Err(HubError::Api(
                "no Hugging Face token available; pass --token, set HF_TOKEN or log in with the Hugging Face CLI"
                    .to_string(),
            ));
        }
        let url = format!("{}/api/whoami-v2", self.endpoint);
        let who: WhoAmI = self.get_json(&url)?;
        Ok(who.name)
    }

    /// Create a dataset repository. An already existing repo is accepted.
    pub fn create_repo(&self, repo_id: &RepoId, visibility: Visibility) -> Result<(), HubError> {
        let url = format!("{}/api/repos/create", self.endpoint);
        debug!(%url, %repo_id, %visibility, "POST");

        let mut request = self.agent.post(url.as_str());
        if let Some(bearer) = self.bearer() {
            request = request.header("Authorization", &bearer);
        }

        let body = json!({
            "type": "dataset",
            "name": repo_id.short_name(),
            "organization": repo_id.namespace(),
            "private": visibility.is_private(),
        });

        match request.send_json(&body) {
            Ok(_) => Ok(()),
            Err(ureq::Error::StatusCode(409)) => {
                debug!(%repo_id, "repository already exists");
                Ok(())
            }
            Err(source) => Err(map_request_error(&url, source)),
        }
    }

    /// Ask the Hub how each file must be uploaded.
    pub fn preupload(
        &self,
        repo_id: &RepoId,
        handle: &DatasetHandle,
    ) -> Result<HashMap<String, UploadMode>, HubError> {
        let url = format!("{}/api/datasets/{}/preupload/main", self.endpoint, repo_id);
        let mut modes = HashMap::with_capacity(handle.len());

        for chunk in handle.files().chunks(PREUPLOAD_LIMIT) {
            let body = build_preupload_request(chunk)?;
            debug!(%url, files = chunk.len(), "POST");

            let mut request = self.agent.post(url.as_str());
            if let Some(bearer) = self.bearer() {
                request = request.header("Authorization", &bearer);
            }
            let mut response = request
                .send_json(&body)
                .map_err(|source| map_request_error(&url, source))?;
            let decoded: PreuploadResponse =
                response
                    .body_mut()
                    .read_json()
                    .map_err(|source| HubError::Decode {
                        url: url.clone(),
                        message: source.to_string(),
                    })?;

            for entry in decoded.files {
                let mode = entry.mode();
                modes.insert(entry.path, mode);
            }
        }
        Ok(modes)
    }

    /// Commit every file of `handle` to the `main` branch in one commit,
    /// uploading LFS content first.
    pub fn commit(
        &self,
        repo_id: &RepoId,
        handle: &DatasetHandle,
        summary: &str,
    ) -> Result<(), HubError> {
        let modes = self.preupload(repo_id, handle)?;
        let operations = plan_commit(handle, &modes)?;
        if operations.is_empty() {
            return Err(HubError::Api(
                "nothing to commit: every file is ignored by the repository".to_string(),
            ));
        }

        let lfs: Vec<(&DatasetFile, &LfsPointer)> = operations
            .iter()
            .filter_map(|operation| match operation {
                CommitOperation::Lfs { file, pointer } => Some((*file, pointer)),
                CommitOperation::Regular(_) => None,
            })
            .collect();
        if !lfs.is_empty() {
            self.upload_lfs(repo_id, &lfs)?;
        }

        let url = format!("{}/api/datasets/{}/commit/main", self.endpoint, repo_id);
        let payload = build_commit_payload(&operations, summary)?;
        debug!(%url, files = operations.len(), lfs = lfs.len(), bytes = payload.len(), "POST");

        let mut request = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/x-ndjson");
        if let Some(bearer) = self.bearer() {
            request = request.header("Authorization", &bearer);
        }

        request
            .send(payload.as_bytes())
            .map_err(|source| map_request_error(&url, source))?;
        Ok(())
    }

    pub fn delete_repo(&self, repo_id: &RepoId) -> Result<(), HubError> {
        let url = format!("{}/api/repos/delete", self.endpoint);
        debug!(%url, %repo_id, "DELETE");

        let mut request = self.agent.delete(url.as_str());
        if let Some(bearer) = self.bearer() {
            request = request.header("Authorization", &bearer);
        }

        let body = json!({
            "type": "dataset",
            "name": repo_id.short_name(),
            "organization": repo_id.namespace(),
        });

        request
            .force_send_body()
            .send_json(&body)
            .map_err(|source| map_request_error(&url, source))?;
        Ok(())
    }

    /// All dataset repositories authored by `author`, across every page.
    pub fn list_datasets(&self, author: &str) -> Result<Vec<RepoMeta>, HubError> {
        let first = listing_url(&self.endpoint, author)?;

        let mut repos = Vec::new();
        let mut next = Some(first.to_string());
        while let Some(url) = next {
            let (page, link): (Vec<RepoMeta>, Option<String>) = self.get_page(&url)?;
            debug!(%url, count = page.len(), "listed page");
            repos.extend(page);
            next = link;
        }
        Ok(repos)
    }
}

/// First page of an author's datasets, with full metadata (tags included).
fn listing_url(endpoint: &str, author: &str) -> Result<url::Url, HubError> {
    url::Url::parse_with_params(
        &format!("{endpoint}/api/datasets"),
        &[("author", author), ("full", "true")],
    )
    .map_err(|source| HubError::Api(format!("invalid endpoint: {source}")))
}

pub(super) fn map_request_error(url: &str, source: ureq::Error) -> HubError {
    match source {
        ureq::Error::StatusCode(status) => HubError::Status {
            url: url.to_string(),
            status,
        },
        source => HubError::Request {
            url: url.to_string(),
            source,
        },
    }
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header.
fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .map(str::to_string)
    })
}

fn io_error(path: &std::path::Path) -> impl Fn(std::io::Error) -> HubError + '_ {
    move |source| HubError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Preupload body: size plus a base64 sample of the leading bytes per file.
fn build_preupload_request(files: &[DatasetFile]) -> Result<serde_json::Value, HubError> {
    let mut entries = Vec::with_capacity(files.len());
    for file in files {
        let mut source = File::open(&file.source).map_err(io_error(&file.source))?;
        let size = source
            .metadata()
            .map_err(io_error(&file.source))?
            .len();
        let mut sample = Vec::new();
        source
            .by_ref()
            .take(SAMPLE_BYTES)
            .read_to_end(&mut sample)
            .map_err(io_error(&file.source))?;
        entries.push(json!({
            "path": file.relative_path,
            "size": size,
            "sample": BASE64.encode(sample),
        }));
    }
    Ok(json!({ "files": entries }))
}

/// Mode for a file the Hub did not classify.
fn fallback_mode(file: &DatasetFile) -> Result<UploadMode, HubError> {
    let size = std::fs::metadata(&file.source)
        .map_err(io_error(&file.source))?
        .len();
    if is_binary_path(&file.relative_path) || size > REGULAR_SIZE_LIMIT {
        Ok(UploadMode::Lfs)
    } else {
        Ok(UploadMode::Regular)
    }
}

/// Decide how each file travels in the commit. Ignored files are dropped.
fn plan_commit<'a>(
    handle: &'a DatasetHandle,
    modes: &HashMap<String, UploadMode>,
) -> Result<Vec<CommitOperation<'a>>, HubError> {
    let mut operations = Vec::with_capacity(handle.len());
    for file in handle.files() {
        let mode = match modes.get(&file.relative_path) {
            Some(mode) => *mode,
            None => fallback_mode(file)?,
        };
        match mode {
            UploadMode::Regular => operations.push(CommitOperation::Regular(file)),
            UploadMode::Lfs => operations.push(CommitOperation::Lfs {
                file,
                pointer: LfsPointer::from_file(&file.source)?,
            }),
            UploadMode::Ignored => debug!(path = %file.relative_path, "skipping ignored file"),
        }
    }
    Ok(operations)
}

/// NDJSON commit body: a header line, then one `file` line (inline base64)
/// or `lfsFile` line (pointer) per operation.
fn build_commit_payload(
    operations: &[CommitOperation<'_>],
    summary: &str,
) -> Result<String, HubError> {
    let mut lines = Vec::with_capacity(operations.len() + 1);
    lines.push(
        json!({
            "key": "header",
            "value": { "summary": summary, "description": "" },
        })
        .to_string(),
    );

    for operation in operations {
        let line = match operation {
            CommitOperation::Regular(file) => {
                let bytes = std::fs::read(&file.source).map_err(io_error(&file.source))?;
                json!({
                    "key": "file",
                    "value": {
                        "content": BASE64.encode(bytes),
                        "path": file.relative_path,
                        "encoding": "base64",
                    },
                })
            }
            CommitOperation::Lfs { file, pointer } => json!({
                "key": "lfsFile",
                "value": {
                    "path": file.relative_path,
                    "algo": "sha256",
                    "oid": pointer.oid,
                    "size": pointer.size,
                },
            }),
        };
        lines.push(line.to_string());
    }

    Ok(lines.join("\n"))
}
