//! Hugging Face Hub capability layer.
//!
//! Everything the workflows need from the Hub goes through the
//! [`RemoteDatasetClient`] trait. [`client::HubClient`] is the production
//! adapter; tests substitute in-memory fakes.

pub mod acquire;
pub mod api;
pub mod client;
pub mod lfs;
pub mod resolve;
pub mod viewer;

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

pub use client::HubClient;

/// Default Hub endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

/// Default dataset viewer endpoint, used for configuration discovery.
pub const DEFAULT_VIEWER_ENDPOINT: &str = "https://datasets-server.huggingface.co";

/// Canonical `<namespace>/<name>` reference to a Hub dataset repository.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RepoId {
    namespace: String,
    name: String,
}

impl RepoId {
    /// Parse a repo id or dataset URL. See [`resolve::parse_repo_id`].
    pub fn parse(input: &str) -> Result<Self, crate::HfDatasetsError> {
        resolve::parse_repo_id(input)
    }

    pub(crate) fn from_parts(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The part after the separator, used to name local output directories.
    pub fn short_name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Destination of an upload: either a full repo id or a bare name that lands
/// in the authenticated user's namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RepoTarget {
    Qualified(RepoId),
    Bare(String),
}

impl RepoTarget {
    pub fn name(&self) -> &str {
        match self {
            RepoTarget::Qualified(repo_id) => repo_id.short_name(),
            RepoTarget::Bare(name) => name,
        }
    }
}

impl fmt::Display for RepoTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoTarget::Qualified(repo_id) => write!(f, "{repo_id}"),
            RepoTarget::Bare(name) => f.write_str(name),
        }
    }
}

/// Repository access control.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn from_public_flag(public: bool) -> Self {
        if public {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }

    pub fn is_private(self) -> bool {
        self == Visibility::Private
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => f.write_str("public"),
            Visibility::Private => f.write_str("private"),
        }
    }
}

/// Listing metadata for one dataset repository.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RepoMeta {
    pub id: String,
    #[serde(rename = "lastModified", default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One file of a dataset, addressed relative to the dataset root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetFile {
    /// `/`-separated path inside the dataset.
    pub relative_path: String,
    /// Local file holding the content (Hub cache or user directory).
    pub source: PathBuf,
}

/// A loaded dataset. Handed from one collaborator to the next by value.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DatasetHandle {
    files: Vec<DatasetFile>,
}

impl DatasetHandle {
    pub fn new(files: Vec<DatasetFile>) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &[DatasetFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn into_files(self) -> Vec<DatasetFile> {
        self.files
    }
}

/// Connection settings for [`HubClient`].
#[derive(Clone, Debug)]
pub struct HubSettings {
    pub endpoint: String,
    pub viewer_endpoint: String,
    pub token: Option<String>,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            viewer_endpoint: DEFAULT_VIEWER_ENDPOINT.to_string(),
            token: None,
        }
    }
}

/// Failures reported by the Hub adapter or the local dataset store.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: ureq::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("{0}")]
    Api(String),

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} does not contain a loadable dataset", .path.display())]
    NotADataset { path: PathBuf },

    #[error("refusing to write dataset file outside its directory: {path}")]
    UnsafePath { path: String },
}

/// Operations the workflows need from the remote Hub.
pub trait RemoteDatasetClient {
    /// Configuration names of a dataset, in the order the Hub reports them.
    fn list_configs(&self, repo_id: &RepoId) -> Result<Vec<String>, HubError>;

    /// Fetch the files of a single configuration.
    fn fetch_config(&self, repo_id: &RepoId, config: &str) -> Result<DatasetHandle, HubError>;

    /// Fetch the whole repository without selecting a configuration.
    fn fetch_all(&self, repo_id: &RepoId) -> Result<DatasetHandle, HubError>;

    /// Create (if needed) and commit the dataset. Returns the repo written to.
    fn push(
        &self,
        handle: DatasetHandle,
        target: &RepoTarget,
        visibility: Visibility,
    ) -> Result<RepoId, HubError>;

    fn delete_repo(&self, repo_id: &RepoId) -> Result<(), HubError>;

    fn list_repos(&self, author: &str) -> Result<Vec<RepoMeta>, HubError>;
}
