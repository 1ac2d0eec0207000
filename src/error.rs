use thiserror::Error;

use crate::hf::HubError;

/// The main error type for hfdatasets operations.
#[derive(Debug, Error)]
pub enum HfDatasetsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid repository '{input}': {message}")]
    InvalidRepoId { input: String, message: String },

    #[error("Failed to enumerate configurations of {repo_id}: {source}")]
    ConfigEnumeration {
        repo_id: String,
        #[source]
        source: HubError,
    },

    #[error("Failed to transfer {repo_id}{}: {source}", config_suffix(.config))]
    Transfer {
        repo_id: String,
        config: Option<String>,
        #[source]
        source: HubError,
    },

    #[error("Failed to upload dataset to {repo_id}: {source}")]
    Upload {
        repo_id: String,
        #[source]
        source: HubError,
    },

    #[error("Failed to delete dataset {repo_id}: {source}")]
    Deletion {
        repo_id: String,
        #[source]
        source: HubError,
    },

    #[error("Error retrieving datasets for {author}: {message}")]
    Listing { author: String, message: String },
}

fn config_suffix(config: &Option<String>) -> String {
    config
        .as_deref()
        .map(|config| format!(" (config '{config}')"))
        .unwrap_or_default()
}
