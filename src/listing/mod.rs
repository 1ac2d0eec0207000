//! Dataset listing with keyword filtering.
//!
//! Listing is read-only, so retrieval problems are logged and reported as
//! [`ListOutcome::Failed`] instead of being returned as errors.

pub mod report;

use std::fmt;

use regex::{Regex, RegexBuilder};
use tracing::{error, info};

use crate::error::HfDatasetsError;
use crate::hf::{RemoteDatasetClient, RepoMeta};

pub use report::{summarize_tags, ListReport};

/// Result of a listing request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListOutcome {
    Found(ListReport),
    /// The author has no dataset repositories at all.
    NoDatasets { author: String },
    /// The author has datasets but none match the keyword.
    NoMatches { keyword: String },
    Failed { message: String },
}

impl fmt::Display for ListOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListOutcome::Found(report) => write!(f, "{report}"),
            ListOutcome::NoDatasets { author } => writeln!(
                f,
                "\nNo datasets found for user {author} on Hugging Face Hub"
            ),
            ListOutcome::NoMatches { keyword } => {
                writeln!(f, "\nNo matching datasets found for keyword '{keyword}'")
            }
            ListOutcome::Failed { .. } => Ok(()),
        }
    }
}

/// Lists an author's datasets through a [`RemoteDatasetClient`].
pub struct Lister<'a, C> {
    client: &'a C,
}

impl<'a, C: RemoteDatasetClient> Lister<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    pub fn list(&self, author: &str, keyword: Option<&str>) -> ListOutcome {
        match self.try_list(author, keyword) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, "listing failed");
                ListOutcome::Failed {
                    message: err.to_string(),
                }
            }
        }
    }

    fn try_list(
        &self,
        author: &str,
        keyword: Option<&str>,
    ) -> Result<ListOutcome, HfDatasetsError> {
        let listing_error = |message: String| HfDatasetsError::Listing {
            author: author.to_string(),
            message,
        };

        info!(author, "retrieving dataset list from Hugging Face Hub");
        let datasets = self
            .client
            .list_repos(author)
            .map_err(|source| listing_error(source.to_string()))?;

        if datasets.is_empty() {
            return Ok(ListOutcome::NoDatasets {
                author: author.to_string(),
            });
        }

        let datasets = match keyword {
            Some(keyword) => {
                let pattern =
                    keyword_pattern(keyword).map_err(|err| listing_error(err.to_string()))?;
                let matching = filter_by_pattern(datasets, &pattern);
                if matching.is_empty() {
                    return Ok(ListOutcome::NoMatches {
                        keyword: keyword.to_string(),
                    });
                }
                matching
            }
            None => datasets,
        };

        Ok(ListOutcome::Found(ListReport { datasets }))
    }
}

/// Case-insensitive search pattern for `keyword`.
pub fn keyword_pattern(keyword: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(keyword).case_insensitive(true).build()
}

/// Keep entries whose id contains a match, preserving order.
pub fn filter_by_pattern(datasets: Vec<RepoMeta>, pattern: &Regex) -> Vec<RepoMeta> {
    datasets
        .into_iter()
        .filter(|dataset| pattern.is_match(&dataset.id))
        .collect()
}
