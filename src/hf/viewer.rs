//! Configuration discovery through the dataset viewer API.

use serde_json::Value;

use super::api::HubHttp;
use super::{HubError, RepoId};

/// Configuration names of `repo`, in first-seen order.
pub fn list_config_names(http: &HubHttp, repo: &RepoId) -> Result<Vec<String>, HubError> {
    let splits_json = fetch_viewer_json(http, "splits", repo)?;
    if let Some(message) = splits_json.get("error").and_then(Value::as_str) {
        return Err(HubError::Api(message.to_string()));
    }
    Ok(extract_config_names(&splits_json))
}

fn fetch_viewer_json(http: &HubHttp, endpoint: &str, repo: &RepoId) -> Result<Value, HubError> {
    let mut url = url::Url::parse(&format!(
        "{}/{}",
        http.viewer_endpoint().trim_end_matches('/'),
        endpoint
    ))
    .map_err(|source| HubError::Api(format!("invalid viewer endpoint: {source}")))?;

    url.query_pairs_mut()
        .append_pair("dataset", &repo.to_string());

    http.get_json(url.as_str())
}

fn extract_config_names(splits_json: &Value) -> Vec<String> {
    let mut configs: Vec<String> = Vec::new();
    if let Some(items) = splits_json.get("splits").and_then(Value::as_array) {
        for item in items {
            if let Some(config) = item.get("config").and_then(Value::as_str) {
                if !configs.iter().any(|seen| seen == config) {
                    configs.push(config.to_string());
                }
            }
        }
    }
    configs
}
