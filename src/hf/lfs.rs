//! Git LFS transfer for dataset files the Hub does not accept inline.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::api::{map_request_error, HubHttp};
use super::{DatasetFile, HubError, RepoId};

const LFS_MEDIA_TYPE: &str = "application/vnd.git-lfs+json";

/// Objects per batch request.
const BATCH_LIMIT: usize = 256;

/// Extensions that always travel through LFS when the Hub gives no answer.
const BINARY_EXTENSIONS: &[&str] = &[
    "7z", "arrow", "avro", "bin", "bz2", "feather", "flac", "gz", "h5", "hdf5", "jpeg", "jpg",
    "mp3", "mp4", "npy", "npz", "orc", "parquet", "pickle", "pkl", "png", "pt", "safetensors",
    "tar", "tfrecord", "wav", "xz", "zip", "zst",
];

/// Whether a dataset path names binary content.
pub fn is_binary_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| BINARY_EXTENSIONS.iter().any(|b| b.eq_ignore_ascii_case(ext)))
}

/// Content address of a file stored through LFS.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LfsPointer {
    /// Hex SHA-256 of the content.
    pub oid: String,
    pub size: u64,
}

impl LfsPointer {
    pub fn from_file(path: &Path) -> Result<Self, HubError> {
        let io_err = |source| HubError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::open(path).map_err(io_err)?;
        let mut hasher = Sha256::new();
        let size = io::copy(&mut file, &mut hasher).map_err(io_err)?;
        Ok(Self {
            oid: hex::encode(hasher.finalize()),
            size,
        })
    }
}

pub(crate) fn build_batch_request(pointers: &[&LfsPointer]) -> Value {
    let objects: Vec<Value> = pointers
        .iter()
        .map(|pointer| json!({ "oid": pointer.oid, "size": pointer.size }))
        .collect();
    json!({
        "operation": "upload",
        "transfers": ["basic", "multipart"],
        "hash_algo": "sha256",
        "ref": { "name": "main" },
        "objects": objects,
    })
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    objects: Vec<BatchObject>,
}

#[derive(Debug, Deserialize)]
struct BatchObject {
    oid: String,
    #[serde(default)]
    actions: Option<BatchActions>,
    #[serde(default)]
    error: Option<BatchObjectError>,
}

#[derive(Debug, Default, Deserialize)]
struct BatchActions {
    upload: Option<LfsAction>,
    verify: Option<LfsAction>,
}

#[derive(Debug, Deserialize)]
struct LfsAction {
    href: String,
    #[serde(default)]
    header: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct BatchObjectError {
    #[serde(default)]
    code: u16,
    message: String,
}

#[derive(Debug, PartialEq, Eq)]
enum Transfer {
    Basic,
    /// Presigned part URLs ordered by part number.
    Multipart {
        chunk_size: u64,
        parts: Vec<(u32, String)>,
    },
}

fn transfer_of(action: &LfsAction) -> Result<Transfer, HubError> {
    let Some(chunk_size) = action.header.get("chunk_size") else {
        return Ok(Transfer::Basic);
    };
    let chunk_size = chunk_size
        .parse::<u64>()
        .map_err(|_| HubError::Api(format!("invalid LFS chunk size '{chunk_size}'")))?;

    let mut parts: Vec<(u32, String)> = action
        .header
        .iter()
        .filter_map(|(key, href)| key.parse::<u32>().ok().map(|n| (n, href.clone())))
        .collect();
    parts.sort_by_key(|(number, _)| *number);
    Ok(Transfer::Multipart { chunk_size, parts })
}

impl HubHttp {
    /// Upload the content behind each pointer the Hub does not already store.
    pub fn upload_lfs(
        &self,
        repo_id: &RepoId,
        objects: &[(&DatasetFile, &LfsPointer)],
    ) -> Result<(), HubError> {
        let url = format!(
            "{}/datasets/{}.git/info/lfs/objects/batch",
            self.endpoint(),
            repo_id
        );

        for chunk in objects.chunks(BATCH_LIMIT) {
            let pointers: Vec<&LfsPointer> = chunk.iter().map(|(_, pointer)| *pointer).collect();
            let body = build_batch_request(&pointers).to_string();
            debug!(%url, objects = chunk.len(), "POST");

            let mut request = self
                .agent()
                .post(url.as_str())
                .header("Accept", LFS_MEDIA_TYPE)
                .header("Content-Type", LFS_MEDIA_TYPE);
            if let Some(bearer) = self.bearer() {
                request = request.header("Authorization", &bearer);
            }
            let mut response = request
                .send(body.as_bytes())
                .map_err(|source| map_request_error(&url, source))?;
            let batch: BatchResponse =
                response
                    .body_mut()
                    .read_json()
                    .map_err(|source| HubError::Decode {
                        url: url.clone(),
                        message: source.to_string(),
                    })?;

            for object in batch.objects {
                if let Some(error) = object.error {
                    return Err(HubError::Api(format!(
                        "LFS object {} rejected ({}): {}",
                        object.oid, error.code, error.message
                    )));
                }
                let Some((file, pointer)) = chunk.iter().find(|(_, p)| p.oid == object.oid) else {
                    continue;
                };
                let Some(actions) = object.actions else {
                    debug!(path = %file.relative_path, "LFS object already stored");
                    continue;
                };
                if let Some(upload) = &actions.upload {
                    self.put_object(upload, file, pointer)?;
                }
                if let Some(verify) = &actions.verify {
                    self.verify_object(verify, pointer)?;
                }
                info!(path = %file.relative_path, size = pointer.size, "uploaded LFS object");
            }
        }
        Ok(())
    }

    fn put_object(
        &self,
        action: &LfsAction,
        file: &DatasetFile,
        pointer: &LfsPointer,
    ) -> Result<(), HubError> {
        let io_err = |source| HubError::Io {
            path: file.source.clone(),
            source,
        };

        match transfer_of(action)? {
            Transfer::Basic => {
                let bytes = std::fs::read(&file.source).map_err(io_err)?;
                let mut request = self.agent().put(action.href.as_str());
                for (name, value) in &action.header {
                    request = request.header(name.as_str(), value.as_str());
                }
                request
                    .send(&bytes[..])
                    .map_err(|source| map_request_error(&action.href, source))?;
            }
            Transfer::Multipart { chunk_size, parts } => {
                let mut source = File::open(&file.source).map_err(io_err)?;
                let mut completed = Vec::with_capacity(parts.len());
                for (number, href) in &parts {
                    let mut chunk = Vec::new();
                    source
                        .by_ref()
                        .take(chunk_size)
                        .read_to_end(&mut chunk)
                        .map_err(io_err)?;
                    debug!(path = %file.relative_path, part = number, bytes = chunk.len(), "PUT");
                    let response = self
                        .agent()
                        .put(href.as_str())
                        .send(&chunk[..])
                        .map_err(|source| map_request_error(href, source))?;
                    let etag = response
                        .headers()
                        .get("etag")
                        .and_then(|value| value.to_str().ok())
                        .ok_or_else(|| {
                            HubError::Api(format!(
                                "part {number} of {} returned no ETag",
                                file.relative_path
                            ))
                        })?;
                    completed.push(json!({ "partNumber": number, "etag": etag }));
                }

                let body = json!({ "oid": pointer.oid, "parts": completed }).to_string();
                self.agent()
                    .post(action.href.as_str())
                    .header("Accept", LFS_MEDIA_TYPE)
                    .header("Content-Type", LFS_MEDIA_TYPE)
                    .send(body.as_bytes())
                    .map_err(|source| map_request_error(&action.href, source))?;
            }
        }
        Ok(())
    }

    fn verify_object(&self, action: &LfsAction, pointer: &LfsPointer) -> Result<(), HubError> {
        let mut request = self
            .agent()
            .post(action.href.as_str())
            .header("Accept", LFS_MEDIA_TYPE)
            .header("Content-Type", LFS_MEDIA_TYPE);
        for (name, value) in &action.header {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(bearer) = self.bearer() {
            request = request.header("Authorization", &bearer);
        }

        let body = json!({ "oid": pointer.oid, "size": pointer.size }).to_string();
        request
            .send(body.as_bytes())
            .map_err(|source| map_request_error(&action.href, source))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_extensions_are_detected() {
        assert!(is_binary_path("train/data-00000-of-00001.arrow"));
        assert!(is_binary_path("default/train/0000.PARQUET"));
        assert!(!is_binary_path("dataset_info.json"));
        assert!(!is_binary_path("README"));
    }

    #[test]
    fn pointer_hashes_file_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("shard.arrow");
        std::fs::write(&source, b"arrow-bytes").expect("write");

        let pointer = LfsPointer::from_file(&source).expect("pointer");
        assert_eq!(
            pointer.oid,
            "24d7f94425693f586d7f9cc62d2cbc30f7f3cf20dd3dfc7bcf0e574924c4529a"
        );
        assert_eq!(pointer.size, 11);
    }

    #[test]
    fn batch_request_lists_objects() {
        let pointer = LfsPointer {
            oid: "abc".to_string(),
            size: 7,
        };
        let body = build_batch_request(&[&pointer]);
        assert_eq!(body["operation"], "upload");
        assert_eq!(body["hash_algo"], "sha256");
        assert_eq!(body["objects"][0]["oid"], "abc");
        assert_eq!(body["objects"][0]["size"], 7);
    }

    #[test]
    fn multipart_parts_are_ordered_by_number() {
        let action: LfsAction = serde_json::from_value(serde_json::json!({
            "href": "https://hub/complete",
            "header": {
                "chunk_size": "5",
                "00002": "https://s3/part2",
                "00001": "https://s3/part1"
            }
        }))
        .expect("decode");

        assert_eq!(
            transfer_of(&action).expect("transfer"),
            Transfer::Multipart {
                chunk_size: 5,
                parts: vec![
                    (1, "https://s3/part1".to_string()),
                    (2, "https://s3/part2".to_string()),
                ],
            }
        );
    }

    #[test]
    fn plain_header_means_basic_transfer() {
        let action: LfsAction = serde_json::from_value(serde_json::json!({
            "href": "https://s3/object",
            "header": { "x-amz-meta": "1" }
        }))
        .expect("decode");
        assert_eq!(transfer_of(&action).expect("transfer"), Transfer::Basic);
    }

    #[test]
    fn stored_objects_have_no_actions() {
        let batch: BatchResponse = serde_json::from_value(serde_json::json!({
            "transfer": "basic",
            "objects": [{ "oid": "abc", "size": 3 }]
        }))
        .expect("decode");
        assert!(batch.objects[0].actions.is_none());
        assert!(batch.objects[0].error.is_none());
    }
}
