use super::{
    client::{
        build_blocking_client, current_base_url, endpoint_url, read_error_response, SHORT_TIMEOUT,
    },
    models::{FileListFilter, FileStatus, RemoteFileRecord},
    FILES_PATH,
};
use crate::error::KnowledgeError;
use serde::Deserialize;

/// 直接拉取知识库文件列表（不经过缓存），可按车牌号/客户过滤。
#[flutter_rust_bridge::frb]
pub fn list_vector_store_files(
    immatriculation: Option<String>,
    client: Option<String>,
) -> Result<Vec<RemoteFileRecord>, String> {
    let base_url = current_base_url().map_err(|e| e.to_string())?;
    fetch_vector_store_files(&base_url, &FileListFilter::new(immatriculation, client))
        .map_err(|e| e.to_string())
}

pub(crate) fn fetch_vector_store_files(
    base_url: &str,
    filter: &FileListFilter,
) -> Result<Vec<RemoteFileRecord>, KnowledgeError> {
    let url = endpoint_url(
        base_url,
        FILES_PATH,
        &[
            ("immatriculation", filter.immatriculation.as_deref()),
            ("client", filter.client.as_deref()),
        ],
    )?;
    let client = build_blocking_client(SHORT_TIMEOUT)?;

    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .map_err(|e| KnowledgeError::Listing(format!("request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(KnowledgeError::Listing(read_error_response(response)));
    }

    let body = response
        .text()
        .map_err(|e| KnowledgeError::Listing(format!("failed to read response: {e}")))?;
    parse_listing(&body)
}

pub(crate) fn parse_listing(body: &str) -> Result<Vec<RemoteFileRecord>, KnowledgeError> {
    let payload: FileListResponse = serde_json::from_str(body)
        .map_err(|e| KnowledgeError::Listing(format!("failed to parse response: {e}")))?;
    Ok(payload.files.into_iter().map(RemoteFileRecord::from).collect())
}

#[derive(Debug, Deserialize)]
struct FileListResponse {
    files: Vec<RemoteFileDto>,
}

/// 后端文件记录。缺失的 filename/bytes/purpose 与后端自身的缺省值保持一致。
#[derive(Debug, Deserialize)]
pub(crate) struct RemoteFileDto {
    id: String,
    #[serde(default = "unknown_filename")]
    filename: String,
    status: String,
    #[serde(default)]
    bytes: u64,
    created_at: i64,
    #[serde(default = "default_purpose")]
    purpose: String,
    #[serde(default)]
    immatriculation: Option<String>,
    #[serde(default)]
    client: Option<String>,
}

fn unknown_filename() -> String {
    "unknown".to_string()
}

fn default_purpose() -> String {
    "assistants".to_string()
}

impl From<RemoteFileDto> for RemoteFileRecord {
    fn from(value: RemoteFileDto) -> Self {
        RemoteFileRecord {
            id: value.id,
            filename: value.filename,
            status: FileStatus::from(value.status),
            bytes: value.bytes,
            created_at: value.created_at,
            purpose: value.purpose,
            immatriculation: value.immatriculation,
            client: value.client,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_listing_with_optional_tags() {
        let body = r#"{"files": [
            {"id": "file-1", "filename": "a.pdf", "status": "completed", "created_at": 1718000000,
             "bytes": 2048, "purpose": "assistants", "immatriculation": "GH-728-KS", "client": "HOMECARE"},
            {"id": "file-2", "filename": "b.pdf", "status": "in_progress", "created_at": 1718000001,
             "bytes": 10, "purpose": "assistants", "immatriculation": null, "client": null},
            {"id": "file-3", "status": "cancelled", "created_at": 1718000002}
        ]}"#;
        let files = parse_listing(body).unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(files[0].status, FileStatus::Completed);
        assert_eq!(files[0].immatriculation.as_deref(), Some("GH-728-KS"));
        assert_eq!(files[0].client.as_deref(), Some("HOMECARE"));
        assert_eq!(files[1].status, FileStatus::InProgress);
        assert_eq!(files[1].immatriculation, None);
        assert_eq!(files[2].status, FileStatus::Other("cancelled".to_string()));
        assert_eq!(files[2].filename, "unknown");
        assert_eq!(files[2].bytes, 0);
        assert_eq!(files[2].purpose, "assistants");
    }

    #[test]
    fn malformed_listing_is_a_listing_error() {
        let err = parse_listing(r#"{"items": []}"#).unwrap_err();
        assert!(matches!(err, KnowledgeError::Listing(_)));
    }
}
