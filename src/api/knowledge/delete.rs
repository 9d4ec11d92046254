use super::{
    client::{build_blocking_client, endpoint_url, read_error_response, SHORT_TIMEOUT},
    models::DeleteOutcome,
    FILES_PATH,
};
use crate::error::KnowledgeError;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;

/// 从向量库与文件存储中删除指定文件。
pub(crate) fn delete_file_request(
    base_url: &str,
    file_id: &str,
) -> Result<DeleteOutcome, KnowledgeError> {
    let file_id = file_id.trim();
    if file_id.is_empty() {
        return Err(KnowledgeError::Delete("file id is required".to_string()));
    }

    let encoded = utf8_percent_encode(file_id, NON_ALPHANUMERIC).to_string();
    let url = endpoint_url(base_url, &format!("{FILES_PATH}/{encoded}"), &[])?;
    let client = build_blocking_client(SHORT_TIMEOUT)?;

    let response = client
        .delete(url)
        .header("Accept", "application/json")
        .send()
        .map_err(|e| KnowledgeError::Delete(format!("request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(KnowledgeError::Delete(read_error_response(response)));
    }

    let body = response
        .text()
        .map_err(|e| KnowledgeError::Delete(format!("failed to read response: {e}")))?;
    parse_delete_response(&body, file_id)
}

fn parse_delete_response(body: &str, file_id: &str) -> Result<DeleteOutcome, KnowledgeError> {
    let dto: DeleteResponse = serde_json::from_str(body)
        .map_err(|e| KnowledgeError::Delete(format!("failed to parse response: {e}")))?;
    if !dto.success {
        return Err(KnowledgeError::Delete(
            dto.message
                .unwrap_or_else(|| format!("server refused to delete {file_id}")),
        ));
    }
    Ok(DeleteOutcome {
        success: dto.success,
        file_id: dto.file_id.unwrap_or_else(|| file_id.to_string()),
        message: dto.message.unwrap_or_default(),
    })
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    success: bool,
    file_id: Option<String>,
    message: Option<String>,
}
