use super::{
    client::{build_blocking_client, endpoint_url, read_error_response, UPLOAD_TIMEOUT},
    list::RemoteFileDto,
    models::{BatchUploadResult, RemoteFileRecord, UploadErrorEntry, UploadMetadata},
    BATCH_PATH, FILES_PATH,
};
use crate::error::KnowledgeError;
use crate::tree_resolver::{FileHandle, FileSource};
use reqwest::blocking::{
    multipart::{Form, Part},
    Client,
};
use serde::Deserialize;
use url::Url;

/// 单次批量上传允许的最大文件数，客户端与服务端使用同一上限。
pub const MAX_BATCH_FILES: usize = 100;

/// 批量大小必须在 [1, MAX_BATCH_FILES] 之间。
pub fn check_batch_size(count: usize) -> Result<(), KnowledgeError> {
    if count == 0 {
        return Err(KnowledgeError::EmptyBatch);
    }
    if count > MAX_BATCH_FILES {
        return Err(KnowledgeError::BatchTooLarge {
            count,
            max: MAX_BATCH_FILES,
        });
    }
    Ok(())
}

/// 以一个 multipart 请求提交整批文件及元数据。
/// 批量大小不合法时直接失败，不发出任何网络请求。
pub(crate) fn post_files_batch(
    base_url: &str,
    files: &[FileHandle],
    metadata: &UploadMetadata,
) -> Result<BatchUploadResult, KnowledgeError> {
    check_batch_size(files.len())?;
    let client = build_blocking_client(UPLOAD_TIMEOUT)?;
    send_files_batch(&client, base_url, files, metadata)
}

fn send_files_batch(
    client: &Client,
    base_url: &str,
    files: &[FileHandle],
    metadata: &UploadMetadata,
) -> Result<BatchUploadResult, KnowledgeError> {
    check_batch_size(files.len())?;

    let mut form = Form::new();
    for file in files {
        form = form.part("files", file_part(file)?);
    }
    form = append_metadata(form, metadata, true);

    let url = endpoint_url(base_url, BATCH_PATH, &[])?;
    let body = send_multipart(client, url, form)?;
    parse_batch_response(&body)
}

/// 单文件上传：`POST <base>/vector-store/files`，字段 `file`。
pub(crate) fn post_single_file(
    base_url: &str,
    file: &FileHandle,
    metadata: &UploadMetadata,
) -> Result<RemoteFileRecord, KnowledgeError> {
    let client = build_blocking_client(UPLOAD_TIMEOUT)?;
    send_single_file(&client, base_url, file, metadata)
}

fn send_single_file(
    client: &Client,
    base_url: &str,
    file: &FileHandle,
    metadata: &UploadMetadata,
) -> Result<RemoteFileRecord, KnowledgeError> {
    let form = append_metadata(Form::new().part("file", file_part(file)?), metadata, false);
    let url = endpoint_url(base_url, FILES_PATH, &[])?;
    let body = send_multipart(client, url, form)?;
    let payload: SingleUploadResponse = serde_json::from_str(&body)
        .map_err(|e| KnowledgeError::Upload(format!("failed to parse upload response: {e}")))?;
    Ok(payload.file.into())
}

/// 发送 multipart 请求并返回成功响应的正文；非 2xx 响应按 `detail` 转换为 Upload 错误。
fn send_multipart(client: &Client, url: Url, form: Form) -> Result<String, KnowledgeError> {
    let response = client
        .post(url)
        .header("Accept", "application/json")
        .multipart(form)
        .send()
        .map_err(|e| KnowledgeError::Upload(format!("request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(KnowledgeError::Upload(read_error_response(response)));
    }

    response
        .text()
        .map_err(|e| KnowledgeError::Upload(format!("failed to read response: {e}")))
}

fn file_part(file: &FileHandle) -> Result<Part, KnowledgeError> {
    let part = match &file.source {
        FileSource::Disk(path) => Part::file(path).map_err(|e| {
            KnowledgeError::Upload(format!("failed to open {}: {e}", file.name))
        })?,
        FileSource::Memory(bytes) => Part::bytes(bytes.to_vec()),
    };
    Ok(part.file_name(file.name.clone()))
}

fn append_metadata(mut form: Form, metadata: &UploadMetadata, include_folder: bool) -> Form {
    if let Some(value) = metadata.immatriculation.clone() {
        form = form.text("immatriculation", value);
    }
    if let Some(value) = metadata.client.clone() {
        form = form.text("client", value);
    }
    if include_folder {
        if let Some(value) = metadata.folder_name.clone() {
            form = form.text("folder_name", value);
        }
    }
    form
}

pub(crate) fn parse_batch_response(body: &str) -> Result<BatchUploadResult, KnowledgeError> {
    let payload: BatchUploadResponse = serde_json::from_str(body)
        .map_err(|e| KnowledgeError::Upload(format!("failed to parse batch response: {e}")))?;
    Ok(BatchUploadResult {
        files: payload.files.into_iter().map(RemoteFileRecord::from).collect(),
        errors: payload
            .errors
            .into_iter()
            .map(|entry| UploadErrorEntry {
                file_name: entry.file,
                error_message: entry.error,
            })
            .collect(),
        success_count: payload.success_count,
        error_count: payload.error_count,
    })
}

#[derive(Debug, Deserialize)]
struct BatchUploadResponse {
    #[serde(default)]
    files: Vec<RemoteFileDto>,
    #[serde(default)]
    errors: Vec<BatchErrorDto>,
    success_count: u32,
    error_count: u32,
}

#[derive(Debug, Deserialize)]
struct BatchErrorDto {
    file: String,
    error: String,
}

#[derive(Debug, Deserialize)]
struct SingleUploadResponse {
    file: RemoteFileDto,
}
