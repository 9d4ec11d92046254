//! 单测使用的内存版知识库后端。

use super::gateway::VectorStoreGateway;
use super::reconciler::recover_lock;
use crate::api::knowledge::models::{
    BatchUploadResult, DeleteOutcome, FileListFilter, FileStatus, RemoteFileRecord,
    UploadErrorEntry, UploadMetadata,
};
use crate::api::knowledge::check_batch_size;
use crate::error::{KnowledgeError, Result};
use crate::tree_resolver::FileHandle;
use std::sync::Mutex;

type Hook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
pub(crate) struct FakeGateway {
    state: Mutex<FakeState>,
    before_upload: Mutex<Option<Hook>>,
    before_list: Mutex<Option<Hook>>,
}

#[derive(Default)]
struct FakeState {
    remote: Vec<RemoteFileRecord>,
    next_id: u64,
    rejected_names: Vec<String>,
    upload_failure: Option<String>,
    fail_listing: bool,
    fail_delete: bool,
    list_calls: usize,
    upload_calls: usize,
    last_filter: Option<FileListFilter>,
    last_upload: Option<(Vec<String>, UploadMetadata)>,
}

impl FakeGateway {
    pub(crate) fn with_files(names: &[&str]) -> Self {
        let gateway = FakeGateway::default();
        gateway.set_remote(names);
        gateway
    }

    pub(crate) fn set_remote(&self, names: &[&str]) {
        let mut state = recover_lock(&self.state);
        let records: Vec<RemoteFileRecord> = names
            .iter()
            .map(|name| {
                state.next_id += 1;
                record(state.next_id, name, &UploadMetadata::default())
            })
            .collect();
        state.remote = records;
    }

    pub(crate) fn reject_names(&self, names: &[&str]) {
        recover_lock(&self.state).rejected_names = names.iter().map(|n| n.to_string()).collect();
    }

    pub(crate) fn fail_uploads_with(&self, message: &str) {
        recover_lock(&self.state).upload_failure = Some(message.to_string());
    }

    pub(crate) fn fail_listing(&self, fail: bool) {
        recover_lock(&self.state).fail_listing = fail;
    }

    pub(crate) fn fail_delete(&self, fail: bool) {
        recover_lock(&self.state).fail_delete = fail;
    }

    pub(crate) fn before_next_upload(&self, hook: impl FnOnce() + Send + 'static) {
        *recover_lock(&self.before_upload) = Some(Box::new(hook));
    }

    pub(crate) fn before_next_list(&self, hook: impl FnOnce() + Send + 'static) {
        *recover_lock(&self.before_list) = Some(Box::new(hook));
    }

    pub(crate) fn list_calls(&self) -> usize {
        recover_lock(&self.state).list_calls
    }

    pub(crate) fn upload_calls(&self) -> usize {
        recover_lock(&self.state).upload_calls
    }

    pub(crate) fn last_filter(&self) -> Option<FileListFilter> {
        recover_lock(&self.state).last_filter.clone()
    }

    pub(crate) fn last_upload(&self) -> Option<(Vec<String>, UploadMetadata)> {
        recover_lock(&self.state).last_upload.clone()
    }
}

fn record(id: u64, name: &str, metadata: &UploadMetadata) -> RemoteFileRecord {
    RemoteFileRecord {
        id: format!("file-{id}"),
        filename: name.to_string(),
        status: FileStatus::InProgress,
        bytes: 1,
        created_at: 1_718_000_000 + id as i64,
        purpose: "assistants".to_string(),
        immatriculation: metadata.immatriculation.clone(),
        client: metadata.client.clone(),
    }
}

impl VectorStoreGateway for FakeGateway {
    fn list_files(&self, filter: &FileListFilter) -> Result<Vec<RemoteFileRecord>> {
        let hook = recover_lock(&self.before_list).take();
        if let Some(hook) = hook {
            hook();
        }

        let mut state = recover_lock(&self.state);
        state.list_calls += 1;
        state.last_filter = Some(filter.clone());
        if state.fail_listing {
            return Err(KnowledgeError::Listing("server returned HTTP 500".to_string()));
        }
        Ok(state
            .remote
            .iter()
            .filter(|f| {
                filter
                    .immatriculation
                    .as_ref()
                    .map_or(true, |v| f.immatriculation.as_ref() == Some(v))
                    && filter.client.as_ref().map_or(true, |v| f.client.as_ref() == Some(v))
            })
            .cloned()
            .collect())
    }

    fn upload_batch(
        &self,
        files: &[FileHandle],
        metadata: &UploadMetadata,
    ) -> Result<BatchUploadResult> {
        check_batch_size(files.len())?;
        let hook = recover_lock(&self.before_upload).take();
        if let Some(hook) = hook {
            hook();
        }

        let mut state = recover_lock(&self.state);
        state.upload_calls += 1;
        state.last_upload = Some((
            files.iter().map(|f| f.name.clone()).collect(),
            metadata.clone(),
        ));
        if let Some(message) = state.upload_failure.clone() {
            return Err(KnowledgeError::Upload(message));
        }

        let mut result = BatchUploadResult::default();
        for file in files {
            if state.rejected_names.contains(&file.name) {
                result.errors.push(UploadErrorEntry {
                    file_name: file.name.clone(),
                    error_message: format!("Failed to upload file {}: rejected", file.name),
                });
                continue;
            }
            state.next_id += 1;
            let stored = record(state.next_id, &file.name, metadata);
            state.remote.push(stored.clone());
            result.files.push(stored);
        }
        result.success_count = result.files.len() as u32;
        result.error_count = result.errors.len() as u32;
        Ok(result)
    }

    fn upload_file(
        &self,
        file: &FileHandle,
        metadata: &UploadMetadata,
    ) -> Result<RemoteFileRecord> {
        let result = self.upload_batch(std::slice::from_ref(file), metadata)?;
        match (result.files.into_iter().next(), result.errors.into_iter().next()) {
            (Some(stored), _) => Ok(stored),
            (None, Some(entry)) => Err(KnowledgeError::Upload(entry.error_message)),
            (None, None) => Err(KnowledgeError::Upload("empty response".to_string())),
        }
    }

    fn delete_file(&self, file_id: &str) -> Result<DeleteOutcome> {
        let mut state = recover_lock(&self.state);
        if state.fail_delete {
            return Err(KnowledgeError::Delete("server returned HTTP 500".to_string()));
        }
        let before = state.remote.len();
        state.remote.retain(|f| f.id != file_id);
        if state.remote.len() == before {
            return Err(KnowledgeError::Delete(format!("file {file_id} not found")));
        }
        Ok(DeleteOutcome {
            success: true,
            file_id: file_id.to_string(),
            message: "File deleted from vector store and Files API".to_string(),
        })
    }
}
