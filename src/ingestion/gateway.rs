use crate::api::knowledge::{
    self,
    models::{BatchUploadResult, DeleteOutcome, FileListFilter, RemoteFileRecord, UploadMetadata},
};
use crate::error::Result;
use crate::tree_resolver::FileHandle;

/// 与知识库后端交互的唯一入口。上层只依赖该 trait，便于替换实现或在单测中注入假实现。
/// 所有传输与解析错误都在实现内部归一为 [`crate::error::KnowledgeError`]。
pub trait VectorStoreGateway: Send + Sync {
    fn list_files(&self, filter: &FileListFilter) -> Result<Vec<RemoteFileRecord>>;

    fn upload_batch(
        &self,
        files: &[FileHandle],
        metadata: &UploadMetadata,
    ) -> Result<BatchUploadResult>;

    fn upload_file(&self, file: &FileHandle, metadata: &UploadMetadata)
        -> Result<RemoteFileRecord>;

    fn delete_file(&self, file_id: &str) -> Result<DeleteOutcome>;
}

/// 基于 HTTP 的默认实现。未固定地址时，每次调用都从设置中读取，修改设置后立即生效。
#[derive(Clone, Debug, Default)]
pub struct HttpGateway {
    base_url: Option<String>,
}

impl HttpGateway {
    pub fn from_settings() -> Self {
        HttpGateway { base_url: None }
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        HttpGateway {
            base_url: Some(base_url.into()),
        }
    }

    fn base_url(&self) -> Result<String> {
        match &self.base_url {
            Some(url) => Ok(url.clone()),
            None => knowledge::current_base_url(),
        }
    }
}

impl VectorStoreGateway for HttpGateway {
    fn list_files(&self, filter: &FileListFilter) -> Result<Vec<RemoteFileRecord>> {
        knowledge::fetch_vector_store_files(&self.base_url()?, filter)
    }

    fn upload_batch(
        &self,
        files: &[FileHandle],
        metadata: &UploadMetadata,
    ) -> Result<BatchUploadResult> {
        knowledge::post_files_batch(&self.base_url()?, files, metadata)
    }

    fn upload_file(
        &self,
        file: &FileHandle,
        metadata: &UploadMetadata,
    ) -> Result<RemoteFileRecord> {
        knowledge::post_single_file(&self.base_url()?, file, metadata)
    }

    fn delete_file(&self, file_id: &str) -> Result<DeleteOutcome> {
        knowledge::delete_file_request(&self.base_url()?, file_id)
    }
}
