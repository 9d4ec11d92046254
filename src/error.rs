use thiserror::Error;

/// 知识库导入流程的统一错误类型。
/// 对 Flutter 暴露时统一转换为 `String`，内部保持强类型。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KnowledgeError {
    #[error("failed to resolve dropped entries: {0}")]
    Resolve(String),

    #[error("no files to upload")]
    EmptyBatch,

    #[error("too many files: maximum is {max}, received {count}")]
    BatchTooLarge { count: usize, max: usize },

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("failed to list vector store files: {0}")]
    Listing(String),

    #[error("failed to delete file: {0}")]
    Delete(String),

    #[error("{0}")]
    Http(String),

    #[error("{0}")]
    Storage(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, KnowledgeError>;
