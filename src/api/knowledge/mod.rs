mod client;
mod delete;
mod health;
pub mod ingest;
mod list;
pub mod models;
mod upload;

pub use health::check_backend_health;
pub use list::list_vector_store_files;
pub use models::{
    BatchUploadResult, DeleteOutcome, FileListFilter, FileListSnapshot, FileStatus,
    IngestionPhase, IngestionSnapshot, PendingFile, RemoteFileRecord, UploadErrorEntry,
    UploadMetadata,
};
pub use upload::{check_batch_size, MAX_BATCH_FILES};

pub(crate) use client::current_base_url;
pub(crate) use delete::delete_file_request;
pub(crate) use list::fetch_vector_store_files;
pub(crate) use upload::{post_files_batch, post_single_file};

pub(crate) const FILES_PATH: &str = "vector-store/files";
pub(crate) const BATCH_PATH: &str = "vector-store/files/batch";
pub(crate) const HEALTH_PATH: &str = "health";
