use crate::api::knowledge::models::{
    FileListFilter, FileListSnapshot, IngestionSnapshot, RemoteFileRecord,
};
use crate::db;
use crate::ingestion::{IngestionController, KNOWN_CLIENTS};
use crate::logging;
use crate::tree_resolver::{DropPayload, FileHandle};
use std::path::Path;

/// FRB 对外接口：初始化日志与本地设置存储，应用启动时调用一次。
#[flutter_rust_bridge::frb]
pub fn init_app() -> Result<(), String> {
    logging::init_tracing();
    db::init_storage().map_err(|e| e.to_string())
}

/// 处理拖放/选择的路径。目录会被递归展开；返回解析后的状态。
#[flutter_rust_bridge::frb]
pub fn begin_ingestion(paths: Vec<String>) -> IngestionSnapshot {
    IngestionController::shared().begin(DropPayload::from_paths(paths))
}

/// 修改待确认批次的元数据：传 `None` 保持原值，传空字符串清空。
#[flutter_rust_bridge::frb]
pub fn update_pending_metadata(
    immatriculation: Option<String>,
    client: Option<String>,
) -> Result<IngestionSnapshot, String> {
    IngestionController::shared()
        .update_metadata(immatriculation, client)
        .map_err(|e| e.to_string())
}

#[flutter_rust_bridge::frb]
pub fn confirm_ingestion() -> Result<IngestionSnapshot, String> {
    IngestionController::shared()
        .confirm()
        .map_err(|e| e.to_string())
}

#[flutter_rust_bridge::frb]
pub fn cancel_ingestion() -> IngestionSnapshot {
    IngestionController::shared().cancel()
}

#[flutter_rust_bridge::frb(sync)]
pub fn ingestion_state() -> IngestionSnapshot {
    IngestionController::shared().snapshot()
}

#[flutter_rust_bridge::frb(sync)]
pub fn known_clients() -> Vec<String> {
    KNOWN_CLIENTS.iter().map(|c| c.to_string()).collect()
}

/// 上传单个文件（不走确认流程），完成后刷新列表。
#[flutter_rust_bridge::frb]
pub fn upload_vector_store_file(
    path: String,
    immatriculation: Option<String>,
    client: Option<String>,
) -> Result<RemoteFileRecord, String> {
    let file = FileHandle::from_path(Path::new(&path)).map_err(|e| e.to_string())?;
    IngestionController::shared()
        .upload_single(file, immatriculation, client)
        .map_err(|e| e.to_string())
}

/// 设置过滤条件并重新拉取文件列表。
#[flutter_rust_bridge::frb]
pub fn refresh_vector_store_files(
    immatriculation: Option<String>,
    client: Option<String>,
) -> Result<FileListSnapshot, String> {
    IngestionController::shared()
        .refresh_files(FileListFilter::new(immatriculation, client))
        .map_err(|e| e.to_string())
}

#[flutter_rust_bridge::frb(sync)]
pub fn vector_store_files() -> FileListSnapshot {
    IngestionController::shared().file_list()
}

/// 删除文件并刷新列表；失败时列表保持原样，可直接重试。
#[flutter_rust_bridge::frb]
pub fn delete_vector_store_file(file_id: String) -> Result<FileListSnapshot, String> {
    IngestionController::shared()
        .delete_file(&file_id)
        .map_err(|e| e.to_string())
}
