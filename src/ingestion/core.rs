use super::gateway::{HttpGateway, VectorStoreGateway};
use super::reconciler::{recover_lock, FileListCache};
use crate::api::knowledge::check_batch_size;
use crate::api::knowledge::models::{
    BatchUploadResult, FileListFilter, FileListSnapshot, IngestionPhase, IngestionSnapshot,
    PendingFile, RemoteFileRecord, UploadMetadata,
};
use crate::error::{KnowledgeError, Result};
use crate::tree_resolver::{resolve, resolve_flat, DropPayload, FileHandle};
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const LOG_TARGET: &str = "kb_ingest::controller";

static INGESTION_CONTROLLER: Lazy<IngestionController> =
    Lazy::new(|| IngestionController::new(Arc::new(HttpGateway::from_settings())));

/// 导入流程控制器：同一时间只跟踪一个批次。
///
/// 状态流转：`Idle → Resolving → AwaitingConfirmation → Uploading → Idle`。
/// 每次开始新批次都会递增 `epoch`，耗时操作结束后先比对 `epoch`，
/// 被后来者取代的结果直接丢弃。
#[derive(Clone)]
pub struct IngestionController {
    state: Arc<Mutex<InnerState>>,
    gateway: Arc<dyn VectorStoreGateway>,
    file_list: Arc<FileListCache>,
}

#[derive(Default)]
struct InnerState {
    phase: IngestionPhase,
    epoch: u64,
    batch_id: Option<String>,
    pending_files: Vec<FileHandle>,
    metadata: UploadMetadata,
    used_flat_fallback: bool,
    last_result: Option<BatchUploadResult>,
    last_error: Option<String>,
}

impl InnerState {
    fn clear_pending(&mut self) {
        self.pending_files.clear();
        self.metadata = UploadMetadata::default();
        self.used_flat_fallback = false;
    }

    fn snapshot(&self) -> IngestionSnapshot {
        IngestionSnapshot {
            batch_id: self.batch_id.clone(),
            phase: self.phase,
            pending_files: self
                .pending_files
                .iter()
                .map(|f| PendingFile {
                    name: f.name.clone(),
                    size: f.size,
                })
                .collect(),
            pending_metadata: self.metadata.clone(),
            used_flat_fallback: self.used_flat_fallback,
            last_result: self.last_result.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

impl IngestionController {
    pub fn new(gateway: Arc<dyn VectorStoreGateway>) -> Self {
        Self {
            state: Arc::new(Mutex::new(InnerState::default())),
            gateway,
            file_list: Arc::new(FileListCache::new()),
        }
    }

    pub fn shared() -> Self {
        INGESTION_CONTROLLER.clone()
    }

    pub fn snapshot(&self) -> IngestionSnapshot {
        recover_lock(&self.state).snapshot()
    }

    pub fn file_list(&self) -> FileListSnapshot {
        self.file_list.snapshot()
    }

    /// 处理一次拖放或文件选择：解析目录树、检查数量上限并预填元数据。
    /// 目录解析失败时退化为只取顶层文件；空批次或超过上限时回到 Idle 并给出错误。
    pub fn begin(&self, payload: DropPayload) -> IngestionSnapshot {
        let (epoch, batch_id) = {
            let mut state = recover_lock(&self.state);
            state.epoch += 1;
            let batch_id = Uuid::new_v4().to_string();
            state.phase = IngestionPhase::Resolving;
            state.batch_id = Some(batch_id.clone());
            state.clear_pending();
            state.last_result = None;
            state.last_error = None;
            (state.epoch, batch_id)
        };
        info!(target: LOG_TARGET, %batch_id, epoch, entries = payload.len(), "resolving drop payload");

        let (batch, degraded) = match resolve(&payload) {
            Ok(batch) => (batch, false),
            Err(err) => {
                warn!(target: LOG_TARGET, %batch_id, error = %err, "folder resolution failed; falling back to top-level files");
                (resolve_flat(&payload), true)
            }
        };

        let mut state = recover_lock(&self.state);
        if state.epoch != epoch || state.phase != IngestionPhase::Resolving {
            debug!(target: LOG_TARGET, %batch_id, epoch, "discarding superseded resolution");
            return state.snapshot();
        }

        state.used_flat_fallback = degraded;
        match check_batch_size(batch.files.len()) {
            Ok(()) => {
                info!(
                    target: LOG_TARGET,
                    %batch_id,
                    file_count = batch.files.len(),
                    folder = ?batch.inferred_folder_name,
                    "batch awaiting confirmation"
                );
                state.metadata = UploadMetadata::prefilled(batch.inferred_folder_name);
                state.pending_files = batch.files;
                state.phase = IngestionPhase::AwaitingConfirmation;
            }
            Err(err) => {
                warn!(target: LOG_TARGET, %batch_id, error = %err, "batch rejected before confirmation");
                state.clear_pending();
                state.phase = IngestionPhase::Idle;
                state.last_error = Some(err.to_string());
            }
        }
        state.snapshot()
    }

    /// 修改待确认批次的车牌号与客户；仅在等待确认时允许。
    pub fn update_metadata(
        &self,
        immatriculation: Option<String>,
        client: Option<String>,
    ) -> Result<IngestionSnapshot> {
        let mut state = recover_lock(&self.state);
        if state.phase != IngestionPhase::AwaitingConfirmation {
            return Err(KnowledgeError::InvalidState(
                "no batch is awaiting confirmation".to_string(),
            ));
        }
        state.metadata.apply_edits(immatriculation, client)?;
        Ok(state.snapshot())
    }

    /// 放弃当前批次。正在解析或上传的结果落地后会因 epoch 不匹配被丢弃。
    pub fn cancel(&self) -> IngestionSnapshot {
        let mut state = recover_lock(&self.state);
        if state.phase != IngestionPhase::Idle {
            debug!(target: LOG_TARGET, batch_id = ?state.batch_id, phase = ?state.phase, "batch cancelled");
            state.epoch += 1;
        }
        state.phase = IngestionPhase::Idle;
        state.clear_pending();
        state.snapshot()
    }

    /// 提交待确认批次，上传完成（无论成功、部分失败或出错）后重新拉取列表并回到 Idle。
    pub fn confirm(&self) -> Result<IngestionSnapshot> {
        let (epoch, batch_id, files, metadata) = {
            let mut state = recover_lock(&self.state);
            if state.phase != IngestionPhase::AwaitingConfirmation {
                return Err(KnowledgeError::InvalidState(
                    "no batch is awaiting confirmation".to_string(),
                ));
            }
            state.phase = IngestionPhase::Uploading;
            (
                state.epoch,
                state.batch_id.clone().unwrap_or_default(),
                std::mem::take(&mut state.pending_files),
                state.metadata.clone(),
            )
        };
        info!(
            target: LOG_TARGET,
            %batch_id,
            file_count = files.len(),
            immatriculation = ?metadata.immatriculation,
            client = ?metadata.client,
            "uploading batch"
        );

        let outcome = self
            .file_list
            .mutate_then_relist(self.gateway.as_ref(), |gateway| {
                gateway.upload_batch(&files, &metadata)
            });

        let mut state = recover_lock(&self.state);
        if state.epoch != epoch {
            debug!(target: LOG_TARGET, %batch_id, "discarding superseded upload result");
            return Ok(state.snapshot());
        }
        state.phase = IngestionPhase::Idle;
        state.clear_pending();
        match outcome {
            Ok(result) => {
                if result.error_count > 0 {
                    warn!(
                        target: LOG_TARGET,
                        %batch_id,
                        success_count = result.success_count,
                        error_count = result.error_count,
                        "batch partially failed"
                    );
                } else {
                    info!(target: LOG_TARGET, %batch_id, success_count = result.success_count, "batch uploaded");
                }
                state.last_result = Some(result);
            }
            Err(err) => {
                error!(target: LOG_TARGET, %batch_id, error = %err, "batch upload failed");
                state.last_error = Some(err.to_string());
            }
        }
        Ok(state.snapshot())
    }

    /// 单文件上传，不经过确认流程，同样在结束后重新拉取列表。
    pub fn upload_single(
        &self,
        file: FileHandle,
        immatriculation: Option<String>,
        client: Option<String>,
    ) -> Result<RemoteFileRecord> {
        let mut metadata = UploadMetadata::default();
        metadata.apply_edits(immatriculation, client)?;
        info!(target: LOG_TARGET, name = %file.name, size = file.size, "uploading single file");
        self.file_list
            .mutate_then_relist(self.gateway.as_ref(), |gateway| {
                gateway.upload_file(&file, &metadata)
            })
    }

    /// 更新过滤条件并重新拉取列表。
    pub fn refresh_files(&self, filter: FileListFilter) -> Result<FileListSnapshot> {
        self.file_list.set_filter(filter);
        self.file_list.refresh(self.gateway.as_ref())
    }

    /// 删除远端文件。失败时不从本地列表移除，列表仍以重新拉取的结果为准。
    pub fn delete_file(&self, file_id: &str) -> Result<FileListSnapshot> {
        info!(target: LOG_TARGET, file_id, "deleting file");
        self.file_list
            .mutate_then_relist(self.gateway.as_ref(), |gateway| gateway.delete_file(file_id))?;
        Ok(self.file_list.snapshot())
    }
}
