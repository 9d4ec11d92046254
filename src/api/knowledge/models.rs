/// 知识库中单个文件的索引状态。未知取值原样保留在 `Other` 中。
#[flutter_rust_bridge::frb]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileStatus {
    Completed,
    InProgress,
    Failed,
    Other(String),
}

impl From<String> for FileStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "completed" => FileStatus::Completed,
            "in_progress" => FileStatus::InProgress,
            "failed" => FileStatus::Failed,
            _ => FileStatus::Other(value),
        }
    }
}

/// 服务端返回的文件记录，字段与后端 JSON 对齐，本地不做任何推导或修补。
#[flutter_rust_bridge::frb]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFileRecord {
    pub id: String,
    pub filename: String,
    pub status: FileStatus,
    pub bytes: u64,
    pub created_at: i64,
    pub purpose: String,
    pub immatriculation: Option<String>,
    pub client: Option<String>,
}

/// 列表过滤条件；`None` 表示不限制，而不是匹配空字符串。
#[flutter_rust_bridge::frb]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileListFilter {
    pub immatriculation: Option<String>,
    pub client: Option<String>,
}

impl FileListFilter {
    pub fn new(immatriculation: Option<String>, client: Option<String>) -> Self {
        FileListFilter {
            immatriculation: non_blank(immatriculation),
            client: non_blank(client),
        }
    }
}

/// 随批量上传一起提交的元数据。确认前可编辑，提交后冻结。
#[flutter_rust_bridge::frb]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadMetadata {
    pub immatriculation: Option<String>,
    pub client: Option<String>,
    pub folder_name: Option<String>,
}

#[flutter_rust_bridge::frb]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadErrorEntry {
    pub file_name: String,
    pub error_message: String,
}

/// 批量上传的汇总结果，原样反映服务端报告的成功与失败。
#[flutter_rust_bridge::frb]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchUploadResult {
    pub files: Vec<RemoteFileRecord>,
    pub errors: Vec<UploadErrorEntry>,
    pub success_count: u32,
    pub error_count: u32,
}

#[flutter_rust_bridge::frb]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub success: bool,
    pub file_id: String,
    pub message: String,
}

#[flutter_rust_bridge::frb]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IngestionPhase {
    #[default]
    Idle,
    Resolving,
    AwaitingConfirmation,
    Uploading,
}

#[flutter_rust_bridge::frb]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingFile {
    pub name: String,
    pub size: u64,
}

/// 导入流程的对外快照，供 UI 渲染确认框与结果提示。
#[flutter_rust_bridge::frb]
#[derive(Clone, Debug, Default)]
pub struct IngestionSnapshot {
    pub batch_id: Option<String>,
    pub phase: IngestionPhase,
    pub pending_files: Vec<PendingFile>,
    pub pending_metadata: UploadMetadata,
    /// 目录解析失败、退化为只上传顶层文件时为 true。
    pub used_flat_fallback: bool,
    pub last_result: Option<BatchUploadResult>,
    pub last_error: Option<String>,
}

/// 文件列表缓存的快照；`files` 总是最近一次成功拉取的原样结果，`filter` 是那次拉取使用的条件。
#[flutter_rust_bridge::frb]
#[derive(Clone, Debug, Default)]
pub struct FileListSnapshot {
    pub files: Vec<RemoteFileRecord>,
    pub filter: FileListFilter,
    pub busy: bool,
    pub last_error: Option<String>,
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
