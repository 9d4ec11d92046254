use super::gateway::VectorStoreGateway;
use crate::api::knowledge::models::{FileListFilter, FileListSnapshot, RemoteFileRecord};
use crate::error::Result;
use std::sync::Mutex;
use tracing::{debug, warn};

const LOG_TARGET: &str = "kb_ingest::reconciler";

/// 本地文件列表缓存。
///
/// 列表只会被一次完整的远端拉取整体替换，从不根据上传或删除的响应做局部修补；
/// 并发的拉取以最后落地的结果为准。
#[derive(Default)]
pub struct FileListCache {
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    files: Vec<RemoteFileRecord>,
    /// 产生 `files` 的那次拉取所用的过滤条件。
    listed_filter: FileListFilter,
    /// 下一次拉取要使用的过滤条件。
    filter: FileListFilter,
    in_flight: usize,
    last_error: Option<String>,
}

impl FileListCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> FileListSnapshot {
        let state = recover_lock(&self.state);
        FileListSnapshot {
            files: state.files.clone(),
            filter: state.listed_filter.clone(),
            busy: state.in_flight > 0,
            last_error: state.last_error.clone(),
        }
    }

    pub fn set_filter(&self, filter: FileListFilter) {
        recover_lock(&self.state).filter = filter;
    }

    /// 按当前过滤条件重新拉取列表；成功时整体替换缓存，失败时保留旧列表并记录错误。
    /// 快照中的过滤条件始终是产生该列表的那一个。
    pub fn refresh(&self, gateway: &dyn VectorStoreGateway) -> Result<FileListSnapshot> {
        let _busy = BusyGuard::enter(self);
        self.relist(gateway)?;
        Ok(self.snapshot())
    }

    /// 执行一次变更操作，然后无论成功与否都重新拉取完整列表。
    /// 返回变更操作本身的结果；重新拉取失败只记录在缓存状态中。
    pub fn mutate_then_relist<T, F>(&self, gateway: &dyn VectorStoreGateway, mutation: F) -> Result<T>
    where
        F: FnOnce(&dyn VectorStoreGateway) -> Result<T>,
    {
        let _busy = BusyGuard::enter(self);
        let outcome = mutation(gateway);
        if let Err(err) = self.relist(gateway) {
            warn!(target: LOG_TARGET, error = %err, "re-list after mutation failed");
        }
        outcome
    }

    fn relist(&self, gateway: &dyn VectorStoreGateway) -> Result<()> {
        let filter = recover_lock(&self.state).filter.clone();
        match gateway.list_files(&filter) {
            Ok(files) => {
                debug!(target: LOG_TARGET, file_count = files.len(), "file listing replaced");
                let mut state = recover_lock(&self.state);
                state.files = files;
                state.listed_filter = filter;
                state.last_error = None;
                Ok(())
            }
            Err(err) => {
                recover_lock(&self.state).last_error = Some(err.to_string());
                Err(err)
            }
        }
    }
}

struct BusyGuard<'a> {
    cache: &'a FileListCache,
}

impl<'a> BusyGuard<'a> {
    fn enter(cache: &'a FileListCache) -> Self {
        recover_lock(&cache.state).in_flight += 1;
        BusyGuard { cache }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut state = recover_lock(&self.cache.state);
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

pub(crate) fn recover_lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poison) => poison.into_inner(),
    }
}
