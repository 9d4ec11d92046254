use crate::error::{KnowledgeError, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 单次读取目录时返回的最大条目数，与浏览器 `readEntries` 的分页大小一致。
pub const DIRECTORY_PAGE_SIZE: usize = 100;

/// 文件内容的来源：磁盘路径或内存中的字节。
#[derive(Clone)]
pub enum FileSource {
    Disk(PathBuf),
    Memory(Arc<[u8]>),
}

impl fmt::Debug for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileSource::Disk(path) => f.debug_tuple("Disk").field(path).finish(),
            FileSource::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
        }
    }
}

/// 可上传文件的引用，只携带名称、大小与内容来源，不持有打开的句柄。
#[derive(Clone, Debug)]
pub struct FileHandle {
    pub name: String,
    pub size: u64,
    pub source: FileSource,
}

impl FileHandle {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let bytes: Arc<[u8]> = bytes.into();
        FileHandle {
            name: name.into(),
            size: bytes.len() as u64,
            source: FileSource::Memory(bytes),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|e| {
            KnowledgeError::Resolve(format!("failed to read metadata of {path:?}: {e}"))
        })?;
        if !metadata.is_file() {
            return Err(KnowledgeError::Resolve(format!("{path:?} is not a regular file")));
        }
        Ok(FileHandle {
            name: display_name(path),
            size: metadata.len(),
            source: FileSource::Disk(path.to_path_buf()),
        })
    }
}

/// 拖放内容中的文件条目；`materialize` 读取真正的文件信息。
pub trait FileEntry: Send + Sync {
    fn name(&self) -> &str;
    fn materialize(&self) -> Result<FileHandle>;
}

/// 拖放内容中的目录条目。
pub trait DirectoryEntry: Send + Sync {
    fn name(&self) -> &str;
    fn open_reader(&self) -> Result<Box<dyn DirectoryReader>>;
}

/// 分页读取目录子项。返回空页表示已经读完，单次调用不保证返回全部子项。
pub trait DirectoryReader: Send {
    fn read_page(&mut self) -> Result<Vec<DropEntry>>;
}

pub enum DropEntry {
    File(Box<dyn FileEntry>),
    Directory(Box<dyn DirectoryEntry>),
    /// 既不是文件也不是目录（不存在、断开的链接、设备文件等），解析时直接跳过。
    Inaccessible(String),
}

impl DropEntry {
    /// 根据路径类型构造条目；会跟随符号链接，用于用户直接拖入的顶层路径。
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => DropEntry::File(Box::new(FsFileEntry {
                name: display_name(&path),
                path,
            })),
            Ok(metadata) if metadata.is_dir() => {
                DropEntry::Directory(Box::new(FsDirectoryEntry {
                    name: display_name(&path),
                    path,
                }))
            }
            Ok(_) => DropEntry::Inaccessible(format!("{path:?} is neither a file nor a directory")),
            Err(e) => DropEntry::Inaccessible(format!("{path:?}: {e}")),
        }
    }

    /// 目录子项：指向目录的符号链接不展开，否则可能绕回祖先目录无限递归。
    fn from_dir_entry(entry: &fs::DirEntry) -> Self {
        let path = entry.path();
        let is_link = entry
            .file_type()
            .map(|kind| kind.is_symlink())
            .unwrap_or(false);
        if is_link && path.is_dir() {
            return DropEntry::Inaccessible(format!(
                "{path:?} links to a directory and is not followed"
            ));
        }
        DropEntry::from_path(path)
    }
}

impl fmt::Debug for DropEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropEntry::File(file) => f.debug_tuple("File").field(&file.name()).finish(),
            DropEntry::Directory(dir) => f.debug_tuple("Directory").field(&dir.name()).finish(),
            DropEntry::Inaccessible(reason) => f.debug_tuple("Inaccessible").field(reason).finish(),
        }
    }
}

/// 一次拖放或选择操作的原始内容，只在一次解析期间存在。
#[derive(Debug, Default)]
pub struct DropPayload {
    entries: Vec<DropEntry>,
}

impl DropPayload {
    pub fn new(entries: Vec<DropEntry>) -> Self {
        DropPayload { entries }
    }

    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        DropPayload {
            entries: paths.into_iter().map(DropEntry::from_path).collect(),
        }
    }

    pub fn entries(&self) -> &[DropEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct FsFileEntry {
    name: String,
    path: PathBuf,
}

impl FileEntry for FsFileEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn materialize(&self) -> Result<FileHandle> {
        FileHandle::from_path(&self.path)
    }
}

struct FsDirectoryEntry {
    name: String,
    path: PathBuf,
}

impl DirectoryEntry for FsDirectoryEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn open_reader(&self) -> Result<Box<dyn DirectoryReader>> {
        let read_dir = fs::read_dir(&self.path).map_err(|e| {
            KnowledgeError::Resolve(format!("failed to open directory {:?}: {e}", self.path))
        })?;
        Ok(Box::new(FsDirectoryReader {
            path: self.path.clone(),
            inner: Some(read_dir),
        }))
    }
}

struct FsDirectoryReader {
    path: PathBuf,
    inner: Option<fs::ReadDir>,
}

impl DirectoryReader for FsDirectoryReader {
    fn read_page(&mut self) -> Result<Vec<DropEntry>> {
        let Some(iter) = self.inner.as_mut() else {
            return Ok(Vec::new());
        };
        let mut page = Vec::with_capacity(DIRECTORY_PAGE_SIZE);
        while page.len() < DIRECTORY_PAGE_SIZE {
            match iter.next() {
                Some(Ok(dir_entry)) => page.push(DropEntry::from_dir_entry(&dir_entry)),
                Some(Err(e)) => {
                    return Err(KnowledgeError::Resolve(format!(
                        "failed to read directory {:?}: {e}",
                        self.path
                    )))
                }
                None => {
                    self.inner = None;
                    break;
                }
            }
        }
        Ok(page)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
