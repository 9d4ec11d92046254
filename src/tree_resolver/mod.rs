pub mod core;
pub mod entry;

pub use self::core::{resolve, resolve_flat, ResolvedBatch};
pub use entry::{
    DirectoryEntry, DirectoryReader, DropEntry, DropPayload, FileEntry, FileHandle, FileSource,
    DIRECTORY_PAGE_SIZE,
};
