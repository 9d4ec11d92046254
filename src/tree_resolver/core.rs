use super::entry::{DirectoryEntry, DropEntry, DropPayload, FileHandle};
use crate::error::{KnowledgeError, Result};
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

const LOG_TARGET: &str = "kb_ingest::resolver";

/// 一次解析的结果：按发现顺序排列的文件，以及推断出的文件夹名称。
#[derive(Clone, Debug, Default)]
pub struct ResolvedBatch {
    pub files: Vec<FileHandle>,
    pub inferred_folder_name: Option<String>,
}

impl ResolvedBatch {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// 将拖放内容递归展开为扁平的文件列表。
///
/// - 顶层条目按顺序处理；第一个贡献了文件的顶层目录名称作为 `inferred_folder_name`。
/// - 目录子项分页读取，直到读到空页为止。
/// - 子目录在有界线程池中并行展开，结果按启动顺序拼接。
/// - 任意子树读取失败都会让整个解析失败，由调用方决定是否退化为 [`resolve_flat`]。
pub fn resolve(payload: &DropPayload) -> Result<ResolvedBatch> {
    let mut batch = ResolvedBatch::default();
    for entry in payload.entries() {
        match entry {
            DropEntry::File(file) => batch.files.push(file.materialize()?),
            DropEntry::Directory(dir) => {
                let nested = resolve_directory(dir.as_ref())?;
                if batch.inferred_folder_name.is_none() && !nested.is_empty() {
                    batch.inferred_folder_name = Some(dir.name().to_string());
                }
                batch.files.extend(nested);
            }
            DropEntry::Inaccessible(reason) => {
                debug!(target: LOG_TARGET, %reason, "skipping inaccessible entry");
            }
        }
    }
    debug!(
        target: LOG_TARGET,
        file_count = batch.files.len(),
        folder = ?batch.inferred_folder_name,
        "drop payload resolved"
    );
    Ok(batch)
}

/// 退化模式：只取顶层文件，不进入目录，也不推断文件夹名称。
/// 单个文件读取失败只记录日志并跳过。
pub fn resolve_flat(payload: &DropPayload) -> ResolvedBatch {
    let files = payload
        .entries()
        .iter()
        .filter_map(|entry| match entry {
            DropEntry::File(file) => match file.materialize() {
                Ok(handle) => Some(handle),
                Err(err) => {
                    warn!(target: LOG_TARGET, name = file.name(), error = %err, "skipping unreadable file");
                    None
                }
            },
            _ => None,
        })
        .collect();
    ResolvedBatch {
        files,
        inferred_folder_name: None,
    }
}

fn read_all_children(dir: &dyn DirectoryEntry) -> Result<Vec<DropEntry>> {
    let mut reader = dir.open_reader()?;
    let mut children = Vec::new();
    loop {
        let page = reader.read_page()?;
        if page.is_empty() {
            break;
        }
        children.extend(page);
    }
    Ok(children)
}

/// 展开单个目录。子目录交给 rayon 线程池并行处理，活动线程数受池大小约束；
/// `collect` 保持启动顺序。
fn resolve_directory(dir: &dyn DirectoryEntry) -> Result<Vec<FileHandle>> {
    let children = read_all_children(dir)?;
    let expand = || -> Vec<Result<Vec<FileHandle>>> {
        children
            .par_iter()
            .map(|child| match child {
                DropEntry::File(file) => file.materialize().map(|h| vec![h]),
                DropEntry::Directory(sub) => resolve_directory(sub.as_ref()),
                DropEntry::Inaccessible(reason) => {
                    debug!(target: LOG_TARGET, %reason, "skipping inaccessible entry");
                    Ok(Vec::new())
                }
            })
            .collect()
    };
    let results = panic::catch_unwind(AssertUnwindSafe(expand)).map_err(|_| {
        KnowledgeError::Resolve(format!("directory worker for {:?} panicked", dir.name()))
    })?;

    let mut files = Vec::new();
    for result in results {
        files.extend(result?);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree_resolver::entry::{DirectoryReader, FileEntry};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[derive(Clone)]
    enum Node {
        File(&'static str),
        Dir(&'static str, Vec<Node>),
        Broken(&'static str),
    }

    struct FakeFile(&'static str);

    impl FileEntry for FakeFile {
        fn name(&self) -> &str {
            self.0
        }

        fn materialize(&self) -> Result<FileHandle> {
            Ok(FileHandle::from_bytes(self.0, self.0.as_bytes().to_vec()))
        }
    }

    struct FakeDir {
        name: &'static str,
        children: Vec<Node>,
        page_size: usize,
        pages_read: Arc<AtomicUsize>,
        broken: bool,
    }

    impl DirectoryEntry for FakeDir {
        fn name(&self) -> &str {
            self.name
        }

        fn open_reader(&self) -> Result<Box<dyn DirectoryReader>> {
            if self.broken {
                return Err(KnowledgeError::Resolve(format!("{} is unreadable", self.name)));
            }
            Ok(Box::new(FakeReader {
                remaining: self.children.clone(),
                page_size: self.page_size,
                pages_read: self.pages_read.clone(),
            }))
        }
    }

    struct FakeReader {
        remaining: Vec<Node>,
        page_size: usize,
        pages_read: Arc<AtomicUsize>,
    }

    impl DirectoryReader for FakeReader {
        fn read_page(&mut self) -> Result<Vec<DropEntry>> {
            self.pages_read.fetch_add(1, Ordering::SeqCst);
            let take = self.page_size.min(self.remaining.len());
            let page: Vec<Node> = self.remaining.drain(..take).collect();
            Ok(page
                .into_iter()
                .map(|node| to_entry(node, self.page_size, self.pages_read.clone()))
                .collect())
        }
    }

    struct OwnedFile(String);

    impl FileEntry for OwnedFile {
        fn name(&self) -> &str {
            &self.0
        }

        fn materialize(&self) -> Result<FileHandle> {
            Ok(FileHandle::from_bytes(self.0.clone(), vec![1]))
        }
    }

    #[derive(Default)]
    struct Activity {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    /// 按层级生成的目录：`levels` 为 0 时只含一个文件，否则含 `fanout` 个子目录。
    struct GeneratedDir {
        name: String,
        levels: usize,
        fanout: usize,
        activity: Arc<Activity>,
    }

    impl DirectoryEntry for GeneratedDir {
        fn name(&self) -> &str {
            &self.name
        }

        fn open_reader(&self) -> Result<Box<dyn DirectoryReader>> {
            Ok(Box::new(GeneratedReader {
                name: self.name.clone(),
                levels: self.levels,
                fanout: self.fanout,
                activity: self.activity.clone(),
                exhausted: false,
            }))
        }
    }

    struct GeneratedReader {
        name: String,
        levels: usize,
        fanout: usize,
        activity: Arc<Activity>,
        exhausted: bool,
    }

    impl DirectoryReader for GeneratedReader {
        fn read_page(&mut self) -> Result<Vec<DropEntry>> {
            if self.exhausted {
                return Ok(Vec::new());
            }
            self.exhausted = true;

            let now = self.activity.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.activity.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
            self.activity.active.fetch_sub(1, Ordering::SeqCst);

            if self.levels == 0 {
                return Ok(vec![DropEntry::File(Box::new(OwnedFile(format!(
                    "{}.txt",
                    self.name
                ))))]);
            }
            Ok((0..self.fanout)
                .map(|i| {
                    DropEntry::Directory(Box::new(GeneratedDir {
                        name: format!("{}-{i}", self.name),
                        levels: self.levels - 1,
                        fanout: self.fanout,
                        activity: self.activity.clone(),
                    }))
                })
                .collect())
        }
    }

    fn to_entry(node: Node, page_size: usize, pages_read: Arc<AtomicUsize>) -> DropEntry {
        match node {
            Node::File(name) => DropEntry::File(Box::new(FakeFile(name))),
            Node::Dir(name, children) => DropEntry::Directory(Box::new(FakeDir {
                name,
                children,
                page_size,
                pages_read,
                broken: false,
            })),
            Node::Broken(name) => DropEntry::Directory(Box::new(FakeDir {
                name,
                children: Vec::new(),
                page_size,
                pages_read,
                broken: true,
            })),
        }
    }

    fn payload(nodes: Vec<Node>, page_size: usize) -> (DropPayload, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let entries = nodes
            .into_iter()
            .map(|node| to_entry(node, page_size, counter.clone()))
            .collect();
        (DropPayload::new(entries), counter)
    }

    fn names(batch: &ResolvedBatch) -> Vec<&str> {
        batch.files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn folder_scenario_resolves_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("GH-728-KS");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("a.pdf"), b"a").unwrap();
        fs::write(root.join("sub").join("b.pdf"), b"bb").unwrap();

        let batch = resolve(&DropPayload::from_paths([root])).unwrap();
        assert_eq!(batch.files.len(), 2);
        assert_eq!(batch.inferred_folder_name.as_deref(), Some("GH-728-KS"));
        let mut found = names(&batch);
        found.sort();
        assert_eq!(found, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn flattens_every_file_regardless_of_depth() {
        let tree = vec![
            Node::File("top.txt"),
            Node::Dir(
                "outer",
                vec![
                    Node::File("o1"),
                    Node::Dir(
                        "mid",
                        vec![
                            Node::Dir("deep", vec![Node::File("d1"), Node::File("d2")]),
                            Node::File("m1"),
                            Node::Dir("empty", vec![]),
                        ],
                    ),
                    Node::File("o2"),
                ],
            ),
        ];
        let (payload, _) = payload(tree, 2);
        let batch = resolve(&payload).unwrap();
        assert_eq!(batch.files.len(), 6);
        // 按启动顺序拼接，而不是按完成顺序
        assert_eq!(names(&batch), vec!["top.txt", "o1", "d1", "d2", "m1", "o2"]);
    }

    #[test]
    fn reads_pages_until_an_empty_page() {
        let children: Vec<Node> = ["a", "b", "c", "d", "e"].into_iter().map(Node::File).collect();
        let (payload, pages) = payload(vec![Node::Dir("docs", children)], 2);
        let batch = resolve(&payload).unwrap();
        assert_eq!(batch.files.len(), 5);
        // 2 + 2 + 1 + 空页
        assert_eq!(pages.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn first_top_level_directory_wins() {
        let tree = vec![
            Node::Dir("AB-123-CD", vec![Node::Dir("EF-456-GH", vec![Node::File("x")])]),
            Node::Dir("IJ-789-KL", vec![Node::File("y")]),
        ];
        let (payload, _) = payload(tree, 10);
        let batch = resolve(&payload).unwrap();
        assert_eq!(batch.inferred_folder_name.as_deref(), Some("AB-123-CD"));
    }

    #[test]
    fn empty_directory_does_not_claim_folder_name() {
        let tree = vec![
            Node::Dir("empty", vec![]),
            Node::Dir("photos", vec![Node::File("p.jpg")]),
        ];
        let (payload, _) = payload(tree, 10);
        let batch = resolve(&payload).unwrap();
        assert_eq!(batch.files.len(), 1);
        assert_eq!(batch.inferred_folder_name.as_deref(), Some("photos"));
    }

    #[test]
    fn empty_payload_yields_empty_batch() {
        let batch = resolve(&DropPayload::default()).unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.inferred_folder_name, None);
    }

    #[test]
    fn inaccessible_entries_are_dropped_quietly() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real.pdf");
        fs::write(&real, b"ok").unwrap();

        let payload = DropPayload::from_paths([real, dir.path().join("ghost.pdf")]);
        let batch = resolve(&payload).unwrap();
        assert_eq!(names(&batch), vec!["real.pdf"]);
    }

    #[test]
    fn subtree_failure_fails_the_whole_resolution() {
        let tree = vec![
            Node::File("loose.pdf"),
            Node::Dir("outer", vec![Node::File("ok"), Node::Broken("locked")]),
        ];
        let (payload, _) = payload(tree, 10);
        let err = resolve(&payload).unwrap_err();
        assert!(matches!(err, KnowledgeError::Resolve(_)));

        let flat = resolve_flat(&payload);
        assert_eq!(names(&flat), vec!["loose.pdf"]);
        assert_eq!(flat.inferred_folder_name, None);
    }

    #[test]
    fn wide_trees_run_on_a_bounded_pool_in_launch_order() {
        let activity = Arc::new(Activity::default());
        let root = GeneratedDir {
            name: "root".to_string(),
            levels: 2,
            fanout: 24,
            activity: activity.clone(),
        };
        let batch = resolve(&DropPayload::new(vec![DropEntry::Directory(Box::new(root))])).unwrap();

        let expected: Vec<String> = (0..24)
            .flat_map(|i| (0..24).map(move |j| format!("root-{i}-{j}.txt")))
            .collect();
        assert_eq!(names(&batch), expected);
        assert_eq!(batch.inferred_folder_name.as_deref(), Some("root"));

        let peak = activity.peak.load(Ordering::SeqCst);
        assert!(peak >= 1);
        assert!(
            peak <= rayon::current_num_threads(),
            "{peak} directories were read at once"
        );
    }

    #[cfg(unix)]
    #[test]
    fn cyclic_directory_link_resolves_each_file_once() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("GH-728-KS");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("a.pdf"), b"a").unwrap();
        fs::write(root.join("sub").join("b.pdf"), b"b").unwrap();
        symlink(&root, root.join("sub").join("back-to-root")).unwrap();

        let batch = resolve(&DropPayload::from_paths([root])).unwrap();
        let mut found = names(&batch);
        found.sort();
        assert_eq!(found, vec!["a.pdf", "b.pdf"]);
        assert_eq!(batch.inferred_folder_name.as_deref(), Some("GH-728-KS"));
    }
}
