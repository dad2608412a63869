//! Incremental workspace scanner.
//!
//! Discovers source files, hashes them, and dispatches new or changed files
//! to every indexer that claims the file's extension. Unchanged files are
//! skipped without a parse; files that vanished from disk are removed from
//! the indexers and the hash store.

use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use shopware_lsp_parser::ParserPool;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::hash_store::{content_hash, HashStore};
use crate::indexer::Indexer;
use crate::tree_cache::TreeCache;
use crate::{IndexError, Result};

/// Directory names that are never worth scanning, relative to the root.
const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "**/node_modules",
    "**/vendor/bin",
    "**/var/cache",
    "**/var/log",
];

type UpdateCallback = Box<dyn Fn() + Send + Sync>;

/// Workspace discovery, hash diffing, and parallel indexer dispatch.
pub struct FileScanner {
    parsers: Arc<ParserPool>,
    hashes: HashStore,
    indexers: RwLock<Vec<Arc<dyn Indexer>>>,
    root: RwLock<Option<PathBuf>>,
    excluded: GlobSet,
    on_update: RwLock<Option<UpdateCallback>>,
    /// Serialises whole scans, which also serialises per-path indexer calls.
    scan_lock: Mutex<()>,
    cancelled: AtomicBool,
    workers: rayon::ThreadPool,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl FileScanner {
    pub fn new(parsers: Arc<ParserPool>, hashes: HashStore) -> Result<Self> {
        Self::with_excluded_dirs(parsers, hashes, &[])
    }

    /// Create a scanner with additional embedder-configured exclusion
    /// patterns (matched against directory paths relative to the root).
    pub fn with_excluded_dirs(
        parsers: Arc<ParserPool>,
        hashes: HashStore,
        extra: &[&str],
    ) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in DEFAULT_EXCLUDED_DIRS.iter().chain(extra) {
            builder.add(Glob::new(pattern)?);
        }

        let workers = rayon::ThreadPoolBuilder::new()
            .num_threads(num_cpus::get())
            .build()
            .map_err(|err| IndexError::Pool(err.to_string()))?;

        Ok(FileScanner {
            parsers,
            hashes,
            indexers: RwLock::new(Vec::new()),
            root: RwLock::new(None),
            excluded: builder.build()?,
            on_update: RwLock::new(None),
            scan_lock: Mutex::new(()),
            cancelled: AtomicBool::new(false),
            workers,
            watcher: Mutex::new(None),
        })
    }

    pub fn add_indexer(&self, indexer: Arc<dyn Indexer>) {
        self.indexers.write().push(indexer);
    }

    pub fn indexers(&self) -> Vec<Arc<dyn Indexer>> {
        self.indexers.read().clone()
    }

    pub fn hashes(&self) -> &HashStore {
        &self.hashes
    }

    pub fn set_root(&self, root: PathBuf) {
        *self.root.write() = Some(root);
    }

    pub fn root(&self) -> Option<PathBuf> {
        self.root.read().clone()
    }

    /// Callback fired after watcher-driven changes have been indexed.
    pub fn set_on_update(&self, callback: UpdateCallback) {
        *self.on_update.write() = Some(callback);
    }

    fn notify_update(&self) {
        if let Some(callback) = self.on_update.read().as_ref() {
            callback();
        }
    }

    /// Stop dispatching further files; the file in flight completes.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Drop all recorded hashes so the next `index_all` rebuilds everything.
    pub fn clear_hashes(&self) -> Result<()> {
        self.hashes.clear()
    }

    /// Full diff scan of the workspace.
    pub fn index_all(&self) -> Result<()> {
        let Some(root) = self.root() else {
            return Ok(());
        };
        let _guard = self.scan_lock.lock();

        let candidates = self.discover(&root);
        tracing::info!("scanning {} candidate files", candidates.len());

        let cache = TreeCache::new();
        self.workers.install(|| {
            candidates.par_iter().for_each(|path| {
                if self.cancelled.load(Ordering::Relaxed) {
                    return;
                }
                if let Err(err) = self.process_file(&cache, path) {
                    tracing::warn!("indexing {} failed: {}", path.display(), err);
                }
            });
        });

        // Files present in the store but gone from disk.
        let candidate_set: HashSet<String> =
            candidates.iter().map(|p| path_key(p)).collect();
        for (key, _) in self.hashes.snapshot() {
            let path = PathBuf::from(&key);
            if path.starts_with(&root) && !candidate_set.contains(&key) && !path.exists() {
                self.remove_path(&path);
            }
        }

        Ok(())
    }

    /// Index an explicit list of files (watched-file events, LSP file
    /// operations).
    pub fn index_files(&self, paths: &[PathBuf]) -> Result<()> {
        let _guard = self.scan_lock.lock();
        let cache = TreeCache::new();
        for path in paths {
            if self.cancelled.load(Ordering::Relaxed) {
                break;
            }
            if let Err(err) = self.process_file(&cache, path) {
                tracing::warn!("indexing {} failed: {}", path.display(), err);
            }
        }
        Ok(())
    }

    /// Remove an explicit list of files from every interested indexer.
    pub fn remove_files(&self, paths: &[PathBuf]) -> Result<()> {
        let _guard = self.scan_lock.lock();
        for path in paths {
            self.remove_path(path);
        }
        Ok(())
    }

    /// Attach to OS file-change notifications under the workspace root.
    ///
    /// Events are translated into `index_files` / `remove_files` calls on a
    /// dedicated thread; the `on_update` callback fires after each batch.
    pub fn start_watcher(self: &Arc<Self>) -> Result<()> {
        let Some(root) = self.root() else {
            return Ok(());
        };

        let (tx, rx) = std::sync::mpsc::channel::<notify::Event>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;
        *self.watcher.lock() = Some(watcher);

        let scanner = Arc::clone(self);
        std::thread::spawn(move || {
            while let Ok(event) = rx.recv() {
                if scanner.cancelled.load(Ordering::Relaxed) {
                    break;
                }

                let relevant: Vec<PathBuf> = event
                    .paths
                    .iter()
                    .filter(|p| scanner.is_relevant_file(p))
                    .cloned()
                    .collect();
                if relevant.is_empty() {
                    continue;
                }

                let result = match event.kind {
                    notify::EventKind::Create(_) | notify::EventKind::Modify(_) => {
                        scanner.index_files(&relevant)
                    }
                    notify::EventKind::Remove(_) => scanner.remove_files(&relevant),
                    _ => continue,
                };
                if let Err(err) = result {
                    tracing::warn!("watcher update failed: {}", err);
                }
                scanner.notify_update();
            }
        });

        Ok(())
    }

    /// Enumerate scannable files under the root, applying the exclusion
    /// rules: hidden directories (root exempt), excluded directory globs,
    /// and extensions no indexer claims.
    pub fn discover(&self, root: &Path) -> Vec<PathBuf> {
        let claimed = self.claimed_extensions();

        WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                !self.is_excluded_dir(root, entry.path())
            })
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                file_extension(path)
                    .map(|ext| claimed.contains(&ext))
                    .unwrap_or(false)
            })
            .collect()
    }

    fn claimed_extensions(&self) -> HashSet<String> {
        self.indexers
            .read()
            .iter()
            .flat_map(|indexer| indexer.extensions().iter().map(|ext| ext.to_string()))
            .collect()
    }

    fn is_excluded_dir(&self, root: &Path, dir: &Path) -> bool {
        if dir
            .file_name()
            .map(|name| name.to_string_lossy().starts_with('.'))
            .unwrap_or(false)
        {
            return true;
        }
        let relative = dir.strip_prefix(root).unwrap_or(dir);
        self.excluded.is_match(relative)
    }

    /// Whether a watcher event path is worth indexing: inside the root,
    /// not under a hidden or excluded directory, extension claimed.
    fn is_relevant_file(&self, path: &Path) -> bool {
        let Some(root) = self.root() else {
            return false;
        };
        let Ok(relative) = path.strip_prefix(&root) else {
            return false;
        };
        for ancestor in relative.ancestors().skip(1) {
            if !ancestor.as_os_str().is_empty() && self.is_excluded_dir(&root, &root.join(ancestor))
            {
                return false;
            }
        }
        let Some(ext) = file_extension(path) else {
            return false;
        };
        self.claimed_extensions().contains(&ext)
    }

    /// Hash → diff → parse once → fan out to interested indexers.
    ///
    /// The hash is recorded when at least the dispatch ran, even if an
    /// indexer failed (a flaky indexer must not loop forever). A parse
    /// failure leaves the file unhashed so the next scan retries it.
    fn process_file(&self, cache: &TreeCache, path: &Path) -> Result<()> {
        let Some(extension) = file_extension(path) else {
            return Ok(());
        };
        let interested: Vec<Arc<dyn Indexer>> = self
            .indexers
            .read()
            .iter()
            .filter(|indexer| indexer.extensions().contains(&extension.as_str()))
            .cloned()
            .collect();
        if interested.is_empty() {
            return Ok(());
        }

        let content = std::fs::read(path)?;
        let hash = content_hash(&content);
        let key = path_key(path);
        if self.hashes.get(&key).as_deref() == Some(hash.as_str()) {
            return Ok(());
        }

        let Some(parsed) = cache.get_or_parse(&self.parsers, path, &extension, &content) else {
            return Err(IndexError::Parse(path.display().to_string()));
        };

        for indexer in interested {
            if let Err(err) = indexer.index_file(path, &parsed.tree, &parsed.content) {
                tracing::warn!(
                    indexer = indexer.id(),
                    "indexing {} failed: {}",
                    path.display(),
                    err
                );
            }
        }

        self.hashes.set(&key, &hash)?;
        Ok(())
    }

    fn remove_path(&self, path: &Path) {
        let extension = file_extension(path);
        for indexer in self.indexers.read().iter() {
            let matches = extension
                .as_deref()
                .map(|ext| indexer.extensions().contains(&ext))
                .unwrap_or(false);
            if !matches {
                continue;
            }
            if let Err(err) = indexer.remove_file(path) {
                tracing::warn!(
                    indexer = indexer.id(),
                    "removing {} failed: {}",
                    path.display(),
                    err
                );
            }
        }
        if let Err(err) = self.hashes.delete(&path_key(path)) {
            tracing::warn!("deleting hash for {} failed: {}", path.display(), err);
        }
    }
}

/// Lowercase extension with leading dot, the scanner's file-type key.
pub fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
