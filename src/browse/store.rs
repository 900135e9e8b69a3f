use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use std::thread;

use rand::seq::SliceRandom;
use thiserror::Error;
use tracing::debug;

use super::{contains_all_tokens, is_audio, is_hidden_name, walk, Item};
use crate::catalog::TagRecord;

/// Capability handed to the store for annotating directory listings with
/// tag records, so the store never talks to the catalog directly.
pub type TagLookup = Arc<dyn Fn(&Path) -> Vec<TagRecord> + Send + Sync>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("item store has shut down")]
    Closed,
}

pub(crate) enum StoreCommand {
    ListDir { reply: Sender<Result<usize, StoreError>> },
    ChangeDir { name: String, reply: Sender<Result<usize, StoreError>> },
    ChangeToParent { reply: Sender<Result<usize, StoreError>> },
    ChangeRoot { root: PathBuf, reply: Sender<Result<usize, StoreError>> },
    Clear { reply: Sender<()> },
    Replace { items: Vec<Item>, reply: Sender<()> },
    StartWalk { start: PathBuf, query: String, reply: Sender<()> },
    Push { generation: u64, item: Item },
    Search { query: String, reply: Sender<usize> },
    NextMatch { from: usize, reply: Sender<Option<usize>> },
    PrevMatch { from: usize, reply: Sender<Option<usize>> },
    RandomAudio { reply: Sender<Option<usize>> },
}

/// State published by the actor for the render path. Only the actor thread
/// ever writes it.
struct SharedView {
    snapshot: RwLock<Arc<Vec<Item>>>,
    dir: RwLock<PathBuf>,
    root: RwLock<PathBuf>,
}

/// Handle to the item list actor.
///
/// The list itself lives on a dedicated thread; every mutation is a
/// message, so append order always equals discovery order and nothing else
/// ever writes the list. Synchronous operations are request/reply
/// round-trips that block the caller only for the length of one actor turn.
#[derive(Clone)]
pub struct ItemStore {
    tx: Sender<StoreCommand>,
    shared: Arc<SharedView>,
}

impl ItemStore {
    pub fn spawn(root: PathBuf, tag_lookup: TagLookup) -> Self {
        let (tx, rx) = mpsc::channel();
        let shared = Arc::new(SharedView {
            snapshot: RwLock::new(Arc::new(Vec::new())),
            dir: RwLock::new(root.clone()),
            root: RwLock::new(root.clone()),
        });
        let actor = Actor {
            dir: root.clone(),
            root,
            items: Arc::new(Vec::new()),
            matching: Vec::new(),
            generation: 0,
            tag_lookup,
            shared: Arc::clone(&shared),
            tx: tx.clone(),
        };
        thread::spawn(move || actor.run(rx));
        ItemStore { tx, shared }
    }

    fn request<T>(&self, build: impl FnOnce(Sender<T>) -> StoreCommand) -> Result<T, StoreError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx.send(build(reply_tx)).map_err(|_| StoreError::Closed)?;
        reply_rx.recv().map_err(|_| StoreError::Closed)
    }

    /// Re-list the current directory, replacing the list wholesale.
    pub fn list_dir(&self) -> Result<usize, StoreError> {
        self.request(|reply| StoreCommand::ListDir { reply })?
    }

    /// Descend into `name` (relative to the current directory) and re-list.
    pub fn change_dir(&self, name: &str) -> Result<usize, StoreError> {
        let name = name.to_string();
        self.request(|reply| StoreCommand::ChangeDir { name, reply })?
    }

    /// Ascend to the parent directory (never above the root) and re-list.
    pub fn change_to_parent(&self) -> Result<usize, StoreError> {
        self.request(|reply| StoreCommand::ChangeToParent { reply })?
    }

    /// Re-root the browser, e.g. after the first-run prompt.
    pub fn change_root(&self, root: PathBuf) -> Result<usize, StoreError> {
        self.request(|reply| StoreCommand::ChangeRoot { root, reply })?
    }

    /// Empty the list. Bumps the walk generation, so any walk still running
    /// against the old contents gets its late arrivals discarded.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.request(|reply| StoreCommand::Clear { reply })
    }

    /// Replace the list wholesale (catalog-populated windows).
    pub fn replace(&self, items: Vec<Item>) -> Result<(), StoreError> {
        self.request(|reply| StoreCommand::Replace { items, reply })
    }

    /// Clear the list and start a streaming recursive search from `start`.
    /// Results append in discovery order while the walk runs; the walk
    /// itself is never cancelled.
    pub fn start_walk(&self, start: PathBuf, query: String) -> Result<(), StoreError> {
        self.request(|reply| StoreCommand::StartWalk { start, query, reply })
    }

    /// Recompute the local-search match indices over the current snapshot.
    /// Returns the number of matches. An empty query matches every item
    /// (vacuous AND over zero tokens).
    pub fn search(&self, query: &str) -> Result<usize, StoreError> {
        let query = query.to_string();
        self.request(|reply| StoreCommand::Search { query, reply })
    }

    /// First recorded match index strictly after `from`, wrapping to the
    /// first match; `None` when there are no matches.
    pub fn next_match(&self, from: usize) -> Result<Option<usize>, StoreError> {
        self.request(|reply| StoreCommand::NextMatch { from, reply })
    }

    /// Last recorded match index strictly before `from`, wrapping to the
    /// last match; `None` when there are no matches.
    pub fn prev_match(&self, from: usize) -> Result<Option<usize>, StoreError> {
        self.request(|reply| StoreCommand::PrevMatch { from, reply })
    }

    /// Uniformly sampled index of a non-directory item, if any exist.
    pub fn random_audio_index(&self) -> Result<Option<usize>, StoreError> {
        self.request(|reply| StoreCommand::RandomAudio { reply })
    }

    /// The most recently published list contents. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<Vec<Item>> {
        Arc::clone(&read(&self.shared.snapshot))
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn current_dir(&self) -> PathBuf {
        read(&self.shared.dir).clone()
    }

    pub fn root(&self) -> PathBuf {
        read(&self.shared.root).clone()
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

struct Actor {
    root: PathBuf,
    dir: PathBuf,
    items: Arc<Vec<Item>>,
    matching: Vec<usize>,
    generation: u64,
    tag_lookup: TagLookup,
    shared: Arc<SharedView>,
    tx: Sender<StoreCommand>,
}

impl Actor {
    fn run(mut self, rx: Receiver<StoreCommand>) {
        while let Ok(cmd) = rx.recv() {
            self.handle(cmd);
        }
        debug!("item store actor stopped");
    }

    fn handle(&mut self, cmd: StoreCommand) {
        match cmd {
            StoreCommand::ListDir { reply } => {
                let _ = reply.send(self.list_dir());
            }
            StoreCommand::ChangeDir { name, reply } => {
                self.dir = self.dir.join(name);
                let _ = reply.send(self.list_dir());
            }
            StoreCommand::ChangeToParent { reply } => {
                if self.dir != self.root {
                    if let Some(parent) = self.dir.parent() {
                        self.dir = parent.to_path_buf();
                    }
                }
                let _ = reply.send(self.list_dir());
            }
            StoreCommand::ChangeRoot { root, reply } => {
                self.dir = root.clone();
                self.root = root;
                let _ = reply.send(self.list_dir());
            }
            StoreCommand::Clear { reply } => {
                self.reset(Vec::new());
                let _ = reply.send(());
            }
            StoreCommand::Replace { items, reply } => {
                self.reset(items);
                let _ = reply.send(());
            }
            StoreCommand::StartWalk { start, query, reply } => {
                self.reset(Vec::new());
                let tags = (self.tag_lookup)(&start);
                walk::spawn(start, query, self.generation, tags, self.tx.clone());
                let _ = reply.send(());
            }
            StoreCommand::Push { generation, item } => {
                if generation == self.generation {
                    // Copy-on-write append: this only clones the backing
                    // vector when a reader still holds the snapshot.
                    Arc::make_mut(&mut self.items).push(item);
                    self.publish();
                } else {
                    debug!(generation, current = self.generation, "dropping stale walk item");
                }
            }
            StoreCommand::Search { query, reply } => {
                let _ = reply.send(self.search(&query));
            }
            StoreCommand::NextMatch { from, reply } => {
                let _ = reply.send(self.next_match(from));
            }
            StoreCommand::PrevMatch { from, reply } => {
                let _ = reply.send(self.prev_match(from));
            }
            StoreCommand::RandomAudio { reply } => {
                let _ = reply.send(self.random_audio());
            }
        }
    }

    fn reset(&mut self, items: Vec<Item>) {
        self.generation += 1;
        self.matching.clear();
        self.items = Arc::new(items);
        self.publish();
    }

    fn publish(&self) {
        *write(&self.shared.snapshot) = Arc::clone(&self.items);
        *write(&self.shared.dir) = self.dir.clone();
        *write(&self.shared.root) = self.root.clone();
    }

    fn list_dir(&mut self) -> Result<usize, StoreError> {
        let listed = self.read_entries();
        let mut items = match listed {
            Ok(items) => items,
            Err(source) => {
                // An unreadable directory leaves an empty list behind; the
                // caller surfaces the message inline.
                self.reset(Vec::new());
                return Err(StoreError::Read { path: self.dir.clone(), source });
            }
        };
        if self.dir != self.root {
            items.insert(0, Item::parent_entry());
        }
        let len = items.len();
        self.reset(items);
        Ok(len)
    }

    /// Non-hidden subdirectories first, then audio files, each group in
    /// name order so repeated listings of an unchanged directory are
    /// identical. Files pick up the tag records whose stored path contains
    /// the file's name.
    fn read_entries(&self) -> io::Result<Vec<Item>> {
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_hidden_name(&name) {
                continue;
            }
            let path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                dirs.push(path);
            } else if is_audio(&path) {
                files.push(path);
            }
        }
        dirs.sort();
        files.sort();

        let dir_tags = (self.tag_lookup)(&self.dir);
        let mut items = Vec::with_capacity(dirs.len() + files.len());
        items.extend(dirs.into_iter().map(|path| Item::Entry {
            path,
            is_dir: true,
            tags: Vec::new(),
        }));
        for path in files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let tags = dir_tags
                .iter()
                .filter(|t| t.file_path.to_string_lossy().contains(&name))
                .cloned()
                .collect();
            items.push(Item::Entry { path, is_dir: false, tags });
        }
        Ok(items)
    }

    fn search(&mut self, query: &str) -> usize {
        self.matching = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| contains_all_tokens(&item.name(), query))
            .map(|(i, _)| i)
            .collect();
        self.matching.len()
    }

    fn next_match(&self, from: usize) -> Option<usize> {
        if self.matching.is_empty() {
            return None;
        }
        self.matching
            .iter()
            .copied()
            .find(|&i| i > from)
            .or_else(|| self.matching.first().copied())
    }

    fn prev_match(&self, from: usize) -> Option<usize> {
        if self.matching.is_empty() {
            return None;
        }
        self.matching
            .iter()
            .rev()
            .copied()
            .find(|&i| i < from)
            .or_else(|| self.matching.last().copied())
    }

    fn random_audio(&self) -> Option<usize> {
        let candidates: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.is_dir())
            .map(|(i, _)| i)
            .collect();
        candidates.choose(&mut rand::thread_rng()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_tags() -> TagLookup {
        Arc::new(|_: &Path| Vec::new())
    }

    fn names(store: &ItemStore) -> Vec<String> {
        store.snapshot().iter().map(|i| i.name()).collect()
    }

    #[test]
    fn stale_generation_pushes_are_discarded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ItemStore::spawn(dir.path().to_path_buf(), no_tags());
        store.clear().expect("clear");

        // A push stamped with the pre-clear generation must not land.
        store
            .tx
            .send(StoreCommand::Push {
                generation: 0,
                item: Item::Entry {
                    path: PathBuf::from("/stale.wav"),
                    is_dir: false,
                    tags: Vec::new(),
                },
            })
            .expect("send");
        // Round-trip through the actor so the push has been handled.
        store.search("").expect("search");
        assert!(store.is_empty());
    }

    #[test]
    fn match_cycling_wraps_both_ways() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ItemStore::spawn(dir.path().to_path_buf(), no_tags());
        let rows = ["kick_a.wav", "snare.wav", "kick_b.wav", "hat.wav"]
            .iter()
            .map(|n| Item::Entry {
                path: PathBuf::from(format!("/s/{n}")),
                is_dir: false,
                tags: Vec::new(),
            })
            .collect();
        store.replace(rows).expect("replace");
        assert_eq!(store.search("kick").expect("search"), 2);

        // Forward visits 0 and 2 once per lap.
        assert_eq!(store.next_match(0).expect("next"), Some(2));
        assert_eq!(store.next_match(2).expect("next"), Some(0));
        // Backward wraps to the last recorded index.
        assert_eq!(store.prev_match(0).expect("prev"), Some(2));
        assert_eq!(store.prev_match(2).expect("prev"), Some(0));
    }

    #[test]
    fn no_matches_yields_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ItemStore::spawn(dir.path().to_path_buf(), no_tags());
        store.replace(Vec::new()).expect("replace");
        store.search("anything").expect("search");
        assert_eq!(store.next_match(0).expect("next"), None);
        assert_eq!(store.prev_match(0).expect("prev"), None);
    }

    #[test]
    fn empty_query_matches_all_items() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ItemStore::spawn(dir.path().to_path_buf(), no_tags());
        let rows = (0..3)
            .map(|i| Item::Entry {
                path: PathBuf::from(format!("/s/{i}.wav")),
                is_dir: false,
                tags: Vec::new(),
            })
            .collect();
        store.replace(rows).expect("replace");
        assert_eq!(store.search("").expect("search"), 3);
    }

    #[test]
    fn unreadable_directory_leaves_an_empty_list() {
        let store = ItemStore::spawn(PathBuf::from("/definitely/not/here"), no_tags());
        let err = store.list_dir().expect_err("listing should fail");
        assert!(matches!(err, StoreError::Read { .. }));
        assert!(store.is_empty());
        let _ = names(&store);
    }
}
