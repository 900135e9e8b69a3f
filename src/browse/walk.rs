use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread;

use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

use super::store::StoreCommand;
use super::{contains_all_tokens, is_audio, is_hidden_name, is_sidecar, Item};
use crate::catalog::TagRecord;

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(is_hidden_name)
            .unwrap_or(false)
}

/// Walk `start` on its own thread, streaming every audio file whose name
/// contains all whitespace-separated tokens of `query` into the store as it
/// is found. The walk runs to completion once started; `generation` lets
/// the actor discard arrivals destined for a list that has since been
/// replaced.
pub(crate) fn spawn(
    start: PathBuf,
    query: String,
    generation: u64,
    tags: Vec<TagRecord>,
    tx: Sender<StoreCommand>,
) {
    thread::spawn(move || {
        debug!(start = %start.display(), %query, generation, "fuzzy walk started");
        let mut matches = 0usize;
        for entry in WalkDir::new(&start)
            .into_iter()
            .filter_entry(|e| !is_hidden(e))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    trace!(%err, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            let path = entry.path();
            if is_sidecar(path) || !is_audio(path) {
                continue;
            }
            // Tokens match the file name, not the whole path: a query for
            // "808 kick" must not catch every file under kicks/.
            if !contains_all_tokens(&entry.file_name().to_string_lossy(), &query) {
                continue;
            }
            let matched = tags.iter().filter(|t| t.file_path == path).cloned().collect();
            let item = Item::Entry {
                path: path.to_path_buf(),
                is_dir: false,
                tags: matched,
            };
            if tx.send(StoreCommand::Push { generation, item }).is_err() {
                return;
            }
            matches += 1;
        }
        debug!(matches, "fuzzy walk finished");
    });
}
