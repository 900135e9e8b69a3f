use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};

use rodio::source::UniformSourceIterator;
use rodio::{Decoder, OutputStream, Sink};
use thiserror::Error;
use tracing::{debug, warn};

use crate::browse::AUDIO_EXTENSIONS;

/// Everything plays at one fixed output format; decoders are resampled
/// into it, never transcoded beyond that.
pub const OUTPUT_SAMPLE_RATE: u32 = 48_000;
pub const OUTPUT_CHANNELS: u16 = 2;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("unsupported audio file: {0}")]
    UnsupportedFile(PathBuf),
    #[error("audio worker has shut down")]
    Closed,
}

/// Out-of-band reports from the worker, surfaced as inline status text.
#[derive(Debug, Clone)]
pub enum PlayerNotice {
    Started(PathBuf),
    Failed { path: PathBuf, reason: String },
    Unavailable(String),
}

enum Request {
    Play { path: PathBuf, intent: u64 },
    Shutdown,
}

/// Monotonic intent generation. Every request gets a fresh value; the
/// worker only plays a request whose value is still the newest at dequeue
/// time, which gives latest-wins single-flight without comparing paths.
#[derive(Debug, Default)]
struct IntentCounter(AtomicU64);

impl IntentCounter {
    fn issue(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, intent: u64) -> bool {
        self.0.load(Ordering::SeqCst) == intent
    }
}

/// Single-flight audio preview engine.
///
/// One worker thread owns the output device and plays at most one file at
/// a time, blocking on the playback-finished notification between
/// requests. The request channel is a rendezvous: `request_play` blocks
/// the caller until the worker is ready to take the hand-off, which is
/// immediate when idle and brief when a play is being cut short.
///
/// The in-flight sink is shared behind a mutex so the requesting side can
/// stop it without racing the worker's wait.
pub struct Player {
    intent: Arc<IntentCounter>,
    slot: Arc<Mutex<Option<Arc<Sink>>>>,
    tx: SyncSender<Request>,
    worker: Option<JoinHandle<()>>,
}

impl Player {
    pub fn spawn(notices: tokio::sync::mpsc::Sender<PlayerNotice>) -> Self {
        let (tx, rx) = mpsc::sync_channel(0);
        let intent = Arc::new(IntentCounter::default());
        let slot: Arc<Mutex<Option<Arc<Sink>>>> = Arc::new(Mutex::new(None));
        let worker = {
            let intent = Arc::clone(&intent);
            let slot = Arc::clone(&slot);
            thread::spawn(move || worker_loop(rx, intent, slot, notices))
        };
        Player {
            intent,
            slot,
            tx,
            worker: Some(worker),
        }
    }

    /// Ask for `path` to be auditioned, superseding whatever is playing or
    /// queued. Among requests issued while the worker is busy only the most
    /// recent is guaranteed to play; earlier ones may be dropped silently.
    pub fn request_play(&self, path: &Path) -> Result<(), PlayerError> {
        if !has_audio_extension(path) {
            return Err(PlayerError::UnsupportedFile(path.to_path_buf()));
        }
        let intent = self.intent.issue();
        self.stop_current();
        self.tx
            .send(Request::Play { path: path.to_path_buf(), intent })
            .map_err(|_| PlayerError::Closed)
    }

    fn stop_current(&self) {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(sink) = slot.as_ref() {
            // The worker's wait observes the emptied queue and finishes.
            sink.stop();
        }
    }

    /// Stop playback, release the device and join the worker.
    pub fn close(&mut self) {
        self.intent.issue();
        self.stop_current();
        let _ = self.tx.send(Request::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("audio worker panicked during shutdown");
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.close();
        }
    }
}

fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.iter().any(|a| e.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

fn worker_loop(
    rx: Receiver<Request>,
    intent: Arc<IntentCounter>,
    slot: Arc<Mutex<Option<Arc<Sink>>>>,
    notices: tokio::sync::mpsc::Sender<PlayerNotice>,
) {
    // The output stream must live on this thread; it is the process-wide
    // device handle and is released when the loop ends.
    let stream = OutputStream::try_default();
    let (stream, handle) = match stream {
        Ok(pair) => pair,
        Err(err) => {
            warn!(%err, "no audio output device, draining requests");
            let _ = notices.try_send(PlayerNotice::Unavailable(err.to_string()));
            // Keep receiving so request_play never wedges the UI.
            while let Ok(request) = rx.recv() {
                if matches!(request, Request::Shutdown) {
                    return;
                }
            }
            return;
        }
    };

    while let Ok(request) = rx.recv() {
        let (path, request_intent) = match request {
            Request::Play { path, intent } => (path, intent),
            Request::Shutdown => break,
        };
        if !intent.is_current(request_intent) {
            // Superseded while queued; latest wins.
            debug!(path = %path.display(), "dropping superseded play request");
            continue;
        }
        let sink = match open_sink(&handle, &path) {
            Ok(sink) => Arc::new(sink),
            Err(reason) => {
                warn!(path = %path.display(), %reason, "preview failed");
                let _ = notices.try_send(PlayerNotice::Failed { path, reason });
                continue;
            }
        };
        debug!(path = %path.display(), "preview started");
        let _ = notices.try_send(PlayerNotice::Started(path.clone()));
        *slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&sink));
        if !intent.is_current(request_intent) {
            // A newer request arrived while we were opening the file.
            sink.stop();
        }
        sink.sleep_until_end();
        *slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
    drop(stream);
    debug!("audio worker stopped");
}

fn open_sink(handle: &rodio::OutputStreamHandle, path: &Path) -> Result<Sink, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    let decoder = Decoder::new(BufReader::new(file)).map_err(|e| e.to_string())?;
    // Resample whatever the container holds into the fixed output format.
    let source =
        UniformSourceIterator::<_, i16>::new(decoder, OUTPUT_CHANNELS, OUTPUT_SAMPLE_RATE);
    let sink = Sink::try_new(handle).map_err(|e| e.to_string())?;
    sink.append(source);
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_latest_intent_survives() {
        let counter = IntentCounter::default();
        let issued: Vec<u64> = (0..5).map(|_| counter.issue()).collect();
        let current: Vec<&u64> = issued.iter().filter(|&&i| counter.is_current(i)).collect();
        // Of N requests issued while busy, exactly the final one passes the
        // dequeue check; the rest are fair game to drop.
        assert_eq!(current, vec![issued.last().expect("issued")]);
    }

    #[test]
    fn intents_are_monotonic() {
        let counter = IntentCounter::default();
        let a = counter.issue();
        let b = counter.issue();
        assert!(b > a);
        assert!(!counter.is_current(a));
        assert!(counter.is_current(b));
    }

    #[test]
    fn extension_gate_matches_the_browser() {
        assert!(has_audio_extension(Path::new("/s/kick.wav")));
        assert!(has_audio_extension(Path::new("/s/kick.FLAC")));
        assert!(!has_audio_extension(Path::new("/s/kick.wav.asd")));
        assert!(!has_audio_extension(Path::new("/s/readme")));
    }
}
