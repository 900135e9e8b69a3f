use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cratedig::app::cli::Args;
use cratedig::app::config::{self, AppConfig};
use cratedig::app::{watch, AppEvent, Session};
use cratedig::audio::{Player, PlayerNotice};
use cratedig::browse::store::TagLookup;
use cratedig::browse::ItemStore;
use cratedig::catalog::{Catalog, MemoryCatalog, User};
use cratedig::ui;

const LOCK_FILE_PATH: &str = "/tmp/cratedig_audio.lock";

/// Try to acquire the audio lock.
/// Returns Some(File) if we acquired the lock (and thus should open the
/// output device). Returns None if another live instance holds it, in
/// which case this process runs UI-only.
fn try_acquire_audio_lock() -> Option<File> {
    if let Ok(mut file) = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(LOCK_FILE_PATH)
    {
        let mut pid_str = String::new();
        if file.read_to_string(&mut pid_str).is_ok() {
            if let Ok(pid) = pid_str.trim().parse::<i32>() {
                // kill(pid, 0) checks existence without sending a signal
                unsafe {
                    if libc::kill(pid, 0) == 0 {
                        return None;
                    }
                }
            }
        }
    }

    if let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(LOCK_FILE_PATH)
    {
        let pid = std::process::id();
        let _ = write!(file, "{pid}");
        return Some(file);
    }

    None
}

/// Root precedence: `--root` flag, then config.toml, then the user row.
/// A flag that disagrees with the saved root is a temporary override and
/// is not persisted.
fn resolve_root(
    flag_root: Option<PathBuf>,
    user: &mut Option<User>,
    catalog: &Arc<dyn Catalog>,
) -> Result<Option<PathBuf>> {
    let saved_root = user.as_ref().and_then(|u| u.root.clone());
    match (flag_root, saved_root) {
        (None, None) => Ok(None),
        (None, Some(saved)) => Ok(Some(saved)),
        (Some(flag), None) => {
            if let Some(user) = user.as_mut() {
                catalog
                    .set_root(user.id, &flag)
                    .context("persist root directory")?;
                user.root = Some(flag.clone());
            }
            Ok(Some(flag))
        }
        (Some(flag), Some(saved)) => {
            if flag != saved {
                info!(root = %flag.display(), "launched with temporary root");
            }
            Ok(Some(flag))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    human_panic::setup_panic!();
    let args = Args::parse();
    let data_dir = AppConfig::data_dir(&args.data);
    let log_path = data_dir.join(&args.log);

    if args.watch {
        return watch::run(&log_path, 40).await;
    }

    // All logging goes to a file in the data dir; the terminal is the UI.
    let file_appender = tracing_appender::rolling::never(&data_dir, &args.log);
    let (writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    info!(version = env!("CARGO_PKG_VERSION"), "starting");

    let config = AppConfig::load(&data_dir);
    let catalog: Arc<dyn Catalog> = Arc::new(
        MemoryCatalog::open(&data_dir.join(&args.db)).context("open catalog snapshot")?,
    );

    // Find-or-create the launch user; with no name anywhere, fall back to
    // the first known user or the first-run prompts.
    let user_name = args.user.clone().or_else(|| config.user.clone());
    let mut user: Option<User> = match &user_name {
        Some(name) => Some(catalog.resolve_user(name).context("resolve user")?),
        None => catalog.first_user().context("read users")?,
    };

    let flag_root = args
        .root
        .as_deref()
        .map(config::expand_home)
        .or_else(|| config.root.clone());
    let root = resolve_root(flag_root, &mut user, &catalog)?;

    let initial_root = root
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let tag_catalog = Arc::clone(&catalog);
    let tag_lookup: TagLookup = Arc::new(move |dir: &Path| {
        tag_catalog.tags_for_directory(dir).unwrap_or_else(|err| {
            warn!(%err, "tag lookup failed");
            Vec::new()
        })
    });
    let store = ItemStore::spawn(initial_root, tag_lookup);

    // SINGLETON CHECK: only open the output device if we hold the lock.
    let (notice_tx, mut notice_rx) = mpsc::channel::<PlayerNotice>(16);
    let audio_lock = try_acquire_audio_lock();
    let player = if audio_lock.is_some() {
        Some(Player::spawn(notice_tx))
    } else {
        None
    };

    let mut session = Session::new(
        store,
        Arc::clone(&catalog),
        player,
        config.keys.clone(),
        user,
        root.is_some(),
    );
    if audio_lock.is_none() {
        session.show_toast("another instance owns the audio device (UI only)");
    }

    let (tx, mut rx) = mpsc::channel::<AppEvent>(100);

    // 1. Input events
    let tx_input = tx.clone();
    tokio::spawn(async move {
        let mut reader = EventStream::new();
        while let Some(Ok(event)) = reader.next().await {
            if tx_input.send(AppEvent::Input(event)).await.is_err() {
                break;
            }
        }
    });

    // 2. Player notices
    let tx_notice = tx.clone();
    tokio::spawn(async move {
        while let Some(notice) = notice_rx.recv().await {
            if tx_notice.send(AppEvent::Player(notice)).await.is_err() {
                break;
            }
        }
    });

    // 3. Redraw tick, so streaming walk results show up while nothing
    //    else is happening.
    let tx_tick = tx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(50));
        loop {
            interval.tick().await;
            if tx_tick.send(AppEvent::Tick).await.is_err() {
                break;
            }
        }
    });

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    loop {
        terminal.draw(|f| ui::draw(f, &session))?;
        match rx.recv().await {
            Some(AppEvent::Input(Event::Key(key))) => {
                if key.kind == KeyEventKind::Press {
                    session.handle_key(key);
                }
            }
            Some(AppEvent::Input(_)) => {}
            Some(AppEvent::Player(notice)) => session.handle_notice(notice),
            Some(AppEvent::Tick) => {}
            None => break,
        }
        if session.quitting {
            break;
        }
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    session.shutdown();
    info!("session closed");
    Ok(())
}
