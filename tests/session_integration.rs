use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use cratedig::app::keys::KeyConfig;
use cratedig::app::window::WindowState;
use cratedig::app::{Session, WindowName};
use cratedig::browse::store::TagLookup;
use cratedig::browse::ItemStore;
use cratedig::catalog::{Catalog, MemoryCatalog};

fn key(ch: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE)
}

fn enter() -> KeyEvent {
    KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)
}

fn type_text(session: &mut Session, text: &str) {
    for ch in text.chars() {
        session.handle_key(key(ch));
    }
}

fn wait_until(cond: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    cond()
}

struct Fixture {
    _tree: tempfile::TempDir,
    session: Session,
    catalog: Arc<MemoryCatalog>,
}

/// A session over root/{kicks,snares}, one user, one targeted collection.
fn fixture() -> Fixture {
    let tree = tempfile::tempdir().expect("tempdir");
    let root = tree.path();
    fs::create_dir(root.join("kicks")).expect("mkdir");
    fs::create_dir(root.join("snares")).expect("mkdir");
    fs::write(root.join("kicks/808_KICK_long.wav"), b"").expect("fixture");
    fs::write(root.join("kicks/snare_808.wav"), b"").expect("fixture");
    fs::write(root.join("loop_hat.wav"), b"").expect("fixture");

    let catalog = Arc::new(MemoryCatalog::in_memory());
    let user = catalog.resolve_user("digger").expect("user");
    catalog
        .create_collection(user.id, "beats", "first crate")
        .expect("collection");
    let user = catalog.resolve_user("digger").expect("user with target");

    let lookup_catalog = Arc::clone(&catalog);
    let tag_lookup: TagLookup = Arc::new(move |dir: &Path| {
        lookup_catalog.tags_for_directory(dir).unwrap_or_default()
    });
    let store = ItemStore::spawn(root.to_path_buf(), tag_lookup);
    let session = Session::new(
        store,
        Arc::clone(&catalog) as Arc<dyn Catalog>,
        None,
        KeyConfig::default(),
        Some(user),
        true,
    );
    Fixture { _tree: tree, session, catalog }
}

fn names(session: &Session) -> Vec<String> {
    session.store().snapshot().iter().map(|i| i.name()).collect()
}

#[test]
fn home_starts_on_the_directory_listing() {
    let fx = fixture();
    assert_eq!(fx.session.window, WindowName::Home);
    assert_eq!(names(&fx.session), vec!["kicks", "snares", "loop_hat.wav"]);
    assert_eq!(fx.session.cursor, 0);
}

#[test]
fn asking_for_the_same_window_twice_toggles_back_home() {
    let mut fx = fixture();
    fx.session.handle_key(key('F'));
    assert_eq!(fx.session.window, WindowName::FuzzySearchFromRoot);
    assert!(fx.session.store().is_empty());

    fx.session.handle_key(key('F'));
    assert_eq!(fx.session.window, WindowName::Home);
    assert_eq!(names(&fx.session), vec!["kicks", "snares", "loop_hat.wav"]);
    assert!(matches!(fx.session.state, WindowState::Search(ref s) if s.input.is_empty()));
}

#[test]
fn enter_descends_and_dot_dot_ascends() {
    let mut fx = fixture();
    fx.session.handle_key(enter());
    let listed = names(&fx.session);
    assert_eq!(listed[0], "..");
    assert!(listed.contains(&"808_KICK_long.wav".to_string()));
    assert_eq!(fx.session.cursor, 0);

    // Cursor sits on `..`; Enter goes back up.
    fx.session.handle_key(enter());
    assert_eq!(names(&fx.session), vec!["kicks", "snares", "loop_hat.wav"]);
}

#[test]
fn double_g_jumps_to_the_top_and_big_g_to_the_bottom() {
    let mut fx = fixture();
    fx.session.handle_key(key('G'));
    assert_eq!(fx.session.cursor, 2);
    // A single g does nothing on its own.
    fx.session.handle_key(key('g'));
    assert_eq!(fx.session.cursor, 2);
    fx.session.handle_key(key('g'));
    assert_eq!(fx.session.cursor, 0);
}

#[test]
fn interrupted_chord_does_not_fire() {
    let mut fx = fixture();
    fx.session.handle_key(key('G'));
    fx.session.handle_key(key('g'));
    fx.session.handle_key(key('j'));
    fx.session.handle_key(key('g'));
    // g, j, g is not the chord.
    assert_ne!(fx.session.cursor, 0);
}

#[test]
fn target_collection_window_lists_and_selects() {
    let mut fx = fixture();
    let user = fx.catalog.resolve_user("digger").expect("user");
    fx.catalog
        .create_collection(user.id, "field recordings", "")
        .expect("second collection");

    fx.session.handle_key(key('c'));
    assert_eq!(fx.session.window, WindowName::SetTargetCollection);
    let listed = names(&fx.session);
    assert_eq!(listed, vec!["beats", "field recordings"]);

    fx.session.handle_key(key('j'));
    fx.session.handle_key(enter());
    assert_eq!(fx.session.window, WindowName::Home);
    assert_eq!(
        fx.session.target_collection().map(|c| c.name.clone()),
        Some("field recordings".to_string())
    );
    assert_eq!(fx.session.target_subcollection(), "");
}

#[test]
fn quick_tag_tags_the_file_under_the_cursor_once() {
    let mut fx = fixture();
    fx.session.handle_key(key('G'));
    fx.session.handle_key(key('t'));
    fx.session.handle_key(key('t'));
    let collection = fx.session.target_collection().expect("target").clone();
    let tags = fx.catalog.tags_for_collection(collection.id).expect("tags");
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name, "loop_hat.wav");
}

#[test]
fn subcollection_prompt_accepts_a_new_label() {
    let mut fx = fixture();
    fx.session.handle_key(key('D'));
    assert_eq!(fx.session.window, WindowName::SetTargetSubcollection);
    assert!(fx.session.store().is_empty());

    fx.session.handle_key(key('i'));
    type_text(&mut fx.session, "kicks");
    fx.session.handle_key(enter()); // leave writing, re-query with the filter
    fx.session.handle_key(enter()); // nothing listed: commit the typed label
    assert_eq!(fx.session.window, WindowName::Home);
    assert_eq!(fx.session.target_subcollection(), "/kicks");
}

#[test]
fn tag_form_prefills_from_cursor_and_target() {
    let mut fx = fixture();
    // Target a subcollection first.
    fx.session.handle_key(key('D'));
    fx.session.handle_key(key('i'));
    type_text(&mut fx.session, "hats");
    fx.session.handle_key(enter());
    fx.session.handle_key(enter());

    fx.session.handle_key(key('G'));
    fx.session.handle_key(key('T'));
    assert_eq!(fx.session.window, WindowName::NewTag);
    let form = match &fx.session.state {
        WindowState::Form(form) => form.clone(),
        other => panic!("expected a form, got {other:?}"),
    };
    assert_eq!(form.value(0), "loop_hat.wav");
    assert_eq!(form.value(1), "/hats");
    assert!(form.subject.is_some());

    fx.session.handle_key(enter());
    assert_eq!(fx.session.window, WindowName::Home);
    let collection = fx.session.target_collection().expect("target").clone();
    let tags = fx.catalog.tags_for_collection(collection.id).expect("tags");
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].subcollection, "/hats");
}

#[test]
fn new_collection_form_submits_and_becomes_the_target() {
    let mut fx = fixture();
    fx.session.handle_key(key('C'));
    assert_eq!(fx.session.window, WindowName::NewCollection);

    fx.session.handle_key(key('i'));
    type_text(&mut fx.session, "breaks");
    fx.session.handle_key(enter()); // leave writing
    fx.session.handle_key(key('j'));
    fx.session.handle_key(key('i'));
    type_text(&mut fx.session, "chopped loops");
    fx.session.handle_key(enter());
    fx.session.handle_key(enter()); // submit

    assert_eq!(fx.session.window, WindowName::Home);
    assert_eq!(
        fx.session.target_collection().map(|c| c.name.clone()),
        Some("breaks".to_string())
    );
    let user = fx.catalog.resolve_user("digger").expect("user");
    let listed = fx.catalog.list_collections(user.id).expect("collections");
    assert!(listed.iter().any(|c| c.name == "breaks"));
}

#[test]
fn half_filled_forms_do_not_submit() {
    let mut fx = fixture();
    fx.session.handle_key(key('C'));
    fx.session.handle_key(key('i'));
    type_text(&mut fx.session, "only a name");
    fx.session.handle_key(enter());
    fx.session.handle_key(enter()); // description still empty
    assert_eq!(fx.session.window, WindowName::NewCollection);
}

#[test]
fn local_search_commit_jumps_to_the_next_match() {
    let mut fx = fixture();
    fx.session.handle_key(enter()); // into kicks/
    fx.session.handle_key(key('/'));
    type_text(&mut fx.session, "snare");
    fx.session.handle_key(enter());
    // [.., 808_KICK_long.wav, snare_808.wav]
    assert_eq!(fx.session.cursor, 2);
}

#[test]
fn match_cycling_visits_every_match_before_repeating() {
    let mut fx = fixture();
    fx.session.handle_key(enter()); // into kicks/
    fx.session.handle_key(key('/'));
    type_text(&mut fx.session, "808");
    fx.session.handle_key(enter());
    let first = fx.session.cursor;
    fx.session.handle_key(key('n'));
    let second = fx.session.cursor;
    fx.session.handle_key(key('n'));
    assert_eq!(fx.session.cursor, first);
    assert_ne!(first, second);
    fx.session.handle_key(key('p'));
    assert_eq!(fx.session.cursor, second);
}

#[test]
fn fuzzy_search_streams_results_for_the_typed_query() {
    let mut fx = fixture();
    fx.session.handle_key(key('F'));
    fx.session.handle_key(key('i'));
    type_text(&mut fx.session, "808 kick");
    fx.session.handle_key(enter());
    assert!(wait_until(
        || names(&fx.session) == vec!["808_KICK_long.wav".to_string()],
        Duration::from_secs(5)
    ));
    std::thread::sleep(Duration::from_millis(100));
    // AND of tokens: snare_808.wav lacks "kick" and must stay out.
    assert_eq!(names(&fx.session), vec!["808_KICK_long.wav"]);
}

#[test]
fn browse_collection_lists_tag_records() {
    let mut fx = fixture();
    let collection = fx.session.target_collection().expect("target").clone();
    let user = fx.catalog.resolve_user("digger").expect("user");
    fx.catalog
        .create_tag(
            user.id,
            &fx._tree.path().join("kicks/808_KICK_long.wav"),
            collection.id,
            "808 long",
            "kicks",
        )
        .expect("tag");

    fx.session.handle_key(key('b'));
    assert_eq!(fx.session.window, WindowName::BrowseCollection);
    assert_eq!(names(&fx.session), vec!["808 long"]);
    let snapshot = fx.session.store().snapshot();
    assert!(snapshot[0].is_file());
}

#[test]
fn quitting_from_home_only() {
    let mut fx = fixture();
    fx.session.handle_key(key('c'));
    fx.session.handle_key(key('q'));
    assert!(!fx.session.quitting);
    assert_eq!(fx.session.window, WindowName::Home);
    fx.session.handle_key(key('q'));
    assert!(fx.session.quitting);
}

#[test]
fn run_export_window_lists_saved_definitions() {
    let mut fx = fixture();
    let user = fx.catalog.resolve_user("digger").expect("user");
    let out = tempfile::tempdir().expect("outdir");
    fx.catalog
        .create_export(user.id, "usb stick", out.path(), true)
        .expect("export");

    fx.session.handle_key(key('e'));
    assert_eq!(fx.session.window, WindowName::RunExport);
    assert_eq!(names(&fx.session), vec!["usb stick"]);
}

#[test]
fn running_an_export_materializes_the_collection() {
    let mut fx = fixture();
    let user = fx.catalog.resolve_user("digger").expect("user");
    let collection = fx.session.target_collection().expect("target").clone();
    let source = fx._tree.path().join("kicks/808_KICK_long.wav");
    fx.catalog
        .create_tag(user.id, &source, collection.id, "808 long", "kicks")
        .expect("tag");
    let out = tempfile::tempdir().expect("outdir");
    fx.catalog
        .create_export(user.id, "usb stick", out.path(), true)
        .expect("export");

    fx.session.handle_key(key('e'));
    fx.session.handle_key(enter());
    let expected = out
        .path()
        .join("usb stick")
        .join("beats")
        .join("kicks")
        .join("808_KICK_long.wav");
    assert!(expected.exists(), "missing {}", expected.display());
}

#[test]
fn first_run_prompts_walk_user_then_root_then_collection_form() {
    let tree = tempfile::tempdir().expect("tempdir");
    let catalog = Arc::new(MemoryCatalog::in_memory());
    let lookup: TagLookup = Arc::new(|_: &Path| Vec::new());
    let store = ItemStore::spawn(tree.path().to_path_buf(), lookup);
    let mut session = Session::new(
        store,
        Arc::clone(&catalog) as Arc<dyn Catalog>,
        None,
        KeyConfig::default(),
        None,
        false,
    );
    assert_eq!(session.window, WindowName::EnterUsername);

    type_text(&mut session, "digger");
    session.handle_key(enter());
    assert_eq!(session.window, WindowName::EnterRoot);

    type_text(&mut session, &tree.path().display().to_string());
    session.handle_key(enter());
    assert_eq!(session.window, WindowName::NewCollection);
    assert!(catalog.first_user().expect("users").is_some());
}
