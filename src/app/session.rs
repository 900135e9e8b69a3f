use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info, warn};

use super::keys::KeyConfig;
use super::window::{
    create_export_form, new_collection_form, new_tag_form, Form, PromptState, WindowKind,
    WindowName, WindowState,
};
use crate::audio::{Player, PlayerNotice};
use crate::browse::{Item, ItemStore};
use crate::catalog::{normalize_subcollection, Catalog, CollectionSummary, User};

/// Inline status text with an expiry, the session's only error surface.
#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub deadline: Instant,
}

/// The session controller: owns the active window, routes every keystroke,
/// and drives the item store and the preview engine in response.
pub struct Session {
    pub window: WindowName,
    pub state: WindowState,
    pub cursor: usize,
    pub show_collections: bool,
    pub quitting: bool,
    last_key: Option<KeyEvent>,
    user: Option<User>,
    pub keys: KeyConfig,
    store: ItemStore,
    catalog: Arc<dyn Catalog>,
    player: Option<Player>,
    toast: Option<Toast>,
}

impl Session {
    /// `user` is `None` until the first-run username prompt completes;
    /// `root_known` gates the root prompt the same way.
    pub fn new(
        store: ItemStore,
        catalog: Arc<dyn Catalog>,
        player: Option<Player>,
        keys: KeyConfig,
        user: Option<User>,
        root_known: bool,
    ) -> Self {
        let window = match (&user, root_known) {
            (None, _) => WindowName::EnterUsername,
            (Some(_), false) => WindowName::EnterRoot,
            _ => WindowName::Home,
        };
        let mut session = Session {
            window,
            state: WindowState::for_kind(window.kind()),
            cursor: 0,
            show_collections: false,
            quitting: false,
            last_key: None,
            user,
            keys,
            store,
            catalog,
            player,
            toast: None,
        };
        if window == WindowName::Home {
            session.refresh_listing();
        }
        session
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn target_collection(&self) -> Option<&CollectionSummary> {
        self.user.as_ref().and_then(|u| u.target_collection.as_ref())
    }

    pub fn target_subcollection(&self) -> &str {
        self.user
            .as_ref()
            .map(|u| u.target_subcollection.as_str())
            .unwrap_or("")
    }

    pub fn auto_audition(&self) -> bool {
        self.user.as_ref().map(|u| u.auto_audition).unwrap_or(false)
    }

    pub fn active_toast(&self) -> Option<&str> {
        self.toast
            .as_ref()
            .filter(|t| t.deadline > Instant::now())
            .map(|t| t.message.as_str())
    }

    pub fn show_toast(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast {
            message: message.into(),
            deadline: Instant::now() + Duration::from_secs(3),
        });
    }

    fn report(&mut self, context: &str, err: impl Display) {
        warn!("{context}: {err}");
        self.show_toast(format!("{context}: {err}"));
    }

    pub fn handle_notice(&mut self, notice: PlayerNotice) {
        match notice {
            PlayerNotice::Started(path) => debug!(path = %path.display(), "auditioning"),
            PlayerNotice::Failed { path, reason } => {
                self.show_toast(format!("can't play {}: {reason}", display_name(&path)));
            }
            PlayerNotice::Unavailable(reason) => {
                self.show_toast(format!("audio unavailable: {reason}"));
            }
        }
    }

    /// Stop the preview engine and release the output device.
    pub fn shutdown(&mut self) {
        if let Some(mut player) = self.player.take() {
            player.close();
        }
    }

    // ---------------------------------------------------------------- input

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quitting = true;
            return;
        }
        match self.window.kind() {
            WindowKind::PreSessionPrompt => self.handle_prompt_key(key),
            WindowKind::Form => self.handle_form_key(key),
            WindowKind::ListSelection => self.handle_list_key(key),
            WindowKind::Navigation | WindowKind::SearchableList => self.handle_searchable_key(key),
        }
        self.last_key = Some(key);
    }

    fn is_quit(&self, key: KeyEvent) -> bool {
        key.code == KeyCode::Esc || self.keys.matches(key, &self.keys.quit)
    }

    // ------------------------------------------------------------- windows

    /// Switch to `target`. Asking for the window we are already in closes
    /// it back to Home; every secondary window toggles shut this way.
    pub fn set_window(&mut self, target: WindowName) {
        if self.window == target {
            self.go_home();
            return;
        }
        self.window = target;
        self.state = WindowState::for_kind(target.kind());
        self.populate(target);
        self.cursor = 0;
    }

    /// The standard landing state: current directory listing, cursor on
    /// top, no transient window state.
    pub fn go_home(&mut self) {
        self.window = WindowName::Home;
        self.state = WindowState::for_kind(WindowKind::Navigation);
        self.cursor = 0;
        self.refresh_listing();
    }

    fn refresh_listing(&mut self) {
        if let Err(err) = self.store.list_dir() {
            self.report("listing failed", err);
        }
        self.clamp_cursor();
    }

    fn replace_items(&mut self, items: Vec<Item>) {
        if let Err(err) = self.store.replace(items) {
            self.report("item store", err);
        }
    }

    fn populate(&mut self, target: WindowName) {
        match target {
            WindowName::Home => self.refresh_listing(),
            WindowName::SetTargetSubcollection => self.populate_subcollections(None),
            WindowName::SetTargetCollection => {
                let Some(user) = self.user.as_ref() else { return };
                match self.catalog.list_collections(user.id) {
                    Ok(collections) => self.replace_items(
                        collections.into_iter().map(Item::Collection).collect(),
                    ),
                    Err(err) => self.report("collections", err),
                }
            }
            WindowName::FuzzySearchFromRoot | WindowName::FuzzySearchFromCurrentDir => {
                if let Err(err) = self.store.clear() {
                    self.report("item store", err);
                }
            }
            WindowName::BrowseCollection => {
                let Some(collection) = self.target_collection().cloned() else {
                    self.show_toast("no target collection");
                    return;
                };
                match self.catalog.tags_for_collection(collection.id) {
                    Ok(tags) => {
                        self.replace_items(tags.into_iter().map(Item::Tag).collect())
                    }
                    Err(err) => self.report("browse collection", err),
                }
            }
            WindowName::RunExport => {
                let Some(user) = self.user.as_ref() else { return };
                match self.catalog.list_exports(user.id) {
                    Ok(exports) => {
                        self.replace_items(exports.into_iter().map(Item::Export).collect())
                    }
                    Err(err) => self.report("exports", err),
                }
            }
            WindowName::NewCollection => {
                self.replace_items(Vec::new());
                self.state = WindowState::Form(new_collection_form());
            }
            WindowName::CreateExport => {
                self.replace_items(Vec::new());
                self.state = WindowState::Form(create_export_form());
            }
            WindowName::NewTag => {
                // Items stay on screen under the form; the tag subject is
                // whatever the cursor was on when the form opened.
                let snapshot = self.store.snapshot();
                let subject = snapshot
                    .get(self.cursor)
                    .filter(|item| item.is_file())
                    .and_then(|item| item.path().map(|p| p.to_path_buf()));
                match subject {
                    Some(path) => {
                        let name = display_name(&path);
                        let subcollection = self.target_subcollection().to_string();
                        self.state = WindowState::Form(new_tag_form(name, subcollection, path));
                    }
                    None => {
                        self.show_toast("no file under the cursor to tag");
                        self.go_home();
                    }
                }
            }
            WindowName::EnterUsername | WindowName::EnterRoot => {
                self.state = WindowState::Prompt(PromptState::default());
            }
        }
    }

    fn populate_subcollections(&mut self, filter: Option<&str>) {
        let Some(collection) = self.target_collection().cloned() else {
            self.show_toast("no target collection");
            self.replace_items(Vec::new());
            return;
        };
        match self.catalog.list_subcollections(collection.id, filter) {
            Ok(labels) => self.replace_items(
                labels
                    .into_iter()
                    .map(|name| Item::Subcollection { name })
                    .collect(),
            ),
            Err(err) => self.report("subcollections", err),
        }
    }

    // ------------------------------------------------------------ movement

    fn clamp_cursor(&mut self) {
        let len = self.store.len();
        if len == 0 {
            self.cursor = 0;
        } else if self.cursor >= len {
            self.cursor = len - 1;
        }
    }

    fn handle_movement_key(&mut self, key: KeyEvent) {
        let keys = self.keys.clone();
        let len = self.store.len();
        if keys.matches(key, &keys.nav_up) || keys.matches(key, &keys.nav_up_alt) {
            if self.cursor > 0 {
                self.cursor -= 1;
            }
            self.vertical_nav_effect();
        } else if keys.matches(key, &keys.nav_down) || keys.matches(key, &keys.nav_down_alt) {
            if self.cursor + 1 < len {
                self.cursor += 1;
            }
            self.vertical_nav_effect();
        } else if keys.matches(key, &keys.jump_down) {
            if len > 0 {
                self.cursor = (self.cursor + 8).min(len - 1);
            }
            self.vertical_nav_effect();
        } else if keys.matches(key, &keys.jump_up) {
            self.cursor = self.cursor.saturating_sub(8);
            self.vertical_nav_effect();
        } else if keys.matches(key, &keys.jump_bottom) {
            self.cursor = len.saturating_sub(1);
            self.vertical_nav_effect();
        } else if keys.matches(key, &keys.audition) {
            self.audition_selected();
        } else if keys.matches(key, &keys.audition_random) {
            self.audition_random();
        } else if keys.matches(key, &keys.jump_top) {
            // The only chord in the app: the jump-top key twice in a row.
            // One keystroke of memory, no timers.
            if self.last_key.is_some_and(|last| keys.matches(last, &keys.jump_top)) {
                self.cursor = 0;
                self.vertical_nav_effect();
            }
        }
    }

    /// Runs on every vertical cursor move.
    fn vertical_nav_effect(&mut self) {
        if self.auto_audition() {
            self.audition_selected();
        }
    }

    fn audition_selected(&mut self) {
        let snapshot = self.store.snapshot();
        let Some(item) = snapshot.get(self.cursor) else { return };
        if !item.is_file() {
            return;
        }
        let Some(path) = item.path() else { return };
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.store.current_dir().join(path)
        };
        if let Some(player) = &self.player {
            if let Err(err) = player.request_play(&path) {
                let context = format!("can't play {}", display_name(&path));
                self.report(&context, err);
            }
        }
    }

    fn audition_random(&mut self) {
        match self.store.random_audio_index() {
            Ok(Some(index)) => {
                self.cursor = index;
                self.vertical_nav_effect();
                if !self.auto_audition() {
                    self.audition_selected();
                }
            }
            Ok(None) => {}
            Err(err) => self.report("item store", err),
        }
    }

    // ----------------------------------------------------- window changes

    fn handle_window_change_key(&mut self, key: KeyEvent) {
        let keys = self.keys.clone();
        if self.is_quit(key) {
            if self.window == WindowName::Home {
                self.quitting = true;
            } else {
                self.go_home();
            }
        } else if keys.matches(key, &keys.new_collection) {
            self.set_window(WindowName::NewCollection);
        } else if keys.matches(key, &keys.create_export) {
            self.set_window(WindowName::CreateExport);
        } else if keys.matches(key, &keys.run_export) {
            self.set_window(WindowName::RunExport);
        } else if keys.matches(key, &keys.set_subcollection) {
            self.set_window(WindowName::SetTargetSubcollection);
        } else if keys.matches(key, &keys.clear_subcollection) {
            self.commit_subcollection("");
        } else if keys.matches(key, &keys.search_from_root) {
            self.set_window(WindowName::FuzzySearchFromRoot);
        } else if keys.matches(key, &keys.search_from_dir) {
            self.set_window(WindowName::FuzzySearchFromCurrentDir);
        } else if keys.matches(key, &keys.set_collection) {
            self.set_window(WindowName::SetTargetCollection);
        } else if keys.matches(key, &keys.browse_collection) {
            self.set_window(WindowName::BrowseCollection);
        } else if keys.matches(key, &keys.tag_form) {
            self.set_window(WindowName::NewTag);
        } else if keys.matches(key, &keys.toggle_collections) {
            self.show_collections = !self.show_collections;
        } else if keys.matches(key, &keys.toggle_auto_audition) {
            self.toggle_auto_audition();
        }
    }

    fn toggle_auto_audition(&mut self) {
        let Some(user) = self.user.as_mut() else { return };
        user.auto_audition = !user.auto_audition;
        let (id, enabled) = (user.id, user.auto_audition);
        if let Err(err) = self.catalog.set_auto_audition(id, enabled) {
            self.report("auto audition", err);
        } else {
            self.show_toast(if enabled { "auto audition on" } else { "auto audition off" });
        }
    }

    fn commit_subcollection(&mut self, label: &str) {
        let Some(user) = self.user.as_mut() else { return };
        let id = user.id;
        user.target_subcollection = normalize_subcollection(label);
        if let Err(err) = self.catalog.set_target_subcollection(id, label) {
            self.report("target subcollection", err);
        }
    }

    // ----------------------------------------------- searchable & lists

    fn handle_searchable_key(&mut self, key: KeyEvent) {
        let writing = matches!(&self.state, WindowState::Search(s) if s.writing);
        if writing {
            self.handle_search_writing_key(key);
        } else {
            self.handle_searchable_nav_key(key);
        }
    }

    fn handle_searchable_nav_key(&mut self, key: KeyEvent) {
        self.handle_movement_key(key);
        self.handle_window_change_key(key);
        let keys = self.keys.clone();
        if keys.matches(key, &keys.local_search) {
            if let WindowState::Search(search) = &mut self.state {
                search.writing = true;
                search.local = true;
                // Park the cursor at the bottom so the first committed
                // match wraps around to the top of the list.
                self.cursor = self.store.len().saturating_sub(1);
            }
        } else if keys.matches(key, &keys.insert_mode) {
            let remote = self.window.is_remote_query();
            if let WindowState::Search(search) = &mut self.state {
                search.writing = true;
                search.local = !remote;
            }
        } else if keys.matches(key, &keys.next_match) {
            match self.store.next_match(self.cursor) {
                Ok(Some(index)) => self.cursor = index,
                Ok(None) => {}
                Err(err) => self.report("item store", err),
            }
        } else if keys.matches(key, &keys.prev_match) {
            match self.store.prev_match(self.cursor) {
                Ok(Some(index)) => self.cursor = index,
                Ok(None) => {}
                Err(err) => self.report("item store", err),
            }
        } else if keys.matches(key, &keys.quick_tag) {
            self.quick_tag();
        } else if key.code == KeyCode::Enter {
            self.handle_searchable_enter();
        }
    }

    fn handle_searchable_enter(&mut self) {
        match self.window {
            WindowName::Home => {
                let snapshot = self.store.snapshot();
                let Some(item) = snapshot.get(self.cursor) else { return };
                if !item.is_dir() {
                    return;
                }
                let name = item.name();
                self.cursor = 0;
                let result = if name == ".." {
                    self.store.change_to_parent()
                } else {
                    self.store.change_dir(&name)
                };
                if let Err(err) = result {
                    self.report("listing failed", err);
                }
            }
            WindowName::FuzzySearchFromRoot | WindowName::FuzzySearchFromCurrentDir => {
                let query = match &self.state {
                    WindowState::Search(s) if !s.input.is_empty() => s.input.clone(),
                    _ => return,
                };
                self.cursor = 0;
                self.start_fuzzy_walk(query);
            }
            WindowName::SetTargetSubcollection => {
                let typed = match &self.state {
                    WindowState::Search(s) => s.input.clone(),
                    _ => String::new(),
                };
                let snapshot = self.store.snapshot();
                let label = match snapshot.get(self.cursor) {
                    // No listed label to pick: the typed text names a new one.
                    None if !typed.is_empty() => typed,
                    None => return,
                    Some(item) => item.name(),
                };
                self.commit_subcollection(&label);
                self.go_home();
            }
            _ => {}
        }
    }

    fn start_fuzzy_walk(&mut self, query: String) {
        let start = match self.window {
            WindowName::FuzzySearchFromRoot => self.store.root(),
            _ => self.store.current_dir(),
        };
        if let Err(err) = self.store.start_walk(start, query) {
            self.report("search failed", err);
        }
    }

    fn handle_search_writing_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                let (input, local) = match &mut self.state {
                    WindowState::Search(search) => {
                        search.writing = false;
                        (search.input.clone(), search.local)
                    }
                    _ => return,
                };
                if local {
                    if let WindowState::Search(search) = &mut self.state {
                        search.local = false;
                    }
                    self.commit_local_search(&input);
                } else {
                    self.commit_remote_query(&input);
                }
            }
            KeyCode::Esc => {
                if let WindowState::Search(search) = &mut self.state {
                    search.writing = false;
                    search.local = false;
                }
            }
            KeyCode::Backspace => {
                if let WindowState::Search(search) = &mut self.state {
                    search.input.pop();
                }
                self.search_input_changed();
            }
            KeyCode::Char(c) => {
                if let WindowState::Search(search) = &mut self.state {
                    search.input.push(c);
                }
                self.search_input_changed();
            }
            _ => {}
        }
    }

    fn commit_local_search(&mut self, query: &str) {
        match self.store.search(query) {
            Ok(_) => match self.store.next_match(self.cursor) {
                Ok(Some(index)) => self.cursor = index,
                Ok(None) => {}
                Err(err) => self.report("item store", err),
            },
            Err(err) => self.report("item store", err),
        }
    }

    fn commit_remote_query(&mut self, input: &str) {
        match self.window {
            WindowName::FuzzySearchFromRoot | WindowName::FuzzySearchFromCurrentDir => {
                if !input.is_empty() {
                    self.cursor = 0;
                    self.start_fuzzy_walk(input.to_string());
                }
            }
            WindowName::SetTargetSubcollection => {
                self.cursor = 0;
                self.populate_subcollections(Some(input));
            }
            _ => {}
        }
    }

    /// Live effects while the search input is being typed: local searches
    /// re-match what is loaded, remote windows re-issue their query so the
    /// list streams in keystroke by keystroke.
    fn search_input_changed(&mut self) {
        let (input, local) = match &self.state {
            WindowState::Search(search) => (search.input.clone(), search.local),
            _ => return,
        };
        if local {
            if let Err(err) = self.store.search(&input) {
                self.report("item store", err);
            }
            return;
        }
        match self.window {
            WindowName::FuzzySearchFromRoot | WindowName::FuzzySearchFromCurrentDir => {
                if input.is_empty() {
                    if let Err(err) = self.store.clear() {
                        self.report("item store", err);
                    }
                } else {
                    self.start_fuzzy_walk(input);
                }
                self.cursor = 0;
            }
            WindowName::SetTargetSubcollection => {
                self.populate_subcollections(Some(&input));
                self.cursor = 0;
            }
            _ => {}
        }
    }

    fn quick_tag(&mut self) {
        let snapshot = self.store.snapshot();
        let Some(item) = snapshot.get(self.cursor) else { return };
        if !item.is_file() {
            return;
        }
        let Some(path) = item.path() else { return };
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.store.current_dir().join(path)
        };
        let Some(collection) = self.target_collection().cloned() else {
            self.show_toast("no target collection");
            return;
        };
        let Some(user) = self.user.as_ref() else { return };
        let name = display_name(&path);
        let subcollection = self.target_subcollection().to_string();
        match self
            .catalog
            .create_tag(user.id, &path, collection.id, &name, &subcollection)
        {
            Ok(()) => {
                info!(path = %path.display(), collection = %collection.name, "tagged");
                self.show_toast(format!("tagged {name}"));
                if self.window == WindowName::Home {
                    // Pick up the fresh annotation without moving the cursor.
                    if let Err(err) = self.store.list_dir() {
                        self.report("listing failed", err);
                    }
                    self.clamp_cursor();
                }
            }
            Err(err) => self.report("tag failed", err),
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) {
        self.handle_movement_key(key);
        self.handle_window_change_key(key);
        if key.code == KeyCode::Enter {
            let snapshot = self.store.snapshot();
            let Some(item) = snapshot.get(self.cursor).cloned() else { return };
            match (self.window, item) {
                (WindowName::SetTargetCollection, Item::Collection(collection)) => {
                    self.select_target_collection(collection);
                }
                (WindowName::RunExport, Item::Export(export)) => {
                    let Some(collection) = self.target_collection().cloned() else {
                        self.show_toast("no target collection");
                        return;
                    };
                    match self.catalog.run_export(collection.id, export.id) {
                        Ok(report) => self.show_toast(format!(
                            "export '{}': {} linked, {} skipped",
                            export.name, report.linked, report.skipped
                        )),
                        Err(err) => self.report("export failed", err),
                    }
                }
                _ => {}
            }
        }
    }

    fn select_target_collection(&mut self, collection: CollectionSummary) {
        let Some(user) = self.user.as_mut() else { return };
        let id = user.id;
        user.target_collection = Some(collection.clone());
        user.target_subcollection.clear();
        if let Err(err) = self.catalog.set_target_collection(id, collection.id) {
            self.report("target collection", err);
            return;
        }
        self.go_home();
    }

    // ---------------------------------------------------------------- forms

    fn handle_form_key(&mut self, key: KeyEvent) {
        let writing = matches!(&self.state, WindowState::Form(f) if f.writing);
        if writing {
            self.handle_form_writing_key(key);
        } else {
            self.handle_form_nav_key(key);
        }
    }

    fn handle_form_nav_key(&mut self, key: KeyEvent) {
        self.handle_window_change_key(key);
        let keys = self.keys.clone();
        if keys.matches(key, &keys.nav_up) || keys.matches(key, &keys.nav_up_alt) {
            if let WindowState::Form(form) = &mut self.state {
                form.focus_prev();
            }
        } else if keys.matches(key, &keys.nav_down) || keys.matches(key, &keys.nav_down_alt) {
            if let WindowState::Form(form) = &mut self.state {
                form.focus_next();
            }
        } else if keys.matches(key, &keys.insert_mode) {
            if let WindowState::Form(form) = &mut self.state {
                form.writing = true;
            }
        } else if key.code == KeyCode::Enter {
            self.submit_form();
        }
    }

    fn handle_form_writing_key(&mut self, key: KeyEvent) {
        let WindowState::Form(form) = &mut self.state else { return };
        match key.code {
            KeyCode::Enter | KeyCode::Esc => form.writing = false,
            KeyCode::Backspace => {
                if let Some(value) = form.focused_value_mut() {
                    value.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(value) = form.focused_value_mut() {
                    value.push(c);
                }
            }
            _ => {}
        }
    }

    fn submit_form(&mut self) {
        let form = match &mut self.state {
            WindowState::Form(form) => {
                // Nothing submits half-filled: focus jumps to the first
                // empty field instead.
                if let Some(empty) = form.first_empty() {
                    form.focused = empty;
                    form.writing = true;
                    return;
                }
                form.clone()
            }
            _ => return,
        };
        match self.window {
            WindowName::NewCollection => self.submit_new_collection(&form),
            WindowName::NewTag => self.submit_new_tag(&form),
            WindowName::CreateExport => self.submit_create_export(&form),
            _ => return,
        }
        self.go_home();
    }

    fn submit_new_collection(&mut self, form: &Form) {
        let Some(user) = self.user.as_ref() else { return };
        let (name, description) = (form.value(0).to_string(), form.value(1).to_string());
        match self.catalog.create_collection(user.id, &name, &description) {
            Ok(id) => {
                // A fresh collection becomes the tagging target right away.
                if let Some(user) = self.user.as_mut() {
                    user.target_collection = Some(CollectionSummary {
                        id,
                        name: name.clone(),
                        description,
                    });
                    user.target_subcollection.clear();
                }
                self.show_toast(format!("collection '{name}' created"));
            }
            Err(err) => self.report("create collection", err),
        }
    }

    fn submit_new_tag(&mut self, form: &Form) {
        let Some(path) = form.subject.clone() else { return };
        let Some(collection) = self.target_collection().cloned() else {
            self.show_toast("no target collection");
            return;
        };
        let Some(user) = self.user.as_ref() else { return };
        let (name, subcollection) = (form.value(0), form.value(1));
        match self
            .catalog
            .create_tag(user.id, &path, collection.id, name, subcollection)
        {
            Ok(()) => self.show_toast(format!("tagged {name}")),
            Err(err) => self.report("tag failed", err),
        }
    }

    fn submit_create_export(&mut self, form: &Form) {
        let Some(user) = self.user.as_ref() else { return };
        let name = form.value(0).to_string();
        let output_dir = super::config::expand_home(form.value(1));
        let concrete_field = form.value(2);
        let concrete = concrete_field.starts_with('t') || concrete_field == "1";
        match self
            .catalog
            .create_export(user.id, &name, &output_dir, concrete)
        {
            Ok(_) => self.show_toast(format!("export '{name}' saved")),
            Err(err) => self.report("create export", err),
        }
    }

    // -------------------------------------------------------------- prompts

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.submit_prompt(),
            KeyCode::Backspace => {
                if let WindowState::Prompt(prompt) = &mut self.state {
                    prompt.input.pop();
                }
            }
            KeyCode::Char(c) => {
                if let WindowState::Prompt(prompt) = &mut self.state {
                    prompt.input.push(c);
                }
            }
            _ => {}
        }
    }

    fn submit_prompt(&mut self) {
        let input = match &self.state {
            WindowState::Prompt(prompt) => prompt.input.trim().to_string(),
            _ => return,
        };
        match self.window {
            WindowName::EnterUsername => {
                if input.is_empty() {
                    self.show_toast("please enter a username");
                    return;
                }
                match self.catalog.resolve_user(&input) {
                    Ok(user) => {
                        info!(user = %user.name, "user ready");
                        self.user = Some(user);
                        self.window = WindowName::EnterRoot;
                        self.state = WindowState::Prompt(PromptState::default());
                    }
                    Err(err) => self.report("user", err),
                }
            }
            WindowName::EnterRoot => {
                if input.is_empty() {
                    self.show_toast("please enter a root directory");
                    return;
                }
                let root = super::config::expand_home(&input);
                if !root.is_dir() {
                    self.show_toast(format!("{} is not a directory", root.display()));
                    return;
                }
                if let Err(err) = self.store.change_root(root.clone()) {
                    self.report("listing failed", err);
                }
                if let Some(user) = self.user.as_mut() {
                    user.root = Some(root.clone());
                    let id = user.id;
                    if let Err(err) = self.catalog.set_root(id, &root) {
                        self.report("root", err);
                    }
                }
                // First run continues straight into creating a collection.
                self.window = WindowName::Home;
                self.set_window(WindowName::NewCollection);
            }
            _ => {}
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
