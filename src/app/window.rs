use std::path::PathBuf;

/// Every interaction mode the session can be in. A window's name says what
/// it is for; its [`kind`](WindowName::kind) says how it behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowName {
    Home,
    NewCollection,
    NewTag,
    SetTargetSubcollection,
    SetTargetCollection,
    FuzzySearchFromRoot,
    FuzzySearchFromCurrentDir,
    CreateExport,
    RunExport,
    BrowseCollection,
    EnterUsername,
    EnterRoot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    /// Directory browsing with a local search bar (Home).
    Navigation,
    Form,
    ListSelection,
    SearchableList,
    PreSessionPrompt,
}

impl WindowName {
    /// The static name → kind table; this never varies at runtime.
    pub fn kind(self) -> WindowKind {
        match self {
            WindowName::Home => WindowKind::Navigation,
            WindowName::NewCollection => WindowKind::Form,
            WindowName::NewTag => WindowKind::Form,
            WindowName::CreateExport => WindowKind::Form,
            WindowName::SetTargetSubcollection => WindowKind::SearchableList,
            WindowName::FuzzySearchFromRoot => WindowKind::SearchableList,
            WindowName::FuzzySearchFromCurrentDir => WindowKind::SearchableList,
            WindowName::BrowseCollection => WindowKind::SearchableList,
            WindowName::SetTargetCollection => WindowKind::ListSelection,
            WindowName::RunExport => WindowKind::ListSelection,
            WindowName::EnterUsername => WindowKind::PreSessionPrompt,
            WindowName::EnterRoot => WindowKind::PreSessionPrompt,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            WindowName::Home => "home",
            WindowName::NewCollection => "create collection",
            WindowName::NewTag => "create tag",
            WindowName::SetTargetSubcollection => "target subcollection",
            WindowName::SetTargetCollection => "target collection",
            WindowName::FuzzySearchFromRoot => "recursive search - root",
            WindowName::FuzzySearchFromCurrentDir => "recursive search - current dir",
            WindowName::CreateExport => "create export",
            WindowName::RunExport => "run export",
            WindowName::BrowseCollection => "browse target collection",
            WindowName::EnterUsername => "create user",
            WindowName::EnterRoot => "set root",
        }
    }

    /// Windows whose search input re-issues a population query on commit,
    /// as opposed to filtering what is already loaded.
    pub fn is_remote_query(self) -> bool {
        matches!(
            self,
            WindowName::FuzzySearchFromRoot
                | WindowName::FuzzySearchFromCurrentDir
                | WindowName::SetTargetSubcollection
        )
    }
}

/// State owned by the active window, keyed by its kind. Replaced wholesale
/// on every transition, so no window ever sees another's leftovers.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowState {
    /// ListSelection windows carry nothing beyond the shared cursor.
    Plain,
    Form(Form),
    Search(SearchState),
    Prompt(PromptState),
}

impl WindowState {
    pub fn for_kind(kind: WindowKind) -> Self {
        match kind {
            WindowKind::Navigation | WindowKind::SearchableList => {
                WindowState::Search(SearchState::default())
            }
            WindowKind::Form => WindowState::Form(Form::default()),
            WindowKind::ListSelection => WindowState::Plain,
            WindowKind::PreSessionPrompt => WindowState::Prompt(PromptState::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Form {
    pub fields: Vec<FormField>,
    pub focused: usize,
    pub writing: bool,
    /// The file a NewTag form was opened on; captured at open time because
    /// the cursor may move before submit.
    pub subject: Option<PathBuf>,
}

impl Form {
    pub fn new(names: &[&'static str]) -> Self {
        Form {
            fields: names
                .iter()
                .map(|&name| FormField {
                    name,
                    value: String::new(),
                })
                .collect(),
            focused: 0,
            writing: false,
            subject: None,
        }
    }

    pub fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focused = (self.focused + 1) % self.fields.len();
        }
    }

    pub fn focus_prev(&mut self) {
        if !self.fields.is_empty() {
            self.focused = self.focused.checked_sub(1).unwrap_or(self.fields.len() - 1);
        }
    }

    pub fn focused_value_mut(&mut self) -> Option<&mut String> {
        self.fields.get_mut(self.focused).map(|f| &mut f.value)
    }

    pub fn value(&self, index: usize) -> &str {
        self.fields.get(index).map(|f| f.value.as_str()).unwrap_or("")
    }

    pub fn first_empty(&self) -> Option<usize> {
        self.fields.iter().position(|f| f.value.is_empty())
    }
}

pub fn new_collection_form() -> Form {
    Form::new(&["name", "description"])
}

pub fn new_tag_form(name: String, subcollection: String, subject: PathBuf) -> Form {
    let mut form = Form::new(&["name", "subcollection"]);
    form.fields[0].value = name;
    form.fields[1].value = subcollection;
    form.subject = Some(subject);
    form
}

pub fn create_export_form() -> Form {
    Form::new(&["name", "output_dir", "concrete"])
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub input: String,
    pub writing: bool,
    /// Local search filters what is loaded; otherwise a commit re-issues
    /// the window's population query.
    pub local: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptState {
    pub input: String,
}

impl WindowName {
    pub fn prompt_text(self) -> &'static str {
        match self {
            WindowName::EnterUsername => "Please enter a username: ",
            WindowName::EnterRoot => "Please enter the root directory where you store your samples: ",
            _ => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_window_has_exactly_one_kind() {
        use WindowKind::*;
        use WindowName::*;
        let table = [
            (Home, Navigation),
            (NewCollection, Form),
            (NewTag, Form),
            (CreateExport, Form),
            (SetTargetSubcollection, SearchableList),
            (FuzzySearchFromRoot, SearchableList),
            (FuzzySearchFromCurrentDir, SearchableList),
            (BrowseCollection, SearchableList),
            (SetTargetCollection, ListSelection),
            (RunExport, ListSelection),
            (EnterUsername, PreSessionPrompt),
            (EnterRoot, PreSessionPrompt),
        ];
        for (name, kind) in table {
            assert_eq!(name.kind(), kind, "{name:?}");
        }
    }

    #[test]
    fn form_focus_wraps_both_ways() {
        let mut form = create_export_form();
        assert_eq!(form.focused, 0);
        form.focus_prev();
        assert_eq!(form.focused, 2);
        form.focus_next();
        assert_eq!(form.focused, 0);
    }

    #[test]
    fn tag_form_prefills_name_and_subcollection() {
        let form = new_tag_form(
            "808_kick.wav".into(),
            "/kicks".into(),
            PathBuf::from("/samples/kicks/808_kick.wav"),
        );
        assert_eq!(form.value(0), "808_kick.wav");
        assert_eq!(form.value(1), "/kicks");
        assert!(form.subject.is_some());
    }
}
