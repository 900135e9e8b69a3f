use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    // Global
    pub quit: String,

    // Navigation (shared)
    pub nav_up: String,
    pub nav_up_alt: String,
    pub nav_down: String,
    pub nav_down_alt: String,
    pub jump_up: String,
    pub jump_down: String,
    pub jump_bottom: String,
    /// Pressed twice in a row jumps to the top; the only chord in the app.
    pub jump_top: String,

    // Audition
    pub audition: String,
    pub audition_random: String,
    pub toggle_auto_audition: String,

    // Tagging
    pub quick_tag: String,
    pub tag_form: String,

    // Collections
    pub new_collection: String,
    pub set_collection: String,
    pub set_subcollection: String,
    pub clear_subcollection: String,
    pub browse_collection: String,
    pub toggle_collections: String,

    // Exports
    pub create_export: String,
    pub run_export: String,

    // Search
    pub search_from_root: String,
    pub search_from_dir: String,
    pub local_search: String,
    pub next_match: String,
    pub prev_match: String,

    // Text entry
    pub insert_mode: String,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            quit: "q".to_string(),

            nav_up: "k".to_string(),
            nav_up_alt: "Up".to_string(),
            nav_down: "j".to_string(),
            nav_down_alt: "Down".to_string(),
            jump_up: "Ctrl+u".to_string(),
            jump_down: "Ctrl+d".to_string(),
            jump_bottom: "G".to_string(),
            jump_top: "g".to_string(),

            audition: "a".to_string(),
            audition_random: "r".to_string(),
            toggle_auto_audition: "A".to_string(),

            quick_tag: "t".to_string(),
            tag_form: "T".to_string(),

            new_collection: "C".to_string(),
            set_collection: "c".to_string(),
            set_subcollection: "D".to_string(),
            clear_subcollection: "d".to_string(),
            browse_collection: "b".to_string(),
            toggle_collections: "K".to_string(),

            create_export: "E".to_string(),
            run_export: "e".to_string(),

            search_from_root: "F".to_string(),
            search_from_dir: "f".to_string(),
            local_search: "/".to_string(),
            next_match: "n".to_string(),
            prev_match: "p".to_string(),

            insert_mode: "i".to_string(),
        }
    }
}

impl KeyConfig {
    pub fn matches(&self, event: KeyEvent, key_str: &str) -> bool {
        match key_str {
            "Space" => event.code == KeyCode::Char(' '),
            "Enter" => event.code == KeyCode::Enter,
            "Backspace" => event.code == KeyCode::Backspace,
            "Esc" => event.code == KeyCode::Esc,
            "Tab" => event.code == KeyCode::Tab,
            "BackTab" => event.code == KeyCode::BackTab,
            "Up" => event.code == KeyCode::Up,
            "Down" => event.code == KeyCode::Down,
            "Left" => event.code == KeyCode::Left,
            "Right" => event.code == KeyCode::Right,
            s if s.starts_with("Ctrl+") => {
                let rest = &s["Ctrl+".len()..];
                rest.chars().next().is_some_and(|ch| {
                    event.code == KeyCode::Char(ch)
                        && event.modifiers.contains(KeyModifiers::CONTROL)
                })
            }
            s if s.chars().count() == 1 => {
                if let Some(ch) = s.chars().next() {
                    if ch.is_uppercase() {
                        event.code == KeyCode::Char(ch)
                            || (event.code == KeyCode::Char(ch.to_ascii_lowercase())
                                && event.modifiers.contains(KeyModifiers::SHIFT))
                    } else {
                        event.code == KeyCode::Char(ch)
                            && !event.modifiers.contains(KeyModifiers::CONTROL)
                    }
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    // Helper for the footer hints
    pub fn display(&self, key_str: &str) -> String {
        match key_str {
            "Up" => "↑".to_string(),
            "Down" => "↓".to_string(),
            "Left" => "←".to_string(),
            "Right" => "→".to_string(),
            "BackTab" => "S-Tab".to_string(),
            "Backspace" => "Bksp".to_string(),
            s if s.starts_with("Ctrl+") => format!("^{}", &s["Ctrl+".len()..]),
            _ => key_str.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE)
    }

    #[test]
    fn plain_and_ctrl_bindings_do_not_collide() {
        let keys = KeyConfig::default();
        assert!(keys.matches(press('d'), &keys.clear_subcollection));
        let ctrl_d = KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL);
        assert!(keys.matches(ctrl_d, &keys.jump_down));
        assert!(!keys.matches(ctrl_d, &keys.clear_subcollection));
    }

    #[test]
    fn uppercase_bindings_accept_shifted_lowercase() {
        let keys = KeyConfig::default();
        let shift_g = KeyEvent::new(KeyCode::Char('g'), KeyModifiers::SHIFT);
        assert!(keys.matches(shift_g, &keys.jump_bottom));
        assert!(keys.matches(press('G'), &keys.jump_bottom));
        assert!(!keys.matches(press('g'), &keys.jump_bottom));
    }
}
