//! Frame rendering. Everything visual lives here; the session only hands
//! over its state and the current item snapshot.

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::app::window::{Form, PromptState, SearchState, WindowKind};
use crate::app::{Session, WindowState};
use crate::browse::Item;

fn title_style() -> Style {
    Style::new().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

fn selected_style() -> Style {
    Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD)
}

fn dim_style() -> Style {
    Style::new().fg(Color::DarkGray)
}

fn accent_style() -> Style {
    Style::new().fg(Color::Magenta)
}

pub fn draw(frame: &mut Frame, session: &Session) {
    let [header, body, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(2),
    ])
    .areas(frame.area());

    draw_header(frame, header, session);
    match &session.state {
        WindowState::Prompt(prompt) => draw_prompt(frame, body, session, prompt),
        WindowState::Form(form) => draw_form(frame, body, form),
        WindowState::Search(search) => {
            let [list_area, search_area] =
                Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(body);
            draw_items(frame, list_area, session);
            draw_search_bar(frame, search_area, search);
        }
        WindowState::Plain => draw_items(frame, body, session),
    }
    draw_footer(frame, footer, session);
}

fn draw_header(frame: &mut Frame, area: Rect, session: &Session) {
    let line = Line::from(vec![
        Span::styled("cratedig", title_style()),
        Span::raw("  ·  "),
        Span::raw(session.window.title()),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_items(frame: &mut Frame, area: Rect, session: &Session) {
    let snapshot = session.store().snapshot();
    let visible = area.height as usize;
    if visible == 0 {
        return;
    }
    let offset = scroll_offset(session.cursor, snapshot.len(), visible);
    let width = area.width as usize;
    let mut lines = Vec::with_capacity(visible);
    for (index, item) in snapshot.iter().enumerate().skip(offset).take(visible) {
        lines.push(item_line(item, index == session.cursor, session.show_collections, width));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

/// Keep the cursor vertically centered once the list outgrows the view.
fn scroll_offset(cursor: usize, len: usize, visible: usize) -> usize {
    if len <= visible {
        0
    } else {
        cursor.saturating_sub(visible / 2).min(len - visible)
    }
}

fn item_line(item: &Item, selected: bool, show_collections: bool, width: usize) -> Line<'static> {
    let marker = if selected { "> " } else { "  " };
    let name = truncate(&format!("{marker}{}", item.name()), width.saturating_sub(2));
    let mut spans = vec![if selected {
        Span::styled(name, selected_style())
    } else {
        Span::raw(name)
    }];
    if selected || show_collections {
        let description = item.description();
        if !description.is_empty() {
            spans.push(Span::styled(format!("    {description}"), dim_style()));
        }
    }
    Line::from(spans)
}

fn truncate(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    for ch in text.chars() {
        if out.width() + 1 >= max_width {
            break;
        }
        out.push(ch);
    }
    out.push('…');
    out
}

fn draw_search_bar(frame: &mut Frame, area: Rect, search: &SearchState) {
    let cursor = if search.writing { "▏" } else { "" };
    let label = if search.local { "filter" } else { "search" };
    let line = Line::from(vec![
        Span::styled(format!("{label}: "), accent_style()),
        Span::raw(format!("{}{cursor}", search.input)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_form(frame: &mut Frame, area: Rect, form: &Form) {
    let mut lines = Vec::with_capacity(form.fields.len() + 1);
    for (index, field) in form.fields.iter().enumerate() {
        let focused = index == form.focused;
        let cursor = if focused && form.writing { "▏" } else { "" };
        let text = format!("{}: {}{cursor}", field.name, field.value);
        lines.push(if focused {
            Line::from(Span::styled(text, selected_style()))
        } else {
            Line::from(Span::raw(text))
        });
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "i edit · j/k fields · Enter submit",
        dim_style(),
    )));
    frame.render_widget(Paragraph::new(lines), area);
}

fn draw_prompt(frame: &mut Frame, area: Rect, session: &Session, prompt: &PromptState) {
    let line = Line::from(vec![
        Span::styled(session.window.prompt_text(), accent_style()),
        Span::raw(format!("{}▏", prompt.input)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_footer(frame: &mut Frame, area: Rect, session: &Session) {
    let [status_area, hint_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(area);

    let collection = session
        .target_collection()
        .map(|c| c.name.clone())
        .unwrap_or_default();
    let mut status = vec![
        Span::styled("collection: ", dim_style()),
        Span::raw(collection),
        Span::styled("  subcollection: ", dim_style()),
        Span::raw(session.target_subcollection().to_string()),
        Span::styled("  items: ", dim_style()),
        Span::raw(session.store().len().to_string()),
    ];
    if session.auto_audition() {
        status.push(Span::styled("  [auto]", accent_style()));
    }
    frame.render_widget(Paragraph::new(Line::from(status)), status_area);

    let hint = match session.active_toast() {
        Some(toast) => Line::from(Span::styled(toast.to_string(), accent_style())),
        None => hints_line(session),
    };
    frame.render_widget(Paragraph::new(hint), hint_area);
}

fn hints_line(session: &Session) -> Line<'static> {
    let keys = &session.keys;
    let hint = match session.window.kind() {
        WindowKind::PreSessionPrompt => "Enter confirm".to_string(),
        WindowKind::Form => "Enter submit · Esc home".to_string(),
        _ => format!(
            "{} quit · {} audition · {} tag · {} search · {} find · {} collections",
            keys.display(&keys.quit),
            keys.display(&keys.audition),
            keys.display(&keys.quick_tag),
            keys.display(&keys.local_search),
            keys.display(&keys.search_from_root),
            keys.display(&keys.set_collection),
        ),
    };
    Line::from(Span::styled(hint, dim_style()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_keeps_cursor_centered() {
        assert_eq!(scroll_offset(0, 100, 20), 0);
        assert_eq!(scroll_offset(50, 100, 20), 40);
        assert_eq!(scroll_offset(99, 100, 20), 80);
        assert_eq!(scroll_offset(5, 10, 20), 0);
    }

    #[test]
    fn truncate_appends_an_ellipsis() {
        assert_eq!(truncate("short", 20), "short");
        let cut = truncate("a_very_long_sample_name.wav", 10);
        assert!(cut.width() <= 10);
        assert!(cut.ends_with('…'));
    }
}
