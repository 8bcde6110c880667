//! Sidebar widget: searchable directory of chat recipients.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use crate::models::User;

/// Sidebar state: the recipient directory and its search filter.
pub struct SidebarState {
    pub users: Vec<User>,
    /// Index into `users` (0-based).
    pub selected: usize,
    /// Whether directory data is still loading.
    pub loading: bool,
    /// Current search keyword.
    pub search: String,
    /// True while the search line is being edited.
    pub searching: bool,
}

impl Default for SidebarState {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            selected: 0,
            loading: true,
            search: String::new(),
            searching: false,
        }
    }
}

impl SidebarState {
    /// Replace the directory contents from an API response.
    pub fn update_users(&mut self, users: Vec<User>) {
        self.users = users;
        self.loading = false;
        self.clamp_selection();
    }

    pub fn select_previous(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.users.len() {
            self.selected += 1;
        }
    }

    /// The user under the cursor.
    pub fn current_user(&self) -> Option<&User> {
        self.users.get(self.selected)
    }

    fn clamp_selection(&mut self) {
        if self.users.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.users.len() {
            self.selected = self.users.len() - 1;
        }
    }
}

/// Render the sidebar into the given area.
pub fn render(
    area: Rect,
    buf: &mut Buffer,
    state: &SidebarState,
    selected_peer_id: Option<i64>,
    focused: bool,
) {
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let border_type = if focused {
        BorderType::Double
    } else {
        BorderType::Plain
    };

    let block = Block::default()
        .title(" Chats ")
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style);

    let inner = block.inner(area);
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    // First line: the search filter.
    let search_area = Rect::new(inner.x, inner.y, inner.width, 1);
    render_search_line(search_area, buf, state);

    let list_area = Rect::new(
        inner.x,
        inner.y + 1,
        inner.width,
        inner.height.saturating_sub(1),
    );
    if list_area.height == 0 {
        return;
    }

    if state.loading {
        Paragraph::new(Line::from(Span::styled(
            " loading...",
            Style::default().fg(Color::DarkGray),
        )))
        .render(list_area, buf);
        return;
    }

    if state.users.is_empty() {
        Paragraph::new(Line::from(Span::styled(
            " (no users)",
            Style::default().fg(Color::DarkGray),
        )))
        .render(list_area, buf);
        return;
    }

    // Keep the cursor visible.
    let visible = list_area.height as usize;
    let scroll = if state.selected >= visible {
        state.selected + 1 - visible
    } else {
        0
    };

    for (row, (idx, user)) in state
        .users
        .iter()
        .enumerate()
        .skip(scroll)
        .take(visible)
        .enumerate()
    {
        let y = list_area.y + row as u16;
        let is_cursor = idx == state.selected;
        let is_active = selected_peer_id == Some(user.id);

        let marker = if is_active { ">" } else { " " };
        let label = format!("{}[{}] {}", marker, user.initials(), user.full_name());
        let truncated: String = label.chars().take(list_area.width as usize).collect();

        let style = if is_cursor && focused {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else if is_active {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };

        let line_area = Rect::new(list_area.x, y, list_area.width, 1);
        Paragraph::new(Line::from(Span::styled(truncated, style))).render(line_area, buf);
    }
}

fn render_search_line(area: Rect, buf: &mut Buffer, state: &SidebarState) {
    let style = if state.searching {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let text = if state.search.is_empty() && !state.searching {
        " /search".to_string()
    } else {
        format!(" /{}{}", state.search, if state.searching { "_" } else { "" })
    };

    let truncated: String = text.chars().take(area.width as usize).collect();
    Paragraph::new(Line::from(Span::styled(truncated, style))).render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, first: &str) -> User {
        User {
            id,
            first_name: first.into(),
            last_name: "Test".into(),
            ..Default::default()
        }
    }

    #[test]
    fn selection_clamps_when_directory_shrinks() {
        let mut state = SidebarState::default();
        state.update_users(vec![user(1, "A"), user(2, "B"), user(3, "C")]);
        state.select_next();
        state.select_next();
        assert_eq!(state.current_user().unwrap().id, 3);

        state.update_users(vec![user(1, "A")]);
        assert_eq!(state.selected, 0);
        assert_eq!(state.current_user().unwrap().id, 1);
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let mut state = SidebarState::default();
        state.update_users(vec![user(1, "A"), user(2, "B")]);
        state.select_previous();
        assert_eq!(state.selected, 0);
        state.select_next();
        state.select_next();
        assert_eq!(state.selected, 1);
    }

    #[test]
    fn empty_directory_has_no_current_user() {
        let mut state = SidebarState::default();
        state.update_users(vec![]);
        assert!(state.current_user().is_none());
    }
}
