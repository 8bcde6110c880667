//! Compose box: single-line text input for the chat composer.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
    Frame,
};

/// State for the compose box.
#[derive(Default)]
pub struct ComposeState {
    /// Current input text.
    pub input: String,
    /// Cursor position (character offset into `input`).
    pub cursor_pos: usize,
    /// Inline validation error, shown below the input.
    pub error: Option<String>,
    /// True while a send is in flight; input is frozen meanwhile.
    pub sending: bool,
}

impl ComposeState {
    /// Insert a character at the current cursor position.
    pub fn insert_char(&mut self, c: char) {
        if self.sending {
            return;
        }
        let byte_pos = self.char_to_byte(self.cursor_pos);
        self.input.insert(byte_pos, c);
        self.cursor_pos += 1;
        self.error = None;
    }

    /// Delete the character before the cursor (backspace).
    pub fn backspace(&mut self) {
        if self.sending {
            return;
        }
        if self.cursor_pos > 0 {
            let byte_pos = self.char_to_byte(self.cursor_pos);
            let prev_byte_pos = self.char_to_byte(self.cursor_pos - 1);
            self.input.drain(prev_byte_pos..byte_pos);
            self.cursor_pos -= 1;
        }
    }

    /// Delete the character at the cursor (delete key).
    pub fn delete(&mut self) {
        if self.sending {
            return;
        }
        let char_count = self.input.chars().count();
        if self.cursor_pos < char_count {
            let byte_pos = self.char_to_byte(self.cursor_pos);
            let next_byte_pos = self.char_to_byte(self.cursor_pos + 1);
            self.input.drain(byte_pos..next_byte_pos);
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos -= 1;
        }
    }

    pub fn move_right(&mut self) {
        let char_count = self.input.chars().count();
        if self.cursor_pos < char_count {
            self.cursor_pos += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor_pos = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor_pos = self.input.chars().count();
    }

    /// Clear all input text (Ctrl+U).
    pub fn clear(&mut self) {
        self.input.clear();
        self.cursor_pos = 0;
        self.error = None;
    }

    /// Convert a char-based cursor position to a byte offset.
    fn char_to_byte(&self, char_pos: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Height of the compose box: border + input + hint/error + border.
pub const COMPOSE_HEIGHT: u16 = 4;

/// Render the compose box into the given area.
///
/// Uses `Frame` directly so we can both write to the buffer and set cursor.
pub fn render(
    area: Rect,
    frame: &mut Frame,
    state: &ComposeState,
    peer_name: Option<&str>,
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
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let input_area = Rect::new(inner.x, inner.y, inner.width, 1);
    let cursor = compute_cursor_position(input_area, state, focused);
    render_input(input_area, frame.buffer_mut(), state, peer_name);
    if let Some((cx, cy)) = cursor {
        frame.set_cursor_position((cx, cy));
    }

    if inner.height >= 2 {
        let hint_area = Rect::new(inner.x, inner.y + 1, inner.width, 1);
        render_hint_line(hint_area, frame.buffer_mut(), state);
    }
}

fn compute_cursor_position(
    input_area: Rect,
    state: &ComposeState,
    focused: bool,
) -> Option<(u16, u16)> {
    if !focused || state.sending {
        return None;
    }

    if state.input.is_empty() {
        Some((input_area.x + 1, input_area.y))
    } else {
        let w = input_area.width as usize;
        let display = display_text(&state.input, state.cursor_pos, w);
        let cursor_x = input_area.x + 1 + display.cursor_offset as u16;
        Some((cursor_x, input_area.y))
    }
}

fn render_input(area: Rect, buf: &mut Buffer, state: &ComposeState, peer_name: Option<&str>) {
    let w = area.width as usize;

    if state.input.is_empty() {
        let placeholder = match peer_name {
            Some(name) => format!(" Type a message to {}...", name),
            None => " Select a chat to start typing...".to_string(),
        };
        let truncated: String = placeholder.chars().take(w).collect();
        Paragraph::new(Line::from(Span::styled(
            truncated,
            Style::default().fg(Color::DarkGray),
        )))
        .render(area, buf);
    } else {
        let display = display_text(&state.input, state.cursor_pos, w);
        let style = if state.sending {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White)
        };
        Paragraph::new(Line::from(Span::styled(
            format!(" {}", display.visible),
            style,
        )))
        .render(area, buf);
    }
}

fn render_hint_line(area: Rect, buf: &mut Buffer, state: &ComposeState) {
    let (text, style) = if let Some(ref error) = state.error {
        (
            format!(" {}", error),
            Style::default().fg(Color::Red),
        )
    } else if state.sending {
        (
            " sending...".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        (
            " Enter: send".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    };

    let truncated: String = text.chars().take(area.width as usize).collect();
    Paragraph::new(Line::from(Span::styled(truncated, style))).render(area, buf);
}

/// Information about what text to display and where the cursor is.
struct DisplayText {
    visible: String,
    cursor_offset: usize,
}

/// Compute the visible text and cursor offset with horizontal scrolling.
fn display_text(input: &str, cursor_pos: usize, width: usize) -> DisplayText {
    // 1 char margin on the left accounted for by the " " prefix.
    let avail = width.saturating_sub(1);
    if avail == 0 {
        return DisplayText {
            visible: String::new(),
            cursor_offset: 0,
        };
    }

    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let cursor = cursor_pos.min(len);

    if len <= avail {
        DisplayText {
            visible: input.to_string(),
            cursor_offset: cursor,
        }
    } else {
        let scroll_start = if cursor < avail { 0 } else { cursor - avail + 1 };
        let end = (scroll_start + avail).min(len);
        let visible: String = chars[scroll_start..end].iter().collect();
        DisplayText {
            visible,
            cursor_offset: cursor - scroll_start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_moves_cursor_with_multibyte_chars() {
        let mut state = ComposeState::default();
        for c in "héllo".chars() {
            state.insert_char(c);
        }
        assert_eq!(state.input, "héllo");
        assert_eq!(state.cursor_pos, 5);

        state.move_left();
        state.backspace();
        assert_eq!(state.input, "hélo");
    }

    #[test]
    fn input_frozen_while_sending() {
        let mut state = ComposeState {
            input: "draft".into(),
            cursor_pos: 5,
            ..Default::default()
        };
        state.sending = true;
        state.insert_char('x');
        state.backspace();
        assert_eq!(state.input, "draft");
    }

    #[test]
    fn typing_clears_inline_error() {
        let mut state = ComposeState::default();
        state.error = Some("This field is required".into());
        state.insert_char('h');
        assert!(state.error.is_none());
    }

    #[test]
    fn long_input_scrolls_horizontally() {
        let text: String = "abcdefghij".into();
        let display = display_text(&text, 10, 6);
        // Width 6 leaves 5 visible columns; cursor at the end.
        assert_eq!(display.visible, "fghij");
        assert_eq!(display.cursor_offset, 5);
    }
}
