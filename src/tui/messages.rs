//! Messages pane: renders the conversation transcript.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use unicode_width::UnicodeWidthStr;

use crate::chat::Conversation;
use crate::models::Message;

/// View state for the transcript: scrolling only; the message data itself
/// lives in `chat::Conversation`.
pub struct MessagesState {
    /// Vertical scroll offset in rendered lines (0 = top).
    pub scroll_offset: usize,
    /// When set, the view follows the newest message (scroll-to-bottom on
    /// history load and live events).
    pub stick_to_bottom: bool,
}

impl Default for MessagesState {
    fn default() -> Self {
        Self {
            scroll_offset: 0,
            stick_to_bottom: true,
        }
    }
}

impl MessagesState {
    /// Reset scrolling for a fresh conversation.
    pub fn reset(&mut self) {
        self.scroll_offset = 0;
        self.stick_to_bottom = true;
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
        self.stick_to_bottom = false;
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
    }

    pub fn jump_to_bottom(&mut self) {
        self.stick_to_bottom = true;
    }
}

/// Render the messages pane into the given area.
pub fn render(
    area: Rect,
    buf: &mut Buffer,
    state: &mut MessagesState,
    conversation: &Conversation,
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
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    // First line: conversation header.
    let header = match conversation.peer() {
        Some(peer) => peer.full_name(),
        None => "Select a chat".to_string(),
    };
    let header_area = Rect::new(inner.x, inner.y, inner.width, 1);
    Paragraph::new(Line::from(Span::styled(
        format!(" {} ", header),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )))
    .style(Style::default().bg(Color::DarkGray))
    .render(header_area, buf);

    let body_area = Rect::new(
        inner.x,
        inner.y + 1,
        inner.width,
        inner.height.saturating_sub(1),
    );
    if body_area.height == 0 {
        return;
    }

    if conversation.peer().is_none() {
        Paragraph::new(Line::from(Span::styled(
            " Pick someone from the directory to start chatting.",
            Style::default().fg(Color::DarkGray),
        )))
        .render(body_area, buf);
        return;
    }

    if conversation.is_loading() && conversation.messages().is_empty() {
        Paragraph::new(Line::from(Span::styled(
            " loading...",
            Style::default().fg(Color::DarkGray),
        )))
        .render(body_area, buf);
        return;
    }

    if conversation.messages().is_empty() {
        Paragraph::new(Line::from(Span::styled(
            " (no messages yet)",
            Style::default().fg(Color::DarkGray),
        )))
        .render(body_area, buf);
        return;
    }

    let all_lines = build_transcript_lines(
        conversation.messages(),
        conversation.session_user_id(),
        conversation.peer().map(|p| p.full_name()).unwrap_or_default(),
        body_area.width as usize,
    );
    let total_lines = all_lines.len();
    let visible_height = body_area.height as usize;
    let max_scroll = total_lines.saturating_sub(visible_height);

    if state.stick_to_bottom {
        state.scroll_offset = max_scroll;
    } else {
        state.scroll_offset = state.scroll_offset.min(max_scroll);
        if state.scroll_offset == max_scroll {
            // Scrolled back down to the end; resume following.
            state.stick_to_bottom = true;
        }
    }

    for (row, line_idx) in (state.scroll_offset..total_lines)
        .take(visible_height)
        .enumerate()
    {
        let y = body_area.y + row as u16;
        let line_area = Rect::new(body_area.x, y, body_area.width, 1);
        Paragraph::new(all_lines[line_idx].clone()).render(line_area, buf);
    }

    // Scroll indicators.
    if total_lines > visible_height {
        let indicator_x = body_area.x + body_area.width.saturating_sub(1);
        if state.scroll_offset > 0 {
            let cell = &mut buf[(indicator_x, body_area.y)];
            cell.set_char('^');
            cell.set_style(Style::default().fg(Color::DarkGray));
        }
        if state.scroll_offset + visible_height < total_lines {
            let bottom_y = body_area.y + body_area.height.saturating_sub(1);
            let cell = &mut buf[(indicator_x, bottom_y)];
            cell.set_char('v');
            cell.set_style(Style::default().fg(Color::DarkGray));
        }
    }
}

/// Build the flat line buffer for the transcript. Outgoing messages are
/// right-aligned, incoming left-aligned, each followed by a dim timestamp.
fn build_transcript_lines(
    messages: &[Message],
    session_user_id: i64,
    peer_name: String,
    width: usize,
) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let content_width = width.saturating_sub(4).max(10);

    for msg in messages {
        let outgoing = msg.sender_id == session_user_id;
        let sender = if outgoing {
            "you".to_string()
        } else {
            peer_name.clone()
        };

        let sender_style = if outgoing {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD)
        };

        let body_lines = wrap_text(&msg.content, content_width);
        let widest = body_lines.iter().map(|l| l.width()).max().unwrap_or(0);
        let indent = if outgoing {
            width.saturating_sub(widest + 2)
        } else {
            2
        };
        let indent_str = " ".repeat(indent);

        lines.push(Line::from(Span::styled(
            format!("{}{}", indent_str, sender),
            sender_style,
        )));
        for body in &body_lines {
            lines.push(Line::from(Span::raw(format!("{}{}", indent_str, body))));
        }
        lines.push(Line::from(Span::styled(
            format!("{}{}", indent_str, msg.display_time()),
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(""));
    }

    lines
}

/// Simple word-wrapping: split content by newlines first, then wrap long lines.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![];
    }
    let mut result = Vec::new();
    for line in text.lines() {
        if line.width() <= max_width {
            result.push(line.to_string());
        } else {
            let words: Vec<&str> = line.split_whitespace().collect();
            let mut current = String::new();
            for word in words {
                if current.is_empty() {
                    current = word.to_string();
                } else if current.width() + 1 + word.width() <= max_width {
                    current.push(' ');
                    current.push_str(word);
                } else {
                    result.push(current);
                    current = word.to_string();
                }
            }
            if !current.is_empty() {
                result.push(current);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_text_respects_width() {
        let wrapped = wrap_text("one two three four five", 9);
        assert_eq!(wrapped, vec!["one two", "three", "four five"]);
    }

    #[test]
    fn wrap_text_preserves_explicit_newlines() {
        let wrapped = wrap_text("first\nsecond", 40);
        assert_eq!(wrapped, vec!["first", "second"]);
    }

    #[test]
    fn scroll_up_stops_following_bottom() {
        let mut state = MessagesState::default();
        assert!(state.stick_to_bottom);
        state.scroll_up(3);
        assert!(!state.stick_to_bottom);
        state.jump_to_bottom();
        assert!(state.stick_to_bottom);
    }

    #[test]
    fn transcript_lines_alternate_alignment() {
        let messages = vec![
            Message {
                id: 1,
                sender_id: 7,
                recipient_id: 3,
                content: "hello".into(),
                created_at: "2024-05-01T10:00:00+08:00".into(),
                recipient: None,
            },
            Message {
                id: 2,
                sender_id: 3,
                recipient_id: 7,
                content: "hi".into(),
                created_at: "2024-05-01T10:01:00+08:00".into(),
                recipient: None,
            },
        ];
        let lines = build_transcript_lines(&messages, 7, "Maria Santos".into(), 40);
        // Outgoing message header says "you", incoming carries the peer name.
        let rendered: Vec<String> = lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.clone()).collect())
            .collect();
        assert!(rendered.iter().any(|l| l.trim_start().starts_with("you")));
        assert!(rendered
            .iter()
            .any(|l| l.trim_start().starts_with("Maria Santos")));
    }
}
