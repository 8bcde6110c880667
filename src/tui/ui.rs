//! Top-level layout: header bar, sidebar, transcript, compose box, status bar.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::app::{App, Pane};
use super::{compose, messages, sidebar};

const SIDEBAR_WIDTH: u16 = 30;

/// Render the whole UI for one frame.
pub fn render(frame: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, rows[0], app);
    render_main(frame, rows[1], app);
    render_status_bar(frame, rows[2], app);
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let connection_style = if app.is_online {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let line = Line::from(vec![
        Span::styled(
            " tindahan ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            app.session_user.full_name(),
            Style::default().fg(Color::White),
        ),
        Span::raw("  "),
        Span::styled(app.connection_state.clone(), connection_style),
    ]);
    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(Color::Black)),
        area,
    );
}

fn render_main(frame: &mut Frame, area: Rect, app: &mut App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
        .split(area);

    sidebar::render(
        columns[0],
        frame.buffer_mut(),
        &app.sidebar,
        app.conversation.peer().map(|p| p.id),
        app.active_pane == Pane::Sidebar,
    );

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(compose::COMPOSE_HEIGHT),
        ])
        .split(columns[1]);

    messages::render(
        right[0],
        frame.buffer_mut(),
        &mut app.messages_view,
        &app.conversation,
        app.active_pane == Pane::Messages,
    );

    let peer_name = app.conversation.peer().map(|p| p.full_name());
    compose::render(
        right[1],
        frame,
        &app.compose,
        peer_name.as_deref(),
        app.active_pane == Pane::Compose,
    );
}

fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let line = if let Some(ref message) = app.status_message {
        let style = if app.status_is_error {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Green)
        };
        Line::from(Span::styled(format!(" {}", message), style))
    } else {
        Line::from(vec![
            Span::styled(
                format!(" [{}] ", app.active_pane.as_str()),
                Style::default().fg(Color::Yellow),
            ),
            Span::styled(
                "Tab: switch pane  /: search  Enter: select/send  q: quit",
                Style::default().fg(Color::DarkGray),
            ),
        ])
    };
    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(Color::Black)),
        area,
    );
}
