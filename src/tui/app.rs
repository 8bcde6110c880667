//! TUI application state and main event loop

use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;
use tokio_stream::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time;

use super::compose::ComposeState;
use super::messages::MessagesState;
use super::sidebar::SidebarState;
use super::ui;
use crate::api::{self, ApiClient};
use crate::chat::{self, Conversation, HistoryToken};
use crate::models::{Message, User};
use crate::realtime::{self, LiveUpdate, Subscription};

/// How long a transient status-bar message stays visible.
const STATUS_TTL: Duration = Duration::from_secs(4);

/// How long the search input must sit idle before a directory fetch fires.
/// One tick of the main loop interval.
const SEARCH_DEBOUNCE: Duration = Duration::from_millis(250);

/// Active pane in the TUI
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    #[default]
    Sidebar,
    Messages,
    Compose,
}

impl Pane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pane::Sidebar => "chats",
            Pane::Messages => "messages",
            Pane::Compose => "compose",
        }
    }

    fn next(self) -> Self {
        match self {
            Pane::Sidebar => Pane::Messages,
            Pane::Messages => Pane::Compose,
            Pane::Compose => Pane::Sidebar,
        }
    }
}

/// Results delivered back to the UI from background API tasks.
pub enum UiEvent {
    Directory {
        seq: u64,
        result: Result<Vec<User>, String>,
    },
    History {
        token: HistoryToken,
        result: Result<Vec<Message>, String>,
    },
    SendSettled {
        result: Result<Option<String>, String>,
    },
}

/// Application state
pub struct App {
    /// Whether the app should exit
    pub should_exit: bool,
    /// Active pane
    pub active_pane: Pane,
    /// The logged-in user driving all filtering
    pub session_user: User,
    /// Conversation state for the selected peer
    pub conversation: Conversation,
    pub sidebar: SidebarState,
    pub messages_view: MessagesState,
    pub compose: ComposeState,
    /// Push channel connectivity (for display)
    pub is_online: bool,
    pub connection_state: String,
    /// Transient status message (the toast equivalent)
    pub status_message: Option<String>,
    pub status_is_error: bool,
    status_set_at: Option<Instant>,

    client: Arc<ApiClient>,
    tx: mpsc::UnboundedSender<UiEvent>,
    live_tx: mpsc::UnboundedSender<LiveUpdate>,
    /// At most one live-event subscription per mounted view; released on drop.
    subscription: Option<Subscription>,
    /// Generation counter for directory fetches; stale results are dropped.
    directory_seq: u64,
    /// Last edit to the search keyword; fetch fires once it sits idle.
    search_edited_at: Option<Instant>,
}

impl App {
    fn new(
        client: Arc<ApiClient>,
        session_user: User,
        tx: mpsc::UnboundedSender<UiEvent>,
        live_tx: mpsc::UnboundedSender<LiveUpdate>,
    ) -> Self {
        let conversation = Conversation::new(session_user.id);
        Self {
            should_exit: false,
            active_pane: Pane::default(),
            session_user,
            conversation,
            sidebar: SidebarState::default(),
            messages_view: MessagesState::default(),
            compose: ComposeState::default(),
            is_online: false,
            connection_state: "Offline".to_string(),
            status_message: None,
            status_is_error: false,
            status_set_at: None,
            client,
            tx,
            live_tx,
            subscription: None,
            directory_seq: 0,
            search_edited_at: None,
        }
    }

    // -- background fetches --------------------------------------------------

    /// Kick off a directory fetch for the current search keyword.
    fn refresh_directory(&mut self) {
        self.directory_seq += 1;
        let seq = self.directory_seq;
        self.sidebar.loading = true;

        let client = self.client.clone();
        let search = self.sidebar.search.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api::directory(&client, &search)
                .await
                .map_err(|e| format!("{:#}", e));
            let _ = tx.send(UiEvent::Directory { seq, result });
        });
    }

    /// Select a peer: reset the transcript, fetch its history, and make
    /// sure the live subscription is up. Acquiring is idempotent, so
    /// re-selecting never stacks a second listener.
    fn select_peer(&mut self, peer: User) {
        let peer_id = peer.id;
        let token = self.conversation.select_peer(peer);
        self.messages_view.reset();
        self.ensure_subscription();
        self.fetch_history(token, peer_id);
    }

    fn fetch_history(&self, token: HistoryToken, peer_id: i64) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api::get_messages(&client, peer_id)
                .await
                .map_err(|e| format!("{:#}", e));
            let _ = tx.send(UiEvent::History { token, result });
        });
    }

    fn ensure_subscription(&mut self) {
        if self.subscription.is_some() {
            return;
        }
        match realtime::broadcaster_settings(self.client.config()) {
            Ok((key, cluster)) => {
                self.connection_state = "Connecting".to_string();
                self.subscription = Some(Subscription::spawn(key, cluster, self.live_tx.clone()));
            }
            Err(e) => {
                // Live updates are optional; history refetch still works.
                tracing::warn!("{:#}", e);
                self.connection_state = "Live updates off".to_string();
            }
        }
    }

    /// Validate and submit the composer. One send per submit; the input is
    /// frozen until the mutation settles.
    fn submit_compose(&mut self) {
        if self.compose.sending {
            return;
        }
        let Some(peer) = self.conversation.peer() else {
            self.set_status("Select a conversation first", true);
            return;
        };
        let peer_id = peer.id;

        match chat::validate_content(&self.compose.input) {
            Err(e) => {
                self.compose.error = Some(e.to_string());
            }
            Ok(content) => {
                self.compose.error = None;
                self.compose.sending = true;

                let client = self.client.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = api::send_message_with_client(&client, peer_id, &content)
                        .await
                        .map(|envelope| envelope.message)
                        .map_err(|e| format!("{:#}", e));
                    let _ = tx.send(UiEvent::SendSettled { result });
                });
            }
        }
    }

    // -- event handling ------------------------------------------------------

    pub fn handle_ui_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Directory { seq, result } => {
                if seq != self.directory_seq {
                    return;
                }
                match result {
                    Ok(users) => self.sidebar.update_users(users),
                    Err(e) => {
                        self.sidebar.loading = false;
                        self.set_status(&e, true);
                    }
                }
            }
            UiEvent::History { token, result } => match result {
                Ok(messages) => {
                    if self.conversation.apply_history(token, messages) {
                        self.messages_view.jump_to_bottom();
                    }
                }
                Err(e) => {
                    self.conversation.history_failed(token);
                    self.set_status(&e, true);
                }
            },
            UiEvent::SendSettled { result } => {
                self.compose.sending = false;
                // Settle hook: history goes stale on success and failure alike.
                self.conversation.invalidate_history();

                match result {
                    Ok(message) => {
                        self.compose.clear();
                        if let Some(message) = message {
                            self.set_status(&message, false);
                        }
                    }
                    Err(e) => {
                        // Keep the typed content for manual resubmission.
                        self.set_status(&e, true);
                    }
                }

                if self.conversation.take_invalidated() {
                    if let Some(token) = self.conversation.refresh_token() {
                        if let Some(peer) = self.conversation.peer() {
                            self.fetch_history(token, peer.id);
                        }
                    }
                }
            }
        }
    }

    pub fn handle_live_update(&mut self, update: LiveUpdate) {
        match update {
            LiveUpdate::Connected => {
                self.is_online = true;
                self.connection_state = "Connected".to_string();
            }
            LiveUpdate::Disconnected(reason) => {
                self.is_online = false;
                self.connection_state = "Reconnecting".to_string();
                tracing::debug!("Push channel down: {}", reason);
            }
            LiveUpdate::Message(message) => {
                if self.conversation.apply_live_event(&message) {
                    self.messages_view.jump_to_bottom();
                }
            }
        }
    }

    pub fn handle_terminal_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Resize(_, _) => {
                // Terminal resized - will be handled on next draw
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        // Ctrl+C always exits.
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_exit = true;
            return;
        }

        if self.sidebar.searching {
            self.handle_search_key(key);
            return;
        }

        match key.code {
            KeyCode::Tab => {
                self.active_pane = self.active_pane.next();
                return;
            }
            KeyCode::Char('q') if self.active_pane != Pane::Compose => {
                self.should_exit = true;
                return;
            }
            _ => {}
        }

        match self.active_pane {
            Pane::Sidebar => self.handle_sidebar_key(key),
            Pane::Messages => self.handle_messages_key(key),
            Pane::Compose => self.handle_compose_key(key),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => {
                self.sidebar.searching = false;
            }
            KeyCode::Backspace => {
                self.sidebar.search.pop();
                self.search_edited_at = Some(Instant::now());
            }
            KeyCode::Char(c) => {
                self.sidebar.search.push(c);
                self.search_edited_at = Some(Instant::now());
            }
            _ => {}
        }
    }

    /// Debounced directory refresh: fires once the search keyword has been
    /// idle for a full tick, so a typing burst costs one request.
    fn flush_search(&mut self) {
        if let Some(at) = self.search_edited_at {
            if at.elapsed() >= SEARCH_DEBOUNCE {
                self.search_edited_at = None;
                self.refresh_directory();
            }
        }
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.sidebar.select_previous(),
            KeyCode::Down => self.sidebar.select_next(),
            KeyCode::Char('/') => {
                self.sidebar.searching = true;
            }
            KeyCode::Enter => {
                if let Some(user) = self.sidebar.current_user().cloned() {
                    self.select_peer(user);
                    self.active_pane = Pane::Compose;
                }
            }
            _ => {}
        }
    }

    fn handle_messages_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.messages_view.scroll_up(1),
            KeyCode::Down => self.messages_view.scroll_down(1),
            KeyCode::PageUp => self.messages_view.scroll_up(10),
            KeyCode::PageDown => self.messages_view.scroll_down(10),
            KeyCode::End => self.messages_view.jump_to_bottom(),
            _ => {}
        }
    }

    fn handle_compose_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.submit_compose(),
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.compose.clear();
            }
            KeyCode::Char(c) => self.compose.insert_char(c),
            KeyCode::Backspace => self.compose.backspace(),
            KeyCode::Delete => self.compose.delete(),
            KeyCode::Left => self.compose.move_left(),
            KeyCode::Right => self.compose.move_right(),
            KeyCode::Home => self.compose.move_home(),
            KeyCode::End => self.compose.move_end(),
            _ => {}
        }
    }

    // -- status bar ----------------------------------------------------------

    fn set_status(&mut self, message: &str, is_error: bool) {
        self.status_message = Some(message.to_string());
        self.status_is_error = is_error;
        self.status_set_at = Some(Instant::now());
    }

    pub fn expire_status(&mut self) {
        if let Some(at) = self.status_set_at {
            if at.elapsed() >= STATUS_TTL {
                self.status_message = None;
                self.status_set_at = None;
            }
        }
    }

    /// Render the UI
    pub fn render(&mut self, frame: &mut ratatui::Frame) {
        ui::render(frame, self);
    }
}

/// Run the TUI application with terminal restore on exit.
pub async fn run() -> Result<()> {
    let client = Arc::new(ApiClient::new()?);

    // Session resolver: prefer a fresh /api/me, fall back to the profile
    // cached at login. Without an identity there is nothing to filter on.
    let session_user = match api::me(&client).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!("Could not refresh session user: {:#}", e);
            client
                .session_user()
                .context("No session available. Run 'tindahan-cli login'.")?
        }
    };

    let mut terminal = ratatui::init();
    let result = run_app(&mut terminal, client, session_user).await;
    ratatui::restore();
    result
}

async fn run_app(
    terminal: &mut DefaultTerminal,
    client: Arc<ApiClient>,
    session_user: User,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (live_tx, mut live_rx) = mpsc::unbounded_channel();

    let mut app = App::new(client, session_user, tx, live_tx);
    app.refresh_directory();

    let mut events = EventStream::new();
    let mut tick = time::interval(Duration::from_millis(250));

    while !app.should_exit {
        terminal.draw(|frame| app.render(frame))?;

        tokio::select! {
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(event)) => app.handle_terminal_event(event),
                    Some(Err(e)) => return Err(e).context("Terminal event error"),
                    None => break,
                }
            }
            Some(ui_event) = rx.recv() => {
                app.handle_ui_event(ui_event);
            }
            Some(update) = live_rx.recv() => {
                app.handle_live_update(update);
            }
            _ = tick.tick() => {
                app.expire_status();
                app.flush_search();
            }
        }
    }

    // Dropping `app` releases the live subscription with it.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StoredToken;
    use crate::config::Config;

    fn test_app(
        tx: mpsc::UnboundedSender<UiEvent>,
        live_tx: mpsc::UnboundedSender<LiveUpdate>,
    ) -> App {
        let config = Config {
            auth_token: Some(StoredToken::new("tok".into(), None)),
            ..Default::default()
        };
        App::new(
            Arc::new(ApiClient::from_config(config)),
            User {
                id: 7,
                first_name: "Maria".into(),
                last_name: "Santos".into(),
                ..Default::default()
            },
            tx,
            live_tx,
        )
    }

    #[test]
    fn search_typing_burst_coalesces_into_one_fetch() {
        tokio_test::block_on(async {
            let (tx, _rx) = mpsc::unbounded_channel();
            let (live_tx, _live_rx) = mpsc::unbounded_channel();
            let mut app = test_app(tx, live_tx);
            app.sidebar.searching = true;
            let seq = app.directory_seq;

            for c in "mari".chars() {
                app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
            }
            assert_eq!(app.sidebar.search, "mari");
            // Keystrokes only mark the input dirty; nothing fetched yet.
            assert_eq!(app.directory_seq, seq);

            // Tick while still inside the idle window: still nothing.
            app.flush_search();
            assert_eq!(app.directory_seq, seq);

            // Idle past the window: exactly one fetch, then quiet again.
            app.search_edited_at = Some(Instant::now() - SEARCH_DEBOUNCE);
            app.flush_search();
            assert_eq!(app.directory_seq, seq + 1);
            app.flush_search();
            assert_eq!(app.directory_seq, seq + 1);
        });
    }
}
