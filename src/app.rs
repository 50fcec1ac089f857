use anyhow::{anyhow, Result};
use tokio::task::JoinHandle;

use crate::api::ApiClient;
use crate::config::Config;
use crate::history::Conversation;
use crate::session::{RouteOutcome, Screen, SessionStore};
use crate::storage::Storage;
use crate::upload::UploadForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Focusable fields of the employee login form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Password,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// Toast analog: one transient line at the bottom of the screen.
#[derive(Debug, Clone)]
pub struct StatusLine {
    pub text: String,
    pub kind: StatusKind,
}

/// An in-flight chat call, correlated to its originating turn by id so the
/// completion lands on the right turn regardless of ordering.
pub struct PendingChat {
    pub turn_id: String,
    pub task: JoinHandle<Result<String>>,
}

pub struct App {
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,

    // Auth state
    pub session: SessionStore,
    pub show_employee_form: bool,
    pub login_email: String,
    pub login_password: String,
    pub login_focus: LoginField,
    pub pending_login: Option<JoinHandle<Result<String>>>,
    /// Where a denied navigation wanted to go; honored after login.
    pub redirect_after_login: Option<Screen>,

    // Chat state
    pub conversation: Conversation,
    pub chat_input: String,
    pub chat_cursor: usize,
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub chat_total_lines: u16,
    pub pending_chats: Vec<PendingChat>,

    // Upload state
    pub upload_form: UploadForm,
    pub pending_upload: Option<JoinHandle<Result<()>>>,

    pub status: Option<StatusLine>,
    pub animation_frame: u8,

    pub storage: Storage,
    pub api: ApiClient,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = Config::load().unwrap_or_else(|_| Config::new());
        let api = ApiClient::new(&config)?;
        let storage = Storage::open()?;
        let session = SessionStore::load(storage.clone());

        // Restore the persisted conversation for a returning employee.
        let conversation = match session.session().identity.as_deref() {
            Some(identity) if session.session().is_employee() => {
                Conversation::load(&storage, identity)
            }
            _ => Conversation::new(),
        };

        let screen = match session.guard(Screen::Chat) {
            RouteOutcome::Allow => Screen::Chat,
            _ => Screen::Login,
        };

        Ok(Self {
            should_quit: false,
            screen,
            input_mode: InputMode::Normal,

            session,
            show_employee_form: false,
            login_email: String::new(),
            login_password: String::new(),
            login_focus: LoginField::Email,
            pending_login: None,
            redirect_after_login: None,

            conversation,
            chat_input: String::new(),
            chat_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_total_lines: 0,
            pending_chats: Vec::new(),

            upload_form: UploadForm::default(),
            pending_upload: None,

            status: None,
            animation_frame: 0,

            storage,
            api,
        })
    }

    /// Route-guarded navigation. Denied requests land on Login (remembering
    /// the target) or fall back to Chat for under-privileged roles.
    pub fn navigate(&mut self, wanted: Screen) {
        match self.session.guard(wanted) {
            RouteOutcome::Allow => {
                self.screen = wanted;
                self.input_mode = InputMode::Normal;
            }
            RouteOutcome::RedirectToLogin { wanted } => {
                self.redirect_after_login = Some(wanted);
                self.screen = Screen::Login;
                self.input_mode = InputMode::Normal;
            }
            RouteOutcome::RedirectToChat => {
                self.screen = Screen::Chat;
                self.input_mode = InputMode::Normal;
                self.set_status("Upload is for employees only.", StatusKind::Info);
            }
        }
    }

    fn post_login_screen(&mut self) -> Screen {
        self.redirect_after_login.take().unwrap_or(Screen::Chat)
    }

    pub fn login_as_guest(&mut self) {
        self.session.login_as_guest();
        // Guest conversations are memory-only and start fresh.
        self.conversation = Conversation::new();
        self.set_status("Logged in as Guest!", StatusKind::Success);
        let target = self.post_login_screen();
        self.navigate(target);
    }

    /// Kick off the remote employee login. Completion is applied in
    /// [`App::poll_pending`].
    pub fn submit_employee_login(&mut self) {
        if self.pending_login.is_some() {
            return;
        }
        let email = self.login_email.trim().to_string();
        let password = self.login_password.clone();
        if email.is_empty() || password.is_empty() {
            self.set_status("Please enter email and password.", StatusKind::Error);
            return;
        }
        let api = self.api.clone();
        self.pending_login = Some(tokio::spawn(async move {
            api.login(&email, &password).await
        }));
    }

    pub fn logout(&mut self) {
        self.session.logout();
        // Persisted history stays; only the in-memory list is dropped so the
        // next login cannot see the previous identity's turns.
        self.conversation = Conversation::new();
        self.pending_chats.clear();
        self.chat_input.clear();
        self.chat_cursor = 0;
        self.screen = Screen::Login;
        self.show_employee_form = false;
        self.set_status("Logged out.", StatusKind::Info);
    }

    /// Submit the chat input: append a turn and spawn the remote call.
    /// Whitespace-only input is a no-op.
    pub fn submit_chat(&mut self) {
        let text = self.chat_input.clone();
        let Some(turn_id) = self.conversation.submit(&text) else {
            return;
        };
        self.chat_input.clear();
        self.chat_cursor = 0;
        self.persist_history();
        self.scroll_chat_to_bottom();

        let api = self.api.clone();
        let role = self
            .session
            .session()
            .role
            .map(|r| r.as_str())
            .unwrap_or("unknown")
            .to_string();
        let query = text.trim().to_string();
        let task = tokio::spawn(async move { api.chat(&role, &query).await });
        self.pending_chats.push(PendingChat { turn_id, task });
    }

    /// Clear the conversation and its persisted entry for the current
    /// identity.
    pub fn clear_history(&mut self) {
        self.conversation.clear();
        self.persist_history();
        self.chat_scroll = 0;
        self.set_status("Chat history cleared.", StatusKind::Info);
    }

    pub fn submit_upload(&mut self) {
        if self.pending_upload.is_some() {
            return;
        }
        if let Err(msg) = self.upload_form.validate() {
            self.set_status(msg, StatusKind::Error);
            return;
        }
        let form = self.upload_form.clone();
        let role = self.session.session().role;
        let api = self.api.clone();
        self.pending_upload = Some(tokio::spawn(async move {
            let payload = form.build_payload(role).await?;
            api.upload(&payload).await
        }));
    }

    /// Reap finished background tasks and apply their results. Called from
    /// the event loop on every tick; each completion touches only the state
    /// it was spawned for.
    pub async fn poll_pending(&mut self) {
        self.poll_chats().await;
        self.poll_login().await;
        self.poll_upload().await;
    }

    /// Apply each finished chat reply to its own turn, leaving unfinished
    /// calls in flight.
    async fn poll_chats(&mut self) {
        let mut i = 0;
        while i < self.pending_chats.len() {
            if self.pending_chats[i].task.is_finished() {
                let pending = self.pending_chats.swap_remove(i);
                let result = match pending.task.await {
                    Ok(result) => result,
                    Err(e) => Err(anyhow!("chat task panicked: {}", e)),
                };
                self.conversation.complete(&pending.turn_id, result);
                self.persist_history();
                self.scroll_chat_to_bottom();
            } else {
                i += 1;
            }
        }
    }

    async fn poll_login(&mut self) {
        let Some(task) = self.pending_login.take() else {
            return;
        };
        if !task.is_finished() {
            self.pending_login = Some(task);
            return;
        }
        let result = match task.await {
            Ok(result) => result,
            Err(e) => Err(anyhow!("login task panicked: {}", e)),
        };
        match result {
            Ok(identity) => {
                self.session.login_as_employee(&identity);
                self.conversation = Conversation::load(&self.storage, &identity);
                self.login_email.clear();
                self.login_password.clear();
                self.show_employee_form = false;
                self.set_status("Logged in as Employee!", StatusKind::Success);
                let target = self.post_login_screen();
                self.navigate(target);
            }
            Err(e) => {
                self.set_status(&e.to_string(), StatusKind::Error);
            }
        }
    }

    async fn poll_upload(&mut self) {
        let Some(task) = self.pending_upload.take() else {
            return;
        };
        if !task.is_finished() {
            self.pending_upload = Some(task);
            return;
        }
        let result = match task.await {
            Ok(result) => result,
            Err(e) => Err(anyhow!("upload task panicked: {}", e)),
        };
        match result {
            Ok(()) => {
                self.upload_form.reset();
                self.set_status(
                    "Your knowledge is uploaded successfully!",
                    StatusKind::Success,
                );
            }
            Err(e) => {
                self.set_status(&e.to_string(), StatusKind::Error);
            }
        }
    }

    /// Save the turn list for the active employee identity. Guests and
    /// unauthenticated sessions keep history in memory only.
    fn persist_history(&self) {
        if !self.session.session().is_employee() {
            return;
        }
        if let Some(identity) = self.session.session().identity.as_deref() {
            self.conversation.save(&self.storage, identity);
        }
    }

    pub fn set_status(&mut self, text: &str, kind: StatusKind) {
        self.status = Some(StatusLine {
            text: text.to_string(),
            kind,
        });
    }

    pub fn is_waiting_for_reply(&self) -> bool {
        !self.pending_chats.is_empty()
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_waiting_for_reply() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Chat scrolling
    pub fn scroll_chat_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_chat_down(&mut self) {
        let max = self.chat_total_lines.saturating_sub(self.chat_height);
        if self.chat_scroll < max {
            self.chat_scroll = self.chat_scroll.saturating_add(1);
        }
    }

    /// Scroll so the newest turn (or the "Thinking..." indicator) is
    /// visible. Uses the chat area dimensions captured during the last
    /// render.
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        for turn in self.conversation.turns() {
            total_lines = total_lines.saturating_add(wrapped_line_count(&turn.user_text, wrap_width) + 1);
            if let Some(bot) = &turn.bot_text {
                total_lines = total_lines.saturating_add(wrapped_line_count(bot, wrap_width) + 1);
            }
            total_lines = total_lines.saturating_add(1); // blank line between turns
        }
        if self.is_waiting_for_reply() {
            total_lines = total_lines.saturating_add(2); // "Bot:" + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }
}

/// Rough wrapped-line count for scroll math. Uses character count, not byte
/// length, for proper UTF-8 handling.
fn wrapped_line_count(text: &str, wrap_width: usize) -> u16 {
    let mut lines: u16 = 0;
    for line in text.lines() {
        let char_count = line.chars().count();
        if char_count == 0 {
            lines = lines.saturating_add(1);
        } else {
            lines = lines.saturating_add(((char_count / wrap_width) + 1) as u16);
        }
    }
    lines.max(1)
}
