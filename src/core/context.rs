//! Per-call context threaded through every engine operation.
//!
//! A [`Context`] is an immutable handle. Each `with_*` builder returns a new
//! handle and leaves the original untouched, so callers can derive
//! narrower contexts (bulk mode, forced, silent) without global state.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Progress callback: `(done, total)`.
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Password prompt callback. Receives the prompt text.
pub type PasswordPromptFn = Arc<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Import approval callback. Receives a key id, returns whether to import it.
pub type ImportFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Cooperative cancellation flag shared by all clones of a context.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct Inner {
    interactive: bool,
    terminal: bool,
    always_yes: bool,
    force: bool,
    no_network: bool,
    hidden: bool,
    commit: bool,
    fsck_decrypt: bool,
    show_parsing: bool,
    commit_message: Option<String>,
    commit_timestamp: Option<DateTime<Utc>>,
    username: Option<String>,
    email: Option<String>,
    progress: Option<ProgressFn>,
    password_prompt: Option<PasswordPromptFn>,
    import: Option<ImportFn>,
    http_client: Option<reqwest::blocking::Client>,
    cancel: CancelToken,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            interactive: true,
            terminal: false,
            always_yes: false,
            force: false,
            no_network: false,
            hidden: false,
            commit: true,
            fsck_decrypt: false,
            show_parsing: true,
            commit_message: None,
            commit_timestamp: None,
            username: None,
            email: None,
            progress: None,
            password_prompt: None,
            import: None,
            http_client: None,
            cancel: CancelToken::default(),
        }
    }
}

/// Immutable per-call context.
///
/// Defaults: interactive, not a terminal, network on, commits on, parsing on.
#[derive(Clone, Default)]
pub struct Context {
    inner: Arc<Inner>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("interactive", &self.inner.interactive)
            .field("terminal", &self.inner.terminal)
            .field("always_yes", &self.inner.always_yes)
            .field("force", &self.inner.force)
            .field("no_network", &self.inner.no_network)
            .field("commit", &self.inner.commit)
            .field("canceled", &self.is_canceled())
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(&self, f: impl FnOnce(&mut Inner)) -> Self {
        let mut inner = (*self.inner).clone();
        f(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    // --- Flags ---

    pub fn with_interactive(&self, on: bool) -> Self {
        self.with(|i| i.interactive = on)
    }

    pub fn is_interactive(&self) -> bool {
        self.inner.interactive
    }

    pub fn with_terminal(&self, on: bool) -> Self {
        self.with(|i| i.terminal = on)
    }

    pub fn is_terminal(&self) -> bool {
        self.inner.terminal
    }

    pub fn with_always_yes(&self, on: bool) -> Self {
        self.with(|i| i.always_yes = on)
    }

    pub fn is_always_yes(&self) -> bool {
        self.inner.always_yes
    }

    /// Force mode: proceed past unknown recipients and overwrite existing entries.
    pub fn with_force(&self, on: bool) -> Self {
        self.with(|i| i.force = on)
    }

    pub fn is_force(&self) -> bool {
        self.inner.force
    }

    pub fn with_no_network(&self, on: bool) -> Self {
        self.with(|i| i.no_network = on)
    }

    pub fn is_no_network(&self) -> bool {
        self.inner.no_network
    }

    pub fn with_hidden(&self, on: bool) -> Self {
        self.with(|i| i.hidden = on)
    }

    pub fn is_hidden(&self) -> bool {
        self.inner.hidden
    }

    /// Disable per-operation commits (bulk mode). The caller commits once.
    pub fn with_commit(&self, on: bool) -> Self {
        self.with(|i| i.commit = on)
    }

    pub fn is_commit(&self) -> bool {
        self.inner.commit
    }

    pub fn with_fsck_decrypt(&self, on: bool) -> Self {
        self.with(|i| i.fsck_decrypt = on)
    }

    pub fn is_fsck_decrypt(&self) -> bool {
        self.inner.fsck_decrypt
    }

    pub fn with_show_parsing(&self, on: bool) -> Self {
        self.with(|i| i.show_parsing = on)
    }

    pub fn is_show_parsing(&self) -> bool {
        self.inner.show_parsing
    }

    // --- Overrides ---

    pub fn with_commit_message(&self, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        self.with(|i| i.commit_message = Some(msg))
    }

    /// Commit message override, or `default` when none is set.
    pub fn commit_message_or(&self, default: impl Into<String>) -> String {
        self.inner
            .commit_message
            .clone()
            .unwrap_or_else(|| default.into())
    }

    pub fn with_commit_timestamp(&self, ts: DateTime<Utc>) -> Self {
        self.with(|i| i.commit_timestamp = Some(ts))
    }

    /// Commit timestamp override, or now.
    pub fn commit_timestamp(&self) -> DateTime<Utc> {
        self.inner.commit_timestamp.unwrap_or_else(Utc::now)
    }

    pub fn has_commit_timestamp(&self) -> bool {
        self.inner.commit_timestamp.is_some()
    }

    pub fn with_username(&self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.with(|i| i.username = Some(name))
    }

    pub fn username(&self) -> Option<&str> {
        self.inner.username.as_deref()
    }

    pub fn with_email(&self, email: impl Into<String>) -> Self {
        let email = email.into();
        self.with(|i| i.email = Some(email))
    }

    pub fn email(&self) -> Option<&str> {
        self.inner.email.as_deref()
    }

    // --- Callbacks ---

    pub fn with_progress(&self, cb: ProgressFn) -> Self {
        self.with(|i| i.progress = Some(cb))
    }

    /// Report progress if a callback is installed.
    pub fn progress(&self, done: usize, total: usize) {
        if let Some(cb) = &self.inner.progress {
            cb(done, total);
        }
    }

    pub fn with_password_prompt(&self, cb: PasswordPromptFn) -> Self {
        self.with(|i| i.password_prompt = Some(cb))
    }

    /// Ask for a password through the installed callback.
    ///
    /// # Errors
    ///
    /// Returns `Error::Aborted` if no callback is installed.
    pub fn prompt_password(&self, prompt: &str) -> Result<String> {
        match &self.inner.password_prompt {
            Some(cb) => cb(prompt),
            None => Err(Error::Aborted),
        }
    }

    pub fn with_import_callback(&self, cb: ImportFn) -> Self {
        self.with(|i| i.import = Some(cb))
    }

    /// Whether importing the given key is approved.
    ///
    /// Without a callback, imports are approved only for non-interactive runs.
    pub fn approve_import(&self, key: &str) -> bool {
        match &self.inner.import {
            Some(cb) => cb(key),
            None => !self.inner.interactive,
        }
    }

    pub fn with_http_client(&self, client: reqwest::blocking::Client) -> Self {
        self.with(|i| i.http_client = Some(client))
    }

    pub fn http_client(&self) -> Option<&reqwest::blocking::Client> {
        self.inner.http_client.as_ref()
    }

    // --- Cancellation ---

    pub fn with_cancel_token(&self, token: CancelToken) -> Self {
        self.with(|i| i.cancel = token)
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.inner.cancel.clone()
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.cancel.is_canceled()
    }

    /// Fail with `Error::Aborted` if the context was canceled.
    pub fn check_canceled(&self) -> Result<()> {
        if self.is_canceled() {
            Err(Error::Aborted)
        } else {
            Ok(())
        }
    }
}
