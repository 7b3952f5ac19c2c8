//! Credential entry into the client's login window.
//!
//! [`UiAutomation`] exposes the raw positional primitives of a desktop automation
//! backend. [`LoginForm`] maps them onto the roles of the login screen and reports
//! an explicit error when the window does not have the expected shape.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::state::Credentials;

/// Controls of one kind found in the target window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSet {
    pub count: usize,
}

#[async_trait]
pub trait UiAutomation: Send + Sync {
    async fn focus_target(&self) -> Result<(), AppError>;

    async fn find_edit_controls(&self) -> Result<ControlSet, AppError>;

    async fn input_text(&self, index: usize, text: &str) -> bool;

    async fn find_button_controls(&self) -> Result<ControlSet, AppError>;

    async fn click_button(&self, index: usize) -> bool;
}

/// The login screen seen through its controls' positions.
pub struct LoginForm<'a> {
    automation: &'a dyn UiAutomation,
}

impl<'a> LoginForm<'a> {
    pub const USERNAME_FIELD: usize = 0;
    pub const PASSWORD_FIELD: usize = 1;
    /// Submit sits second to last in the button list.
    pub const SUBMIT_FROM_END: usize = 2;

    pub fn new(automation: &'a dyn UiAutomation) -> Self {
        Self { automation }
    }

    pub fn submit_index(buttons: ControlSet) -> Option<usize> {
        buttons.count.checked_sub(Self::SUBMIT_FROM_END)
    }

    /// Focuses the window, fills both fields and presses submit.
    pub async fn inject(&self, credentials: &Credentials) -> Result<(), AppError> {
        self.automation.focus_target().await?;
        self.fill(credentials).await?;
        self.submit().await
    }

    async fn fill(&self, credentials: &Credentials) -> Result<(), AppError> {
        let edits = self.automation.find_edit_controls().await?;
        debug!(count = edits.count, "🔑 Edit controls located");

        if edits.count <= Self::PASSWORD_FIELD {
            warn!(edit_controls = edits.count, "🔑 ⚠️ Login form has too few fields");
            return Err(AppError::LoginFieldsUnavailable {
                edit_controls: edits.count,
            });
        }

        if !self
            .automation
            .input_text(Self::USERNAME_FIELD, credentials.username())
            .await
        {
            return Err(AppError::Injection("username was not written".into()));
        }

        if !self
            .automation
            .input_text(Self::PASSWORD_FIELD, credentials.password())
            .await
        {
            return Err(AppError::Injection("password was not written".into()));
        }

        Ok(())
    }

    async fn submit(&self) -> Result<(), AppError> {
        let buttons = self.automation.find_button_controls().await?;

        let Some(index) = Self::submit_index(buttons) else {
            warn!(buttons = buttons.count, "🔑 ⚠️ Login form has too few buttons");
            return Err(AppError::LoginSubmitUnavailable {
                buttons: buttons.count,
            });
        };

        debug!(count = buttons.count, index, "🔑 Clicking submit");

        if self.automation.click_button(index).await {
            Ok(())
        } else {
            Err(AppError::Injection(format!("click on button {index} did not register")))
        }
    }
}
