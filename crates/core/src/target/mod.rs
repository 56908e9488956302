//! Chat application adapters.
//!
//! Everything that depends on the destination page's DOM lives behind
//! [`ChatTarget`], so a different chat UI can be supported without touching
//! transcript extraction.

pub mod chatgpt;

use async_trait::async_trait;
use serde::Serialize;

use crate::browser::Page;

pub use chatgpt::ChatGptTarget;

/// How the prompt text was put into the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextStrategy {
    Textarea,
    ContentEditable,
    NotFound,
}

/// Which button was picked as the submit control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ButtonPick {
    SendButton,
    /// Zero-based position among the form's buttons.
    Position(usize),
}

/// Best-effort report of a submission. Nothing here is an error: UI
/// mismatches degrade silently and only show up in this report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubmitOutcome {
    pub form_found: bool,
    pub text: Option<TextStrategy>,
    pub button: Option<ButtonPick>,
    pub resent: bool,
    pub fingerprint_clicks: u32,
}

#[async_trait]
pub trait ChatTarget: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the prompt input is on the page yet.
    async fn input_present(&self, page: &Page) -> bool;

    /// Fill the prompt and press whatever submits it.
    async fn submit(&self, page: &Page, prompt: &str) -> SubmitOutcome;
}
