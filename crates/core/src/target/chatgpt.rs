use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use super::{ButtonPick, ChatTarget, SubmitOutcome, TextStrategy};
use crate::browser::{Page, js_string};

pub const DEFAULT_CHAT_URL: &str = "https://chat.openai.com";

/// Anything matching this counts as "the input is on the page".
pub const INPUT_SELECTOR: &str = "main form textarea, #prompt-textarea";
pub const FORM_SELECTOR: &str = "main form";
pub const SEND_BUTTON_SELECTOR: &str = r#"[data-testid="send-button"]"#;
pub const ICON_PATH_SELECTOR: &str = "main button svg path";

/// Leading `d` attribute of the stop/regenerate icon. Buttons carrying it get
/// one more click once the page has settled.
pub const SEND_ICON_PATH_PREFIX: &str = "M15.1918 8.90615C15.6381";

/// What the page's form looked like at submit time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSnapshot {
    pub button_count: usize,
    pub has_send_button: bool,
    pub textarea_visible: bool,
    pub has_prompt_editable: bool,
}

pub fn resolve_text_strategy(form: &FormSnapshot) -> TextStrategy {
    if form.textarea_visible {
        TextStrategy::Textarea
    } else if form.has_prompt_editable {
        TextStrategy::ContentEditable
    } else {
        TextStrategy::NotFound
    }
}

/// Pick the submit button from the form layout.
///
/// The send button wins when it exists among two or more buttons. Otherwise
/// position decides: third of three, or second of two.
pub fn resolve_send_button(form: &FormSnapshot) -> Option<ButtonPick> {
    match form.button_count {
        n if n >= 2 && form.has_send_button => Some(ButtonPick::SendButton),
        3 => Some(ButtonPick::Position(2)),
        2 => Some(ButtonPick::Position(1)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SubmitTimings {
    /// From the first click to the send-button re-click.
    pub resend_delay: Duration,
    /// From the first click to the icon fingerprint scan.
    pub fingerprint_scan_delay: Duration,
}

impl Default for SubmitTimings {
    fn default() -> Self {
        Self {
            resend_delay: Duration::from_millis(500),
            fingerprint_scan_delay: Duration::from_millis(4000),
        }
    }
}

/// Adapter for the ChatGPT web UI.
#[derive(Debug, Clone, Default)]
pub struct ChatGptTarget {
    timings: SubmitTimings,
}

impl ChatGptTarget {
    pub fn new(timings: SubmitTimings) -> Self {
        Self { timings }
    }

    async fn snapshot(&self, page: &Page) -> Option<FormSnapshot> {
        let expr = format!(
            r##"(() => {{
  const form = document.querySelector({form});
  if (!form) return null;
  const textarea = form.querySelector("textarea");
  return {{
    buttonCount: form.querySelectorAll("button").length,
    hasSendButton: form.querySelector({send}) !== null,
    textareaVisible: !!textarea && textarea.offsetParent !== null,
    hasPromptEditable: form.querySelector("#prompt-textarea") !== null,
  }};
}})()"##,
            form = js_string(FORM_SELECTOR),
            send = js_string(SEND_BUTTON_SELECTOR),
        );
        match page.evaluate_as::<Option<FormSnapshot>>(&expr).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(err = %e, "could not inspect chat form");
                None
            }
        }
    }

    async fn fill(&self, page: &Page, strategy: TextStrategy, prompt: &str) {
        let prompt = js_string(prompt);
        let form = js_string(FORM_SELECTOR);
        let expr = match strategy {
            TextStrategy::Textarea => format!(
                r#"(() => {{
  const el = document.querySelector({form}).querySelector("textarea");
  el.value = {prompt};
  el.dispatchEvent(new Event("input", {{ bubbles: true }}));
  return true;
}})()"#
            ),
            TextStrategy::ContentEditable => format!(
                r##"(() => {{
  const el = document.querySelector({form}).querySelector("#prompt-textarea");
  el.textContent = {prompt};
  return true;
}})()"##
            ),
            TextStrategy::NotFound => return,
        };
        if let Err(e) = page.evaluate(&expr).await {
            warn!(?strategy, err = %e, "could not fill prompt");
        }
    }

    async fn click(&self, page: &Page, pick: ButtonPick) -> bool {
        let button = match pick {
            ButtonPick::SendButton => format!("form.querySelector({})", js_string(SEND_BUTTON_SELECTOR)),
            ButtonPick::Position(i) => format!(r#"form.querySelectorAll("button")[{i}]"#),
        };
        let expr = format!(
            r#"(() => {{
  const form = document.querySelector({form});
  if (!form) return false;
  const button = {button};
  if (!button) return false;
  button.removeAttribute("disabled");
  button.click();
  return true;
}})()"#,
            form = js_string(FORM_SELECTOR),
        );
        match page.evaluate_as::<bool>(&expr).await {
            Ok(clicked) => clicked,
            Err(e) => {
                warn!(?pick, err = %e, "could not click submit button");
                false
            }
        }
    }

    async fn resend(&self, page: &Page) -> bool {
        let expr = format!(
            r#"(() => {{
  const button = document.querySelector({selector});
  if (!button) return false;
  button.click();
  return true;
}})()"#,
            selector = js_string(&format!("{FORM_SELECTOR} {SEND_BUTTON_SELECTOR}")),
        );
        page.evaluate_as::<bool>(&expr).await.unwrap_or(false)
    }

    async fn click_by_icon(&self, page: &Page) -> u32 {
        let expr = format!(
            r#"(() => {{
  let clicks = 0;
  document.querySelectorAll({paths}).forEach((path) => {{
    const d = path.getAttribute("d");
    if (!d || !d.startsWith({prefix})) return;
    const button = path.closest("button");
    if (button) {{ button.click(); clicks += 1; }}
  }});
  return clicks;
}})()"#,
            paths = js_string(ICON_PATH_SELECTOR),
            prefix = js_string(SEND_ICON_PATH_PREFIX),
        );
        page.evaluate_as::<u32>(&expr).await.unwrap_or(0)
    }
}

#[async_trait]
impl ChatTarget for ChatGptTarget {
    fn name(&self) -> &'static str {
        "chatgpt"
    }

    async fn input_present(&self, page: &Page) -> bool {
        let expr = format!(
            "document.querySelector({}) !== null",
            js_string(INPUT_SELECTOR)
        );
        match page.evaluate_as::<bool>(&expr).await {
            Ok(present) => present,
            Err(e) => {
                debug!(err = %e, "input check failed");
                false
            }
        }
    }

    async fn submit(&self, page: &Page, prompt: &str) -> SubmitOutcome {
        let mut outcome = SubmitOutcome::default();

        let Some(form) = self.snapshot(page).await else {
            info!("chat form not found, nothing submitted");
            return outcome;
        };
        outcome.form_found = true;

        let strategy = resolve_text_strategy(&form);
        self.fill(page, strategy, prompt).await;
        outcome.text = Some(strategy);

        let Some(pick) = resolve_send_button(&form) else {
            info!(buttons = form.button_count, "no submit button matched");
            return outcome;
        };
        outcome.button = Some(pick);

        if !self.click(page, pick).await {
            debug!(?pick, "submit button vanished before click");
        }

        // Both follow-ups are scheduled from the first click.
        let clicked_at = Instant::now();
        sleep_until(clicked_at + self.timings.resend_delay).await;
        outcome.resent = self.resend(page).await;

        sleep_until(clicked_at + self.timings.fingerprint_scan_delay).await;
        outcome.fingerprint_clicks = self.click_by_icon(page).await;

        info!(?outcome, "prompt submitted");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tokio::time::Instant;

    use super::*;
    use crate::browser::{TabId, fake::FakeBrowser};

    fn form(buttons: usize, send: bool) -> FormSnapshot {
        FormSnapshot {
            button_count: buttons,
            has_send_button: send,
            textarea_visible: true,
            has_prompt_editable: false,
        }
    }

    #[test]
    fn send_button_wins_with_two_or_more_buttons() {
        assert_eq!(resolve_send_button(&form(2, true)), Some(ButtonPick::SendButton));
        assert_eq!(resolve_send_button(&form(5, true)), Some(ButtonPick::SendButton));
    }

    #[test]
    fn position_fallbacks() {
        assert_eq!(resolve_send_button(&form(3, false)), Some(ButtonPick::Position(2)));
        assert_eq!(resolve_send_button(&form(2, false)), Some(ButtonPick::Position(1)));
        assert_eq!(resolve_send_button(&form(1, true)), None);
        assert_eq!(resolve_send_button(&form(4, false)), None);
        assert_eq!(resolve_send_button(&form(0, false)), None);
    }

    #[test]
    fn text_strategy_prefers_visible_textarea() {
        let mut f = form(2, true);
        assert_eq!(resolve_text_strategy(&f), TextStrategy::Textarea);

        f.textarea_visible = false;
        f.has_prompt_editable = true;
        assert_eq!(resolve_text_strategy(&f), TextStrategy::ContentEditable);

        f.has_prompt_editable = false;
        assert_eq!(resolve_text_strategy(&f), TextStrategy::NotFound);
    }

    #[test]
    fn snapshot_deserializes_from_page_shape() {
        let snapshot: FormSnapshot = serde_json::from_value(json!({
            "buttonCount": 3,
            "hasSendButton": false,
            "textareaVisible": false,
            "hasPromptEditable": true,
        }))
        .unwrap();
        assert_eq!(snapshot.button_count, 3);
        assert!(snapshot.has_prompt_editable);
    }

    #[tokio::test]
    async fn input_check_uses_both_selectors() {
        let browser = Arc::new(FakeBrowser::new());
        browser.respond(|_, _| Some(json!(true)));
        let page = Page::new(browser.clone(), TabId::from("chat"));

        assert!(ChatGptTarget::default().input_present(&page).await);

        let exprs = browser.evaluations(&TabId::from("chat"));
        assert!(exprs[0].contains(r##""main form textarea, #prompt-textarea""##));
    }

    #[tokio::test]
    async fn missing_form_submits_nothing() {
        let browser = Arc::new(FakeBrowser::new());
        let page = Page::new(browser.clone(), TabId::from("chat"));

        let outcome = ChatGptTarget::default().submit(&page, "hi").await;

        assert_eq!(outcome, SubmitOutcome::default());
        assert_eq!(browser.evaluations(&TabId::from("chat")).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn submit_clicks_then_resends_then_scans_icons() {
        let browser = Arc::new(FakeBrowser::new());
        browser.respond(|_, expr| {
            if expr.contains("buttonCount") {
                Some(json!({
                    "buttonCount": 2,
                    "hasSendButton": true,
                    "textareaVisible": true,
                    "hasPromptEditable": true,
                }))
            } else if expr.contains("startsWith") {
                Some(json!(1))
            } else {
                Some(json!(true))
            }
        });
        let page = Page::new(browser.clone(), TabId::from("chat"));
        let start = Instant::now();

        let outcome = ChatGptTarget::default()
            .submit(&page, "Summarise \"this\"")
            .await;

        assert_eq!(
            outcome,
            SubmitOutcome {
                form_found: true,
                text: Some(TextStrategy::Textarea),
                button: Some(ButtonPick::SendButton),
                resent: true,
                fingerprint_clicks: 1,
            }
        );
        assert_eq!(start.elapsed(), Duration::from_millis(4000));

        let exprs = browser.evaluations(&TabId::from("chat"));
        assert_eq!(exprs.len(), 5);
        assert!(exprs[1].contains(r#"el.value = "Summarise \"this\"""#));
        assert!(exprs[2].contains("removeAttribute"));
        assert!(exprs[4].contains(SEND_ICON_PATH_PREFIX));
    }

    #[tokio::test(start_paused = true)]
    async fn content_editable_prompt_is_written_as_text() {
        let browser = Arc::new(FakeBrowser::new());
        browser.respond(|_, expr| {
            expr.contains("buttonCount").then(|| {
                json!({
                    "buttonCount": 2,
                    "hasSendButton": true,
                    "textareaVisible": false,
                    "hasPromptEditable": true,
                })
            })
        });
        let page = Page::new(browser.clone(), TabId::from("chat"));

        let outcome = ChatGptTarget::default().submit(&page, "hi \"there\"").await;

        assert_eq!(outcome.text, Some(TextStrategy::ContentEditable));
        let exprs = browser.evaluations(&TabId::from("chat"));
        assert!(exprs[0].contains(r##"form.querySelector("#prompt-textarea") !== null"##));
        assert!(exprs[1].contains(r##".querySelector("#prompt-textarea");"##));
        assert!(exprs[1].contains(r#"el.textContent = "hi \"there\"";"#));
        assert!(!exprs[1].contains("el.value"));
    }

    #[tokio::test(start_paused = true)]
    async fn follow_up_clicks_are_timed_from_the_first_click() {
        let browser = Arc::new(FakeBrowser::new().with_latency(Duration::from_millis(100)));
        browser.respond(|_, expr| {
            if expr.contains("buttonCount") {
                Some(json!({
                    "buttonCount": 2,
                    "hasSendButton": true,
                    "textareaVisible": true,
                    "hasPromptEditable": false,
                }))
            } else if expr.contains("startsWith") {
                Some(json!(0))
            } else {
                Some(json!(true))
            }
        });
        let page = Page::new(browser.clone(), TabId::from("chat"));
        let start = Instant::now();

        ChatGptTarget::default().submit(&page, "hi").await;

        // Snapshot, fill and click take 300 ms; the icon scan starts 4000 ms
        // after that regardless of how long the resend took.
        assert_eq!(start.elapsed(), Duration::from_millis(4400));
    }

    #[tokio::test(start_paused = true)]
    async fn unmatched_layout_fills_text_but_clicks_nothing() {
        let browser = Arc::new(FakeBrowser::new());
        browser.respond(|_, expr| {
            expr.contains("buttonCount").then(|| {
                json!({
                    "buttonCount": 1,
                    "hasSendButton": false,
                    "textareaVisible": false,
                    "hasPromptEditable": true,
                })
            })
        });
        let page = Page::new(browser.clone(), TabId::from("chat"));

        let outcome = ChatGptTarget::default().submit(&page, "hi").await;

        assert_eq!(outcome.text, Some(TextStrategy::ContentEditable));
        assert_eq!(outcome.button, None);
        let exprs = browser.evaluations(&TabId::from("chat"));
        assert_eq!(exprs.len(), 2);
        assert!(exprs[1].contains("textContent"));
    }
}
