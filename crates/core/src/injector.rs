//! Prompt injection into a loaded chat tab.

use std::time::Duration;

use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::{
    browser::Page,
    prompt::{LONG_TRANSCRIPT_THRESHOLD, build_prompt},
    target::{ChatTarget, SubmitOutcome},
    types::VideoData,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InputReadiness {
    /// Present on the first look.
    Immediate,
    /// Appeared after this many polls.
    Found { attempts: u32 },
    /// Never appeared; submission goes ahead anyway.
    Exhausted,
}

#[derive(Debug, Clone, Copy)]
pub struct InjectorSettings {
    /// Pause after the chat tab reports complete, before anything else.
    pub grace_delay: Duration,
    pub poll_interval: Duration,
    pub poll_attempts: u32,
    pub long_transcript_threshold: usize,
}

impl Default for InjectorSettings {
    fn default() -> Self {
        Self {
            grace_delay: Duration::from_millis(1000),
            poll_interval: Duration::from_millis(500),
            poll_attempts: 20,
            long_transcript_threshold: LONG_TRANSCRIPT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum InjectOutcome {
    /// Nothing to summarise.
    Skipped,
    Submitted {
        bullet_count: usize,
        readiness: InputReadiness,
        submit: SubmitOutcome,
    },
}

/// Poll for the chat input. Never fails: when the attempts run out the
/// caller proceeds as if it were there.
pub async fn wait_input<T: ChatTarget + ?Sized>(
    target: &T,
    page: &Page,
    interval: Duration,
    attempts: u32,
) -> InputReadiness {
    if target.input_present(page).await {
        return InputReadiness::Immediate;
    }

    for attempt in 1..=attempts {
        sleep(interval).await;
        if target.input_present(page).await {
            debug!(attempt, "chat input appeared");
            return InputReadiness::Found { attempts: attempt };
        }
    }

    info!(attempts, "chat input never appeared, submitting anyway");
    InputReadiness::Exhausted
}

pub struct Injector<T> {
    target: T,
    settings: InjectorSettings,
}

impl<T: ChatTarget> Injector<T> {
    pub fn new(target: T, settings: InjectorSettings) -> Self {
        Self { target, settings }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub async fn inject(&self, page: &Page, video: &VideoData) -> InjectOutcome {
        sleep(self.settings.grace_delay).await;

        let Some(prompt) = build_prompt(video, self.settings.long_transcript_threshold) else {
            info!("empty transcript, nothing to inject");
            return InjectOutcome::Skipped;
        };

        let readiness = wait_input(
            &self.target,
            page,
            self.settings.poll_interval,
            self.settings.poll_attempts,
        )
        .await;

        let submit = self.target.submit(page, &prompt.text).await;
        InjectOutcome::Submitted {
            bullet_count: prompt.bullet_count,
            readiness,
            submit,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::time::Instant;

    use super::*;
    use crate::browser::{TabId, fake::FakeBrowser};

    /// Input shows up on the given check; records submitted prompts.
    struct ScriptedTarget {
        appears_on: Option<u32>,
        checks: AtomicU32,
        submitted: Mutex<Vec<String>>,
    }

    impl ScriptedTarget {
        fn new(appears_on: Option<u32>) -> Self {
            Self {
                appears_on,
                checks: AtomicU32::new(0),
                submitted: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatTarget for ScriptedTarget {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn input_present(&self, _page: &Page) -> bool {
            let check = self.checks.fetch_add(1, Ordering::SeqCst) + 1;
            self.appears_on.is_some_and(|n| check >= n)
        }

        async fn submit(&self, _page: &Page, prompt: &str) -> SubmitOutcome {
            self.submitted.lock().push(prompt.to_string());
            SubmitOutcome::default()
        }
    }

    fn page() -> Page {
        Page::new(Arc::new(FakeBrowser::new()), TabId::from("chat"))
    }

    fn video(transcript: &str) -> VideoData {
        VideoData {
            title: "T".into(),
            author: "A".into(),
            transcript: transcript.into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn present_input_does_not_poll() {
        let target = ScriptedTarget::new(Some(1));
        let start = Instant::now();

        let readiness = wait_input(&target, &page(), Duration::from_millis(500), 20).await;

        assert_eq!(readiness, InputReadiness::Immediate);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn input_found_after_polls() {
        let target = ScriptedTarget::new(Some(4));
        let start = Instant::now();

        let readiness = wait_input(&target, &page(), Duration::from_millis(500), 20).await;

        assert_eq!(readiness, InputReadiness::Found { attempts: 3 });
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_input_gives_up_after_twenty_polls() {
        let target = ScriptedTarget::new(None);
        let start = Instant::now();

        let readiness = wait_input(&target, &page(), Duration::from_millis(500), 20).await;

        assert_eq!(readiness, InputReadiness::Exhausted);
        assert_eq!(start.elapsed(), Duration::from_millis(10_000));
        assert_eq!(target.checks.load(Ordering::SeqCst), 21);
    }

    #[tokio::test(start_paused = true)]
    async fn inject_waits_grace_then_submits_prompt() {
        let injector = Injector::new(ScriptedTarget::new(Some(1)), InjectorSettings::default());
        let start = Instant::now();

        let outcome = injector.inject(&page(), &video("A B C D")).await;

        assert_eq!(start.elapsed(), Duration::from_millis(1000));
        assert_eq!(
            outcome,
            InjectOutcome::Submitted {
                bullet_count: 5,
                readiness: InputReadiness::Immediate,
                submit: SubmitOutcome::default(),
            }
        );
        let submitted = injector.target().submitted.lock().clone();
        assert_eq!(submitted.len(), 1);
        assert!(submitted[0].ends_with("as follows:\n\nA B C D"));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_transcript_is_skipped() {
        let injector = Injector::new(ScriptedTarget::new(Some(1)), InjectorSettings::default());

        let outcome = injector.inject(&page(), &video("")).await;

        assert_eq!(outcome, InjectOutcome::Skipped);
        assert!(injector.target().submitted.lock().is_empty());
        assert_eq!(injector.target().checks.load(Ordering::SeqCst), 0);
    }
}
