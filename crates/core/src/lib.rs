pub mod browser;
pub mod config;
pub mod error;
pub mod events;
pub mod injector;
pub mod prompt;
pub mod queues;
pub mod retry;
pub mod routes;
pub mod target;
pub mod transcript;
pub mod types;
pub mod workers;

pub use browser::{Browser, CompletionSignal, Page, Tab, TabId};
pub use config::Config;
pub use error::{ConfigError, ExtractError, Result, TubesumError};
pub use injector::{InjectOutcome, Injector, InputReadiness};
pub use prompt::{Prompt, build_prompt};
pub use retry::RetryPolicy;
pub use target::{ChatTarget, ChatGptTarget, SubmitOutcome};
pub use transcript::TranscriptExtractor;
pub use types::{RelayMessage, VideoData};
