pub mod cli_completion_sink;
pub mod events;
pub mod extract_transcript;
pub mod inject_prompt;
pub mod open_chat_tab;
pub mod reload_video_tab;
