use crate::types::VideoData;

/// Transcripts longer than this many UTF-16 code units get the long-form summary.
pub const LONG_TRANSCRIPT_THRESHOLD: usize = 2000;

const SHORT_BULLETS: usize = 5;
const LONG_BULLETS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub bullet_count: usize,
}

/// Length is measured the way a browser's `String.length` does.
pub fn bullet_count(transcript: &str, threshold: usize) -> usize {
    if transcript.encode_utf16().count() > threshold {
        LONG_BULLETS
    } else {
        SHORT_BULLETS
    }
}

/// Build the summarisation request. Returns `None` for an empty transcript.
pub fn build_prompt(video: &VideoData, threshold: usize) -> Option<Prompt> {
    if video.transcript.is_empty() {
        return None;
    }

    let bullet_count = bullet_count(&video.transcript, threshold);
    let text = format!(
        "Summarise the transcript of the video \"{}\" by {} in {} bullet points. The entire transcript is as follows:\n\n{}",
        video.title, video.author, bullet_count, video.transcript
    );

    Some(Prompt { text, bullet_count })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(transcript: &str) -> VideoData {
        VideoData {
            title: "Rust in 100 Seconds".into(),
            author: "Fireship".into(),
            transcript: transcript.into(),
        }
    }

    #[test]
    fn bullet_count_switches_above_threshold() {
        assert_eq!(bullet_count(&"a".repeat(1999), 2000), 5);
        assert_eq!(bullet_count(&"a".repeat(2000), 2000), 5);
        assert_eq!(bullet_count(&"a".repeat(2001), 2000), 10);
    }

    #[test]
    fn bullet_count_uses_characters_not_bytes() {
        // 1000 two-byte characters stay under the threshold.
        assert_eq!(bullet_count(&"é".repeat(1000), 1500), 5);
    }

    #[test]
    fn astral_characters_count_twice() {
        assert_eq!(bullet_count(&"😀".repeat(1000), 2000), 5);
        assert_eq!(bullet_count(&"😀".repeat(1001), 2000), 10);
    }

    #[test]
    fn prompt_interpolates_title_author_and_transcript() {
        let prompt = build_prompt(&video("A B C D"), LONG_TRANSCRIPT_THRESHOLD).unwrap();
        assert_eq!(prompt.bullet_count, 5);
        assert_eq!(
            prompt.text,
            "Summarise the transcript of the video \"Rust in 100 Seconds\" by Fireship in 5 bullet points. The entire transcript is as follows:\n\nA B C D"
        );
    }

    #[test]
    fn long_transcript_asks_for_ten_bullets() {
        let prompt = build_prompt(&video(&"word ".repeat(500)), LONG_TRANSCRIPT_THRESHOLD).unwrap();
        assert_eq!(prompt.bullet_count, 10);
        assert!(prompt.text.contains("in 10 bullet points"));
    }

    #[test]
    fn empty_transcript_builds_nothing() {
        assert!(build_prompt(&video(""), LONG_TRANSCRIPT_THRESHOLD).is_none());
    }
}
