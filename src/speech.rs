use std::process::Stdio;

use anyhow::{Context, Result};
use regex::Regex;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Sentinel strings produced by the external recognizer when capture fails.
pub const UNINTELLIGIBLE: &str = "Sorry, I couldn't understand that.";
pub const SERVICE_UNAVAILABLE: &str = "Speech service unavailable.";

/// Result of a speech-capture attempt. The failure variants short-circuit
/// before the query ever reaches retrieval or the LLM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcript {
    Recognized(String),
    Unintelligible,
    ServiceUnavailable,
}

impl Transcript {
    /// Map raw recognizer output onto the transcript variants. Recognizers
    /// report failure in-band with the two sentinel strings.
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == UNINTELLIGIBLE {
            Transcript::Unintelligible
        } else if trimmed == SERVICE_UNAVAILABLE {
            Transcript::ServiceUnavailable
        } else {
            Transcript::Recognized(trimmed.to_string())
        }
    }
}

/// Run the configured recognizer command and classify its stdout.
/// The command is expected to capture one utterance and print the transcript.
pub async fn recognize_command(cmd: &str) -> Result<Transcript> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .output()
        .await
        .context("Failed to run recognizer command")?;

    if !output.status.success() {
        return Ok(Transcript::ServiceUnavailable);
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    debug!(len = raw.len(), "recognizer output captured");
    Ok(Transcript::classify(&raw))
}

/// Strip markup and symbols that read badly when synthesized: bold/header
/// markers, dash runs, emoji and stray punctuation. Whitespace collapses to
/// single spaces.
pub fn clean_for_tts(text: &str) -> String {
    let bold = Regex::new(r"\*+").expect("static regex");
    let dashes = Regex::new(r"-{2,}").expect("static regex");
    let symbols = Regex::new(r"[^\w\s.,!?']").expect("static regex");
    let spaces = Regex::new(r"\s+").expect("static regex");

    let text = bold.replace_all(text, "");
    let text = text.replace('#', "");
    let text = dashes.replace_all(&text, " ");
    let text = symbols.replace_all(&text, "");
    let text = spaces.replace_all(&text, " ");
    text.trim().to_string()
}

/// Pipe cleaned text to the configured synthesizer command's stdin.
/// Empty cleaned text is skipped rather than synthesized as silence.
pub async fn speak_command(cmd: &str, text: &str) -> Result<()> {
    let cleaned = clean_for_tts(text);
    if cleaned.is_empty() {
        return Ok(());
    }

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .stdin(Stdio::piped())
        .spawn()
        .context("Failed to spawn synthesizer command")?;

    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(cleaned.as_bytes())
            .await
            .context("Failed to write to synthesizer stdin")?;
    }
    drop(child.stdin.take());

    let status = child.wait().await.context("Synthesizer did not exit")?;
    if !status.success() {
        anyhow::bail!("synthesizer exited with {}", status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_strips_bold_and_headers() {
        assert_eq!(
            clean_for_tts("**Great news!** # Specials"),
            "Great news! Specials"
        );
    }

    #[test]
    fn test_clean_replaces_dash_runs() {
        assert_eq!(clean_for_tts("one -- two --- three"), "one two three");
    }

    #[test]
    fn test_clean_drops_emoji_and_symbols() {
        assert_eq!(clean_for_tts("Hello 🚗 world & co"), "Hello world co");
    }

    #[test]
    fn test_clean_keeps_sentence_punctuation() {
        assert_eq!(
            clean_for_tts("Really? Yes, it's done!"),
            "Really? Yes, it's done!"
        );
    }

    #[test]
    fn test_clean_collapses_whitespace() {
        assert_eq!(clean_for_tts("  a \n\n b\t c  "), "a b c");
    }

    #[test]
    fn test_classify_recognized() {
        assert_eq!(
            Transcript::classify("  what specials do you have  "),
            Transcript::Recognized("what specials do you have".to_string())
        );
    }

    #[test]
    fn test_classify_sentinels_short_circuit() {
        assert_eq!(Transcript::classify(UNINTELLIGIBLE), Transcript::Unintelligible);
        assert_eq!(
            Transcript::classify(SERVICE_UNAVAILABLE),
            Transcript::ServiceUnavailable
        );
        assert_eq!(Transcript::classify("   "), Transcript::Unintelligible);
    }
}
