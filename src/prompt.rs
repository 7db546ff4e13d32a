//! Prompt Payloads
//!
//! Builds the chat-style request from the user prompt, the captured
//! selection and the configured system prompt, with the per-mode validation
//! rules the popup enforces before dispatching.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, RelayResult};

/// Default system prompt; users override it in the config file.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a concise writing assistant. \
Produce a final, send-ready answer with no placeholders and no questions back \
to the user unless explicitly requested.";

/// What the user wants done with the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    /// Generate new content from the prompt, with the selection as context
    Write,
    /// Improve the selected text itself
    Rewrite,
}

/// A ready-to-send chat payload
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPayload {
    pub system: String,
    pub user: String,
}

/// Compose the payload for one request.
///
/// Rewrite needs a selection; Write needs a prompt or a selection. Violations
/// surface as `RelayError::Prompt` so the popup can show them verbatim.
pub fn build_payload(
    mode: PromptMode,
    system_prompt: &str,
    user_prompt: &str,
    selection: Option<&str>,
) -> RelayResult<PromptPayload> {
    let user_prompt = user_prompt.trim();
    let selection = selection.map(str::trim).filter(|s| !s.is_empty());

    let user = match mode {
        PromptMode::Rewrite => {
            let text = selection.ok_or_else(|| {
                RelayError::Prompt("Please select some text to rewrite.".to_string())
            })?;
            format!("Please rewrite and improve this text: {}", text)
        }
        PromptMode::Write => match (user_prompt.is_empty(), selection) {
            (false, Some(text)) => {
                format!("{}\n\nContext: {}", user_prompt, text)
            }
            (false, None) => user_prompt.to_string(),
            (true, Some(text)) => format!("Write about this: {}", text),
            (true, None) => {
                return Err(RelayError::Prompt(
                    "Please enter a prompt or select some text.".to_string(),
                ))
            }
        },
    };

    Ok(PromptPayload {
        system: system_prompt.trim().to_string(),
        user,
    })
}

/// Normalize a model response for display: trim, and collapse runs of blank
/// lines down to a single blank line.
pub fn format_response(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0usize;
    for ch in text.trim().chars() {
        if ch == '\n' {
            newlines += 1;
            if newlines <= 2 {
                out.push(ch);
            }
        } else {
            newlines = 0;
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_requires_selection() {
        let result = build_payload(PromptMode::Rewrite, "sys", "improve it", None);
        assert!(matches!(result, Err(RelayError::Prompt(_))));

        let payload =
            build_payload(PromptMode::Rewrite, "sys", "", Some("teh text")).expect("payload");
        assert_eq!(payload.user, "Please rewrite and improve this text: teh text");
        assert_eq!(payload.system, "sys");
    }

    #[test]
    fn test_write_requires_prompt_or_selection() {
        let result = build_payload(PromptMode::Write, "sys", "   ", None);
        assert!(matches!(result, Err(RelayError::Prompt(_))));
    }

    #[test]
    fn test_write_composition() {
        let both = build_payload(PromptMode::Write, "sys", "summarize", Some("long article"))
            .expect("payload");
        assert_eq!(both.user, "summarize\n\nContext: long article");

        let prompt_only = build_payload(PromptMode::Write, "sys", "a haiku", None).expect("payload");
        assert_eq!(prompt_only.user, "a haiku");

        let selection_only =
            build_payload(PromptMode::Write, "sys", "", Some("rust closures")).expect("payload");
        assert_eq!(selection_only.user, "Write about this: rust closures");
    }

    #[test]
    fn test_whitespace_selection_counts_as_absent() {
        let result = build_payload(PromptMode::Rewrite, "sys", "", Some("  \n "));
        assert!(matches!(result, Err(RelayError::Prompt(_))));
    }

    #[test]
    fn test_format_response_collapses_blank_runs() {
        let raw = "  First line\n\n\n\nSecond line\nThird\n\n";
        assert_eq!(format_response(raw), "First line\n\nSecond line\nThird");
    }
}
