//! Outcome and mode types for a single reasoning call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Text returned when the model produced no reasoning trace
pub const NO_REASONING_MESSAGE: &str = "no reasoning content available or request timed out";

/// Text returned when the call exceeded its deadline
pub const TIMEOUT_MESSAGE: &str =
    "The reasoning request timed out before the model finished thinking.";

/// How the chat-completion request is issued
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallMode {
    /// Incremental delivery: reasoning fragments arrive over SSE and are concatenated
    #[default]
    Streaming,
    /// Await the full response once and read the reasoning field directly
    SingleShot,
}

impl CallMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallMode::Streaming => "streaming",
            CallMode::SingleShot => "single-shot",
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, CallMode::Streaming)
    }
}

impl fmt::Display for CallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "streaming" | "stream" => Ok(CallMode::Streaming),
            "single-shot" | "single_shot" | "singleshot" | "single" => Ok(CallMode::SingleShot),
            other => Err(format!(
                "unknown call mode '{}' (expected 'streaming' or 'single-shot')",
                other
            )),
        }
    }
}

/// Terminal outcome of one bridge call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasoningOutcome {
    /// Non-empty reasoning trace
    Reasoning(String),
    /// The response carried no reasoning (absent or empty field)
    Empty,
    /// The deadline elapsed before the call completed
    TimedOut,
    /// Transport, HTTP or decode failure
    Failed(String),
}

impl ReasoningOutcome {
    /// Classify extracted reasoning text
    pub fn from_reasoning(text: String) -> Self {
        if text.is_empty() {
            ReasoningOutcome::Empty
        } else {
            ReasoningOutcome::Reasoning(text)
        }
    }

    pub fn is_reasoning(&self) -> bool {
        matches!(self, ReasoningOutcome::Reasoning(_))
    }

    /// Collapse the outcome into the user-facing text
    pub fn into_text(self) -> String {
        match self {
            ReasoningOutcome::Reasoning(text) => text,
            ReasoningOutcome::Empty => NO_REASONING_MESSAGE.to_string(),
            ReasoningOutcome::TimedOut => TIMEOUT_MESSAGE.to_string(),
            ReasoningOutcome::Failed(message) => {
                format!("Error calling reasoning model: {}", message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_mode_parse() {
        assert_eq!("streaming".parse::<CallMode>(), Ok(CallMode::Streaming));
        assert_eq!("STREAM".parse::<CallMode>(), Ok(CallMode::Streaming));
        assert_eq!("single-shot".parse::<CallMode>(), Ok(CallMode::SingleShot));
        assert_eq!(" single_shot ".parse::<CallMode>(), Ok(CallMode::SingleShot));
        assert!("batch".parse::<CallMode>().is_err());
        assert_eq!(CallMode::default(), CallMode::Streaming);
    }

    #[test]
    fn test_call_mode_display_roundtrips() {
        for mode in [CallMode::Streaming, CallMode::SingleShot] {
            assert_eq!(mode.to_string().parse::<CallMode>(), Ok(mode));
        }
    }

    #[test]
    fn test_outcome_text() {
        assert_eq!(
            ReasoningOutcome::Reasoning("step 1".to_string()).into_text(),
            "step 1"
        );
        assert_eq!(ReasoningOutcome::Empty.into_text(), NO_REASONING_MESSAGE);
        assert_eq!(ReasoningOutcome::TimedOut.into_text(), TIMEOUT_MESSAGE);

        let failed = ReasoningOutcome::Failed("connection refused".to_string()).into_text();
        assert!(failed.contains("connection refused"));
    }

    #[test]
    fn test_from_reasoning_empty() {
        assert_eq!(
            ReasoningOutcome::from_reasoning(String::new()),
            ReasoningOutcome::Empty
        );
        assert!(ReasoningOutcome::from_reasoning("x".to_string()).is_reasoning());
    }
}
