//! Sanitization result types.
//!
//! Pure values produced by the input sanitizer; never persisted.

use serde::{Deserialize, Serialize};

use std::fmt;

/// Why the sanitizer rejected an input.
///
/// A closed set so callers can branch on categories instead of matching
/// reason strings. `description()` is the human-readable rejection reason
/// sent back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Empty after trimming.
    Empty,
    /// Exceeded the configured maximum length (text was truncated).
    TooLong,
    /// Referenced a filesystem or security-sensitive path.
    SensitivePath,
    /// A line started with a shell command.
    ShellCommand,
    /// Contained a process-execution call pattern.
    ProcessExecution,
    /// Contained a known shell-exploit payload idiom.
    ExploitPayload,
    /// Contained shellcode-like byte escape sequences.
    ShellcodePattern,
    /// Attempted to override system instructions.
    PromptInjection,
}

impl RejectReason {
    /// Human-readable rejection reason for the client-facing error message.
    pub fn description(self) -> &'static str {
        match self {
            RejectReason::Empty => "message is empty",
            RejectReason::TooLong => "message exceeds the maximum allowed length",
            RejectReason::SensitivePath => "message references a restricted system path",
            RejectReason::ShellCommand => "message contains a shell command",
            RejectReason::ProcessExecution => "message contains a process execution call",
            RejectReason::ExploitPayload => "message contains a disallowed shell pattern",
            RejectReason::ShellcodePattern => "message contains binary escape sequences",
            RejectReason::PromptInjection => "message attempts to override system instructions",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Outcome of sanitizing one raw user input.
///
/// On rejection, `text` still carries the original (unmodified, except for
/// oversize truncation) input for audit logging -- it must never be
/// forwarded to the generation backend.
#[derive(Debug, Clone)]
pub struct SanitizationResult {
    /// Cleaned text when valid; audit copy of the input when not.
    pub text: String,
    pub valid: bool,
    pub reason: Option<RejectReason>,
}

impl SanitizationResult {
    pub fn accepted(text: String) -> Self {
        Self {
            text,
            valid: true,
            reason: None,
        }
    }

    pub fn rejected(text: String, reason: RejectReason) -> Self {
        Self {
            text,
            valid: false,
            reason: Some(reason),
        }
    }
}
