//! Retry policy and attempt-numbered adaptation.
//!
//! Each agent carries a small, fixed retry budget. Later attempts do not
//! simply re-run: they adapt, tightening constraints and optionally
//! switching to a fallback model on the final attempt.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// How the delay between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    Exponential,
    Linear,
    Fixed,
}

impl BackoffStrategy {
    /// Delay to wait after `attempt` (1-based) has failed.
    pub fn delay(self, base: Duration, attempt: u32) -> Duration {
        match self {
            BackoffStrategy::Fixed => base,
            BackoffStrategy::Linear => base.saturating_mul(attempt),
            BackoffStrategy::Exponential => {
                base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Retry budget for one agent type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Models to switch to on the final attempt, tried in order.
    #[serde(default)]
    pub fallback_models: Vec<String>,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: BackoffStrategy::Exponential,
            base_delay_ms: default_base_delay_ms(),
            fallback_models: Vec::new(),
        }
    }
}

impl RetryPolicy {
    /// Base delay as a `Duration`.
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// Adaptation
// ---------------------------------------------------------------------------

/// How an attempt differs from a plain re-run.
///
/// Variants are ordered by escalation, so callers can combine a baseline
/// with an attempt-derived strategy via `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationStrategy {
    /// First attempt: the configured prompt and model, unmodified.
    Standard,
    /// Second attempt: added emphasis on structural constraints.
    ValidationFocused,
    /// Third attempt: narrower scope, stricter constraints.
    Conservative,
    /// Final attempt: maximally strict, optionally on a fallback model.
    Aggressive,
}

impl AdaptationStrategy {
    /// Pick the adaptation for a 1-based attempt number out of `max`.
    pub fn for_attempt(attempt: u32, max: u32) -> Self {
        if attempt >= max {
            return AdaptationStrategy::Aggressive;
        }
        match attempt {
            0 | 1 => AdaptationStrategy::Standard,
            2 => AdaptationStrategy::ValidationFocused,
            _ => AdaptationStrategy::Conservative,
        }
    }

    /// Short label recorded in retry history.
    pub fn label(self) -> &'static str {
        match self {
            AdaptationStrategy::Standard => "standard",
            AdaptationStrategy::ValidationFocused => "validation_focused",
            AdaptationStrategy::Conservative => "conservative",
            AdaptationStrategy::Aggressive => "aggressive",
        }
    }

    /// Prompt guidance appended by agents on adapted attempts.
    pub fn guidance(self) -> &'static str {
        match self {
            AdaptationStrategy::Standard => "",
            AdaptationStrategy::ValidationFocused => {
                "A previous attempt produced output that failed structural checks. \
                 Double-check every field of the required output shape before answering."
            }
            AdaptationStrategy::Conservative => {
                "Previous attempts failed. Narrow the scope: prefer the simplest \
                 design that satisfies the request, and follow the output shape exactly."
            }
            AdaptationStrategy::Aggressive => {
                "This is the final attempt. Be maximally thorough and conservative: \
                 produce the minimal correct output, matching the required shape \
                 field for field, with no commentary."
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
