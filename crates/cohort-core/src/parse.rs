//! Strict decision payload parsing.
//!
//! Text backends are expected to answer with a single JSON object:
//!
//! ```json
//! {"thought": "...", "action": "...", "sentiment": 0.4, "stance": "agree"}
//! ```
//!
//! optionally wrapped in one Markdown code fence. Anything else is a typed
//! [`ParseError`]: there is no best-effort recovery here. Falling back to a
//! default decision is a separate policy applied by the scheduler.
//!
//! [`ParsingProvider`] adapts any [`CompletionSource`] (something that turns
//! a request into raw text) into a [`DecisionProvider`] using this parser.

use std::future::Future;

use serde::Deserialize;
use serde_json::error::Category;
use tracing::debug;

use cohort_types::{Decision, Stance, UnknownStance};

use crate::decision::{DecisionError, DecisionProvider, DecisionRequest};

/// Reasons a payload fails validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// The text is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(String),

    /// The JSON does not have the payload's shape: not an object, a field
    /// of the wrong type, or a field outside the schema.
    #[error("payload shape: {0}")]
    Schema(String),

    /// A required field is absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// The sentiment is not a finite number in `[-1, 1]`.
    #[error("sentiment {0} outside [-1, 1]")]
    SentimentOutOfRange(f64),

    /// The stance is not in the vocabulary.
    #[error(transparent)]
    UnknownStance(#[from] UnknownStance),
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            Category::Data => Self::Schema(err.to_string()),
            Category::Io | Category::Syntax | Category::Eof => Self::Json(err.to_string()),
        }
    }
}

/// Wire shape of a decision payload.
///
/// Fields are optional here so an absent one surfaces as
/// [`ParseError::MissingField`] rather than a serde message.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDecision {
    thought: Option<String>,
    action: Option<String>,
    sentiment: Option<f64>,
    stance: Option<String>,
}

/// Strip a single surrounding Markdown code fence, if present.
///
/// Accepts both bare fences and fences tagged with a language
/// (```` ```json ````). Text without a fence is returned trimmed.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    match body.split_once('\n') {
        Some((info, inner)) if !info.trim().contains(['{', '}']) => inner.trim(),
        _ => body.trim(),
    }
}

/// Parse and validate a raw decision payload.
///
/// # Errors
///
/// Returns the first [`ParseError`] the payload violates.
pub fn parse_decision(raw: &str) -> Result<Decision, ParseError> {
    let RawDecision {
        thought,
        action,
        sentiment,
        stance,
    } = serde_json::from_str(strip_code_fence(raw))?;

    let thought = thought.ok_or(ParseError::MissingField("thought"))?;
    let action = action.ok_or(ParseError::MissingField("action"))?;
    let sentiment = sentiment.ok_or(ParseError::MissingField("sentiment"))?;
    if !sentiment.is_finite() || !(-1.0..=1.0).contains(&sentiment) {
        return Err(ParseError::SentimentOutOfRange(sentiment));
    }
    let stance: Stance = stance.ok_or(ParseError::MissingField("stance"))?.parse()?;

    Ok(Decision {
        thought,
        action,
        sentiment,
        stance,
    })
}

// ---------------------------------------------------------------------------
// Text backends
// ---------------------------------------------------------------------------

/// Anything that turns a decision request into raw text.
pub trait CompletionSource: Send + Sync {
    /// Produce the raw completion for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError::Provider`] on backend failure.
    fn complete(
        &self,
        request: &DecisionRequest,
    ) -> impl Future<Output = Result<String, DecisionError>> + Send;
}

/// Adapts a [`CompletionSource`] into a strict [`DecisionProvider`].
#[derive(Debug, Clone)]
pub struct ParsingProvider<C> {
    source: C,
}

impl<C> ParsingProvider<C> {
    /// Wrap a completion source.
    pub const fn new(source: C) -> Self {
        Self { source }
    }
}

impl<C: CompletionSource> DecisionProvider for ParsingProvider<C> {
    async fn decide(&self, request: DecisionRequest) -> Result<Decision, DecisionError> {
        let raw = self.source.complete(&request).await?;
        let decision = parse_decision(&raw).inspect_err(|err| {
            debug!(agent = %request.name, error = %err, "rejected decision payload");
        })?;
        Ok(decision)
    }
}
