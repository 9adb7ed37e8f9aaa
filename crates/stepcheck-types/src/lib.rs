//! Shared types, errors, and the variable table for the stepcheck engine.
//!
//! This crate provides the foundational types used across all other stepcheck crates:
//! - `StepCheckError`: unified error taxonomy
//! - `Variables`: run-scoped string table fed by HTTP response variables
//! - [`lesson`]: the lesson definition (steps and their assertions)
//! - [`result`]: per-step results, jq outputs, and the grading verdict

pub mod lesson;
pub mod result;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use lesson::{
    BasicAuth, CliData, CommandAssertion, CommandStep, ExpectedScalar, HeaderExpectation,
    HttpActions, HttpAssertion, HttpRequestSpec, HttpStep, JqExpectedResult, JqInputMode,
    JsonOperator, JsonValueAssertion, Lesson, LessonStep, ResponseVariable, StdoutJqAssertion,
    BASE_URL_OVERRIDE_REQUIRED, BASE_URL_PLACEHOLDER,
};
pub use result::{CommandResult, HttpResult, JqOutput, StepResult, SubmissionVerdict};

/// Unified error type for all stepcheck subsystems.
#[derive(Debug, thiserror::Error)]
pub enum StepCheckError {
    // === Configuration Errors ===
    #[error("lesson requires a base URL override: pass --base-url or set STEPCHECK_BASE_URL")]
    BaseUrlOverrideRequired,

    #[error("unable to run lesson: {0}")]
    InvalidStep(String),

    #[error("invalid assertion: {0}")]
    InvalidAssertion(String),

    #[error("lesson does not support {os} (allowed: {allowed})")]
    UnsupportedOperatingSystem { os: String, allowed: String },

    // === Remote API Errors ===
    #[error("lesson API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("an active membership is required to run and submit the tests for this lesson")]
    MembershipRequired,

    #[error("HTTP transport error: {0}")]
    Http(String),

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// A convenience alias for `Result<T, StepCheckError>`.
pub type Result<T> = std::result::Result<T, StepCheckError>;

// ---------------------------------------------------------------------------
// Variables: run-scoped string table
// ---------------------------------------------------------------------------

/// Name to value table shared by the steps of a single run.
///
/// Entries are only ever inserted or overwritten. Results embed a
/// [`snapshot`](Variables::snapshot) so later writes never leak into a
/// completed step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variables {
    values: BTreeMap<String, String>,
}

impl Variables {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Independent copy of the current values.
    pub fn snapshot(&self) -> Variables {
        self.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = Variables::new();
        for (k, v) in iter {
            vars.set(k, v);
        }
        vars
    }
}
