//! Client for the learning platform's lesson API.
//!
//! Provides the [`LessonSource`] and [`SubmissionSink`] traits the CLI runs
//! against, and [`ApiClient`], their reqwest-backed implementation.

mod api;

use async_trait::async_trait;
use stepcheck_types::{Lesson, Result, StepResult, SubmissionVerdict};

pub use api::{ApiClient, DEFAULT_API_URL};

// ---------------------------------------------------------------------------
// LessonSource / SubmissionSink
// ---------------------------------------------------------------------------

/// Where lesson definitions come from.
#[async_trait]
pub trait LessonSource: Send + Sync {
    async fn fetch_lesson(&self, lesson_id: &str) -> Result<Lesson>;
}

/// Where results go for grading.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    /// Submit results. `Ok(None)` means every test passed.
    async fn submit(
        &self,
        lesson_id: &str,
        results: &[StepResult],
    ) -> Result<Option<SubmissionVerdict>>;
}
