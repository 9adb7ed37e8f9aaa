//! Run orchestrator: executes a lesson's steps in order and replays a
//! grading verdict over the same event stream.

use std::time::Duration;

use stepcheck_types::{
    CliData, LessonStep, Result, StepCheckError, StepResult, SubmissionVerdict, Variables,
};

use crate::describe::{describe_command, describe_http};
use crate::events::{EventSink, RunEvent, StepKind};
use crate::executor::http::resolve_url;
use crate::executor::{CommandExecutor, HttpExecutor, ShellConfig};
use crate::template::{placeholders, substitute};

/// `LANG` value forced into command steps.
pub const DEFAULT_LOCALE: &str = "en_US.UTF-8";

// ---------------------------------------------------------------------------
// RunConfig
// ---------------------------------------------------------------------------

/// Caller-supplied settings for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Replaces the lesson's default base URL. Empty counts as unset.
    pub base_url_override: Option<String>,
    pub shell: ShellConfig,
    pub locale: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url_override: None,
            shell: ShellConfig::default(),
            locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl RunConfig {
    pub fn with_base_url_override(mut self, url: impl Into<String>) -> Self {
        self.base_url_override = Some(url.into());
        self
    }

    /// Base URL for `data`, or the configuration error that stops the run.
    pub fn resolve_base_url(&self, data: &CliData) -> Result<String> {
        match self.base_url_override.as_deref().filter(|url| !url.is_empty()) {
            Some(url) => Ok(url.to_string()),
            None if data.requires_base_url_override() => Err(StepCheckError::BaseUrlOverrideRequired),
            None => Ok(data.base_url_default.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Executes steps strictly in sequence, threading one variable table
/// through them.
pub struct Runner {
    config: RunConfig,
    command: CommandExecutor,
    http: HttpExecutor,
}

impl Runner {
    pub fn new(config: RunConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Use `client` for HTTP steps.
    pub fn with_client(config: RunConfig, client: reqwest::Client) -> Self {
        let command = CommandExecutor::new(config.shell.clone(), config.locale.clone());
        Self {
            config,
            command,
            http: HttpExecutor::new(client),
        }
    }

    /// Run every step of `data`, reporting progress to `sink`.
    ///
    /// Step failures are part of the returned results. The only error is a
    /// missing base URL override, raised before any step executes.
    pub async fn run_steps(&self, data: &CliData, sink: &dyn EventSink) -> Result<Vec<StepResult>> {
        let base_url = self.config.resolve_base_url(data)?;
        tracing::info!(steps = data.steps.len(), base_url = %base_url, "Starting run");

        let mut vars = Variables::new();
        let mut results = Vec::with_capacity(data.steps.len());

        for (index, step) in data.steps.iter().enumerate() {
            let started = step_started(index, step, &base_url, &vars);
            if let RunEvent::StepStarted { display, .. } = &started {
                let unresolved = placeholders(display);
                if !unresolved.is_empty() {
                    tracing::debug!(step = index, names = ?unresolved, "Unresolved placeholders");
                }
            }
            sink.emit(started);

            let descriptions: Vec<String> = match step {
                LessonStep::Command(cmd) => cmd.tests.iter().map(|t| describe_command(t, &vars)).collect(),
                LessonStep::Http(req) => req.tests.iter().map(|t| describe_http(t, &vars)).collect(),
            };
            for (test_index, text) in descriptions.into_iter().enumerate() {
                sink.emit(RunEvent::TestStarted {
                    step_index: index,
                    test_index,
                    text,
                });
            }

            let result = match step {
                LessonStep::Command(cmd) => StepResult::Command(self.command.run(cmd, &vars).await),
                LessonStep::Http(req) => StepResult::Http(self.http.run(req, &base_url, &mut vars).await),
            };

            for test_index in 0..step.test_count() {
                sink.emit(RunEvent::TestResolved {
                    step_index: index,
                    test_index,
                    passed: None,
                });
            }
            sink.emit(RunEvent::StepResolved {
                index,
                passed: None,
                result: Some(Box::new(result.clone())),
            });
            results.push(result);

            if let Some(ms) = step.sleep_after_ms().filter(|ms| *ms > 0) {
                sink.emit(RunEvent::Waiting { duration_ms: ms });
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
        }

        tracing::info!(steps = results.len(), "Run finished");
        Ok(results)
    }
}

fn step_started(index: usize, step: &LessonStep, base_url: &str, vars: &Variables) -> RunEvent {
    match step {
        LessonStep::Command(cmd) => RunEvent::StepStarted {
            index,
            kind: StepKind::Command,
            display: substitute(&cmd.command, vars),
            response_variables: Vec::new(),
            stdout_filter: cmd.stdout_filter.clone(),
        },
        LessonStep::Http(req) => RunEvent::StepStarted {
            index,
            kind: StepKind::Http,
            display: format!(
                "{} {}",
                req.request.method,
                resolve_url(&req.request.full_url, base_url, vars)
            ),
            response_variables: req.response_variables.clone(),
            stdout_filter: None,
        },
    }
}

// ---------------------------------------------------------------------------
// Verdict replay
// ---------------------------------------------------------------------------

/// Re-emit resolution events for already collected `results` so they agree
/// with `verdict`. `None` means every test passed.
///
/// Steps before the failed one pass. Within the failed step, tests before
/// the failed test pass, the failed test fails, and later tests get no
/// event. Steps after the failed one get no events at all.
pub fn replay_verdict(
    data: &CliData,
    results: &[StepResult],
    verdict: Option<&SubmissionVerdict>,
    sink: &dyn EventSink,
) {
    for (index, step) in data.steps.iter().enumerate() {
        let (step_passed, is_failed_step) = match verdict {
            None => (true, false),
            Some(v) => (index < v.failed_step_index, index == v.failed_step_index),
        };

        sink.emit(RunEvent::StepResolved {
            index,
            passed: Some(step_passed),
            result: results.get(index).cloned().map(Box::new),
        });

        for test_index in 0..step.test_count() {
            let failed_test = verdict.map_or(0, |v| v.failed_test_index);
            if is_failed_step && test_index > failed_test {
                break;
            }
            let test_passed = step_passed || (is_failed_step && test_index < failed_test);
            sink.emit(RunEvent::TestResolved {
                step_index: index,
                test_index,
                passed: Some(test_passed),
            });
        }

        if !step_passed {
            break;
        }
    }
}
