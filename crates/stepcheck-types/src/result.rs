//! Per-step results handed to the renderer and the submission API, plus the
//! grading verdict that comes back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::lesson::HttpStep;
use crate::Variables;

/// Outcome of one executed step. Mirrors the step kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepResult {
    #[serde(rename = "CLICommandResult")]
    Command(CommandResult),
    #[serde(rename = "HTTPRequestResult")]
    Http(HttpResult),
}

impl StepResult {
    /// Variables that were available once the step finished.
    pub fn variables(&self) -> &Variables {
        match self {
            StepResult::Command(result) => &result.variables,
            StepResult::Http(result) => &result.variables,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommandResult {
    /// Process exit code, or `-2` when the process could not be started or
    /// was terminated by a signal.
    pub exit_code: i32,
    /// The command line after variable interpolation.
    #[serde(skip)]
    pub final_command: String,
    /// Combined stdout and stderr, trailing whitespace trimmed and block
    /// filter applied.
    pub stdout: String,
    pub variables: Variables,
    /// Local evaluations of the step's stdout jq assertions, for display.
    #[serde(skip)]
    pub jq_outputs: Vec<JqOutput>,
}

impl CommandResult {
    /// Exit code used when the process never produced one.
    pub const SPAWN_FAILURE_EXIT_CODE: i32 = -2;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HttpResult {
    /// Transport or body-read failure. When set, the response fields are empty.
    #[serde(skip)]
    pub error: Option<String>,
    pub status_code: u16,
    pub response_headers: BTreeMap<String, String>,
    pub response_trailers: BTreeMap<String, String>,
    pub body_string: String,
    pub variables: Variables,
    pub request: HttpStep,
}

impl HttpResult {
    /// Result for a request that never produced a response.
    pub fn failed(message: impl Into<String>, request: HttpStep, variables: Variables) -> Self {
        Self {
            error: Some(message.into()),
            status_code: 0,
            response_headers: BTreeMap::new(),
            response_trailers: BTreeMap::new(),
            body_string: String::new(),
            variables,
            request,
        }
    }
}

/// Result of running one stdout jq assertion's query locally.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JqOutput {
    pub query: String,
    /// Each result encoded as JSON text, in query output order.
    pub results: Vec<String>,
    pub error: Option<String>,
}

/// First failing step and test reported by the grading service.
/// The absence of a verdict means every test passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionVerdict {
    #[serde(rename = "Error", default)]
    pub error_message: String,
    #[serde(rename = "FailedStepIndex")]
    pub failed_step_index: usize,
    #[serde(rename = "FailedTestIndex")]
    pub failed_test_index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::HttpRequestSpec;
    use serde_json::json;

    fn http_step() -> HttpStep {
        HttpStep {
            response_variables: vec![],
            tests: vec![],
            request: HttpRequestSpec {
                method: "GET".into(),
                full_url: "${baseURL}/health".into(),
                headers: BTreeMap::new(),
                body_json: None,
                basic_auth: None,
                actions: Default::default(),
            },
            sleep_after_ms: None,
        }
    }

    #[test]
    fn command_result_serializes_with_wire_names() {
        let result = StepResult::Command(CommandResult {
            exit_code: 0,
            final_command: "echo hi".into(),
            stdout: "hi".into(),
            variables: Variables::new(),
            jq_outputs: vec![JqOutput::default()],
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            json!({"CLICommandResult": {"ExitCode": 0, "Stdout": "hi", "Variables": {}}})
        );
    }

    #[test]
    fn http_result_omits_local_error() {
        let result = HttpResult::failed("Failed to fetch: refused", http_step(), Variables::new());
        let json = serde_json::to_value(StepResult::Http(result)).unwrap();
        let inner = &json["HTTPRequestResult"];
        assert!(inner.get("Error").is_none());
        assert_eq!(inner["StatusCode"], json!(0));
        assert_eq!(inner["Request"]["Request"]["FullURL"], json!("${baseURL}/health"));
    }

    #[test]
    fn verdict_deserializes_from_service_shape() {
        let verdict: SubmissionVerdict = serde_json::from_value(json!({
            "Error": "expected status 200, got 404",
            "FailedStepIndex": 1,
            "FailedTestIndex": 0
        }))
        .unwrap();
        assert_eq!(verdict.failed_step_index, 1);
        assert_eq!(verdict.failed_test_index, 0);
        assert_eq!(verdict.error_message, "expected status 200, got 404");
    }

    #[test]
    fn step_result_exposes_variables() {
        let mut vars = Variables::new();
        vars.set("id", "7");
        let result = StepResult::Http(HttpResult::failed("x", http_step(), vars));
        assert_eq!(result.variables().get("id"), Some("7"));
    }
}
