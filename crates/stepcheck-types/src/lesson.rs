//! Lesson definition: the ordered steps and the assertions attached to them.
//!
//! The remote service sends every union as a struct of nullable fields where
//! only one should be set. Each union here deserializes through a raw mirror
//! of that shape and is validated on load, so a step or assertion with zero or
//! several variants never reaches the engine.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Result, StepCheckError};

/// Token inside an HTTP step's URL that is replaced by the run's base URL.
pub const BASE_URL_PLACEHOLDER: &str = "${baseURL}";

/// `BaseURLDefault` value meaning the caller must supply a base URL.
pub const BASE_URL_OVERRIDE_REQUIRED: &str = "override";

/// Accept `null` wherever a collection or default-able struct is expected.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Lesson envelope
// ---------------------------------------------------------------------------

/// Response body of the lesson fetch endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Lesson {
    pub lesson: LessonBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonBody {
    #[serde(rename = "Type", default)]
    pub lesson_type: String,
    #[serde(rename = "LessonDataCLI", default)]
    pub lesson_data_cli: Option<LessonDataCli>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonDataCli {
    #[serde(rename = "CLIData")]
    pub cli_data: CliData,
}

impl Lesson {
    /// Unwrap the CLI payload, failing for lesson types this tool cannot run.
    pub fn into_cli_data(self) -> Result<CliData> {
        let lesson_type = self.lesson.lesson_type;
        self.lesson
            .lesson_data_cli
            .map(|data| data.cli_data)
            .ok_or_else(|| {
                StepCheckError::Other(format!("unsupported lesson type '{lesson_type}'"))
            })
    }
}

/// Steps plus the metadata that governs how they may be run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CliData {
    #[serde(rename = "BaseURLDefault", default)]
    pub base_url_default: String,
    #[serde(default, deserialize_with = "nullable")]
    pub steps: Vec<LessonStep>,
    #[serde(default, deserialize_with = "nullable")]
    pub allowed_operating_systems: Vec<String>,
}

impl CliData {
    /// Read a CLI lesson document from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cli_data: Self = serde_json::from_str(&data)?;
        Ok(cli_data)
    }

    /// The lesson refuses to run without an explicit base URL from the caller.
    pub fn requires_base_url_override(&self) -> bool {
        self.base_url_default == BASE_URL_OVERRIDE_REQUIRED
    }

    /// Check `os` (a `std::env::consts::OS` value) against the allow list.
    /// An empty list allows every platform.
    pub fn check_operating_system(&self, os: &str) -> Result<()> {
        if self.allowed_operating_systems.is_empty() {
            return Ok(());
        }
        // The service uses Go platform names.
        let normalized = match os {
            "macos" => "darwin",
            other => other,
        };
        if self
            .allowed_operating_systems
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(normalized))
        {
            return Ok(());
        }
        Err(StepCheckError::UnsupportedOperatingSystem {
            os: normalized.to_string(),
            allowed: self.allowed_operating_systems.join(", "),
        })
    }
}

// ---------------------------------------------------------------------------
// LessonStep
// ---------------------------------------------------------------------------

/// One unit of lesson execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStep", into = "RawStep")]
pub enum LessonStep {
    Command(CommandStep),
    Http(HttpStep),
}

#[derive(Serialize, Deserialize)]
struct RawStep {
    #[serde(rename = "CLICommand", default)]
    cli_command: Option<CommandStep>,
    #[serde(rename = "HTTPRequest", default)]
    http_request: Option<HttpStep>,
}

impl TryFrom<RawStep> for LessonStep {
    type Error = StepCheckError;

    fn try_from(raw: RawStep) -> Result<Self> {
        match (raw.cli_command, raw.http_request) {
            (Some(cmd), None) => Ok(LessonStep::Command(cmd)),
            (None, Some(req)) => Ok(LessonStep::Http(req)),
            (None, None) => Err(StepCheckError::InvalidStep("missing step".into())),
            (Some(_), Some(_)) => Err(StepCheckError::InvalidStep(
                "step declares both a command and an HTTP request".into(),
            )),
        }
    }
}

impl From<LessonStep> for RawStep {
    fn from(step: LessonStep) -> Self {
        match step {
            LessonStep::Command(cmd) => RawStep {
                cli_command: Some(cmd),
                http_request: None,
            },
            LessonStep::Http(req) => RawStep {
                cli_command: None,
                http_request: Some(req),
            },
        }
    }
}

impl LessonStep {
    /// Number of assertions declared on the step.
    pub fn test_count(&self) -> usize {
        match self {
            LessonStep::Command(cmd) => cmd.tests.len(),
            LessonStep::Http(req) => req.tests.len(),
        }
    }

    pub fn sleep_after_ms(&self) -> Option<u64> {
        match self {
            LessonStep::Command(cmd) => cmd.sleep_after_ms,
            LessonStep::Http(req) => req.sleep_after_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Command steps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommandStep {
    pub command: String,
    #[serde(default, deserialize_with = "nullable")]
    pub tests: Vec<CommandAssertion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_after_ms: Option<u64>,
    /// Block-extraction query applied to stdout before assertions run.
    #[serde(rename = "StdoutFilterTmdl", default, skip_serializing_if = "Option::is_none")]
    pub stdout_filter: Option<String>,
}

/// Expectation attached to a command step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCommandAssertion", into = "RawCommandAssertion")]
pub enum CommandAssertion {
    ExitCode(i32),
    StdoutLinesGt(usize),
    StdoutContainsAll(Vec<String>),
    StdoutContainsNone(Vec<String>),
    StdoutJq(StdoutJqAssertion),
}

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawCommandAssertion {
    #[serde(default)]
    exit_code: Option<i32>,
    #[serde(default)]
    stdout_contains_all: Option<Vec<String>>,
    #[serde(default)]
    stdout_contains_none: Option<Vec<String>>,
    #[serde(default)]
    stdout_lines_gt: Option<usize>,
    #[serde(default)]
    stdout_jq: Option<StdoutJqAssertion>,
}

impl TryFrom<RawCommandAssertion> for CommandAssertion {
    type Error = StepCheckError;

    fn try_from(raw: RawCommandAssertion) -> Result<Self> {
        let populated = [
            raw.exit_code.is_some(),
            raw.stdout_contains_all.is_some(),
            raw.stdout_contains_none.is_some(),
            raw.stdout_lines_gt.is_some(),
            raw.stdout_jq.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if populated > 1 {
            return Err(StepCheckError::InvalidAssertion(format!(
                "command test must set exactly one expectation, found {populated}"
            )));
        }

        if let Some(code) = raw.exit_code {
            Ok(CommandAssertion::ExitCode(code))
        } else if let Some(all) = raw.stdout_contains_all {
            Ok(CommandAssertion::StdoutContainsAll(all))
        } else if let Some(none) = raw.stdout_contains_none {
            Ok(CommandAssertion::StdoutContainsNone(none))
        } else if let Some(lines) = raw.stdout_lines_gt {
            Ok(CommandAssertion::StdoutLinesGt(lines))
        } else if let Some(jq) = raw.stdout_jq {
            Ok(CommandAssertion::StdoutJq(jq))
        } else {
            Err(StepCheckError::InvalidAssertion(
                "command test sets no expectation".into(),
            ))
        }
    }
}

impl From<CommandAssertion> for RawCommandAssertion {
    fn from(assertion: CommandAssertion) -> Self {
        let mut raw = RawCommandAssertion::default();
        match assertion {
            CommandAssertion::ExitCode(code) => raw.exit_code = Some(code),
            CommandAssertion::StdoutLinesGt(lines) => raw.stdout_lines_gt = Some(lines),
            CommandAssertion::StdoutContainsAll(all) => raw.stdout_contains_all = Some(all),
            CommandAssertion::StdoutContainsNone(none) => raw.stdout_contains_none = Some(none),
            CommandAssertion::StdoutJq(jq) => raw.stdout_jq = Some(jq),
        }
        raw
    }
}

/// A jq query run against stdout, with the results the grader expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StdoutJqAssertion {
    pub query: String,
    #[serde(default, deserialize_with = "nullable")]
    pub input_mode: String,
    #[serde(default, deserialize_with = "nullable")]
    pub expected_results: Vec<JqExpectedResult>,
}

impl StdoutJqAssertion {
    /// Parsed input mode. Anything other than `jsonl` means a single document.
    pub fn mode(&self) -> JqInputMode {
        if self.input_mode.trim().eq_ignore_ascii_case("jsonl") {
            JqInputMode::JsonLines
        } else {
            JqInputMode::Json
        }
    }
}

/// How stdout is fed to a jq query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JqInputMode {
    /// Exactly one JSON value.
    #[default]
    Json,
    /// A stream of JSON values, collected into an array.
    JsonLines,
}

/// `Type` value whose string payload is template-interpolated before display.
pub const JQ_TYPE_STRING: &str = "string";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JqExpectedResult {
    #[serde(rename = "Type")]
    pub kind: String,
    pub operator: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

// ---------------------------------------------------------------------------
// HTTP steps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HttpStep {
    #[serde(default, deserialize_with = "nullable")]
    pub response_variables: Vec<ResponseVariable>,
    #[serde(default, deserialize_with = "nullable")]
    pub tests: Vec<HttpAssertion>,
    pub request: HttpRequestSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_after_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HttpRequestSpec {
    pub method: String,
    #[serde(rename = "FullURL")]
    pub full_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub headers: BTreeMap<String, String>,
    #[serde(rename = "BodyJSON", default)]
    pub body_json: Option<serde_json::Value>,
    #[serde(default)]
    pub basic_auth: Option<BasicAuth>,
    #[serde(default, deserialize_with = "nullable")]
    pub actions: HttpActions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HttpActions {
    #[serde(default)]
    pub delay_request_by_ms: Option<u64>,
}

/// A value to pull out of the JSON response body and store for later steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseVariable {
    pub name: String,
    pub path: String,
}

/// Expectation attached to an HTTP step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHttpAssertion", into = "RawHttpAssertion")]
pub enum HttpAssertion {
    StatusCode(u16),
    BodyContains(String),
    BodyContainsNone(String),
    HeadersContain(HeaderExpectation),
    TrailersContain(HeaderExpectation),
    JsonValue(JsonValueAssertion),
}

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawHttpAssertion {
    #[serde(default)]
    status_code: Option<u16>,
    #[serde(default)]
    body_contains: Option<String>,
    #[serde(default)]
    body_contains_none: Option<String>,
    #[serde(default)]
    headers_contain: Option<HeaderExpectation>,
    #[serde(default)]
    trailers_contain: Option<HeaderExpectation>,
    #[serde(rename = "JSONValue", default)]
    json_value: Option<JsonValueAssertion>,
}

impl TryFrom<RawHttpAssertion> for HttpAssertion {
    type Error = StepCheckError;

    fn try_from(raw: RawHttpAssertion) -> Result<Self> {
        let populated = [
            raw.status_code.is_some(),
            raw.body_contains.is_some(),
            raw.body_contains_none.is_some(),
            raw.headers_contain.is_some(),
            raw.trailers_contain.is_some(),
            raw.json_value.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if populated > 1 {
            return Err(StepCheckError::InvalidAssertion(format!(
                "HTTP test must set exactly one expectation, found {populated}"
            )));
        }

        if let Some(code) = raw.status_code {
            Ok(HttpAssertion::StatusCode(code))
        } else if let Some(text) = raw.body_contains {
            Ok(HttpAssertion::BodyContains(text))
        } else if let Some(text) = raw.body_contains_none {
            Ok(HttpAssertion::BodyContainsNone(text))
        } else if let Some(header) = raw.headers_contain {
            Ok(HttpAssertion::HeadersContain(header))
        } else if let Some(trailer) = raw.trailers_contain {
            Ok(HttpAssertion::TrailersContain(trailer))
        } else if let Some(json) = raw.json_value {
            Ok(HttpAssertion::JsonValue(json))
        } else {
            Err(StepCheckError::InvalidAssertion(
                "HTTP test sets no expectation".into(),
            ))
        }
    }
}

impl From<HttpAssertion> for RawHttpAssertion {
    fn from(assertion: HttpAssertion) -> Self {
        let mut raw = RawHttpAssertion::default();
        match assertion {
            HttpAssertion::StatusCode(code) => raw.status_code = Some(code),
            HttpAssertion::BodyContains(text) => raw.body_contains = Some(text),
            HttpAssertion::BodyContainsNone(text) => raw.body_contains_none = Some(text),
            HttpAssertion::HeadersContain(header) => raw.headers_contain = Some(header),
            HttpAssertion::TrailersContain(trailer) => raw.trailers_contain = Some(trailer),
            HttpAssertion::JsonValue(json) => raw.json_value = Some(json),
        }
        raw
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HeaderExpectation {
    pub key: String,
    pub value: String,
}

/// Comparison of the JSON value found at `path` in the response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawJsonValueAssertion", into = "RawJsonValueAssertion")]
pub struct JsonValueAssertion {
    pub path: String,
    pub operator: JsonOperator,
    pub expected: Option<ExpectedScalar>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawJsonValueAssertion {
    path: String,
    operator: JsonOperator,
    #[serde(default)]
    int_value: Option<i64>,
    #[serde(default)]
    string_value: Option<String>,
    #[serde(default)]
    bool_value: Option<bool>,
}

impl TryFrom<RawJsonValueAssertion> for JsonValueAssertion {
    type Error = StepCheckError;

    fn try_from(raw: RawJsonValueAssertion) -> Result<Self> {
        let expected = match (raw.int_value, raw.string_value, raw.bool_value) {
            (None, None, None) => None,
            (Some(i), None, None) => Some(ExpectedScalar::Int(i)),
            (None, Some(s), None) => Some(ExpectedScalar::String(s)),
            (None, None, Some(b)) => Some(ExpectedScalar::Bool(b)),
            _ => {
                return Err(StepCheckError::InvalidAssertion(format!(
                    "JSON value test at '{}' sets more than one expected value",
                    raw.path
                )))
            }
        };
        Ok(JsonValueAssertion {
            path: raw.path,
            operator: raw.operator,
            expected,
        })
    }
}

impl From<JsonValueAssertion> for RawJsonValueAssertion {
    fn from(assertion: JsonValueAssertion) -> Self {
        let mut raw = RawJsonValueAssertion {
            path: assertion.path,
            operator: assertion.operator,
            int_value: None,
            string_value: None,
            bool_value: None,
        };
        match assertion.expected {
            Some(ExpectedScalar::Int(i)) => raw.int_value = Some(i),
            Some(ExpectedScalar::String(s)) => raw.string_value = Some(s),
            Some(ExpectedScalar::Bool(b)) => raw.bool_value = Some(b),
            None => {}
        }
        raw
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonOperator {
    Eq,
    Gt,
    Contains,
    NotContains,
}

impl JsonOperator {
    /// Natural-language phrasing used in test descriptions.
    pub fn phrase(self) -> &'static str {
        match self {
            JsonOperator::Eq => "to be equal to",
            JsonOperator::Gt => "to be greater than",
            JsonOperator::Contains => "contains",
            JsonOperator::NotContains => "to not contain",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedScalar {
    Int(i64),
    String(String),
    Bool(bool),
}

impl fmt::Display for ExpectedScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedScalar::Int(i) => write!(f, "{i}"),
            ExpectedScalar::String(s) => f.write_str(s),
            ExpectedScalar::Bool(b) => write!(f, "{b}"),
        }
    }
}
