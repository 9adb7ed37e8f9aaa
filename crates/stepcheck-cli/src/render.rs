//! Terminal rendering of run events.
//!
//! [`RenderModel`] folds [`RunEvent`]s into per-step views. While a run is in
//! flight it yields short progress lines; once `RunDone` arrives the full
//! report is produced by [`RenderModel::final_view`].

use std::io::Write;

use stepcheck_engine::{substitute, RunEvent, StepKind};
use stepcheck_types::{
    CommandResult, HttpAssertion, HttpResult, JqOutput, ResponseVariable, StepResult,
    SubmissionVerdict,
};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::theme::Theme;

/// Stdout shown in the report is capped at this many lines.
pub const MAX_STDOUT_LINES: usize = 32;
/// And at this many characters.
pub const MAX_STDOUT_CHARS: usize = 5120;

const TREE_EDGE: &str = " ├─ ";
const TREE_CONTINUATION: &str = " │    ";

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TestView {
    pub text: String,
    pub finished: bool,
    pub passed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepView {
    pub kind: StepKind,
    pub display: String,
    pub tests: Vec<TestView>,
    pub response_variables: Vec<ResponseVariable>,
    pub stdout_filter: Option<String>,
    pub result: Option<StepResult>,
    pub finished: bool,
    pub passed: Option<bool>,
    pub waited_ms: Option<u64>,
}

impl StepView {
    fn header(&self) -> String {
        match self.kind {
            StepKind::Command => format!("Running: {}", self.display),
            StepKind::Http => self.display.clone(),
        }
    }
}

/// Accumulated view of a run, built one event at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderModel {
    pub steps: Vec<StepView>,
    pub is_submit: bool,
    pub verdict: Option<SubmissionVerdict>,
    pub done: bool,
    last_step: Option<usize>,
}

impl RenderModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the model. Returns a progress line to print
    /// immediately, if the event warrants one.
    pub fn apply(&mut self, event: &RunEvent, theme: &Theme) -> Option<String> {
        match event {
            RunEvent::StepStarted {
                index,
                kind,
                display,
                response_variables,
                stdout_filter,
            } => {
                let view = StepView {
                    kind: *kind,
                    display: display.clone(),
                    tests: Vec::new(),
                    response_variables: response_variables.clone(),
                    stdout_filter: stdout_filter.clone(),
                    result: None,
                    finished: false,
                    passed: None,
                    waited_ms: None,
                };
                if *index < self.steps.len() {
                    self.steps[*index] = view;
                } else {
                    self.steps.push(view);
                }
                self.last_step = Some(*index);
                let step = self.steps.get(*index)?;
                Some(theme.gray(&format!("{}...", step.header())))
            }
            RunEvent::TestStarted {
                step_index,
                test_index,
                text,
            } => {
                let step = self.steps.get_mut(*step_index)?;
                let view = TestView {
                    text: text.clone(),
                    finished: false,
                    passed: None,
                };
                if *test_index < step.tests.len() {
                    step.tests[*test_index] = view;
                } else {
                    step.tests.push(view);
                }
                None
            }
            RunEvent::TestResolved {
                step_index,
                test_index,
                passed,
            } => {
                let test = self
                    .steps
                    .get_mut(*step_index)?
                    .tests
                    .get_mut(*test_index)?;
                test.finished = true;
                if passed.is_some() {
                    test.passed = *passed;
                }
                None
            }
            RunEvent::StepResolved {
                index,
                passed,
                result,
            } => {
                let step = self.steps.get_mut(*index)?;
                step.finished = true;
                if passed.is_some() {
                    step.passed = *passed;
                }
                if let Some(result) = result {
                    step.result = Some(result.as_ref().clone());
                }
                None
            }
            RunEvent::Waiting { duration_ms } => {
                if let Some(step) = self.last_step.and_then(|i| self.steps.get_mut(i)) {
                    step.waited_ms = Some(*duration_ms);
                }
                Some(theme.gray(&waiting_text(*duration_ms)))
            }
            RunEvent::RunDone { verdict, is_submit } => {
                self.verdict = verdict.clone();
                self.is_submit = *is_submit;
                self.done = true;
                None
            }
        }
    }

    /// Full report: every step with its tests and output, then the outcome.
    pub fn final_view(&self, theme: &Theme) -> String {
        let mut out = String::new();
        for step in &self.steps {
            out.push('\n');
            out.push_str(&self.render_step(step, theme));
        }

        if let Some(verdict) = &self.verdict {
            out.push_str("\n\n");
            out.push_str(&theme.red("Tests failed! ❌"));
            out.push_str(&theme.red(&format!(
                "\n\nFailed Step: {}",
                verdict.failed_step_index + 1
            )));
            out.push_str(&theme.red(&format!("\nError: {}", verdict.error_message)));
            out.push_str("\n\n");
        } else if self.is_submit {
            out.push_str("\n\n");
            out.push_str(&theme.green("All tests passed! 🎉"));
            out.push_str("\n\n");
            out.push_str(&theme.green(
                "Return to your browser to continue with the next lesson.",
            ));
            out.push_str("\n\n");
        }
        out
    }

    fn render_step(&self, step: &StepView, theme: &Theme) -> String {
        let mut out = String::new();
        let header = step.header();
        let header = if self.is_submit {
            mark(&header, step.passed, theme)
        } else {
            header
        };
        out.push_str(&header);
        out.push('\n');

        if let Some(filter) = &step.stdout_filter {
            out.push_str(TREE_EDGE);
            out.push_str(&theme.gray(&format!("Filtering output to block `{}`", filter)));
            out.push('\n');
        }

        for test in &step.tests {
            let text = indent_continuation(&test.text);
            let line = if !test.finished {
                text
            } else {
                mark(&text, test.passed, theme)
            };
            out.push_str(TREE_EDGE);
            out.push_str(&line);
            out.push('\n');
        }

        for var in &step.response_variables {
            out.push_str(TREE_EDGE);
            out.push_str(&theme.gray(&format!(
                " *  Saving `{}` from `{}`",
                var.name, var.path
            )));
            out.push('\n');
        }

        if let Some(ms) = step.waited_ms {
            out.push_str(TREE_EDGE);
            out.push_str(&theme.gray(&waiting_text(ms)));
            out.push('\n');
        }

        match &step.result {
            Some(StepResult::Command(result)) => out.push_str(&render_command(step, result)),
            Some(StepResult::Http(result)) => out.push_str(&render_http(result)),
            None => {}
        }
        out
    }
}

fn mark(text: &str, passed: Option<bool>, theme: &Theme) -> String {
    match passed {
        Some(true) => theme.green(&format!("✓  {}", text)),
        Some(false) => theme.red(&format!("X  {}", text)),
        None => theme.gray(&format!("?  {}", text)),
    }
}

fn indent_continuation(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join(&format!("\n{}", TREE_CONTINUATION))
}

fn waiting_text(duration_ms: u64) -> String {
    format!("Waiting {:.1} seconds...", duration_ms as f64 / 1000.0)
}

// ---------------------------------------------------------------------------
// Result details
// ---------------------------------------------------------------------------

fn render_command(step: &StepView, result: &CommandResult) -> String {
    let mut out = String::new();
    if step.tests.iter().any(|t| t.text.contains("exit code")) {
        out.push_str(&format!("\n > Command exit code: {}\n", result.exit_code));
    }
    out.push_str(" > Command stdout:\n\n");
    let (shown, truncated) = truncate_stdout(&result.stdout);
    for line in shown.lines() {
        out.push_str(line);
        out.push('\n');
    }
    if truncated {
        out.push_str("... output truncated\n");
    }
    if !result.jq_outputs.is_empty() {
        out.push_str(&render_jq_outputs(&result.jq_outputs));
    }
    out
}

/// Cap stdout at [`MAX_STDOUT_LINES`] lines and [`MAX_STDOUT_CHARS`]
/// characters. The flag reports whether anything was cut.
pub fn truncate_stdout(stdout: &str) -> (String, bool) {
    let lines: Vec<&str> = stdout.lines().collect();
    let mut truncated = lines.len() > MAX_STDOUT_LINES;
    let kept = lines[..lines.len().min(MAX_STDOUT_LINES)].join("\n");
    if kept.chars().count() > MAX_STDOUT_CHARS {
        truncated = true;
        return (kept.chars().take(MAX_STDOUT_CHARS).collect(), truncated);
    }
    (kept, truncated)
}

fn render_jq_outputs(outputs: &[JqOutput]) -> String {
    let mut out = String::from("\n > jq output:\n\n");
    for output in outputs {
        out.push_str(&format!("  Query: {}\n", output.query));
        if let Some(error) = &output.error {
            out.push_str(&format!("  Error: {}\n", error));
        } else if output.results.is_empty() {
            out.push_str("  Results: [none]\n");
        } else {
            out.push_str("  Results:\n");
            for result in &output.results {
                out.push_str(&format!("    - {}\n", result));
            }
        }
        out.push('\n');
    }
    out
}

fn render_http(result: &HttpResult) -> String {
    let mut out = String::new();
    if let Some(error) = &result.error {
        out.push_str(&format!("  Err: {}\n\n", error));
        return out;
    }

    out.push_str(&format!("  Response Status Code: {}\n", result.status_code));

    let tested: Vec<String> = result
        .request
        .tests
        .iter()
        .filter_map(|test| match test {
            HttpAssertion::HeadersContain(h) => Some(substitute(&h.key, &result.variables)),
            _ => None,
        })
        .collect();
    let shown: Vec<(&String, &String)> = result
        .response_headers
        .iter()
        .filter(|(name, _)| tested.iter().any(|t| t.eq_ignore_ascii_case(name)))
        .collect();
    if !shown.is_empty() {
        out.push_str("  Response Headers: \n");
        for (name, value) in shown {
            out.push_str(&format!("   - {}: {}\n", name, value));
        }
    }

    if result
        .request
        .tests
        .iter()
        .any(|test| matches!(test, HttpAssertion::TrailersContain(_)))
    {
        out.push_str("  Response Trailers: [not captured locally]\n");
    }

    out.push_str("  Response Body: \n");
    if looks_binary(&result.body_string) {
        let content_type = result
            .response_headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
            .unwrap_or("application/octet-stream");
        out.push_str(&format!("Binary {} file", content_type));
    } else {
        out.push_str(&pretty_body(&result.body_string));
    }
    out.push('\n');

    if !result.variables.is_empty() {
        out.push_str("  Variables available: \n");
        for (name, value) in result.variables.iter() {
            if value.is_empty() {
                out.push_str(&format!("   - {}: [not found]\n", name));
            } else {
                out.push_str(&format!("   - {}: {}\n", name, value));
            }
        }
    }
    out.push('\n');
    out
}

/// Bodies with NUL bytes, replacement characters from lossy decoding, or
/// other control characters are not shown as text.
fn looks_binary(body: &str) -> bool {
    body.chars().any(|c| {
        c == char::REPLACEMENT_CHARACTER
            || (c.is_control() && !matches!(c, '\t' | '\n' | '\r' | '\x0c' | '\x1b'))
    })
}

/// Indent JSON bodies for reading. Anything else passes through.
fn pretty_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| body.to_string())
}

// ---------------------------------------------------------------------------
// Event consumer
// ---------------------------------------------------------------------------

/// Drain run events, printing progress as it happens and the full report
/// once the run is done or the channel closes.
pub async fn render_events<W: Write>(
    mut events: UnboundedReceiver<RunEvent>,
    theme: Theme,
    mut out: W,
) -> std::io::Result<RenderModel> {
    let mut model = RenderModel::new();
    while let Some(event) = events.recv().await {
        if let Some(line) = model.apply(&event, &theme) {
            writeln!(out, "{}", line)?;
            out.flush()?;
        }
        if model.done {
            break;
        }
    }
    write!(out, "{}", model.final_view(&theme))?;
    out.flush()?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use stepcheck_engine::{EventEmitter, EventSink};
    use stepcheck_types::{HeaderExpectation, HttpRequestSpec, HttpStep, Variables};

    fn command_started(index: usize, display: &str) -> RunEvent {
        RunEvent::StepStarted {
            index,
            kind: StepKind::Command,
            display: display.into(),
            response_variables: vec![],
            stdout_filter: None,
        }
    }

    fn test_started(step_index: usize, test_index: usize, text: &str) -> RunEvent {
        RunEvent::TestStarted {
            step_index,
            test_index,
            text: text.into(),
        }
    }

    fn resolved_test(step_index: usize, test_index: usize, passed: Option<bool>) -> RunEvent {
        RunEvent::TestResolved {
            step_index,
            test_index,
            passed,
        }
    }

    fn command_result(exit_code: i32, stdout: &str) -> Box<StepResult> {
        Box::new(StepResult::Command(CommandResult {
            exit_code,
            final_command: String::new(),
            stdout: stdout.into(),
            variables: Variables::new(),
            jq_outputs: vec![],
        }))
    }

    fn http_result(body: &str, headers: &[(&str, &str)], tested_header: &str) -> HttpResult {
        HttpResult {
            error: None,
            status_code: 201,
            response_headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            response_trailers: BTreeMap::new(),
            body_string: body.into(),
            variables: [("id", "42")].into_iter().collect(),
            request: HttpStep {
                response_variables: vec![],
                tests: vec![HttpAssertion::HeadersContain(HeaderExpectation {
                    key: tested_header.into(),
                    value: "json".into(),
                })],
                request: HttpRequestSpec {
                    method: "POST".into(),
                    full_url: "${baseURL}/users".into(),
                    headers: BTreeMap::new(),
                    body_json: None,
                    basic_auth: None,
                    actions: Default::default(),
                },
                sleep_after_ms: None,
            },
        }
    }

    #[test]
    fn step_started_prints_progress_header() {
        let mut model = RenderModel::new();
        let line = model.apply(&command_started(0, "echo hi"), &Theme::plain());
        assert_eq!(line.as_deref(), Some("Running: echo hi..."));

        let line = model.apply(
            &RunEvent::StepStarted {
                index: 1,
                kind: StepKind::Http,
                display: "GET http://localhost/x".into(),
                response_variables: vec![],
                stdout_filter: None,
            },
            &Theme::plain(),
        );
        assert_eq!(line.as_deref(), Some("GET http://localhost/x..."));
        assert_eq!(model.steps.len(), 2);
    }

    #[test]
    fn run_mode_marks_tests_unknown_and_has_no_outcome() {
        let theme = Theme::plain();
        let mut model = RenderModel::new();
        for event in [
            command_started(0, "echo hi"),
            test_started(0, 0, "Expect exit code 0"),
            resolved_test(0, 0, None),
            RunEvent::StepResolved {
                index: 0,
                passed: None,
                result: Some(command_result(0, "hi")),
            },
            RunEvent::RunDone {
                verdict: None,
                is_submit: false,
            },
        ] {
            model.apply(&event, &theme);
        }

        let view = model.final_view(&theme);
        assert!(view.contains("Running: echo hi\n"));
        assert!(view.contains(" ├─ ?  Expect exit code 0\n"));
        assert!(view.contains(" > Command exit code: 0"));
        assert!(view.contains(" > Command stdout:\n\nhi\n"));
        assert!(!view.contains("All tests passed"));
        assert!(!view.contains("Tests failed"));
    }

    #[test]
    fn exit_code_line_only_when_a_test_mentions_it() {
        let theme = Theme::plain();
        let mut model = RenderModel::new();
        model.apply(&command_started(0, "ls"), &theme);
        model.apply(&test_started(0, 0, "Expect stdout to contain all of:"), &theme);
        model.apply(
            &RunEvent::StepResolved {
                index: 0,
                passed: None,
                result: Some(command_result(3, "a")),
            },
            &theme,
        );
        assert!(!model.final_view(&theme).contains("Command exit code"));
    }

    #[test]
    fn submit_failure_marks_steps_and_reports_verdict() {
        let theme = Theme::plain();
        let mut model = RenderModel::new();
        let events = vec![
            command_started(0, "echo a"),
            test_started(0, 0, "Expect exit code 0"),
            resolved_test(0, 0, None),
            RunEvent::StepResolved { index: 0, passed: None, result: None },
            command_started(1, "echo b"),
            test_started(1, 0, "Expect exit code 1"),
            test_started(1, 1, "Expect exit code 2"),
            resolved_test(1, 0, None),
            resolved_test(1, 1, None),
            RunEvent::StepResolved { index: 1, passed: None, result: None },
            // verdict replay
            RunEvent::StepResolved { index: 0, passed: Some(true), result: None },
            resolved_test(0, 0, Some(true)),
            RunEvent::StepResolved { index: 1, passed: Some(false), result: None },
            resolved_test(1, 0, Some(false)),
            RunEvent::RunDone {
                verdict: Some(SubmissionVerdict {
                    error_message: "expected exit code 1".into(),
                    failed_step_index: 1,
                    failed_test_index: 0,
                }),
                is_submit: true,
            },
        ];
        for event in &events {
            model.apply(event, &theme);
        }

        let view = model.final_view(&theme);
        assert!(view.contains("✓  Running: echo a"));
        assert!(view.contains(" ├─ ✓  Expect exit code 0"));
        assert!(view.contains("X  Running: echo b"));
        assert!(view.contains(" ├─ X  Expect exit code 1"));
        assert!(view.contains(" ├─ ?  Expect exit code 2"));
        assert!(view.contains("Tests failed! ❌\n\nFailed Step: 2\nError: expected exit code 1"));
    }

    #[test]
    fn submit_success_prints_next_lesson_hint() {
        let theme = Theme::plain();
        let mut model = RenderModel::new();
        model.apply(
            &RunEvent::RunDone {
                verdict: None,
                is_submit: true,
            },
            &theme,
        );
        let view = model.final_view(&theme);
        assert!(view.contains("All tests passed! 🎉"));
        assert!(view.contains("Return to your browser to continue with the next lesson."));
    }

    #[test]
    fn response_variables_and_waits_are_listed() {
        let theme = Theme::plain();
        let mut model = RenderModel::new();
        model.apply(
            &RunEvent::StepStarted {
                index: 0,
                kind: StepKind::Http,
                display: "POST http://localhost/login".into(),
                response_variables: vec![ResponseVariable {
                    name: "token".into(),
                    path: ".token".into(),
                }],
                stdout_filter: None,
            },
            &theme,
        );
        let line = model.apply(&RunEvent::Waiting { duration_ms: 1500 }, &theme);
        assert_eq!(line.as_deref(), Some("Waiting 1.5 seconds..."));

        let view = model.final_view(&theme);
        assert!(view.contains(" ├─  *  Saving `token` from `.token`"));
        assert!(view.contains(" ├─ Waiting 1.5 seconds..."));
    }

    #[test]
    fn multiline_test_text_is_indented_under_the_tree() {
        let theme = Theme::plain();
        let mut model = RenderModel::new();
        model.apply(&command_started(0, "cat x"), &theme);
        model.apply(&test_started(0, 0, "Expect stdout to contain all of:\n - 'a'"), &theme);
        let view = model.final_view(&theme);
        assert!(view.contains(" ├─ Expect stdout to contain all of:\n │     - 'a'"));
    }

    #[test]
    fn http_details_filter_headers_and_pretty_print_body() {
        let result = http_result(
            r#"{"id":42}"#,
            &[("Content-Type", "application/json"), ("X-Other", "skip")],
            "content-type",
        );
        let text = render_http(&result);
        assert!(text.contains("  Response Status Code: 201\n"));
        assert!(text.contains("   - Content-Type: application/json\n"));
        assert!(!text.contains("X-Other"));
        assert!(text.contains("{\n  \"id\": 42\n}"));
        assert!(text.contains("  Variables available: \n   - id: 42\n"));
    }

    #[test]
    fn tested_header_keys_are_interpolated() {
        let mut result = http_result("{}", &[("X-Token", "abc"), ("X-Other", "skip")], "${hdr}");
        result.variables.set("hdr", "x-token");
        let text = render_http(&result);
        assert!(text.contains("   - X-Token: abc\n"));
        assert!(!text.contains("X-Other"));
    }

    #[test]
    fn variables_section_only_lists_existing_variables() {
        let mut result = http_result("{}", &[], "x");
        result.variables = Variables::new();
        assert!(!render_http(&result).contains("Variables available"));

        result.variables.set("empty", "");
        result.variables.set("id", "7");
        let text = render_http(&result);
        assert!(text.contains("  Variables available: \n"));
        assert!(text.contains("   - empty: [not found]\n"));
        assert!(text.contains("   - id: 7\n"));
    }

    #[test]
    fn binary_body_is_summarized() {
        let result = http_result("\u{0}\u{1}PNG\u{fffd}", &[("Content-Type", "image/png")], "x");
        let text = render_http(&result);
        assert!(text.contains("  Response Body: \nBinary image/png file\n"));
        assert!(!looks_binary("plain\ttext\n"));
    }

    #[test]
    fn trailer_tests_note_that_trailers_are_not_captured() {
        let mut result = http_result("{}", &[], "x");
        assert!(!render_http(&result).contains("Response Trailers"));

        result.request.tests = vec![HttpAssertion::TrailersContain(HeaderExpectation {
            key: "Grpc-Status".into(),
            value: "0".into(),
        })];
        assert!(render_http(&result).contains("  Response Trailers: [not captured locally]\n"));
    }

    #[test]
    fn http_details_for_transport_error() {
        let mut result = http_result("", &[], "x");
        result.error = Some("Failed to fetch: connection refused".into());
        assert_eq!(render_http(&result), "  Err: Failed to fetch: connection refused\n\n");
    }

    #[test]
    fn non_json_body_passes_through() {
        assert_eq!(pretty_body("plain text"), "plain text");
    }

    #[test]
    fn stdout_is_truncated_by_lines_and_chars() {
        let many: String = (0..40).map(|i| format!("line {}\n", i)).collect();
        let (shown, truncated) = truncate_stdout(&many);
        assert!(truncated);
        assert_eq!(shown.lines().count(), MAX_STDOUT_LINES);

        let wide = "x".repeat(MAX_STDOUT_CHARS + 10);
        let (shown, truncated) = truncate_stdout(&wide);
        assert!(truncated);
        assert_eq!(shown.chars().count(), MAX_STDOUT_CHARS);

        let (shown, truncated) = truncate_stdout("short");
        assert!(!truncated);
        assert_eq!(shown, "short");
    }

    #[test]
    fn jq_outputs_render_each_state() {
        let text = render_jq_outputs(&[
            JqOutput {
                query: ".a".into(),
                results: vec!["1".into(), "\"x\"".into()],
                error: None,
            },
            JqOutput {
                query: ".b".into(),
                results: vec![],
                error: None,
            },
            JqOutput {
                query: "bad(".into(),
                results: vec![],
                error: Some("parse error".into()),
            },
        ]);
        assert!(text.starts_with("\n > jq output:\n\n"));
        assert!(text.contains("  Query: .a\n  Results:\n    - 1\n    - \"x\"\n"));
        assert!(text.contains("  Query: .b\n  Results: [none]\n"));
        assert!(text.contains("  Query: bad(\n  Error: parse error\n"));
    }

    #[test]
    fn events_for_unknown_steps_are_ignored() {
        let mut model = RenderModel::new();
        assert!(model
            .apply(&resolved_test(4, 0, Some(true)), &Theme::plain())
            .is_none());
        assert!(model.steps.is_empty());
    }

    #[tokio::test]
    async fn consumer_prints_progress_then_report() {
        let (emitter, rx) = EventEmitter::channel();
        emitter.emit(command_started(0, "echo hi"));
        emitter.emit(RunEvent::StepResolved {
            index: 0,
            passed: None,
            result: Some(command_result(0, "hi")),
        });
        emitter.emit(RunEvent::RunDone {
            verdict: None,
            is_submit: false,
        });

        let mut buffer = Vec::new();
        let model = render_events(rx, Theme::plain(), &mut buffer).await.unwrap();
        let printed = String::from_utf8(buffer).unwrap();

        assert!(model.done);
        assert!(printed.starts_with("Running: echo hi...\n"));
        assert!(printed.contains(" > Command stdout:\n\nhi\n"));
    }

    #[tokio::test]
    async fn consumer_finishes_when_channel_closes() {
        let (emitter, rx) = EventEmitter::channel();
        emitter.emit(command_started(0, "true"));
        drop(emitter);

        let mut buffer = Vec::new();
        let model = render_events(rx, Theme::plain(), &mut buffer).await.unwrap();
        assert!(!model.done);
        assert_eq!(model.steps.len(), 1);
    }
}
