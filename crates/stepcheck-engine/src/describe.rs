//! Human-readable expectation text for assertions.
//!
//! Pass/fail is decided by the grading service, never here. These strings
//! are what the renderer prints next to each test.

use std::fmt::Write as _;

use serde_json::Value;
use stepcheck_types::lesson::JQ_TYPE_STRING;
use stepcheck_types::{
    CommandAssertion, HttpAssertion, JqExpectedResult, StdoutJqAssertion, Variables,
};

use crate::template::substitute;

/// Describe a command-step assertion.
pub fn describe_command(test: &CommandAssertion, vars: &Variables) -> String {
    match test {
        CommandAssertion::ExitCode(code) => format!("Expect exit code {code}"),
        CommandAssertion::StdoutLinesGt(lines) => format!("Expect > {lines} lines on stdout"),
        CommandAssertion::StdoutContainsAll(items) => {
            bullet_list("Expect stdout to contain all of:", items, vars)
        }
        CommandAssertion::StdoutContainsNone(items) => {
            bullet_list("Expect stdout to contain none of:", items, vars)
        }
        CommandAssertion::StdoutJq(jq) => describe_stdout_jq(jq, vars),
    }
}

fn bullet_list(header: &str, items: &[String], vars: &Variables) -> String {
    let mut text = header.to_string();
    for item in items {
        let _ = write!(text, "\n      - '{}'", substitute(item, vars));
    }
    text
}

fn describe_stdout_jq(test: &StdoutJqAssertion, vars: &Variables) -> String {
    let mut text = format!(
        "Expect jq query '{}' to yield values satisfying:",
        substitute(&test.query, vars)
    );
    if test.expected_results.is_empty() {
        text.push_str("\n       - [no expected results provided]");
        return text;
    }
    for expected in &test.expected_results {
        let _ = write!(
            text,
            "\n       - {} {} {}",
            expected.kind,
            expected.operator,
            expected_value_text(expected, vars)
        );
    }
    text
}

/// JSON encoding of an expected value; string-typed strings are interpolated first.
fn expected_value_text(expected: &JqExpectedResult, vars: &Variables) -> String {
    match &expected.value {
        Value::String(s) if expected.kind == JQ_TYPE_STRING => {
            Value::String(substitute(s, vars)).to_string()
        }
        other => other.to_string(),
    }
}

/// Describe an HTTP-step assertion.
pub fn describe_http(test: &HttpAssertion, vars: &Variables) -> String {
    match test {
        HttpAssertion::StatusCode(code) => format!("Expecting status code: {code}"),
        HttpAssertion::BodyContains(text) => {
            format!("Expecting body to contain: {}", substitute(text, vars))
        }
        HttpAssertion::BodyContainsNone(text) => {
            format!("Expecting JSON body to not contain: {}", substitute(text, vars))
        }
        HttpAssertion::HeadersContain(header) => format!(
            "Expecting headers to contain: '{}: {}'",
            substitute(&header.key, vars),
            substitute(&header.value, vars)
        ),
        HttpAssertion::TrailersContain(trailer) => format!(
            "Expecting trailers to contain: '{}: {}'",
            substitute(&trailer.key, vars),
            substitute(&trailer.value, vars)
        ),
        HttpAssertion::JsonValue(json) => {
            let expected = json
                .expected
                .as_ref()
                .map_or_else(|| "null".to_string(), ToString::to_string);
            let text = format!(
                "Expecting JSON at {} {} {}",
                json.path,
                json.operator.phrase(),
                expected
            );
            substitute(&text, vars)
        }
    }
}
