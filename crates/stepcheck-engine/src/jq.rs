//! jq query evaluation over `serde_json` documents, backed by `jaq`.
//!
//! Two calling conventions sit on top of [`evaluate`]:
//! - [`value_from_path`] extracts exactly one non-null value (response variables).
//! - [`run_stdout_query`] runs a stdout assertion's query for display.
//!
//! `halt`, and `halt_error` on a null input, end the output stream normally
//! instead of failing. `error(null)` is still an error.

use jaq_interpret::{Ctx, Error as JaqError, FilterT, ParseCtx, RcIter, Val};
use serde_json::Value;
use stepcheck_types::{JqInputMode, JqOutput, StdoutJqAssertion, Variables};

use crate::template::substitute;

/// Error value raised by `halt`. Only this value ends a stream cleanly.
const HALT_SIGNAL: &str = "__stepcheck_halt__";

/// Definitions layered on top of the jaq standard library.
/// jaq can catch the halt signal with `try`, unlike jq.
fn extra_defs() -> String {
    format!(
        "def halt: error(\"{HALT_SIGNAL}\"); \
         def halt_error: if . == null then halt else error end; \
         def halt_error(code): halt_error;"
    )
}

/// Failure kinds of query parsing, evaluation, and value extraction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("invalid query: {0}")]
    Parse(String),

    #[error("invalid query: {0}")]
    Compile(String),

    #[error("{0}")]
    Execution(String),

    #[error("expected a single JSON value")]
    MultipleJsonValues,

    #[error("value not found")]
    NoValues,

    #[error("value not found")]
    NullValue,

    #[error("invalid number of values found")]
    InvalidNumberOfValues(usize),
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn definitions() -> Result<ParseCtx, QueryError> {
    let mut defs = ParseCtx::new(Vec::new());
    defs.insert_natives(jaq_core::core());
    defs.insert_defs(jaq_std::std());

    let (extra, errs) = jaq_parse::parse(&extra_defs(), jaq_parse::defs());
    if let Some(err) = errs.first() {
        return Err(QueryError::Parse(err.to_string()));
    }
    defs.insert_defs(extra.unwrap_or_default());
    Ok(defs)
}

/// Run `query` against `document` and collect every output in order.
pub fn evaluate(query: &str, document: &Value) -> Result<Vec<Value>, QueryError> {
    let mut defs = definitions()?;

    let (main, errs) = jaq_parse::parse(query, jaq_parse::main());
    if !errs.is_empty() {
        let message = errs
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(QueryError::Parse(message));
    }
    let main = main.ok_or_else(|| QueryError::Parse(format!("empty query '{query}'")))?;

    let filter = defs.compile(main);
    if !defs.errs.is_empty() {
        let message = defs
            .errs
            .iter()
            .map(|(err, span)| format!("{} `{}`", err, span_text(query, span)))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(QueryError::Compile(message));
    }

    let inputs = RcIter::new(core::iter::empty());
    let mut values = Vec::new();
    for output in filter.run((Ctx::new([], &inputs), Val::from(document.clone()))) {
        match output {
            Ok(val) => values.push(Value::from(val)),
            Err(JaqError::Val(val)) if is_halt(&val) => break,
            Err(err) => return Err(QueryError::Execution(err.to_string())),
        }
    }
    Ok(values)
}

fn is_halt(val: &Val) -> bool {
    matches!(Value::from(val.clone()), Value::String(s) if s == HALT_SIGNAL)
}

/// The part of `query` a compile error points at. Spans count characters.
fn span_text(query: &str, span: &std::ops::Range<usize>) -> String {
    query
        .chars()
        .skip(span.start)
        .take(span.end.saturating_sub(span.start))
        .collect()
}

/// Extract exactly one non-null value from a JSON text.
pub fn value_from_path(path: &str, json: &str) -> Result<Value, QueryError> {
    let document: Value =
        serde_json::from_str(json).map_err(|e| QueryError::InvalidJson(e.to_string()))?;
    let mut values = evaluate(path, &document)?;
    match values.len() {
        0 => Err(QueryError::NoValues),
        1 => match values.pop() {
            Some(Value::Null) | None => Err(QueryError::NullValue),
            Some(value) => Ok(value),
        },
        n => Err(QueryError::InvalidNumberOfValues(n)),
    }
}

/// String form stored in the variable table: strings raw, everything else
/// as JSON text.
pub fn variable_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Stdout queries
// ---------------------------------------------------------------------------

/// Parse command output as query input.
///
/// `Json` requires exactly one value (surrounding whitespace allowed).
/// `JsonLines` collects every value in the stream into an array.
pub fn parse_stdout_input(stdout: &str, mode: JqInputMode) -> Result<Value, QueryError> {
    let mut stream = serde_json::Deserializer::from_str(stdout).into_iter::<Value>();
    match mode {
        JqInputMode::JsonLines => {
            let values = stream
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| QueryError::InvalidJson(e.to_string()))?;
            Ok(Value::Array(values))
        }
        JqInputMode::Json => {
            let first = match stream.next() {
                Some(Ok(value)) => value,
                Some(Err(e)) => return Err(QueryError::InvalidJson(e.to_string())),
                None => {
                    return Err(QueryError::InvalidJson(
                        "unexpected end of JSON input".into(),
                    ))
                }
            };
            match stream.next() {
                None => Ok(first),
                Some(Ok(_)) => Err(QueryError::MultipleJsonValues),
                Some(Err(e)) => Err(QueryError::InvalidJson(e.to_string())),
            }
        }
    }
}

/// Encode each result as JSON text.
pub fn format_results(results: &[Value]) -> Vec<String> {
    results.iter().map(Value::to_string).collect()
}

/// Run one stdout assertion's query, capturing results or the error text.
pub fn run_stdout_query(stdout: &str, test: &StdoutJqAssertion, vars: &Variables) -> JqOutput {
    let query = substitute(&test.query, vars);
    let outcome = parse_stdout_input(stdout, test.mode()).and_then(|input| evaluate(&query, &input));
    match outcome {
        Ok(results) => JqOutput {
            query,
            results: format_results(&results),
            error: None,
        },
        Err(err) => {
            tracing::debug!(query = %query, error = %err, "stdout query failed");
            JqOutput {
                query,
                results: Vec::new(),
                error: Some(err.to_string()),
            }
        }
    }
}
