use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use stepcheck_types::{HttpResult, HttpStep, Variables, BASE_URL_PLACEHOLDER};

use crate::jq::{value_from_path, variable_text};
use crate::template::substitute;

/// Longest response body, in characters, kept on a result.
pub const MAX_BODY_CHARS: usize = 1_000_000;

/// Cut `body` to at most [`MAX_BODY_CHARS`] characters.
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_CHARS) {
        Some((cut, _)) => body[..cut].to_string(),
        None => body.to_string(),
    }
}

/// `content-type` -> `Content-Type`.
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Multi-valued headers collapse into one comma-joined entry per name.
fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat = BTreeMap::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        flat.insert(canonical_header_name(name.as_str()), joined);
    }
    flat
}

/// Resolve the request URL: base URL placeholder first, then variables.
pub fn resolve_url(template: &str, base_url: &str, vars: &Variables) -> String {
    let base = base_url.trim_end_matches('/');
    substitute(&template.replacen(BASE_URL_PLACEHOLDER, base, 1), vars)
}

// ---------------------------------------------------------------------------
// HttpExecutor
// ---------------------------------------------------------------------------

/// Sends HTTP steps and extracts their response variables.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
}

impl Default for HttpExecutor {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl HttpExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Send `step` and record the response.
    ///
    /// Response variables are written into `vars` before the snapshot is
    /// taken, so the result reflects what later steps will see. A variable
    /// whose path does not yield exactly one non-null value stays unset.
    pub async fn run(&self, step: &HttpStep, base_url: &str, vars: &mut Variables) -> HttpResult {
        let spec = &step.request;
        let url = resolve_url(&spec.full_url, base_url, vars);
        tracing::info!(method = %spec.method, url = %url, "Sending HTTP step");

        let method = match Method::from_bytes(spec.method.as_bytes()) {
            Ok(method) => method,
            Err(e) => {
                return HttpResult::failed(
                    format!("Failed to create request: {e}"),
                    step.clone(),
                    vars.snapshot(),
                )
            }
        };
        let parsed_url = match Url::parse(&url) {
            Ok(parsed) => parsed,
            Err(e) => {
                return HttpResult::failed(
                    format!("Failed to create request: {e}"),
                    step.clone(),
                    vars.snapshot(),
                )
            }
        };

        let mut request = self.client.request(method, parsed_url);
        if let Some(body) = &spec.body_json {
            // Interpolate the serialized text so placeholders inside string
            // values resolve too.
            let serialized = match serde_json::to_string(body) {
                Ok(text) => text,
                Err(e) => {
                    return HttpResult::failed(
                        format!("Failed to create request: {e}"),
                        step.clone(),
                        vars.snapshot(),
                    )
                }
            };
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(substitute(&serialized, vars));
        }
        for (name, value) in &spec.headers {
            request = request.header(name.as_str(), substitute(value, vars));
        }
        if let Some(auth) = &spec.basic_auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        if let Some(delay) = spec.actions.delay_request_by_ms.filter(|ms| *ms > 0) {
            tracing::debug!(delay_ms = delay, "Delaying request");
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "HTTP step failed");
                return HttpResult::failed(format!("Failed to fetch: {e}"), step.clone(), vars.snapshot());
            }
        };

        let status_code = response.status().as_u16();
        let response_headers = flatten_headers(response.headers());
        let body = match response.bytes().await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to read response body");
                return HttpResult::failed("Failed to read response body", step.clone(), vars.snapshot());
            }
        };

        for variable in &step.response_variables {
            match value_from_path(&variable.path, &body) {
                Ok(value) => {
                    let text = variable_text(&value);
                    tracing::debug!(name = %variable.name, value = %text, "Saved response variable");
                    vars.set(variable.name.clone(), text);
                }
                Err(e) => {
                    tracing::warn!(
                        name = %variable.name,
                        path = %variable.path,
                        error = %e,
                        "Response variable unavailable"
                    );
                }
            }
        }

        tracing::info!(status = status_code, body_len = body.len(), "HTTP step completed");

        HttpResult {
            error: None,
            status_code,
            response_headers,
            // reqwest does not surface HTTP trailers.
            response_trailers: BTreeMap::new(),
            body_string: truncate_body(&body),
            variables: vars.snapshot(),
            request: step.clone(),
        }
    }
}
