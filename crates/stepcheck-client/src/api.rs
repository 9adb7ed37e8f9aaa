use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stepcheck_types::{Lesson, Result, StepCheckError, StepResult, SubmissionVerdict};

use crate::{LessonSource, SubmissionSink};

pub const DEFAULT_API_URL: &str = "https://api.boot.dev";

#[derive(Serialize)]
struct LessonSubmission<'a> {
    #[serde(rename = "CLIResults")]
    cli_results: &'a [StepResult],
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VerificationResult {
    #[serde(default)]
    result_message: Option<String>,
    #[serde(rename = "StructuredErrCLI", default)]
    structured_err_cli: Option<SubmissionVerdict>,
}

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    api_url: String,
    access_token: String,
}

impl ApiClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            access_token: access_token.into(),
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(u16, String)> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| StepCheckError::Http(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| StepCheckError::Http(e.to_string()))?;
        Ok((status, body))
    }
}

fn check_status(status: u16, body: String) -> Result<String> {
    match status {
        200 => Ok(body),
        402 => Err(StepCheckError::MembershipRequired),
        _ => Err(StepCheckError::Api {
            status,
            message: body,
        }),
    }
}

#[async_trait]
impl LessonSource for ApiClient {
    async fn fetch_lesson(&self, lesson_id: &str) -> Result<Lesson> {
        let url = format!("{}/v1/lessons/{}", self.api_url, lesson_id);
        tracing::debug!(url = %url, "Fetching lesson");
        let (status, body) = self.send(self.client.get(&url)).await?;
        let body = check_status(status, body)?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl SubmissionSink for ApiClient {
    async fn submit(
        &self,
        lesson_id: &str,
        results: &[StepResult],
    ) -> Result<Option<SubmissionVerdict>> {
        let url = format!("{}/v1/lessons/{}/", self.api_url, lesson_id);
        tracing::info!(url = %url, steps = results.len(), "Submitting results");
        let payload = LessonSubmission {
            cli_results: results,
        };
        let (status, body) = self.send(self.client.post(&url).json(&payload)).await?;
        let body = check_status(status, body)?;

        let verification: VerificationResult = serde_json::from_str(&body)?;
        if let Some(message) = &verification.result_message {
            tracing::debug!(message = %message, "Submission graded");
        }
        Ok(verification.structured_err_cli)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use stepcheck_types::{CommandResult, LessonStep};

    const LESSON_ID: &str = "0e5a1b8e-7c1d-4a52-9a51-2d1f6b3b3c11";

    fn client(server: &mockito::ServerGuard) -> ApiClient {
        ApiClient::new("tok").with_api_url(server.url())
    }

    #[tokio::test]
    async fn fetch_lesson_sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", format!("/v1/lessons/{LESSON_ID}").as_str())
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_body(
                json!({"Lesson": {"Type": "type_cli", "LessonDataCLI": {"CLIData": {
                    "BaseURLDefault": "http://localhost:8080",
                    "Steps": [{"CLICommand": {"Command": "ls", "Tests": [{"ExitCode": 0}]}}]
                }}}})
                .to_string(),
            )
            .create_async()
            .await;

        let lesson = client(&server).fetch_lesson(LESSON_ID).await.unwrap();
        mock.assert_async().await;
        let data = lesson.into_cli_data().unwrap();
        assert!(matches!(data.steps[0], LessonStep::Command(_)));
    }

    #[tokio::test]
    async fn payment_required_maps_to_membership_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(402)
            .create_async()
            .await;

        let err = client(&server).fetch_lesson(LESSON_ID).await.unwrap_err();
        assert!(matches!(err, StepCheckError::MembershipRequired));
    }

    #[tokio::test]
    async fn other_status_maps_to_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(404)
            .with_body("lesson not found")
            .create_async()
            .await;

        match client(&server).fetch_lesson(LESSON_ID).await.unwrap_err() {
            StepCheckError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "lesson not found");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn submit_posts_results_and_reads_verdict() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", format!("/v1/lessons/{LESSON_ID}/").as_str())
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::PartialJson(json!({
                "CLIResults": [{"CLICommandResult": {"ExitCode": 1, "Stdout": "nope"}}]
            })))
            .with_status(200)
            .with_body(
                json!({"ResultSlug": "failure", "ResultMessage": "try again",
                       "StructuredErrCLI": {"Error": "bad exit", "FailedStepIndex": 0, "FailedTestIndex": 0}})
                .to_string(),
            )
            .create_async()
            .await;

        let results = vec![StepResult::Command(CommandResult {
            exit_code: 1,
            stdout: "nope".into(),
            ..CommandResult::default()
        })];
        let verdict = client(&server).submit(LESSON_ID, &results).await.unwrap();
        mock.assert_async().await;

        let verdict = verdict.unwrap();
        assert_eq!(verdict.error_message, "bad exit");
        assert_eq!(verdict.failed_step_index, 0);
    }

    #[tokio::test]
    async fn submit_success_has_no_verdict() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Any)
            .with_status(200)
            .with_body(r#"{"ResultSlug": "success", "StructuredErrCLI": null}"#)
            .create_async()
            .await;

        let verdict = client(&server).submit(LESSON_ID, &[]).await.unwrap();
        assert!(verdict.is_none());
    }

    #[test]
    fn api_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("t").with_api_url("http://localhost:9000/");
        assert_eq!(client.api_url(), "http://localhost:9000");
    }
}
