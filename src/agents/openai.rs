use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::db::Department;

const SUMMARIZE_SYSTEM_PROMPT: &str = "You are a helpful assistant that summarizes documents \
and extracts department names with emails. Always return a JSON object with 'summary' (string) \
and 'departments' (list of objects).";

const ANSWER_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer questions based on the \
provided document summary and text in 20-30 words.";

const MIN_ANSWER_WORDS: usize = 20;
const MAX_ANSWER_WORDS: usize = 30;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to language model failed: {0}")]
    RequestFailed(String),
    #[error("language model returned {status}: {body}")]
    ServiceError { status: u16, body: String },
    #[error("invalid language model response: {0}")]
    InvalidResponse(String),
}

/// Validated result of the summarization call. Deserialization is the schema
/// check: missing keys, a non-string summary, or a malformed department entry
/// all fail here and are never repaired or retried.
#[derive(Debug, Deserialize)]
pub struct DocumentAnalysis {
    pub summary: String,
    pub departments: Vec<Department>,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiAgent {
    client: Client,
    api_key: String,
    endpoint: String,
    deployment: String,
    api_version: String,
}

impl OpenAiAgent {
    pub fn new(api_key: String, endpoint: String, deployment: String, api_version: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint,
            deployment,
            api_version,
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }

    async fn chat(&self, body: &ChatRequest) -> Result<String, LlmError> {
        let response = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(LlmError::ServiceError {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::InvalidResponse(format!("decode failed: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no content in response".to_string()))
    }

    /// Summarize extracted document text and enumerate the departments it
    /// mentions, via a JSON-mode completion.
    pub async fn analyze_document(&self, text: &str) -> Result<DocumentAnalysis, LlmError> {
        info!("Requesting document analysis ({} chars)", text.len());

        let body = ChatRequest {
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SUMMARIZE_SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: analysis_prompt(text),
                },
            ],
            response_format: Some(ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        };

        let content = self.chat(&body).await?;
        parse_analysis(&content)
    }

    /// Answer a question against a stored summary and text. The model is asked
    /// for 20-30 words; the upper bound is enforced by truncation, the lower
    /// bound only logged.
    pub async fn answer_question(
        &self,
        summary: &str,
        extracted_text: &str,
        question: &str,
    ) -> Result<String, LlmError> {
        let body = ChatRequest {
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: ANSWER_SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: answer_prompt(summary, extracted_text, question),
                },
            ],
            response_format: None,
        };

        let content = self.chat(&body).await?;
        Ok(enforce_answer_bounds(content.trim()))
    }
}

fn analysis_prompt(text: &str) -> String {
    format!(
        "Analyze the following text extracted from a PDF document:\n\n{text}\n\n\
Tasks:\n\
1. Summarize the content into a clear, concise version in bullet-point format, \
written in a professional tone suitable for direct communication to a user.\n\
2. Identify all departments or organizational units mentioned in the text and \
extract their associated email addresses, if available. Each entry should include \
the department name and its email. If no email is provided, use null.\n\n\
Return the response strictly in JSON format:\n\
{{\"summary\": \"<summary_text>\", \"departments\": [{{\"name\": \"<department_name>\", \
\"email\": \"<department_email_or_null>\"}}]}}"
    )
}

fn answer_prompt(summary: &str, extracted_text: &str, question: &str) -> String {
    format!(
        "Using the following document summary and extracted text, answer the question \
in 20-30 words:\n\n\
Summary: {summary}\n\
Extracted Text: {extracted_text}\n\n\
Question: {question}\n\n\
Provide a clear, concise answer (20-30 words) in plain text."
    )
}

fn parse_analysis(raw: &str) -> Result<DocumentAnalysis, LlmError> {
    serde_json::from_str(raw)
        .map_err(|e| LlmError::InvalidResponse(format!("analysis did not match schema: {e}")))
}

fn enforce_answer_bounds(answer: &str) -> String {
    let words: Vec<&str> = answer.split_whitespace().collect();
    if words.len() > MAX_ANSWER_WORDS {
        warn!(
            "Answer word count {} above {} limit, truncating",
            words.len(),
            MAX_ANSWER_WORDS
        );
        return words[..MAX_ANSWER_WORDS].join(" ");
    }
    if words.len() < MIN_ANSWER_WORDS {
        warn!(
            "Answer word count {} below {} minimum: {}",
            words.len(),
            MIN_ANSWER_WORDS,
            answer
        );
    }
    answer.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    fn agent_for(server: &MockServer) -> OpenAiAgent {
        OpenAiAgent::new(
            "test-key".to_string(),
            server.base_url(),
            "gpt-4o".to_string(),
            "2024-02-15-preview".to_string(),
        )
    }

    fn completion_body(content: &str) -> serde_json::Value {
        json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    #[tokio::test]
    async fn analyze_document_parses_valid_response() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/openai/deployments/gpt-4o/chat/completions")
                    .query_param("api-version", "2024-02-15-preview")
                    .header("api-key", "test-key");
                then.status(200).json_body(completion_body(
                    r#"{"summary": "- point one", "departments": [
                        {"name": "Finance", "email": "finance@example.com"},
                        {"name": "Legal", "email": null}
                    ]}"#,
                ));
            })
            .await;

        let analysis = agent_for(&server)
            .analyze_document("some extracted text")
            .await
            .expect("analysis");

        mock.assert();
        assert_eq!(analysis.summary, "- point one");
        assert_eq!(analysis.departments.len(), 2);
        assert_eq!(
            analysis.departments[0].email.as_deref(),
            Some("finance@example.com")
        );
        assert!(analysis.departments[1].email.is_none());
    }

    #[tokio::test]
    async fn analyze_document_rejects_missing_departments() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200)
                    .json_body(completion_body(r#"{"summary": "just a summary"}"#));
            })
            .await;

        let error = agent_for(&server)
            .analyze_document("text")
            .await
            .expect_err("missing departments must fail");
        assert!(matches!(error, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn analyze_document_rejects_non_string_summary() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(completion_body(
                    r#"{"summary": 42, "departments": []}"#,
                ));
            })
            .await;

        let error = agent_for(&server)
            .analyze_document("text")
            .await
            .expect_err("non-string summary must fail");
        assert!(matches!(error, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn analyze_document_rejects_non_json_content() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200)
                    .json_body(completion_body("Sorry, I cannot help with that."));
            })
            .await;

        let error = agent_for(&server)
            .analyze_document("text")
            .await
            .expect_err("prose content must fail");
        assert!(matches!(error, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn chat_surfaces_service_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(500).body("upstream exploded");
            })
            .await;

        let error = agent_for(&server)
            .analyze_document("text")
            .await
            .expect_err("5xx must fail");
        assert!(matches!(error, LlmError::ServiceError { status: 500, .. }));
    }

    #[tokio::test]
    async fn answer_question_truncates_long_answers() {
        let long_answer = (1..=45)
            .map(|n| format!("word{n}"))
            .collect::<Vec<_>>()
            .join(" ");

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(completion_body(&long_answer));
            })
            .await;

        let answer = agent_for(&server)
            .answer_question("summary", "text", "what?")
            .await
            .expect("answer");

        assert_eq!(answer.split_whitespace().count(), 30);
        assert!(answer.starts_with("word1 word2"));
        assert!(answer.ends_with("word30"));
    }

    #[test]
    fn short_answers_pass_through_unchanged() {
        let short = "Only a few words here.";
        assert_eq!(enforce_answer_bounds(short), short);
    }

    #[test]
    fn truncation_joins_with_single_spaces() {
        let padded = (1..=45)
            .map(|n| format!("w{n}"))
            .collect::<Vec<_>>()
            .join("   ");
        let result = enforce_answer_bounds(&padded);
        assert_eq!(result.split(' ').count(), 30);
        assert!(!result.contains("  "));
    }
}
