use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::Config;

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid service account credentials: {0}")]
    InvalidCredentials(String),
    #[error("failed to obtain access token: {0}")]
    Auth(String),
    #[error("request to Document AI failed: {0}")]
    RequestFailed(String),
    #[error("Document AI returned {status}: {body}")]
    ServiceError { status: u16, body: String },
    #[error("no text extracted from the document")]
    NoText,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRequest {
    raw_document: RawDocument,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    content: String,
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct ProcessResponse {
    document: Option<ProcessedDocument>,
}

#[derive(Debug, Deserialize)]
struct ProcessedDocument {
    text: Option<String>,
}

pub struct DocAiClient {
    client: Client,
    account: CustomServiceAccount,
    endpoint: String,
    processor_path: String,
}

impl DocAiClient {
    pub fn new(config: &Config) -> Result<Self, ExtractionError> {
        let account = CustomServiceAccount::from_json(&config.google_credentials_json)
            .map_err(|e| ExtractionError::InvalidCredentials(e.to_string()))?;

        Ok(Self {
            client: Client::new(),
            account,
            endpoint: format!(
                "https://{}-documentai.googleapis.com",
                config.document_ai_location
            ),
            processor_path: processor_path(
                &config.google_project_id,
                &config.document_ai_location,
                &config.document_ai_processor_id,
            ),
        })
    }

    /// Send raw PDF bytes through the configured processor and return the full
    /// extracted text. Any failure, including an empty document, is an error.
    pub async fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String, ExtractionError> {
        let token = self
            .account
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| ExtractionError::Auth(e.to_string()))?;

        let body = ProcessRequest {
            raw_document: RawDocument {
                content: BASE64.encode(pdf_bytes),
                mime_type: "application/pdf".to_string(),
            },
        };

        let response = self
            .client
            .post(format!("{}/v1/{}:process", self.endpoint, self.processor_path))
            .bearer_auth(token.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractionError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ExtractionError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(ExtractionError::ServiceError {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ProcessResponse = serde_json::from_str(&text)
            .map_err(|e| ExtractionError::RequestFailed(format!("decode failed: {e}")))?;

        let extracted = extracted_text(parsed)?;
        info!("Extracted {} chars from document", extracted.len());
        Ok(extracted)
    }
}

fn processor_path(project_id: &str, location: &str, processor_id: &str) -> String {
    format!("projects/{project_id}/locations/{location}/processors/{processor_id}")
}

fn extracted_text(response: ProcessResponse) -> Result<String, ExtractionError> {
    response
        .document
        .and_then(|d| d.text)
        .filter(|t| !t.is_empty())
        .ok_or(ExtractionError::NoText)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processor_path_matches_resource_format() {
        assert_eq!(
            processor_path("my-project", "us", "abc123"),
            "projects/my-project/locations/us/processors/abc123"
        );
    }

    #[test]
    fn extracted_text_passes_through_document_text() {
        let response: ProcessResponse =
            serde_json::from_str(r#"{"document": {"text": "Notice body"}}"#).unwrap();
        assert_eq!(extracted_text(response).unwrap(), "Notice body");
    }

    #[test]
    fn empty_document_text_is_an_error() {
        let response: ProcessResponse =
            serde_json::from_str(r#"{"document": {"text": ""}}"#).unwrap();
        assert!(matches!(
            extracted_text(response),
            Err(ExtractionError::NoText)
        ));
    }

    #[test]
    fn absent_document_is_an_error() {
        let response: ProcessResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            extracted_text(response),
            Err(ExtractionError::NoText)
        ));
    }

    #[test]
    fn process_request_serializes_camel_case() {
        let body = ProcessRequest {
            raw_document: RawDocument {
                content: BASE64.encode(b"%PDF-1.4"),
                mime_type: "application/pdf".to_string(),
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("rawDocument").is_some());
        assert_eq!(json["rawDocument"]["mimeType"], "application/pdf");
    }
}
