use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingVariable(&'static str),
    #[error("invalid value for environment variable {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[derive(Clone)]
pub struct Config {
    pub mongo_uri: String,
    pub db_name: String,
    pub collection_name: String,
    pub azure_openai_key: String,
    pub azure_openai_endpoint: String,
    pub azure_openai_deployment: String,
    pub azure_openai_api_version: String,
    pub google_credentials_json: String,
    pub google_project_id: String,
    pub document_ai_location: String,
    pub document_ai_processor_id: String,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_password: String,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            mongo_uri: optional("MONGO_URI", "mongodb://localhost:27017"),
            db_name: optional("DB_NAME", "docrelay"),
            collection_name: optional("COLLECTION_NAME", "summaries"),
            azure_openai_key: required("AZURE_OPENAI_KEY")?,
            azure_openai_endpoint: required("AZURE_OPENAI_ENDPOINT")?,
            azure_openai_deployment: optional("AZURE_OPENAI_DEPLOYMENT", "gpt-4o"),
            azure_openai_api_version: optional("AZURE_OPENAI_API_VERSION", "2024-02-15-preview"),
            google_credentials_json: required("GOOGLE_CREDENTIALS_JSON")?,
            google_project_id: required("GOOGLE_PROJECT_ID")?,
            document_ai_location: optional("DOCUMENT_AI_LOCATION", "us"),
            document_ai_processor_id: required("DOCUMENT_AI_PROCESSOR_ID")?,
            smtp_server: optional("SMTP_SERVER", "smtp.gmail.com"),
            smtp_port: parse_port("SMTP_PORT", 587)?,
            smtp_user: required("SMTP_USER")?,
            smtp_password: required("SMTP_PASSWORD")?,
            host: optional("HOST", "0.0.0.0"),
            port: parse_port("PORT", 8000)?,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingVariable(key))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_port(key: &'static str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        _ => Ok(default),
    }
}
