use mongodb::{Collection, Database};

use crate::agents::{DocAiClient, OpenAiAgent};
use crate::db::SubmissionRecord;
use crate::notify::Mailer;

/// Long-lived client handles, constructed once at startup and shared across
/// requests behind an `Arc`.
pub struct AppState {
    pub db: Database,
    pub records: Collection<SubmissionRecord>,
    pub docai: DocAiClient,
    pub llm: OpenAiAgent,
    pub mailer: Mailer,
}
