use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Deserializer, Serialize};

/// Department extracted from document text by the language model.
///
/// The `email` field must be present in the model's JSON (explicit `null` is
/// fine, an absent key is a validation failure), so the implicit
/// missing-means-None handling for `Option` is disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub name: String,
    #[serde(deserialize_with = "require_key")]
    pub email: Option<String>,
}

/// Per-department notification payload, stored for audit alongside the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailPayload {
    pub department: String,
    pub summary: String,
    pub subject: String,
    pub to: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub filename: String,
    pub extracted_text: String,
    pub summary: String,
    pub departments: Vec<Department>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
    pub email_data: Vec<EmailPayload>,
}

/// JSON-facing view of a record, with the ObjectId rendered as a hex string
/// and the timestamp as RFC 3339.
#[derive(Debug, Serialize)]
pub struct SubmissionView {
    #[serde(rename = "_id")]
    pub id: String,
    pub filename: String,
    pub extracted_text: String,
    pub summary: String,
    pub departments: Vec<Department>,
    pub timestamp: DateTime<Utc>,
    pub email_data: Vec<EmailPayload>,
}

impl From<SubmissionRecord> for SubmissionView {
    fn from(record: SubmissionRecord) -> Self {
        Self {
            id: record.id.map(|id| id.to_hex()).unwrap_or_default(),
            filename: record.filename,
            extracted_text: record.extracted_text,
            summary: record.summary,
            departments: record.departments,
            timestamp: record.timestamp,
            email_data: record.email_data,
        }
    }
}

fn require_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::deserialize(deserializer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn department_accepts_explicit_null_email() {
        let dept: Department = serde_json::from_str(r#"{"name": "Finance", "email": null}"#)
            .expect("null email should deserialize");
        assert_eq!(dept.name, "Finance");
        assert!(dept.email.is_none());
    }

    #[test]
    fn department_rejects_missing_email_key() {
        let result = serde_json::from_str::<Department>(r#"{"name": "Finance"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn department_rejects_missing_name_key() {
        let result = serde_json::from_str::<Department>(r#"{"email": "hr@example.com"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn view_renders_object_id_as_hex() {
        let oid = ObjectId::new();
        let record = SubmissionRecord {
            id: Some(oid),
            filename: "notice.pdf".to_string(),
            extracted_text: "text".to_string(),
            summary: "summary".to_string(),
            departments: vec![],
            timestamp: Utc::now(),
            email_data: vec![],
        };

        let view = SubmissionView::from(record);
        assert_eq!(view.id, oid.to_hex());
    }
}
