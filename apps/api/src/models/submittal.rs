use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubmittalRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub sub_no: String,
    pub title: String,
    pub spec_section: String,
    pub rev: String,
    pub status: String,
    pub disposition: String,
    pub responsible_person: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransmittalRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub trans_no: String,
    pub date_sent: Option<DateTime<Utc>>,
    pub sent_to: String,
    pub delivery_method: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// A generated (filled) document on disk.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub submittal_id: Option<Uuid>,
    pub transmittal_id: Option<Uuid>,
    /// CoverLetter / Transmittal / Response
    pub doc_type: String,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttachmentRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub submittal_id: Uuid,
    pub original_filename: String,
    pub stored_path: String,
    pub uploaded_at: DateTime<Utc>,
}
