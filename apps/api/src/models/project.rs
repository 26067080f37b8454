use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_STATUSES: &[&str] = &["Draft", "Sent", "Returned", "Closed", "Resubmit Needed"];

pub const DEFAULT_DISPOSITIONS: &[&str] = &[
    "Authorized / No Exceptions Taken",
    "Authorized / Make Corrections Noted",
    "Revise & Resubmit",
    "Rejected",
    "For Information Only",
];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectRow {
    pub id: Uuid,
    pub name: String,
    pub contract_no: Option<String>,
    pub project_number: Option<String>,
    pub next_transmittal_seq: i32,
    pub transmittal_prefix: String,
    pub transmittal_padding: i32,
    /// "dot" or "R"
    pub revision_style: String,
    pub created_at: DateTime<Utc>,
}
