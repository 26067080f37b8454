use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::fields::{parse_dropdown_options, FieldType, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    Cover,
    Transmittal,
    Response,
}

impl TemplateType {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateType::Cover => "cover",
            TemplateType::Transmittal => "transmittal",
            TemplateType::Response => "response",
        }
    }

    /// Document type recorded for, and file suffix of, generated copies.
    pub fn doc_label(self) -> &'static str {
        match self {
            TemplateType::Cover => "CoverLetter",
            TemplateType::Transmittal => "Transmittal",
            TemplateType::Response => "Response",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            TemplateType::Cover => "Cover",
            TemplateType::Transmittal => "Transmittal",
            TemplateType::Response => "Response",
        }
    }
}

impl FromStr for TemplateType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cover" => Ok(TemplateType::Cover),
            "transmittal" => Ok(TemplateType::Transmittal),
            "response" => Ok(TemplateType::Response),
            other => Err(format!("unknown template type '{other}'")),
        }
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TemplateRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub template_type: String,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TemplateFieldRow {
    pub id: Uuid,
    pub template_id: Uuid,
    /// Placeholder key without the « » delimiters.
    pub key: String,
    pub label: String,
    pub field_type: String,
    pub required: bool,
    /// Select options, one per line.
    pub options_text: String,
    pub formatter: String,
    pub order_index: i32,
}

impl TemplateFieldRow {
    pub fn field_type(&self) -> FieldType {
        self.field_type.parse().unwrap_or(FieldType::Text)
    }

    pub fn formatter(&self) -> Formatter {
        self.formatter.parse().unwrap_or_default()
    }

    pub fn options(&self) -> Vec<String> {
        parse_dropdown_options(&self.options_text)
    }
}
