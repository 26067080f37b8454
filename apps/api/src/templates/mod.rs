pub mod handlers;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::warn;
use uuid::Uuid;

use crate::docx::extract_placeholders;
use crate::errors::AppError;
use crate::fields::{default_label, guess_field_type, guess_formatter};
use crate::forms::UploadedFile;
use crate::models::template::{TemplateFieldRow, TemplateRow, TemplateType};
use crate::storage::{is_allowed_template, remove_file_if_exists, timestamped_name, write_file};

pub const NO_PLACEHOLDERS: &str = "No placeholders like «Field» found in that file.";

/// A field definition as shown to clients, with select options split out.
#[derive(Debug, Clone, Serialize)]
pub struct FieldConfig {
    #[serde(flatten)]
    pub field: TemplateFieldRow,
    pub options: Vec<String>,
}

impl From<TemplateFieldRow> for FieldConfig {
    fn from(field: TemplateFieldRow) -> Self {
        let options = field.options();
        FieldConfig { field, options }
    }
}

#[derive(Debug, Serialize)]
pub struct TemplateWithFields {
    pub template: TemplateRow,
    pub fields: Vec<FieldConfig>,
}

pub async fn fetch_template(db: &PgPool, id: Uuid) -> Result<TemplateRow, AppError> {
    sqlx::query_as("SELECT * FROM templates WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Template {id} not found")))
}

/// A project's template of the expected type, or a validation error naming it.
pub async fn fetch_project_template(
    db: &PgPool,
    project_id: Uuid,
    id: Uuid,
    expected: TemplateType,
) -> Result<TemplateRow, AppError> {
    let template = fetch_template(db, id).await?;
    if template.project_id != project_id || template.template_type != expected.as_str() {
        return Err(AppError::Validation(format!(
            "Template {id} is not a {} template of this project",
            expected.as_str()
        )));
    }
    Ok(template)
}

pub async fn fetch_fields(db: &PgPool, template_id: Uuid) -> Result<Vec<TemplateFieldRow>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM template_fields WHERE template_id = $1 ORDER BY order_index ASC, key ASC",
    )
    .bind(template_id)
    .fetch_all(db)
    .await
}

/// Fields of several templates in template order, each key kept once (first wins).
pub async fn union_fields(db: &PgPool, template_ids: &[Uuid]) -> Result<Vec<TemplateFieldRow>, sqlx::Error> {
    let mut per_template = Vec::with_capacity(template_ids.len());
    for id in template_ids {
        per_template.push(fetch_fields(db, *id).await?);
    }
    Ok(merge_fields(per_template))
}

fn merge_fields(per_template: Vec<Vec<TemplateFieldRow>>) -> Vec<TemplateFieldRow> {
    let mut seen = HashSet::new();
    per_template
        .into_iter()
        .flatten()
        .filter(|f| seen.insert(f.key.clone()))
        .collect()
}

/// Inserts one default field definition per placeholder key, in key order.
pub async fn insert_default_fields(
    conn: &mut PgConnection,
    template_id: Uuid,
    keys: &[String],
) -> Result<(), sqlx::Error> {
    for (idx, key) in keys.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO template_fields
                (id, template_id, key, label, field_type, required, options_text, formatter, order_index)
            VALUES ($1, $2, $3, $4, $5, FALSE, '', $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(template_id)
        .bind(key)
        .bind(default_label(key))
        .bind(guess_field_type(key).as_str())
        .bind(guess_formatter(key).as_str())
        .bind(idx as i32)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Saves an uploaded template under `dir` and scans it for placeholder keys.
/// An upload that is not a DOCX, or that has no placeholders, is removed
/// again before the error is returned.
pub async fn store_scanned_template(
    dir: &Path,
    upload: &UploadedFile,
) -> Result<(PathBuf, Vec<String>), AppError> {
    if !is_allowed_template(&upload.file_name) {
        return Err(AppError::Validation("Templates must be .docx".to_string()));
    }
    let path = write_file(dir, &timestamped_name(&upload.file_name), &upload.bytes).await?;

    let bytes = upload.bytes.clone();
    let scanned = tokio::task::spawn_blocking(move || extract_placeholders(&bytes)).await?;
    match scanned {
        Ok(keys) if !keys.is_empty() => Ok((path, keys)),
        Ok(_) => {
            remove_file_if_exists(&path).await?;
            Err(AppError::UnprocessableEntity(NO_PLACEHOLDERS.to_string()))
        }
        Err(e) => {
            warn!("Rejected template upload {}: {e}", upload.file_name);
            remove_file_if_exists(&path).await?;
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::testing::{build_docx, paragraph, DocxFixture};

    fn field(key: &str, label: &str) -> TemplateFieldRow {
        TemplateFieldRow {
            id: Uuid::new_v4(),
            template_id: Uuid::nil(),
            key: key.to_string(),
            label: label.to_string(),
            field_type: "select".to_string(),
            required: false,
            options_text: "A\n\nB".to_string(),
            formatter: String::new(),
            order_index: 0,
        }
    }

    #[test]
    fn test_merge_keeps_first_definition_of_each_key() {
        let cover = vec![field("Sub_No", "cover"), field("Letter_Date", "cover")];
        let transmittal = vec![field("Sub_No", "transmittal"), field("Sent_To", "transmittal")];
        let merged = merge_fields(vec![cover, transmittal]);

        let keys: Vec<_> = merged.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["Sub_No", "Letter_Date", "Sent_To"]);
        assert_eq!(merged[0].label, "cover");
    }

    #[test]
    fn test_field_config_serializes_flat_with_options() {
        let json = serde_json::to_value(FieldConfig::from(field("Status", "Status"))).unwrap();
        assert_eq!(json["key"], "Status");
        assert_eq!(json["options"], serde_json::json!(["A", "B"]));
    }

    fn upload(file_name: &str, bytes: Vec<u8>) -> UploadedFile {
        UploadedFile {
            field: "template".to_string(),
            file_name: file_name.to_string(),
            bytes: bytes.into(),
        }
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_template_with_placeholders_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = build_docx(&DocxFixture {
            body: vec![paragraph(None, &["Re: «Sub_No» «Sub_Title»"])],
            ..Default::default()
        });

        let (path, keys) = store_scanned_template(dir.path(), &upload("Cover.docx", bytes))
            .await
            .unwrap();
        assert!(path.is_file());
        assert!(path.starts_with(dir.path()));
        assert_eq!(keys, vec!["Sub_No", "Sub_Title"]);
    }

    #[tokio::test]
    async fn test_template_without_placeholders_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = build_docx(&DocxFixture {
            body: vec![paragraph(None, &["Plain letter"])],
            ..Default::default()
        });

        let err = store_scanned_template(dir.path(), &upload("Plain.docx", bytes))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(ref m) if m == NO_PLACEHOLDERS));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_unreadable_template_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let err = store_scanned_template(dir.path(), &upload("Broken.docx", b"not a zip".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Document(_)));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_non_docx_upload_is_never_written() {
        let dir = tempfile::tempdir().unwrap();
        let err = store_scanned_template(dir.path(), &upload("Cover.doc", b"x".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(entries(dir.path()), 0);
    }
}
