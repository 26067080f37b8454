//! Submittal creation: template selection, value resolution, document
//! generation, attachment intake and log refresh.

pub mod batch;
pub mod handlers;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::docx::fill_docx;
use crate::errors::AppError;
use crate::fields::formatting::{DateFormat, NameFormat};
use crate::fields::resolver::{resolve_values, AutoFields, ResolveOptions, SubmittalIdentity};
use crate::forms::{MultipartForm, UploadedFile};
use crate::models::project::ProjectRow;
use crate::models::submittal::{AttachmentRow, DocumentRow, SubmittalRow};
use crate::models::template::{TemplateFieldRow, TemplateRow, TemplateType};
use crate::projects::list_submittals;
use crate::storage::logs::{export_logs_csv, LogPaths};
use crate::storage::sanitize::secure_filename;
use crate::storage::{is_allowed_attachment, timestamped_name, StorageLayout, WrittenFiles};
use crate::templates::{fetch_project_template, union_fields};

/// Identifying attributes of a submittal as entered on a form or CSV row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmittalInput {
    pub sub_no: String,
    pub title: String,
    pub spec_section: String,
    pub status: String,
    pub disposition: String,
    pub responsible_person: String,
    pub notes: String,
}

impl SubmittalInput {
    pub fn from_form(form: &MultipartForm) -> Self {
        SubmittalInput {
            sub_no: form.text("sub_no").to_string(),
            title: form.text("title").to_string(),
            spec_section: form.text("spec_section").to_string(),
            status: form.text_or("status", "Draft"),
            disposition: form.text("disposition").to_string(),
            responsible_person: form.text("responsible").to_string(),
            notes: form.text("notes").to_string(),
        }
    }

    /// A submittal number must be present and keep at least one character
    /// once reduced to a folder name, since it names the submittal's folder.
    pub fn validate_sub_no(&self) -> Result<(), AppError> {
        if self.sub_no.is_empty() {
            return Err(AppError::Validation("Submittal No is required.".to_string()));
        }
        if secure_filename(&self.sub_no).is_empty() {
            return Err(AppError::Validation(
                "Submittal No must contain letters or digits.".to_string(),
            ));
        }
        Ok(())
    }

    pub fn identity(&self) -> SubmittalIdentity<'_> {
        SubmittalIdentity {
            sub_no: &self.sub_no,
            title: &self.title,
            spec_section: &self.spec_section,
            disposition: &self.disposition,
        }
    }
}

/// Template chosen per document type; at least one must be set.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TemplateIds {
    pub cover_template_id: Option<Uuid>,
    pub trans_template_id: Option<Uuid>,
    pub response_template_id: Option<Uuid>,
}

fn parse_template_id(form: &MultipartForm, name: &str) -> Result<Option<Uuid>, AppError> {
    match form.text(name) {
        "" | "0" => Ok(None),
        raw => Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| AppError::Validation(format!("{name} is not a valid id"))),
    }
}

impl TemplateIds {
    pub fn from_form(form: &MultipartForm) -> Result<Self, AppError> {
        Ok(TemplateIds {
            cover_template_id: parse_template_id(form, "cover_template_id")?,
            trans_template_id: parse_template_id(form, "trans_template_id")?,
            response_template_id: parse_template_id(form, "response_template_id")?,
        })
    }

    fn entries(&self) -> [(TemplateType, Option<Uuid>); 3] {
        [
            (TemplateType::Cover, self.cover_template_id),
            (TemplateType::Transmittal, self.trans_template_id),
            (TemplateType::Response, self.response_template_id),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, id)| id.is_none())
    }
}

/// The loaded templates a submittal is generated from, in cover, transmittal,
/// response order.
#[derive(Debug, Clone)]
pub struct TemplateSelection {
    templates: Vec<(TemplateType, TemplateRow)>,
}

impl TemplateSelection {
    pub async fn load(db: &PgPool, project_id: Uuid, ids: &TemplateIds) -> Result<Self, AppError> {
        if ids.is_empty() {
            return Err(AppError::Validation("Select at least one template.".to_string()));
        }
        let mut templates = Vec::new();
        for (kind, id) in ids.entries() {
            if let Some(id) = id {
                templates.push((kind, fetch_project_template(db, project_id, id, kind).await?));
            }
        }
        Ok(TemplateSelection { templates })
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.templates.iter().map(|(_, t)| t.id).collect()
    }

    pub async fn fields(&self, db: &PgPool) -> Result<Vec<TemplateFieldRow>, sqlx::Error> {
        union_fields(db, &self.ids()).await
    }
}

/// Format choices submitted alongside field values.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatChoice {
    pub date_format: DateFormat,
    pub name_format: NameFormat,
}

impl FormatChoice {
    pub fn from_form(form: &MultipartForm) -> Self {
        FormatChoice {
            date_format: DateFormat::from_key(form.text("date_format")),
            name_format: NameFormat::from_key(form.text("name_format")),
        }
    }

    fn resolve_options(self) -> ResolveOptions {
        ResolveOptions {
            date_format: self.date_format,
            name_format: self.name_format,
            today: Utc::now().date_naive(),
        }
    }
}

/// Resolves the value map for one submittal.
pub fn resolve_for(
    project: &ProjectRow,
    input: &SubmittalInput,
    fields: &[TemplateFieldRow],
    raw: &HashMap<String, String>,
    formats: FormatChoice,
) -> BTreeMap<String, String> {
    let auto = AutoFields::new(project, &input.identity());
    resolve_values(fields, raw, &auto, &formats.resolve_options())
}

/// A filled document held in memory until its submittal is persisted.
#[derive(Debug)]
pub struct RenderedDocument {
    pub template_type: TemplateType,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub fn generated_file_name(sub_no: &str, template_type: TemplateType) -> String {
    format!("{}_{}.docx", secure_filename(sub_no), template_type.doc_label())
}

/// Fills every selected template with `values`.
pub async fn render_documents(
    selection: &TemplateSelection,
    sub_no: &str,
    values: &BTreeMap<String, String>,
) -> Result<Vec<RenderedDocument>, AppError> {
    let mut rendered = Vec::with_capacity(selection.templates.len());
    for (kind, template) in &selection.templates {
        let template_bytes = match tokio::fs::read(&template.file_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound(format!(
                    "File of template {} is missing",
                    template.id
                )))
            }
            Err(e) => return Err(e.into()),
        };
        let values = values.clone();
        let bytes = tokio::task::spawn_blocking(move || fill_docx(&template_bytes, &values)).await??;
        rendered.push(RenderedDocument {
            template_type: *kind,
            file_name: generated_file_name(sub_no, *kind),
            bytes,
        });
    }
    Ok(rendered)
}

pub async fn insert_submittal(
    conn: &mut PgConnection,
    project_id: Uuid,
    input: &SubmittalInput,
) -> Result<SubmittalRow, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO submittals
            (id, project_id, sub_no, title, spec_section, rev, status,
             disposition, responsible_person, notes)
        VALUES ($1, $2, $3, $4, $5, '', $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(project_id)
    .bind(&input.sub_no)
    .bind(&input.title)
    .bind(&input.spec_section)
    .bind(&input.status)
    .bind(&input.disposition)
    .bind(&input.responsible_person)
    .bind(&input.notes)
    .fetch_one(&mut *conn)
    .await
}

/// Writes rendered documents into `dir` and records them.
pub async fn store_documents(
    conn: &mut PgConnection,
    written: &mut WrittenFiles,
    dir: &Path,
    submittal: &SubmittalRow,
    transmittal_id: Option<Uuid>,
    rendered: &[RenderedDocument],
) -> Result<Vec<DocumentRow>, AppError> {
    let mut documents = Vec::with_capacity(rendered.len());
    for doc in rendered {
        let path = written.write(dir, &doc.file_name, &doc.bytes).await?;
        let row: DocumentRow = sqlx::query_as(
            r#"
            INSERT INTO documents (id, project_id, submittal_id, transmittal_id, doc_type, file_path)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(submittal.project_id)
        .bind(submittal.id)
        .bind(transmittal_id)
        .bind(doc.template_type.doc_label())
        .bind(path.to_string_lossy().into_owned())
        .fetch_one(&mut *conn)
        .await?;
        documents.push(row);
    }
    Ok(documents)
}

/// Saves allow-listed uploads into `dir`; other files are skipped.
pub async fn store_attachments<'a>(
    conn: &mut PgConnection,
    written: &mut WrittenFiles,
    dir: &Path,
    submittal: &SubmittalRow,
    files: impl Iterator<Item = &'a UploadedFile>,
) -> Result<Vec<AttachmentRow>, AppError> {
    let mut attachments = Vec::new();
    for file in files {
        if !is_allowed_attachment(&file.file_name) {
            debug!("Skipping attachment with disallowed type: {}", file.file_name);
            continue;
        }
        let path = written
            .write(dir, &timestamped_name(&file.file_name), &file.bytes)
            .await?;
        let row: AttachmentRow = sqlx::query_as(
            r#"
            INSERT INTO attachments (id, project_id, submittal_id, original_filename, stored_path)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(submittal.project_id)
        .bind(submittal.id)
        .bind(&file.file_name)
        .bind(path.to_string_lossy().into_owned())
        .fetch_one(&mut *conn)
        .await?;
        attachments.push(row);
    }
    Ok(attachments)
}

/// Rewrites the project's CSV logs from the current submittal list.
pub async fn refresh_logs(
    db: &PgPool,
    storage: &StorageLayout,
    project: &ProjectRow,
) -> Result<LogPaths, AppError> {
    let submittals = list_submittals(db, project.id, true).await?;
    let logs_dir = storage.logs_dir(project);
    let paths = tokio::task::spawn_blocking(move || export_logs_csv(&logs_dir, &submittals)).await??;
    info!("Refreshed logs of project {}", project.id);
    Ok(paths)
}
