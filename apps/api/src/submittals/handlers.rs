use std::collections::BTreeMap;
use std::path::PathBuf;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::fields::formatting::{date_format_options, name_format_options, FormatOption};
use crate::fields::resolver::{missing_required, AutoFields};
use crate::forms::MultipartForm;
use crate::models::project::{ProjectRow, DEFAULT_DISPOSITIONS, DEFAULT_STATUSES};
use crate::models::submittal::{AttachmentRow, DocumentRow, SubmittalRow, TransmittalRow};
use crate::models::template::TemplateRow;
use crate::projects::fetch_project;
use crate::projects::numbering::next_transmittal_no;
use crate::state::AppState;
use crate::storage::logs::SUBMITTAL_LOG;
use crate::storage::{RootedPath, WrittenFiles};
use crate::storage::zip_export::{archive_name, zip_directory};
use crate::submittals::{
    insert_submittal, refresh_logs, render_documents, resolve_for, store_attachments,
    store_documents, FormatChoice, RenderedDocument, SubmittalInput, TemplateIds,
    TemplateSelection,
};
use crate::templates::FieldConfig;

#[derive(Serialize)]
pub struct TemplatesByType {
    pub cover: Vec<TemplateRow>,
    pub transmittal: Vec<TemplateRow>,
    pub response: Vec<TemplateRow>,
}

#[derive(Serialize)]
pub struct SubmittalOptions {
    pub templates: TemplatesByType,
    pub statuses: &'static [&'static str],
    pub dispositions: &'static [&'static str],
    pub date_formats: Vec<FormatOption>,
    pub name_formats: Vec<FormatOption>,
}

/// GET /api/v1/projects/:id/submittals/options
pub async fn handle_submittal_options(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<SubmittalOptions>, AppError> {
    fetch_project(&state.db, project_id).await?;
    let templates: Vec<TemplateRow> = sqlx::query_as(
        "SELECT * FROM templates WHERE project_id = $1 ORDER BY created_at DESC",
    )
    .bind(project_id)
    .fetch_all(&state.db)
    .await?;

    let of_type = |kind: &str| -> Vec<TemplateRow> {
        templates
            .iter()
            .filter(|t| t.template_type == kind)
            .cloned()
            .collect()
    };

    Ok(Json(SubmittalOptions {
        templates: TemplatesByType {
            cover: of_type("cover"),
            transmittal: of_type("transmittal"),
            response: of_type("response"),
        },
        statuses: DEFAULT_STATUSES,
        dispositions: DEFAULT_DISPOSITIONS,
        date_formats: date_format_options(),
        name_formats: name_format_options(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct FieldsPreviewRequest {
    #[serde(flatten)]
    pub templates: TemplateIds,
    #[serde(default)]
    pub sub_no: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub spec_section: String,
    #[serde(default)]
    pub disposition: String,
}

#[derive(Serialize)]
pub struct FieldsPreview {
    pub fields: Vec<FieldConfig>,
    pub defaults: BTreeMap<String, String>,
}

/// POST /api/v1/projects/:id/submittals/fields
///
/// The merged field list of the chosen templates, with the values the system
/// would fill in on its own.
pub async fn handle_fields_preview(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<FieldsPreviewRequest>,
) -> Result<Json<FieldsPreview>, AppError> {
    let project = fetch_project(&state.db, project_id).await?;
    let selection = TemplateSelection::load(&state.db, project_id, &req.templates).await?;

    let input = SubmittalInput {
        sub_no: req.sub_no.trim().to_string(),
        title: req.title.trim().to_string(),
        spec_section: req.spec_section.trim().to_string(),
        disposition: req.disposition.trim().to_string(),
        ..Default::default()
    };
    if input.sub_no.is_empty() {
        return Err(AppError::Validation("Submittal No is required.".to_string()));
    }

    let fields = selection.fields(&state.db).await?;
    Ok(Json(FieldsPreview {
        fields: fields.into_iter().map(FieldConfig::from).collect(),
        defaults: AutoFields::new(&project, &input.identity()).defaults(),
    }))
}

#[derive(Serialize)]
pub struct SubmittalDetail {
    pub submittal: SubmittalRow,
    pub transmittal: Option<TransmittalRow>,
    pub documents: Vec<DocumentRow>,
    pub attachments: Vec<AttachmentRow>,
}

/// POST /api/v1/projects/:id/submittals
///
/// Multipart: submittal attributes, template ids, `field_<Key>` values, format
/// keys, optional transmittal details and `attachments` files. Documents are
/// filled before anything is written so a bad template leaves no records.
pub async fn handle_create_submittal(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmittalDetail>), AppError> {
    let project = fetch_project(&state.db, project_id).await?;
    let form = MultipartForm::collect(multipart).await?;

    let input = SubmittalInput::from_form(&form);
    input.validate_sub_no()?;
    let selection = TemplateSelection::load(&state.db, project_id, &TemplateIds::from_form(&form)?).await?;
    let fields = selection.fields(&state.db).await?;

    let values = resolve_for(
        &project,
        &input,
        &fields,
        &form.field_values(),
        FormatChoice::from_form(&form),
    );
    let missing = missing_required(&fields, &values);
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Required fields are empty: {}",
            missing.join(", ")
        )));
    }

    let rendered = render_documents(&selection, &input.sub_no, &values).await?;

    let mut written = WrittenFiles::default();
    let detail = match persist_submittal(&state, &project, &input, &form, &rendered, &mut written).await {
        Ok(detail) => detail,
        Err(e) => {
            written.discard().await;
            return Err(e);
        }
    };
    refresh_logs(&state.db, &state.storage, &project).await?;

    info!(
        "Created submittal {} ({}) with {} document(s), {} attachment(s){}",
        detail.submittal.id,
        detail.submittal.sub_no,
        detail.documents.len(),
        detail.attachments.len(),
        detail
            .transmittal
            .as_ref()
            .map(|t| format!(", transmittal {}", t.trans_no))
            .unwrap_or_default()
    );

    Ok((StatusCode::CREATED, Json(detail)))
}

/// Records the submittal, its optional transmittal, documents and attachments
/// in one transaction. Files are written through `written` so the caller can
/// remove them if anything here fails.
async fn persist_submittal(
    state: &AppState,
    project: &ProjectRow,
    input: &SubmittalInput,
    form: &MultipartForm,
    rendered: &[RenderedDocument],
    written: &mut WrittenFiles,
) -> Result<SubmittalDetail, AppError> {
    let project_id = project.id;
    let mut tx = state.db.begin().await?;
    let submittal = insert_submittal(&mut tx, project_id, input).await?;

    let transmittal = if form.flag("create_transmittal") {
        let trans_no = next_transmittal_no(&mut tx, project_id).await?;
        let row: TransmittalRow = sqlx::query_as(
            r#"
            INSERT INTO transmittals (id, project_id, trans_no, date_sent, sent_to, delivery_method)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(&trans_no)
        .bind(Utc::now())
        .bind(form.text("sent_to"))
        .bind(form.text("delivery_method"))
        .fetch_one(&mut *tx)
        .await?;
        Some(row)
    } else {
        None
    };

    let documents = store_documents(
        &mut tx,
        written,
        &state.storage.generated_dir(project, &submittal.sub_no),
        &submittal,
        transmittal.as_ref().map(|t| t.id),
        rendered,
    )
    .await?;
    let attachments = store_attachments(
        &mut tx,
        written,
        &state.storage.attachments_dir(project, &submittal.sub_no),
        &submittal,
        form.files("attachments"),
    )
    .await?;
    tx.commit().await?;

    Ok(SubmittalDetail {
        submittal,
        transmittal,
        documents,
        attachments,
    })
}

async fn fetch_submittal(state: &AppState, id: Uuid) -> Result<(SubmittalRow, ProjectRow), AppError> {
    let submittal: SubmittalRow = sqlx::query_as("SELECT * FROM submittals WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submittal {id} not found")))?;
    let project = fetch_project(&state.db, submittal.project_id).await?;
    Ok((submittal, project))
}

/// GET /api/v1/submittals/:id
pub async fn handle_get_submittal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmittalDetail>, AppError> {
    let (submittal, _) = fetch_submittal(&state, id).await?;

    let documents: Vec<DocumentRow> = sqlx::query_as(
        "SELECT * FROM documents WHERE submittal_id = $1 ORDER BY created_at DESC",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;
    let attachments: Vec<AttachmentRow> = sqlx::query_as(
        "SELECT * FROM attachments WHERE submittal_id = $1 ORDER BY uploaded_at DESC",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    let transmittal: Option<TransmittalRow> = match documents.iter().find_map(|d| d.transmittal_id) {
        Some(tid) => {
            sqlx::query_as("SELECT * FROM transmittals WHERE id = $1")
                .bind(tid)
                .fetch_optional(&state.db)
                .await?
        }
        None => None,
    };

    Ok(Json(SubmittalDetail {
        submittal,
        transmittal,
        documents,
        attachments,
    }))
}

fn content_type_for(file_name: &str) -> String {
    let mime = mime_guess::from_path(file_name).first_or_octet_stream();
    if mime.type_() == mime_guess::mime::TEXT && mime.get_param(mime_guess::mime::CHARSET).is_none() {
        format!("{mime}; charset=utf-8")
    } else {
        mime.to_string()
    }
}

/// An attachment-disposition response for `bytes`.
fn download(file_name: &str, bytes: Vec<u8>) -> Response {
    let safe_name: String = file_name.chars().filter(|c| *c != '"' && !c.is_control()).collect();
    (
        [
            (header::CONTENT_TYPE, content_type_for(file_name)),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{safe_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// GET /api/v1/submittals/:id/zip
pub async fn handle_submittal_zip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let (submittal, project) = fetch_submittal(&state, id).await?;

    let src = state.storage.submittal_dir(&project, &submittal.sub_no);
    let name = archive_name(&project.name, &submittal.sub_no);
    let dest = state.storage.zips_dir().join(&name);

    let archive_path = dest.clone();
    let count = tokio::task::spawn_blocking(move || zip_directory(&src, &archive_path)).await??;
    info!("Built archive {} with {count} file(s)", dest.display());

    let bytes = tokio::fs::read(&dest).await?;
    Ok(download(&name, bytes))
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub path: Option<String>,
}

/// GET /api/v1/files?path=
///
/// Serves a stored file. Paths that resolve outside the storage root are refused.
pub async fn handle_download_file(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> Result<Response, AppError> {
    let raw = query.path.unwrap_or_default();
    if raw.trim().is_empty() {
        return Err(AppError::Validation("path is required".to_string()));
    }
    let path = PathBuf::from(raw.trim());
    let resolved = match state.storage.resolve_within_root(&path).await? {
        RootedPath::Outside => return Err(AppError::Forbidden),
        RootedPath::Missing => {
            return Err(AppError::NotFound(format!("File {} not found", path.display())))
        }
        RootedPath::Inside(resolved) => resolved,
    };
    if !tokio::fs::metadata(&resolved).await.map(|m| m.is_file()).unwrap_or(false) {
        return Err(AppError::NotFound(format!("File {} not found", path.display())));
    }

    let file_name = resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    let bytes = tokio::fs::read(&resolved).await?;
    Ok(download(&file_name, bytes))
}

/// GET /api/v1/projects/:id/export/submittal_log.csv
pub async fn handle_export_submittal_log(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let project = fetch_project(&state.db, project_id).await?;
    let paths = refresh_logs(&state.db, &state.storage, &project).await?;
    let bytes = tokio::fs::read(&paths.submittal).await?;
    Ok(download(SUBMITTAL_LOG, bytes))
}
