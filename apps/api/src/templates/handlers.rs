use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::fields::{FieldType, Formatter};
use crate::forms::MultipartForm;
use crate::models::template::{TemplateRow, TemplateType};
use crate::projects::fetch_project;
use crate::state::AppState;
use crate::storage::remove_file_if_exists;
use crate::templates::{
    fetch_fields, fetch_template, insert_default_fields, store_scanned_template, FieldConfig,
    TemplateWithFields,
};

/// GET /api/v1/projects/:id/templates
pub async fn handle_list_templates(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<TemplateRow>>, AppError> {
    fetch_project(&state.db, project_id).await?;
    let templates: Vec<TemplateRow> = sqlx::query_as(
        "SELECT * FROM templates WHERE project_id = $1 ORDER BY created_at DESC",
    )
    .bind(project_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(templates))
}

/// POST /api/v1/projects/:id/templates
///
/// Multipart: `template` (a .docx), `template_type`, optional `name`. The file
/// is kept only when it parses and carries at least one placeholder.
pub async fn handle_upload_template(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<TemplateWithFields>), AppError> {
    fetch_project(&state.db, project_id).await?;
    let form = MultipartForm::collect(multipart).await?;

    let template_type: TemplateType = form
        .text_or("template_type", "cover")
        .parse()
        .map_err(AppError::Validation)?;
    let name = form.text_or("name", &format!("{} Template", template_type.title()));

    let upload = form
        .file("template")
        .ok_or_else(|| AppError::Validation("Choose a DOCX template to upload.".to_string()))?;
    let dir = state.storage.templates_dir(project_id);
    let (path, keys) = store_scanned_template(&dir, upload).await?;

    let inserted = insert_template(&state, project_id, &name, template_type, &path, &keys).await;
    let template = match inserted {
        Ok(template) => template,
        Err(e) => {
            if let Err(io) = remove_file_if_exists(&path).await {
                warn!("Could not remove template file {}: {io}", path.display());
            }
            return Err(e);
        }
    };

    info!(
        "Uploaded {} template {} with {} field(s)",
        template_type,
        template.id,
        keys.len()
    );

    let fields = fetch_fields(&state.db, template.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(TemplateWithFields {
            template,
            fields: fields.into_iter().map(FieldConfig::from).collect(),
        }),
    ))
}

async fn insert_template(
    state: &AppState,
    project_id: Uuid,
    name: &str,
    template_type: TemplateType,
    path: &std::path::Path,
    keys: &[String],
) -> Result<TemplateRow, AppError> {
    let mut tx = state.db.begin().await?;
    let template: TemplateRow = sqlx::query_as(
        r#"
        INSERT INTO templates (id, project_id, name, template_type, file_path)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(project_id)
    .bind(name)
    .bind(template_type.as_str())
    .bind(path.to_string_lossy().into_owned())
    .fetch_one(&mut *tx)
    .await?;
    insert_default_fields(&mut tx, template.id, keys).await?;
    tx.commit().await?;

    Ok(template)
}

/// GET /api/v1/templates/:id/fields
pub async fn handle_get_fields(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TemplateWithFields>, AppError> {
    let template = fetch_template(&state.db, id).await?;
    let fields = fetch_fields(&state.db, id).await?;
    Ok(Json(TemplateWithFields {
        template,
        fields: fields.into_iter().map(FieldConfig::from).collect(),
    }))
}

/// One field edit; omitted attributes keep their stored value.
#[derive(Debug, Deserialize)]
pub struct FieldUpdate {
    pub id: Uuid,
    pub label: Option<String>,
    pub field_type: Option<String>,
    pub required: Option<bool>,
    pub options_text: Option<String>,
    pub formatter: Option<String>,
    pub order_index: Option<i32>,
}

/// PUT /api/v1/templates/:id/fields
pub async fn handle_update_fields(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(updates): Json<Vec<FieldUpdate>>,
) -> Result<Json<TemplateWithFields>, AppError> {
    let template = fetch_template(&state.db, id).await?;
    let existing = fetch_fields(&state.db, id).await?;

    let mut tx = state.db.begin().await?;
    for update in &updates {
        let Some(current) = existing.iter().find(|f| f.id == update.id) else {
            debug!("Ignoring update for field {} not on template {id}", update.id);
            continue;
        };

        let field_type: FieldType = match &update.field_type {
            Some(raw) => raw.parse().map_err(AppError::Validation)?,
            None => current.field_type(),
        };
        let formatter: Formatter = match &update.formatter {
            Some(raw) => raw.parse().map_err(AppError::Validation)?,
            None => current.formatter(),
        };
        let label = update
            .label
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(&current.label);

        sqlx::query(
            r#"
            UPDATE template_fields
            SET label = $2, field_type = $3, required = $4, options_text = $5,
                formatter = $6, order_index = $7
            WHERE id = $1
            "#,
        )
        .bind(update.id)
        .bind(label)
        .bind(field_type.as_str())
        .bind(update.required.unwrap_or(current.required))
        .bind(
            update
                .options_text
                .as_deref()
                .map(str::trim)
                .unwrap_or(&current.options_text),
        )
        .bind(formatter.as_str())
        .bind(update.order_index.unwrap_or(current.order_index))
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!("Saved {} field update(s) on template {id}", updates.len());
    let fields = fetch_fields(&state.db, id).await?;
    Ok(Json(TemplateWithFields {
        template,
        fields: fields.into_iter().map(FieldConfig::from).collect(),
    }))
}

/// DELETE /api/v1/templates/:id
pub async fn handle_delete_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let template = fetch_template(&state.db, id).await?;

    if let Err(e) = remove_file_if_exists(std::path::Path::new(&template.file_path)).await {
        warn!("Could not remove template file {}: {e}", template.file_path);
    }
    // Field definitions go with the template via ON DELETE CASCADE.
    sqlx::query("DELETE FROM templates WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    info!("Deleted template {id}");
    Ok(StatusCode::NO_CONTENT)
}
