use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::project::ProjectRow;
use crate::models::submittal::SubmittalRow;
use crate::projects::{fetch_project, list_submittals, REVISION_STYLES};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub contract_no: Option<String>,
    #[serde(default)]
    pub project_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectSettingsRequest {
    pub transmittal_prefix: Option<String>,
    pub transmittal_padding: Option<i32>,
    pub revision_style: Option<String>,
}

#[derive(Serialize)]
pub struct ProjectDetail {
    pub project: ProjectRow,
    pub submittals: Vec<SubmittalRow>,
}

fn trimmed(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

/// POST /api/v1/projects
pub async fn handle_create_project(
    State(state): State<AppState>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectRow>), AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Project name is required.".to_string()));
    }

    let project: ProjectRow = sqlx::query_as(
        r#"
        INSERT INTO projects
            (id, name, contract_no, project_number,
             next_transmittal_seq, transmittal_prefix, transmittal_padding, revision_style)
        VALUES ($1, $2, $3, $4, 1, 'T-', 3, 'dot')
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(trimmed(req.contract_no))
    .bind(trimmed(req.project_number))
    .fetch_one(&state.db)
    .await?;

    info!("Created project {} ({})", project.id, project.name);
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/v1/projects
pub async fn handle_list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProjectRow>>, AppError> {
    let projects: Vec<ProjectRow> = sqlx::query_as("SELECT * FROM projects ORDER BY created_at DESC")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(projects))
}

/// GET /api/v1/projects/:id
pub async fn handle_get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectDetail>, AppError> {
    let project = fetch_project(&state.db, id).await?;
    let submittals = list_submittals(&state.db, id, false).await?;
    Ok(Json(ProjectDetail {
        project,
        submittals,
    }))
}

/// PUT /api/v1/projects/:id/settings
pub async fn handle_update_settings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProjectSettingsRequest>,
) -> Result<Json<ProjectRow>, AppError> {
    fetch_project(&state.db, id).await?;

    let prefix = match trimmed(req.transmittal_prefix) {
        p if p.is_empty() => "T-".to_string(),
        p => p,
    };
    let padding = req.transmittal_padding.unwrap_or(3);
    if padding < 0 {
        return Err(AppError::Validation(
            "Transmittal padding must not be negative.".to_string(),
        ));
    }
    let revision_style = match trimmed(req.revision_style) {
        s if s.is_empty() => "dot".to_string(),
        s => s,
    };
    if !REVISION_STYLES.contains(&revision_style.as_str()) {
        return Err(AppError::Validation(format!(
            "Revision style must be one of: {}",
            REVISION_STYLES.join(", ")
        )));
    }

    let project: ProjectRow = sqlx::query_as(
        r#"
        UPDATE projects
        SET transmittal_prefix = $2, transmittal_padding = $3, revision_style = $4
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&prefix)
    .bind(padding)
    .bind(&revision_style)
    .fetch_one(&state.db)
    .await?;

    info!("Updated settings of project {id}");
    Ok(Json(project))
}
