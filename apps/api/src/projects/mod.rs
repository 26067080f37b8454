pub mod handlers;
pub mod numbering;

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::project::ProjectRow;
use crate::models::submittal::SubmittalRow;

pub const REVISION_STYLES: &[&str] = &["dot", "R"];

pub async fn fetch_project(db: &PgPool, id: Uuid) -> Result<ProjectRow, AppError> {
    sqlx::query_as("SELECT * FROM projects WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project {id} not found")))
}

/// Submittals of a project, oldest first when `ascending`.
pub async fn list_submittals(
    db: &PgPool,
    project_id: Uuid,
    ascending: bool,
) -> Result<Vec<SubmittalRow>, sqlx::Error> {
    let sql = if ascending {
        "SELECT * FROM submittals WHERE project_id = $1 ORDER BY created_at ASC"
    } else {
        "SELECT * FROM submittals WHERE project_id = $1 ORDER BY created_at DESC"
    };
    sqlx::query_as(sql).bind(project_id).fetch_all(db).await
}
