pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};

use crate::projects::handlers as projects;
use crate::state::AppState;
use crate::submittals::{batch, handlers as submittals};
use crate::templates::handlers as templates;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    let api = Router::new()
        .route("/health", get(health::health_handler))
        // Projects
        .route(
            "/projects",
            post(projects::handle_create_project).get(projects::handle_list_projects),
        )
        .route("/projects/:id", get(projects::handle_get_project))
        .route(
            "/projects/:id/settings",
            put(projects::handle_update_settings),
        )
        // Templates
        .route(
            "/projects/:id/templates",
            get(templates::handle_list_templates).post(templates::handle_upload_template),
        )
        .route(
            "/templates/:id/fields",
            get(templates::handle_get_fields).put(templates::handle_update_fields),
        )
        .route(
            "/templates/:id",
            delete(templates::handle_delete_template),
        )
        // Submittals
        .route(
            "/projects/:id/submittals/options",
            get(submittals::handle_submittal_options),
        )
        .route(
            "/projects/:id/submittals/fields",
            post(submittals::handle_fields_preview),
        )
        .route(
            "/projects/:id/submittals",
            post(submittals::handle_create_submittal),
        )
        .route("/submittals/:id", get(submittals::handle_get_submittal))
        .route("/submittals/:id/zip", get(submittals::handle_submittal_zip))
        .route("/files", get(submittals::handle_download_file))
        .route(
            "/projects/:id/export/submittal_log.csv",
            get(submittals::handle_export_submittal_log),
        )
        .route("/projects/:id/batch", post(batch::handle_batch));

    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
