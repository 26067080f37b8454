//! Spreadsheet-driven generation: one submittal per CSV row.

use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::forms::MultipartForm;
use crate::models::project::ProjectRow;
use crate::models::submittal::SubmittalRow;
use crate::projects::fetch_project;
use crate::state::AppState;
use crate::storage::WrittenFiles;
use crate::submittals::{
    insert_submittal, refresh_logs, render_documents, resolve_for, store_documents, FormatChoice,
    RenderedDocument, SubmittalInput, TemplateIds, TemplateSelection,
};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone)]
pub struct BatchRow {
    pub submittal: SubmittalInput,
    /// Every column of the row, trimmed, keyed by header.
    pub values: HashMap<String, String>,
}

#[derive(Debug, Default)]
pub struct BatchCsv {
    /// Data rows read, including those skipped for lacking a submittal number.
    pub total_rows: usize,
    pub rows: Vec<BatchRow>,
}

fn first_present(values: &HashMap<String, String>, columns: &[&str]) -> String {
    columns
        .iter()
        .filter_map(|c| values.get(*c))
        .find(|v| !v.is_empty())
        .cloned()
        .unwrap_or_default()
}

/// Parses a header-row CSV. A leading BOM is ignored and invalid UTF-8 is
/// replaced; rows without a usable `Sub_No`/`sub_no` are counted but not
/// returned.
pub fn parse_batch_csv(bytes: &[u8]) -> Result<BatchCsv, csv::Error> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = String::from_utf8_lossy(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();

    let mut parsed = BatchCsv::default();
    for record in reader.records() {
        let record = record?;
        parsed.total_rows += 1;

        let mut values = HashMap::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            values
                .entry(header.to_string())
                .or_insert_with(|| value.trim().to_string());
        }

        let status = first_present(&values, &["Status"]);
        let submittal = SubmittalInput {
            sub_no: first_present(&values, &["Sub_No", "sub_no"]),
            title: first_present(&values, &["Sub_Title", "Title"]),
            spec_section: first_present(&values, &["Spec_Section"]),
            status: if status.is_empty() { "Draft".to_string() } else { status },
            disposition: first_present(&values, &["Disposition"]),
            responsible_person: first_present(&values, &["Responsible"]),
            notes: first_present(&values, &["Notes"]),
        };
        if submittal.validate_sub_no().is_err() {
            continue;
        }
        parsed.rows.push(BatchRow { submittal, values });
    }
    Ok(parsed)
}

#[derive(Debug, Serialize)]
pub struct BatchResult {
    pub created: usize,
    pub skipped: usize,
}

/// POST /api/v1/projects/:id/batch
///
/// Multipart: `csv_file`, template ids and format keys. Each row with a
/// submittal number gets its own submittal and generated documents.
pub async fn handle_batch(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<BatchResult>, AppError> {
    let project = fetch_project(&state.db, project_id).await?;
    let form = MultipartForm::collect(multipart).await?;

    let selection = TemplateSelection::load(&state.db, project_id, &TemplateIds::from_form(&form)?).await?;
    let upload = form
        .file("csv_file")
        .ok_or_else(|| AppError::Validation("Upload a CSV.".to_string()))?;
    let formats = FormatChoice::from_form(&form);

    let parsed = parse_batch_csv(&upload.bytes)
        .map_err(|e| AppError::Validation(format!("Could not read CSV: {e}")))?;
    if parsed.total_rows == 0 {
        return Err(AppError::Validation("CSV had no rows.".to_string()));
    }

    let fields = selection.fields(&state.db).await?;
    let mut created = 0;
    for row in &parsed.rows {
        let values = resolve_for(&project, &row.submittal, &fields, &row.values, formats);
        let rendered = render_documents(&selection, &row.submittal.sub_no, &values).await?;

        let mut written = WrittenFiles::default();
        let submittal = match persist_row(&state, &project, row, &rendered, &mut written).await {
            Ok(submittal) => submittal,
            Err(e) => {
                written.discard().await;
                return Err(e);
            }
        };

        debug!("Batch created submittal {} ({})", submittal.id, submittal.sub_no);
        created += 1;
    }

    refresh_logs(&state.db, &state.storage, &project).await?;

    let skipped = parsed.total_rows - created;
    info!("Batch complete on project {project_id}: created {created}, skipped {skipped}");
    Ok(Json(BatchResult { created, skipped }))
}

async fn persist_row(
    state: &AppState,
    project: &ProjectRow,
    row: &BatchRow,
    rendered: &[RenderedDocument],
    written: &mut WrittenFiles,
) -> Result<SubmittalRow, AppError> {
    let mut tx = state.db.begin().await?;
    let submittal = insert_submittal(&mut tx, project.id, &row.submittal).await?;
    let dir = state.storage.generated_dir(project, &submittal.sub_no);
    store_documents(&mut tx, written, &dir, &submittal, None, rendered).await?;
    tx.commit().await?;
    Ok(submittal)
}
