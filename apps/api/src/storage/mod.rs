//! On-disk layout of projects, templates, generated documents and exports.
//!
//! ```text
//! <root>/projects/project_<id>_<name>/Submittals/<sub-no>/{Generated,Attachments}
//! <root>/projects/project_<id>_<name>/Logs
//! <root>/templates/project_<id>
//! <root>/zips
//! ```

pub mod logs;
pub mod sanitize;
pub mod zip_export;

use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::project::ProjectRow;
use crate::storage::sanitize::{extension_of, secure_filename};

pub const ALLOWED_TEMPLATE_EXT: &[&str] = &[".docx"];

pub const ALLOWED_ATTACHMENT_EXT: &[&str] = &[
    ".pdf", ".docx", ".xlsx", ".xls", ".png", ".jpg", ".jpeg", ".txt", ".csv",
];

/// Attachments without any extension are accepted; others must be allow-listed.
pub fn is_allowed_attachment(filename: &str) -> bool {
    let ext = extension_of(filename);
    ext.is_empty() || ALLOWED_ATTACHMENT_EXT.contains(&ext.as_str())
}

pub fn is_allowed_template(filename: &str) -> bool {
    ALLOWED_TEMPLATE_EXT.contains(&extension_of(filename).as_str())
}

/// Derives every storage path from a single root.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        StorageLayout { root: root.into() }
    }

    pub fn project_dir(&self, project: &ProjectRow) -> PathBuf {
        self.root.join("projects").join(format!(
            "project_{}_{}",
            project.id,
            secure_filename(&project.name)
        ))
    }

    pub fn submittal_dir(&self, project: &ProjectRow, sub_no: &str) -> PathBuf {
        self.project_dir(project)
            .join("Submittals")
            .join(secure_filename(sub_no))
    }

    pub fn generated_dir(&self, project: &ProjectRow, sub_no: &str) -> PathBuf {
        self.submittal_dir(project, sub_no).join("Generated")
    }

    pub fn attachments_dir(&self, project: &ProjectRow, sub_no: &str) -> PathBuf {
        self.submittal_dir(project, sub_no).join("Attachments")
    }

    pub fn logs_dir(&self, project: &ProjectRow) -> PathBuf {
        self.project_dir(project).join("Logs")
    }

    pub fn templates_dir(&self, project_id: Uuid) -> PathBuf {
        self.root.join("templates").join(format!("project_{project_id}"))
    }

    pub fn zips_dir(&self) -> PathBuf {
        self.root.join("zips")
    }

    /// Places `path` relative to the storage root. Paths that are lexically
    /// outside the root are classified without touching the filesystem, so
    /// the answer never reveals whether such a path exists.
    pub async fn resolve_within_root(&self, path: &Path) -> std::io::Result<RootedPath> {
        let root = fs::canonicalize(&self.root).await?;
        let lexical = lexically_absolute(path)?;
        if !lexical.starts_with(lexically_absolute(&self.root)?) && !lexical.starts_with(&root) {
            return Ok(RootedPath::Outside);
        }

        let candidate = match fs::canonicalize(&lexical).await {
            Ok(p) => p,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(RootedPath::Missing),
            Err(e) => return Err(e),
        };
        if candidate.starts_with(&root) {
            Ok(RootedPath::Inside(candidate))
        } else {
            Ok(RootedPath::Outside)
        }
    }
}

/// Where a requested path lands relative to the storage root.
#[derive(Debug, PartialEq)]
pub enum RootedPath {
    /// Canonical path of an existing entry under the root.
    Inside(PathBuf),
    /// Under the root, but nothing is there.
    Missing,
    Outside,
}

/// `path` made absolute against the working directory with `.` and `..`
/// folded away, without consulting the filesystem.
fn lexically_absolute(path: &Path) -> std::io::Result<PathBuf> {
    let base = if path.is_absolute() {
        PathBuf::new()
    } else {
        std::env::current_dir()?
    };
    let mut out = base;
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

/// `<unix-ts>_<sanitized-name>`, the naming used for uploaded files.
pub fn timestamped_name(original: &str) -> String {
    format!("{}_{}", Utc::now().timestamp(), secure_filename(original))
}

/// Writes `bytes` to `dir/name`, creating `dir` first.
pub async fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(name);
    fs::write(&path, bytes).await?;
    Ok(path)
}

/// Files written for one unit of work, so they can be removed again if the
/// records pointing at them are rolled back.
#[derive(Debug, Default)]
pub struct WrittenFiles {
    paths: Vec<PathBuf>,
}

impl WrittenFiles {
    pub async fn write(&mut self, dir: &Path, name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let path = write_file(dir, name, bytes).await?;
        self.paths.push(path.clone());
        Ok(path)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Deletes every recorded file; failures are logged and skipped.
    pub async fn discard(self) {
        for path in &self.paths {
            if let Err(e) = remove_file_if_exists(path).await {
                warn!("Could not remove {}: {e}", path.display());
            }
        }
        debug!("Discarded {} written file(s)", self.paths.len());
    }
}

/// Removes a file, treating an already-missing file as success.
pub async fn remove_file_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
pub(crate) fn test_project(name: &str) -> ProjectRow {
    ProjectRow {
        id: Uuid::nil(),
        name: name.to_string(),
        contract_no: None,
        project_number: None,
        next_transmittal_seq: 1,
        transmittal_prefix: "T-".to_string(),
        transmittal_padding: 3,
        revision_style: "dot".to_string(),
        created_at: Utc::now(),
    }
}
