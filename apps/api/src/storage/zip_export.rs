//! Packs a submittal folder into a single downloadable archive.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::storage::sanitize::secure_filename;

pub fn archive_name(project_name: &str, sub_no: &str) -> String {
    format!(
        "{}_{}.zip",
        secure_filename(project_name),
        secure_filename(sub_no)
    )
}

/// Every regular file below `dir`, sorted, as paths relative to `dir`.
fn relative_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(dir) {
            out.push(rel.to_path_buf());
        }
    }
    out.sort();
    Ok(out)
}

/// Zips all files under `src_dir` into `dest`, keeping their relative paths.
/// A missing source folder yields an empty archive.
pub fn zip_directory(src_dir: &Path, dest: &Path) -> ZipResult<usize> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let files = relative_files(src_dir)?;

    let mut zip = ZipWriter::new(File::create(dest)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for rel in &files {
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        zip.start_file(name, options)?;
        let mut file = File::open(src_dir.join(rel))?;
        io::copy(&mut file, &mut zip)?;
    }
    zip.finish()?;

    tracing::debug!("Archived {} file(s) into {}", files.len(), dest.display());
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_archive_name_is_sanitized() {
        assert_eq!(archive_name("Harbor Bridge", "033/01"), "Harbor_Bridge_033_01.zip");
    }

    #[test]
    fn test_zip_keeps_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("S-1");
        fs::create_dir_all(sub.join("Generated")).unwrap();
        fs::create_dir_all(sub.join("Attachments")).unwrap();
        fs::write(sub.join("Generated/S-1_CoverLetter.docx"), b"doc").unwrap();
        fs::write(sub.join("Attachments/1_spec.pdf"), b"pdf").unwrap();

        let dest = dir.path().join("zips/out.zip");
        assert_eq!(zip_directory(&sub, &dest).unwrap(), 2);

        let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(
            names,
            vec!["Attachments/1_spec.pdf", "Generated/S-1_CoverLetter.docx"]
        );

        let mut body = String::new();
        archive
            .by_name("Attachments/1_spec.pdf")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, "pdf");
    }

    #[test]
    fn test_missing_folder_yields_empty_archive() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("empty.zip");
        assert_eq!(zip_directory(&dir.path().join("nope"), &dest).unwrap(), 0);
        let archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
