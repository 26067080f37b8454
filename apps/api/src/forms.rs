use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;

use crate::errors::AppError;

/// Prefix of multipart fields carrying placeholder values, e.g. `field_Sub_No`.
pub const FIELD_VALUE_PREFIX: &str = "field_";

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub bytes: Bytes,
}

/// A fully buffered multipart body: text parts by name plus uploaded files.
/// File inputs submitted without a file name are dropped.
#[derive(Debug, Default)]
pub struct MultipartForm {
    text: HashMap<String, String>,
    files: Vec<UploadedFile>,
}

impl MultipartForm {
    pub async fn collect(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    if !file_name.is_empty() {
                        form.files.push(UploadedFile {
                            field: name,
                            file_name,
                            bytes,
                        });
                    }
                }
                None => {
                    let value = field.text().await?;
                    form.text.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    /// Trimmed value of a text part; empty when absent.
    pub fn text(&self, name: &str) -> &str {
        self.text.get(name).map(|v| v.trim()).unwrap_or("")
    }

    /// Trimmed value of a text part, or `default` when absent or blank.
    pub fn text_or(&self, name: &str, default: &str) -> String {
        match self.text(name) {
            "" => default.to_string(),
            v => v.to_string(),
        }
    }

    /// Checkbox semantics: present with `on`/`true`/`1`.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.text(name), "on" | "true" | "1")
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field == name)
    }

    pub fn files<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a UploadedFile> + 'a {
        self.files.iter().filter(move |f| f.field == name)
    }

    /// Placeholder values keyed by placeholder key (`field_<Key>` parts).
    pub fn field_values(&self) -> HashMap<String, String> {
        self.text
            .iter()
            .filter_map(|(name, value)| {
                name.strip_prefix(FIELD_VALUE_PREFIX)
                    .map(|key| (key.to_string(), value.clone()))
            })
            .collect()
    }

    #[cfg(test)]
    pub fn from_parts(text: &[(&str, &str)], files: Vec<UploadedFile>) -> Self {
        MultipartForm {
            text: text
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(field: &str, name: &str) -> UploadedFile {
        UploadedFile {
            field: field.to_string(),
            file_name: name.to_string(),
            bytes: Bytes::from_static(b"x"),
        }
    }

    #[test]
    fn test_text_accessors_trim_and_default() {
        let form = MultipartForm::from_parts(&[("sub_no", " 033-01 "), ("status", "  ")], vec![]);
        assert_eq!(form.text("sub_no"), "033-01");
        assert_eq!(form.text("missing"), "");
        assert_eq!(form.text_or("status", "Draft"), "Draft");
        assert_eq!(form.text_or("sub_no", "x"), "033-01");
    }

    #[test]
    fn test_flag_accepts_checkbox_values() {
        let form = MultipartForm::from_parts(&[("a", "on"), ("b", "true"), ("c", "off")], vec![]);
        assert!(form.flag("a"));
        assert!(form.flag("b"));
        assert!(!form.flag("c"));
        assert!(!form.flag("d"));
    }

    #[test]
    fn test_field_values_strip_prefix() {
        let form = MultipartForm::from_parts(
            &[("field_Sub_No", "S-1"), ("field_Notes", "n"), ("title", "t")],
            vec![],
        );
        let values = form.field_values();
        assert_eq!(values.len(), 2);
        assert_eq!(values["Sub_No"], "S-1");
        assert_eq!(values["Notes"], "n");
    }

    #[test]
    fn test_files_filtered_by_field_name() {
        let form = MultipartForm::from_parts(
            &[],
            vec![upload("attachments", "a.pdf"), upload("template", "t.docx"), upload("attachments", "b.png")],
        );
        let names: Vec<_> = form.files("attachments").map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.png"]);
        assert_eq!(form.file("template").map(|f| f.file_name.as_str()), Some("t.docx"));
        assert!(form.file("csv_file").is_none());
    }
}
