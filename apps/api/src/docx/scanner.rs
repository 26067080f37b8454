use std::collections::BTreeSet;

use crate::docx::package::DocxPackage;
use crate::docx::paragraph::{for_each_paragraph, paragraph_text};
use crate::docx::{DocxError, PLACEHOLDER_RE};

/// Returns the sorted, distinct placeholder keys of a DOCX.
///
/// Keys are collected from body paragraphs, table cells at any nesting depth
/// and every header/footer part. Matching runs on each paragraph's full text,
/// so a placeholder split across runs is still found. An empty result means
/// the file has no `«...»` tokens at all.
pub fn extract_placeholders(bytes: &[u8]) -> Result<Vec<String>, DocxError> {
    let package = DocxPackage::open(bytes)?;
    Ok(placeholders_in(&package))
}

pub fn placeholders_in(package: &DocxPackage) -> Vec<String> {
    let mut found = BTreeSet::new();
    for (_, part) in package.text_parts() {
        for_each_paragraph(&part.root, &mut |p| {
            let text = paragraph_text(p);
            for caps in PLACEHOLDER_RE.captures_iter(&text) {
                let key = caps[1].trim();
                if !key.is_empty() {
                    found.insert(key.to_string());
                }
            }
        });
    }
    found.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::testing::{build_docx, paragraph, table, DocxFixture};

    #[test]
    fn test_finds_sorted_distinct_keys_across_containers() {
        let bytes = build_docx(&DocxFixture {
            body: vec![
                paragraph(None, &["Project: «Project_Name»"]),
                paragraph(None, &["Again «Project_Name» and «Date»"]),
                table(&[vec![table(&[vec![paragraph(None, &["«Nested_Cell»"])]])]]),
            ],
            headers: vec![("header1.xml".to_string(), vec![paragraph(None, &["«Header_Key»"])])],
            footers: vec![("footer2.xml".to_string(), vec![paragraph(None, &["«Footer_Key»"])])],
        });

        let keys = extract_placeholders(&bytes).unwrap();
        assert_eq!(
            keys,
            vec!["Date", "Footer_Key", "Header_Key", "Nested_Cell", "Project_Name"]
        );
    }

    #[test]
    fn test_placeholder_split_across_runs_is_found() {
        let bytes = build_docx(&DocxFixture {
            body: vec![paragraph(None, &["Sub: «Su", "b_N", "o»"])],
            ..Default::default()
        });
        assert_eq!(extract_placeholders(&bytes).unwrap(), vec!["Sub_No"]);
    }

    #[test]
    fn test_keys_are_trimmed() {
        let bytes = build_docx(&DocxFixture {
            body: vec![paragraph(None, &["« Spaced »"])],
            ..Default::default()
        });
        assert_eq!(extract_placeholders(&bytes).unwrap(), vec!["Spaced"]);
    }

    #[test]
    fn test_document_without_delimiters_yields_nothing() {
        let bytes = build_docx(&DocxFixture {
            body: vec![paragraph(None, &["No fields here <Name> [Name]"])],
            ..Default::default()
        });
        assert!(extract_placeholders(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_non_docx_bytes_are_rejected() {
        assert!(extract_placeholders(b"%PDF-1.7").is_err());
    }
}
