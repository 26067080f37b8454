//! Reading and rewriting the zip container of a DOCX file.

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::docx::xml::{Element, XmlDocument};
use crate::docx::DocxError;

pub const MAIN_PART: &str = "word/document.xml";
pub const STYLES_PART: &str = "word/styles.xml";

/// Body, header and footer parts: the parts that carry visible paragraphs.
/// Every header/footer variant (default, first page, even page) of every
/// section is stored as its own `word/headerN.xml` / `word/footerN.xml`.
pub fn is_text_part(name: &str) -> bool {
    if name == MAIN_PART {
        return true;
    }
    let Some(file) = name.strip_prefix("word/") else {
        return false;
    };
    !file.contains('/')
        && file.ends_with(".xml")
        && (file.starts_with("header") || file.starts_with("footer"))
}

/// An opened DOCX with its text-bearing parts parsed.
pub struct DocxPackage {
    source: Vec<u8>,
    /// Text parts keyed by zip entry name.
    pub parts: BTreeMap<String, XmlDocument>,
    pub styles: StyleMap,
}

impl DocxPackage {
    pub fn open(bytes: &[u8]) -> Result<Self, DocxError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| DocxError::NotADocument(e.to_string()))?;

        let mut parts = BTreeMap::new();
        let mut styles = StyleMap::default();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();
            if !is_text_part(&name) && name != STYLES_PART {
                continue;
            }
            let mut xml = String::new();
            file.read_to_string(&mut xml)?;
            let doc = XmlDocument::parse(&xml)?;
            if name == STYLES_PART {
                styles = StyleMap::from_styles_part(&doc);
            } else {
                parts.insert(name, doc);
            }
        }

        if !parts.contains_key(MAIN_PART) {
            return Err(DocxError::MissingMainPart);
        }

        Ok(DocxPackage {
            source: bytes.to_vec(),
            parts,
            styles,
        })
    }

    /// Text parts in entry-name order, which puts `word/document.xml`
    /// ahead of the footer and header parts.
    pub fn text_parts_mut(&mut self) -> impl Iterator<Item = (&String, &mut XmlDocument)> {
        self.parts.iter_mut()
    }

    pub fn text_parts(&self) -> impl Iterator<Item = (&String, &XmlDocument)> {
        self.parts.iter()
    }

    /// Writes a new package: parsed parts are re-serialized, every other
    /// entry is copied through without recompression.
    pub fn save(&self) -> Result<Vec<u8>, DocxError> {
        let mut archive = ZipArchive::new(Cursor::new(self.source.as_slice()))?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            let name = file.name().to_string();
            match self.parts.get(&name) {
                Some(doc) => {
                    drop(file);
                    writer.start_file(name, options)?;
                    writer.write_all(doc.to_xml().as_bytes())?;
                }
                None => writer.raw_copy_file(file)?,
            }
        }

        Ok(writer.finish()?.into_inner())
    }
}

/// Paragraph style id → display name, from `word/styles.xml`.
#[derive(Debug, Clone, Default)]
pub struct StyleMap {
    names: HashMap<String, String>,
    default_paragraph: Option<String>,
}

impl StyleMap {
    pub fn from_styles_part(doc: &XmlDocument) -> Self {
        let mut map = StyleMap::default();
        let Some(styles) = doc.document_element() else {
            return map;
        };
        for style in styles.child_elements().filter(|e| e.is("w:style")) {
            let Some(id) = style.attr("w:styleId") else {
                continue;
            };
            let name = style
                .child("w:name")
                .and_then(|n| n.attr("w:val"))
                .unwrap_or(id)
                .to_string();
            let is_default_paragraph = style.attr("w:type") == Some("paragraph")
                && matches!(style.attr("w:default"), Some("1") | Some("true") | Some("on"));
            if is_default_paragraph {
                map.default_paragraph = Some(name.clone());
            }
            map.names.insert(id.to_string(), name);
        }
        map
    }

    /// Display name of a paragraph's style; unstyled paragraphs use the
    /// default paragraph style.
    pub fn paragraph_style_name(&self, paragraph: &Element) -> String {
        let style_id = paragraph
            .child("w:pPr")
            .and_then(|ppr| ppr.child("w:pStyle"))
            .and_then(|s| s.attr("w:val"));
        match style_id {
            Some(id) => self.names.get(id).cloned().unwrap_or_else(|| id.to_string()),
            None => self
                .default_paragraph
                .clone()
                .unwrap_or_else(|| "Normal".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::testing::{build_docx, paragraph, DocxFixture};

    #[test]
    fn test_text_part_detection() {
        assert!(is_text_part("word/document.xml"));
        assert!(is_text_part("word/header1.xml"));
        assert!(is_text_part("word/footer3.xml"));
        assert!(!is_text_part("word/_rels/header1.xml.rels"));
        assert!(!is_text_part("word/styles.xml"));
        assert!(!is_text_part("customXml/header1.xml"));
    }

    #[test]
    fn test_open_rejects_non_zip_bytes() {
        let err = DocxPackage::open(b"definitely not a zip").err().unwrap();
        assert!(matches!(err, DocxError::NotADocument(_)));
    }

    #[test]
    fn test_open_rejects_zip_without_main_part() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("readme.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"hello").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = DocxPackage::open(&bytes).err().unwrap();
        assert!(matches!(err, DocxError::MissingMainPart));
    }

    #[test]
    fn test_save_keeps_untouched_entries() {
        let bytes = build_docx(&DocxFixture {
            body: vec![paragraph(None, &["Hello"])],
            ..Default::default()
        });
        let pkg = DocxPackage::open(&bytes).unwrap();
        let saved = pkg.save().unwrap();

        let mut archive = ZipArchive::new(Cursor::new(saved)).unwrap();
        let mut content_types = String::new();
        archive
            .by_name("[Content_Types].xml")
            .unwrap()
            .read_to_string(&mut content_types)
            .unwrap();
        assert!(content_types.contains("wordprocessingml"));
        assert!(archive.by_name(MAIN_PART).is_ok());
    }

    #[test]
    fn test_style_names_resolve_through_styles_part() {
        let bytes = build_docx(&DocxFixture {
            body: vec![
                paragraph(Some("ListBullet"), &["one"]),
                paragraph(None, &["two"]),
            ],
            ..Default::default()
        });
        let pkg = DocxPackage::open(&bytes).unwrap();
        let body = pkg.parts[MAIN_PART].document_element().unwrap();
        let paragraphs: Vec<_> = body
            .child("w:body")
            .unwrap()
            .child_elements()
            .filter(|e| e.is("w:p"))
            .collect();
        assert_eq!(pkg.styles.paragraph_style_name(paragraphs[0]), "List Bullet");
        assert_eq!(pkg.styles.paragraph_style_name(paragraphs[1]), "Normal");
    }
}
