//! In-memory DOCX fixtures for tests.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::docx::package::MAIN_PART;
use crate::docx::paragraph::{for_each_paragraph, paragraph_text};
use crate::docx::xml::XmlDocument;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="ListBullet"><w:name w:val="List Bullet"/></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style></w:styles>"#;

#[derive(Default)]
pub struct DocxFixture {
    /// Body-level block XML (paragraphs, tables).
    pub body: Vec<String>,
    /// `(part file name, block XML)`, e.g. `("header1.xml", ..)`.
    pub headers: Vec<(String, Vec<String>)>,
    pub footers: Vec<(String, Vec<String>)>,
}

/// A paragraph whose text is split into one run per `runs` entry.
pub fn paragraph(style: Option<&str>, runs: &[&str]) -> String {
    let mut xml = String::from("<w:p>");
    if let Some(style) = style {
        xml.push_str(&format!(r#"<w:pPr><w:pStyle w:val="{style}"/></w:pPr>"#));
    }
    for run in runs {
        xml.push_str(&format!(
            r#"<w:r><w:t xml:space="preserve">{}</w:t></w:r>"#,
            quick_xml::escape::escape(*run)
        ));
    }
    xml.push_str("</w:p>");
    xml
}

/// A table with one row per entry, one cell per inner entry; each cell holds
/// the given block XML.
pub fn table(rows: &[Vec<String>]) -> String {
    let mut xml = String::from("<w:tbl>");
    for row in rows {
        xml.push_str("<w:tr>");
        for cell in row {
            xml.push_str("<w:tc>");
            xml.push_str(cell);
            xml.push_str("</w:tc>");
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    xml
}

pub fn build_docx(fixture: &DocxFixture) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    let mut put = |name: &str, content: &str| {
        writer.start_file(name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    };

    put("[Content_Types].xml", CONTENT_TYPES);
    put("word/styles.xml", STYLES);
    put(
        MAIN_PART,
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}"><w:body>{}<w:sectPr/></w:body></w:document>"#,
            fixture.body.concat()
        ),
    );
    for (name, blocks) in &fixture.headers {
        put(
            &format!("word/{name}"),
            &format!(r#"<w:hdr xmlns:w="{W_NS}">{}</w:hdr>"#, blocks.concat()),
        );
    }
    for (name, blocks) in &fixture.footers {
        put(
            &format!("word/{name}"),
            &format!(r#"<w:ftr xmlns:w="{W_NS}">{}</w:ftr>"#, blocks.concat()),
        );
    }

    writer.finish().unwrap().into_inner()
}

/// Texts of all paragraphs of one part of a DOCX, in document order.
pub fn part_paragraph_texts(bytes: &[u8], part: &str) -> Vec<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut xml = String::new();
    archive
        .by_name(part)
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    let doc = XmlDocument::parse(&xml).unwrap();
    let mut texts = Vec::new();
    for_each_paragraph(&doc.root, &mut |p| texts.push(paragraph_text(p)));
    texts
}
