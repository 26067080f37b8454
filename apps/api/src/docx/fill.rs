//! Placeholder substitution and post-fill cleanup.

use std::collections::BTreeMap;

use tracing::debug;

use crate::docx::package::{DocxPackage, StyleMap};
use crate::docx::paragraph::{
    count_paragraphs, for_each_paragraph_mut, paragraph_text, replace_token_across_runs,
};
use crate::docx::xml::{Element, Node};
use crate::docx::{token_for, DocxError, BULLET_ONLY_RE, WHOLE_PLACEHOLDER_PARA_RE};

/// Fills a DOCX template and returns the new package bytes.
///
/// `values` keys are placeholder keys without delimiters; every key present is
/// substituted (an empty value erases its token). Tokens with no entry in
/// `values` are left as they are.
pub fn fill_docx(template: &[u8], values: &BTreeMap<String, String>) -> Result<Vec<u8>, DocxError> {
    let mut package = DocxPackage::open(template)?;
    let tokens: Vec<(String, &str)> = values
        .iter()
        .map(|(k, v)| (token_for(k), v.as_str()))
        .collect();

    // Original texts are captured per part, in paragraph order, before any
    // substitution so cleanup can tell which paragraphs were placeholder-only.
    let mut originals: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, part) in package.text_parts_mut() {
        let mut part_originals = Vec::new();
        let mut replaced = 0;
        for_each_paragraph_mut(&mut part.root, &mut |p| {
            let text = paragraph_text(p);
            if text.contains('«') {
                for (token, replacement) in &tokens {
                    replaced += replace_token_across_runs(p, token, replacement);
                }
            }
            part_originals.push(text);
        });
        debug!("Filled {replaced} placeholder(s) in {name}");
        originals.insert(name.clone(), part_originals);
    }

    let styles = package.styles.clone();
    for (name, part) in package.text_parts_mut() {
        let part_originals = originals.get(name).map(Vec::as_slice).unwrap_or(&[]);
        let mut cursor = 0;
        let removed = prune_paragraphs(&mut part.root, part_originals, &mut cursor, &styles);
        if removed > 0 {
            debug!("Removed {removed} empty paragraph(s) from {name}");
        }
    }

    package.save()
}

/// Decides whether a paragraph is leftover debris after substitution.
fn is_vestigial(p: &Element, original: &str, styles: &StyleMap) -> bool {
    let text = paragraph_text(p);
    let now = text.trim();

    if BULLET_ONLY_RE.is_match(now) {
        return true;
    }

    if now.is_empty() {
        let style = styles.paragraph_style_name(p).to_lowercase();
        if style.contains("list") || style.contains("bullet") {
            return true;
        }
        if WHOLE_PLACEHOLDER_PARA_RE.is_match(original.trim()) {
            return true;
        }
    }

    false
}

/// Removes vestigial paragraphs below `el`. `cursor` walks `originals` in the
/// same pre-order the fill pass used. Returns the number removed.
fn prune_paragraphs(
    el: &mut Element,
    originals: &[String],
    cursor: &mut usize,
    styles: &StyleMap,
) -> usize {
    let mut removed = 0;
    let mut kept = Vec::with_capacity(el.children.len());

    for node in std::mem::take(&mut el.children) {
        match node {
            Node::Element(mut child) if child.is("w:p") => {
                let original = originals.get(*cursor).map(String::as_str).unwrap_or("");
                *cursor += 1;
                if is_vestigial(&child, original, styles) {
                    *cursor += count_paragraphs(&child);
                    removed += 1;
                    continue;
                }
                removed += prune_paragraphs(&mut child, originals, cursor, styles);
                kept.push(Node::Element(child));
            }
            Node::Element(mut child) => {
                removed += prune_paragraphs(&mut child, originals, cursor, styles);
                kept.push(Node::Element(child));
            }
            other => kept.push(other),
        }
    }

    // A table cell must end with a paragraph to remain a valid document.
    if el.is("w:tc") && !kept.iter().any(|n| matches!(n, Node::Element(e) if e.is("w:p"))) {
        kept.push(Node::Element(Element::new("w:p")));
    }

    el.children = kept;
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::package::MAIN_PART;
    use crate::docx::scanner::extract_placeholders;
    use crate::docx::testing::{build_docx, paragraph, part_paragraph_texts, table, DocxFixture};

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn body_texts(bytes: &[u8]) -> Vec<String> {
        part_paragraph_texts(bytes, MAIN_PART)
    }

    #[test]
    fn test_fills_body_table_header_and_footer() {
        let template = build_docx(&DocxFixture {
            body: vec![
                paragraph(None, &["Project: ", "«Project_Name»"]),
                table(&[vec![paragraph(None, &["No. «Sub_No»"])]]),
            ],
            headers: vec![("header1.xml".to_string(), vec![paragraph(None, &["«Sub_No»"])])],
            footers: vec![("footer1.xml".to_string(), vec![paragraph(None, &["Page «Sub_No»"])])],
        });

        let out = fill_docx(
            &template,
            &values(&[("Project_Name", "Main St Bridge"), ("Sub_No", "033-01")]),
        )
        .unwrap();

        assert_eq!(body_texts(&out), vec!["Project: Main St Bridge", "No. 033-01"]);
        assert_eq!(part_paragraph_texts(&out, "word/header1.xml"), vec!["033-01"]);
        assert_eq!(part_paragraph_texts(&out, "word/footer1.xml"), vec!["Page 033-01"]);
    }

    #[test]
    fn test_split_token_replaced_and_surroundings_preserved() {
        let template = build_docx(&DocxFixture {
            body: vec![paragraph(None, &["Ref «Su", "b_N", "o» (rev)"])],
            ..Default::default()
        });
        let out = fill_docx(&template, &values(&[("Sub_No", "S-7")])).unwrap();
        assert_eq!(body_texts(&out), vec!["Ref S-7 (rev)"]);
    }

    #[test]
    fn test_filling_twice_is_a_no_op() {
        let template = build_docx(&DocxFixture {
            body: vec![
                paragraph(None, &["Dear «Name»,"]),
                paragraph(Some("ListBullet"), &["«BulletedInfo1»"]),
            ],
            ..Default::default()
        });
        let vals = values(&[("Name", "Ann"), ("BulletedInfo1", "Shop drawings")]);
        let once = fill_docx(&template, &vals).unwrap();
        let twice = fill_docx(&once, &vals).unwrap();
        assert_eq!(body_texts(&once), body_texts(&twice));
        assert!(extract_placeholders(&twice).unwrap().is_empty());
    }

    #[test]
    fn test_empty_list_bullet_placeholder_paragraph_is_removed() {
        let template = build_docx(&DocxFixture {
            body: vec![
                paragraph(None, &["Items:"]),
                paragraph(Some("ListBullet"), &["«BulletedInfo1»"]),
                paragraph(None, &["End"]),
            ],
            ..Default::default()
        });
        let out = fill_docx(&template, &values(&[("BulletedInfo1", "")])).unwrap();
        assert_eq!(body_texts(&out), vec!["Items:", "End"]);
    }

    #[test]
    fn test_filled_list_bullet_paragraph_is_retained() {
        let template = build_docx(&DocxFixture {
            body: vec![paragraph(Some("ListBullet"), &["«BulletedInfo1»"])],
            ..Default::default()
        });
        let out = fill_docx(&template, &values(&[("BulletedInfo1", "Shop drawings")])).unwrap();
        assert_eq!(body_texts(&out), vec!["Shop drawings"]);
    }

    #[test]
    fn test_lone_bullet_glyph_paragraphs_are_removed() {
        let template = build_docx(&DocxFixture {
            body: vec![
                paragraph(None, &["•"]),
                paragraph(None, &["- "]),
                paragraph(None, &["\u{2013}"]),
                paragraph(None, &["\u{2014}"]),
                paragraph(None, &["- keep me"]),
            ],
            ..Default::default()
        });
        let out = fill_docx(&template, &BTreeMap::new()).unwrap();
        assert_eq!(body_texts(&out), vec!["- keep me"]);
    }

    #[test]
    fn test_placeholder_only_normal_paragraph_removed_when_blank() {
        let template = build_docx(&DocxFixture {
            body: vec![
                paragraph(None, &["«Line1» «Line2»"]),
                paragraph(None, &["Label: «Line1»"]),
                paragraph(None, &[""]),
            ],
            ..Default::default()
        });
        let out = fill_docx(&template, &values(&[("Line1", ""), ("Line2", "")])).unwrap();
        // The labelled line and the originally blank paragraph are not debris.
        assert_eq!(body_texts(&out), vec!["Label: ", ""]);
    }

    #[test]
    fn test_unknown_tokens_are_left_alone() {
        let template = build_docx(&DocxFixture {
            body: vec![paragraph(None, &["«Known» «Unknown»"])],
            ..Default::default()
        });
        let out = fill_docx(&template, &values(&[("Known", "yes")])).unwrap();
        assert_eq!(body_texts(&out), vec!["yes «Unknown»"]);
    }

    #[test]
    fn test_table_cell_keeps_a_paragraph_after_cleanup() {
        let template = build_docx(&DocxFixture {
            body: vec![table(&[vec![paragraph(Some("ListBullet"), &["«Item»"])]])],
            ..Default::default()
        });
        let out = fill_docx(&template, &values(&[("Item", "")])).unwrap();
        assert_eq!(body_texts(&out), vec![""]);
    }

    #[test]
    fn test_values_are_xml_escaped_in_output() {
        let template = build_docx(&DocxFixture {
            body: vec![paragraph(None, &["«Firm»"])],
            ..Default::default()
        });
        let out = fill_docx(&template, &values(&[("Firm", "Smith & <Sons>")])).unwrap();
        assert_eq!(body_texts(&out), vec!["Smith & <Sons>"]);
    }
}
