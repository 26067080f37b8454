//! Paragraph and run access over the WordprocessingML tree.
//!
//! A paragraph (`w:p`) shows its text through runs (`w:r`), each run holding
//! its text in one or more `w:t` elements. Word splits text into runs at
//! arbitrary points (formatting changes, spell-check marks, revision ids),
//! so a placeholder may start in one run and end several runs later.

use crate::docx::xml::{Element, Node};

/// Elements that may wrap runs inside a paragraph.
const RUN_CONTAINERS: &[&str] = &[
    "w:hyperlink",
    "w:ins",
    "w:smartTag",
    "w:fldSimple",
    "w:customXml",
    "w:sdt",
    "w:sdtContent",
];

/// Calls `f` for every paragraph under `el`, in document order.
/// Paragraphs nested in tables (to any depth) and text boxes are included.
pub fn for_each_paragraph<'a>(el: &'a Element, f: &mut impl FnMut(&'a Element)) {
    for child in el.child_elements() {
        if child.is("w:p") {
            f(child);
        }
        for_each_paragraph(child, f);
    }
}

pub fn for_each_paragraph_mut(el: &mut Element, f: &mut impl FnMut(&mut Element)) {
    for child in el.children.iter_mut() {
        if let Node::Element(child) = child {
            if child.is("w:p") {
                f(&mut *child);
            }
            for_each_paragraph_mut(child, f);
        }
    }
}

/// Number of paragraphs strictly inside `el`.
pub fn count_paragraphs(el: &Element) -> usize {
    let mut n = 0;
    for_each_paragraph(el, &mut |_| n += 1);
    n
}

fn collect_runs<'a>(el: &'a Element, out: &mut Vec<&'a Element>) {
    for child in el.child_elements() {
        if child.is("w:r") {
            out.push(child);
        } else if RUN_CONTAINERS.contains(&child.name.as_str()) {
            collect_runs(child, out);
        }
    }
}

fn collect_runs_mut<'a>(el: &'a mut Element, out: &mut Vec<&'a mut Element>) {
    for child in el.children.iter_mut() {
        let Node::Element(child) = child else {
            continue;
        };
        if child.is("w:r") {
            out.push(child);
        } else if RUN_CONTAINERS.contains(&child.name.as_str()) {
            collect_runs_mut(child, out);
        }
    }
}

/// Visible text of a run. `w:tab` reads as `\t`; line breaks (`w:br` without
/// a page or column type, and `w:cr`) read as `\n`.
pub fn run_text(run: &Element) -> String {
    let mut text = String::new();
    for child in run.child_elements() {
        match child.name.as_str() {
            "w:t" => text.push_str(&child.text()),
            "w:tab" => text.push('\t'),
            "w:cr" => text.push('\n'),
            "w:br" if is_line_break(child) => text.push('\n'),
            _ => {}
        }
    }
    text
}

fn is_line_break(br: &Element) -> bool {
    matches!(br.attr("w:type"), None | Some("textWrapping"))
}

/// Rebuilds the run's content from `text`, keeping the run properties
/// (`w:rPr`). Everything after the properties is replaced: `\t` becomes
/// `w:tab`, `\n` (or `\r\n`, `\r`) becomes `w:br`, other text goes in
/// `w:t` elements.
pub fn set_run_text(run: &mut Element, text: &str) {
    run.children
        .retain(|n| matches!(n, Node::Element(e) if e.is("w:rPr")));

    let mut pending = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        let marker = match c {
            '\t' => "w:tab",
            '\n' => "w:br",
            '\r' => {
                chars.next_if_eq(&'\n');
                "w:br"
            }
            _ => {
                pending.push(c);
                continue;
            }
        };
        push_text(run, &mut pending);
        run.children.push(Node::Element(Element::new(marker)));
    }
    push_text(run, &mut pending);
}

fn push_text(run: &mut Element, pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    let mut t = Element::new("w:t");
    t.set_attr("xml:space", "preserve");
    t.set_text(pending);
    run.children.push(Node::Element(t));
    pending.clear();
}

/// Visible text of a paragraph: the concatenation of its run texts.
pub fn paragraph_text(p: &Element) -> String {
    let mut runs = Vec::new();
    collect_runs(p, &mut runs);
    runs.into_iter().map(run_text).collect()
}

/// Replaces every occurrence of `token` in the paragraph, even when the token
/// straddles run boundaries.
///
/// When a token spans several runs, the first run keeps its prefix plus the
/// whole replacement, the runs in between are emptied and the last run keeps
/// its suffix. Formatting of the first run therefore applies to the inserted
/// value. Returns the number of replacements made.
pub fn replace_token_across_runs(p: &mut Element, token: &str, replacement: &str) -> usize {
    if token.is_empty() {
        return 0;
    }
    let mut runs = Vec::new();
    collect_runs_mut(p, &mut runs);
    if runs.is_empty() {
        return 0;
    }

    let mut texts: Vec<String> = runs.iter().map(|r| run_text(r)).collect();
    let mut replaced = 0;
    let mut search_from = 0;

    loop {
        let full: String = texts.concat();
        let Some(found) = full.get(search_from..).and_then(|rest| rest.find(token)) else {
            break;
        };
        let start = search_from + found;
        let end = start + token.len();

        let Some((start_run, start_off, end_run, end_off)) = locate_span(&texts, start, end)
        else {
            break;
        };

        if start_run == end_run {
            let text = &texts[start_run];
            texts[start_run] = format!("{}{}{}", &text[..start_off], replacement, &text[end_off..]);
        } else {
            texts[start_run] = format!("{}{}", &texts[start_run][..start_off], replacement);
            for text in texts.iter_mut().take(end_run).skip(start_run + 1) {
                text.clear();
            }
            texts[end_run] = texts[end_run][end_off..].to_string();
        }

        for i in start_run..=end_run {
            set_run_text(&mut *runs[i], &texts[i]);
        }

        replaced += 1;
        search_from = start + replacement.len();
    }

    replaced
}

/// Maps a `[start, end)` byte span of the concatenated text back to
/// `(start_run, start_offset, end_run, end_offset)`.
fn locate_span(texts: &[String], start: usize, end: usize) -> Option<(usize, usize, usize, usize)> {
    let mut pos = 0;
    let mut start_at: Option<(usize, usize)> = None;

    for (i, text) in texts.iter().enumerate() {
        let next_pos = pos + text.len();
        if start_at.is_none() && start < next_pos {
            start_at = Some((i, start - pos));
        }
        if let Some((start_run, start_off)) = start_at {
            if end <= next_pos {
                return Some((start_run, start_off, i, end - pos));
            }
        }
        pos = next_pos;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::xml::XmlDocument;

    fn parse_paragraph(xml: &str) -> Element {
        let doc = XmlDocument::parse(xml).unwrap();
        doc.document_element().unwrap().clone()
    }

    fn runs_of(p: &Element) -> Vec<String> {
        let mut runs = Vec::new();
        collect_runs(p, &mut runs);
        runs.into_iter().map(run_text).collect()
    }

    #[test]
    fn test_token_split_across_three_runs_is_replaced_as_one() {
        let mut p = parse_paragraph(
            "<w:p><w:r><w:t>Ref: «Su</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>b_N</w:t></w:r><w:r><w:t>o» end</w:t></w:r></w:p>",
        );
        let n = replace_token_across_runs(&mut p, "«Sub_No»", "S-100");
        assert_eq!(n, 1);
        assert_eq!(paragraph_text(&p), "Ref: S-100 end");
        assert_eq!(runs_of(&p), vec!["Ref: S-100", "", " end"]);
    }

    #[test]
    fn test_token_within_single_run_keeps_prefix_and_suffix() {
        let mut p = parse_paragraph("<w:p><w:r><w:t>Dear «Name», hello</w:t></w:r></w:p>");
        replace_token_across_runs(&mut p, "«Name»", "Ann");
        assert_eq!(paragraph_text(&p), "Dear Ann, hello");
    }

    #[test]
    fn test_multiple_occurrences_in_one_paragraph() {
        let mut p = parse_paragraph(
            "<w:p><w:r><w:t>«A» and «</w:t></w:r><w:r><w:t>A» again</w:t></w:r></w:p>",
        );
        let n = replace_token_across_runs(&mut p, "«A»", "x");
        assert_eq!(n, 2);
        assert_eq!(paragraph_text(&p), "x and x again");
    }

    #[test]
    fn test_replacement_containing_token_terminates() {
        let mut p = parse_paragraph("<w:p><w:r><w:t>«A»</w:t></w:r></w:p>");
        let n = replace_token_across_runs(&mut p, "«A»", "«A»«A»");
        assert_eq!(n, 1);
        assert_eq!(paragraph_text(&p), "«A»«A»");
    }

    #[test]
    fn test_runs_inside_hyperlinks_participate() {
        let mut p = parse_paragraph(
            "<w:p><w:r><w:t>See «Li</w:t></w:r><w:hyperlink><w:r><w:t>nk»</w:t></w:r></w:hyperlink></w:p>",
        );
        replace_token_across_runs(&mut p, "«Link»", "here");
        assert_eq!(paragraph_text(&p), "See here");
    }

    #[test]
    fn test_missing_token_is_a_no_op() {
        let mut p = parse_paragraph("<w:p><w:r><w:t>plain</w:t></w:r></w:p>");
        let before = p.clone();
        assert_eq!(replace_token_across_runs(&mut p, "«X»", "y"), 0);
        assert_eq!(p, before);
    }

    #[test]
    fn test_run_properties_survive_replacement() {
        let mut p = parse_paragraph(
            "<w:p><w:r><w:rPr><w:i/></w:rPr><w:t>«X»</w:t></w:r></w:p>",
        );
        replace_token_across_runs(&mut p, "«X»", "value");
        assert_eq!(
            serialize(p),
            r#"<w:p><w:r><w:rPr><w:i/></w:rPr><w:t xml:space="preserve">value</w:t></w:r></w:p>"#
        );
    }

    fn serialize(p: Element) -> String {
        let mut doc = XmlDocument {
            root: Element::new(""),
        };
        doc.root.children.push(Node::Element(p));
        doc.to_xml()
    }

    #[test]
    fn test_tabs_and_line_breaks_read_as_text() {
        let p = parse_paragraph(
            r#"<w:p><w:r><w:t>A</w:t><w:tab/><w:t>B</w:t><w:br/><w:t>C</w:t><w:br w:type="page"/></w:r></w:p>"#,
        );
        assert_eq!(paragraph_text(&p), "A\tB\nC");
    }

    #[test]
    fn test_line_break_between_tokens_stays_between_values() {
        let mut p = parse_paragraph(
            "<w:p><w:r><w:t>«Addr1»</w:t><w:br/><w:t>«City»</w:t></w:r></w:p>",
        );
        replace_token_across_runs(&mut p, "«Addr1»", "1 Main St");
        replace_token_across_runs(&mut p, "«City»", "Springfield");
        assert_eq!(paragraph_text(&p), "1 Main St\nSpringfield");
        assert_eq!(
            serialize(p),
            r#"<w:p><w:r><w:t xml:space="preserve">1 Main St</w:t><w:br/><w:t xml:space="preserve">Springfield</w:t></w:r></w:p>"#
        );
    }

    #[test]
    fn test_multiline_value_becomes_breaks_and_tabs() {
        let mut p = parse_paragraph(
            "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>To: «Address»</w:t></w:r></w:p>",
        );
        replace_token_across_runs(&mut p, "«Address»", "1 Main St\r\nSpringfield\tIL");
        assert_eq!(
            serialize(p),
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">To: 1 Main St</w:t><w:br/><w:t xml:space="preserve">Springfield</w:t><w:tab/><w:t xml:space="preserve">IL</w:t></w:r></w:p>"#
        );
    }

    #[test]
    fn test_nested_table_paragraphs_are_visited() {
        let doc = XmlDocument::parse(
            "<w:body><w:p/><w:tbl><w:tr><w:tc><w:tbl><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl></w:tc></w:tr></w:tbl></w:body>",
        )
        .unwrap();
        assert_eq!(count_paragraphs(&doc.root), 2);
    }

    #[test]
    fn test_locate_span_skips_empty_runs() {
        let texts = vec!["ab".to_string(), String::new(), "cd".to_string()];
        assert_eq!(locate_span(&texts, 1, 3), Some((0, 1, 2, 1)));
        assert_eq!(locate_span(&texts, 2, 4), Some((2, 0, 2, 2)));
    }
}
