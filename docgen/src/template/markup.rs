//! Rewriting of one XML part of the package.
//!
//! The part is read into owned events. Every `<w:t>` element becomes a text
//! run; everything else passes through untouched. Only the runs a placeholder
//! touched are re-serialized, so formatting, bookmarks and revision marks
//! around them survive byte-for-byte.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::placeholder;
use super::TemplateError;
use crate::model::FieldValues;

const TEXT_TAG: &[u8] = b"w:t";
const BREAK_TAG: &str = "w:br";
const SPACE_ATTR: &[u8] = b"xml:space";

enum Node {
    Raw(Event<'static>),
    Text(TextRun),
}

struct TextRun {
    start: BytesStart<'static>,
    inner: Vec<Event<'static>>,
    end: BytesEnd<'static>,
    text: String,
}

fn markup_err(part: &str, err: impl std::fmt::Display) -> TemplateError {
    TemplateError::Markup {
        part: part.to_string(),
        message: err.to_string(),
    }
}

fn parse(part: &str, xml: &str) -> Result<Vec<Node>, TemplateError> {
    let mut reader = Reader::from_str(xml);
    let mut nodes = Vec::new();
    let mut open: Option<(BytesStart<'static>, Vec<Event<'static>>, String)> = None;

    loop {
        let event = reader.read_event().map_err(|e| markup_err(part, e))?;
        match event {
            Event::Eof => break,
            Event::Start(start) if start.name().as_ref() == TEXT_TAG => {
                if open.is_some() {
                    return Err(markup_err(part, "nested <w:t> element"));
                }
                open = Some((start.into_owned(), Vec::new(), String::new()));
            }
            Event::End(end) if end.name().as_ref() == TEXT_TAG => {
                let (start, inner, text) = open
                    .take()
                    .ok_or_else(|| markup_err(part, "</w:t> without opening tag"))?;
                nodes.push(Node::Text(TextRun {
                    start,
                    inner,
                    end: end.into_owned(),
                    text,
                }));
            }
            other => match open.as_mut() {
                Some((_, inner, text)) => {
                    match &other {
                        Event::Text(t) => {
                            text.push_str(&t.unescape().map_err(|e| markup_err(part, e))?)
                        }
                        Event::CData(c) => text.push_str(&String::from_utf8_lossy(c)),
                        _ => {}
                    }
                    inner.push(other.into_owned());
                }
                None => nodes.push(Node::Raw(other.into_owned())),
            },
        }
    }

    if open.is_some() {
        return Err(markup_err(part, "unterminated <w:t> element"));
    }
    Ok(nodes)
}

fn write_event<'a>(
    writer: &mut Writer<Vec<u8>>,
    part: &str,
    event: impl Into<Event<'a>>,
) -> Result<(), TemplateError> {
    writer.write_event(event).map_err(|e| markup_err(part, e))
}

/// Emit a rewritten run. Newlines in `text` become `<w:br/>` between
/// `<w:t>` elements when `linebreaks` is set.
fn write_run(
    writer: &mut Writer<Vec<u8>>,
    part: &str,
    run: &TextRun,
    text: &str,
    linebreaks: bool,
) -> Result<(), TemplateError> {
    let mut start = run.start.clone();
    let preserves = start
        .attributes()
        .flatten()
        .any(|attr| attr.key.as_ref() == SPACE_ATTR);
    if !preserves {
        start.push_attribute(("xml:space", "preserve"));
    }

    let normalized;
    let lines: Vec<&str> = if linebreaks {
        normalized = text.replace("\r\n", "\n");
        normalized.split('\n').collect()
    } else {
        vec![text]
    };

    for (idx, line) in lines.iter().enumerate() {
        if idx > 0 {
            write_event(writer, part, Event::Empty(BytesStart::new(BREAK_TAG)))?;
        }
        write_event(writer, part, Event::Start(start.borrow()))?;
        if !line.is_empty() {
            write_event(writer, part, Event::Text(BytesText::new(line)))?;
        }
        write_event(writer, part, Event::End(run.end.borrow()))?;
    }
    Ok(())
}

/// Substitute placeholders in one part.
///
/// Returns `None` when the part holds no placeholder, so the caller can copy
/// the original bytes instead of re-serializing.
pub(crate) fn render_part(
    part: &str,
    xml: &str,
    values: &FieldValues,
    linebreaks: bool,
) -> Result<Option<String>, TemplateError> {
    let nodes = parse(part, xml)?;
    let runs: Vec<String> = nodes
        .iter()
        .filter_map(|node| match node {
            Node::Text(run) => Some(run.text.clone()),
            Node::Raw(_) => None,
        })
        .collect();

    let substitution = placeholder::substitute(part, &runs, |name| values.get(name))?;
    if substitution.is_unchanged() {
        return Ok(None);
    }

    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut run_idx = 0usize;
    for node in &nodes {
        match node {
            Node::Raw(event) => write_event(&mut writer, part, event.borrow())?,
            Node::Text(run) => {
                if substitution.modified[run_idx] {
                    write_run(
                        &mut writer,
                        part,
                        run,
                        &substitution.texts[run_idx],
                        linebreaks,
                    )?;
                } else {
                    write_event(&mut writer, part, Event::Start(run.start.borrow()))?;
                    for inner in &run.inner {
                        write_event(&mut writer, part, inner.borrow())?;
                    }
                    write_event(&mut writer, part, Event::End(run.end.borrow()))?;
                }
                run_idx += 1;
            }
        }
    }

    String::from_utf8(writer.into_inner())
        .map(Some)
        .map_err(|e| markup_err(part, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PART: &str = "word/document.xml";

    fn values() -> FieldValues {
        FieldValues {
            petitioner: "Jane Doe".into(),
            respondent: "John & Sons".into(),
            csp: String::new(),
            dr_number: "DR-1".into(),
        }
    }

    fn body(inner: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{inner}</w:body></w:document>"#
        )
    }

    #[test]
    fn test_part_without_placeholders_is_untouched() {
        let xml = body("<w:p><w:r><w:t>Hello</w:t></w:r></w:p>");
        assert_eq!(render_part(PART, &xml, &values(), true).unwrap(), None);
    }

    #[test]
    fn test_split_placeholder_rewrites_only_touched_runs() {
        let xml = body(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Petitioner: {peti</w:t></w:r><w:r><w:t>tioner}</w:t></w:r><w:r><w:t>end</w:t></w:r></w:p>"#,
        );
        let out = render_part(PART, &xml, &values(), true).unwrap().unwrap();
        assert!(out.contains(r#"<w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Petitioner: Jane Doe</w:t>"#));
        assert!(out.contains(r#"<w:r><w:t xml:space="preserve"></w:t></w:r>"#));
        assert!(out.contains("<w:t>end</w:t>"));
    }

    #[test]
    fn test_values_are_escaped() {
        let xml = body("<w:p><w:r><w:t>{respondent}</w:t></w:r></w:p>");
        let out = render_part(PART, &xml, &values(), true).unwrap().unwrap();
        assert!(out.contains("John &amp; Sons"));
    }

    #[test]
    fn test_newline_becomes_break() {
        let mut vals = values();
        vals.petitioner = "Jane Doe\nc/o Counsel".into();
        let xml = body("<w:p><w:r><w:t>{petitioner}</w:t></w:r></w:p>");
        let out = render_part(PART, &xml, &vals, true).unwrap().unwrap();
        assert!(out.contains(
            r#"<w:t xml:space="preserve">Jane Doe</w:t><w:br/><w:t xml:space="preserve">c/o Counsel</w:t>"#
        ));
    }

    #[test]
    fn test_existing_space_attribute_is_kept_once() {
        let xml = body(r#"<w:p><w:r><w:t xml:space="preserve">DR {drNumber}</w:t></w:r></w:p>"#);
        let out = render_part(PART, &xml, &values(), true).unwrap().unwrap();
        assert_eq!(out.matches("xml:space").count(), 1);
        assert!(out.contains("DR DR-1"));
    }

    #[test]
    fn test_malformed_xml_is_reported_with_part() {
        let err = render_part(PART, "<w:t>unterminated", &values(), true).unwrap_err();
        assert!(matches!(err, TemplateError::Markup { ref part, .. } if part == PART));
    }
}
