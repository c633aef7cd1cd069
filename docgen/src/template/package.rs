//! Zip container handling: find the parts that carry text, re-pack the rest.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{markup, RenderOptions, TemplateError};
use crate::model::FieldValues;

/// The main document part; a package without it is not a template.
pub const MAIN_PART: &str = "word/document.xml";

fn container_err(err: impl std::fmt::Display) -> TemplateError {
    TemplateError::Container(err.to_string())
}

/// Whether `name` is a part whose text may hold placeholders: the body,
/// headers, footers, footnotes and endnotes.
pub(crate) fn is_text_part(name: &str) -> bool {
    let Some(file) = name.strip_prefix("word/") else {
        return false;
    };
    if file.contains('/') || !file.ends_with(".xml") {
        return false;
    }
    file == "document.xml"
        || file == "footnotes.xml"
        || file == "endnotes.xml"
        || file.starts_with("header")
        || file.starts_with("footer")
}

/// Fill every text part of the package in `bytes`.
///
/// All parts are rendered before anything is written, so a failure never
/// yields a partial package. Parts without placeholders are copied raw,
/// keeping their original compression and timestamps.
pub(crate) fn render_package(
    bytes: &[u8],
    values: &FieldValues,
    options: &RenderOptions,
) -> Result<Vec<u8>, TemplateError> {
    if bytes.is_empty() {
        return Err(TemplateError::EmptyContainer);
    }
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(container_err)?;

    let mut rendered: HashMap<usize, String> = HashMap::new();
    let mut has_main_part = false;
    for idx in 0..archive.len() {
        let mut file = archive.by_index(idx).map_err(container_err)?;
        let name = file.name().to_string();
        if !is_text_part(&name) {
            continue;
        }
        has_main_part |= name == MAIN_PART;

        let mut xml = String::new();
        file.read_to_string(&mut xml)
            .map_err(|e| TemplateError::Markup {
                part: name.clone(),
                message: e.to_string(),
            })?;
        if let Some(out) = markup::render_part(&name, &xml, values, options.linebreaks)? {
            debug!(part = %name, "placeholders substituted");
            rendered.insert(idx, out);
        }
    }
    if !has_main_part {
        return Err(TemplateError::MissingMainPart);
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(bytes.len())));
    for idx in 0..archive.len() {
        let file = archive.by_index_raw(idx).map_err(container_err)?;
        match rendered.remove(&idx) {
            Some(xml) => {
                let name = file.name().to_string();
                let method = match file.compression() {
                    CompressionMethod::Stored => CompressionMethod::Stored,
                    _ => CompressionMethod::Deflated,
                };
                drop(file);
                writer
                    .start_file(name, SimpleFileOptions::default().compression_method(method))
                    .map_err(|e| TemplateError::Write(e.to_string()))?;
                writer
                    .write_all(xml.as_bytes())
                    .map_err(|e| TemplateError::Write(e.to_string()))?;
            }
            None => writer
                .raw_copy_file(file)
                .map_err(|e| TemplateError::Write(e.to_string()))?,
        }
    }

    let cursor = writer
        .finish()
        .map_err(|e| TemplateError::Write(e.to_string()))?;
    Ok(cursor.into_inner())
}
