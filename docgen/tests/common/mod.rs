//! Shared fixtures: in-test `.docx` packages and fake collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docgen::gateway::{GraphRequest, GraphResponse, GraphTransport};
use docgen::{ByteSource, DocfillError, DocfillResult, Gateway};
use serde_json::Value;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

pub const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:styleId="Normal"/></w:styles>"#;

/// Wrap body markup in a `word/document.xml` envelope.
pub fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    )
}

/// One paragraph per text run list: `&[&["A {peti", "tioner}"]]`.
pub fn paragraphs(runs: &[&[&str]]) -> String {
    runs.iter()
        .map(|p| {
            let inner: String = p
                .iter()
                .map(|t| format!("<w:r><w:t>{t}</w:t></w:r>"))
                .collect();
            format!("<w:p>{inner}</w:p>")
        })
        .collect()
}

/// Build a package from `(name, content)` parts with a fixed timestamp.
pub fn build_package(parts: &[(&str, &str)]) -> Vec<u8> {
    let stamp = zip::DateTime::from_date_and_time(2021, 3, 4, 5, 6, 8).unwrap();
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(stamp);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A minimal template whose body is `body`.
pub fn template_with_body(body: &str) -> Vec<u8> {
    build_package(&[
        ("[Content_Types].xml", CONTENT_TYPES),
        ("word/document.xml", &document_xml(body)),
        ("word/styles.xml", STYLES),
    ])
}

/// Read one part of a package as text.
pub fn read_part(package: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(package)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut out = String::new();
    file.read_to_string(&mut out).unwrap();
    out
}

/// Entry names of a package, in archive order.
pub fn part_names(package: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(package)).unwrap();
    archive.file_names().map(str::to_string).collect()
}

type Handler = Box<dyn Fn(&GraphRequest) -> GraphResponse + Send + Sync>;

/// Graph transport answering from a closure and recording operation names.
pub struct FakeTransport {
    handler: Handler,
    calls: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new(handler: impl Fn(&GraphRequest) -> GraphResponse + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphTransport for FakeTransport {
    async fn send(&self, request: &GraphRequest) -> DocfillResult<GraphResponse> {
        self.calls
            .lock()
            .unwrap()
            .push(request.operation_name().to_string());
        Ok((self.handler)(request))
    }
}

pub fn gateway(transport: &Arc<FakeTransport>) -> Gateway {
    Gateway::new(transport.clone())
}

/// First `itemId` variable of a request.
pub fn item_id(request: &GraphRequest) -> String {
    request.variables["itemId"][0]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

/// Byte source serving fixed bodies per URL; unknown URLs answer 404.
#[derive(Default)]
pub struct FakeSource {
    bodies: HashMap<String, Vec<u8>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn with(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ByteSource for FakeSource {
    async fn fetch_bytes(&self, url: &str) -> DocfillResult<Vec<u8>> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.bodies
            .get(url)
            .cloned()
            .ok_or(DocfillError::RelayFetch { status: 404 })
    }
}

pub fn assets_payload(assets: Value) -> GraphResponse {
    GraphResponse::ok(serde_json::json!({ "items": [{ "id": "x", "assets": assets }] }))
}
