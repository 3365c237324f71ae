//! Final cleanup of generated chapter markup.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{Error, Result};

use super::dom::escape_xml;

const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">
"#;

/// Elements followed by a line break when re-emitted.
const BLOCK_ELEMENTS: &[&[u8]] = &[
    b"html", b"head", b"title", b"body", b"h1", b"h2", b"h3", b"h4", b"h5", b"h6", b"p",
    b"div", b"table", b"tr",
];

/// Turns a serialized chapter into a standalone document.
///
/// Failures are reported as [`Error::ExternalTool`], the same as any other
/// post-processing step the chapter goes through.
pub trait Normalizer {
    fn normalize(&self, markup: &str) -> Result<String>;
}

/// Checks well-formedness and emits an XHTML 1.1 document with XML
/// declaration, doctype and namespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct XhtmlNormalizer;

impl XhtmlNormalizer {
    const TOOL: &'static str = "xhtml normalizer";

    fn fail(message: impl Into<String>) -> Error {
        Error::tool(Self::TOOL, message)
    }
}

impl Normalizer for XhtmlNormalizer {
    fn normalize(&self, markup: &str) -> Result<String> {
        let mut reader = Reader::from_str(markup);
        reader.config_mut().check_end_names = true;

        let mut out = String::with_capacity(HEADER.len() + markup.len() + markup.len() / 8);
        out.push_str(HEADER);

        let mut depth = 0usize;
        let mut seen_root = false;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| Self::fail(format!("{e} at byte {}", reader.error_position())))?;
            match event {
                Event::Start(e) | Event::Empty(e) if depth == 0 && seen_root => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    return Err(Self::fail(format!("second root element <{name}>")));
                }
                Event::Start(e) => {
                    for attr in e.attributes() {
                        attr.map_err(|err| Self::fail(err.to_string()))?;
                    }
                    let raw = String::from_utf8_lossy(&e);
                    out.push('<');
                    out.push_str(&raw);
                    if depth == 0 {
                        seen_root = true;
                        let has_ns = e
                            .attributes()
                            .flatten()
                            .any(|a| a.key.as_ref() == b"xmlns");
                        if !has_ns {
                            out.push_str(&format!(" xmlns=\"{XHTML_NS}\""));
                        }
                    }
                    out.push('>');
                    if matches!(e.name().as_ref(), b"html" | b"head" | b"body" | b"table" | b"tr") {
                        out.push('\n');
                    }
                    depth += 1;
                }
                Event::Empty(e) => {
                    for attr in e.attributes() {
                        attr.map_err(|err| Self::fail(err.to_string()))?;
                    }
                    if depth == 0 {
                        seen_root = true;
                    }
                    out.push('<');
                    out.push_str(&String::from_utf8_lossy(&e));
                    out.push_str("/>");
                }
                Event::End(e) => {
                    depth = depth.saturating_sub(1);
                    let name = e.name();
                    out.push_str("</");
                    out.push_str(&String::from_utf8_lossy(name.as_ref()));
                    out.push('>');
                    if BLOCK_ELEMENTS.contains(&name.as_ref()) {
                        out.push('\n');
                    }
                }
                Event::Text(e) => {
                    if depth == 0 {
                        if e.iter().all(u8::is_ascii_whitespace) {
                            continue;
                        }
                        return Err(Self::fail("text outside the root element"));
                    }
                    out.push_str(&String::from_utf8_lossy(&e));
                }
                Event::GeneralRef(e) => {
                    out.push('&');
                    out.push_str(&String::from_utf8_lossy(&e));
                    out.push(';');
                }
                Event::CData(e) => {
                    out.push_str(&escape_xml(&String::from_utf8_lossy(&e)));
                }
                Event::Eof => break,
                // Declarations, doctypes and comments are replaced or dropped.
                _ => {}
            }
        }

        if depth != 0 {
            return Err(Self::fail("unexpected end of document"));
        }
        if !seen_root {
            return Err(Self::fail("empty document"));
        }
        Ok(out)
    }
}
