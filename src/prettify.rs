//! Pretty-printers for text bodies.
//!
//! A prettifier never fails: input it cannot parse comes back unchanged.

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, LazyLock};

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::Event;
use scraper::{ElementRef, Html, Node};
use serde::Serialize;
use serde_json::ser::Formatter;
use tracing::debug;

pub type Prettifier = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// MIME type → prettifier. Keys are normalized MIME types.
pub type Prettifiers = BTreeMap<String, Prettifier>;

const INDENT: &[u8] = b"  ";

static DEFAULT_PRETTIFIERS: LazyLock<Prettifiers> = LazyLock::new(|| {
    let json: Prettifier = Arc::new(pretty_json);
    let xml: Prettifier = Arc::new(pretty_xml);
    let html: Prettifier = Arc::new(pretty_html);

    let mut map = Prettifiers::new();
    map.insert("application/json".to_string(), json);
    for mime in ["application/xml", "text/xml", "application/soap+xml", "application/atom+xml"] {
        map.insert(mime.to_string(), Arc::clone(&xml));
    }
    map.insert("text/html".to_string(), html);
    map
});

/// The process-wide JSON / XML / HTML prettifier map.
pub fn default_prettifiers() -> Prettifiers {
    DEFAULT_PRETTIFIERS.clone()
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Two-space indented JSON with `"key" : value` separators and inline arrays.
pub fn pretty_json(json: &str) -> String {
    let value: serde_json::Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "JSON prettifier: input left as is");
            return json.to_string();
        }
    };
    let mut out = Vec::with_capacity(json.len() * 2);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, ReportJsonFormatter::default());
    if value.serialize(&mut serializer).is_err() {
        return json.to_string();
    }
    match String::from_utf8(out) {
        Ok(pretty) => pretty.trim().to_string(),
        Err(_) => json.to_string(),
    }
}

/// Object members go one per line; arrays stay on one line as `[ a, b ]`.
#[derive(Debug, Default)]
struct ReportJsonFormatter {
    depth: usize,
    has_value: bool,
}

fn write_indent<W: ?Sized + io::Write>(writer: &mut W, depth: usize) -> io::Result<()> {
    for _ in 0..depth {
        writer.write_all(INDENT)?;
    }
    Ok(())
}

impl Formatter for ReportJsonFormatter {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b"[")
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b" ]")
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        writer.write_all(if first { " " } else { ", " }.as_bytes())
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        Ok(())
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.depth += 1;
        self.has_value = false;
        writer.write_all(b"{")
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.depth -= 1;
        if self.has_value {
            writer.write_all(b"\n")?;
            write_indent(writer, self.depth)?;
        } else {
            writer.write_all(b" ")?;
        }
        writer.write_all(b"}")
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        writer.write_all(if first { "\n" } else { ",\n" }.as_bytes())?;
        write_indent(writer, self.depth)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b" : ")
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// XML
// ---------------------------------------------------------------------------

/// Two-space indented XML without the declaration.
pub fn pretty_xml(xml: &str) -> String {
    match reindent_xml(xml) {
        Some(pretty) => pretty,
        None => {
            debug!("XML prettifier: input left as is");
            xml.to_string()
        }
    }
}

fn reindent_xml(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    let mut depth = 0usize;
    let mut saw_root = false;
    loop {
        let event = reader.read_event().ok()?;
        match event {
            Event::Eof => break,
            Event::Decl(_) => continue,
            Event::Start(_) => {
                if depth == 0 && saw_root {
                    return None;
                }
                depth += 1;
                saw_root = true;
            }
            Event::End(_) => depth = depth.checked_sub(1)?,
            Event::Empty(_) => {
                if depth == 0 && saw_root {
                    return None;
                }
                saw_root = true;
            }
            Event::Text(_) | Event::CData(_) if depth == 0 => return None,
            _ => {}
        }
        writer.write_event(event).ok()?;
    }
    if depth != 0 || !saw_root {
        return None;
    }

    let pretty = String::from_utf8(writer.into_inner()).ok()?;
    Some(pretty.trim().to_string())
}

// ---------------------------------------------------------------------------
// HTML
// ---------------------------------------------------------------------------

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// Elements whose text content is written out verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext"];

/// Re-serialize HTML through a tolerant parser, two-space indented.
///
/// Elements holding only text stay on one line; any element with element
/// children puts each child on its own line.
pub fn pretty_html(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::with_capacity(html.len() * 2);

    for node in document.tree.root().children() {
        if let Node::Doctype(doctype) = node.value() {
            out.push_str("<!doctype ");
            out.push_str(doctype.name());
            out.push_str(">\n");
        }
    }
    write_html_element(document.root_element(), 0, &mut out);

    let pretty = out.trim();
    if pretty.is_empty() { html.to_string() } else { pretty.to_string() }
}

fn write_html_element(element: ElementRef<'_>, depth: usize, out: &mut String) {
    let name = element.value().name();
    push_indent(out, depth);
    out.push('<');
    out.push_str(name);
    for (attr, value) in element.value().attrs() {
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        out.push_str(&escape_html(value, true));
        out.push('"');
    }
    out.push('>');
    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    let has_element_children = element.children().any(|child| child.value().is_element());
    if !has_element_children {
        let raw_text = RAW_TEXT_ELEMENTS.contains(&name);
        for child in element.children() {
            if let Node::Text(text) = child.value() {
                if raw_text {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_html(text, false));
                }
            }
        }
    } else {
        for child in element.children() {
            match child.value() {
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        out.push('\n');
                        write_html_element(child, depth + 1, out);
                    }
                }
                Node::Text(text) if !text.trim().is_empty() => {
                    out.push('\n');
                    push_indent(out, depth + 1);
                    out.push_str(&escape_html(text.trim(), false));
                }
                Node::Comment(comment) => {
                    out.push('\n');
                    push_indent(out, depth + 1);
                    out.push_str("<!--");
                    out.push_str(comment);
                    out.push_str("-->");
                }
                _ => {}
            }
        }
        out.push('\n');
        push_indent(out, depth);
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn escape_html(text: &str, attribute: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' if !attribute => escaped.push_str("&lt;"),
            '>' if !attribute => escaped.push_str("&gt;"),
            '"' if attribute => escaped.push_str("&quot;"),
            '\u{a0}' => escaped.push_str("&nbsp;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
