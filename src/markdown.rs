//! Markdown rendering of built entities.
//!
//! An entity renders to an ordered list of [`ReportEntry`] values. Sections
//! inside one entry are separated by a blank line:
//!
//! ~~~text
//! **>>> REQUEST**
//! POST to http://example.com/api
//!
//! **Headers**
//! Content-Type: application/json
//!
//! **Body**
//! ```
//! {
//!   "key" : "value"
//! }
//! ```
//! ~~~

use tracing::trace;

use crate::entity::{EntityContent, Part, RequestEntity, ResponseEntity};
use crate::error::EntityError;
use crate::mime::APPLICATION_OCTET_STREAM;
use crate::prettify::Prettifiers;
use crate::reporter::Attachment;
use crate::types::{BodyType, PartType};

pub const REQUEST_TAG: &str = "**>>> REQUEST**";
pub const RESPONSE_TAG: &str = "**<<< RESPONSE**";
pub const HEADERS_TAG: &str = "**Headers**";
pub const COOKIES_TAG: &str = "**Cookies**";
pub const BODY_TAG: &str = "**Body**";
pub const BODY_PART_TAG: &str = "**Body part**";

const LINE_DELIMITER: &str = "\n";
const SECTION_DELIMITER: &str = "\n\n";
const CODE_FENCE: &str = "```";

/// One unit handed to the reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEntry {
    /// A plain text log entry.
    Text(String),
    /// A text message with a binary attachment.
    Binary { message: String, attachment: Attachment },
    /// A failure confined to one part, always reported at error level.
    Error(String),
    OpenStep(String),
    CloseStep,
}

/// Render a request entity.
///
/// # Errors
///
/// Returns [`EntityError`] if the entity's body does not match its own
/// classification, which the builders never produce.
pub fn render_request(entity: &RequestEntity) -> Result<Vec<ReportEntry>, EntityError> {
    let uri = (entity.content.converters.uri)(&entity.uri).unwrap_or_default();
    let head = format!("{REQUEST_TAG}{LINE_DELIMITER}{} to {uri}", entity.method);
    render(head, &entity.content)
}

/// Render a response entity.
///
/// # Errors
///
/// See [`render_request`].
pub fn render_response(entity: &ResponseEntity) -> Result<Vec<ReportEntry>, EntityError> {
    let head = format!("{RESPONSE_TAG}{LINE_DELIMITER}{}", entity.status_line);
    render(head, &entity.content)
}

fn render(head: String, content: &EntityContent) -> Result<Vec<ReportEntry>, EntityError> {
    let headers = tagged_block(
        HEADERS_TAG,
        content.headers.iter().filter_map(|h| (content.converters.header)(h)),
    );
    let cookies = tagged_block(
        COOKIES_TAG,
        content.cookies.iter().filter_map(|c| (content.converters.cookie)(c)),
    );
    let body = &content.body;

    let entries = match body.body_type() {
        BodyType::None => vec![ReportEntry::Text(sections([Some(head), headers, cookies]))],
        BodyType::Text => {
            let mime_type = body.mime_type().unwrap_or(APPLICATION_OCTET_STREAM);
            let text = prettify(&content.prettifiers, mime_type, body.text()?);
            vec![ReportEntry::Text(sections([
                Some(head),
                headers,
                cookies,
                fenced(BODY_TAG, &text),
            ]))]
        }
        BodyType::Form => {
            let params = body
                .params()?
                .iter()
                .filter_map(|p| (content.converters.param)(p))
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(LINE_DELIMITER);
            vec![ReportEntry::Text(sections([
                Some(head),
                headers,
                cookies,
                fenced(BODY_TAG, &params),
            ]))]
        }
        BodyType::Binary => {
            let mime_type = body.mime_type().unwrap_or(APPLICATION_OCTET_STREAM);
            vec![ReportEntry::Binary {
                message: sections([Some(head), headers, cookies]),
                attachment: Attachment::new(mime_type, body.bytes()?),
            }]
        }
        BodyType::Multipart => {
            let parts = body.parts()?;
            if parts.is_empty() {
                vec![ReportEntry::Text(sections([Some(head), headers, cookies]))]
            } else {
                let mut entries = Vec::with_capacity(parts.len() + 3);
                entries.push(ReportEntry::OpenStep(head));
                let meta = sections([headers, cookies]);
                if !meta.is_empty() {
                    entries.push(ReportEntry::Text(meta));
                }
                for part in parts {
                    match part {
                        Ok(part) => entries.extend(render_part(part, content)?),
                        Err(e) => entries.push(ReportEntry::Error(e.to_string())),
                    }
                }
                entries.push(ReportEntry::CloseStep);
                entries
            }
        }
    };

    trace!(entries = entries.len(), "entity rendered");
    Ok(entries)
}

fn render_part(part: &Part, content: &EntityContent) -> Result<Option<ReportEntry>, EntityError> {
    let headers = tagged_block(
        HEADERS_TAG,
        part.headers.iter().filter_map(|h| (content.converters.part_header)(h)),
    );

    let entry = match part.part_type() {
        PartType::Text => {
            let text = prettify(&content.prettifiers, &part.mime_type, part.text_payload()?);
            let message = sections([headers, fenced(BODY_PART_TAG, &text)]);
            (!message.is_empty()).then_some(ReportEntry::Text(message))
        }
        PartType::Binary => Some(ReportEntry::Binary {
            message: sections([
                headers,
                Some(format!("{BODY_PART_TAG}{LINE_DELIMITER}{}", part.mime_type)),
            ]),
            attachment: Attachment::new(part.mime_type.clone(), part.binary_payload()?),
        }),
    };
    Ok(entry)
}

/// `tag\nline\nline`, or `None` when no line survived conversion.
fn tagged_block(tag: &str, lines: impl Iterator<Item = String>) -> Option<String> {
    let lines: Vec<String> = lines.filter(|line| !line.is_empty()).collect();
    if lines.is_empty() {
        return None;
    }
    Some(format!("{tag}{LINE_DELIMITER}{}", lines.join(LINE_DELIMITER)))
}

/// A tagged fenced code block; an empty body produces no block at all.
fn fenced(tag: &str, text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    Some(format!(
        "{tag}{LINE_DELIMITER}{CODE_FENCE}{LINE_DELIMITER}{text}{LINE_DELIMITER}{CODE_FENCE}"
    ))
}

fn sections<const N: usize>(blocks: [Option<String>; N]) -> String {
    blocks
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(SECTION_DELIMITER)
}

fn prettify(prettifiers: &Prettifiers, mime_type: &str, text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    match prettifiers.get(mime_type) {
        Some(prettifier) => prettifier(text),
        None => text.to_string(),
    }
}
