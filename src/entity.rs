//! Immutable request / response snapshots ready for rendering.
//!
//! # Design
//! The builders copy everything they need out of the client objects at call
//! time, classify the body once, and fix the payload type to match the
//! classification. Nothing here ever fails for malformed input: unknown
//! content types become binary, unreadable file parts become per-part errors.

use std::fmt;
use std::fs;

use encoding_rs::{Encoding, UTF_8};
use tracing::{debug, warn};

use crate::client::{ClientResponse, FilterableRequest, MultiPartSpec, PartContent, Payload};
use crate::converters::Converters;
use crate::error::{EntityError, PartError};
use crate::mime::{self, ClassificationSets};
use crate::prettify::Prettifiers;
use crate::types::{BodyType, Cookie, Header, Param, PartType};

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

/// A classified body together with the payload its classification implies.
#[derive(Debug)]
pub enum Body {
    None,
    Text { mime_type: String, text: String },
    Binary { mime_type: String, data: Vec<u8> },
    Form(Vec<Param>),
    /// Parts in declaration order; a part that could not be read is kept as
    /// its error so it can be reported in place.
    Multipart(Vec<Result<Part, PartError>>),
}

impl Body {
    pub fn body_type(&self) -> BodyType {
        match self {
            Self::None => BodyType::None,
            Self::Text { .. } => BodyType::Text,
            Self::Binary { .. } => BodyType::Binary,
            Self::Form(_) => BodyType::Form,
            Self::Multipart(_) => BodyType::Multipart,
        }
    }

    /// The MIME type of a text or binary body.
    pub fn mime_type(&self) -> Option<&str> {
        match self {
            Self::Text { mime_type, .. } | Self::Binary { mime_type, .. } => Some(mime_type),
            _ => None,
        }
    }

    pub fn text(&self) -> Result<&str, EntityError> {
        match self {
            Self::Text { text, .. } => Ok(text),
            _ => Err(self.wrong_type(BodyType::Text)),
        }
    }

    pub fn bytes(&self) -> Result<&[u8], EntityError> {
        match self {
            Self::Binary { data, .. } => Ok(data),
            _ => Err(self.wrong_type(BodyType::Binary)),
        }
    }

    pub fn params(&self) -> Result<&[Param], EntityError> {
        match self {
            Self::Form(params) => Ok(params),
            _ => Err(self.wrong_type(BodyType::Form)),
        }
    }

    pub fn parts(&self) -> Result<&[Result<Part, PartError>], EntityError> {
        match self {
            Self::Multipart(parts) => Ok(parts),
            _ => Err(self.wrong_type(BodyType::Multipart)),
        }
    }

    fn wrong_type(&self, requested: BodyType) -> EntityError {
        EntityError::InvalidBodyType {
            requested,
            actual: self.body_type(),
        }
    }
}

// ---------------------------------------------------------------------------
// Part
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartPayload {
    Text(String),
    Binary(Vec<u8>),
}

/// One materialized multipart section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub mime_type: String,
    pub control_name: Option<String>,
    pub charset: Option<String>,
    pub file_name: Option<String>,
    pub headers: Vec<Header>,
    pub payload: PartPayload,
}

impl Part {
    pub fn part_type(&self) -> PartType {
        match self.payload {
            PartPayload::Text(_) => PartType::Text,
            PartPayload::Binary(_) => PartType::Binary,
        }
    }

    pub fn text_payload(&self) -> Result<&str, EntityError> {
        match &self.payload {
            PartPayload::Text(text) => Ok(text),
            PartPayload::Binary(_) => Err(EntityError::InvalidPartType {
                requested: PartType::Text,
                actual: PartType::Binary,
            }),
        }
    }

    pub fn binary_payload(&self) -> Result<&[u8], EntityError> {
        match &self.payload {
            PartPayload::Binary(data) => Ok(data),
            PartPayload::Text(_) => Err(EntityError::InvalidPartType {
                requested: PartType::Binary,
                actual: PartType::Text,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Headers, cookies and body shared by requests and responses, plus the
/// converters and prettifiers they are rendered with.
pub struct EntityContent {
    pub headers: Vec<Header>,
    pub cookies: Vec<Cookie>,
    pub body: Body,
    pub converters: Converters,
    pub prettifiers: Prettifiers,
}

#[derive(Debug)]
pub struct RequestEntity {
    pub method: String,
    pub uri: String,
    pub content: EntityContent,
}

#[derive(Debug)]
pub struct ResponseEntity {
    pub status_code: u16,
    pub status_line: String,
    pub content: EntityContent,
}

impl RequestEntity {
    pub fn body(&self) -> &Body {
        &self.content.body
    }

    pub fn body_type(&self) -> BodyType {
        self.content.body.body_type()
    }
}

impl ResponseEntity {
    pub fn body(&self) -> &Body {
        &self.content.body
    }

    pub fn body_type(&self) -> BodyType {
        self.content.body.body_type()
    }
}

impl fmt::Debug for EntityContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityContent")
            .field("headers", &self.headers)
            .field("cookies", &self.cookies)
            .field("body", &self.body)
            .field("prettifiers", &self.prettifiers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Snapshot a client request into a [`RequestEntity`].
pub fn build_request(
    request: &FilterableRequest,
    converters: &Converters,
    prettifiers: &Prettifiers,
    sets: &ClassificationSets,
) -> RequestEntity {
    let content_type = request.content_type.as_deref();
    let (mime_type, body_type) = sets.classify(content_type);
    let charset = mime::charset(content_type);

    let body = match body_type {
        BodyType::Multipart => match request.multipart.as_deref() {
            Some(parts) if !parts.is_empty() => {
                Body::Multipart(parts.iter().map(|part| build_part(part, sets)).collect())
            }
            _ => Body::None,
        },
        BodyType::Form if !request.form_params.is_empty() => Body::Form(request.form_params.clone()),
        BodyType::Text | BodyType::Form => match &request.body {
            Some(payload) => Body::Text {
                text: payload_text(payload, charset.as_deref()),
                mime_type,
            },
            None => Body::None,
        },
        BodyType::Binary => match &request.body {
            Some(payload) => Body::Binary {
                data: payload.clone().into_bytes(),
                mime_type,
            },
            None => Body::None,
        },
        BodyType::None => Body::None,
    };

    RequestEntity {
        method: request.method.clone(),
        uri: request.uri.clone(),
        content: EntityContent {
            headers: request.headers.clone(),
            cookies: request.cookies.clone(),
            body,
            converters: converters.clone(),
            prettifiers: prettifiers.clone(),
        },
    }
}

/// Snapshot a client response into a [`ResponseEntity`].
pub fn build_response(
    response: &ClientResponse,
    converters: &Converters,
    prettifiers: &Prettifiers,
    sets: &ClassificationSets,
) -> ResponseEntity {
    let content_type = response.content_type.as_deref();
    let (mime_type, body_type) = sets.classify(content_type);
    let charset = mime::charset(content_type);

    let parts = response.multipart.as_deref().unwrap_or_default();
    let body = match (body_type, &response.body) {
        (BodyType::Multipart, _) if !parts.is_empty() => {
            Body::Multipart(parts.iter().map(|part| build_part(part, sets)).collect())
        }
        (_, None) => Body::None,
        (BodyType::Text | BodyType::Form, Some(data)) => Body::Text {
            text: decode(data, charset.as_deref()),
            mime_type,
        },
        (_, Some(data)) => Body::Binary {
            data: data.clone(),
            mime_type,
        },
    };

    ResponseEntity {
        status_code: response.status_code,
        status_line: response.status_line.clone(),
        content: EntityContent {
            headers: response.headers.clone(),
            cookies: response.cookies.clone(),
            body,
            converters: converters.clone(),
            prettifiers: prettifiers.clone(),
        },
    }
}

/// Materialize one part. A part without a MIME type is treated as
/// `application/octet-stream`.
fn build_part(declared: &MultiPartSpec, sets: &ClassificationSets) -> Result<Part, PartError> {
    let mime_type = mime::mime_type(declared.mime_type.as_deref());
    let charset = declared
        .charset
        .clone()
        .or_else(|| mime::charset(declared.mime_type.as_deref()));

    let raw = match &declared.content {
        Some(PartContent::Text(text)) => Payload::Text(text.clone()),
        Some(PartContent::Bytes(bytes)) => Payload::Bytes(bytes.clone()),
        Some(PartContent::File(path)) => match fs::read(path) {
            Ok(bytes) => Payload::Bytes(bytes),
            Err(source) => {
                warn!(path = %path.display(), error = %source, "multipart file part could not be read");
                return Err(PartError::FileRead {
                    path: path.clone(),
                    source,
                });
            }
        },
        None => Payload::Bytes(Vec::new()),
    };

    let payload = match sets.part_type(&mime_type) {
        PartType::Text => PartPayload::Text(payload_text(&raw, charset.as_deref())),
        PartType::Binary => PartPayload::Binary(raw.into_bytes()),
    };

    Ok(Part {
        mime_type,
        control_name: declared.control_name.clone(),
        charset,
        file_name: declared.file_name.clone(),
        headers: declared.headers.clone(),
        payload,
    })
}

fn payload_text(payload: &Payload, charset: Option<&str>) -> String {
    match payload {
        Payload::Text(text) => text.clone(),
        Payload::Bytes(bytes) => decode(bytes, charset),
    }
}

/// Decode bytes with a declared charset. Labels follow the WHATWG encoding
/// names; an absent or unknown label decodes as UTF-8, lossily.
fn decode(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = charset
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .unwrap_or(UTF_8);
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        debug!(charset = encoding.name(), "body contained malformed sequences");
    }
    text.into_owned()
}
