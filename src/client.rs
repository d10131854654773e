//! The HTTP client's view of a request and a response.
//!
//! These are the objects the hosting client hands to the filter. They are
//! plain data with owned fields; the entity builders snapshot them, so the
//! client may keep mutating its own copy afterwards.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{Cookie, Header, Param};

/// A body as the client holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    /// Already decoded text.
    Text(String),
    /// Raw bytes, decoded with the declared charset when rendered as text.
    Bytes(Vec<u8>),
}

impl Payload {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.into_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// Content of one multipart part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartContent {
    Text(String),
    Bytes(Vec<u8>),
    /// A file reference; read fully into memory when the entity is built.
    File(PathBuf),
}

/// One multipart section of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiPartSpec {
    pub control_name: Option<String>,
    pub mime_type: Option<String>,
    pub charset: Option<String>,
    pub file_name: Option<String>,
    pub headers: Vec<Header>,
    pub content: Option<PartContent>,
}

impl MultiPartSpec {
    pub fn new(content: PartContent) -> Self {
        Self {
            content: Some(content),
            ..Self::default()
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_control_name(mut self, name: impl Into<String>) -> Self {
        self.control_name = Some(name.into());
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }
}

/// A request about to be sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterableRequest {
    pub method: String,
    pub uri: String,
    pub content_type: Option<String>,
    pub headers: Vec<Header>,
    pub cookies: Vec<Cookie>,
    pub body: Option<Payload>,
    pub form_params: Vec<Param>,
    pub multipart: Option<Vec<MultiPartSpec>>,
    /// Header names the client's own log configuration hides.
    pub blacklisted_headers: BTreeSet<String>,
}

impl FilterableRequest {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            ..Self::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    pub fn with_body(mut self, body: impl Into<Payload>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_form_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_params.push(Param::new(name, value));
        self
    }

    pub fn with_part(mut self, part: MultiPartSpec) -> Self {
        self.multipart.get_or_insert_with(Vec::new).push(part);
        self
    }

    pub fn with_blacklisted_header(mut self, name: impl Into<String>) -> Self {
        self.blacklisted_headers.insert(name.into());
        self
    }
}

/// A response as returned by the rest of the filter chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientResponse {
    pub status_code: u16,
    /// Full status line, e.g. `HTTP/1.1 201`.
    pub status_line: String,
    pub content_type: Option<String>,
    pub headers: Vec<Header>,
    pub cookies: Vec<Cookie>,
    pub body: Option<Vec<u8>>,
    /// Parts, when the client has already decoded a multipart body.
    pub multipart: Option<Vec<MultiPartSpec>>,
}

impl ClientResponse {
    pub fn new(status_code: u16, status_line: impl Into<String>) -> Self {
        Self {
            status_code,
            status_line: status_line.into(),
            ..Self::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_part(mut self, part: MultiPartSpec) -> Self {
        self.multipart.get_or_insert_with(Vec::new).push(part);
        self
    }
}
