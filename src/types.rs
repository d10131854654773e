use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder that replaces redacted values (Markdown-safe `<removed>`).
pub const REMOVED_TAG: &str = "&lt;removed&gt;";

// ---------------------------------------------------------------------------
// BodyType
// ---------------------------------------------------------------------------

/// Classification of an HTTP body, derived from its MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BodyType {
    /// No body was captured.
    None,
    /// Human-readable text, rendered in a fenced code block.
    Text,
    /// Opaque bytes, reported as an attachment.
    Binary,
    /// `application/x-www-form-urlencoded` parameters.
    Form,
    /// A multipart body, rendered part by part.
    Multipart,
}

impl BodyType {
    /// Return the classification as a static string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Text => "TEXT",
            Self::Binary => "BINARY",
            Self::Form => "FORM",
            Self::Multipart => "MULTIPART",
        }
    }
}

impl fmt::Display for BodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PartType
// ---------------------------------------------------------------------------

/// Classification of one multipart part. File parts are read at build time
/// and land in one of these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartType {
    Text,
    Binary,
}

impl PartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Binary => "BINARY",
        }
    }
}

impl fmt::Display for PartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// A single HTTP header field as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header field name (original casing preserved).
    pub name: String,
    /// Raw header value.
    pub value: String,
}

impl Header {
    /// `name` must be non-empty; the client never produces nameless headers.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        debug_assert!(!name.is_empty(), "header name must not be empty");
        Self {
            name,
            value: value.into(),
        }
    }

    /// A copy of this header with its value replaced by [`REMOVED_TAG`].
    pub fn redacted(&self) -> Self {
        Self {
            name: self.name.clone(),
            value: REMOVED_TAG.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Cookie
// ---------------------------------------------------------------------------

/// An HTTP cookie with every attribute optional except its name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Cookie {
    pub name: String,
    pub value: Option<String>,
    pub comment: Option<String>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub max_age: Option<i64>,
    pub secure: Option<bool>,
    pub http_only: Option<bool>,
    pub expires: Option<DateTime<Utc>>,
    pub version: Option<i32>,
    pub same_site: Option<String>,
}

impl Cookie {
    /// `name` must be non-empty; every other attribute starts unset.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        debug_assert!(!name.is_empty(), "cookie name must not be empty");
        Self {
            name,
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = Some(http_only);
        self
    }

    pub fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_same_site(mut self, same_site: impl Into<String>) -> Self {
        self.same_site = Some(same_site.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Param
// ---------------------------------------------------------------------------

/// One form parameter. Order of parameters is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: String,
}

impl Param {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacted_header_is_a_new_value() {
        let header = Header::new("Authorization", "Bearer token");
        let redacted = header.redacted();
        assert_eq!(redacted.name, "Authorization");
        assert_eq!(redacted.value, REMOVED_TAG);
        assert_eq!(header.value, "Bearer token");
    }

    #[test]
    fn cookie_builder_sets_only_given_attributes() {
        let cookie = Cookie::new("test").with_domain("example.com").with_version(1);
        assert_eq!(cookie.name, "test");
        assert_eq!(cookie.domain.as_deref(), Some("example.com"));
        assert_eq!(cookie.version, Some(1));
        assert!(cookie.value.is_none());
        assert!(cookie.expires.is_none());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "header name must not be empty")]
    fn nameless_header_is_rejected() {
        let _ = Header::new("", "value");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "cookie name must not be empty")]
    fn nameless_cookie_is_rejected() {
        let _ = Cookie::new("");
    }

    #[test]
    fn body_type_display_is_upper_case() {
        assert_eq!(BodyType::Multipart.to_string(), "MULTIPART");
        assert_eq!(PartType::Binary.to_string(), "BINARY");
    }
}
