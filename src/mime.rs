//! Content-type normalization and body classification.

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

use crate::types::{BodyType, PartType};

/// MIME type used when a content type is absent or empty.
pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";

const DEFAULT_TEXT_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/soap+xml",
    "application/atom+xml",
    "application/xhtml+xml",
    "application/javascript",
    "application/graphql",
    "text/plain",
    "text/html",
    "text/xml",
    "text/css",
    "text/csv",
    "text/javascript",
];

const DEFAULT_MULTIPART_TYPES: &[&str] = &[
    "multipart/form-data",
    "multipart/mixed",
    "multipart/alternative",
    "multipart/related",
    "multipart/digest",
    "multipart/parallel",
];

const DEFAULT_FORM_TYPES: &[&str] = &["application/x-www-form-urlencoded"];

static DEFAULT_SETS: LazyLock<ClassificationSets> = LazyLock::new(|| ClassificationSets {
    text: Arc::new(to_set(DEFAULT_TEXT_TYPES)),
    multipart: Arc::new(to_set(DEFAULT_MULTIPART_TYPES)),
    form: Arc::new(to_set(DEFAULT_FORM_TYPES)),
});

fn to_set(types: &[&str]) -> BTreeSet<String> {
    types.iter().map(|t| (*t).to_string()).collect()
}

/// Sets of MIME types that drive [`BodyType`] classification.
///
/// Cloning is cheap: the sets are shared behind `Arc`s, so every filter that
/// keeps the defaults points at the same process-wide data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationSets {
    text: Arc<BTreeSet<String>>,
    multipart: Arc<BTreeSet<String>>,
    form: Arc<BTreeSet<String>>,
}

impl Default for ClassificationSets {
    fn default() -> Self {
        DEFAULT_SETS.clone()
    }
}

impl ClassificationSets {
    /// Replace the set of MIME types rendered as text.
    pub fn with_text_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.text = Arc::new(normalize_all(types));
        self
    }

    /// Replace the set of MIME types walked part by part.
    pub fn with_multipart_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.multipart = Arc::new(normalize_all(types));
        self
    }

    /// Replace the set of form-encoded MIME types.
    pub fn with_form_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.form = Arc::new(normalize_all(types));
        self
    }

    pub fn text_types(&self) -> &BTreeSet<String> {
        &self.text
    }

    pub fn multipart_types(&self) -> &BTreeSet<String> {
        &self.multipart
    }

    pub fn form_types(&self) -> &BTreeSet<String> {
        &self.form
    }

    /// Classify an already normalized MIME type.
    ///
    /// Anything that is neither text, multipart nor form is binary; absence
    /// of a body is decided by the caller.
    pub fn body_type(&self, mime_type: &str) -> BodyType {
        if self.text.contains(mime_type) {
            BodyType::Text
        } else if self.multipart.contains(mime_type) {
            BodyType::Multipart
        } else if self.form.contains(mime_type) {
            BodyType::Form
        } else {
            BodyType::Binary
        }
    }

    /// Classify a multipart part: only text types stay text.
    pub fn part_type(&self, mime_type: &str) -> PartType {
        if self.text.contains(mime_type) {
            PartType::Text
        } else {
            PartType::Binary
        }
    }

    /// Normalize a raw content-type header and classify it.
    pub fn classify(&self, content_type: Option<&str>) -> (String, BodyType) {
        let mime = mime_type(content_type);
        let body_type = self.body_type(&mime);
        (mime, body_type)
    }
}

fn normalize_all<I, S>(types: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    types
        .into_iter()
        .map(|t| mime_type(Some(t.as_ref())))
        .collect()
}

/// Reduce a content-type header value to its base MIME type.
///
/// Parameters after the first `;` are dropped and ASCII letters are
/// lower-cased. Values that do not look like `type/subtype` are passed
/// through otherwise unchanged; only an absent or blank value falls back to
/// [`APPLICATION_OCTET_STREAM`].
pub fn mime_type(content_type: Option<&str>) -> String {
    let base = content_type
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .unwrap_or_default();
    if base.is_empty() {
        APPLICATION_OCTET_STREAM.to_string()
    } else {
        base.to_ascii_lowercase()
    }
}

/// Extract the `charset` parameter of a content-type header, if any.
pub fn charset(content_type: Option<&str>) -> Option<String> {
    content_type?
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}
