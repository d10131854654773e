use std::path::PathBuf;

use crate::types::{BodyType, PartType};

/// Contract violations between the entity builders and the renderer.
///
/// These signal a programming error (asking a `TEXT` entity for its bytes,
/// for instance) and are never recovered from inside the formatting call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityError {
    /// A body accessor was called for a classification the body does not have.
    #[error("cannot return {requested} body for body type: {actual}")]
    InvalidBodyType {
        /// The classification the accessor serves.
        requested: BodyType,
        /// The classification the entity was built with.
        actual: BodyType,
    },
    /// A part payload accessor was called for the wrong part type.
    #[error("cannot return {requested} payload for part type: {actual}")]
    InvalidPartType {
        /// The part type the accessor serves.
        requested: PartType,
        /// The part type the part was built with.
        actual: PartType,
    },
}

/// Failure to materialize one multipart part.
///
/// Isolated to the part it belongs to: the rest of the entity is still built
/// and rendered.
#[derive(Debug, thiserror::Error)]
pub enum PartError {
    /// A file-backed part could not be read into memory.
    #[error("Unable to read file: {}: {source}", path.display())]
    FileRead {
        /// The file the part refers to.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
