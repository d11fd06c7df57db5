//! Error types for the board, its segments and their elements.

use thiserror::Error;

/// Broad class of a [`BoardError`].
///
/// Validation errors describe bad input from the immediate caller. Conflict
/// errors describe a request that clashes with current state. Configuration
/// errors signal a misconfigured topology rather than a data problem and must
/// be propagated, never swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Configuration,
}

/// Errors that can occur while admitting, updating or releasing records.
#[derive(Debug, Error)]
pub enum BoardError {
    /// A timestamp was neither omitted nor a valid date-like value.
    #[error("Invalid timestamp: {value}")]
    InvalidTimestamp { value: String },

    /// An attribute name that was not declared when the record was built.
    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    /// Malformed input object or declaration.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Empty record identifier.
    #[error("Invalid record id: {0:?}")]
    InvalidId(String),

    /// An acceptance pattern failed to compile.
    #[error("Invalid acceptance pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// `unpair` called on an element that holds no record.
    #[error("Element {element} has nothing to unpair")]
    NothingToUnpair { element: String },

    /// Render format unknown or not supported by the element.
    #[error("Unsupported render format: {format}")]
    UnsupportedFormat { format: String },

    /// No segment owns a record with this id.
    #[error("Record not found: {id}")]
    UnknownRecord { id: String },

    /// A record with this id is already owned.
    #[error("Duplicate record id: {id}")]
    DuplicateId { id: String },

    /// The owning segment failed to release a record it reported owning.
    #[error("Failed to remove record {id} from segment '{group}'")]
    AssetRemovalFailed { id: String, group: String },

    /// No segment accepted the record.
    #[error("No segment accepted record {id} of kind '{kind}'")]
    NoGroupAccepted { id: String, kind: String },

    /// The factory has no constructor registered under this tag.
    #[error("No such view type: {view_type}")]
    NoSuchViewType { view_type: String },

    /// A manufactured element refused the record it was built for.
    #[error("View type '{view_type}' does not accept records of kind '{kind}'")]
    TypeNotAccepted { view_type: String, kind: String },

    /// A view type tag was registered twice.
    #[error("View type already registered: {view_type}")]
    DuplicateViewType { view_type: String },

    /// A segment boundary was configured without a containment predicate.
    #[error("Segment '{group}' has a boundary but no geometry predicate was supplied")]
    MissingGeometry { group: String },

    /// YAML parsing failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BoardError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BoardError::InvalidTimestamp { .. }
            | BoardError::UnknownAttribute { .. }
            | BoardError::InvalidInput(_)
            | BoardError::InvalidId(_)
            | BoardError::InvalidPattern { .. }
            | BoardError::NothingToUnpair { .. }
            | BoardError::UnsupportedFormat { .. }
            | BoardError::UnknownRecord { .. } => ErrorKind::Validation,
            BoardError::DuplicateId { .. } | BoardError::AssetRemovalFailed { .. } => {
                ErrorKind::Conflict
            }
            BoardError::NoGroupAccepted { .. }
            | BoardError::NoSuchViewType { .. }
            | BoardError::TypeNotAccepted { .. }
            | BoardError::DuplicateViewType { .. }
            | BoardError::MissingGeometry { .. }
            | BoardError::Yaml(_)
            | BoardError::Json(_)
            | BoardError::Io(_) => ErrorKind::Configuration,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BoardError>;
