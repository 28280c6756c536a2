//! Error types for dxfcore

use std::io;
use thiserror::Error;

/// Main error type for dxfcore operations
#[derive(Debug, Error)]
pub enum DxfError {
    /// IO error occurred during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Unreadable signature or charset, fatal to the whole decode
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Malformed tag syntax
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Syntactically valid but structurally invalid entity, table or section
    #[error("Structure error: {0}")]
    Structure(String),

    /// Handle or name resolution failure
    #[error("Reference error: {0}")]
    Reference(String),

    /// No live entity is registered for the handle
    #[error("Handle not found: {0}")]
    HandleNotFound(String),

    /// Lookup of a nonexistent table entry, block or layout
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Name already used in a table
    #[error("Duplicate entry '{name}' in {table} table")]
    DuplicateEntry { table: String, name: String },

    /// Attribute name not defined by the entity schema
    #[error("Unknown attribute '{attrib}' for {dxftype}")]
    UnknownAttribute { dxftype: String, attrib: String },

    /// Attribute or tag value of the wrong kind
    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },

    /// Handle string that is not a hex number, or the reserved "0"
    #[error("Invalid handle: {0:?}")]
    InvalidHandle(String),

    /// Operation refused by a document invariant
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Generic error with custom message
    #[error("{0}")]
    Custom(String),
}

impl DxfError {
    /// Build a parse error for the given line number
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        DxfError::Parse {
            line,
            message: message.into(),
        }
    }

    /// Structure and reference errors are logged instead of raised in
    /// failsafe mode.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DxfError::Structure(_) | DxfError::Reference(_))
    }

    /// Lookup failures surfaced directly to the caller
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            DxfError::HandleNotFound(_)
                | DxfError::KeyNotFound(_)
                | DxfError::UnknownAttribute { .. }
                | DxfError::DuplicateEntry { .. }
        )
    }
}

/// Result type alias for dxfcore operations
pub type Result<T> = std::result::Result<T, DxfError>;

impl From<String> for DxfError {
    fn from(s: String) -> Self {
        DxfError::Custom(s)
    }
}

impl From<&str> for DxfError {
    fn from(s: &str) -> Self {
        DxfError::Custom(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = DxfError::parse(17, "invalid group code 'abc'");
        assert_eq!(
            err.to_string(),
            "Parse error at line 17: invalid group code 'abc'"
        );
    }

    #[test]
    fn test_recoverable_classes() {
        assert!(DxfError::Structure("x".into()).is_recoverable());
        assert!(DxfError::Reference("x".into()).is_recoverable());
        assert!(!DxfError::Encoding("x".into()).is_recoverable());
        assert!(!DxfError::parse(1, "x").is_recoverable());
    }

    #[test]
    fn test_key_error_class() {
        let err = DxfError::DuplicateEntry {
            table: "LAYER".into(),
            name: "Walls".into(),
        };
        assert!(err.is_key_error());
        assert_eq!(err.to_string(), "Duplicate entry 'Walls' in LAYER table");
        assert!(DxfError::KeyNotFound("A".into()).is_key_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let dxf_err: DxfError = io_err.into();
        assert!(matches!(dxf_err, DxfError::Io(_)));
    }
}
