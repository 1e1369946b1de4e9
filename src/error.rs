use std::fmt;
use std::io;
use std::path::PathBuf;

/// Error type for TMX/TSX/TX decoding and resolution.
#[derive(Debug)]
pub enum MapError {
    /// File could not be read
    Io {
        /// Path that failed to load
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },
    /// Document is not well-formed XML
    Xml {
        /// Path of the offending document
        path: PathBuf,
        /// Underlying XML error
        source: roxmltree::Error,
    },
    /// An element or attribute this decoder does not recognise (strict mode only)
    Schema {
        /// Element the violation was found on
        node: String,
        /// What was unrecognised or missing
        detail: String,
    },
    /// A recognised attribute or token carried an unparseable value
    Parse {
        /// Element or payload the value came from
        node: String,
        /// What failed to parse
        detail: String,
    },
    /// Decoded layer data does not cover width * height cells
    LengthMismatch {
        /// Layer the data belongs to
        layer: String,
        /// Cells (or bytes) expected
        expected: usize,
        /// Cells (or bytes) found
        actual: usize,
    },
    /// A plain-encoded cell is missing its gid
    MalformedCell {
        /// Layer the cell belongs to
        layer: String,
        /// Cell index within the payload
        index: usize,
    },
    /// Layer payload is not valid base64
    Base64 {
        /// Layer the payload belongs to
        layer: String,
        /// Underlying decode error
        source: base64::DecodeError,
    },
    /// Compressed layer payload could not be inflated
    Decompress {
        /// Layer the payload belongs to
        layer: String,
        /// Underlying inflate error
        source: io::Error,
    },
    /// A tileset-relative id has no matching tile entry
    UnknownLocalId {
        /// GID after flag stripping
        gid: u32,
        /// First GID of the owning tileset
        first_gid: u32,
        /// Name of the owning tileset
        tileset: String,
    },
    /// A template's base object references another template
    NestedTemplate {
        /// Template file that contains the nested reference
        path: PathBuf,
    },
    /// The map's infinite flag disagrees with a layer's data shape
    InfiniteMismatch {
        /// Layer with the wrong data shape
        layer: String,
        /// Infinite flag declared by the map
        infinite: bool,
    },
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            MapError::Xml { path, source } => {
                write!(f, "invalid XML in {}: {}", path.display(), source)
            }
            MapError::Schema { node, detail } => {
                write!(f, "schema violation on <{}>: {}", node, detail)
            }
            MapError::Parse { node, detail } => {
                write!(f, "could not parse <{}>: {}", node, detail)
            }
            MapError::LengthMismatch {
                layer,
                expected,
                actual,
            } => write!(
                f,
                "layer '{}' data length {} does not match expected {}",
                layer, actual, expected
            ),
            MapError::MalformedCell { layer, index } => write!(
                f,
                "layer '{}' has a malformed cell at index {}",
                layer, index
            ),
            MapError::Base64 { layer, source } => {
                write!(f, "layer '{}' payload is not valid base64: {}", layer, source)
            }
            MapError::Decompress { layer, source } => {
                write!(f, "layer '{}' payload failed to decompress: {}", layer, source)
            }
            MapError::UnknownLocalId {
                gid,
                first_gid,
                tileset,
            } => write!(
                f,
                "gid {} (local id {}) has no tile entry in tileset '{}'",
                gid,
                gid - first_gid,
                tileset
            ),
            MapError::NestedTemplate { path } => write!(
                f,
                "template {} references another template; only one level of nesting is supported",
                path.display()
            ),
            MapError::InfiniteMismatch { layer, infinite } => write!(
                f,
                "layer '{}' data shape does not match map infinite={}",
                layer, infinite
            ),
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapError::Io { source, .. } | MapError::Decompress { source, .. } => Some(source),
            MapError::Xml { source, .. } => Some(source),
            MapError::Base64 { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// How document irregularities are handled during an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Every unrecognised attribute/element and every bad node aborts the import
    Strict,
    /// Irregular nodes are skipped and recorded as diagnostics
    #[default]
    Lenient,
}

impl ParseMode {
    /// True in strict/validation mode.
    pub fn is_strict(self) -> bool {
        matches!(self, ParseMode::Strict)
    }
}

/// A non-fatal irregularity recorded during a lenient import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Element the irregularity was found on
    pub node: String,
    /// Human-readable description
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>: {}", self.node, self.message)
    }
}
