//! Document loading: text access plus the XML readers.

pub mod xml;

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::MapError;

/// Source of document text.
///
/// Maps pull in external tilesets and templates by relative path; loading
/// goes through this trait so tests and asset pipelines can supply
/// documents from memory.
pub trait TextLoader {
    /// Read the entire document at `path`.
    fn load_text(&self, path: &Path) -> Result<String, MapError>;
}

/// [`TextLoader`] backed by the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl TextLoader for FsLoader {
    fn load_text(&self, path: &Path) -> Result<String, MapError> {
        fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Join a document-relative reference onto the referencing file's directory
/// and normalise `.`/`..` lexically, so the same target always produces the
/// same cache key.
pub(crate) fn resolve_relative(base_file: &Path, reference: &str) -> PathBuf {
    let joined = match base_file.parent() {
        Some(dir) => dir.join(reference),
        None => PathBuf::from(reference),
    };
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    normalized.pop();
                } else {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
