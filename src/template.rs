//! Object templates: loading, per-import caching and merge application.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::MapError;
use crate::loader::xml::{parse_template_with, Sink};
use crate::loader::{resolve_relative, TextLoader};
use crate::model::{Object, Template};
use crate::registry::TilesetRegistry;

/// A template document prepared for merging: the parsed template plus a
/// registry for its own tileset reference, if it carries one.
#[derive(Debug)]
pub struct LoadedTemplate {
    /// The parsed template document
    pub template: Template,
    /// Registry resolving the template object's gid
    pub tileset: Option<Arc<TilesetRegistry>>,
}

/// Template cache for one import, keyed by the resolved template path.
///
/// Many objects typically share a few templates; each file is read and
/// parsed once per import no matter how it is spelled in references.
#[derive(Debug, Default)]
pub(crate) struct TemplateCache {
    loaded: HashMap<PathBuf, Arc<LoadedTemplate>>,
}

impl TemplateCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Load the template `reference` names, relative to `base_file`, or
    /// return the cached copy.
    ///
    /// Templates cannot chain: a base object that itself names a template
    /// is rejected outright.
    pub(crate) fn load(
        &mut self,
        base_file: &Path,
        reference: &str,
        cell_size: (u32, u32),
        loader: &dyn TextLoader,
        sink: &mut Sink,
    ) -> Result<Arc<LoadedTemplate>, MapError> {
        let path = resolve_relative(base_file, reference);
        if let Some(hit) = self.loaded.get(&path) {
            return Ok(Arc::clone(hit));
        }

        let text = loader.load_text(&path)?;
        let template = parse_template_with(&text, &path, sink)?;
        if template.object.template.is_some() {
            return Err(MapError::NestedTemplate { path });
        }
        let tileset = match &template.tileset {
            Some(reference) => Some(Arc::new(TilesetRegistry::build(
                std::slice::from_ref(reference),
                &path,
                cell_size.0,
                cell_size.1,
                loader,
                sink,
            )?)),
            None => None,
        };

        let loaded = Arc::new(LoadedTemplate { template, tileset });
        self.loaded.insert(path, Arc::clone(&loaded));
        Ok(loaded)
    }
}

/// Merge `instance` over its loaded template and fill defaults.
///
/// Returns the merged object and, when the instance's gid comes from the
/// template rather than the instance itself, the template's own tileset
/// registry that the gid must be resolved against.
pub fn apply(template: &LoadedTemplate, instance: &Object) -> (Object, Option<Arc<TilesetRegistry>>) {
    let replacement = if instance.gid.is_none() {
        template.tileset.clone()
    } else {
        None
    };
    let mut merged = instance.merged_over(&template.template.object);
    merged.fill_defaults();
    (merged, replacement)
}
