//! Map import: parse, resolve tilesets, decode layers, merge templates.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::data::{decode_layer, DecodedData};
use crate::error::{Diagnostic, MapError, ParseMode};
use crate::gid::Gid;
use crate::loader::xml::{parse_map_with, Sink};
use crate::loader::{FsLoader, TextLoader};
use crate::model::{
    DrawOrder, Map, Object, Orientation, Properties, RenderOrder,
};
use crate::registry::TilesetRegistry;
use crate::template::{self, TemplateCache};

/// Callback invoked with the custom properties of each imported node.
///
/// Handlers run in registration order, once per map, layer, object group
/// and object, after the node is fully resolved. A node without declared
/// properties is reported with an empty list.
pub trait PropertyHandler {
    /// React to one node's properties.
    fn apply(&self, node: &ImportNode<'_>, properties: &Properties);
}

/// The node a [`PropertyHandler`] is being invoked for.
#[derive(Debug)]
pub enum ImportNode<'a> {
    /// The map itself, before resolution
    Map(&'a Map),
    /// A decoded tile layer
    Layer(&'a ResolvedLayer),
    /// A resolved object group
    ObjectGroup(&'a ResolvedGroup),
    /// A fully merged object
    Object(&'a ResolvedObject),
}

/// Knobs for one import.
#[derive(Clone, Copy, Default)]
pub struct ImportOptions<'h> {
    /// Strict fails on irregularities; lenient collects diagnostics
    pub mode: ParseMode,
    /// Property callbacks, invoked in order
    pub handlers: &'h [&'h dyn PropertyHandler],
}

/// The result of one import: the resolved map plus everything lenient
/// mode chose to tolerate.
#[derive(Debug)]
pub struct Import {
    /// The resolved map
    pub map: ResolvedMap,
    /// Irregularities recorded along the way; empty in strict mode
    pub diagnostics: Vec<Diagnostic>,
}

/// A map with tilesets loaded, layer data decoded and templates merged.
#[derive(Debug)]
pub struct ResolvedMap {
    /// Grid orientation
    pub orientation: Orientation,
    /// Tile draw order within a layer
    pub render_order: RenderOrder,
    /// Width in cells (meaningless when infinite)
    pub width: u32,
    /// Height in cells (meaningless when infinite)
    pub height: u32,
    /// Grid cell width in pixels
    pub tile_width: u32,
    /// Grid cell height in pixels
    pub tile_height: u32,
    /// Background colour as an HTML colour string
    pub background_color: Option<String>,
    /// Whether layers are chunked instead of bounded
    pub infinite: bool,
    /// The map's tileset registry
    pub registry: Arc<TilesetRegistry>,
    /// Decoded tile layers in draw order
    pub layers: Vec<ResolvedLayer>,
    /// Object groups in draw order
    pub object_groups: Vec<ResolvedGroup>,
    /// Map-level custom properties
    pub properties: Properties,
}

impl ResolvedMap {
    /// The registry a resolved object's gid must be looked up in: its
    /// template's own registry when one replaces the map's.
    pub fn object_registry<'a>(&'a self, object: &'a ResolvedObject) -> &'a TilesetRegistry {
        object.tileset.as_deref().unwrap_or(&self.registry)
    }
}

/// A tile layer with its cells decoded.
#[derive(Debug)]
pub struct ResolvedLayer {
    /// Layer name
    pub name: String,
    /// Whether the layer is shown
    pub visible: bool,
    /// Opacity in [0, 1]
    pub opacity: f32,
    /// Document position: layers sort below every object group
    pub sort_index: usize,
    /// Decoded cell data
    pub data: DecodedData,
    /// Layer-level custom properties
    pub properties: Properties,
}

/// An object group with its objects merged and defaulted.
#[derive(Debug)]
pub struct ResolvedGroup {
    /// Group name
    pub name: String,
    /// Tint colour for the group's objects
    pub color: Option<String>,
    /// Whether the group is shown
    pub visible: bool,
    /// Opacity in [0, 1]
    pub opacity: f32,
    /// Draw-order hint
    pub draw_order: DrawOrder,
    /// Document position, continuing after the last tile layer
    pub sort_index: usize,
    /// Objects in document order
    pub objects: Vec<ResolvedObject>,
    /// Group-level custom properties
    pub properties: Properties,
}

/// One object after template merging and default filling.
#[derive(Debug)]
pub struct ResolvedObject {
    /// The merged object; every defaulted field is `Some`
    pub object: Object,
    /// Template-supplied registry replacing the map's for this object's
    /// gid, when the gid was inherited
    pub tileset: Option<Arc<TilesetRegistry>>,
}

/// Import a map from the filesystem.
pub fn import_map(path: impl AsRef<Path>, options: &ImportOptions<'_>) -> Result<Import, MapError> {
    import_map_with(path.as_ref(), &FsLoader, options)
}

/// Import a map through a custom [`TextLoader`].
pub fn import_map_with(
    path: &Path,
    loader: &dyn TextLoader,
    options: &ImportOptions<'_>,
) -> Result<Import, MapError> {
    let text = loader.load_text(path)?;
    import_map_text(&text, path, loader, options)
}

/// Import a map from already-loaded text. `path` anchors every relative
/// tileset and template reference inside the document.
pub fn import_map_text(
    text: &str,
    path: &Path,
    loader: &dyn TextLoader,
    options: &ImportOptions<'_>,
) -> Result<Import, MapError> {
    let mut sink = Sink::new(options.mode);
    let map = parse_map_with(text, path, &mut sink)?;

    let registry = Arc::new(TilesetRegistry::build(
        &map.tilesets,
        path,
        map.tile_width,
        map.tile_height,
        loader,
        &mut sink,
    )?);

    for handler in options.handlers {
        handler.apply(&ImportNode::Map(&map), &map.properties);
    }

    let mut layers = Vec::with_capacity(map.layers.len());
    for (index, layer) in map.layers.iter().enumerate() {
        let mut decoded = match decode_layer(layer, map.infinite) {
            Ok(decoded) => decoded,
            Err(err) if !sink.is_strict() => {
                sink.note("layer", format!("dropped layer '{}': {}", layer.name, err));
                continue;
            }
            Err(err) => return Err(err),
        };
        validate_layer_gids(&layer.name, &mut decoded, &registry, &mut sink)?;

        let resolved = ResolvedLayer {
            name: layer.name.clone(),
            visible: layer.visible,
            opacity: layer.opacity,
            sort_index: index,
            data: decoded,
            properties: layer.properties.clone(),
        };
        for handler in options.handlers {
            handler.apply(&ImportNode::Layer(&resolved), &resolved.properties);
        }
        layers.push(resolved);
    }

    let no_properties = Properties::new();
    let mut templates = TemplateCache::new();
    let cell_size = (map.tile_width, map.tile_height);
    let mut groups = Vec::with_capacity(map.object_groups.len());
    for (index, group) in map.object_groups.iter().enumerate() {
        let mut objects = Vec::with_capacity(group.objects.len());
        for object in &group.objects {
            let (mut merged, replacement) = match &object.template {
                Some(reference) => {
                    let loaded =
                        match templates.load(path, reference, cell_size, loader, &mut sink) {
                            Ok(loaded) => loaded,
                            Err(err @ (MapError::Parse { .. } | MapError::Schema { .. }))
                                if !sink.is_strict() =>
                            {
                                sink.note("object", format!("dropped object: {err}"));
                                continue;
                            }
                            Err(err) => return Err(err),
                        };
                    template::apply(&loaded, object)
                }
                None => {
                    let mut copy = object.clone();
                    copy.fill_defaults();
                    (copy, None)
                }
            };

            let object_registry = replacement.as_deref().unwrap_or(&registry);
            if let Some(gid) = merged.gid.filter(|g| !g.is_empty()) {
                if !validate_gid(gid, object_registry, "object", &mut sink)? {
                    merged.gid = Some(Gid(0));
                }
            }

            let resolved = ResolvedObject {
                object: merged,
                tileset: replacement,
            };
            for handler in options.handlers {
                let properties = resolved.object.properties.as_ref().unwrap_or(&no_properties);
                handler.apply(&ImportNode::Object(&resolved), properties);
            }
            objects.push(resolved);
        }

        let resolved = ResolvedGroup {
            name: group.name.clone(),
            color: group.color.clone(),
            visible: group.visible,
            opacity: group.opacity,
            draw_order: group.draw_order,
            sort_index: map.layers.len() + index,
            objects,
            properties: group.properties.clone(),
        };
        for handler in options.handlers {
            handler.apply(&ImportNode::ObjectGroup(&resolved), &resolved.properties);
        }
        groups.push(resolved);
    }

    Ok(Import {
        map: ResolvedMap {
            orientation: map.orientation,
            render_order: map.render_order,
            width: map.width,
            height: map.height,
            tile_width: map.tile_width,
            tile_height: map.tile_height,
            background_color: map.background_color,
            infinite: map.infinite,
            registry,
            layers,
            object_groups: groups,
            properties: map.properties,
        },
        diagnostics: sink.diagnostics,
    })
}

/// Check one gid against a registry. Returns whether the gid is usable;
/// in lenient mode a bad gid becomes a diagnostic and `false`.
fn validate_gid(
    gid: Gid,
    registry: &TilesetRegistry,
    node: &str,
    sink: &mut Sink,
) -> Result<bool, MapError> {
    match registry.resolve(gid) {
        Ok(Some(_)) => Ok(true),
        Ok(None) => {
            sink.report(node, format!("gid {} is not owned by any tileset", gid.clean()))?;
            Ok(false)
        }
        Err(err) if !sink.is_strict() => {
            sink.note(node, err.to_string());
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

/// Check that every non-empty cell of a decoded layer resolves. Each
/// distinct bad gid is reported once per layer; in lenient mode the
/// affected cells become empty.
fn validate_layer_gids(
    layer: &str,
    decoded: &mut DecodedData,
    registry: &TilesetRegistry,
    sink: &mut Sink,
) -> Result<(), MapError> {
    let mut bad: HashSet<u32> = HashSet::new();
    for (_, _, gid) in decoded.cells() {
        if gid.is_empty() || bad.contains(&gid.clean()) {
            continue;
        }
        if !validate_gid(gid, registry, layer, sink)? {
            bad.insert(gid.clean());
        }
    }
    if !bad.is_empty() {
        decoded.retain_cells(|gid| !bad.contains(&gid.clean()));
    }
    Ok(())
}
