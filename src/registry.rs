//! Tileset registry: range ownership over the gid space and tile lookup.

use glam::{vec2, Affine2};
use std::path::Path;

use crate::error::MapError;
use crate::gid::{flip_transform, Gid};
use crate::loader::xml::{parse_tileset_with, Sink};
use crate::loader::{resolve_relative, TextLoader};
use crate::model::{TileEntry, Tileset, TilesetRef};

/// One registered tileset together with the first gid it owns.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// Smallest gid owned by this tileset
    pub first_gid: u32,
    /// The tileset body
    pub tileset: Tileset,
}

/// The tilesets of one map (or one template), in authored order.
///
/// The format guarantees references are ascending by first gid, so
/// ownership is found by scanning from the last entry backward. The
/// registry relies on the authored order and never sorts.
#[derive(Debug, Clone, Default)]
pub struct TilesetRegistry {
    entries: Vec<RegistryEntry>,
    cell_width: u32,
    cell_height: u32,
}

/// A non-empty gid resolved against a registry.
#[derive(Debug)]
pub struct ResolvedTile<'a> {
    /// The tileset that owns the gid
    pub tileset: &'a Tileset,
    /// First gid of the owning tileset
    pub first_gid: u32,
    /// Id within the owning tileset
    pub local_id: u32,
    /// Per-tile entry, when the tileset declares one for this id
    pub entry: Option<&'a TileEntry>,
    /// Horizontal flip flag
    pub flip_h: bool,
    /// Vertical flip flag
    pub flip_v: bool,
    /// Diagonal flip flag
    pub flip_d: bool,
    /// Placement transform realising the flip flags, anchored so the
    /// tile's bottom-left corner stays on the cell's bottom-left corner
    pub transform: Affine2,
}

impl TilesetRegistry {
    /// Build a registry from already-resolved entries.
    ///
    /// `entries` must be ascending by first gid; cell dimensions are the
    /// owning map's grid size and anchor oversized tiles.
    pub fn from_entries(entries: Vec<RegistryEntry>, cell_width: u32, cell_height: u32) -> Self {
        TilesetRegistry {
            entries,
            cell_width,
            cell_height,
        }
    }

    /// Build a registry from a document's tileset references, loading
    /// external tileset files relative to `base_file`.
    pub(crate) fn build(
        refs: &[TilesetRef],
        base_file: &Path,
        cell_width: u32,
        cell_height: u32,
        loader: &dyn TextLoader,
        sink: &mut Sink,
    ) -> Result<Self, MapError> {
        let mut entries = Vec::with_capacity(refs.len());
        for reference in refs {
            let tileset = match reference {
                TilesetRef::External { source, .. } => {
                    let path = resolve_relative(base_file, source);
                    let text = loader.load_text(&path)?;
                    parse_tileset_with(&text, &path, sink)?
                }
                TilesetRef::Embedded { tileset, .. } => tileset.clone(),
            };
            entries.push(RegistryEntry {
                first_gid: reference.first_gid(),
                tileset,
            });
        }
        Ok(TilesetRegistry {
            entries,
            cell_width,
            cell_height,
        })
    }

    /// Registered entries in authored order.
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Number of registered tilesets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no tilesets are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cell size gids of this registry are placed into.
    pub fn cell_size(&self) -> (u32, u32) {
        (self.cell_width, self.cell_height)
    }

    /// Resolve a gid to its owning tileset, local id and placement
    /// transform.
    ///
    /// `Ok(None)` covers the empty cell (clean gid 0) and gids below every
    /// registered range. A gid inside a range but past the tileset's tiles
    /// is an error.
    pub fn resolve(&self, gid: Gid) -> Result<Option<ResolvedTile<'_>>, MapError> {
        let clean = gid.clean();
        if clean == 0 {
            return Ok(None);
        }
        let Some(owner) = self.entries.iter().rev().find(|e| e.first_gid <= clean) else {
            return Ok(None);
        };
        let tileset = &owner.tileset;
        let local_id = clean - owner.first_gid;

        let unknown = || MapError::UnknownLocalId {
            gid: clean,
            first_gid: owner.first_gid,
            tileset: tileset.name.clone(),
        };
        let entry = if tileset.is_single_sheet() {
            if tileset.tile_count != 0 && local_id >= tileset.tile_count {
                return Err(unknown());
            }
            tileset.tile_entry(local_id)
        } else {
            // Collection tilesets have no positional addressing; the entry
            // itself is the tile.
            Some(tileset.tile_entry(local_id).ok_or_else(unknown)?)
        };

        let tile_size = match entry.and_then(|e| e.image.as_ref()) {
            Some(image) if !tileset.is_single_sheet() => {
                vec2(image.width as f32, image.height as f32)
            }
            _ => vec2(tileset.tile_width as f32, tileset.tile_height as f32),
        };
        let transform = flip_transform(
            gid.flip_h(),
            gid.flip_v(),
            gid.flip_d(),
            tile_size,
            vec2(self.cell_width as f32, self.cell_height as f32),
        );

        Ok(Some(ResolvedTile {
            tileset,
            first_gid: owner.first_gid,
            local_id,
            entry,
            flip_h: gid.flip_h(),
            flip_v: gid.flip_v(),
            flip_d: gid.flip_d(),
            transform,
        }))
    }
}
