//! Typed document model for map, tileset and template files.
//!
//! Object geometry/identity fields track presence explicitly: `None` means
//! the attribute was absent from the document, which is distinct from a zero
//! value. Template merging depends on that distinction.

use glam::Vec2;
use std::str::FromStr;

use crate::gid::Gid;

/// Map orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Plain rectangular grid
    #[default]
    Orthogonal,
    /// Isometric projection
    Isometric,
    /// Staggered isometric
    Staggered,
    /// Hexagonal grid
    Hexagonal,
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "orthogonal" => Ok(Orientation::Orthogonal),
            "isometric" => Ok(Orientation::Isometric),
            "staggered" => Ok(Orientation::Staggered),
            "hexagonal" => Ok(Orientation::Hexagonal),
            other => Err(format!("unknown orientation '{other}'")),
        }
    }
}

/// Order in which tiles of a layer are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderOrder {
    /// Left-to-right, top-to-bottom
    #[default]
    RightDown,
    /// Left-to-right, bottom-to-top
    RightUp,
    /// Right-to-left, top-to-bottom
    LeftDown,
    /// Right-to-left, bottom-to-top
    LeftUp,
}

impl FromStr for RenderOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "right-down" => Ok(RenderOrder::RightDown),
            "right-up" => Ok(RenderOrder::RightUp),
            "left-down" => Ok(RenderOrder::LeftDown),
            "left-up" => Ok(RenderOrder::LeftUp),
            other => Err(format!("unknown render order '{other}'")),
        }
    }
}

/// A parsed map document.
///
/// Layer and object-group ordering is draw/sort order and is preserved
/// exactly as authored.
#[derive(Debug, Clone, Default)]
pub struct Map {
    /// Format version string
    pub version: Option<String>,
    /// Version of the editor that wrote the file
    pub tiled_version: Option<String>,
    /// Grid orientation
    pub orientation: Orientation,
    /// Tile draw order within a layer
    pub render_order: RenderOrder,
    /// Map width in cells (meaningless when infinite)
    pub width: u32,
    /// Map height in cells (meaningless when infinite)
    pub height: u32,
    /// Grid cell width in pixels
    pub tile_width: u32,
    /// Grid cell height in pixels
    pub tile_height: u32,
    /// Background colour as an HTML colour string
    pub background_color: Option<String>,
    /// Whether layers are chunked instead of bounded
    pub infinite: bool,
    /// Tileset references, ascending by first gid
    pub tilesets: Vec<TilesetRef>,
    /// Tile layers in draw order
    pub layers: Vec<Layer>,
    /// Object groups in draw order
    pub object_groups: Vec<ObjectGroup>,
    /// Map-level custom properties
    pub properties: Properties,
}

/// A map's reference to a tileset, external or embedded.
#[derive(Debug, Clone)]
pub enum TilesetRef {
    /// Tileset lives in a separate file, path relative to the referencing document
    External {
        /// Smallest GID owned by this tileset
        first_gid: u32,
        /// Relative path of the tileset file
        source: String,
    },
    /// Tileset body is inlined in the referencing document
    Embedded {
        /// Smallest GID owned by this tileset
        first_gid: u32,
        /// The inlined tileset body
        tileset: Tileset,
    },
}

impl TilesetRef {
    /// The smallest GID this tileset owns.
    pub fn first_gid(&self) -> u32 {
        match self {
            TilesetRef::External { first_gid, .. } | TilesetRef::Embedded { first_gid, .. } => {
                *first_gid
            }
        }
    }
}

/// A resolved tileset body.
#[derive(Debug, Clone, Default)]
pub struct Tileset {
    /// Tileset name
    pub name: String,
    /// Tile width in pixels
    pub tile_width: u32,
    /// Tile height in pixels
    pub tile_height: u32,
    /// Pixels between sheet tiles
    pub spacing: u32,
    /// Pixels around the sheet edge
    pub margin: u32,
    /// Number of tiles
    pub tile_count: u32,
    /// Sheet columns
    pub columns: u32,
    /// Optional grid override
    pub grid: Option<TileGrid>,
    /// Per-tile entries, addressed by explicit id
    pub tiles: Vec<TileEntry>,
    /// Sheet image for single-sheet tilesets
    pub image: Option<Image>,
}

impl Tileset {
    /// Whether tiles are sub-rectangles of one sheet image.
    ///
    /// This is the single authority for addressing mode: a tileset is
    /// single-sheet iff it has no per-tile entries, or it declares a
    /// tileset-level image (image wins over entries).
    pub fn is_single_sheet(&self) -> bool {
        self.tiles.is_empty() || self.image.is_some()
    }

    /// The tile entry with the given local id, if one exists.
    ///
    /// Entry ids are explicit and not necessarily contiguous, so this is a
    /// search rather than an index.
    pub fn tile_entry(&self, local_id: u32) -> Option<&TileEntry> {
        self.tiles.iter().find(|t| t.id == local_id)
    }

    /// Pixel origin of a local id's sub-rectangle in the sheet image.
    ///
    /// Row-major from the top-left, offset by margin and advancing by
    /// tile size plus spacing. `None` for collection tilesets or ids past
    /// the tile count.
    pub fn sheet_origin(&self, local_id: u32) -> Option<(u32, u32)> {
        if !self.is_single_sheet() || self.columns == 0 || local_id >= self.tile_count {
            return None;
        }
        let col = local_id % self.columns;
        let row = local_id / self.columns;
        let x = self.margin + col * (self.tile_width + self.spacing);
        let y = self.margin + row * (self.tile_height + self.spacing);
        Some((x, y))
    }
}

/// Grid override inside a tileset.
#[derive(Debug, Clone)]
pub struct TileGrid {
    /// Grid orientation tag
    pub orientation: Option<String>,
    /// Cell width
    pub width: u32,
    /// Cell height
    pub height: u32,
}

/// An image referenced by a tileset or tile entry.
#[derive(Debug, Clone)]
pub struct Image {
    /// Image path, relative to the declaring document
    pub source: String,
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
    /// Colour treated as transparent, if any
    pub trans: Option<String>,
}

/// Per-tile data inside a tileset.
#[derive(Debug, Clone, Default)]
pub struct TileEntry {
    /// Local id, unique within the tileset
    pub id: u32,
    /// Own image for collection tilesets
    pub image: Option<Image>,
    /// Collision rectangles; non-empty marks the tile collidable
    pub collision: Vec<CollisionRect>,
    /// Animation frames in playback order
    pub animation: Vec<Frame>,
    /// Tile-level custom properties
    pub properties: Properties,
}

impl TileEntry {
    /// Whether this tile carries collision shapes.
    pub fn has_collision(&self) -> bool {
        !self.collision.is_empty()
    }
}

/// A collision rectangle on a tile.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionRect {
    /// Object id within the tile
    pub id: u32,
    /// Left edge in tile pixels
    pub x: f32,
    /// Top edge in tile pixels
    pub y: f32,
    /// Width in pixels
    pub width: f32,
    /// Height in pixels
    pub height: f32,
}

/// One animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Local id of the frame's tile within the same tileset
    pub tile_id: u32,
    /// Display duration in milliseconds
    pub duration_ms: u32,
}

/// A tile layer with its still-encoded payload.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Layer id assigned by the editor
    pub id: Option<u32>,
    /// Layer name
    pub name: String,
    /// Width in cells, ignored for infinite maps
    pub width: u32,
    /// Height in cells, ignored for infinite maps
    pub height: u32,
    /// Whether the layer is shown
    pub visible: bool,
    /// Opacity in [0, 1]
    pub opacity: f32,
    /// Layer-level custom properties
    pub properties: Properties,
    /// Encoded cell data
    pub data: Data,
}

/// Encoding tag on a data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// One `<tile>` element per cell
    #[default]
    None,
    /// Comma-separated decimal GIDs
    Csv,
    /// Base64 bytes, optionally compressed
    Base64,
}

/// Compression tag on a data block; only meaningful with base64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Raw base64 bytes
    #[default]
    None,
    /// zlib-framed deflate
    Zlib,
    /// gzip-framed deflate
    Gzip,
}

/// The raw payload of a layer's `<data>` element.
#[derive(Debug, Clone)]
pub struct Data {
    /// How the payload is encoded
    pub encoding: Encoding,
    /// How the payload is compressed
    pub compression: Compression,
    /// Cell content, flat or chunked
    pub content: DataContent,
}

/// Flat cell data for a finite layer, or chunks for an infinite one.
#[derive(Debug, Clone)]
pub enum DataContent {
    /// One block covering the whole layer
    Cells(CellPayload),
    /// Arbitrarily-offset chunks; they need not tile a bounded rectangle
    Chunks(Vec<Chunk>),
}

/// The undecoded cells of one data block.
#[derive(Debug, Clone)]
pub enum CellPayload {
    /// Per-cell `<tile>` elements; `None` marks an element without a gid
    Plain(Vec<Option<u32>>),
    /// Raw csv or base64 text
    Text(String),
}

/// A rectangular sub-region of an infinite layer.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Cell-space x offset, may be negative
    pub x: i32,
    /// Cell-space y offset, may be negative
    pub y: i32,
    /// Chunk width in cells
    pub width: u32,
    /// Chunk height in cells
    pub height: u32,
    /// The chunk's own cells, encoded like the layer's
    pub cells: CellPayload,
}

/// Draw-order hint on an object group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawOrder {
    /// Sorted by y position
    #[default]
    TopDown,
    /// Document order
    Index,
}

impl FromStr for DrawOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "topdown" => Ok(DrawOrder::TopDown),
            "index" => Ok(DrawOrder::Index),
            other => Err(format!("unknown draworder '{other}'")),
        }
    }
}

/// A group of freely-placed objects.
#[derive(Debug, Clone, Default)]
pub struct ObjectGroup {
    /// Group id assigned by the editor
    pub id: Option<u32>,
    /// Group name
    pub name: String,
    /// Tint colour for the group's objects
    pub color: Option<String>,
    /// Opacity in [0, 1]
    pub opacity: f32,
    /// Whether the group is shown
    pub visible: bool,
    /// Draw-order hint
    pub draw_order: DrawOrder,
    /// Objects in document order
    pub objects: Vec<Object>,
    /// Group-level custom properties
    pub properties: Properties,
}

/// A placed object.
///
/// Every geometry/identity field is optional so that template merging can
/// tell "absent" apart from "explicitly zero".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    /// Object id
    pub id: Option<u32>,
    /// Object name
    pub name: Option<String>,
    /// Type/class tag
    pub kind: Option<String>,
    /// X position in pixels
    pub x: Option<f32>,
    /// Y position in pixels
    pub y: Option<f32>,
    /// Width in pixels
    pub width: Option<f32>,
    /// Height in pixels
    pub height: Option<f32>,
    /// Clockwise rotation in degrees
    pub rotation: Option<f32>,
    /// Tile reference for tile objects
    pub gid: Option<Gid>,
    /// Whether the object is shown
    pub visible: Option<bool>,
    /// Template file reference, relative to the declaring document
    pub template: Option<String>,
    /// Shape payload; `None` means plain rectangle
    pub shape: Option<Shape>,
    /// Object-level custom properties
    pub properties: Option<Properties>,
}

impl Object {
    /// Build the merged object: a copy of `template` overridden by every
    /// field this instance explicitly set. Unset instance fields do not
    /// override; defaults are applied separately after merging.
    pub fn merged_over(&self, template: &Object) -> Object {
        Object {
            id: self.id.or(template.id),
            name: self.name.clone().or_else(|| template.name.clone()),
            kind: self.kind.clone().or_else(|| template.kind.clone()),
            x: self.x.or(template.x),
            y: self.y.or(template.y),
            width: self.width.or(template.width),
            height: self.height.or(template.height),
            rotation: self.rotation.or(template.rotation),
            gid: self.gid.or(template.gid),
            visible: self.visible.or(template.visible),
            template: self.template.clone(),
            shape: self.shape.clone().or_else(|| template.shape.clone()),
            properties: match (&template.properties, &self.properties) {
                (None, None) => None,
                (Some(t), None) => Some(t.clone()),
                (None, Some(i)) => Some(i.clone()),
                (Some(t), Some(i)) => Some(Properties::merged(t, i)),
            },
        }
    }

    /// Fill every still-unset field with its documented zero default.
    ///
    /// Must run after all template merging; `visible` in particular only
    /// defaults to true once merging cannot override it any more.
    pub fn fill_defaults(&mut self) {
        if self.id.is_none() {
            self.id = Some(0);
        }
        if self.x.is_none() {
            self.x = Some(0.0);
        }
        if self.y.is_none() {
            self.y = Some(0.0);
        }
        if self.width.is_none() {
            self.width = Some(0.0);
        }
        if self.height.is_none() {
            self.height = Some(0.0);
        }
        if self.rotation.is_none() {
            self.rotation = Some(0.0);
        }
        if self.gid.is_none() {
            self.gid = Some(Gid(0));
        }
        if self.visible.is_none() {
            self.visible = Some(true);
        }
    }
}

/// Non-rectangle shape payloads. At most one per object; a gid-bearing
/// object carries none of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Ellipse inscribed in the object's bounds
    Ellipse,
    /// Closed point list, relative to the object position
    Polygon(Vec<Vec2>),
    /// Open point list, relative to the object position
    Polyline(Vec<Vec2>),
    /// A text block
    Text(TextBlock),
}

/// Text payload of a text object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextBlock {
    /// Font family name
    pub font_family: Option<String>,
    /// Font size in pixels
    pub pixel_size: u32,
    /// Whether to word-wrap inside the object bounds
    pub wrap: bool,
    /// Text colour as an HTML colour string
    pub color: Option<String>,
    /// Bold style
    pub bold: bool,
    /// Italic style
    pub italic: bool,
    /// Underline style
    pub underline: bool,
    /// Strikeout style
    pub strikeout: bool,
    /// Whether kerning is used
    pub kerning: bool,
    /// Horizontal alignment tag
    pub halign: Option<String>,
    /// Vertical alignment tag
    pub valign: Option<String>,
    /// The text itself
    pub content: String,
}

/// Declared type tag of a custom property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropertyKind {
    /// Plain string (the default when no type is declared)
    #[default]
    String,
    /// Signed integer
    Int,
    /// Floating point
    Float,
    /// Boolean
    Bool,
    /// HTML colour string
    Color,
    /// File path
    File,
    /// Object id reference
    Object,
    /// Class/struct property
    Class,
}

impl FromStr for PropertyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(PropertyKind::String),
            "int" => Ok(PropertyKind::Int),
            "float" => Ok(PropertyKind::Float),
            "bool" => Ok(PropertyKind::Bool),
            "color" => Ok(PropertyKind::Color),
            "file" => Ok(PropertyKind::File),
            "object" => Ok(PropertyKind::Object),
            "class" => Ok(PropertyKind::Class),
            other => Err(format!("unsupported property type '{other}'")),
        }
    }
}

/// One custom property. Values keep their document string form; typed
/// accessors parse on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Property name
    pub name: String,
    /// Declared type tag
    pub kind: PropertyKind,
    /// Raw value string
    pub value: String,
}

/// An ordered list of custom properties.
///
/// The merge key is (name, kind): two properties sharing a name but not a
/// declared type are distinct entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(pub Vec<Property>);

impl Properties {
    /// An empty list.
    pub fn new() -> Self {
        Properties(Vec::new())
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no properties are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in document order.
    pub fn iter(&self) -> std::slice::Iter<'_, Property> {
        self.0.iter()
    }

    /// First property with the given name, any type.
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.0.iter().find(|p| p.name == name)
    }

    /// String value of a property.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).map(|p| p.value.as_str())
    }

    /// Boolean value, if the property parses as one.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|p| p.value.parse().ok())
    }

    /// Integer value, if the property parses as one.
    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|p| p.value.parse().ok())
    }

    /// Float value, if the property parses as one.
    pub fn get_float(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(|p| p.value.parse().ok())
    }

    /// Merge instance properties over template properties.
    ///
    /// Starts from the template list; each instance property replaces the
    /// value of an existing (name, kind) match in place or is appended.
    /// Template-only entries are retained.
    pub fn merged(template: &Properties, instance: &Properties) -> Properties {
        let mut combined = template.0.clone();
        for incoming in &instance.0 {
            match combined
                .iter_mut()
                .find(|p| p.name == incoming.name && p.kind == incoming.kind)
            {
                Some(existing) => existing.value = incoming.value.clone(),
                None => combined.push(incoming.clone()),
            }
        }
        Properties(combined)
    }
}

impl<'a> IntoIterator for &'a Properties {
    type Item = &'a Property;
    type IntoIter = std::slice::Iter<'a, Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A parsed object-template document: at most one tileset reference plus
/// exactly one base object.
#[derive(Debug, Clone)]
pub struct Template {
    /// Tileset the base object's gid refers to, if it has one
    pub tileset: Option<TilesetRef>,
    /// The reusable base object
    pub object: Object,
}
