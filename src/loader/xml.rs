//! XML readers for the three document shapes: map (tmx), tileset (tsx)
//! and object template (tx).
//!
//! Strict mode surfaces every unrecognised attribute or element as an
//! error; lenient mode records a diagnostic and either ignores the
//! attribute or skips the affected node.

use glam::{vec2, Vec2};
use roxmltree::{Document, Node};
use std::path::Path;
use std::str::FromStr;

use crate::error::{Diagnostic, MapError, ParseMode};
use crate::gid::Gid;
use crate::model::{
    CellPayload, Chunk, CollisionRect, Compression, Data, DataContent, Encoding, Frame, Image,
    Layer, Map, Object, ObjectGroup, Properties, Property, Shape, Template, TextBlock, TileEntry,
    TileGrid, Tileset, TilesetRef,
};

/// Collects diagnostics for one import and decides whether an
/// irregularity is fatal.
#[derive(Debug)]
pub(crate) struct Sink {
    mode: ParseMode,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl Sink {
    pub(crate) fn new(mode: ParseMode) -> Self {
        Sink {
            mode,
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn is_strict(&self) -> bool {
        self.mode.is_strict()
    }

    /// Record a diagnostic unconditionally.
    pub(crate) fn note(&mut self, node: &str, message: String) {
        log::warn!("<{}>: {}", node, message);
        self.diagnostics.push(Diagnostic {
            node: node.to_owned(),
            message,
        });
    }

    /// Report a schema irregularity: an error in strict mode, a recorded
    /// diagnostic otherwise.
    pub(crate) fn report(&mut self, node: &str, message: String) -> Result<(), MapError> {
        if self.is_strict() {
            return Err(MapError::Schema {
                node: node.to_owned(),
                detail: message,
            });
        }
        self.note(node, message);
        Ok(())
    }

    /// Recover from a bad node in lenient mode. Parse and schema failures
    /// become diagnostics and yield `None`; everything else propagates.
    pub(crate) fn recover<T>(
        &mut self,
        result: Result<T, MapError>,
        node: &str,
    ) -> Result<Option<T>, MapError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err @ (MapError::Parse { .. } | MapError::Schema { .. })) if !self.is_strict() => {
                self.note(node, format!("skipped: {err}"));
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

fn parse_error(node: Node<'_, '_>, detail: String) -> MapError {
    MapError::Parse {
        node: node.tag_name().name().to_owned(),
        detail,
    }
}

/// Required attribute, parsed with `FromStr`.
fn attribute<T: FromStr>(node: Node<'_, '_>, name: &str) -> Result<T, MapError> {
    let raw = node.attribute(name).ok_or_else(|| MapError::Schema {
        node: node.tag_name().name().to_owned(),
        detail: format!("required attribute '{name}' missing"),
    })?;
    raw.parse()
        .map_err(|_| parse_error(node, format!("invalid value '{raw}' for attribute '{name}'")))
}

/// Optional attribute, `None` when absent.
fn attribute_opt<T: FromStr>(node: Node<'_, '_>, name: &str) -> Result<Option<T>, MapError> {
    match node.attribute(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| parse_error(node, format!("invalid value '{raw}' for attribute '{name}'"))),
    }
}

/// Optional attribute with a default.
fn attribute_or<T: FromStr>(node: Node<'_, '_>, name: &str, default: T) -> Result<T, MapError> {
    Ok(attribute_opt(node, name)?.unwrap_or(default))
}

/// Boolean attribute; the format writes "1"/"0" but "true"/"false" occur.
fn flag_or(node: Node<'_, '_>, name: &str, default: bool) -> Result<bool, MapError> {
    match node.attribute(name) {
        None => Ok(default),
        Some("1") | Some("true") => Ok(true),
        Some("0") | Some("false") => Ok(false),
        Some(raw) => Err(parse_error(
            node,
            format!("invalid value '{raw}' for attribute '{name}'"),
        )),
    }
}

/// Flag every attribute and child element outside the known lists.
fn check_unknown(
    node: Node<'_, '_>,
    known_attrs: &[&str],
    known_children: &[&str],
    sink: &mut Sink,
) -> Result<(), MapError> {
    let tag = node.tag_name().name();
    for attr in node.attributes() {
        if !known_attrs.contains(&attr.name()) {
            sink.report(tag, format!("unrecognised attribute '{}'", attr.name()))?;
        }
    }
    for child in node.children().filter(Node::is_element) {
        let child_tag = child.tag_name().name();
        if !known_children.contains(&child_tag) {
            sink.report(tag, format!("unrecognised element <{child_tag}>"))?;
        }
    }
    Ok(())
}

fn parse_document<'a>(text: &'a str, path: &Path) -> Result<Document<'a>, MapError> {
    Document::parse(text).map_err(|source| MapError::Xml {
        path: path.to_path_buf(),
        source,
    })
}

fn expect_root<'a, 'i>(doc: &'a Document<'i>, tag: &str) -> Result<Node<'a, 'i>, MapError> {
    let root = doc.root_element();
    if root.tag_name().name() != tag {
        return Err(MapError::Schema {
            node: root.tag_name().name().to_owned(),
            detail: format!("expected <{tag}> document root"),
        });
    }
    Ok(root)
}

/// Parse a map document.
pub fn parse_map(text: &str, path: &Path, mode: ParseMode) -> Result<(Map, Vec<Diagnostic>), MapError> {
    let mut sink = Sink::new(mode);
    let map = parse_map_with(text, path, &mut sink)?;
    Ok((map, sink.diagnostics))
}

/// Parse a tileset document.
pub fn parse_tileset(
    text: &str,
    path: &Path,
    mode: ParseMode,
) -> Result<(Tileset, Vec<Diagnostic>), MapError> {
    let mut sink = Sink::new(mode);
    let tileset = parse_tileset_with(text, path, &mut sink)?;
    Ok((tileset, sink.diagnostics))
}

/// Parse a template document.
pub fn parse_template(
    text: &str,
    path: &Path,
    mode: ParseMode,
) -> Result<(Template, Vec<Diagnostic>), MapError> {
    let mut sink = Sink::new(mode);
    let template = parse_template_with(text, path, &mut sink)?;
    Ok((template, sink.diagnostics))
}

pub(crate) fn parse_map_with(text: &str, path: &Path, sink: &mut Sink) -> Result<Map, MapError> {
    let doc = parse_document(text, path)?;
    let root = expect_root(&doc, "map")?;
    check_unknown(
        root,
        &[
            "version",
            "tiledversion",
            "orientation",
            "renderorder",
            "width",
            "height",
            "tilewidth",
            "tileheight",
            "backgroundcolor",
            "infinite",
            "nextobjectid",
        ],
        &["tileset", "layer", "objectgroup", "properties"],
        sink,
    )?;

    let mut map = Map {
        version: attribute_opt(root, "version")?,
        tiled_version: attribute_opt(root, "tiledversion")?,
        orientation: attribute_or(root, "orientation", Default::default())?,
        render_order: attribute_or(root, "renderorder", Default::default())?,
        width: attribute_or(root, "width", 0)?,
        height: attribute_or(root, "height", 0)?,
        tile_width: attribute(root, "tilewidth")?,
        tile_height: attribute(root, "tileheight")?,
        background_color: attribute_opt(root, "backgroundcolor")?,
        infinite: flag_or(root, "infinite", false)?,
        ..Default::default()
    };

    for child in root.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "tileset" => {
                let parsed = parse_tileset_ref(child, sink);
                if let Some(ts) = sink.recover(parsed, "tileset")? {
                    map.tilesets.push(ts);
                }
            }
            "layer" => {
                let parsed = parse_layer(child, sink);
                if let Some(layer) = sink.recover(parsed, "layer")? {
                    map.layers.push(layer);
                }
            }
            "objectgroup" => {
                let parsed = parse_object_group(child, sink);
                if let Some(group) = sink.recover(parsed, "objectgroup")? {
                    map.object_groups.push(group);
                }
            }
            "properties" => map.properties = parse_properties(child, sink)?,
            _ => {}
        }
    }
    Ok(map)
}

pub(crate) fn parse_tileset_with(
    text: &str,
    path: &Path,
    sink: &mut Sink,
) -> Result<Tileset, MapError> {
    let doc = parse_document(text, path)?;
    let root = expect_root(&doc, "tileset")?;
    parse_tileset_body(root, &["version", "tiledversion"], sink)
}

pub(crate) fn parse_template_with(
    text: &str,
    path: &Path,
    sink: &mut Sink,
) -> Result<Template, MapError> {
    let doc = parse_document(text, path)?;
    let root = expect_root(&doc, "template")?;
    check_unknown(root, &[], &["tileset", "object"], sink)?;

    let mut tileset = None;
    let mut object = None;
    for child in root.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "tileset" => tileset = Some(parse_tileset_ref(child, sink)?),
            "object" => object = Some(parse_object(child, sink)?),
            _ => {}
        }
    }
    let object = object.ok_or_else(|| MapError::Schema {
        node: "template".to_owned(),
        detail: "template has no <object>".to_owned(),
    })?;
    Ok(Template { tileset, object })
}

fn parse_tileset_ref(node: Node<'_, '_>, sink: &mut Sink) -> Result<TilesetRef, MapError> {
    let first_gid: u32 = attribute(node, "firstgid")?;
    if let Some(source) = node.attribute("source") {
        check_unknown(node, &["firstgid", "source"], &[], sink)?;
        return Ok(TilesetRef::External {
            first_gid,
            source: source.to_owned(),
        });
    }
    let tileset = parse_tileset_body(node, &["firstgid"], sink)?;
    Ok(TilesetRef::Embedded { first_gid, tileset })
}

fn parse_tileset_body(
    node: Node<'_, '_>,
    extra_attrs: &[&str],
    sink: &mut Sink,
) -> Result<Tileset, MapError> {
    let mut known: Vec<&str> = vec![
        "name",
        "tilewidth",
        "tileheight",
        "spacing",
        "margin",
        "tilecount",
        "columns",
    ];
    known.extend_from_slice(extra_attrs);
    check_unknown(node, &known, &["grid", "tile", "image", "properties"], sink)?;

    let mut tileset = Tileset {
        name: node.attribute("name").unwrap_or_default().to_owned(),
        tile_width: attribute(node, "tilewidth")?,
        tile_height: attribute(node, "tileheight")?,
        spacing: attribute_or(node, "spacing", 0)?,
        margin: attribute_or(node, "margin", 0)?,
        tile_count: attribute_or(node, "tilecount", 0)?,
        columns: attribute_or(node, "columns", 0)?,
        ..Default::default()
    };

    for child in node.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "grid" => {
                check_unknown(child, &["orientation", "width", "height"], &[], sink)?;
                tileset.grid = Some(TileGrid {
                    orientation: attribute_opt(child, "orientation")?,
                    width: attribute_or(child, "width", 0)?,
                    height: attribute_or(child, "height", 0)?,
                });
            }
            "tile" => {
                let parsed = parse_tile_entry(child, sink);
                if let Some(entry) = sink.recover(parsed, "tile")? {
                    tileset.tiles.push(entry);
                }
            }
            "image" => tileset.image = Some(parse_image(child, sink)?),
            _ => {}
        }
    }
    Ok(tileset)
}

fn parse_image(node: Node<'_, '_>, sink: &mut Sink) -> Result<Image, MapError> {
    check_unknown(node, &["source", "width", "height", "trans"], &[], sink)?;
    Ok(Image {
        source: node
            .attribute("source")
            .ok_or_else(|| MapError::Schema {
                node: "image".to_owned(),
                detail: "missing 'source' attribute".to_owned(),
            })?
            .to_owned(),
        width: attribute_or(node, "width", 0)?,
        height: attribute_or(node, "height", 0)?,
        trans: attribute_opt(node, "trans")?,
    })
}

fn parse_tile_entry(node: Node<'_, '_>, sink: &mut Sink) -> Result<TileEntry, MapError> {
    check_unknown(
        node,
        &["id"],
        &["image", "objectgroup", "animation", "properties"],
        sink,
    )?;
    let mut entry = TileEntry {
        id: attribute(node, "id")?,
        ..Default::default()
    };
    for child in node.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "image" => entry.image = Some(parse_image(child, sink)?),
            "objectgroup" => entry.collision = parse_collision(child, sink)?,
            "animation" => entry.animation = parse_animation(child, sink)?,
            "properties" => entry.properties = parse_properties(child, sink)?,
            _ => {}
        }
    }
    Ok(entry)
}

fn parse_collision(node: Node<'_, '_>, sink: &mut Sink) -> Result<Vec<CollisionRect>, MapError> {
    check_unknown(
        node,
        &["id", "draworder", "color", "opacity", "name"],
        &["object", "properties"],
        sink,
    )?;
    let mut rects = Vec::new();
    for child in node.children().filter(Node::is_element) {
        if child.tag_name().name() != "object" {
            continue;
        }
        check_unknown(child, &["id", "x", "y", "width", "height"], &[], sink)?;
        rects.push(CollisionRect {
            id: attribute_or(child, "id", 0)?,
            x: attribute_or(child, "x", 0.0)?,
            y: attribute_or(child, "y", 0.0)?,
            width: attribute_or(child, "width", 0.0)?,
            height: attribute_or(child, "height", 0.0)?,
        });
    }
    Ok(rects)
}

fn parse_animation(node: Node<'_, '_>, sink: &mut Sink) -> Result<Vec<Frame>, MapError> {
    check_unknown(node, &[], &["frame"], sink)?;
    let mut frames = Vec::new();
    for child in node.children().filter(Node::is_element) {
        if child.tag_name().name() != "frame" {
            continue;
        }
        check_unknown(child, &["tileid", "duration"], &[], sink)?;
        frames.push(Frame {
            tile_id: attribute(child, "tileid")?,
            duration_ms: attribute(child, "duration")?,
        });
    }
    Ok(frames)
}

fn parse_layer(node: Node<'_, '_>, sink: &mut Sink) -> Result<Layer, MapError> {
    check_unknown(
        node,
        &["id", "name", "width", "height", "visible", "opacity"],
        &["properties", "data"],
        sink,
    )?;
    let mut properties = Properties::new();
    let mut data = None;
    for child in node.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "properties" => properties = parse_properties(child, sink)?,
            "data" => data = Some(parse_data(child, sink)?),
            _ => {}
        }
    }
    Ok(Layer {
        id: attribute_opt(node, "id")?,
        name: node.attribute("name").unwrap_or_default().to_owned(),
        width: attribute_or(node, "width", 0)?,
        height: attribute_or(node, "height", 0)?,
        visible: flag_or(node, "visible", true)?,
        opacity: attribute_or(node, "opacity", 1.0)?,
        properties,
        data: data.ok_or_else(|| MapError::Schema {
            node: "layer".to_owned(),
            detail: "layer has no <data>".to_owned(),
        })?,
    })
}

fn parse_encoding(node: Node<'_, '_>) -> Result<Encoding, MapError> {
    match node.attribute("encoding") {
        None => Ok(Encoding::None),
        Some("csv") => Ok(Encoding::Csv),
        Some("base64") => Ok(Encoding::Base64),
        Some(other) => Err(parse_error(node, format!("unsupported encoding '{other}'"))),
    }
}

fn parse_compression(node: Node<'_, '_>) -> Result<Compression, MapError> {
    match node.attribute("compression") {
        None => Ok(Compression::None),
        Some("zlib") => Ok(Compression::Zlib),
        Some("gzip") => Ok(Compression::Gzip),
        Some(other) => Err(parse_error(
            node,
            format!("unsupported compression '{other}'"),
        )),
    }
}

fn parse_cells(node: Node<'_, '_>, encoding: Encoding) -> Result<CellPayload, MapError> {
    if encoding == Encoding::None {
        let mut tiles = Vec::new();
        for child in node.children().filter(Node::is_element) {
            if child.tag_name().name() == "tile" {
                tiles.push(attribute_opt(child, "gid")?);
            }
        }
        return Ok(CellPayload::Plain(tiles));
    }
    Ok(CellPayload::Text(
        node.text().unwrap_or_default().trim().to_owned(),
    ))
}

fn parse_data(node: Node<'_, '_>, sink: &mut Sink) -> Result<Data, MapError> {
    check_unknown(node, &["encoding", "compression"], &["tile", "chunk"], sink)?;
    let encoding = parse_encoding(node)?;
    let compression = parse_compression(node)?;

    let chunks: Vec<Node> = node
        .children()
        .filter(|c| c.is_element() && c.tag_name().name() == "chunk")
        .collect();
    let content = if chunks.is_empty() {
        DataContent::Cells(parse_cells(node, encoding)?)
    } else {
        let mut parsed = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            // A chunk may repeat the encoding attributes; the layer-level
            // values are the ones used.
            check_unknown(
                chunk,
                &["x", "y", "width", "height", "encoding", "compression"],
                &["tile"],
                sink,
            )?;
            parsed.push(Chunk {
                x: attribute(chunk, "x")?,
                y: attribute(chunk, "y")?,
                width: attribute(chunk, "width")?,
                height: attribute(chunk, "height")?,
                cells: parse_cells(chunk, encoding)?,
            });
        }
        DataContent::Chunks(parsed)
    };

    Ok(Data {
        encoding,
        compression,
        content,
    })
}

fn parse_object_group(node: Node<'_, '_>, sink: &mut Sink) -> Result<ObjectGroup, MapError> {
    check_unknown(
        node,
        &["id", "name", "color", "opacity", "visible", "draworder"],
        &["object", "properties"],
        sink,
    )?;
    let mut group = ObjectGroup {
        id: attribute_opt(node, "id")?,
        name: node.attribute("name").unwrap_or_default().to_owned(),
        color: attribute_opt(node, "color")?,
        opacity: attribute_or(node, "opacity", 1.0)?,
        visible: flag_or(node, "visible", true)?,
        draw_order: attribute_or(node, "draworder", Default::default())?,
        ..Default::default()
    };
    for child in node.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "object" => {
                let parsed = parse_object(child, sink);
                if let Some(object) = sink.recover(parsed, "object")? {
                    group.objects.push(object);
                }
            }
            "properties" => group.properties = parse_properties(child, sink)?,
            _ => {}
        }
    }
    Ok(group)
}

fn parse_points(node: Node<'_, '_>) -> Result<Vec<Vec2>, MapError> {
    let raw = node.attribute("points").unwrap_or_default();
    let mut points = Vec::new();
    for pair in raw.split_whitespace() {
        let mut components = pair.split(',');
        let (Some(x), Some(y), None) = (components.next(), components.next(), components.next())
        else {
            return Err(parse_error(
                node,
                format!("point '{pair}' should have 2 comma-separated components"),
            ));
        };
        let x: f32 = x
            .parse()
            .map_err(|_| parse_error(node, format!("bad point component '{x}'")))?;
        let y: f32 = y
            .parse()
            .map_err(|_| parse_error(node, format!("bad point component '{y}'")))?;
        points.push(vec2(x, y));
    }
    Ok(points)
}

fn parse_text_block(node: Node<'_, '_>, sink: &mut Sink) -> Result<TextBlock, MapError> {
    check_unknown(
        node,
        &[
            "fontfamily",
            "pixelsize",
            "wrap",
            "color",
            "bold",
            "italic",
            "underline",
            "strikeout",
            "kerning",
            "halign",
            "valign",
        ],
        &[],
        sink,
    )?;
    Ok(TextBlock {
        font_family: attribute_opt(node, "fontfamily")?,
        pixel_size: attribute_or(node, "pixelsize", 16)?,
        wrap: flag_or(node, "wrap", false)?,
        color: attribute_opt(node, "color")?,
        bold: flag_or(node, "bold", false)?,
        italic: flag_or(node, "italic", false)?,
        underline: flag_or(node, "underline", false)?,
        strikeout: flag_or(node, "strikeout", false)?,
        kerning: flag_or(node, "kerning", true)?,
        halign: attribute_opt(node, "halign")?,
        valign: attribute_opt(node, "valign")?,
        content: node.text().unwrap_or_default().to_owned(),
    })
}

fn parse_object(node: Node<'_, '_>, sink: &mut Sink) -> Result<Object, MapError> {
    check_unknown(
        node,
        &[
            "id", "name", "type", "x", "y", "width", "height", "rotation", "gid", "visible",
            "template",
        ],
        &["properties", "ellipse", "polygon", "polyline", "text"],
        sink,
    )?;

    let mut object = Object {
        id: attribute_opt(node, "id")?,
        name: attribute_opt(node, "name")?,
        kind: attribute_opt(node, "type")?,
        x: attribute_opt(node, "x")?,
        y: attribute_opt(node, "y")?,
        width: attribute_opt(node, "width")?,
        height: attribute_opt(node, "height")?,
        rotation: attribute_opt(node, "rotation")?,
        gid: attribute_opt::<u32>(node, "gid")?.map(Gid),
        visible: match node.attribute("visible") {
            None => None,
            Some(_) => Some(flag_or(node, "visible", true)?),
        },
        template: attribute_opt(node, "template")?,
        ..Default::default()
    };

    for child in node.children().filter(Node::is_element) {
        let shape = match child.tag_name().name() {
            "properties" => {
                object.properties = Some(parse_properties(child, sink)?);
                continue;
            }
            "ellipse" => Shape::Ellipse,
            "polygon" => Shape::Polygon(parse_points(child)?),
            "polyline" => Shape::Polyline(parse_points(child)?),
            "text" => Shape::Text(parse_text_block(child, sink)?),
            _ => continue,
        };
        if object.shape.is_some() {
            sink.report("object", "object declares more than one shape".to_owned())?;
            continue;
        }
        if object.gid.is_some() {
            sink.report(
                "object",
                "tile object cannot also carry a shape payload".to_owned(),
            )?;
            continue;
        }
        object.shape = Some(shape);
    }
    Ok(object)
}

pub(crate) fn parse_properties(node: Node<'_, '_>, sink: &mut Sink) -> Result<Properties, MapError> {
    check_unknown(node, &[], &["property"], sink)?;
    let mut properties = Properties::new();
    for child in node.children().filter(Node::is_element) {
        if child.tag_name().name() != "property" {
            continue;
        }
        check_unknown(child, &["name", "type", "value"], &[], sink)?;
        let parsed = (|| -> Result<Property, MapError> {
            Ok(Property {
                name: attribute(child, "name")?,
                kind: attribute_or(child, "type", Default::default())?,
                // Multiline string values live in the element body.
                value: child
                    .attribute("value")
                    .map(str::to_owned)
                    .or_else(|| child.text().map(str::to_owned))
                    .unwrap_or_default(),
            })
        })();
        if let Some(property) = sink.recover(parsed, "property")? {
            properties.0.push(property);
        }
    }
    Ok(properties)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropertyKind;
    use std::path::PathBuf;

    fn path() -> PathBuf {
        PathBuf::from("test.tmx")
    }

    const SMALL_MAP: &str = r##"
        <map version="1.2" orientation="orthogonal" renderorder="right-down"
             width="2" height="2" tilewidth="16" tileheight="16" infinite="0" nextobjectid="3">
          <tileset firstgid="1" source="tiles.tsx"/>
          <layer id="1" name="ground" width="2" height="2">
            <data encoding="csv">5,0,6,5</data>
          </layer>
          <objectgroup id="2" name="things" color="#ff0000">
            <object id="1" name="spawn" x="8" y="8">
              <properties>
                <property name="kind" value="player"/>
              </properties>
            </object>
          </objectgroup>
        </map>"##;

    #[test]
    fn parses_a_small_map() {
        let (map, diags) = parse_map(SMALL_MAP, &path(), ParseMode::Strict).unwrap();
        assert!(diags.is_empty());
        assert_eq!(map.width, 2);
        assert_eq!(map.tile_width, 16);
        assert!(!map.infinite);
        assert_eq!(map.tilesets.len(), 1);
        assert_eq!(map.tilesets[0].first_gid(), 1);
        assert_eq!(map.layers.len(), 1);
        assert_eq!(map.layers[0].name, "ground");
        assert_eq!(map.layers[0].data.encoding, Encoding::Csv);
        assert_eq!(map.object_groups.len(), 1);
        assert_eq!(map.object_groups[0].color.as_deref(), Some("#ff0000"));
        let object = &map.object_groups[0].objects[0];
        assert_eq!(object.name.as_deref(), Some("spawn"));
        assert_eq!(object.x, Some(8.0));
        // Absent attributes stay unset
        assert_eq!(object.width, None);
        assert_eq!(object.visible, None);
        assert_eq!(
            object.properties.as_ref().unwrap().get_str("kind"),
            Some("player")
        );
    }

    #[test]
    fn strict_mode_rejects_unknown_attributes() {
        let text = SMALL_MAP.replace("nextobjectid=\"3\"", "mystery=\"1\"");
        let err = parse_map(&text, &path(), ParseMode::Strict).unwrap_err();
        assert!(matches!(err, MapError::Schema { .. }));

        let (map, diags) = parse_map(&text, &path(), ParseMode::Lenient).unwrap();
        assert_eq!(map.width, 2);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("mystery"));
    }

    #[test]
    fn lenient_mode_skips_bad_nodes() {
        let text = SMALL_MAP.replace("x=\"8\"", "x=\"eight\"");
        let err = parse_map(&text, &path(), ParseMode::Strict).unwrap_err();
        assert!(matches!(err, MapError::Parse { .. }));

        let (map, diags) = parse_map(&text, &path(), ParseMode::Lenient).unwrap();
        // The bad object is dropped, not half-parsed
        assert!(map.object_groups[0].objects.is_empty());
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn parses_embedded_tilesets() {
        let text = r#"
            <map width="1" height="1" tilewidth="8" tileheight="8">
              <tileset firstgid="1" name="inline" tilewidth="8" tileheight="8"
                       tilecount="2" columns="2">
                <image source="sheet.png" width="16" height="8"/>
                <tile id="1">
                  <animation>
                    <frame tileid="0" duration="100"/>
                    <frame tileid="1" duration="150"/>
                  </animation>
                </tile>
              </tileset>
            </map>"#;
        let (map, _) = parse_map(text, &path(), ParseMode::Strict).unwrap();
        let TilesetRef::Embedded { first_gid, tileset } = &map.tilesets[0] else {
            panic!("expected embedded tileset");
        };
        assert_eq!(*first_gid, 1);
        assert!(tileset.is_single_sheet());
        assert_eq!(tileset.tiles[0].animation.len(), 2);
        assert_eq!(tileset.tiles[0].animation[1].duration_ms, 150);
    }

    #[test]
    fn parses_chunked_data() {
        let text = r#"
            <map width="0" height="0" tilewidth="8" tileheight="8" infinite="1">
              <layer name="sparse">
                <data encoding="csv">
                  <chunk x="-16" y="16" width="2" height="2">1,2,3,4</chunk>
                  <chunk x="48" y="0" width="2" height="2">5,6,7,8</chunk>
                </data>
              </layer>
            </map>"#;
        let (map, _) = parse_map(text, &path(), ParseMode::Strict).unwrap();
        let DataContent::Chunks(chunks) = &map.layers[0].data.content else {
            panic!("expected chunks");
        };
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].x, -16);
        assert_eq!(chunks[1].x, 48);
    }

    #[test]
    fn parses_plain_tile_elements() {
        let text = r#"
            <map width="2" height="1" tilewidth="8" tileheight="8">
              <layer name="ground" width="2" height="1">
                <data><tile gid="3"/><tile/></data>
              </layer>
            </map>"#;
        let (map, _) = parse_map(text, &path(), ParseMode::Strict).unwrap();
        let DataContent::Cells(CellPayload::Plain(tiles)) = &map.layers[0].data.content else {
            panic!("expected plain tiles");
        };
        assert_eq!(tiles, &vec![Some(3), None]);
    }

    #[test]
    fn parses_shapes_and_points() {
        let text = r##"
            <map width="1" height="1" tilewidth="8" tileheight="8">
              <objectgroup name="shapes">
                <object id="1" x="0" y="0"><ellipse/></object>
                <object id="2" x="0" y="0"><polygon points="0,0 8,0 8,8"/></object>
                <object id="3" x="0" y="0" width="32" height="16">
                  <text pixelsize="12" wrap="1" color="#010203">hello</text>
                </object>
              </objectgroup>
            </map>"##;
        let (map, _) = parse_map(text, &path(), ParseMode::Strict).unwrap();
        let objects = &map.object_groups[0].objects;
        assert_eq!(objects[0].shape, Some(Shape::Ellipse));
        let Some(Shape::Polygon(points)) = &objects[1].shape else {
            panic!("expected polygon");
        };
        assert_eq!(points.len(), 3);
        assert_eq!(points[2], vec2(8.0, 8.0));
        let Some(Shape::Text(text_block)) = &objects[2].shape else {
            panic!("expected text");
        };
        assert_eq!(text_block.pixel_size, 12);
        assert_eq!(text_block.color.as_deref(), Some("#010203"));
        assert!(text_block.wrap);
        assert_eq!(text_block.content, "hello");
    }

    #[test]
    fn property_types_are_part_of_identity() {
        let text = r#"
            <tileset name="t" tilewidth="8" tileheight="8" tilecount="1" columns="1">
              <image source="s.png" width="8" height="8"/>
              <tile id="0">
                <properties>
                  <property name="damage" type="int" value="10"/>
                  <property name="note">line one</property>
                </properties>
              </tile>
            </tileset>"#;
        let (tileset, _) = parse_tileset(text, &path(), ParseMode::Strict).unwrap();
        let props = &tileset.tiles[0].properties;
        assert_eq!(props.get("damage").unwrap().kind, PropertyKind::Int);
        assert_eq!(props.get_int("damage"), Some(10));
        // Value may live in the element body
        assert_eq!(props.get_str("note"), Some("line one"));
    }

    #[test]
    fn template_documents_parse() {
        let text = r#"
            <template>
              <tileset firstgid="1" source="tiles.tsx"/>
              <object name="crate" gid="3" width="16" height="16"/>
            </template>"#;
        let (template, _) = parse_template(text, &path(), ParseMode::Strict).unwrap();
        assert!(template.tileset.is_some());
        assert_eq!(template.object.gid, Some(Gid(3)));
        assert_eq!(template.object.x, None);
    }
}
