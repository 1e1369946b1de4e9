//! Layer payload decoders: plain tiles, csv, and base64 with optional
//! zlib/gzip compression, plus chunk reassembly for infinite maps.

use std::io::{self, Read};

use base64::Engine as _;

use crate::error::MapError;
use crate::gid::Gid;
use crate::model::{CellPayload, Compression, DataContent, Encoding, Layer};

/// A decoded rectangular block of raw GIDs, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GidGrid {
    /// Width in cells
    pub width: u32,
    /// Height in cells
    pub height: u32,
    /// width * height raw GIDs, flip flags included
    pub gids: Vec<Gid>,
}

impl GidGrid {
    /// The GID at block-local (x, y), if in bounds.
    pub fn gid_at(&self, x: u32, y: u32) -> Option<Gid> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.gids.get((y * self.width + x) as usize).copied()
    }
}

/// A decoded chunk placed at its cell-space offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GidChunk {
    /// Cell-space x offset
    pub x: i32,
    /// Cell-space y offset
    pub y: i32,
    /// The chunk's cells
    pub grid: GidGrid,
}

/// A layer's fully decoded cell data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedData {
    /// Finite layer: one grid covering width * height
    Grid(GidGrid),
    /// Infinite layer: independently decoded chunks in a sparse space
    Chunks(Vec<GidChunk>),
}

impl DecodedData {
    /// Iterate every cell as (cell x, cell y, gid) in layer coordinate
    /// space. Chunk offsets are already applied.
    pub fn cells(&self) -> Box<dyn Iterator<Item = (i32, i32, Gid)> + '_> {
        match self {
            DecodedData::Grid(grid) => Box::new(grid.gids.iter().enumerate().map(move |(i, g)| {
                (
                    (i as u32 % grid.width) as i32,
                    (i as u32 / grid.width) as i32,
                    *g,
                )
            })),
            DecodedData::Chunks(chunks) => Box::new(chunks.iter().flat_map(|chunk| {
                chunk.grid.gids.iter().enumerate().map(move |(i, g)| {
                    (
                        chunk.x + (i as u32 % chunk.grid.width) as i32,
                        chunk.y + (i as u32 / chunk.grid.width) as i32,
                        *g,
                    )
                })
            })),
        }
    }

    /// Blank every cell whose gid fails the predicate.
    pub fn retain_cells(&mut self, keep: impl Fn(Gid) -> bool) {
        let blank = |gids: &mut Vec<Gid>| {
            for gid in gids {
                if !keep(*gid) {
                    *gid = Gid(0);
                }
            }
        };
        match self {
            DecodedData::Grid(grid) => blank(&mut grid.gids),
            DecodedData::Chunks(chunks) => {
                for chunk in chunks {
                    blank(&mut chunk.grid.gids);
                }
            }
        }
    }
}

/// Decode a layer's payload into cell data, enforcing that the data shape
/// matches the map's infinite flag.
pub fn decode_layer(layer: &Layer, infinite: bool) -> Result<DecodedData, MapError> {
    match &layer.data.content {
        DataContent::Cells(cells) => {
            if infinite {
                return Err(MapError::InfiniteMismatch {
                    layer: layer.name.clone(),
                    infinite,
                });
            }
            let gids = decode_block(
                layer.data.encoding,
                layer.data.compression,
                cells,
                layer.width,
                layer.height,
                &layer.name,
            )?;
            Ok(DecodedData::Grid(GidGrid {
                width: layer.width,
                height: layer.height,
                gids,
            }))
        }
        DataContent::Chunks(chunks) => {
            if !infinite {
                return Err(MapError::InfiniteMismatch {
                    layer: layer.name.clone(),
                    infinite,
                });
            }
            let mut decoded = Vec::with_capacity(chunks.len());
            for chunk in chunks {
                // Chunks inherit the layer's encoding and compression.
                let gids = decode_block(
                    layer.data.encoding,
                    layer.data.compression,
                    &chunk.cells,
                    chunk.width,
                    chunk.height,
                    &layer.name,
                )?;
                decoded.push(GidChunk {
                    x: chunk.x,
                    y: chunk.y,
                    grid: GidGrid {
                        width: chunk.width,
                        height: chunk.height,
                        gids,
                    },
                });
            }
            Ok(DecodedData::Chunks(decoded))
        }
    }
}

/// Decode one data block into exactly width * height GIDs.
pub fn decode_block(
    encoding: Encoding,
    compression: Compression,
    cells: &CellPayload,
    width: u32,
    height: u32,
    layer_name: &str,
) -> Result<Vec<Gid>, MapError> {
    let expected = width as usize * height as usize;
    match (encoding, cells) {
        (Encoding::None, CellPayload::Plain(tiles)) => {
            if tiles.len() != expected {
                return Err(MapError::LengthMismatch {
                    layer: layer_name.to_owned(),
                    expected,
                    actual: tiles.len(),
                });
            }
            let mut gids = Vec::with_capacity(expected);
            for (index, tile) in tiles.iter().enumerate() {
                match tile {
                    Some(gid) => gids.push(Gid(*gid)),
                    None => {
                        return Err(MapError::MalformedCell {
                            layer: layer_name.to_owned(),
                            index,
                        })
                    }
                }
            }
            Ok(gids)
        }
        (Encoding::Csv, CellPayload::Text(text)) => {
            let tokens: Vec<&str> = text.split(',').collect();
            if tokens.len() != expected {
                return Err(MapError::LengthMismatch {
                    layer: layer_name.to_owned(),
                    expected,
                    actual: tokens.len(),
                });
            }
            let mut gids = Vec::with_capacity(expected);
            for token in tokens {
                let value: u32 = token.trim().parse().map_err(|_| MapError::Parse {
                    node: "data".to_owned(),
                    detail: format!("bad gid token '{}' in layer '{}'", token.trim(), layer_name),
                })?;
                gids.push(Gid(value));
            }
            Ok(gids)
        }
        (Encoding::Base64, CellPayload::Text(text)) => {
            let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            let raw = base64::engine::general_purpose::STANDARD
                .decode(compact.as_bytes())
                .map_err(|source| MapError::Base64 {
                    layer: layer_name.to_owned(),
                    source,
                })?;
            let bytes = inflate(compression, raw, layer_name)?;
            if bytes.len() != expected * 4 {
                return Err(MapError::LengthMismatch {
                    layer: layer_name.to_owned(),
                    expected: expected * 4,
                    actual: bytes.len(),
                });
            }
            let gids = bytes
                .chunks_exact(4)
                .map(|b| Gid(u32::from_le_bytes([b[0], b[1], b[2], b[3]])))
                .collect();
            Ok(gids)
        }
        _ => Err(MapError::Parse {
            node: "data".to_owned(),
            detail: format!(
                "layer '{}' payload does not match its declared encoding",
                layer_name
            ),
        }),
    }
}

fn inflate(compression: Compression, raw: Vec<u8>, layer_name: &str) -> Result<Vec<u8>, MapError> {
    let decompress_err = |source: io::Error| MapError::Decompress {
        layer: layer_name.to_owned(),
        source,
    };
    match compression {
        Compression::None => Ok(raw),
        Compression::Zlib => {
            // Skip the 2-byte zlib header and inflate the raw deflate
            // stream; the adler32 trailer is left unread.
            if raw.len() < 2 {
                return Err(decompress_err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "zlib payload shorter than its header",
                )));
            }
            let mut decoder = libflate::deflate::Decoder::new(&raw[2..]);
            let mut out = Vec::new();
            decoder.read_to_end(&mut out).map_err(decompress_err)?;
            Ok(out)
        }
        Compression::Gzip => {
            let mut decoder = libflate::gzip::Decoder::new(&raw[..]).map_err(decompress_err)?;
            let mut out = Vec::new();
            decoder.read_to_end(&mut out).map_err(decompress_err)?;
            Ok(out)
        }
    }
}
