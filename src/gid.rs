//! Global tile identifiers and the flip transform they encode.

use glam::{vec2, Affine2, Vec2};

/// Horizontal flip flag (bit 31).
pub const FLIP_H: u32 = 0x8000_0000;
/// Vertical flip flag (bit 30).
pub const FLIP_V: u32 = 0x4000_0000;
/// Diagonal (transpose) flip flag (bit 29).
pub const FLIP_D: u32 = 0x2000_0000;
/// Keep the lower 29 bits (bit 28 is free).
pub const GID_MASK: u32 = 0x1FFF_FFFF;

/// A raw 32-bit global tile identifier as stored in layer data.
///
/// The top 3 bits carry flip flags; the rest indexes a tile within one
/// tileset's owned range. GID 0 means "empty cell".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Gid(pub u32);

impl Gid {
    /// The raw value including flip flags.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// The tileset-relative value with flip flags masked off.
    #[inline]
    pub fn clean(self) -> u32 {
        self.0 & GID_MASK
    }

    /// Whether the tile is mirrored about its vertical centerline.
    #[inline]
    pub fn flip_h(self) -> bool {
        (self.0 & FLIP_H) != 0
    }

    /// Whether the tile is mirrored about its horizontal centerline.
    #[inline]
    pub fn flip_v(self) -> bool {
        (self.0 & FLIP_V) != 0
    }

    /// Whether the tile's axes are swapped (transpose).
    #[inline]
    pub fn flip_d(self) -> bool {
        (self.0 & FLIP_D) != 0
    }

    /// True for the reserved empty-cell value after flag stripping.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.clean() == 0
    }
}

/// Compute the cell-space transform for a tile's flip flags.
///
/// `tile_size` is the tile image size and `cell_size` the map grid cell
/// size, both in pixels. The composed mirror/rotation displaces the tile's
/// visual rectangle relative to the cell anchor, so after composing, the
/// transform is translated so the rectangle's minimum corner lands back on
/// the cell's bottom-left. Without flags this is the identity.
pub fn flip_transform(
    flip_h: bool,
    flip_v: bool,
    flip_d: bool,
    tile_size: Vec2,
    cell_size: Vec2,
) -> Affine2 {
    if !flip_h && !flip_v && !flip_d {
        return Affine2::IDENTITY;
    }

    let mut matrix = Affine2::IDENTITY;
    if flip_d {
        // Transpose: rotate a quarter turn, then mirror the y axis.
        matrix = Affine2::from_angle(std::f32::consts::FRAC_PI_2);
        matrix = Affine2::from_scale(vec2(1.0, -1.0)) * matrix;
    }
    if flip_h {
        matrix = Affine2::from_scale(vec2(-1.0, 1.0)) * matrix;
    }
    if flip_v {
        matrix = Affine2::from_scale(vec2(1.0, -1.0)) * matrix;
    }

    // The rectangle is anchored so the cell center is the pivot.
    let x0 = -cell_size.x * 0.5;
    let y0 = -cell_size.y * 0.5;
    let corners = [
        vec2(x0, y0),
        vec2(x0 + tile_size.x, y0),
        vec2(x0, y0 + tile_size.y),
        vec2(x0 + tile_size.x, y0 + tile_size.y),
    ];

    let mut bottom_left = matrix.transform_point2(corners[0]);
    for corner in &corners[1..] {
        let p = matrix.transform_point2(*corner);
        bottom_left.x = bottom_left.x.min(p.x);
        bottom_left.y = bottom_left.y.min(p.y);
    }

    let offset = vec2(-0.5, -0.5) - vec2(bottom_left.x / cell_size.x, bottom_left.y / cell_size.y);
    Affine2::from_translation(offset) * matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn clean_strips_all_flag_bits() {
        let gid = Gid(5 | FLIP_H | FLIP_V | FLIP_D);
        assert_eq!(gid.clean(), 5);
        assert!(gid.flip_h());
        assert!(gid.flip_v());
        assert!(gid.flip_d());
        // Stripping is idempotent
        assert_eq!(Gid(gid.clean()).clean(), 5);
    }

    #[test]
    fn gid_zero_is_empty_even_with_flags() {
        assert!(Gid(0).is_empty());
        assert!(Gid(FLIP_H).is_empty());
        assert!(!Gid(1).is_empty());
    }

    #[test]
    fn no_flags_is_identity() {
        let m = flip_transform(false, false, false, vec2(16.0, 16.0), vec2(16.0, 16.0));
        assert!(m.abs_diff_eq(Affine2::IDENTITY, EPS));
    }

    #[test]
    fn both_flips_equal_half_turn() {
        let flipped = flip_transform(true, true, false, vec2(16.0, 16.0), vec2(16.0, 16.0));
        let rotated = Affine2::from_angle(std::f32::consts::PI);
        assert!(flipped.abs_diff_eq(rotated, EPS));
    }

    #[test]
    fn horizontal_flip_keeps_square_tile_anchored() {
        let m = flip_transform(true, false, false, vec2(16.0, 16.0), vec2(16.0, 16.0));
        // Pure mirror about the vertical centerline, no residual translation.
        assert!(m.translation.abs_diff_eq(Vec2::ZERO, EPS));
        let p = m.transform_point2(vec2(0.25, 0.1));
        assert!((p.x - -0.25).abs() < EPS);
        assert!((p.y - 0.1).abs() < EPS);
    }

    #[test]
    fn oversized_tile_is_reanchored_after_flip() {
        // 32px tile in a 16px cell: mirroring shifts the footprint a full
        // cell to the left, which the corrective translation undoes.
        let m = flip_transform(true, false, false, vec2(32.0, 32.0), vec2(16.0, 16.0));
        assert!((m.translation.x - 1.0).abs() < EPS);
        assert!(m.translation.y.abs() < EPS);
    }

    #[test]
    fn diagonal_flip_swaps_axes() {
        // Quarter turn then y mirror sends (x, y) to (-y, -x).
        let m = flip_transform(false, false, true, vec2(16.0, 16.0), vec2(16.0, 16.0));
        let p = m.transform_point2(vec2(0.5, 0.0));
        assert!(p.x.abs() < EPS);
        assert!((p.y - -0.5).abs() < EPS);
    }
}
