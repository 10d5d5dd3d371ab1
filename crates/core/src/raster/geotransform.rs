//! Affine geotransformation and scale handling

use serde::{Deserialize, Serialize};

/// Affine transformation coefficients for georeferencing rasters.
///
/// Converts between pixel coordinates (col, row) and map coordinates (x, y):
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// The pipeline works in projected CRSs with square cells, so
/// `pixel_width` is the raster's scale in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Pixel width (cell size in X direction)
    pub pixel_width: f64,
    /// Pixel height (cell size in Y direction, usually negative)
    pub pixel_height: f64,
    /// Rotation about X axis (usually 0)
    pub row_rotation: f64,
    /// Rotation about Y axis (usually 0)
    pub col_rotation: f64,
}

/// Relative tolerance used when comparing scales and origins.
const GRID_TOLERANCE: f64 = 1e-9;

impl GeoTransform {
    /// Create a new GeoTransform with no rotation (north-up image)
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// North-up transform with square cells of `scale` meters
    pub fn north_up(origin_x: f64, origin_y: f64, scale: f64) -> Self {
        Self::new(origin_x, origin_y, scale, -scale)
    }

    /// Same upper-left corner, different square cell size.
    pub fn with_cell_size(&self, scale: f64) -> Self {
        Self {
            pixel_width: scale.copysign(self.pixel_width),
            pixel_height: scale.copysign(self.pixel_height),
            ..*self
        }
    }

    /// Transform of a sub-window whose upper-left pixel is (row, col)
    pub fn window(&self, row: usize, col: usize) -> Self {
        let (x, y) = self.pixel_to_geo_corner(col, row);
        Self {
            origin_x: x,
            origin_y: y,
            ..*self
        }
    }

    /// Convert pixel coordinates to map coordinates of the pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        let col_f = col as f64 + 0.5;
        let row_f = row as f64 + 0.5;

        let x = self.origin_x + col_f * self.pixel_width + row_f * self.row_rotation;
        let y = self.origin_y + col_f * self.col_rotation + row_f * self.pixel_height;

        (x, y)
    }

    /// Convert pixel coordinates to map coordinates (top-left corner)
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        let col_f = col as f64;
        let row_f = row as f64;

        let x = self.origin_x + col_f * self.pixel_width + row_f * self.row_rotation;
        let y = self.origin_y + col_f * self.col_rotation + row_f * self.pixel_height;

        (x, y)
    }

    /// Convert map coordinates to fractional pixel coordinates (col, row)
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;

        if det.abs() < 1e-10 {
            return (f64::NAN, f64::NAN);
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;

        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;

        (col, row)
    }

    /// Cell size in map units (square pixels, no rotation)
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Whether `scale` matches this transform's cell size
    pub fn has_scale(&self, scale: f64) -> bool {
        approx_eq(self.cell_size(), scale)
    }

    /// Whether two transforms describe the same cell lattice
    pub fn same_lattice(&self, other: &GeoTransform) -> bool {
        approx_eq(self.origin_x, other.origin_x)
            && approx_eq(self.origin_y, other.origin_y)
            && approx_eq(self.pixel_width, other.pixel_width)
            && approx_eq(self.pixel_height, other.pixel_height)
            && approx_eq(self.row_rotation, other.row_rotation)
            && approx_eq(self.col_rotation, other.col_rotation)
    }

    /// Bounding box (min_x, min_y, max_x, max_y) for a raster of given dimensions
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let (x0, y0) = self.pixel_to_geo_corner(0, 0);
        let (x1, y1) = self.pixel_to_geo_corner(width, 0);
        let (x2, y2) = self.pixel_to_geo_corner(0, height);
        let (x3, y3) = self.pixel_to_geo_corner(width, height);

        let min_x = x0.min(x1).min(x2).min(x3);
        let max_x = x0.max(x1).max(x2).max(x3);
        let min_y = y0.min(y1).min(y2).min(y3);
        let max_y = y0.max(y1).max(y2).max(y3);

        (min_x, min_y, max_x, max_y)
    }
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= GRID_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
