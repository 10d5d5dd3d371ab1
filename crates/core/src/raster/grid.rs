//! Main Raster type

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::{s, Array2};

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in a 2D grid together with the
/// transform that fixes its scale and the CRS it lives in. Masked cells are
/// NaN for float rasters, or equal to `nodata` for integer ones.
///
/// # Example
///
/// ```ignore
/// use waterdriver_core::{GeoTransform, Raster};
///
/// let mut ocean: Raster<f64> = Raster::filled(100, 100, 0.0);
/// ocean.set_transform(GeoTransform::north_up(0.0, 30_000.0, 300.0));
/// assert_eq!(ocean.scale(), 300.0);
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    /// Affine transformation
    transform: GeoTransform,
    /// Coordinate reference system
    crs: Option<CRS>,
    /// No-data value
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Same grid and metadata, new data. Fails if `data` has another length.
    pub fn with_data<U: RasterElement>(&self, data: Vec<U>, nodata: Option<U>) -> Result<Raster<U>> {
        let (rows, cols) = self.shape();
        let mut out = Raster::<U>::from_vec(data, rows, cols)?;
        out.transform = self.transform;
        out.crs = self.crs.clone();
        out.nodata = nodata;
        Ok(out)
    }

    /// Create a raster with the same dimensions and metadata, filled with a value
    pub fn like(&self, fill_value: T) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: self.nodata,
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Copy a rectangular sub-grid, keeping it georeferenced.
    pub fn window(&self, row: usize, col: usize, rows: usize, cols: usize) -> Result<Self> {
        if row + rows > self.rows() || col + cols > self.cols() {
            return Err(Error::IndexOutOfBounds {
                row: row + rows,
                col: col + cols,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        Ok(Self {
            data: self.data.slice(s![row..row + rows, col..col + cols]).to_owned(),
            transform: self.transform.window(row, col),
            crs: self.crs.clone(),
            nodata: self.nodata,
        })
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the CRS
    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Set the CRS
    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Ground size of one cell in meters. Same as [`cell_size`](Self::cell_size);
    /// the pipeline only runs in metric CRSs.
    pub fn scale(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Fail unless this raster is evaluated at `expected` meters per cell.
    pub fn ensure_scale(&self, expected: f64) -> Result<()> {
        if self.transform.has_scale(expected) {
            Ok(())
        } else {
            Err(Error::ScaleMismatch {
                expected,
                actual: self.scale(),
            })
        }
    }

    /// Fail unless `other` shares this raster's shape, lattice and CRS.
    pub fn ensure_same_grid<U: RasterElement>(&self, other: &Raster<U>) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::SizeMismatch {
                er: self.rows(),
                ec: self.cols(),
                ar: other.rows(),
                ac: other.cols(),
            });
        }
        if !self.transform.has_scale(other.scale()) {
            return Err(Error::ScaleMismatch {
                expected: self.scale(),
                actual: other.scale(),
            });
        }
        if !self.transform.same_lattice(other.transform()) {
            return Err(Error::GridMismatch {
                ex: self.transform.origin_x,
                ey: self.transform.origin_y,
                ax: other.transform().origin_x,
                ay: other.transform().origin_y,
            });
        }
        if let (Some(a), Some(b)) = (self.crs(), other.crs()) {
            if !a.is_equivalent(b) {
                return Err(Error::CrsMismatch(a.identifier(), b.identifier()));
            }
        }
        Ok(())
    }

    /// Whether `other` lies on exactly the same cells as this raster
    pub fn same_grid<U: RasterElement>(&self, other: &Raster<U>) -> bool {
        self.shape() == other.shape() && self.transform.same_lattice(other.transform())
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    // Coordinate conversion

    /// Convert pixel coordinates to geographic coordinates
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Convert geographic coordinates to pixel coordinates
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.transform.geo_to_pixel(x, y)
    }

    // Value checks

    /// Check if a value is masked
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Number of unmasked cells
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&v| !self.is_nodata(v)).count()
    }

    /// Whether every cell is masked
    pub fn is_fully_masked(&self) -> bool {
        self.data.iter().all(|&v| self.is_nodata(v))
    }

    // Statistics

    /// Calculate basic statistics (min, max, mean, count of valid cells)
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }

            if min.map_or(true, |m| value < m) {
                min = Some(value);
            }
            if max.map_or(true, |m| value > m) {
                max = Some(value);
            }

            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        let mean = if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        };

        RasterStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}
