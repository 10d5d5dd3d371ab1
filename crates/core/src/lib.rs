//! # Waterdriver Core
//!
//! Core types and I/O shared by every stage of the water-proximity driver.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced grid with NaN/nodata masking
//! - `GeoTransform`: affine transform, the source of a raster's scale
//! - `CRS`: coordinate reference system identity
//! - `Kernel`: named neighborhood shapes with radii in meters
//! - Vector features used for rasterized exclusion masks
//! - Native GeoTIFF reading and writing

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Kernel, KernelShape, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Kernel, KernelShape, Raster, RasterElement};
    pub use crate::vector::{AttributeValue, Feature, FeatureCollection};
}
