//! Raster data structures: grids, transforms and kernels

mod element;
mod geotransform;
mod grid;
mod kernel;

pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use kernel::{Kernel, KernelOffset, KernelShape};
