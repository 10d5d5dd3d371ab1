//! # Waterdriver Algorithms
//!
//! Raster primitives the evaluation engine is built from.
//!
//! - **algebra**: cell-wise arithmetic, comparisons and mask handling
//! - **morphology**: neighborhood minimum/maximum and opening
//! - **distance**: bounded Euclidean distance and bounded cumulative cost
//! - **components**: connected pixel counts
//! - **rasterize**: polygon features to raster with an aggregation reducer
//! - **resample**: moving rasters between scales on one CRS

pub mod algebra;
pub mod components;
pub mod distance;
pub mod morphology;
pub mod rasterize;
pub mod resample;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::algebra::{
        band_math, band_math_binary, defined, lerp, logical_and, logical_not, logical_or,
        mask_nodata, quantize, self_mask, threshold, unmask, update_mask, BandMathOp, Comparison,
    };
    pub use crate::components::connected_pixel_count;
    pub use crate::distance::{cost_distance, euclidean_distance, CostDistanceParams};
    pub use crate::morphology::{dilate, erode, opening, StructuringElement};
    pub use crate::rasterize::{rasterize, RasterizeReducer};
    pub use crate::resample::{grid_at_scale, resample, resample_to, Resampling};
    pub use waterdriver_core::prelude::*;
}
