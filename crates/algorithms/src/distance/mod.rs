//! Bounded distance transforms
//!
//! - [`euclidean_distance`]: exact Euclidean distance to the nearest source
//!   cell, in meters, masked beyond a bound
//! - [`cost_distance`]: accumulated cost over an 8-connected grid
//!   (Dijkstra), optionally bounded
//!
//! A source cell is any unmasked cell with a non-zero value.

mod cost;
mod euclidean;

pub use cost::{cost_distance, CostDistanceParams};
pub use euclidean::euclidean_distance;

use crate::algebra::cell;
use waterdriver_core::raster::Raster;
use waterdriver_core::{Error, Result};

/// Row-major flags marking the source cells of `sources`.
pub(crate) fn source_flags(sources: &Raster<f64>) -> Vec<bool> {
    let nodata = sources.nodata();
    sources
        .data()
        .iter()
        .map(|&v| matches!(cell(v, nodata), Some(v) if v != 0.0))
        .collect()
}

pub(crate) fn checked_scale(raster: &Raster<f64>) -> Result<f64> {
    let scale = raster.scale();
    if !scale.is_finite() || scale <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "scale",
            value: scale.to_string(),
            reason: "distance transforms need a positive cell size in meters".to_string(),
        });
    }
    Ok(scale)
}
