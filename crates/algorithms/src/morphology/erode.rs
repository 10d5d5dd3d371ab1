//! Morphological erosion (minimum filter)
//!
//! Replaces each cell with the minimum value in its structuring element
//! neighborhood. On a binary water mask this shrinks every water body by
//! the element radius.

use waterdriver_core::raster::Raster;
use waterdriver_core::Result;

use super::element::StructuringElement;
use super::{reduce_neighborhood, Extreme};

/// Perform morphological erosion on a raster
///
/// Each output cell is the minimum over the in-grid, unmasked cells of the
/// structuring element centered on it. Masked centers stay masked.
///
/// # Arguments
/// * `raster` - Input raster
/// * `element` - Structuring element defining the neighborhood shape
pub fn erode(raster: &Raster<f64>, element: &StructuringElement) -> Result<Raster<f64>> {
    reduce_neighborhood(raster, element, Extreme::Min)
}
