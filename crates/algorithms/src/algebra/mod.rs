//! Cell-wise raster algebra
//!
//! Arithmetic and comparisons over `Raster<f64>` where NaN (or the raster's
//! nodata value) marks a masked cell. Every function returns a new raster
//! on the input's grid; masked status is propagated explicitly:
//!
//! - arithmetic and comparisons keep masked cells masked,
//! - `unmask` is the only way to turn a masked cell into a value,
//! - `update_mask` and `self_mask` are the only ways to mask valid cells.

mod band_math;
mod mask;

pub use band_math::{band_math, band_math_binary, lerp, BandMathOp};
pub use mask::{
    count_true, defined, logical_and, logical_not, logical_or, mask_nodata, quantize, self_mask,
    threshold, unmask, update_mask, Comparison,
};

use crate::maybe_rayon::*;
use waterdriver_core::raster::Raster;
use waterdriver_core::Result;

/// Value of a cell, or `None` when it is masked
#[inline]
pub(crate) fn cell(value: f64, nodata: Option<f64>) -> Option<f64> {
    if value.is_nan() {
        return None;
    }
    match nodata {
        Some(nd) if !nd.is_nan() && (value - nd).abs() < f64::EPSILON => None,
        _ => Some(value),
    }
}

/// Apply `f` to every cell, masked ones included (as `None`).
pub(crate) fn map_cells<F>(raster: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(Option<f64>) -> f64 + Sync + Send,
{
    let (rows, cols) = raster.shape();
    let nodata = raster.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    let v = unsafe { raster.get_unchecked(row, col) };
                    f(cell(v, nodata))
                })
                .collect::<Vec<_>>()
        })
        .collect();

    raster.with_data(data, Some(f64::NAN))
}

/// Apply `f` to every pair of cells of two rasters on the same grid.
pub(crate) fn zip_cells<F>(a: &Raster<f64>, b: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(Option<f64>, Option<f64>) -> f64 + Sync + Send,
{
    a.ensure_same_grid(b)?;

    let (rows, cols) = a.shape();
    let nodata_a = a.nodata();
    let nodata_b = b.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    let va = unsafe { a.get_unchecked(row, col) };
                    let vb = unsafe { b.get_unchecked(row, col) };
                    f(cell(va, nodata_a), cell(vb, nodata_b))
                })
                .collect::<Vec<_>>()
        })
        .collect();

    a.with_data(data, Some(f64::NAN))
}
